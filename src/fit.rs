//! Sigmoid least-squares fit
//!
//! Levenberg-Marquardt minimization of the sum of squared residuals between the edge scan
//! and the [SigmoidParams] model, started from a single seed.
//!
//! The asymptotes `a` and `b` enter the model linearly: for a given steepness and inflection
//! they are solved exactly by linear least squares, and the damped iterations only move
//! `(c, d)` (variable projection).

use nalgebra::{Matrix2, Matrix4, Vector2, Vector4};

use crate::{EdgeScan, SigmoidParams};

/// Number of model parameters
pub const N_PARAMS: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum FitError {
    #[error("{samples} samples is not enough to fit 4 parameters")]
    TooFewSamples { samples: usize },
    #[error("the edge response is constant, there is no edge to fit")]
    ConstantResponse,
    #[error("the edge scan contains non-finite samples")]
    NonFiniteSamples,
    #[error("the sigmoid ({0}) is flat over the edge scan")]
    FlatModel(SigmoidParams),
    #[error("the fit did not converge after {iterations} iterations (RSS={rss:e})")]
    NotConverged { iterations: usize, rss: f64 },
    #[error("the fit diverged after {iterations} iterations, damping exceeded {lambda:e}")]
    Diverged { iterations: usize, lambda: f64 },
    #[error("the fit produced non-finite parameters: {0}")]
    NonFinite(SigmoidParams),
    #[error("the normal matrix is singular at the solution, covariance is undefined")]
    Singular,
}
type Result<T> = std::result::Result<T, FitError>;

/// Levenberg-Marquardt settings
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Relative reduction of the residual sum of squares considered converged
    pub ftol: f64,
    /// Relative parameter step considered converged
    pub xtol: f64,
    /// Initial damping
    pub initial_lambda: f64,
    /// Damping factor applied on a rejected step
    pub lambda_up: f64,
    /// Damping factor applied on an accepted step
    pub lambda_down: f64,
}
impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 800,
            ftol: 1e-8,
            xtol: 1e-8,
            initial_lambda: 1e-3,
            lambda_up: 10.,
            lambda_down: 0.1,
        }
    }
}

const MAX_LAMBDA: f64 = 1e10;

/// Successful sigmoid fit
#[derive(Debug, Clone)]
pub struct SigmoidFit {
    pub params: SigmoidParams,
    /// Parameter covariance estimate, (JᵀJ)⁻¹ RSS / (n - 4)
    pub covariance: Matrix4<f64>,
    /// Residual sum of squares
    pub rss: f64,
    pub iterations: usize,
}
impl SigmoidFit {
    /// One standard deviation errors on (a, b, c, d)
    pub fn std_errors(&self) -> [f64; N_PARAMS] {
        let mut std = [0f64; N_PARAMS];
        std.iter_mut()
            .enumerate()
            .for_each(|(i, s)| *s = self.covariance[(i, i)].sqrt());
        std
    }
}

/// JᵀJ of the 4 parameters model
fn information_matrix(params: &SigmoidParams, x: &[f64]) -> Matrix4<f64> {
    x.iter().fold(Matrix4::zeros(), |jtj, &x| {
        let row = Vector4::from(params.gradient(x));
        jtj + row * row.transpose()
    })
}
fn rss(params: &SigmoidParams, x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&x, &y)| {
            let r = y - params.eval(x);
            r * r
        })
        .sum()
}

/// Best asymptotes for the steepness `c` and the inflection `d`
///
/// Returns `None` if the logistic factor is constant over the samples.
fn project(c: f64, d: f64, x: &[f64], y: &[f64]) -> Option<SigmoidParams> {
    let unit = SigmoidParams::new(0., 1., c, d);
    let n = x.len() as f64;
    let (mut s1, mut s2, mut y1, mut sy) = (0f64, 0f64, 0f64, 0f64);
    for (&x, &y) in x.iter().zip(y) {
        let s = unit.logistic(x);
        s1 += s;
        s2 += s * s;
        y1 += y;
        sy += s * y;
    }
    let det = n * s2 - s1 * s1;
    if det.is_nan() || det <= 1e-12 * n * s2 {
        return None;
    }
    let a = (s2 * y1 - s1 * sy) / det;
    let slope = (n * sy - s1 * y1) / det;
    Some(SigmoidParams::new(a, a + slope, c, d))
}

/// Normal equations of (c, d) with the asymptotes projected out
struct Reduced {
    jtj: Matrix2<f64>,
    jtr: Vector2<f64>,
}
fn reduced_normal_equations(params: &SigmoidParams, x: &[f64], y: &[f64]) -> Option<Reduced> {
    let mut gram = Matrix2::<f64>::zeros();
    let mut cross = Matrix2::<f64>::zeros();
    for &x in x {
        let basis = Vector2::new(1., params.logistic(x));
        let [_, _, gc, gd] = params.gradient(x);
        gram += basis * basis.transpose();
        cross += basis * Vector2::new(gc, gd).transpose();
    }
    // (c, d) gradient components along the (1, s) span
    let along = gram.lu().solve(&cross)?;

    let mut jtj = Matrix2::<f64>::zeros();
    let mut jtr = Vector2::<f64>::zeros();
    for (&x, &y) in x.iter().zip(y) {
        let basis = Vector2::new(1., params.logistic(x));
        let [_, _, gc, gd] = params.gradient(x);
        let row = Vector2::new(gc, gd) - along.transpose() * basis;
        jtj += row * row.transpose();
        jtr += row * (y - params.eval(x));
    }
    Some(Reduced { jtj, jtr })
}

/// Sigmoid fitter
#[derive(Debug, Clone, Default)]
pub struct SigmoidFitter {
    config: FitConfig,
}
impl SigmoidFitter {
    pub fn new(config: FitConfig) -> Self {
        Self { config }
    }
    /// Fits the sigmoid to the edge scan starting from `guess`
    ///
    /// The seed asymptotes are replaced by the best ones for the seed steepness and inflection.
    pub fn fit(&self, scan: &EdgeScan, guess: SigmoidParams) -> Result<SigmoidFit> {
        let (x, y) = (scan.x(), scan.y());
        let n = scan.len();
        if n < N_PARAMS {
            return Err(FitError::TooFewSamples { samples: n });
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(FitError::NonFiniteSamples);
        }
        if y.iter().all(|&v| v == y[0]) {
            return Err(FitError::ConstantResponse);
        }

        let FitConfig {
            max_iterations,
            ftol,
            xtol,
            initial_lambda,
            lambda_up,
            lambda_down,
        } = self.config;

        let mut params = project(guess.c, guess.d, x, y).ok_or(FitError::FlatModel(guess))?;
        let mut lambda = initial_lambda;
        let mut prev_rss = rss(&params, x, y);
        let perfect_rss = f64::EPSILON * y.iter().map(|y| y * y).sum::<f64>();
        // running maximum of the JᵀJ diagonal, damping scale
        let mut scale = Vector2::<f64>::zeros();
        log::debug!("fit seed: {params} (RSS={prev_rss:e})");

        let mut converged = false;
        let mut iterations = 0;
        for iter in 0..max_iterations {
            iterations = iter + 1;
            if prev_rss <= perfect_rss {
                converged = true;
                break;
            }

            let Reduced { jtj, jtr } =
                reduced_normal_equations(&params, x, y).ok_or(FitError::FlatModel(params))?;
            scale = scale.zip_map(&jtj.diagonal(), f64::max);
            let damped = jtj + Matrix2::from_diagonal(&(scale * lambda));
            let Some(delta) = damped
                .lu()
                .solve(&jtr)
                .filter(|delta| delta.iter().all(|v| v.is_finite()))
            else {
                lambda *= lambda_up;
                if lambda > MAX_LAMBDA {
                    return Err(FitError::Diverged { iterations, lambda });
                }
                continue;
            };

            let p = Vector2::new(params.c, params.d);
            let q = p + delta;
            let small_step = delta.norm() <= xtol * (p.norm() + xtol);
            let trial = project(q[0], q[1], x, y).map(|new_params| {
                let new_rss = rss(&new_params, x, y);
                (new_params, new_rss)
            });

            match trial {
                Some((new_params, new_rss)) if new_rss.is_finite() && new_rss < prev_rss => {
                    let reduction = prev_rss - new_rss;
                    params = new_params;
                    prev_rss = new_rss;
                    lambda *= lambda_down;
                    if small_step || reduction <= ftol * new_rss {
                        converged = true;
                        break;
                    }
                }
                _ => {
                    if small_step {
                        converged = true;
                        break;
                    }
                    lambda *= lambda_up;
                    if lambda > MAX_LAMBDA {
                        return Err(FitError::Diverged { iterations, lambda });
                    }
                }
            }
        }
        if !converged {
            return Err(FitError::NotConverged {
                iterations,
                rss: prev_rss,
            });
        }
        if !params.is_finite() {
            return Err(FitError::NonFinite(params));
        }
        log::info!("fit converged in {iterations} iterations: {params} (RSS={prev_rss:e})");

        let inv_jtj = information_matrix(&params, x)
            .try_inverse()
            .ok_or(FitError::Singular)?;
        let dof = n - N_PARAMS;
        let covariance = if dof > 0 {
            inv_jtj * (prev_rss / dof as f64)
        } else {
            log::warn!("no degrees of freedom left, the covariance is undefined");
            Matrix4::repeat(f64::INFINITY)
        };

        Ok(SigmoidFit {
            params,
            covariance,
            rss: prev_rss,
            iterations,
        })
    }
}

/// Fits the sigmoid to the edge scan with the default optimizer settings
pub fn fit_sigmoid(scan: &EdgeScan, guess: SigmoidParams) -> Result<SigmoidFit> {
    SigmoidFitter::default().fit(scan, guess)
}
