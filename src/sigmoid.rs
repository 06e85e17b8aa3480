//! Four-parameter logistic edge model
//!
//! y = a + (b - a) / (1 + exp(-c (x - d)))

use std::{fmt, num::ParseFloatError, str::FromStr};

/// Logistic curve parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidParams {
    /// Asymptote as x → -∞ (for c > 0)
    pub a: f64,
    /// Asymptote as x → +∞ (for c > 0)
    pub b: f64,
    /// Steepness
    pub c: f64,
    /// Inflection location
    pub d: f64,
}
impl Default for SigmoidParams {
    /// The seed used for edge scans that go from high to low intensity
    fn default() -> Self {
        Self {
            a: 0.4,
            b: 0.,
            c: 1.,
            d: 0.,
        }
    }
}
impl SigmoidParams {
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }
    /// Logistic factor 1 / (1 + exp(-c (x - d)))
    #[inline]
    pub fn logistic(&self, x: f64) -> f64 {
        (1. + (-self.c * (x - self.d)).exp()).recip()
    }
    /// Model value at `x`
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.a + (self.b - self.a) * self.logistic(x)
    }
    /// Model values at each `x`
    pub fn eval_all(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&x| self.eval(x)).collect()
    }
    /// Analytic derivative dy/dx
    pub fn derivative(&self, x: f64) -> f64 {
        let s = self.logistic(x);
        (self.b - self.a) * self.c * s * (1. - s)
    }
    /// Partial derivatives with respect to (a, b, c, d)
    pub fn gradient(&self, x: f64) -> [f64; 4] {
        let s = self.logistic(x);
        let ds = (self.b - self.a) * s * (1. - s);
        [1. - s, s, ds * (x - self.d), -ds * self.c]
    }
    /// Full width at half maximum of the analytic derivative
    ///
    /// s(1 - s) halves at s = (1 ± 1/√2) / 2, i.e. |c (x - d)| = ln(3 + 2√2)
    pub fn derivative_fwhm(&self) -> f64 {
        2. * (3. + 2. * 2f64.sqrt()).ln() / self.c.abs()
    }
    pub fn is_finite(&self) -> bool {
        self.as_array().iter().all(|p| p.is_finite())
    }
    pub fn as_array(&self) -> [f64; 4] {
        [self.a, self.b, self.c, self.d]
    }
}
impl From<[f64; 4]> for SigmoidParams {
    fn from([a, b, c, d]: [f64; 4]) -> Self {
        Self { a, b, c, d }
    }
}
impl From<SigmoidParams> for [f64; 4] {
    fn from(p: SigmoidParams) -> Self {
        p.as_array()
    }
}
impl fmt::Display for SigmoidParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a={:.6}, b={:.6}, c={:.6}, d={:.6}",
            self.a, self.b, self.c, self.d
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SigmoidParamsError {
    #[error("expected 4 comma separated values, found {0}")]
    Count(usize),
    #[error("failed to parse sigmoid parameter")]
    Parse(#[from] ParseFloatError),
}
/// Parses "a,b,c,d"
impl FromStr for SigmoidParams {
    type Err = SigmoidParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<f64>, ParseFloatError>>()?;
        match values.as_slice() {
            &[a, b, c, d] => Ok(Self { a, b, c, d }),
            _ => Err(SigmoidParamsError::Count(values.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn asymptotes_and_inflection() {
        let p = SigmoidParams::new(0.9, 0.1, 4., 0.5);
        assert_relative_eq!(p.eval(-1e3), 0.9);
        assert_relative_eq!(p.eval(1e3), 0.1);
        assert_relative_eq!(p.eval(0.5), 0.5);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let p = SigmoidParams::new(0.8, 0.05, 2.5, -0.2);
        let x = 0.13;
        let h = 1e-6;
        let grad = p.gradient(x);
        for k in 0..4 {
            let mut up = p.as_array();
            let mut down = p.as_array();
            up[k] += h;
            down[k] -= h;
            let fd =
                (SigmoidParams::from(up).eval(x) - SigmoidParams::from(down).eval(x)) / (2. * h);
            assert_relative_eq!(grad[k], fd, epsilon = 1e-6);
        }
    }

    #[test]
    fn derivative_peak_and_width() {
        let p = SigmoidParams::new(1., 0., 3., 0.);
        let peak = p.derivative(0.);
        assert_relative_eq!(peak, -0.75);
        let half = p.derivative_fwhm() / 2.;
        assert_relative_eq!(p.derivative(half), peak / 2., epsilon = 1e-12);
    }

    #[test]
    fn parse_guess() {
        let p: SigmoidParams = "0.4, 0, 1,0".parse().unwrap();
        assert_eq!(p, SigmoidParams::default());
        assert!(matches!(
            "1,2,3".parse::<SigmoidParams>(),
            Err(SigmoidParamsError::Count(3))
        ));
        assert!("1,2,x,4".parse::<SigmoidParams>().is_err());
    }
}
