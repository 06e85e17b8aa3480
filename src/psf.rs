//! Point spread function
//!
//! The PSF is the derivative of the fitted edge response, sampled on a uniform grid
//! spanning the edge scan, centered on its peak and rescaled to the output unit.

use std::path::Path;

use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::SigmoidParams;

#[derive(Debug, thiserror::Error)]
pub enum PsfError {
    #[error("the edge scan spans a single position ({0}), the PSF grid is empty")]
    ZeroSpan(f64),
    #[error("the PSF grid needs at least 3 points, found {0}")]
    GridSize(usize),
    #[error("the PSF has non-finite densities")]
    NonFinite,
    #[error("positions and densities lengths do not match: {0} vs {1}")]
    LengthMismatch(usize, usize),
    #[error("the PSF is empty")]
    Empty,
    #[error("failed to write the PSF to CSV")]
    Csv(#[from] csv::Error),
}
type Result<T> = std::result::Result<T, PsfError>;

/// Intensity direction of the edge as the position increases
///
/// The PSF is oriented assuming the given direction, it is not detected from the data:
/// a mismatch yields an inverted PSF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EdgeDirection {
    /// Low to high intensity
    Increasing,
    /// High to low intensity, the derivative is negated
    #[default]
    Decreasing,
}
impl EdgeDirection {
    fn sign(&self) -> f64 {
        match self {
            EdgeDirection::Increasing => 1.,
            EdgeDirection::Decreasing => -1.,
        }
    }
}

/// PSF sampling settings
#[derive(Debug, Clone)]
pub struct PsfConfig {
    /// Number of grid points spanning the edge scan
    pub grid_size: usize,
    pub direction: EdgeDirection,
    /// Position scaling factor applied after centering (mm to micron by default)
    pub unit_scale: f64,
}
impl Default for PsfConfig {
    fn default() -> Self {
        Self {
            grid_size: 1000,
            direction: EdgeDirection::Decreasing,
            unit_scale: 1e3,
        }
    }
}

#[derive(Serialize)]
struct Record {
    position: f64,
    density: f64,
}

/// PSF samples
#[derive(Debug, Clone)]
pub struct PsfCurve {
    position: Vec<f64>,
    density: Vec<f64>,
    peak: usize,
}
fn first_max(density: &[f64]) -> usize {
    density
        .iter()
        .enumerate()
        .fold(0, |k, (i, &d)| if d > density[k] { i } else { k })
}

impl PsfCurve {
    /// Creates a PSF from samples that are already centered and scaled
    pub fn from_samples(position: Vec<f64>, density: Vec<f64>) -> Result<Self> {
        if position.len() != density.len() {
            return Err(PsfError::LengthMismatch(position.len(), density.len()));
        }
        if density.is_empty() {
            return Err(PsfError::Empty);
        }
        if density.iter().any(|d| !d.is_finite()) {
            return Err(PsfError::NonFinite);
        }
        let peak = first_max(&density);
        Ok(Self {
            position,
            density,
            peak,
        })
    }
    /// Centered and rescaled positions
    pub fn position(&self) -> &[f64] {
        &self.position
    }
    pub fn density(&self) -> &[f64] {
        &self.density
    }
    /// Index of the first maximum density
    pub fn peak_index(&self) -> usize {
        self.peak
    }
    /// Returns the (position,density) at the peak
    pub fn peak(&self) -> (f64, f64) {
        (self.position[self.peak], self.density[self.peak])
    }
    pub fn len(&self) -> usize {
        self.density.len()
    }
    pub fn is_empty(&self) -> bool {
        self.density.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.position.iter().cloned().zip(self.density.iter().cloned())
    }
    /// Writes the PSF as `position,density` records
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        for (position, density) in self.iter() {
            wtr.serialize(Record { position, density })?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

/// Uniform grid of `n` points from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![start; n];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n)
        .map(|i| if i + 1 == n { end } else { start + step * i as f64 })
        .collect()
}

/// PSF extraction from a fitted edge response
#[derive(Debug, Clone, Default)]
pub struct PsfExtractor {
    config: PsfConfig,
}
impl PsfExtractor {
    pub fn new(config: PsfConfig) -> Self {
        Self { config }
    }
    /// Differentiates the sigmoid over `[x_min,x_max]` and centers the result on its peak
    pub fn extract(&self, params: &SigmoidParams, (x_min, x_max): (f64, f64)) -> Result<PsfCurve> {
        let PsfConfig {
            grid_size,
            direction,
            unit_scale,
        } = self.config;
        if grid_size < 3 {
            return Err(PsfError::GridSize(grid_size));
        }
        if x_min.is_nan() || x_max.is_nan() || x_max <= x_min {
            return Err(PsfError::ZeroSpan(x_min));
        }

        let grid = linspace(x_min, x_max, grid_size);
        let edge = params.eval_all(&grid);
        let sign = direction.sign();
        let density: Vec<f64> = grid
            .windows(2)
            .zip(edge.windows(2))
            .map(|(x, s)| sign * (s[1] - s[0]) / (x[1] - x[0]))
            .collect();
        if density.iter().any(|d| !d.is_finite()) {
            return Err(PsfError::NonFinite);
        }

        let peak = first_max(&density);
        let x0 = grid[peak + 1];
        let position: Vec<f64> = grid[1..].iter().map(|&x| (x - x0) * unit_scale).collect();
        log::debug!(
            "PSF peak #{peak} at {x0} with density {:e} ({direction} edge)",
            density[peak]
        );
        if density[peak] <= 0. {
            log::warn!("the PSF peak is not positive, is the edge direction ({direction}) right?");
        }

        Ok(PsfCurve {
            position,
            density,
            peak,
        })
    }
}
