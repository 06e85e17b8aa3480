/*!
# Edge PSF

Point spread function (PSF) and full width at half maximum (FWHM) estimation
from an edge response scan.

The edge scan is fitted with a 4 parameters logistic curve, the derivative of the fit
sampled on a dense grid gives the PSF which is centered on its peak and rescaled,
and the FWHM is derived from the leading half of the PSF.

```rust,no_run
use edge_psf::{Config, EdgeAnalysis, EdgeScanLoader};

let scan = EdgeScanLoader::default().path("psfData.mat").load()?;
let analysis = EdgeAnalysis::new(Config::default()).run(&scan)?;
println!("{}", analysis.fwhm.title(&analysis.unit_label));
# Ok::<(), edge_psf::Error>(())
```
*/

pub mod edge_scan;
mod error;
pub mod fit;
pub mod fwhm;
#[cfg(feature = "plot")]
pub mod plot;
pub mod psf;
pub mod sigmoid;

pub use edge_scan::{EdgeScan, EdgeScanLoader};
pub use error::Error;
pub use fit::{FitConfig, SigmoidFit, SigmoidFitter};
pub use fwhm::Fwhm;
pub use psf::{EdgeDirection, PsfConfig, PsfCurve, PsfExtractor};
pub use sigmoid::SigmoidParams;

type Result<T> = std::result::Result<T, Error>;

/// Edge analysis configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Seed of the sigmoid fit
    pub initial_guess: SigmoidParams,
    pub fit: FitConfig,
    pub psf: PsfConfig,
    /// Label of the PSF position unit
    pub unit_label: String,
    /// Render the edge scan against the fitted sigmoid
    pub show_fit_diagnostic: bool,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            initial_guess: SigmoidParams::default(),
            fit: FitConfig::default(),
            psf: PsfConfig::default(),
            unit_label: String::from("microns"),
            show_fit_diagnostic: false,
        }
    }
}
impl Config {
    pub fn initial_guess(self, initial_guess: SigmoidParams) -> Self {
        Self {
            initial_guess,
            ..self
        }
    }
    pub fn direction(mut self, direction: EdgeDirection) -> Self {
        self.psf.direction = direction;
        self
    }
    /// Sets the position scaling factor and the name of the scaled unit
    pub fn unit(mut self, unit_scale: f64, unit_label: impl ToString) -> Self {
        self.psf.unit_scale = unit_scale;
        self.unit_label = unit_label.to_string();
        self
    }
    pub fn grid_size(mut self, grid_size: usize) -> Self {
        self.psf.grid_size = grid_size;
        self
    }
    pub fn show_fit_diagnostic(self, show_fit_diagnostic: bool) -> Self {
        Self {
            show_fit_diagnostic,
            ..self
        }
    }
}

/// Results of the edge analysis
#[derive(Debug, Clone)]
pub struct Analysis {
    pub fit: SigmoidFit,
    pub psf: PsfCurve,
    pub fwhm: Fwhm,
    /// Label of the PSF position unit
    pub unit_label: String,
}
impl Analysis {
    pub fn summary(&self) {
        let SigmoidFit {
            params,
            rss,
            iterations,
            ..
        } = &self.fit;
        let std = self.fit.std_errors();
        println!("SUMMARY:");
        println!(" - sigmoid fit ({} iterations, RSS={:.3e}):", iterations, rss);
        for ((name, value), std) in ["a", "b", "c", "d"]
            .into_iter()
            .zip(params.as_array())
            .zip(std)
        {
            println!("  - {}: {:>12.6} +/- {:.3e}", name, value, std);
        }
        println!(" - # of PSF samples: {}", self.psf.len());
        println!(" - peak density: {:.6e}", self.psf.peak().1);
        println!(" - {}", self.fwhm.title(&self.unit_label));
    }
}

/// Edge scan to FWHM pipeline
#[derive(Debug, Clone, Default)]
pub struct EdgeAnalysis {
    config: Config,
}
impl EdgeAnalysis {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    /// Fits the edge, extracts the PSF and computes its FWHM
    pub fn run(&self, scan: &EdgeScan) -> Result<Analysis> {
        let Config {
            initial_guess,
            fit,
            psf,
            ..
        } = &self.config;
        let fit = SigmoidFitter::new(fit.clone()).fit(scan, *initial_guess)?;
        if self.config.show_fit_diagnostic {
            let max_residual = scan
                .iter()
                .map(|(x, y)| (y - fit.params.eval(x)).abs())
                .fold(0f64, f64::max);
            log::info!(
                "fit diagnostic: {} samples, RSS={:.3e}, max |residual|={:.3e}",
                scan.len(),
                fit.rss,
                max_residual
            );
        }
        let psf = PsfExtractor::new(psf.clone()).extract(&fit.params, scan.x_range())?;
        let fwhm = Fwhm::from_psf(&psf)?;
        let unit_label = self.config.unit_label.clone();
        log::info!("{}", fwhm.title(&unit_label));
        Ok(Analysis {
            fit,
            psf,
            fwhm,
            unit_label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fit::FitError, fwhm::FwhmError};

    fn scan(params: SigmoidParams) -> EdgeScan {
        let x = psf::linspace(-2., 2., 120);
        let y = params.eval_all(&x);
        EdgeScan::new(x, y).unwrap()
    }

    #[test]
    fn falling_edge() {
        let truth = SigmoidParams::new(0.93, 0.03, 6., 0.25);
        let analysis = EdgeAnalysis::default().run(&scan(truth)).unwrap();
        assert_eq!(analysis.psf.len(), 999);
        assert_eq!(analysis.psf.peak().0, 0.);
        let h = 4. / 999. * 1e3;
        let expected = truth.derivative_fwhm() * 1e3;
        assert!((analysis.fwhm.width - expected).abs() <= 2. * h + 1.);
        assert_eq!(analysis.fwhm.width, analysis.fwhm.width.round());
    }

    #[test]
    fn unit_scale() {
        let truth = SigmoidParams::new(0.93, 0.03, 6., 0.25);
        let config = Config::default().unit(1., "mm");
        let analysis = EdgeAnalysis::new(config).run(&scan(truth)).unwrap();
        assert!(analysis.fwhm.raw_width > 0.5 && analysis.fwhm.raw_width < 0.7);
        assert_eq!(analysis.fwhm.width, 1.);
        assert_eq!(analysis.unit_label, "mm");
    }

    #[test]
    fn millimetre_edge() {
        let truth = SigmoidParams::new(0.95, 0.05, 100., 0.01);
        let x = psf::linspace(-0.2, 0.2, 200);
        let y = truth.eval_all(&x);
        let analysis = EdgeAnalysis::default()
            .run(&EdgeScan::new(x, y).unwrap())
            .unwrap();
        assert_eq!(analysis.psf.peak().0, 0.);
        let h = 0.4 / 999. * 1e3;
        let expected = truth.derivative_fwhm() * 1e3;
        assert!((analysis.fwhm.width - expected).abs() <= 2. * h + 1.);
        assert_eq!(analysis.unit_label, "microns");
    }

    #[test]
    fn rising_edge_needs_direction() {
        let truth = SigmoidParams::new(0.03, 0.93, 6., 0.25);
        let err = EdgeAnalysis::default().run(&scan(truth));
        assert!(matches!(err, Err(Error::Fwhm(FwhmError::NonPositivePeak(_)))));

        let config = Config::default().direction(EdgeDirection::Increasing);
        let analysis = EdgeAnalysis::new(config).run(&scan(truth)).unwrap();
        assert!(analysis.psf.peak().1 > 0.);
    }

    #[test]
    fn constant_edge_fails() {
        let x = psf::linspace(-2., 2., 50);
        let scan = EdgeScan::new(x, vec![0.7; 50]).unwrap();
        let err = EdgeAnalysis::default().run(&scan);
        assert!(matches!(err, Err(Error::Fit(FitError::ConstantResponse))));
    }
}
