//! Full width at half maximum
//!
//! Only the leading half of the PSF, before the peak, is searched for the half maximum
//! crossing and the width is twice the distance of that crossing to the peak.

use std::fmt;

use itertools::Itertools;

use crate::PsfCurve;

#[derive(Debug, thiserror::Error)]
pub enum FwhmError {
    #[error("the PSF peaks at its first sample, there is no leading half")]
    PeakAtStart,
    #[error("the PSF peak density ({0:e}) is not positive, the edge direction is likely wrong")]
    NonPositivePeak(f64),
}
type Result<T> = std::result::Result<T, FwhmError>;

/// PSF full width at half maximum
#[derive(Debug, Clone, PartialEq)]
pub struct Fwhm {
    /// Width rounded to the nearest integer, ties to even
    pub width: f64,
    /// Width before rounding
    pub raw_width: f64,
    /// Index of the half maximum crossing in the PSF
    pub crossing: usize,
}
impl Fwhm {
    /// Computes the FWHM of the PSF
    pub fn from_psf(psf: &PsfCurve) -> Result<Self> {
        let peak = psf.peak_index();
        let (_, max_density) = psf.peak();
        if max_density <= 0. {
            return Err(FwhmError::NonPositivePeak(max_density));
        }
        let half_max = max_density / 2.;
        let crossing = psf.density()[..peak]
            .iter()
            .position_min_by(|a, b| (*a - half_max).abs().total_cmp(&(*b - half_max).abs()))
            .ok_or(FwhmError::PeakAtStart)?;
        let raw_width = 2. * psf.position()[crossing].abs();
        log::debug!("half maximum crossing #{crossing}, FWHM={raw_width}");
        Ok(Self {
            width: raw_width.round_ties_even(),
            raw_width,
            crossing,
        })
    }
    /// Formats the FWHM with `unit`
    pub fn title(&self, unit: &str) -> String {
        format!("FWHM = {} {}!", self.width, unit)
    }
}
impl fmt::Display for Fwhm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PsfConfig, PsfExtractor, SigmoidParams};

    #[test]
    fn leading_half_only() {
        // the trailing half is narrower, it must be ignored
        let psf = PsfCurve::from_samples(
            vec![-30., -20., -10., 0., 5., 10.],
            vec![0.1, 0.5, 0.8, 1.0, 0.5, 0.0],
        )
        .unwrap();
        let fwhm = Fwhm::from_psf(&psf).unwrap();
        assert_eq!(fwhm.crossing, 1);
        assert_eq!(fwhm.width, 40.);
        assert_eq!(fwhm.title("microns"), "FWHM = 40 microns!");
    }

    #[test]
    fn rounds_ties_to_even() {
        let psf =
            PsfCurve::from_samples(vec![-1.25, -0.5, 0., 1.], vec![0.5, 0.7, 1., 0.2]).unwrap();
        let fwhm = Fwhm::from_psf(&psf).unwrap();
        assert_eq!(fwhm.raw_width, 2.5);
        assert_eq!(fwhm.width, 2.);
        let psf =
            PsfCurve::from_samples(vec![-1.75, -0.5, 0., 1.], vec![0.5, 0.7, 1., 0.2]).unwrap();
        assert_eq!(Fwhm::from_psf(&psf).unwrap().width, 4.);
    }

    #[test]
    fn first_of_equally_close_samples() {
        let psf =
            PsfCurve::from_samples(vec![-3., -2., -1., 0.], vec![0.25, 0.75, 0.9, 1.]).unwrap();
        assert_eq!(Fwhm::from_psf(&psf).unwrap().crossing, 0);
    }

    #[test]
    fn peak_at_start_fails() {
        let psf = PsfCurve::from_samples(vec![0., 1., 2.], vec![1., 0.5, 0.1]).unwrap();
        assert!(matches!(Fwhm::from_psf(&psf), Err(FwhmError::PeakAtStart)));
    }

    #[test]
    fn inverted_psf_fails() {
        let rising = SigmoidParams::new(0.05, 0.95, 8., 0.2);
        let psf = PsfExtractor::default().extract(&rising, (-1., 1.)).unwrap();
        assert!(matches!(
            Fwhm::from_psf(&psf),
            Err(FwhmError::NonPositivePeak(_))
        ));
    }

    #[test]
    fn logistic_closed_form() {
        let (x_min, x_max) = (-1., 1.);
        let config = PsfConfig::default();
        let h = (x_max - x_min) / (config.grid_size - 1) as f64 * config.unit_scale;
        for c in [5., 8., 12.] {
            let params = SigmoidParams::new(0.9, 0.1, c, 0.15);
            let psf = PsfExtractor::new(config.clone())
                .extract(&params, (x_min, x_max))
                .unwrap();
            let fwhm = Fwhm::from_psf(&psf).unwrap();
            let expected = params.derivative_fwhm() * config.unit_scale;
            assert!(
                (fwhm.width - expected).abs() <= 2. * h + 1.,
                "c={c}: {} vs {expected}",
                fwhm.width
            );
        }
    }
}
