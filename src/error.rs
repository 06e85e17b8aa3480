use crate::{edge_scan::EdgeScanError, fit::FitError, fwhm::FwhmError, psf::PsfError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `edge_scan` module")]
    EdgeScan(#[from] EdgeScanError),
    #[error("Error in the `fit` module")]
    Fit(#[from] FitError),
    #[error("Error in the `psf` module")]
    Psf(#[from] PsfError),
    #[error("Error in the `fwhm` module")]
    Fwhm(#[from] FwhmError),
    #[cfg(feature = "plot")]
    #[error("Error in the `plot` module")]
    Plot(#[from] crate::plot::PlotError),
}
