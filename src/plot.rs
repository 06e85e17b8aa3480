//! PSF and sigmoid fit plots

use std::path::Path;

use plotters::prelude::*;

use crate::{EdgeScan, Fwhm, PsfCurve, SigmoidParams};

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("failed to draw {0:?}: {1}")]
    Drawing(String, String),
    #[error("nothing to plot")]
    Empty,
}
type Result<T> = std::result::Result<T, PlotError>;

fn minmax(x: &[f64]) -> (f64, f64) {
    let max_value = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_value = x.iter().cloned().fold(f64::INFINITY, f64::min);
    (min_value, max_value)
}
fn padded((min, max): (f64, f64)) -> std::ops::Range<f64> {
    let pad = (max - min).abs().max(f64::EPSILON) * 1e-2;
    min - pad..max + pad
}

/// Renders the PSF with a grid overlay and the FWHM in the title
pub fn psf<P: AsRef<Path>>(
    psf: &PsfCurve,
    fwhm: &Fwhm,
    unit_label: &str,
    filename: P,
) -> Result<()> {
    if psf.is_empty() {
        return Err(PlotError::Empty);
    }
    let filename = filename.as_ref();
    let err = |e: &dyn std::fmt::Display| {
        PlotError::Drawing(filename.display().to_string(), e.to_string())
    };

    let plot = SVGBackend::new(filename, (768, 512)).into_drawing_area();
    plot.fill(&WHITE).map_err(|e| err(&e))?;

    let mut chart = ChartBuilder::on(&plot)
        .caption(fwhm.title(unit_label), ("sans-serif", 24))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(
            padded(minmax(psf.position())),
            padded(minmax(psf.density())),
        )
        .map_err(|e| err(&e))?;
    chart
        .configure_mesh()
        .x_desc(format!("Position [{}]", unit_label))
        .y_desc("PSF")
        .draw()
        .map_err(|e| err(&e))?;
    chart
        .draw_series(LineSeries::new(psf.iter(), &BLACK))
        .map_err(|e| err(&e))?;
    plot.present().map_err(|e| err(&e))?;
    log::info!("PSF plot saved to {:?}", filename);
    Ok(())
}

/// Renders the edge scan samples against the fitted sigmoid
pub fn fit<P: AsRef<Path>>(scan: &EdgeScan, params: &SigmoidParams, filename: P) -> Result<()> {
    if scan.is_empty() {
        return Err(PlotError::Empty);
    }
    let filename = filename.as_ref();
    let err = |e: &dyn std::fmt::Display| {
        PlotError::Drawing(filename.display().to_string(), e.to_string())
    };

    let plot = SVGBackend::new(filename, (768, 512)).into_drawing_area();
    plot.fill(&WHITE).map_err(|e| err(&e))?;

    let x_range = scan.x_range();
    let x_fit = crate::psf::linspace(x_range.0, x_range.1, 500);
    let y_fit = params.eval_all(&x_fit);
    let (y_min, y_max) = scan.y_range();
    let (f_min, f_max) = minmax(&y_fit);

    let mut chart = ChartBuilder::on(&plot)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(
            padded(x_range),
            padded((y_min.min(f_min), y_max.max(f_max))),
        )
        .map_err(|e| err(&e))?;
    chart
        .configure_mesh()
        .x_desc("Position")
        .y_desc("Intensity")
        .draw()
        .map_err(|e| err(&e))?;

    let mut colors = colorous::TABLEAU10.iter();
    let data_color = colors
        .next()
        .map(|c| RGBColor(c.r, c.g, c.b))
        .unwrap_or(BLUE);
    let fit_color = colors
        .next()
        .map(|c| RGBColor(c.r, c.g, c.b))
        .unwrap_or(RED);
    chart
        .draw_series(
            scan.iter()
                .map(|(x, y)| Circle::new((x, y), 3, data_color.filled())),
        )
        .map_err(|e| err(&e))?
        .label("data")
        .legend(move |(x, y)| Circle::new((x + 10, y), 3, data_color.filled()));
    chart
        .draw_series(LineSeries::new(x_fit.into_iter().zip(y_fit), &fit_color))
        .map_err(|e| err(&e))?
        .label("fit")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &fit_color));
    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(|e| err(&e))?;
    plot.present().map_err(|e| err(&e))?;
    log::info!("fit diagnostic plot saved to {:?}", filename);
    Ok(())
}
