use std::path::PathBuf;

use edge_psf::{Config, EdgeAnalysis, EdgeDirection, EdgeScanLoader, SigmoidParams};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "edge-psf", about = "PSF and FWHM from an edge response scan")]
struct Opt {
    /// Path to the edge scan file (.mat or .csv)
    #[structopt(long, default_value = "psfData.mat")]
    path: PathBuf,
    /// MATLAB structure holding the edge scan
    #[structopt(long, default_value = "psfData")]
    record: String,
    /// Position field (or CSV column)
    #[structopt(long, default_value = "x")]
    x_field: String,
    /// Response field (or CSV column)
    #[structopt(long, default_value = "y")]
    y_field: String,
    /// Sigmoid fit initial guess: a,b,c,d (the asymptotes are solved from c and d)
    #[structopt(short, long)]
    guess: Option<SigmoidParams>,
    /// Edge intensity direction as the position increases: increasing or decreasing
    #[structopt(short, long, default_value = "decreasing")]
    direction: EdgeDirection,
    /// PSF position scaling factor
    #[structopt(long, default_value = "1000")]
    unit_scale: f64,
    /// PSF position unit
    #[structopt(long, default_value = "microns")]
    unit_label: String,
    /// Number of PSF grid points
    #[structopt(long, default_value = "1000")]
    grid_size: usize,
    /// Plot the edge scan against the fitted sigmoid
    #[structopt(long)]
    show_fit_diagnostic: bool,
    /// Plot the PSF to this SVG file
    #[structopt(short, long)]
    plot: Option<PathBuf>,
    /// Save the PSF to this CSV file
    #[structopt(long)]
    csv: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();
    log::debug!("{:?}", opt);

    let scan = EdgeScanLoader::default()
        .path(&opt.path)
        .record(&opt.record)
        .fields(&opt.x_field, &opt.y_field)
        .load()?;

    let mut config = Config::default()
        .direction(opt.direction)
        .unit(opt.unit_scale, &opt.unit_label)
        .grid_size(opt.grid_size)
        .show_fit_diagnostic(opt.show_fit_diagnostic);
    if let Some(guess) = opt.guess {
        config = config.initial_guess(guess);
    }

    let pipeline = EdgeAnalysis::new(config);
    let analysis = pipeline.run(&scan)?;
    analysis.summary();

    if let Some(path) = &opt.csv {
        analysis.psf.to_csv(path)?;
    }

    #[cfg(feature = "plot")]
    {
        use edge_psf::plot;
        if let Some(path) = &opt.plot {
            plot::psf(&analysis.psf, &analysis.fwhm, &analysis.unit_label, path)?;
        }
        if pipeline.config().show_fit_diagnostic {
            plot::fit(&scan, &analysis.fit.params, opt.path.with_extension("fit.svg"))?;
        }
    }
    #[cfg(not(feature = "plot"))]
    if opt.plot.is_some() || pipeline.config().show_fit_diagnostic {
        log::warn!("plotting requires the `plot` feature, no plot rendered");
    }

    Ok(())
}
