//! Edge scan data
//!
//! Loads the edge response profile, positions `x` and normalized intensities `y`,
//! from either a MATLAB file (`matio-rs` feature) or a CSV file.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use itertools::{Itertools, MinMaxResult};

#[derive(Debug, thiserror::Error)]
pub enum EdgeScanError {
    #[error("failed to open the edge scan file {1:?}")]
    Io(#[source] io::Error, PathBuf),
    #[error("failed to read the CSV edge scan")]
    Csv(#[from] csv::Error),
    #[cfg(feature = "matio-rs")]
    #[error("failed to read the MATLAB edge scan")]
    Mat(#[from] matio_rs::MatioError),
    #[error("unsupported edge scan file extension: {0:?}")]
    Extension(PathBuf),
    #[error("field {0:?} not found in the edge scan")]
    MissingField(String),
    #[error("failed to parse {value:?} in field {field:?} at row {row}")]
    Parse {
        field: String,
        row: usize,
        value: String,
    },
    #[error("x and y lengths do not match: {x} vs {y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("the edge scan is empty")]
    Empty,
}
type Result<T> = std::result::Result<T, EdgeScanError>;

/// Edge response samples
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeScan {
    x: Vec<f64>,
    y: Vec<f64>,
}
impl EdgeScan {
    /// Creates an edge scan from positions and responses of the same length
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(EdgeScanError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.is_empty() {
            return Err(EdgeScanError::Empty);
        }
        Ok(Self { x, y })
    }
    pub fn x(&self) -> &[f64] {
        &self.x
    }
    pub fn y(&self) -> &[f64] {
        &self.y
    }
    pub fn len(&self) -> usize {
        self.x.len()
    }
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
    /// Returns the (min,max) positions
    pub fn x_range(&self) -> (f64, f64) {
        match self.x.iter().cloned().minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::MinMax(min, max) => (min, max),
            MinMaxResult::OneElement(x) => (x, x),
            MinMaxResult::NoElements => (f64::NAN, f64::NAN),
        }
    }
    /// Returns the (min,max) responses
    pub fn y_range(&self) -> (f64, f64) {
        match self.y.iter().cloned().minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::MinMax(min, max) => (min, max),
            MinMaxResult::OneElement(y) => (y, y),
            MinMaxResult::NoElements => (f64::NAN, f64::NAN),
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().cloned().zip(self.y.iter().cloned())
    }
}

/// Edge scan loader
///
/// Defaults to the `psfData` structure in `psfData.mat` with the `x` and `y` fields
pub struct EdgeScanLoader {
    path: PathBuf,
    record: String,
    x_field: String,
    y_field: String,
}
impl Default for EdgeScanLoader {
    fn default() -> Self {
        Self {
            path: PathBuf::from("psfData.mat"),
            record: String::from("psfData"),
            x_field: String::from("x"),
            y_field: String::from("y"),
        }
    }
}
impl EdgeScanLoader {
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..self
        }
    }
    /// Sets the name of the MATLAB structure holding the fields
    pub fn record(self, record: impl ToString) -> Self {
        Self {
            record: record.to_string(),
            ..self
        }
    }
    /// Sets the names of the position and response fields (or CSV columns)
    pub fn fields(self, x_field: impl ToString, y_field: impl ToString) -> Self {
        Self {
            x_field: x_field.to_string(),
            y_field: y_field.to_string(),
            ..self
        }
    }
    pub fn load(self) -> Result<EdgeScan> {
        log::info!("Loading {:?}...", self.path);
        let scan = match self.path.extension().and_then(|e| e.to_str()) {
            Some("csv") => self.load_csv()?,
            #[cfg(feature = "matio-rs")]
            Some("mat") => self.load_mat()?,
            _ => return Err(EdgeScanError::Extension(self.path)),
        };
        log::info!("... loaded {} samples", scan.len());
        Ok(scan)
    }
    fn load_csv(&self) -> Result<EdgeScan> {
        let file = File::open(&self.path).map_err(|e| EdgeScanError::Io(e, self.path.clone()))?;
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| EdgeScanError::MissingField(name.to_string()))
        };
        let (ix, iy) = (column(&self.x_field)?, column(&self.y_field)?);

        let parse = |field: &str, row: usize, value: Option<&str>| {
            let value = value.unwrap_or_default();
            value.parse::<f64>().map_err(|_| EdgeScanError::Parse {
                field: field.to_string(),
                row,
                value: value.to_string(),
            })
        };
        let mut x = vec![];
        let mut y = vec![];
        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            x.push(parse(&self.x_field, row, record.get(ix))?);
            y.push(parse(&self.y_field, row, record.get(iy))?);
        }
        EdgeScan::new(x, y)
    }
    #[cfg(feature = "matio-rs")]
    fn load_mat(&self) -> Result<EdgeScan> {
        use matio_rs::{Mat, MatFile, MayBeInto};

        let mat_file = MatFile::load(&self.path)?;
        let record: Mat = mat_file
            .var(self.record.as_str())
            .map_err(|_| EdgeScanError::MissingField(self.record.clone()))?;
        let field = |name: &str| -> Result<Vec<f64>> {
            let value = record
                .field(name)
                .map_err(|_| EdgeScanError::MissingField(name.to_string()))?
                .into_iter()
                .next()
                .ok_or_else(|| EdgeScanError::MissingField(name.to_string()))?;
            Ok(value.maybe_into()?)
        };
        EdgeScan::new(field(&self.x_field)?, field(&self.y_field)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    fn write_csv(name: &str, contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("edge-psf_{}_{}.csv", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_csv() {
        let path = write_csv("load", "x,y\n-1.0,0.9\n0.0, 0.5\n1.0,0.1\n");
        let scan = EdgeScanLoader::default().path(&path).load().unwrap();
        fs::remove_file(path).unwrap();
        assert_eq!(scan.x(), &[-1., 0., 1.]);
        assert_eq!(scan.y(), &[0.9, 0.5, 0.1]);
        assert_eq!(scan.x_range(), (-1., 1.));
        assert_eq!(scan.y_range(), (0.1, 0.9));
    }

    #[test]
    fn load_csv_named_columns() {
        let path = write_csv("columns", "intensity,position\n0.9,2\n0.2,3\n");
        let scan = EdgeScanLoader::default()
            .path(&path)
            .fields("position", "intensity")
            .load()
            .unwrap();
        fs::remove_file(path).unwrap();
        assert_eq!(scan.x(), &[2., 3.]);
        assert_eq!(scan.y(), &[0.9, 0.2]);
    }

    #[test]
    fn missing_column() {
        let path = write_csv("missing", "x,z\n1,2\n");
        let err = EdgeScanLoader::default().path(&path).load();
        fs::remove_file(path).unwrap();
        assert!(matches!(err, Err(EdgeScanError::MissingField(f)) if f == "y"));
    }

    #[test]
    fn unparsable_value() {
        let path = write_csv("parse", "x,y\n1,2\n2,oops\n");
        let err = EdgeScanLoader::default().path(&path).load();
        fs::remove_file(path).unwrap();
        assert!(matches!(err, Err(EdgeScanError::Parse { row: 1, .. })));
    }

    #[test]
    fn empty_file() {
        let path = write_csv("empty", "x,y\n");
        let err = EdgeScanLoader::default().path(&path).load();
        fs::remove_file(path).unwrap();
        assert!(matches!(err, Err(EdgeScanError::Empty)));
    }

    #[test]
    fn missing_file() {
        let err = EdgeScanLoader::default()
            .path("does/not/exist.csv")
            .load();
        assert!(matches!(err, Err(EdgeScanError::Io(..))));
    }

    #[test]
    fn unsupported_extension() {
        let err = EdgeScanLoader::default().path("psfData.h5").load();
        assert!(matches!(err, Err(EdgeScanError::Extension(_))));
    }

    #[test]
    fn length_mismatch() {
        let err = EdgeScan::new(vec![0., 1., 2.], vec![1., 0.]);
        assert!(matches!(
            err,
            Err(EdgeScanError::LengthMismatch { x: 3, y: 2 })
        ));
    }
}
