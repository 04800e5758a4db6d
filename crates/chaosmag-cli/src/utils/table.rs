use crate::error::{CliError, Result};
use chaosmag::core::coordinates::Position;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// One query point of the `eval` input file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PointRecord {
    /// MJD2000.
    pub time: f64,
    /// km.
    pub radius: f64,
    /// Colatitude (degrees).
    pub theta: f64,
    /// Longitude (degrees).
    pub phi: f64,
}

impl PointRecord {
    pub fn position(&self) -> Position {
        Position::new(self.radius, self.theta, self.phi)
    }
}

pub fn read_points(path: &Path) -> Result<Vec<PointRecord>> {
    let csv_error = |source| CliError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(csv_error)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<PointRecord>, _>>()
        .map_err(csv_error)
}

/// CSV writer on a file, or on standard output when `path` is `None`.
pub fn writer(path: Option<&Path>) -> Result<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match path {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    Ok(csv::Writer::from_writer(sink))
}

/// Writes one row of numbers with the given precision.
pub fn write_numbers<W: Write>(
    writer: &mut csv::Writer<W>,
    values: impl IntoIterator<Item = f64>,
    path: Option<&Path>,
) -> Result<()> {
    let row: Vec<String> = values.into_iter().map(|v| format!("{:.6}", v)).collect();
    writer.write_record(&row).map_err(|source| CliError::Csv {
        path: path.map(Path::to_path_buf).unwrap_or_else(|| "<stdout>".into()),
        source,
    })
}
