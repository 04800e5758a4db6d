use super::traits::CoefficientFile;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RcIndexError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("RC index file contains no records")]
    Empty,
    #[error("RC index times must be strictly increasing (line {0})")]
    Unsorted(usize),
}

/// One hourly sample of the RC index.
#[derive(Debug, Clone, PartialEq)]
pub struct RcRecord {
    /// MJD2000.
    pub time: f64,
    pub rc: f64,
    /// External part.
    pub rc_e: f64,
    /// Induced internal part.
    pub rc_i: f64,
    /// Data quality flag as given in the file (e.g. `D` for definitive).
    pub flag: String,
}

pub struct RcIndexFile;

impl CoefficientFile for RcIndexFile {
    type Data = Vec<RcRecord>;
    type Options = ();
    type Error = RcIndexError;

    fn read_from(reader: &mut impl BufRead, _options: &Self::Options) -> Result<Self::Data, Self::Error> {
        let mut records: Vec<RcRecord> = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let fields: Vec<&str> = content.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(RcIndexError::Parse {
                    line: line_num + 1,
                    reason: format!("expected at least 4 columns, found {}", fields.len()),
                });
            }
            let parse = |i: usize| -> Result<f64, RcIndexError> {
                fields[i].parse::<f64>().map_err(|_| RcIndexError::Parse {
                    line: line_num + 1,
                    reason: format!("invalid number '{}'", fields[i]),
                })
            };
            let record = RcRecord {
                time: parse(0)?,
                rc: parse(1)?,
                rc_e: parse(2)?,
                rc_i: parse(3)?,
                flag: fields.get(4).map(|s| s.to_string()).unwrap_or_default(),
            };
            if records.last().is_some_and(|last| last.time >= record.time) {
                return Err(RcIndexError::Unsorted(line_num + 1));
            }
            records.push(record);
        }

        if records.is_empty() {
            return Err(RcIndexError::Empty);
        }
        Ok(records)
    }

    fn write_to(data: &Self::Data, _options: &Self::Options, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "# time RC RC_e RC_i flag")?;
        for record in data {
            writeln!(
                writer,
                "{:.6} {:.2} {:.2} {:.2} {}",
                record.time, record.rc, record.rc_e, record.rc_i, record.flag
            )?;
        }
        Ok(())
    }
}
