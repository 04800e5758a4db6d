use super::traits::CoefficientFile;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConductivityError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("Conductivity model contains no layers")]
    Empty,
}

/// Radially layered conductivity model of the Earth.
///
/// Layer `i` starts at `depth[i]` km below the reference radius and has
/// conductivity `sigma[i]` S/m; the last layer is the core.
#[derive(Debug, Clone, PartialEq)]
pub struct ConductivityModel {
    pub depth: Vec<f64>,
    pub sigma: Vec<f64>,
}

impl ConductivityModel {
    pub fn layers(&self) -> usize {
        self.depth.len()
    }
}

/// Two-column text file: depth (km) and conductivity (S/m).
pub struct ConductivityFile;

impl CoefficientFile for ConductivityFile {
    type Data = ConductivityModel;
    type Options = ();
    type Error = ConductivityError;

    fn read_from(reader: &mut impl BufRead, _options: &Self::Options) -> Result<Self::Data, Self::Error> {
        let mut model = ConductivityModel {
            depth: Vec::new(),
            sigma: Vec::new(),
        };
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let values = content
                .split_whitespace()
                .map(str::parse::<f64>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConductivityError::Parse {
                    line: line_num + 1,
                    reason: e.to_string(),
                })?;
            let [depth, sigma] = values[..] else {
                return Err(ConductivityError::Parse {
                    line: line_num + 1,
                    reason: format!("expected 2 columns, found {}", values.len()),
                });
            };
            model.depth.push(depth);
            model.sigma.push(sigma);
        }
        if model.depth.is_empty() {
            return Err(ConductivityError::Empty);
        }
        Ok(model)
    }

    fn write_to(data: &Self::Data, _options: &Self::Options, writer: &mut impl Write) -> Result<(), Self::Error> {
        for (depth, sigma) in data.depth.iter().zip(&data.sigma) {
            writeln!(writer, "{:.3} {:.6e}", depth, sigma)?;
        }
        Ok(())
    }
}
