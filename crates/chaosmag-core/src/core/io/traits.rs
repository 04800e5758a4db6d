use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing the plain-text data files
/// a model is built from.
///
/// Implementors handle format-specific parsing and serialization; the path
/// helpers only add buffered file handling.
pub trait CoefficientFile {
    /// The in-memory representation of the file contents.
    type Data;

    /// Format options shared by reading and writing (e.g. the decimal year
    /// convention).
    type Options: Default;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Parses the file contents from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the reader fails.
    fn read_from(reader: &mut impl BufRead, options: &Self::Options) -> Result<Self::Data, Self::Error>;

    /// Serializes `data` to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be represented in the format or
    /// the writer fails.
    fn write_to(data: &Self::Data, options: &Self::Options, writer: &mut impl Write) -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(path: P, options: &Self::Options) -> Result<Self::Data, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, options)
    }

    fn write_to_path<P: AsRef<Path>>(
        data: &Self::Data,
        options: &Self::Options,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(data, options, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
