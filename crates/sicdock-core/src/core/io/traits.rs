use crate::core::models::fragment::Fragment;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing fragment file formats.
///
/// Implementors handle format-specific parsing and serialization; the
/// path-based helpers take care of opening and buffering files.
pub trait FragmentFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a fragment from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<Fragment, Self::Error>;

    /// Writes a fragment to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or I/O operations encounter issues.
    fn write_to(fragment: &Fragment, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a fragment from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Fragment, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a fragment to a file path, replacing any existing file.
    fn write_to_path<P: AsRef<Path>>(fragment: &Fragment, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(fragment, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
