//! In-memory CSV table.
//!
//! Both tabular metric sources and point coordinate sources are small
//! enough (at most tens of thousands of rows) to read fully before
//! processing.

use crate::SourceError;

/// A parsed CSV file: trimmed headers plus every data row.
#[derive(Debug, Clone)]
pub struct CsvTable {
    /// Header labels, trimmed, with any byte order mark removed.
    pub headers: Vec<String>,
    /// Data rows in file order.
    pub rows: Vec<csv::StringRecord>,
}

impl CsvTable {
    /// Parses CSV bytes using `delimiter` (comma when `None`).
    ///
    /// Rows may have differing lengths; missing trailing cells read as
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Csv`] if the bytes are not valid CSV (including
    /// invalid UTF-8), or [`SourceError::Schema`] if there is no header row
    /// or `delimiter` is not a single ASCII character.
    pub fn parse(bytes: &[u8], delimiter: Option<char>) -> Result<Self, SourceError> {
        let delimiter = match delimiter {
            None => b',',
            Some(c) => u8::try_from(c)
                .ok()
                .filter(u8::is_ascii)
                .ok_or_else(|| SourceError::Schema {
                    message: format!("CSV delimiter '{c}' is not a single ASCII character"),
                })?,
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
            .collect();

        if headers.iter().all(String::is_empty) {
            return Err(SourceError::Schema {
                message: "CSV file contains no header row".to_owned(),
            });
        }

        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
        log::debug!("Parsed {} CSV rows with {} columns", rows.len(), headers.len());

        Ok(Self { headers, rows })
    }
}
