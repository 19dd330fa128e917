//! CSV record source
//!
//! Loads the whole input into memory as [`Row`]s before the run starts.

use republisher_common::Row;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::error::SourceError;

/// Reads rows from CSV input. Every record must have the same number of fields.
pub struct CsvSource<R> {
    reader: csv::Reader<R>,
}

impl CsvSource<File> {
    /// Open a CSV file on disk
    pub fn open(path: impl AsRef<Path>, skip_header: bool) -> Result<Self, SourceError> {
        let path = path.as_ref();
        debug!(path = %path.display(), skip_header, "Opening record source");
        let file = File::open(path)?;
        Ok(Self::from_reader(file, skip_header))
    }
}

impl<R: Read> CsvSource<R> {
    /// Wrap any reader. With `skip_header` the first record is discarded.
    pub fn from_reader(reader: R, skip_header: bool) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(skip_header)
            .flexible(false)
            .from_reader(reader);
        Self { reader }
    }

    /// Every data row, in file order
    pub fn read_all(mut self) -> Result<Vec<Row>, SourceError> {
        let rows = self
            .reader
            .records()
            .map(|record| record.map(to_row).map_err(SourceError::from))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(rows = rows.len(), "Record source loaded");
        Ok(rows)
    }

    /// At most `limit` data rows after skipping the first `offset` data rows.
    ///
    /// Records past the page are never parsed, so a malformed tail does not fail the read.
    pub fn read_page(mut self, offset: usize, limit: usize) -> Result<Vec<Row>, SourceError> {
        let rows = self
            .reader
            .records()
            .skip(offset)
            .take(limit)
            .map(|record| record.map(to_row).map_err(SourceError::from))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(offset, limit, rows = rows.len(), "Record page loaded");
        Ok(rows)
    }
}

fn to_row(record: csv::StringRecord) -> Row {
    Row::new(record.iter().map(str::to_string).collect())
}
