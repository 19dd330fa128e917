//! Error sink: append-only destination for rows that failed or were rejected
//!
//! The sink output is valid CSV input, so a later run can republish it directly.

use republisher_common::Row;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::SinkError;

/// Append-only row destination
pub trait ErrorSink {
    fn append(&mut self, row: &Row) -> Result<(), SinkError>;

    /// Append rows in order. Stops at the first failure.
    fn append_many<'a, I>(&mut self, rows: I) -> Result<(), SinkError>
    where
        I: IntoIterator<Item = &'a Row>,
        Self: Sized,
    {
        for row in rows {
            self.append(row)?;
        }
        Ok(())
    }
}

/// Writes rows as CSV, flushing after every append
pub struct CsvErrorSink<W: Write> {
    writer: csv::Writer<W>,
    written: usize,
}

impl CsvErrorSink<File> {
    /// Create (or truncate) the file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> CsvErrorSink<W> {
    pub fn new(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(inner);
        Self { writer, written: 0 }
    }

    /// Rows written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
    }
}

impl<W: Write> ErrorSink for CsvErrorSink<W> {
    fn append(&mut self, row: &Row) -> Result<(), SinkError> {
        self.writer.write_record(row.fields())?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}
