//! Run report: counters accumulated by the dispatcher over one run

use chrono::{DateTime, Utc};
use republisher_common::Result as CommonResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::reconcile::RowStatus;

/// Summary of one run. Mutated once per window, finalized at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub id: Uuid,

    /// Rows loaded from the record source
    pub total_rows: usize,

    /// Rows in windows that have been fully handled. A window cut short by a
    /// sink failure is not included, though its rows already written are.
    pub processed_rows: usize,

    /// Failed rows written to the error sink
    pub error_count: usize,

    pub succeeded_count: usize,

    /// Rows neither accepted nor rejected by the API
    pub unaccounted_count: usize,

    pub batches: usize,

    /// Windows that failed as a whole (transport error or malformed row)
    pub failed_batches: usize,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn start(total_rows: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            total_rows,
            processed_rows: 0,
            error_count: 0,
            succeeded_count: 0,
            unaccounted_count: 0,
            batches: 0,
            failed_batches: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Count one settled row. Call after the row has reached the error sink, if it goes there.
    pub fn record_row(&mut self, status: RowStatus) {
        match status {
            RowStatus::Accepted => self.succeeded_count += 1,
            RowStatus::Rejected | RowStatus::Malformed => self.error_count += 1,
            RowStatus::Unaccounted => self.unaccounted_count += 1,
        }
    }

    /// Count one row written to the error sink outside of reconciliation
    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    /// Close a fully handled window
    pub fn record_window(&mut self, window_len: usize) {
        self.batches += 1;
        self.processed_rows += window_len;
    }

    /// Close a window that failed as a whole. Its rows are counted by [`Self::record_error`].
    pub fn record_failed_batch(&mut self, window_len: usize) {
        self.record_window(window_len);
        self.failed_batches += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn is_complete(&self) -> bool {
        self.processed_rows == self.total_rows
    }

    /// Emit the end-of-run summary
    pub fn log_summary(&self) {
        info!(
            run_id = %self.id,
            processed = self.processed_rows,
            total = self.total_rows,
            errors = self.error_count,
            unaccounted = self.unaccounted_count,
            failed_batches = self.failed_batches,
            "Records processed: {}", self.processed_rows
        );
        info!("Records with error: {}", self.error_count);
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> CommonResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_batch_counts_every_row() {
        let mut report = RunReport::start(5);
        report.record_error();
        report.record_error();
        report.record_failed_batch(2);

        assert_eq!(report.processed_rows, 2);
        assert_eq!(report.error_count, 2);
        assert_eq!(report.failed_batches, 1);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_record_row_by_status() {
        let mut report = RunReport::start(4);
        for status in [
            RowStatus::Accepted,
            RowStatus::Rejected,
            RowStatus::Malformed,
            RowStatus::Unaccounted,
        ] {
            report.record_row(status);
        }
        report.record_window(4);

        assert_eq!(report.succeeded_count, 1);
        assert_eq!(report.error_count, 2);
        assert_eq!(report.unaccounted_count, 1);
        assert_eq!(report.batches, 1);
        assert!(report.is_complete());
    }

    #[test]
    fn test_finish_sets_timestamp() {
        let mut report = RunReport::start(0);
        assert!(report.finished_at.is_none());
        report.finish();
        assert!(report.finished_at.unwrap() >= report.started_at);
        assert!(report.is_complete());
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut report = RunReport::start(3);
        report.record_failed_batch(3);
        report.finish();
        report.write_json(&path).unwrap();

        let back: RunReport = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, report);
    }
}
