//! Batch dispatcher: drives a whole run over the record source
//!
//! Rows are cut into consecutive windows of `window_size` and published one
//! window at a time, strictly in order. A window that fails as a whole (transport
//! error or malformed row) is written to the error sink in full and the run moves
//! on. A failed write to the error sink ends the run.

use republisher_common::Row;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::RepublishConfig;
use crate::error::{RepublishError, Result, SinkError};
use crate::identifier::IdentifierStrategy;
use crate::reconcile::{BatchOutcome, Reconciler, RowStatus};
use crate::report::RunReport;
use crate::sink::ErrorSink;
use crate::transport::PublishTransport;

/// How rows are sent to the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One request per window
    #[default]
    Multi,
    /// One request per row
    Single,
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multi" | "batch" => Ok(Self::Multi),
            "single" => Ok(Self::Single),
            _ => Err(format!("unknown dispatch mode '{}'", s)),
        }
    }
}

/// A contiguous window of the record source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a> {
    pub rows: &'a [Row],
    /// Position of the first row in the record source
    pub offset: usize,
    /// Last window of the run
    pub terminal: bool,
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cut `records` into windows of `window_size`; only the last may be shorter.
///
/// # Panics
///
/// Panics if `window_size` is 0. [`Dispatcher::run`] rejects that case with a
/// configuration error before calling this.
pub fn partition(records: &[Row], window_size: usize) -> impl Iterator<Item = Batch<'_>> {
    assert!(window_size > 0, "window size must be greater than 0");
    let count = records.len().div_ceil(window_size);
    records
        .chunks(window_size)
        .enumerate()
        .map(move |(i, rows)| Batch {
            rows,
            offset: i * window_size,
            terminal: i + 1 == count,
        })
}

/// Runs windows through the reconciler and routes failures to the error sink
pub struct Dispatcher<'c, T, S> {
    reconciler: &'c Reconciler<T, S>,
    config: &'c RepublishConfig,
}

impl<'c, T, S> Dispatcher<'c, T, S>
where
    T: PublishTransport,
    S: IdentifierStrategy,
{
    pub fn new(reconciler: &'c Reconciler<T, S>, config: &'c RepublishConfig) -> Self {
        Self { reconciler, config }
    }

    /// Publish every row of `records`, `window_size` rows per window.
    ///
    /// On a sink failure the returned [`RepublishError::SinkWrite`] carries the
    /// report as it stood when the write failed: rows already written are
    /// counted, the interrupted window is not counted as processed.
    pub async fn run<K: ErrorSink>(
        &self,
        records: &[Row],
        window_size: usize,
        sink: &mut K,
    ) -> Result<RunReport> {
        if window_size == 0 {
            return Err(RepublishError::config("window size must be greater than 0"));
        }

        let mut report = RunReport::start(records.len());
        info!(run_id = %report.id, total = records.len(), window_size, mode = ?self.config.mode, "Starting republish run");

        for batch in partition(records, window_size) {
            if self.config.log_progress {
                info!(
                    processed = report.processed_rows,
                    total = report.total_rows,
                    "Records processed: {} of {}",
                    report.processed_rows,
                    report.total_rows
                );
            }

            let written = match self.config.mode {
                DispatchMode::Multi => self.dispatch_batch(&batch, sink, &mut report).await,
                DispatchMode::Single => self.dispatch_rows(&batch, sink, &mut report).await,
            };

            if let Err(source) = written {
                error!(error = %source, offset = batch.offset, "Error writing to error sink - aborting run");
                report.finish();
                report.log_summary();
                return Err(RepublishError::SinkWrite {
                    source,
                    report: Box::new(report),
                });
            }
        }

        report.finish();
        report.log_summary();
        Ok(report)
    }

    async fn dispatch_batch<K: ErrorSink>(
        &self,
        batch: &Batch<'_>,
        sink: &mut K,
        report: &mut RunReport,
    ) -> std::result::Result<(), SinkError> {
        let outcome = match self.reconciler.publish_batch(batch.rows).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if self.config.log_errors {
                    warn!(
                        error = %err,
                        offset = batch.offset,
                        rows = batch.len(),
                        "Error publishing window - routing every row to the error sink"
                    );
                }
                for row in batch.rows {
                    sink.append(row)?;
                    report.record_error();
                }
                report.record_failed_batch(batch.len());
                return Ok(());
            },
        };

        self.log_outcome(batch, &outcome);

        // One pass in window order so the sink keeps row order
        for settled in outcome.settled() {
            let sunk = settled.status.is_failure()
                || (self.config.sink_unaccounted && settled.status == RowStatus::Unaccounted);
            if sunk {
                sink.append(settled.row)?;
            }
            report.record_row(settled.status);
        }

        report.record_window(batch.len());
        Ok(())
    }

    async fn dispatch_rows<K: ErrorSink>(
        &self,
        batch: &Batch<'_>,
        sink: &mut K,
        report: &mut RunReport,
    ) -> std::result::Result<(), SinkError> {
        for row in batch.rows {
            match self.reconciler.publish_row(row).await {
                Ok(id) => {
                    if self.config.log_success {
                        info!(id = %id, "resource with id:{} processed", id);
                    }
                    report.record_row(RowStatus::Accepted);
                },
                Err(err) => {
                    if self.config.log_errors {
                        warn!(error = %err, row = %row, "Error publishing row");
                    }
                    sink.append(row)?;
                    report.record_error();
                },
            }
        }

        report.record_window(batch.len());
        Ok(())
    }

    fn log_outcome(&self, batch: &Batch<'_>, outcome: &BatchOutcome<'_>) {
        if self.config.log_success {
            for settled in outcome.succeeded() {
                if let Some(id) = settled.identifier {
                    info!(id = %id, "resource with id:{} processed", id);
                }
            }
        }

        if self.config.log_errors {
            let rejected = outcome.count(RowStatus::Rejected);
            let malformed = outcome.count(RowStatus::Malformed);
            if rejected + malformed > 0 {
                warn!(offset = batch.offset, rejected, malformed, "Rows failed in window");
            }

            let unaccounted = outcome.count(RowStatus::Unaccounted);
            if unaccounted > 0 {
                warn!(
                    offset = batch.offset,
                    unaccounted,
                    written_to_sink = self.config.sink_unaccounted,
                    "API response did not account for every row"
                );
            }
        }
    }
}
