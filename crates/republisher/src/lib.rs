//! Republisher Library
//!
//! Reads a CSV record source, publishes the rows to a remote HTTP API in
//! fixed-size windows, maps the API's per-identifier answers back onto the
//! original rows, and writes every failed row to an error sink CSV.
//!
//! # Components
//!
//! - [`source`]: CSV record source
//! - [`reconcile`]: identifier derivation, request index and row settlement
//! - [`transport`]: HTTP client for the republish API
//! - [`dispatch`]: windowing and the per-run driver
//! - [`sink`]: error sink
//! - [`report`]: run counters
//!
//! # Example
//!
//! ```no_run
//! use republisher::{
//!     CsvErrorSink, CsvSource, Dispatcher, HttpTransport, Reconciler, RepublishConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RepublishConfig::default().merge_env()?;
//!     config.validate()?;
//!     let rows = CsvSource::open("files/example.csv", true)?.read_all()?;
//!     let mut sink = CsvErrorSink::create("files/errors.csv")?;
//!
//!     let reconciler = Reconciler::new(HttpTransport::new(&config.client)?);
//!     let report = Dispatcher::new(&reconciler, &config)
//!         .run(&rows, config.items_per_batch, &mut sink)
//!         .await?;
//!
//!     println!("{} rows failed", report.error_count);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod identifier;
pub mod reconcile;
pub mod report;
pub mod sink;
pub mod source;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::{ClientConfig, RepublishConfig};
pub use dispatch::{partition, Batch, DispatchMode, Dispatcher};
pub use error::{BatchError, RepublishError, Result, SinkError, SourceError, TransportError};
pub use identifier::{ConcatenatedInteger, IdentifierStrategy, MalformedRowPolicy};
pub use reconcile::{BatchOutcome, Reconciler, RequestIndex, RowStatus, Settled};
pub use report::RunReport;
pub use republisher_common::{Identifier, Row};
pub use sink::{CsvErrorSink, ErrorSink};
pub use source::CsvSource;
pub use transport::{HttpTransport, PublishOutcome, PublishTransport};
