//! Republisher Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, error handling and logging setup for the republisher workspace.
//!
//! # Overview
//!
//! - **Types**: [`Row`](types::Row) and [`Identifier`](types::Identifier), the two
//!   values every component of the pipeline exchanges
//! - **Error Handling**: [`CommonError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber initialisation driven by [`logging::LogConfig`]
//!
//! # Example
//!
//! ```
//! use republisher_common::types::{Identifier, Row};
//!
//! let row = Row::from(vec!["10".to_string(), "1".to_string()]);
//! let id = Identifier::parse(&row.joined()).unwrap();
//! assert_eq!(id.value(), 101);
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, MalformedRowError, Result};
pub use types::{Identifier, Row};
