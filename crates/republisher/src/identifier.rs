//! Row → Identifier derivation
//!
//! The remote API only knows records by an integer key. How that key is
//! recovered from a CSV row is a pluggable [`IdentifierStrategy`]; the default,
//! [`ConcatenatedInteger`], joins every field and parses the result.

use republisher_common::{Identifier, MalformedRowError, Row};
use serde::{Deserialize, Serialize};

/// Turns a row into the key the remote API understands
pub trait IdentifierStrategy: Send + Sync {
    fn derive(&self, row: &Row) -> Result<Identifier, MalformedRowError>;
}

impl<F> IdentifierStrategy for F
where
    F: Fn(&Row) -> Result<Identifier, MalformedRowError> + Send + Sync,
{
    fn derive(&self, row: &Row) -> Result<Identifier, MalformedRowError> {
        self(row)
    }
}

/// Concatenate all fields and parse them as a base-10 `i64`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatenatedInteger;

impl IdentifierStrategy for ConcatenatedInteger {
    fn derive(&self, row: &Row) -> Result<Identifier, MalformedRowError> {
        Identifier::parse(&row.joined()).map_err(|e| MalformedRowError::new(row.to_string(), e.reason))
    }
}

/// What to do when a row has no valid identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedRowPolicy {
    /// Fail the whole window; every row in it goes to the error sink
    #[default]
    AbortBatch,
    /// Fail only the offending row and publish the rest of the window
    SkipRow,
}

impl std::str::FromStr for MalformedRowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort-batch" | "abort" => Ok(Self::AbortBatch),
            "skip-row" | "skip" => Ok(Self::SkipRow),
            _ => Err(format!("unknown malformed row policy '{}'", s)),
        }
    }
}
