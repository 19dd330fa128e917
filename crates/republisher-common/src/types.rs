//! Data-model types exchanged between the record source, the reconciler and the sinks

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MalformedRowError;

/// One parsed CSV record: an ordered list of string fields.
///
/// Rows are immutable once read. The error sink writes them back out exactly as
/// they were read, so no normalisation happens here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Vec<String>);

impl Row {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All fields concatenated with no separator
    pub fn joined(&self) -> String {
        self.0.concat()
    }

    pub fn into_fields(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for Row {
    fn from(fields: Vec<String>) -> Self {
        Self(fields)
    }
}

impl From<&[&str]> for Row {
    fn from(fields: &[&str]) -> Self {
        Self(fields.iter().map(|f| (*f).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Row {
    fn from(fields: [&str; N]) -> Self {
        Self(fields.iter().map(|f| (*f).to_string()).collect())
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

/// Key the remote API knows a record by.
///
/// Serializes as a bare JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(i64);

impl Identifier {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// Parse a base-10 signed 64-bit integer. Surrounding whitespace is not trimmed.
    pub fn parse(raw: &str) -> Result<Self, MalformedRowError> {
        raw.parse::<i64>()
            .map(Self)
            .map_err(|e| MalformedRowError::new(raw, e.to_string()))
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
