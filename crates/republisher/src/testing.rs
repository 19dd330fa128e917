//! Test doubles for the transport and the error sink

use async_trait::async_trait;
use republisher_common::{Identifier, Row};
use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{SinkError, TransportError};
use crate::sink::ErrorSink;
use crate::transport::{PublishOutcome, PublishTransport};

pub fn ids(values: &[i64]) -> Vec<Identifier> {
    values.iter().copied().map(Identifier::new).collect()
}

/// One single-field row per value
pub fn rows(values: &[i64]) -> Vec<Row> {
    values
        .iter()
        .map(|v| Row::new(vec![v.to_string()]))
        .collect()
}

/// Accepts everything it is sent unless told otherwise, and records every call
#[derive(Default)]
pub struct ScriptedTransport {
    rejected: HashSet<Identifier>,
    silent: HashSet<Identifier>,
    extra_accepted: Vec<Identifier>,
    extra_rejected: Vec<Identifier>,
    failing_calls: HashSet<usize>,
    calls: Mutex<Vec<Vec<Identifier>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(mut self, values: &[i64]) -> Self {
        self.rejected.extend(ids(values));
        self
    }

    /// Identifiers left out of the response entirely
    pub fn silent(mut self, values: &[i64]) -> Self {
        self.silent.extend(ids(values));
        self
    }

    /// Identifiers added to the accepted list whether or not they were sent
    pub fn extra_accepted(mut self, values: &[i64]) -> Self {
        self.extra_accepted.extend(ids(values));
        self
    }

    pub fn extra_rejected(mut self, values: &[i64]) -> Self {
        self.extra_rejected.extend(ids(values));
        self
    }

    /// Fail the n-th call (0-based) with a 503
    pub fn fail_call(mut self, n: usize) -> Self {
        self.failing_calls.insert(n);
        self
    }

    pub fn calls(&self) -> Vec<Vec<Identifier>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, sent: Vec<Identifier>) -> usize {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls.push(sent);
        calls.len() - 1
    }
}

#[async_trait]
impl PublishTransport for ScriptedTransport {
    async fn publish(&self, identifiers: &[Identifier]) -> Result<PublishOutcome, TransportError> {
        let call = self.record(identifiers.to_vec());
        if self.failing_calls.contains(&call) {
            return Err(TransportError::status(503, "Service Unavailable"));
        }

        let mentioned = identifiers.iter().copied().filter(|id| !self.silent.contains(id));
        let (rejected, accepted): (Vec<Identifier>, Vec<Identifier>) =
            mentioned.partition(|id| self.rejected.contains(id));

        Ok(PublishOutcome::new(
            accepted.into_iter().chain(self.extra_accepted.iter().copied()),
            rejected.into_iter().chain(self.extra_rejected.iter().copied()),
        ))
    }

    async fn publish_one(&self, identifier: Identifier) -> Result<(), TransportError> {
        let call = self.record(vec![identifier]);
        if self.failing_calls.contains(&call) || self.rejected.contains(&identifier) {
            return Err(TransportError::status(422, "Unprocessable Entity"));
        }
        Ok(())
    }
}

/// Keeps appended rows in memory; optionally fails once `capacity` rows are stored
#[derive(Default)]
pub struct MemorySink {
    pub rows: Vec<Row>,
    capacity: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(capacity: usize) -> Self {
        Self {
            rows: Vec::new(),
            capacity: Some(capacity),
        }
    }

    pub fn joined(&self) -> Vec<String> {
        self.rows.iter().map(Row::joined).collect()
    }
}

impl ErrorSink for MemorySink {
    fn append(&mut self, row: &Row) -> Result<(), SinkError> {
        if self.capacity.is_some_and(|cap| self.rows.len() >= cap) {
            return Err(SinkError::Io(std::io::Error::other("disk full")));
        }
        self.rows.push(row.clone());
        Ok(())
    }
}
