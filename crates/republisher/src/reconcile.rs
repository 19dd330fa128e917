//! Reconciler: rows in, identifiers over the wire, rows back out
//!
//! The remote API answers with bare identifiers. For each window the reconciler
//! derives one [`Identifier`] per row, remembers which row it came from in a
//! [`RequestIndex`], sends the distinct identifiers, and then settles every row
//! of the window into exactly one [`RowStatus`].
//!
//! Settling walks the window in row order, so the result depends only on the
//! rows and the identifier sets returned by the transport.

use republisher_common::{Identifier, Row};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::BatchError;
use crate::identifier::{ConcatenatedInteger, IdentifierStrategy, MalformedRowPolicy};
use crate::transport::{PublishOutcome, PublishTransport};

/// Final state of one row after its window was reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowStatus {
    /// The API accepted the row's identifier
    Accepted,
    /// The API rejected the row's identifier
    Rejected,
    /// No identifier could be derived (skip-row policy only)
    Malformed,
    /// The API never mentioned the identifier, or a later row in the window
    /// shadowed it with the same identifier
    Unaccounted,
}

impl RowStatus {
    /// Rows that belong in the error sink
    pub fn is_failure(self) -> bool {
        matches!(self, RowStatus::Rejected | RowStatus::Malformed)
    }
}

/// A row together with its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled<'a> {
    pub row: &'a Row,
    pub identifier: Option<Identifier>,
    pub status: RowStatus,
}

/// Row-level result of one window, in window order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchOutcome<'a> {
    settled: Vec<Settled<'a>>,
    unknown_identifiers: usize,
}

impl<'a> BatchOutcome<'a> {
    pub fn settled(&self) -> &[Settled<'a>] {
        &self.settled
    }

    fn with_status(&self, status: RowStatus) -> impl Iterator<Item = &Settled<'a>> + '_ {
        self.settled.iter().filter(move |s| s.status == status)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &Settled<'a>> + '_ {
        self.with_status(RowStatus::Accepted)
    }

    /// Rejected and malformed rows, in window order
    pub fn failed(&self) -> impl Iterator<Item = &'a Row> + '_ {
        self.settled
            .iter()
            .filter(|s| s.status.is_failure())
            .map(|s| s.row)
    }

    pub fn unaccounted(&self) -> impl Iterator<Item = &'a Row> + '_ {
        self.with_status(RowStatus::Unaccounted).map(|s| s.row)
    }

    pub fn count(&self, status: RowStatus) -> usize {
        self.with_status(status).count()
    }

    pub fn failed_count(&self) -> usize {
        self.settled.iter().filter(|s| s.status.is_failure()).count()
    }

    /// Identifiers in the response that were never sent in this window
    pub fn unknown_identifiers(&self) -> usize {
        self.unknown_identifiers
    }
}

/// Per-window map from identifier to the position of the row it came from.
///
/// A later row with the same identifier replaces the earlier entry.
#[derive(Debug, Default)]
pub struct RequestIndex {
    positions: HashMap<Identifier, usize>,
    order: Vec<Identifier>,
    shadowed: usize,
}

impl RequestIndex {
    /// Build from one optional identifier per row; `None` entries are skipped
    pub fn build(identifiers: &[Option<Identifier>]) -> Self {
        let mut index = Self::default();

        for (position, id) in identifiers.iter().enumerate() {
            let Some(id) = *id else { continue };
            match index.positions.insert(id, position) {
                Some(_) => index.shadowed += 1,
                None => index.order.push(id),
            }
        }

        index
    }

    /// Distinct identifiers in first-seen order
    pub fn identifiers(&self) -> &[Identifier] {
        &self.order
    }

    /// Position of the row that owns `id`
    pub fn position(&self, id: Identifier) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn contains(&self, id: Identifier) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Rows whose entry was overwritten by a duplicate identifier
    pub fn shadowed(&self) -> usize {
        self.shadowed
    }
}

/// Translates between rows and the identifier-level transport
pub struct Reconciler<T, S = ConcatenatedInteger> {
    transport: T,
    strategy: S,
    policy: MalformedRowPolicy,
}

impl<T: PublishTransport> Reconciler<T> {
    /// Reconciler using [`ConcatenatedInteger`] identifiers
    pub fn new(transport: T) -> Self {
        Self::with_strategy(transport, ConcatenatedInteger)
    }
}

impl<T, S> Reconciler<T, S>
where
    T: PublishTransport,
    S: IdentifierStrategy,
{
    pub fn with_strategy(transport: T, strategy: S) -> Self {
        Self {
            transport,
            strategy,
            policy: MalformedRowPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MalformedRowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MalformedRowPolicy {
        self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Publish a window in one request and settle every row.
    ///
    /// Fails as a whole on a transport error, or on the first malformed row
    /// under [`MalformedRowPolicy::AbortBatch`].
    pub async fn publish_batch<'a>(&self, rows: &'a [Row]) -> Result<BatchOutcome<'a>, BatchError> {
        let derived = self.derive_all(rows)?;
        let index = RequestIndex::build(&derived);

        if index.shadowed() > 0 {
            warn!(
                shadowed = index.shadowed(),
                "Duplicate identifiers in window - earlier rows will be unaccounted"
            );
        }

        let outcome = if index.is_empty() {
            debug!(rows = rows.len(), "No publishable identifiers in window");
            PublishOutcome::default()
        } else {
            self.transport.publish(index.identifiers()).await?
        };

        Ok(settle(rows, &derived, &index, &outcome))
    }

    /// Publish one row through the single-item endpoint
    pub async fn publish_row(&self, row: &Row) -> Result<Identifier, BatchError> {
        let id = self.strategy.derive(row)?;
        self.transport.publish_one(id).await?;
        Ok(id)
    }

    fn derive_all(&self, rows: &[Row]) -> Result<Vec<Option<Identifier>>, BatchError> {
        let mut derived = Vec::with_capacity(rows.len());

        for row in rows {
            match self.strategy.derive(row) {
                Ok(id) => derived.push(Some(id)),
                Err(err) => match self.policy {
                    MalformedRowPolicy::AbortBatch => return Err(err.into()),
                    MalformedRowPolicy::SkipRow => {
                        debug!(row = %row, error = %err, "Skipping malformed row");
                        derived.push(None);
                    },
                },
            }
        }

        Ok(derived)
    }
}

/// Map identifier-level results back onto the window's rows.
///
/// Rejection wins when an identifier is reported both ways.
fn settle<'a>(
    rows: &'a [Row],
    derived: &[Option<Identifier>],
    index: &RequestIndex,
    outcome: &PublishOutcome,
) -> BatchOutcome<'a> {
    let unknown_identifiers = outcome
        .accepted
        .iter()
        .chain(outcome.rejected.iter())
        .filter(|id| !index.contains(**id))
        .count();

    if unknown_identifiers > 0 {
        debug!(unknown = unknown_identifiers, "Ignoring identifiers that were not sent in this window");
    }

    let settled = rows
        .iter()
        .zip(derived)
        .enumerate()
        .map(|(position, (row, id))| {
            let status = match *id {
                None => RowStatus::Malformed,
                Some(id) if index.position(id) != Some(position) => RowStatus::Unaccounted,
                Some(id) if outcome.rejected.contains(&id) => RowStatus::Rejected,
                Some(id) if outcome.accepted.contains(&id) => RowStatus::Accepted,
                Some(_) => RowStatus::Unaccounted,
            };
            Settled {
                row,
                identifier: *id,
                status,
            }
        })
        .collect();

    BatchOutcome {
        settled,
        unknown_identifiers,
    }
}
