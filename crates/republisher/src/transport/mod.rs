//! Transport to the remote republish API
//!
//! The reconciler only sees [`PublishTransport`]; [`HttpTransport`] is the
//! production implementation.

pub mod client;
pub mod endpoints;
pub mod types;

use async_trait::async_trait;
use republisher_common::Identifier;
use std::collections::HashSet;

use crate::error::TransportError;

pub use client::HttpTransport;

/// Identifier-level result of one batch request.
///
/// The remote side is not required to mention every identifier it was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub accepted: HashSet<Identifier>,
    pub rejected: HashSet<Identifier>,
}

impl PublishOutcome {
    pub fn new(
        accepted: impl IntoIterator<Item = Identifier>,
        rejected: impl IntoIterator<Item = Identifier>,
    ) -> Self {
        Self {
            accepted: accepted.into_iter().collect(),
            rejected: rejected.into_iter().collect(),
        }
    }
}

/// Sends identifiers to the remote API
#[async_trait]
pub trait PublishTransport: Send + Sync {
    /// Publish a batch in one request
    async fn publish(&self, identifiers: &[Identifier]) -> Result<PublishOutcome, TransportError>;

    /// Publish a single identifier. Any 2xx answer counts as accepted.
    async fn publish_one(&self, identifier: Identifier) -> Result<(), TransportError>;
}
