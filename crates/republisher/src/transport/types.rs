//! API request and response bodies
//!
//! Identifiers travel wrapped as `{"id": N}` objects.

use republisher_common::Identifier;
use serde::{Deserialize, Serialize};

/// A single wrapped identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdItem {
    pub id: Identifier,
}

impl From<Identifier> for IdItem {
    fn from(id: Identifier) -> Self {
        Self { id }
    }
}

/// Body of a batch publish request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub ids: Vec<IdItem>,
}

impl BatchRequest {
    pub fn new(identifiers: &[Identifier]) -> Self {
        Self {
            ids: identifiers.iter().copied().map(IdItem::from).collect(),
        }
    }
}

/// Body of a batch publish response.
///
/// `ids` are the accepted identifiers, `errors` the rejected ones. Either list may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub ids: Vec<IdItem>,

    #[serde(default)]
    pub errors: Vec<IdItem>,
}
