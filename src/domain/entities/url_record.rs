//! URL record entity and the per-user view of it.

use serde::{Deserialize, Serialize};

/// A mapping between a short code, the original URL and its owner.
///
/// Records are never physically removed. A deleted record keeps its short code
/// reserved and stays in the store as a tombstone, so lookups can tell a code
/// that never existed apart from one that was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub short_code: String,
    pub original_url: String,
    /// Opaque user identifier. Empty for anonymous records.
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub deleted: bool,
}

impl UrlRecord {
    /// Creates a live record.
    pub fn new(
        short_code: impl Into<String>,
        original_url: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            short_code: short_code.into(),
            original_url: original_url.into(),
            owner_id: owner_id.into(),
            deleted: false,
        }
    }

    /// Returns true unless the record has been soft-deleted.
    pub fn is_live(&self) -> bool {
        !self.deleted
    }
}

/// A user's link as handed to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}
