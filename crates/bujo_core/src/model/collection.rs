//! Collection and membership read models.
//!
//! # Responsibility
//! - Define the scope record every forest hangs off.
//! - Expose the ordered stakeholder list used for notification fan-out.
//!
//! # Invariants
//! - A collection has exactly one owner; for item collections nested under
//!   a project this is the containing project's owner.
//! - Stakeholder order is deterministic and preserved by the store.

use crate::model::item::CollectionId;
use serde::{Deserialize, Serialize};

/// Scope within which one forest's ordering and nesting is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Stable collection ID.
    pub uuid: CollectionId,
    /// Owning identity; the auxiliary owner for two-owner authorization.
    pub owner: String,
    /// User-facing label.
    pub name: String,
}

impl Collection {
    /// Creates a collection read model.
    pub fn new(uuid: CollectionId, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid,
            owner: owner.into(),
            name: name.into(),
        }
    }
}

/// One identity entitled to notifications about a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stakeholder {
    /// Member identity.
    pub username: String,
    /// Whether the member accepted the membership invitation. Events are
    /// only fanned out to accepted members.
    pub accepted: bool,
}
