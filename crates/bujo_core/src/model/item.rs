//! Content item domain model.
//!
//! # Responsibility
//! - Define the item record managed inside collection forests.
//! - Keep content-type distinctions declarative for the authorization layer.
//!
//! # Invariants
//! - `uuid` is stable, collection-unique and never reused.
//! - Every item belongs to exactly one owning collection.
//! - `owner` is the identity accountable for authorization, which is not
//!   necessarily the collection owner.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a content item.
pub type ItemId = Uuid;

/// Stable identifier for an owning collection.
pub type CollectionId = Uuid;

/// Category of content manageable in a collection forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Nested work container owned by one user.
    Project,
    /// Membership container whose members receive notifications.
    Group,
    /// Actionable item with an optional assignee and due time.
    Task,
    /// Free-form text attached to a project.
    Note,
    /// Ledger entry; ordering metadata only, no amount semantics in core.
    Transaction,
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Project => "project",
            Self::Group => "group",
            Self::Task => "task",
            Self::Note => "note",
            Self::Transaction => "transaction",
        };
        write!(f, "{label}")
    }
}

/// Canonical record for every item placed in a collection forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Stable global ID used for hierarchy placement and auditing.
    pub uuid: ItemId,
    /// Owning collection; the scope of this item's forest placement.
    pub collection_uuid: CollectionId,
    /// Serialized as `type` to match the persisted schema naming.
    #[serde(rename = "type")]
    pub kind: ContentType,
    /// User-facing label carried into notification events.
    pub name: String,
    /// Identity accountable for authorization checks.
    pub owner: String,
    /// Delegate responsible for the item. Meaningful for tasks.
    pub assigned_to: Option<String>,
    /// Unix epoch milliseconds. Meaningful for due-dated items.
    pub due_at: Option<i64>,
}

impl ContentItem {
    /// Creates a new item with a generated stable ID.
    pub fn new(
        collection_uuid: CollectionId,
        kind: ContentType,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), collection_uuid, kind, name, owner)
    }

    /// Creates a new item with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        uuid: ItemId,
        collection_uuid: CollectionId,
        kind: ContentType,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            uuid,
            collection_uuid,
            kind,
            name: name.into(),
            owner: owner.into(),
            assigned_to: None,
            due_at: None,
        }
    }
}

/// Archived record of a completed task.
///
/// Completed items leave the live entity set and therefore the forest; the
/// archive preserves accountability fields for history views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedItem {
    /// Stable ID the item carried while live.
    pub uuid: ItemId,
    /// Collection the item belonged to when completed.
    pub collection_uuid: CollectionId,
    /// Label at completion time.
    pub name: String,
    /// Owner at completion time.
    pub owner: String,
    /// Assignee at completion time.
    pub assigned_to: Option<String>,
    /// Unix epoch milliseconds of the completion.
    pub completed_at: i64,
}
