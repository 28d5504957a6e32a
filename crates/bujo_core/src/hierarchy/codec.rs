//! Forest blob codec.
//!
//! # Responsibility
//! - Serialize a collection's forest to the persisted JSON blob.
//! - Decode persisted blobs back into forests, rejecting corrupt state.
//!
//! # Invariants
//! - `decode_forest(encode_forest(f))` returns `f` for every well-formed
//!   forest.
//! - Absent or blank blobs decode to the empty forest, never an error.
//! - Duplicate identifier placement is persisted-state corruption, not a
//!   caller error.

use crate::model::item::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for forest codec operations.
pub type CodecResult<T> = Result<T, CorruptHierarchyError>;

/// Persisted tree-node record: one identifier and its ordered children.
///
/// A collection's full hierarchy is an ordered sequence of these roots.
/// Children are a strict sub-structure, so a forest that never places the
/// same identifier twice cannot contain cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyItem {
    /// Identifier of the content item placed at this node.
    pub id: ItemId,
    /// Ordered children; sibling order is meaningful and preserved exactly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyItem>,
}

impl HierarchyItem {
    /// Creates a childless node.
    pub fn leaf(id: ItemId) -> Self {
        Self {
            id,
            children: Vec::new(),
        }
    }

    /// Creates a node with the given ordered children.
    pub fn with_children(id: ItemId, children: Vec<HierarchyItem>) -> Self {
        Self { id, children }
    }
}

/// Forest blob failure. Surfaced as a server-side fault: it indicates
/// persisted-state corruption rather than bad caller input.
#[derive(Debug)]
pub enum CorruptHierarchyError {
    /// Blob is not a well-formed forest document.
    Malformed(String),
    /// The same identifier is placed more than once in one forest.
    DuplicatePlacement(ItemId),
}

impl Display for CorruptHierarchyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "malformed hierarchy blob: {message}"),
            Self::DuplicatePlacement(id) => {
                write!(f, "identifier {id} is placed more than once in hierarchy")
            }
        }
    }
}

impl Error for CorruptHierarchyError {}

/// Encodes a forest into its persisted blob.
pub fn encode_forest(forest: &[HierarchyItem]) -> CodecResult<String> {
    serde_json::to_string(forest).map_err(|err| CorruptHierarchyError::Malformed(err.to_string()))
}

/// Decodes a persisted blob into a forest.
///
/// # Errors
/// - `Malformed` when the blob is not a well-formed forest document.
/// - `DuplicatePlacement` when one identifier occurs twice.
pub fn decode_forest(blob: Option<&str>) -> CodecResult<Vec<HierarchyItem>> {
    let text = match blob {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Ok(Vec::new()),
    };

    let forest: Vec<HierarchyItem> = serde_json::from_str(text)
        .map_err(|err| CorruptHierarchyError::Malformed(err.to_string()))?;

    let mut seen = HashSet::new();
    ensure_unique_placement(&forest, &mut seen)?;
    Ok(forest)
}

fn ensure_unique_placement(
    nodes: &[HierarchyItem],
    seen: &mut HashSet<ItemId>,
) -> CodecResult<()> {
    for node in nodes {
        if !seen.insert(node.id) {
            return Err(CorruptHierarchyError::DuplicatePlacement(node.id));
        }
        ensure_unique_placement(&node.children, seen)?;
    }
    Ok(())
}
