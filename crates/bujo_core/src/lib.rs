//! Core domain logic for the bujo productivity backend.
//! This crate is the single source of truth for hierarchy and ownership
//! invariants.

pub mod authz;
pub mod db;
pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use authz::{check_operation, AuthorizationContext, Operation, UnauthorizedError};
pub use hierarchy::codec::{
    decode_forest, encode_forest, CodecResult, CorruptHierarchyError, HierarchyItem,
};
pub use hierarchy::relations::{
    canonicalize, populate, reconcile, remove_node, remove_subtree, subtree_ids, ItemNode,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::collection::{Collection, Stakeholder};
pub use model::event::Event;
pub use model::item::{CollectionId, CompletedItem, ContentItem, ContentType, ItemId};
pub use repo::store::{CollectionStore, SqliteCollectionStore, StoreError, StoreResult};
pub use service::engine::{
    CreateItemParams, EngineError, EngineResult, FieldUpdate, HierarchyEngine, UpdateItemParams,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
