//! Hierarchy engine facade.
//!
//! # Responsibility
//! - Compose the relations processor, authorization policy and collection
//!   store into create/update/delete/complete/list operations.
//! - Produce the notification events each mutation owes its stakeholders.
//!
//! # Invariants
//! - Every mutating path consults the authorization policy before touching
//!   persistence.
//! - Forest writes go through `reconcile`, so orphaned identifiers are
//!   repaired on the next write after an entity disappears.
//! - Events never target the requester of the originating operation.

use crate::authz::{check_operation, AuthorizationContext, Operation, UnauthorizedError};
use crate::hierarchy::codec::{
    decode_forest, encode_forest, CorruptHierarchyError, HierarchyItem,
};
use crate::hierarchy::relations::{
    canonicalize, populate, reconcile, remove_node, remove_subtree, subtree_ids, ItemNode,
};
use crate::model::event::Event;
use crate::model::item::{CollectionId, CompletedItem, ContentItem, ContentType, ItemId};
use crate::repo::store::{CollectionStore, StoreError};
use log::info;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from hierarchy engine operations.
#[derive(Debug)]
pub enum EngineError {
    /// Referenced content item does not exist.
    ItemNotFound(ItemId),
    /// Referenced collection does not exist.
    CollectionNotFound(CollectionId),
    /// Completion was requested for a non-task item.
    NotCompletable { item_uuid: ItemId, kind: ContentType },
    /// Authorization policy denial.
    Unauthorized(UnauthorizedError),
    /// Persisted forest blob failed to decode.
    CorruptHierarchy(CorruptHierarchyError),
    /// Persistence-layer failure.
    Store(StoreError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound(id) => write!(f, "content item not found: {id}"),
            Self::CollectionNotFound(id) => write!(f, "collection not found: {id}"),
            Self::NotCompletable { item_uuid, kind } => {
                write!(f, "{kind} {item_uuid} cannot be completed; only tasks can")
            }
            Self::Unauthorized(err) => write!(f, "{err}"),
            Self::CorruptHierarchy(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unauthorized(err) => Some(err),
            Self::CorruptHierarchy(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UnauthorizedError> for EngineError {
    fn from(value: UnauthorizedError) -> Self {
        Self::Unauthorized(value)
    }
}

impl From<CorruptHierarchyError> for EngineError {
    fn from(value: CorruptHierarchyError) -> Self {
        Self::CorruptHierarchy(value)
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Marks one updatable field as either untouched or explicitly set.
///
/// Distinguishes "caller did not supply the field" from "caller reset the
/// field", including resets to empty strings or `None` values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    /// Leave the stored value unchanged.
    #[default]
    Keep,
    /// Replace the stored value.
    Set(T),
}

impl<T> FieldUpdate<T> {
    fn apply_to(self, field: &mut T) {
        if let Self::Set(value) = self {
            *field = value;
        }
    }
}

/// Request model for creating one content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateItemParams {
    /// Content type of the new item.
    pub kind: ContentType,
    /// User-facing label.
    pub name: String,
    /// Initial assignee. Tasks default to the owner when absent.
    pub assigned_to: Option<String>,
    /// Optional due timestamp in epoch milliseconds.
    pub due_at: Option<i64>,
}

impl CreateItemParams {
    /// Creates params with only the required fields set.
    pub fn new(kind: ContentType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            assigned_to: None,
            due_at: None,
        }
    }
}

/// Request model for partially updating one content item.
///
/// Fields left as `Keep` are untouched; `Set` values are applied verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateItemParams {
    pub name: FieldUpdate<String>,
    pub assigned_to: FieldUpdate<Option<String>>,
    pub due_at: FieldUpdate<Option<i64>>,
}

/// Caller-facing facade over one collection store.
///
/// Collaborators are injected at construction; the engine holds no ambient
/// state and performs no I/O beyond the store boundary.
pub struct HierarchyEngine<S: CollectionStore> {
    store: S,
}

impl<S: CollectionStore> HierarchyEngine<S> {
    /// Creates an engine from a store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the ordered, fully-populated nested view of a collection.
    ///
    /// Orphaned forest identifiers are skipped; live items missing from the
    /// forest appear as trailing roots.
    pub fn list_items(&self, collection_uuid: CollectionId) -> EngineResult<Vec<ItemNode>> {
        self.require_collection(collection_uuid)?;
        let items = self.store.list_items(collection_uuid)?;
        let forest = self.load_forest(collection_uuid)?;
        Ok(populate(&items, &forest))
    }

    /// Creates one item, placed as a new root at the end of its collection's
    /// forest. Explicit repositioning is a separate `update_relations` call.
    pub fn create_item(
        &self,
        collection_uuid: CollectionId,
        owner: &str,
        params: CreateItemParams,
    ) -> EngineResult<ContentItem> {
        self.require_collection(collection_uuid)?;
        let items = self.store.list_items(collection_uuid)?;
        let mut forest = reconcile(&items, &self.load_forest(collection_uuid)?);

        let assigned_to = match params.kind {
            ContentType::Task => params.assigned_to.or_else(|| Some(owner.to_string())),
            _ => params.assigned_to,
        };
        let item = ContentItem {
            uuid: Uuid::new_v4(),
            collection_uuid,
            kind: params.kind,
            name: params.name,
            owner: owner.to_string(),
            assigned_to,
            due_at: params.due_at,
        };

        forest.push(HierarchyItem::leaf(item.uuid));
        self.store.insert_item(&item, &encode_forest(&forest)?)?;
        info!(
            "event=item_create module=engine status=ok collection={} item={} type={}",
            collection_uuid, item.uuid, item.kind
        );
        Ok(item)
    }

    /// Applies the explicitly supplied fields to one item.
    ///
    /// An assignee reassignment yields one event for the new and one for
    /// the old assignee, each suppressed when that party is the requester.
    pub fn update_item(
        &self,
        requester: &str,
        item_uuid: ItemId,
        params: UpdateItemParams,
    ) -> EngineResult<(ContentItem, Vec<Event>)> {
        let mut item = self.require_item(item_uuid)?;
        let context = self.authorization_context(&item)?;
        check_operation(&item.owner, requester, item_uuid, Operation::Update, &context)?;

        params.name.apply_to(&mut item.name);
        params.due_at.apply_to(&mut item.due_at);
        let events = apply_assignee(&mut item, params.assigned_to, requester);

        self.store.update_item(&item)?;
        Ok((item, events))
    }

    /// Deletes one item and its entire subtree, cascading entity deletion
    /// to every descendant, and reports the accepted stakeholders to
    /// notify.
    pub fn delete_item(&self, requester: &str, item_uuid: ItemId) -> EngineResult<Vec<Event>> {
        let item = self.require_item(item_uuid)?;
        let context = self.authorization_context(&item)?;
        check_operation(&item.owner, requester, item_uuid, Operation::Delete, &context)?;

        let collection_uuid = item.collection_uuid;
        let items = self.store.list_items(collection_uuid)?;
        let forest = reconcile(&items, &self.load_forest(collection_uuid)?);

        let mut doomed = subtree_ids(&forest, item_uuid);
        if doomed.is_empty() {
            // Entity exists but fell out of the forest; still delete it.
            doomed.push(item_uuid);
        }
        let remaining = remove_subtree(&forest, item_uuid);
        let doomed_set: HashSet<ItemId> = doomed.iter().copied().collect();
        self.store
            .remove_items(collection_uuid, &doomed_set, &encode_forest(&remaining)?)?;
        info!(
            "event=item_delete module=engine status=ok collection={} item={} cascade={}",
            collection_uuid,
            item_uuid,
            doomed.len()
        );

        self.stakeholder_events(collection_uuid, requester, &item)
    }

    /// Completes one task: archives the entity and removes its node from
    /// the forest, promoting its children into its position.
    pub fn complete_item(&self, requester: &str, item_uuid: ItemId) -> EngineResult<ContentItem> {
        let item = self.require_item(item_uuid)?;
        if item.kind != ContentType::Task {
            return Err(EngineError::NotCompletable {
                item_uuid,
                kind: item.kind,
            });
        }
        check_operation(
            &item.owner,
            requester,
            item_uuid,
            Operation::Update,
            &AuthorizationContext::Task,
        )?;

        let items = self.store.list_items(item.collection_uuid)?;
        let forest = reconcile(&items, &self.load_forest(item.collection_uuid)?);
        let remaining = remove_node(&forest, item_uuid);
        self.store.archive_item(&item, &encode_forest(&remaining)?)?;
        info!(
            "event=item_complete module=engine status=ok collection={} item={}",
            item.collection_uuid, item_uuid
        );
        Ok(item)
    }

    /// Lists a collection's completed items, most recently completed first.
    pub fn list_completed(
        &self,
        collection_uuid: CollectionId,
    ) -> EngineResult<Vec<CompletedItem>> {
        self.require_collection(collection_uuid)?;
        Ok(self.store.list_completed(collection_uuid)?)
    }

    /// Replaces a collection's forest wholesale with the caller's desired
    /// ordered/nested view (last-writer-wins at the collection level).
    pub fn update_relations(
        &self,
        collection_uuid: CollectionId,
        nodes: &[ItemNode],
    ) -> EngineResult<()> {
        self.require_collection(collection_uuid)?;
        let forest = canonicalize(nodes);
        self.store
            .save_forest(collection_uuid, &encode_forest(&forest)?)?;
        Ok(())
    }

    fn load_forest(&self, collection_uuid: CollectionId) -> EngineResult<Vec<HierarchyItem>> {
        let blob = self.store.load_forest(collection_uuid)?;
        Ok(decode_forest(blob.as_deref())?)
    }

    fn require_item(&self, item_uuid: ItemId) -> EngineResult<ContentItem> {
        self.store
            .find_item(item_uuid)?
            .ok_or(EngineError::ItemNotFound(item_uuid))
    }

    fn require_collection(&self, collection_uuid: CollectionId) -> EngineResult<()> {
        self.store
            .find_collection(collection_uuid)?
            .map(|_| ())
            .ok_or(EngineError::CollectionNotFound(collection_uuid))
    }

    /// Resolves the authorization context for one item, fetching the
    /// containing project's owner for the two-owner note case.
    fn authorization_context(&self, item: &ContentItem) -> EngineResult<AuthorizationContext> {
        Ok(match item.kind {
            ContentType::Project => AuthorizationContext::Project,
            ContentType::Group => AuthorizationContext::Group,
            ContentType::Task => AuthorizationContext::Task,
            ContentType::Transaction => AuthorizationContext::Transaction,
            ContentType::Note => {
                let collection = self
                    .store
                    .find_collection(item.collection_uuid)?
                    .ok_or(EngineError::CollectionNotFound(item.collection_uuid))?;
                AuthorizationContext::Note {
                    project_owner: collection.owner,
                }
            }
        })
    }

    fn stakeholder_events(
        &self,
        collection_uuid: CollectionId,
        requester: &str,
        item: &ContentItem,
    ) -> EngineResult<Vec<Event>> {
        let mut events = Vec::new();
        for stakeholder in self.store.list_stakeholders(collection_uuid)? {
            if !stakeholder.accepted || stakeholder.username == requester {
                continue;
            }
            events.push(Event::new(stakeholder.username, item.uuid, item.name.clone()));
        }
        Ok(events)
    }
}

fn apply_assignee(
    item: &mut ContentItem,
    update: FieldUpdate<Option<String>>,
    requester: &str,
) -> Vec<Event> {
    let FieldUpdate::Set(new_assignee) = update else {
        return Vec::new();
    };
    if new_assignee == item.assigned_to {
        return Vec::new();
    }

    let old_assignee = std::mem::replace(&mut item.assigned_to, new_assignee.clone());
    let mut events = Vec::new();
    for party in [new_assignee, old_assignee].into_iter().flatten() {
        if party != requester {
            events.push(Event::new(party, item.uuid, item.name.clone()));
        }
    }
    events
}
