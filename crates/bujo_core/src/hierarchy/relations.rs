//! Relations processor over collection forests.
//!
//! # Responsibility
//! - Reconcile a possibly stale forest with the authoritative entity set.
//! - Provide the structural primitives the engine facade composes: populate,
//!   canonicalize, subtree extraction, subtree removal, node flattening.
//!
//! # Invariants
//! - Inputs are never mutated; every result is a new forest value.
//! - Known identifiers keep their relative order; live items missing from
//!   the forest append as new roots after all existing roots.
//! - Every live item appears exactly once in a populated view.

use crate::hierarchy::codec::HierarchyItem;
use crate::model::item::{ContentItem, ItemId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Fully-populated tree view node: the entity plus its resolved children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemNode {
    /// The content item placed at this node.
    pub item: ContentItem,
    /// Ordered, fully-populated children.
    pub children: Vec<ItemNode>,
}

impl ItemNode {
    /// Creates a childless view node.
    pub fn leaf(item: ContentItem) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }

    /// Creates a view node with the given ordered children.
    pub fn with_children(item: ContentItem, children: Vec<ItemNode>) -> Self {
        Self { item, children }
    }
}

/// Builds the ordered, fully-populated nested view of a collection.
///
/// `items` is the authoritative live entity set in stable collection order;
/// `forest` is the persisted hierarchy, which may be stale in either
/// direction.
///
/// Reconciliation rules:
/// - a forest identifier with no live entity is skipped, and its resolvable
///   children are promoted into its position at the same level;
/// - a live item absent from the forest appends as a new root after all
///   existing roots, in `items` order.
pub fn populate(items: &[ContentItem], forest: &[HierarchyItem]) -> Vec<ItemNode> {
    let lookup: HashMap<ItemId, &ContentItem> =
        items.iter().map(|item| (item.uuid, item)).collect();
    let mut placed = HashSet::new();
    let mut roots = populate_level(forest, &lookup, &mut placed);

    for item in items {
        if !placed.contains(&item.uuid) {
            roots.push(ItemNode::leaf(item.clone()));
        }
    }
    roots
}

fn populate_level(
    nodes: &[HierarchyItem],
    lookup: &HashMap<ItemId, &ContentItem>,
    placed: &mut HashSet<ItemId>,
) -> Vec<ItemNode> {
    let mut level = Vec::new();
    for node in nodes {
        let children = populate_level(&node.children, lookup, placed);
        match lookup.get(&node.id) {
            Some(item) if !placed.contains(&node.id) => {
                placed.insert(node.id);
                level.push(ItemNode::with_children((*item).clone(), children));
            }
            // Orphaned (or defensively, re-placed) identifier: keep its
            // resolvable children in its position.
            _ => level.extend(children),
        }
    }
    level
}

/// Reduces a populated nested view to the minimal persisted forest.
pub fn canonicalize(nodes: &[ItemNode]) -> Vec<HierarchyItem> {
    nodes
        .iter()
        .map(|node| HierarchyItem::with_children(node.item.uuid, canonicalize(&node.children)))
        .collect()
}

/// Resolves entity-set/forest disagreements into a repaired canonical forest.
///
/// This is the single place orphan and new-item rules are applied before a
/// write; repeated reconciliation of the same inputs is a no-op.
pub fn reconcile(items: &[ContentItem], forest: &[HierarchyItem]) -> Vec<HierarchyItem> {
    canonicalize(&populate(items, forest))
}

/// Returns `target` plus every descendant identifier in preorder.
///
/// Returns the empty sequence when `target` is not placed in the forest.
pub fn subtree_ids(forest: &[HierarchyItem], target: ItemId) -> Vec<ItemId> {
    for node in forest {
        if node.id == target {
            let mut ids = Vec::new();
            collect_subtree_ids(node, &mut ids);
            return ids;
        }
        let found = subtree_ids(&node.children, target);
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

fn collect_subtree_ids(node: &HierarchyItem, ids: &mut Vec<ItemId>) {
    ids.push(node.id);
    for child in &node.children {
        collect_subtree_ids(child, ids);
    }
}

/// Returns a new forest with `target` and its entire subtree excised.
///
/// Siblings and every identifier outside the subtree keep their original
/// relative order. Removing an absent identifier is a no-op, which keeps
/// deletion idempotent at this layer.
pub fn remove_subtree(forest: &[HierarchyItem], target: ItemId) -> Vec<HierarchyItem> {
    forest
        .iter()
        .filter(|node| node.id != target)
        .map(|node| HierarchyItem::with_children(node.id, remove_subtree(&node.children, target)))
        .collect()
}

/// Returns a new forest with `target` alone excised and its children spliced
/// into its position, subtrees intact.
///
/// Used when one item leaves the live set but its descendants stay (task
/// completion). Removing an absent identifier is a no-op.
pub fn remove_node(forest: &[HierarchyItem], target: ItemId) -> Vec<HierarchyItem> {
    let mut result = Vec::new();
    for node in forest {
        if node.id == target {
            result.extend(node.children.iter().cloned());
        } else {
            result.push(HierarchyItem::with_children(
                node.id,
                remove_node(&node.children, target),
            ));
        }
    }
    result
}
