//! Arena of live tree nodes addressed by opaque ids
//!
//! The recorder tracks identity of the tree being edited through this arena:
//! "parent" is a stored id rather than a reference, which keeps the graph
//! acyclic and makes fixtures trivially buildable from a `serde_json::Value`.
//! Key identity lives in [`KeyMetadata`]: a node's `original` key is set
//! exactly once, on its first rename, and never overwritten, so a node can
//! always be asked to revert to what it was.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::types::OpId;
use serde_json::Value;
use std::collections::BTreeSet;

/// Opaque handle to a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Per-node key bookkeeping, ephemeral (never persisted in a recipe)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyMetadata {
    /// Key the node held before its first rename; set once, never overwritten
    pub original: Option<String>,

    /// Whether the node's key has ever been changed
    pub modified: bool,

    /// Whether the last change was a collision auto-rename rather than an
    /// explicit user rename
    pub auto_renamed: bool,
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    key: String,
    deleted: bool,
    created_by: Option<OpId>,
    meta: KeyMetadata,
    children: Vec<NodeId>,
}

/// Arena holding every addressable node of the live tree
#[derive(Debug, Clone)]
pub struct NodeArena {
    nodes: Vec<Node>,
    root: NodeId,
}

impl NodeArena {
    /// Build an arena mirroring the object structure of `value`.
    ///
    /// Object properties become nodes recursively; arrays and scalars are
    /// leaves (array elements are not individually addressable; a recipe
    /// recorded on one record is replayed per element by the batch runner).
    pub fn from_value(value: &Value) -> Self {
        let mut arena = Self {
            nodes: vec![Node {
                parent: None,
                key: String::new(),
                deleted: false,
                created_by: None,
                meta: KeyMetadata::default(),
                children: Vec::new(),
            }],
            root: NodeId(0),
        };
        arena.populate(arena.root, value);
        arena
    }

    fn populate(&mut self, parent: NodeId, value: &Value) {
        if let Some(map) = value.as_object() {
            for (key, child_value) in map {
                let child = self.add_node(parent, key.clone(), None);
                self.populate(child, child_value);
            }
        }
    }

    fn add_node(&mut self, parent: NodeId, key: String, created_by: Option<OpId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            key,
            deleted: false,
            created_by,
            meta: KeyMetadata::default(),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Root node of the live tree
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Current key of a node
    pub fn key(&self, id: NodeId) -> &str {
        &self.nodes[id.0].key
    }

    /// Parent of a node (`None` for the root)
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Whether the node is currently deleted
    pub fn is_deleted(&self, id: NodeId) -> bool {
        self.nodes[id.0].deleted
    }

    /// Op that generated this node, for structural-transform outputs
    pub fn created_by(&self, id: NodeId) -> Option<OpId> {
        self.nodes[id.0].created_by
    }

    /// Key bookkeeping of a node
    pub fn metadata(&self, id: NodeId) -> &KeyMetadata {
        &self.nodes[id.0].meta
    }

    /// All children of a node, live and deleted, in insertion order
    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[parent.0].children.iter().copied()
    }

    /// Non-deleted child currently holding `key`
    pub fn child_by_key(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&c| !self.nodes[c.0].deleted && self.nodes[c.0].key == key)
    }

    /// Deleted child still holding `key` (deleted children keep their key
    /// until explicitly renamed)
    pub fn deleted_child_by_key(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c.0].deleted && self.nodes[c.0].key == key)
    }

    /// Keys currently held by non-deleted children, optionally excluding one
    /// node. This is the collision set for renames and inserts.
    pub fn live_sibling_keys(&self, parent: NodeId, exclude: Option<NodeId>) -> BTreeSet<String> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .filter(|&c| Some(c) != exclude && !self.nodes[c.0].deleted)
            .map(|c| self.nodes[c.0].key.clone())
            .collect()
    }

    /// Every key a child has ever answered to under this parent: current keys
    /// of live and deleted children plus recorded originals. Displaced
    /// occupants must avoid all of them, so no node ever lands on another
    /// node's historical identity.
    pub fn reserved_sibling_keys(&self, parent: NodeId) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        for &c in &self.nodes[parent.0].children {
            let node = &self.nodes[c.0];
            keys.insert(node.key.clone());
            if let Some(original) = &node.meta.original {
                keys.insert(original.clone());
            }
        }
        keys
    }

    /// Insert a fresh child node
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        key: impl Into<String>,
        created_by: Option<OpId>,
    ) -> NodeId {
        self.add_node(parent, key.into(), created_by)
    }

    /// Insert a fresh child node and mirror the object structure of `value`
    /// beneath it, so properties inside a generated substructure stay
    /// addressable.
    pub fn insert_subtree(
        &mut self,
        parent: NodeId,
        key: impl Into<String>,
        value: &Value,
        created_by: Option<OpId>,
    ) -> NodeId {
        let id = self.add_node(parent, key.into(), created_by);
        self.populate(id, value);
        id
    }

    /// Change a node's key; sets `original` on the first change only
    pub fn set_key(&mut self, id: NodeId, key: impl Into<String>, auto_renamed: bool) {
        let node = &mut self.nodes[id.0];
        if node.meta.original.is_none() {
            node.meta.original = Some(node.key.clone());
        }
        node.key = key.into();
        node.meta.modified = true;
        node.meta.auto_renamed = auto_renamed;
    }

    /// Mark a node deleted; it keeps its key and stays addressable
    pub fn mark_deleted(&mut self, id: NodeId) {
        self.nodes[id.0].deleted = true;
    }

    /// Bring a deleted node back to life
    pub fn mark_restored(&mut self, id: NodeId) {
        self.nodes[id.0].deleted = false;
    }

    /// Key a node should return to on restore: its original if it was ever
    /// renamed, else its current key
    pub fn revert_key(&self, id: NodeId) -> &str {
        self.nodes[id.0]
            .meta
            .original
            .as_deref()
            .unwrap_or(&self.nodes[id.0].key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arena_mirrors_nested_objects() {
        let arena = NodeArena::from_value(&json!({
            "id": 1,
            "stats": {"score": 10, "level": 2}
        }));
        let stats = arena.child_by_key(arena.root(), "stats").unwrap();
        let score = arena.child_by_key(stats, "score").unwrap();
        assert_eq!(arena.key(score), "score");
        assert_eq!(arena.parent(score), Some(stats));
    }

    #[test]
    fn test_original_set_exactly_once() {
        let mut arena = NodeArena::from_value(&json!({"name": "A"}));
        let node = arena.child_by_key(arena.root(), "name").unwrap();

        arena.set_key(node, "first_name", false);
        arena.set_key(node, "given_name", false);

        let meta = arena.metadata(node);
        assert_eq!(meta.original.as_deref(), Some("name"));
        assert!(meta.modified);
        assert_eq!(arena.revert_key(node), "name");
    }

    #[test]
    fn test_deleted_children_keep_keys_but_leave_collision_set() {
        let mut arena = NodeArena::from_value(&json!({"a": 1, "b": 2}));
        let a = arena.child_by_key(arena.root(), "a").unwrap();
        arena.mark_deleted(a);

        assert!(arena.child_by_key(arena.root(), "a").is_none());
        assert_eq!(arena.deleted_child_by_key(arena.root(), "a"), Some(a));
        let live = arena.live_sibling_keys(arena.root(), None);
        assert!(!live.contains("a"));
        assert!(arena.reserved_sibling_keys(arena.root()).contains("a"));
    }
}
