//! Shared path identity: parent references and their resolution
//!
//! A delta addresses its target as `(parent reference, key)`. The parent
//! reference is either literal, a path of keys from the root, or anchored
//! to the op id of the structural transform that generated the enclosing
//! substructure. The op anchor is what keeps replay shape-independent: a
//! literal parent key breaks as soon as the generating transform names its
//! output differently per record, while an op anchor always resolves to
//! whatever that operation actually produced during the current replay.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::record::arena::{NodeArena, NodeId};
use crate::types::OpId;
use serde_json::{Map, Value};

/// How a delta addresses the parent of its target property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// Target sits directly under the root object
    Root,

    /// Literal path of keys from the root; only valid when no ancestor was
    /// produced by a structural transform
    Literal { path: Vec<String> },

    /// Nearest structural ancestor, by op id. `path` holds the relative
    /// segments below that op's own parent (the first segment is the
    /// generated key as recorded); empty when the target itself is a direct
    /// output of the op.
    Op { op: OpId, path: Vec<String> },
}

impl ParentRef {
    /// Split into the persisted `(parentOpId, parentKey)` delta fields
    pub fn to_fields(&self) -> (Option<OpId>, Option<String>) {
        match self {
            ParentRef::Root => (None, None),
            ParentRef::Literal { path } => {
                if path.is_empty() {
                    (None, None)
                } else {
                    (None, Some(path.join(".")))
                }
            }
            ParentRef::Op { op, path } => {
                if path.is_empty() {
                    (Some(*op), None)
                } else {
                    (Some(*op), Some(path.join(".")))
                }
            }
        }
    }

    /// Rebuild from the persisted delta fields
    pub fn from_fields(parent_op_id: Option<OpId>, parent_key: Option<&str>) -> Self {
        let path: Vec<String> = parent_key
            .map(|k| k.split('.').map(str::to_string).collect())
            .unwrap_or_default();
        match parent_op_id {
            Some(op) => ParentRef::Op { op, path },
            None if path.is_empty() => ParentRef::Root,
            None => ParentRef::Literal { path },
        }
    }
}

/// Record-time resolution between arena nodes and parent references
pub struct PathResolver;

impl PathResolver {
    /// Compute the parent reference for a delta targeting `node`.
    ///
    /// Walks ancestor links using each ancestor's current key; the walk stops
    /// at the nearest ancestor (or the node itself) generated by a structural
    /// transform, which becomes the op anchor.
    pub fn parent_ref(arena: &NodeArena, node: NodeId) -> ParentRef {
        if let Some(op) = arena.created_by(node) {
            return ParentRef::Op { op, path: Vec::new() };
        }

        let mut segments: Vec<String> = Vec::new();
        let mut cursor = arena.parent(node);
        while let Some(ancestor) = cursor {
            if ancestor == arena.root() {
                segments.reverse();
                return if segments.is_empty() {
                    ParentRef::Root
                } else {
                    ParentRef::Literal { path: segments }
                };
            }
            segments.push(arena.key(ancestor).to_string());
            if let Some(op) = arena.created_by(ancestor) {
                segments.reverse();
                return ParentRef::Op { op, path: segments };
            }
            cursor = arena.parent(ancestor);
        }
        ParentRef::Root
    }

    /// Resolve a parent reference to the live node that holds the target.
    pub fn resolve_parent(arena: &NodeArena, parent: &ParentRef) -> Option<NodeId> {
        match parent {
            ParentRef::Root => Some(arena.root()),
            ParentRef::Literal { path } => {
                let mut cursor = arena.root();
                for segment in path {
                    cursor = arena.child_by_key(cursor, segment)?;
                }
                Some(cursor)
            }
            ParentRef::Op { op, path } => {
                let mut cursor = Self::op_anchor_parent(arena, *op)?;
                for segment in path {
                    cursor = arena.child_by_key(cursor, segment)?;
                }
                Some(cursor)
            }
        }
    }

    /// Locate the node a `(parent, key)` pair addresses in the live arena.
    pub fn locate(
        arena: &NodeArena,
        parent: &ParentRef,
        key: &str,
        include_deleted: bool,
    ) -> Option<NodeId> {
        let parent_node = Self::resolve_parent(arena, parent)?;
        arena.child_by_key(parent_node, key).or_else(|| {
            if include_deleted {
                arena.deleted_child_by_key(parent_node, key)
            } else {
                None
            }
        })
    }

    /// Parent node under which `op` materialized its outputs
    fn op_anchor_parent(arena: &NodeArena, op: OpId) -> Option<NodeId> {
        // Any output of the op shares the parent; scan from the root.
        fn search(arena: &NodeArena, node: NodeId, op: OpId) -> Option<NodeId> {
            if arena.created_by(node) == Some(op) {
                return arena.parent(node);
            }
            arena
                .children(node)
                .find_map(|child| search(arena, child, op))
        }
        search(arena, arena.root(), op)
    }
}

/// Borrow the object map at a literal path inside a value tree
pub(crate) fn object_at<'a>(root: &'a Value, path: &[String]) -> Option<&'a Map<String, Value>> {
    let mut cursor = root;
    for segment in path {
        cursor = cursor.as_object()?.get(segment)?;
    }
    cursor.as_object()
}

/// Mutable variant of [`object_at`]
pub(crate) fn object_at_mut<'a>(
    root: &'a mut Value,
    path: &[String],
) -> Option<&'a mut Map<String, Value>> {
    let mut cursor = root;
    for segment in path {
        cursor = cursor.as_object_mut()?.get_mut(segment)?;
    }
    cursor.as_object_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parent_ref_fields_round_trip() {
        let cases = [
            ParentRef::Root,
            ParentRef::Literal {
                path: vec!["stats".into(), "detail".into()],
            },
            ParentRef::Op {
                op: OpId(4),
                path: vec![],
            },
            ParentRef::Op {
                op: OpId(4),
                path: vec!["name_0".into()],
            },
        ];
        for parent in cases {
            let (op, key) = parent.to_fields();
            assert_eq!(ParentRef::from_fields(op, key.as_deref()), parent);
        }
    }

    #[test]
    fn test_parent_ref_walks_current_keys() {
        let mut arena = NodeArena::from_value(&json!({
            "stats": {"score": 1}
        }));
        let stats = arena.child_by_key(arena.root(), "stats").unwrap();
        let score = arena.child_by_key(stats, "score").unwrap();
        arena.set_key(stats, "metrics", false);

        assert_eq!(
            PathResolver::parent_ref(&arena, score),
            ParentRef::Literal {
                path: vec!["metrics".to_string()]
            }
        );
    }

    #[test]
    fn test_generated_node_anchors_to_op() {
        let mut arena = NodeArena::from_value(&json!({"name": "user-0"}));
        let part = arena.insert_child(arena.root(), "name_0", Some(OpId(1)));

        assert_eq!(
            PathResolver::parent_ref(&arena, part),
            ParentRef::Op {
                op: OpId(1),
                path: vec![]
            }
        );
        assert_eq!(
            PathResolver::locate(
                &arena,
                &ParentRef::Op {
                    op: OpId(1),
                    path: vec![]
                },
                "name_0",
                false
            ),
            Some(part)
        );
    }

    #[test]
    fn test_object_at_mut_descends_literal_path() {
        let mut data = json!({"stats": {"score": 1}});
        let map = object_at_mut(&mut data, &["stats".to_string()]).unwrap();
        map.insert("score".to_string(), json!(11));
        assert_eq!(data["stats"]["score"], 11);
    }
}
