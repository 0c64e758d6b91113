//! Tests for the replay engine
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use super::DeltaApplier;
use crate::error::Error;
use crate::path::ParentRef;
use crate::registry::TransformRegistry;
use crate::types::{ConditionRef, Delta, OpId, Recipe, RootType};
use serde_json::{json, Value};

fn recipe_of(deltas: Vec<Delta>) -> Recipe {
    let mut recipe = Recipe::new(RootType::Object);
    for delta in deltas {
        recipe.push(delta);
    }
    recipe
}

fn apply(source: Value, deltas: Vec<Delta>) -> Value {
    let registry = TransformRegistry::with_defaults();
    DeltaApplier::new(&registry)
        .apply(&source, &recipe_of(deltas))
        .unwrap()
}

#[test]
fn test_rename_delete_insert_in_order() {
    let out = apply(
        json!({"name": "Ada", "age": 36}),
        vec![
            Delta::rename(OpId(1), &ParentRef::Root, "name", "full_name"),
            Delta::delete(OpId(2), &ParentRef::Root, "age"),
            Delta::insert(OpId(3), &ParentRef::Root, "active", json!(true), None),
        ],
    );
    assert_eq!(out, json!({"full_name": "Ada", "active": true}));
}

#[test]
fn test_source_is_never_mutated() {
    let source = json!({"name": "Ada"});
    let _ = apply(
        source.clone(),
        vec![Delta::delete(OpId(1), &ParentRef::Root, "name")],
    );
    assert_eq!(source, json!({"name": "Ada"}));
}

#[test]
fn test_missing_path_is_a_local_no_op() {
    // recorded against a record with 'nickname'; this record has none
    let out = apply(
        json!({"name": "Ada"}),
        vec![
            Delta::rename(OpId(1), &ParentRef::Root, "nickname", "alias"),
            Delta::delete(OpId(2), &ParentRef::Root, "nickname"),
            Delta::transform(OpId(3), &ParentRef::Root, "nickname", "uppercase", vec![], vec![]),
        ],
    );
    assert_eq!(out, json!({"name": "Ada"}));
}

#[test]
fn test_unknown_transform_is_fatal_before_any_work() {
    let registry = TransformRegistry::with_defaults();
    let recipe = recipe_of(vec![
        Delta::delete(OpId(1), &ParentRef::Root, "a"),
        Delta::transform(OpId(2), &ParentRef::Root, "b", "no_such", vec![], vec![]),
    ]);
    let err = DeltaApplier::new(&registry)
        .apply(&json!({"a": 1, "b": 2}), &recipe)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTransform { name } if name == "no_such"));
}

#[test]
fn test_transform_type_mismatch_is_silent_no_op() {
    // string-only transform over a numeric field leaves it unchanged
    let out = apply(
        json!({"name": 42}),
        vec![Delta::transform(
            OpId(1),
            &ParentRef::Root,
            "name",
            "uppercase",
            vec![],
            vec![],
        )],
    );
    assert_eq!(out, json!({"name": 42}));
}

#[test]
fn test_condition_stack_gates_transform() {
    let gated = |op: u64| {
        Delta::transform(
            OpId(op),
            &ParentRef::Root,
            "name",
            "uppercase",
            vec![],
            vec![ConditionRef {
                condition_name: "matches".to_string(),
                condition_params: vec![json!("^user")],
            }],
        )
    };
    assert_eq!(
        apply(json!({"name": "user-0"}), vec![gated(1)]),
        json!({"name": "USER-0"})
    );
    assert_eq!(
        apply(json!({"name": "admin"}), vec![gated(1)]),
        json!({"name": "admin"})
    );
    // a condition name absent from the registry never holds
    let unknown_gate = Delta::transform(
        OpId(1),
        &ParentRef::Root,
        "name",
        "uppercase",
        vec![],
        vec![ConditionRef {
            condition_name: "no_such_condition".to_string(),
            condition_params: vec![],
        }],
    );
    assert_eq!(
        apply(json!({"name": "user-0"}), vec![unknown_gate]),
        json!({"name": "user-0"})
    );
}

#[test]
fn test_nested_transform_through_literal_parent() {
    let out = apply(
        json!({"stats": {"score": 5, "level": 1}}),
        vec![Delta::transform(
            OpId(1),
            &ParentRef::Literal {
                path: vec!["stats".to_string()],
            },
            "score",
            "add",
            vec![json!(10)],
            vec![],
        )],
    );
    assert_eq!(out, json!({"stats": {"score": 15, "level": 1}}));
}

#[test]
fn test_replay_collision_resolves_and_aliases() {
    // recorded on a shape without 'alias'; this record already has one
    let out = apply(
        json!({"nickname": "lovelace", "alias": "taken"}),
        vec![
            Delta::rename(OpId(1), &ParentRef::Root, "nickname", "alias"),
            // later deltas keep referencing the intended name
            Delta::transform(OpId(2), &ParentRef::Root, "alias", "uppercase", vec![], vec![]),
        ],
    );
    assert_eq!(out, json!({"alias": "taken", "alias_1": "LOVELACE"}));
}

#[test]
fn test_split_expands_and_removes_source() {
    let out = apply(
        json!({"name": "user-0", "id": 7}),
        vec![Delta::transform(
            OpId(1),
            &ParentRef::Root,
            "name",
            "split",
            vec![json!("-")],
            vec![],
        )],
    );
    assert_eq!(out, json!({"name_0": "user", "name_1": "0", "id": 7}));
}

#[test]
fn test_flatten_hoists_prefixed_siblings() {
    let out = apply(
        json!({"stats": {"score": 5, "level": 2}, "id": 1}),
        vec![Delta::transform(
            OpId(1),
            &ParentRef::Root,
            "stats",
            "flatten",
            vec![],
            vec![],
        )],
    );
    assert_eq!(out, json!({"stats_score": 5, "stats_level": 2, "id": 1}));
}

#[test]
fn test_edits_on_structural_outputs_resolve_through_op_id() {
    let split = Delta::transform(
        OpId(1),
        &ParentRef::Root,
        "name",
        "split",
        vec![json!("-")],
        vec![],
    );
    let anchor = ParentRef::Op {
        op: OpId(1),
        path: vec![],
    };
    let out = apply(
        json!({"name": "user-0"}),
        vec![
            split,
            Delta::rename(OpId(2), &anchor, "name_1", "suffix"),
            Delta::transform(OpId(3), &anchor, "name_0", "uppercase", vec![], vec![]),
        ],
    );
    assert_eq!(out, json!({"name_0": "USER", "suffix": "0"}));
}

#[test]
fn test_structural_outputs_missing_when_transform_skipped() {
    // numeric 'name': split does not apply, so the op never realizes and
    // deltas anchored to it are no-ops
    let split = Delta::transform(
        OpId(1),
        &ParentRef::Root,
        "name",
        "split",
        vec![json!("-")],
        vec![],
    );
    let anchor = ParentRef::Op {
        op: OpId(1),
        path: vec![],
    };
    let out = apply(
        json!({"name": 42}),
        vec![split, Delta::delete(OpId(2), &anchor, "name_0")],
    );
    assert_eq!(out, json!({"name": 42}));
}

#[test]
fn test_restore_returns_identity_when_free() {
    let out = apply(
        json!({"name": "Ada", "id": 1}),
        vec![
            Delta::delete(OpId(1), &ParentRef::Root, "name"),
            Delta::insert(
                OpId(2),
                &ParentRef::Root,
                "name",
                json!("Ada"),
                Some("name".to_string()),
            ),
        ],
    );
    assert_eq!(out, json!({"name": "Ada", "id": 1}));
}

#[test]
fn test_restore_reads_record_local_source_value() {
    // recorded on a record where name was "Ada"; replayed on "Grace"
    let out = apply(
        json!({"name": "Grace"}),
        vec![
            Delta::delete(OpId(1), &ParentRef::Root, "name"),
            Delta::insert(
                OpId(2),
                &ParentRef::Root,
                "name",
                json!("Ada"),
                Some("name".to_string()),
            ),
        ],
    );
    assert_eq!(out, json!({"name": "Grace"}));
}

#[test]
fn test_restore_displaces_collider() {
    let out = apply(
        json!({"name": "A", "name_1": "B"}),
        vec![
            Delta::delete(OpId(1), &ParentRef::Root, "name"),
            Delta::rename(OpId(2), &ParentRef::Root, "name_1", "name"),
            Delta::insert(
                OpId(3),
                &ParentRef::Root,
                "name",
                json!("A"),
                Some("name".to_string()),
            ),
        ],
    );
    // neither value lost; occupant pushed past its own historical key
    assert_eq!(out, json!({"name": "A", "name_2": "B"}));
}

#[test]
fn test_structural_round_trip_restores_part_value() {
    let anchor = ParentRef::Op {
        op: OpId(1),
        path: vec![],
    };
    let out = apply(
        json!({"name": "user-0"}),
        vec![
            Delta::transform(OpId(1), &ParentRef::Root, "name", "split", vec![json!("-")], vec![]),
            Delta::delete(OpId(2), &anchor, "name_0"),
            Delta::insert(
                OpId(3),
                &anchor,
                "name_0",
                json!("user"),
                Some("name_0".to_string()),
            ),
        ],
    );
    assert_eq!(out["name_0"], json!("user"));
    assert_eq!(out["name_1"], json!("0"));
}

#[test]
fn test_repeated_apply_is_deterministic() {
    let registry = TransformRegistry::with_defaults();
    let recipe = recipe_of(vec![
        Delta::rename(OpId(1), &ParentRef::Root, "name", "user"),
        Delta::transform(OpId(2), &ParentRef::Root, "user", "split", vec![json!("-")], vec![]),
    ]);
    let source = json!({"name": "a-b-c", "user_0": "taken"});
    let applier = DeltaApplier::new(&registry);
    let first = applier.apply(&source, &recipe).unwrap();
    for _ in 0..5 {
        assert_eq!(applier.apply(&source, &recipe).unwrap(), first);
    }
}
