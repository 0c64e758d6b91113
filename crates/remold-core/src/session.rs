//! Live edit session: recorder plus atomic recipe import/export
//!
//! The session owns what the editing layer needs between edits: the original
//! data a recipe replays against, and the recorder holding the live recipe.
//! Importing a serialized recipe is replace-or-fail: parse, replay against
//! the original data, and only on success swap the live session for one that
//! starts from the transformed result. The imported deltas become the live
//! recipe and subsequent edits append to them rather than amending them. Any
//! failure leaves the previously-live session untouched.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use crate::apply::DeltaApplier;
use crate::error::Result;
use crate::record::DeltaRecorder;
use crate::registry::TransformRegistry;
use crate::types::Recipe;
use serde_json::Value;

/// One live editing session over a single example tree
#[derive(Debug, Clone)]
pub struct RecipeSession {
    original: Value,
    recorder: DeltaRecorder,
}

impl RecipeSession {
    /// Start a session over untouched original data
    pub fn new(original: Value) -> Self {
        let recorder = DeltaRecorder::new(&original);
        Self { original, recorder }
    }

    /// The untouched data every replay of the live recipe starts from
    pub fn original(&self) -> &Value {
        &self.original
    }

    /// The recorder backing this session
    pub fn recorder(&self) -> &DeltaRecorder {
        &self.recorder
    }

    /// Mutable access for the editing layer's record calls
    pub fn recorder_mut(&mut self) -> &mut DeltaRecorder {
        &mut self.recorder
    }

    /// The live recipe
    pub fn recipe(&self) -> &Recipe {
        self.recorder.recipe()
    }

    /// Replay the live recipe against the original data
    pub fn preview(&self, registry: &TransformRegistry) -> Result<Value> {
        DeltaApplier::new(registry).apply(&self.original, self.recipe())
    }

    /// Import a serialized recipe, wholesale replacing the live session.
    ///
    /// Returns the transformed tree the fresh session starts from. On any
    /// error (malformed recipe, unknown transform) the live session is
    /// left exactly as it was.
    pub fn import(&mut self, recipe_json: &str, registry: &TransformRegistry) -> Result<Value> {
        let recipe = Recipe::from_json(recipe_json)?;
        let transformed = DeltaApplier::new(registry).apply(&self.original, &recipe)?;
        self.recorder = DeltaRecorder::with_recipe(&transformed, recipe);
        Ok(transformed)
    }

    /// Serialize the live recipe to its JSON wire form
    pub fn export(&self) -> Result<String> {
        self.recipe().to_json()
    }

    /// Discard every recorded delta and start over from the original data
    pub fn reset(&mut self) {
        self.recorder = DeltaRecorder::new(&self.original);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::path::ParentRef;
    use serde_json::json;

    #[test]
    fn test_export_import_round_trip() {
        let registry = TransformRegistry::with_defaults();
        let mut session = RecipeSession::new(json!({"name": "ada", "score": 1}));
        session
            .recorder_mut()
            .record_transform("name", "uppercase", vec![], vec![], &ParentRef::Root)
            .unwrap();
        session
            .recorder_mut()
            .record_rename("score", "points", &ParentRef::Root)
            .unwrap();
        let exported = session.export().unwrap();

        let mut fresh = RecipeSession::new(json!({"name": "grace", "score": 9}));
        let transformed = fresh.import(&exported, &registry).unwrap();
        assert_eq!(transformed, json!({"name": "GRACE", "points": 9}));
        assert_eq!(fresh.recipe().deltas.len(), 2);
    }

    #[test]
    fn test_edits_append_after_import() {
        let registry = TransformRegistry::with_defaults();
        let mut session = RecipeSession::new(json!({"name": "ada"}));
        session
            .recorder_mut()
            .record_rename("name", "user", &ParentRef::Root)
            .unwrap();
        let exported = session.export().unwrap();

        let mut resumed = RecipeSession::new(json!({"name": "ada"}));
        resumed.import(&exported, &registry).unwrap();
        // the fresh session starts from the transformed tree: 'user' exists
        resumed
            .recorder_mut()
            .record_transform("user", "uppercase", vec![], vec![], &ParentRef::Root)
            .unwrap();

        assert_eq!(resumed.recipe().deltas.len(), 2);
        assert!(resumed.recipe().deltas[1].op_id > resumed.recipe().deltas[0].op_id);
        assert_eq!(
            resumed.preview(&registry).unwrap(),
            json!({"user": "ADA"})
        );
    }

    #[test]
    fn test_failed_import_leaves_session_untouched() {
        let registry = TransformRegistry::with_defaults();
        let mut session = RecipeSession::new(json!({"name": "ada"}));
        session
            .recorder_mut()
            .record_delete("name", &ParentRef::Root)
            .unwrap();
        let before = session.recipe().clone();

        let err = session.import("{ nope", &registry).unwrap_err();
        assert!(matches!(err, Error::MalformedRecipe { .. }));
        assert_eq!(session.recipe(), &before);

        // parseable but referencing an unknown transform: equally atomic
        let mut bad = Recipe::new(crate::types::RootType::Object);
        bad.push(crate::types::Delta::transform(
            crate::types::OpId(1),
            &ParentRef::Root,
            "name",
            "no_such",
            vec![],
            vec![],
        ));
        let err = session.import(&bad.to_json().unwrap(), &registry).unwrap_err();
        assert!(matches!(err, Error::UnknownTransform { .. }));
        assert_eq!(session.recipe(), &before);
    }

    #[test]
    fn test_reset_discards_all_deltas() {
        let mut session = RecipeSession::new(json!({"name": "ada"}));
        session
            .recorder_mut()
            .record_delete("name", &ParentRef::Root)
            .unwrap();
        session.reset();
        assert!(session.recipe().deltas.is_empty());
        // the deleted node is live again in the rebuilt arena
        assert!(session
            .recorder()
            .arena()
            .child_by_key(session.recorder().arena().root(), "name")
            .is_some());
    }
}
