//! Remold Core - recipe engine for replayable tree edits
//!
//! This crate records the edits a user makes to one example data tree as an
//! ordered sequence of deltas, a *recipe*, and replays that recipe against
//! other trees of similar shape, preserving identity across renames,
//! deletions, restores, and shape-expanding transforms.
//!
//! # Main Components
//!
//! - **Error Handling**: error types using `thiserror` and `anyhow`
//! - **Data Model**: [`Delta`], [`Recipe`] and their serialized wire form
//! - **Recording**: [`DeltaRecorder`] appends one delta per live edit
//! - **Replay**: [`DeltaApplier`] replays a recipe against source data,
//!   [`apply_batch`] over each record of an array independently
//! - **Transforms**: [`TransformRegistry`] of named pure value functions
//!
//! # Example
//!
//! ```
//! use remold_core::{DeltaApplier, DeltaRecorder, ParentRef, TransformRegistry};
//! use serde_json::json;
//!
//! let registry = TransformRegistry::with_defaults();
//! let mut recorder = DeltaRecorder::new(&json!({"name": "ada", "score": 1}));
//! recorder.record_transform("name", "uppercase", vec![], vec![], &ParentRef::Root)?;
//! recorder.record_rename("score", "points", &ParentRef::Root)?;
//!
//! // the recipe replays against a differently-valued record
//! let out = DeltaApplier::new(&registry)
//!     .apply(&json!({"name": "grace", "score": 9}), recorder.recipe())?;
//! assert_eq!(out, json!({"name": "GRACE", "points": 9}));
//! # Ok::<(), remold_core::Error>(())
//! ```
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

pub mod apply;
pub mod collision;
pub mod error;
pub mod path;
pub mod record;
pub mod registry;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use apply::{apply_batch, batch::apply_to_value, DeltaApplier};
pub use error::{Error, Result};
pub use path::{ParentRef, PathResolver};
pub use record::{DeltaRecorder, KeyMetadata, NodeArena, NodeId};
pub use registry::{
    Condition, ParamDescriptor, StructuralAction, StructuralChange, Transform, TransformOutput,
    TransformRegistry,
};
pub use session::RecipeSession;
pub use types::{
    ConditionRef, Delta, DeltaOp, OpId, Recipe, RecipeMetadata, RootType, RECIPE_VERSION,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_creation() {
        let err = Error::UnknownTransform {
            name: "split".to_string(),
        };
        assert!(err.to_string().contains("split"));
    }
}
