//! Recording side of the recipe system
//!
//! - [`arena`] - live-tree identity: nodes by opaque id, key metadata
//! - [`recorder`] - the [`DeltaRecorder`] appending deltas per edit
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

pub mod arena;
pub mod recorder;


pub use arena::{KeyMetadata, NodeArena, NodeId};
pub use recorder::DeltaRecorder;
