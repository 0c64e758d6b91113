//! Error types for the Remold core library
//!
//! This module defines the error handling system for Remold, using thiserror
//! for ergonomic error definitions and anyhow for flexible error contexts.
//!
//! Copyright (c) 2025 Remold Team
//! Licensed under the Apache-2.0 license

use thiserror::Error;

/// Main error type for Remold operations
#[derive(Error, Debug)]
pub enum Error {
    /// A delta names a transform that is absent from the supplied registry.
    ///
    /// Fatal for the whole `apply` call: silently skipping an unknown
    /// transform would silently produce an unintended result.
    #[error("Unknown transform: '{name}' is not present in the registry")]
    UnknownTransform { name: String },

    /// A recipe failed to parse or is missing required fields.
    ///
    /// Surfaced before any replay work begins; a failed import leaves the
    /// previously-live session untouched.
    #[error("Malformed recipe: {message}")]
    MalformedRecipe {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A transform rejected the parameters recorded for it.
    #[error("Invalid parameters for transform '{transform}': {message}")]
    InvalidParams { transform: String, message: String },

    /// A record-time operation targeted a key that does not exist under the
    /// addressed parent.
    #[error("Unknown key: no live property named '{key}' under the addressed parent")]
    UnknownKey { key: String },

    /// A record-time rename or insert would collide with a live sibling.
    ///
    /// Callers resolve collisions through the collision policy before a key
    /// reaches the recorder, so a recorded delta is always collision-free.
    #[error("Key collision at record time: '{key}' is already held by a live sibling")]
    KeyCollision { key: String },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;
