//! # Errors
//!
//! Two things can go wrong in the scene core, and they never overlap:
//!
//! - **Misuse**: a stale handle, adding a component twice, activating an
//!   entity that is already active, an illegal hierarchy change. These are
//!   reported as [`SceneError::InvalidOperation`] and the call has no effect.
//! - **Bad input**: persisted scene data that cannot be turned back into
//!   entities. These are reported as [`DecodeError`], wrapped in
//!   [`SceneError::Decode`] when they surface from a scene call.
//!
//! There is no I/O in the core, so there are no transient failures to retry.

use thiserror::Error;

/// Convenience alias used by every fallible scene operation.
pub type Result<T> = std::result::Result<T, SceneError>;

#[derive(Debug, Error)]
pub enum SceneError {
    /// A precondition of the called operation was violated.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A component could not be encoded into its persisted form.
    #[error("failed to encode component '{component}': {source}")]
    Encode {
        component: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl SceneError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Returns `true` for [`SceneError::InvalidOperation`].
    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation(_))
    }
}

/// Malformed persisted scene data.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input is not a valid scene document.
    #[error("malformed scene data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unregistered component type '{0}'")]
    UnknownComponent(String),

    /// The component's fields do not match its registered type.
    #[error("failed to decode component '{component}': {message}")]
    Component { component: String, message: String },

    #[error("entity '{entity}' lists component '{component}' more than once")]
    DuplicateComponent { entity: String, component: String },
}
