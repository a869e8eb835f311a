//! Error types.
//!
//! Errors are `Clone` so a single failure can be observed by every awaiter of a
//! shared (chained) operation.

/// Failures surfaced by lifecycle passes, dispatches and loaders.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeaveError {
    #[error("id `{id}` is already used in `{component}`")]
    DuplicateId { id: String, component: String },

    #[error("`{component}` has no item named `{name}`")]
    UnknownItem { component: String, name: String },

    #[error("store has no action named `{0}`")]
    UnknownAction(String),

    #[error("`{component}` has no region named `{name}`")]
    UnknownRegion { component: String, name: String },

    #[error("`{component}` has no handler named `{name}`")]
    UnknownHandler { component: String, name: String },

    #[error("no loader registered as `{0}`")]
    UnknownLoader(String),

    #[error("no module reference named `{0}`")]
    UnknownReference(String),

    #[error("`{name}` was loaded as a {found} but is declared as a {expected}")]
    DefinitionMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("node was used before init")]
    Uninitialized,

    #[error("reference `{0}` has no instantiated item")]
    MissingItem(String),

    #[error("component `{0}` is gone")]
    Destroyed(String),

    #[error("load failed: {0}")]
    Load(String),

    #[error("surface error: {0}")]
    Surface(String),

    #[error("action `{action}` failed: {message}")]
    Action { action: String, message: String },
}

impl WeaveError {
    /// Build an [`WeaveError::Action`] from any displayable failure.
    pub fn action(action: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Action {
            action: action.into(),
            message: message.to_string(),
        }
    }
}

impl From<taffy::TaffyError> for WeaveError {
    fn from(err: taffy::TaffyError) -> Self {
        Self::Surface(err.to_string())
    }
}

pub type Result<T, E = WeaveError> = std::result::Result<T, E>;
