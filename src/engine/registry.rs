//! Module Reference Registry - named entries for shared nested modules.
//!
//! A module lists `refs` in its item options; each name resolves here to the loader
//! and path the nested module is loaded from. The registry lives on the
//! [`Application`](super::Application) for the whole session and is passed
//! explicitly to whoever resolves references.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WeaveError};

/// Where a referenced module is loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleReference {
    /// Name of the loader factory registered on the application.
    pub loader: String,
    /// Path handed to the loader factory.
    pub path: String,
    /// Extra loader arguments.
    #[serde(default)]
    pub args: Option<Value>,
}

impl ModuleReference {
    pub fn new(loader: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            loader: loader.into(),
            path: path.into(),
            args: None,
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }
}

/// Name → [`ModuleReference`] table.
#[derive(Debug, Clone, Default)]
pub struct ModuleReferences {
    entries: HashMap<String, ModuleReference>,
}

impl ModuleReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a reference.
    pub fn register(&mut self, name: impl Into<String>, reference: ModuleReference) {
        self.entries.insert(name.into(), reference);
    }

    pub fn get(&self, name: &str) -> Option<&ModuleReference> {
        self.entries.get(name)
    }

    /// Resolve a reference or fail with [`WeaveError::UnknownReference`].
    pub fn resolve(&self, name: &str) -> Result<&ModuleReference> {
        self.get(name)
            .ok_or_else(|| WeaveError::UnknownReference(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry (for testing).
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let mut refs = ModuleReferences::new();
        refs.register("header", ModuleReference::new("default", "shared/header"));

        let found = refs.resolve("header").unwrap();
        assert_eq!(found.path, "shared/header");
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_unknown_reference() {
        let refs = ModuleReferences::new();
        assert_eq!(
            refs.resolve("nope").unwrap_err(),
            WeaveError::UnknownReference("nope".to_string())
        );
    }

    #[test]
    fn test_deserialize_reference() {
        let reference: ModuleReference =
            serde_json::from_str(r#"{"loader": "remote", "path": "a/b"}"#).unwrap();
        assert_eq!(reference, ModuleReference::new("remote", "a/b"));
    }

    #[test]
    fn test_reset() {
        let mut refs = ModuleReferences::new();
        refs.register("a", ModuleReference::new("default", "a"));
        refs.reset();
        assert!(refs.is_empty());
    }
}
