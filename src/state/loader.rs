//! Loaders - where module and view definitions come from.
//!
//! A [`LoaderFactory`] is registered with the [`Application`](crate::Application)
//! under a name. It creates one [`Loader`] per path; the loader resolves
//! definition names (`index` for a module, the view's own name for views) to
//! [`Definition`]s.
//!
//! [`MemoryRegistry`] serves definitions registered in memory, which is all an
//! application built from Rust code needs.
//!
//! ```ignore
//! let registry = Rc::new(MemoryRegistry::new());
//! registry.define("app", "index", Definition::Module(app_options()));
//! registry.define("app", "sidebar", Definition::View(sidebar_options()));
//! app.register_loader("default", registry);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use serde_json::Value;

use super::module::ModuleOptions;
use super::view::ViewOptions;
use crate::error::{Result, WeaveError};

/// A loaded component definition.
#[derive(Clone)]
pub enum Definition {
    Module(ModuleOptions),
    View(ViewOptions),
}

impl Definition {
    pub fn kind(&self) -> &'static str {
        match self {
            Definition::Module(_) => "module",
            Definition::View(_) => "view",
        }
    }
}

/// Resolves definition names under one path.
pub trait Loader {
    fn path(&self) -> &str;

    fn load(&self, name: &str) -> LocalBoxFuture<'static, Result<Definition>>;
}

/// Creates loaders for paths.
pub trait LoaderFactory {
    fn create(&self, path: &str, args: Option<&Value>) -> Rc<dyn Loader>;
}

// =============================================================================
// MEMORY REGISTRY
// =============================================================================

type Definitions = Rc<RefCell<HashMap<String, HashMap<String, Definition>>>>;

/// In-memory definitions, keyed by path then name.
#[derive(Default)]
pub struct MemoryRegistry {
    definitions: Definitions,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` as `name` under `path`, replacing any previous one.
    pub fn define(&self, path: impl Into<String>, name: impl Into<String>, definition: Definition) {
        self.definitions
            .borrow_mut()
            .entry(path.into())
            .or_default()
            .insert(name.into(), definition);
    }

    pub fn contains(&self, path: &str, name: &str) -> bool {
        self.definitions
            .borrow()
            .get(path)
            .is_some_and(|names| names.contains_key(name))
    }
}

impl LoaderFactory for MemoryRegistry {
    fn create(&self, path: &str, _args: Option<&Value>) -> Rc<dyn Loader> {
        Rc::new(MemoryLoader {
            path: path.to_string(),
            definitions: self.definitions.clone(),
        })
    }
}

/// Loader over a [`MemoryRegistry`] path.
pub struct MemoryLoader {
    path: String,
    definitions: Definitions,
}

impl Loader for MemoryLoader {
    fn path(&self) -> &str {
        &self.path
    }

    fn load(&self, name: &str) -> LocalBoxFuture<'static, Result<Definition>> {
        let found = self
            .definitions
            .borrow()
            .get(&self.path)
            .and_then(|names| names.get(name))
            .cloned()
            .ok_or_else(|| WeaveError::Load(format!("no `{name}` under `{}`", self.path)));
        future::ready(found).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_memory_loader_resolves_by_path() {
        let registry = MemoryRegistry::new();
        registry.define("a", "index", Definition::Module(ModuleOptions::default()));
        registry.define("a", "panel", Definition::View(ViewOptions::default()));
        assert!(registry.contains("a", "panel"));

        let loader = registry.create("a", None);
        assert_eq!(loader.path(), "a");
        assert_eq!(block_on(loader.load("index")).map(|d| d.kind()), Ok("module"));
        assert_eq!(block_on(loader.load("panel")).map(|d| d.kind()), Ok("view"));

        let other = registry.create("b", None);
        assert!(matches!(block_on(other.load("index")), Err(WeaveError::Load(_))));
    }

    #[test]
    fn test_definitions_added_later_are_visible() {
        let registry = MemoryRegistry::new();
        let loader = registry.create("a", None);
        registry.define("a", "index", Definition::Module(ModuleOptions::default()));
        assert!(block_on(loader.load("index")).is_ok());
    }
}
