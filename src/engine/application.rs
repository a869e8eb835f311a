//! Application - session-level services shared by every component.
//!
//! Holds the surface, the loader factories, the module reference registry and
//! the spawner that drives work started from event handlers. Components keep a
//! clone of the handle; nothing here is global.
//!
//! ```ignore
//! let mut pool = LocalPool::new();
//! app.set_spawner(pool.spawner());
//! let handle = pool.run_until(mount(&app, container))?;
//! // fired events dispatch; the pool runs the dispatches when it is driven
//! pool.run_until_stalled();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::executor::LocalSpawner;
use futures::task::LocalSpawnExt;
use futures::Future;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::registry::{ModuleReference, ModuleReferences};
use super::surface::SharedSurface;
use crate::error::{Result, WeaveError};
use crate::state::{Definition, Loader, LoaderFactory, Module};

// =============================================================================
// Options
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationOptions {
    /// Loader factory used when a path names no loader.
    pub default_loader: String,
    /// Path of the root module started by [`crate::pipeline::mount`].
    pub entry: String,
    /// Definition name loaded for modules (views load under their own name).
    pub module_entry: String,
}

impl Default for ApplicationOptions {
    fn default() -> Self {
        Self {
            default_loader: "default".to_string(),
            entry: "app".to_string(),
            module_entry: "index".to_string(),
        }
    }
}

// =============================================================================
// Application
// =============================================================================

struct AppInner {
    surface: SharedSurface,
    options: ApplicationOptions,
    loaders: RefCell<HashMap<String, Rc<dyn LoaderFactory>>>,
    references: RefCell<ModuleReferences>,
    spawner: RefCell<Option<LocalSpawner>>,
}

/// Cheap-to-clone application handle.
#[derive(Clone)]
pub struct Application {
    inner: Rc<AppInner>,
}

impl Application {
    pub fn new(surface: SharedSurface) -> Self {
        Self::with_options(surface, ApplicationOptions::default())
    }

    pub fn with_options(surface: SharedSurface, options: ApplicationOptions) -> Self {
        Self {
            inner: Rc::new(AppInner {
                surface,
                options,
                loaders: RefCell::new(HashMap::new()),
                references: RefCell::new(ModuleReferences::new()),
                spawner: RefCell::new(None),
            }),
        }
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.inner.surface
    }

    pub fn options(&self) -> &ApplicationOptions {
        &self.inner.options
    }

    /// Install the executor that runs work started outside any awaiting caller
    /// (dispatches from event handlers and routed actions).
    pub fn set_spawner(&self, spawner: LocalSpawner) {
        *self.inner.spawner.borrow_mut() = Some(spawner);
    }

    /// Run `task` on the installed spawner.
    ///
    /// Without a spawner the task is dropped; work it would have driven on a
    /// component chain still runs the next time that chain is awaited.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let spawner = self.inner.spawner.borrow().clone();
        match spawner {
            Some(spawner) => {
                if let Err(err) = spawner.spawn_local(task) {
                    warn!(error = %err, "spawn failed");
                }
            }
            None => trace!("no spawner installed"),
        }
    }

    /// Register a loader factory under `name`.
    pub fn register_loader(&self, name: impl Into<String>, factory: Rc<dyn LoaderFactory>) {
        self.inner.loaders.borrow_mut().insert(name.into(), factory);
    }

    /// Register a named module reference.
    pub fn register_reference(&self, name: impl Into<String>, reference: ModuleReference) {
        self.inner.references.borrow_mut().register(name, reference);
    }

    /// Resolve a module reference by name.
    pub fn reference(&self, name: &str) -> Result<ModuleReference> {
        self.inner.references.borrow().resolve(name).cloned()
    }

    /// Create a loader rooted at `path`, through the named or default factory.
    pub fn create_loader(
        &self,
        path: &str,
        loader: Option<&str>,
        args: Option<&Value>,
    ) -> Result<Rc<dyn Loader>> {
        let name = loader.unwrap_or(&self.inner.options.default_loader);
        let factory = self
            .inner
            .loaders
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| WeaveError::UnknownLoader(name.to_string()))?;
        Ok(factory.create(path, args))
    }

    /// Load and create the module at `path` (not rendered).
    pub async fn load_module(&self, path: &str) -> Result<Module> {
        debug!(path, "loading module");
        let loader = self.create_loader(path, None, None)?;
        let definition = loader.load(&self.inner.options.module_entry).await?;
        match definition {
            Definition::Module(options) => Module::create(self.clone(), path, loader, options).await,
            Definition::View(_) => Err(WeaveError::DefinitionMismatch {
                name: path.to_string(),
                expected: "module",
                found: "view",
            }),
        }
    }
}
