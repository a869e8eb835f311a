//! Module - the stateful, reactive component.
//!
//! A module owns a [`Store`], an event bus, the child items it declared and a
//! template. Everything that changes it runs through its `busy` chain, one
//! operation at a time:
//!
//! ```text
//! dispatch(action) → before_update hook → Store action → template update pass → updated hook
//! ```
//!
//! # Lifecycle
//!
//! `Created → Rendering → Rendered → Destroying → Destroyed`. The first render
//! dispatches the store's `init` action (if declared) before the template renders.
//! A destroyed module may render again.
//!
//! # Exported models
//!
//! Only the top-level keys listed in `exported_models` can be pushed in from
//! outside through [`Module::set`]. A module with no exported models ignores `set`.
//!
//! # Pattern: never await your own chain
//!
//! Handlers and hooks run inside the module's chain. They may call `dispatch`
//! but must not await the returned future.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

use futures::future::{self, try_join_all, LocalBoxFuture};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use spark_signals::Signal;
use tracing::{debug, trace};
use uuid::Uuid;

use super::component::{Core, Registry};
use super::events::{EventBus, EventHandler};
use super::item::Item;
use super::loader::{Definition, Loader};
use super::scope::Scope;
use super::store::{Store, StoreOptions};
use super::view::View;
use crate::engine::{Application, ElementId, SharedSurface};
use crate::error::{Result, WeaveError};
use crate::primitives::{Cleanup, Mount, Node, RegionHandle};
use crate::types::ComponentStatus;

/// Action dispatched on first render, when the store declares it.
pub const INIT_ACTION: &str = "init";

/// Builds a fresh template for each component instance.
pub type TemplateFactory = Rc<dyn Fn() -> Vec<Node>>;

/// Named handler, the target of routed reference events.
pub type ModuleHandler = Rc<dyn Fn(&Module, &[Value])>;

/// Hook called around each dispatch.
pub type ModuleHook = Rc<dyn Fn(&Module)>;

// =============================================================================
// OPTIONS
// =============================================================================

#[derive(Clone, Default)]
pub struct ModuleHooks {
    /// Before the store action runs.
    pub before_update: Option<ModuleHook>,
    /// After the template has been updated.
    pub updated: Option<ModuleHook>,
}

/// Child items a module can create.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemOptions {
    /// Views, loaded through the module's own loader under their own name.
    pub views: Vec<String>,
    /// Modules resolved through the application's module references.
    pub refs: Vec<String>,
    /// Modules by item name → path, loaded through the default loader.
    pub modules: BTreeMap<String, String>,
}

/// Module definition.
#[derive(Clone, Default)]
pub struct ModuleOptions {
    pub template: Option<TemplateFactory>,
    pub store: StoreOptions,
    pub exported_models: Vec<String>,
    /// Initial data, pushed through [`Module::set`] at creation.
    pub state: Value,
    pub items: ItemOptions,
    pub handlers: HashMap<String, ModuleHandler>,
    pub hooks: ModuleHooks,
}

impl ModuleOptions {
    pub fn with_template<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Vec<Node> + 'static,
    {
        self.template = Some(Rc::new(factory));
        self
    }

    pub fn handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Module, &[Value]) + 'static,
    {
        self.handlers.insert(name.into(), Rc::new(handler));
        self
    }
}

// =============================================================================
// MODULE
// =============================================================================

struct ItemEntry {
    definition: Definition,
    loader: Rc<dyn Loader>,
}

pub(crate) struct ModuleInner {
    app: Application,
    core: Core,
    loader: Rc<dyn Loader>,
    store: Store,
    exported_models: Vec<String>,
    events: EventBus,
    handlers: HashMap<String, ModuleHandler>,
    hooks: ModuleHooks,
    items: RefCell<HashMap<String, ItemEntry>>,
}

/// Cheap-to-clone module handle.
#[derive(Clone)]
pub struct Module {
    inner: Rc<ModuleInner>,
}

#[derive(Clone)]
pub(crate) struct WeakModule(Weak<ModuleInner>);

impl WeakModule {
    pub(crate) fn upgrade(&self) -> Option<Module> {
        self.0.upgrade().map(|inner| Module { inner })
    }
}

impl Module {
    /// Build a module: store, initial state, items, then template init.
    pub fn create(
        app: Application,
        name: &str,
        loader: Rc<dyn Loader>,
        options: ModuleOptions,
    ) -> LocalBoxFuture<'static, Result<Module>> {
        let name = name.to_string();
        async move {
            let ModuleOptions {
                template,
                store,
                exported_models,
                state,
                items,
                handlers,
                hooks,
            } = options;

            let update_action = format!("__update_{}", Uuid::new_v4().simple());
            let template = template.map(|factory| factory()).unwrap_or_default();
            let module = Module {
                inner: Rc::new(ModuleInner {
                    core: Core::new(name.as_str(), app.surface().clone(), template),
                    app,
                    loader,
                    store: Store::new(store, update_action),
                    exported_models,
                    events: EventBus::new(),
                    handlers,
                    hooks,
                    items: RefCell::new(HashMap::new()),
                }),
            };

            if !state.is_null() {
                module.set(state).await?;
            }
            module.load_items(&items).await?;
            module.inner.core.init_template(&Scope::module(&module)).await?;
            debug!(module = %name, "created");
            Ok(module)
        }
        .boxed_local()
    }

    pub fn name(&self) -> &str {
        &self.inner.core.name
    }

    pub fn status(&self) -> ComponentStatus {
        self.inner.core.status()
    }

    pub fn app(&self) -> &Application {
        &self.inner.app
    }

    pub fn loader(&self) -> &Rc<dyn Loader> {
        &self.inner.loader
    }

    pub(crate) fn surface(&self) -> &SharedSurface {
        &self.inner.core.surface
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.core.registry
    }

    pub(crate) fn downgrade(&self) -> WeakModule {
        WeakModule(Rc::downgrade(&self.inner))
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Render the template at `mount`. Does nothing unless Created or Destroyed.
    pub fn render(&self, mount: Mount) -> LocalBoxFuture<'static, Result<()>> {
        let status = self.status();
        if !status.can_render() {
            return future::ready(Ok(())).boxed_local();
        }
        debug!(module = %self.name(), "rendering");
        self.inner.core.set_status(ComponentStatus::Rendering);

        let init = (status == ComponentStatus::Created && self.inner.store.has_action(INIT_ACTION))
            .then(|| self.dispatch(INIT_ACTION, Value::Null));

        let module = self.clone();
        let rendering = self.inner.core.busy.enqueue(async move {
            let context = module.inner.store.get();
            let result = module.inner.core.render_template(mount, &context).await;
            // A partial render stays destroyable.
            module.inner.core.set_status(ComponentStatus::Rendered);
            result
        });

        async move {
            let rendered = rendering.await;
            if let Some(init) = init {
                init.await?;
            }
            rendered
        }
        .boxed_local()
    }

    /// Tear the template down. A module that never rendered only becomes Destroyed.
    pub fn destroy(&self) -> LocalBoxFuture<'static, Result<()>> {
        match self.status() {
            ComponentStatus::Created => {
                self.inner.core.set_status(ComponentStatus::Destroyed);
                return future::ready(Ok(())).boxed_local();
            }
            ComponentStatus::Destroying | ComponentStatus::Destroyed => {
                return future::ready(Ok(())).boxed_local();
            }
            ComponentStatus::Rendering | ComponentStatus::Rendered => {}
        }

        let module = self.clone();
        self.inner
            .core
            .busy
            .enqueue(async move {
                if module.status() != ComponentStatus::Rendered {
                    return Ok(());
                }
                debug!(module = %module.name(), "destroying");
                module.inner.core.set_status(ComponentStatus::Destroying);
                let result = module.inner.core.destroy_template().await;
                module.inner.core.set_status(ComponentStatus::Destroyed);
                result
            })
            .boxed_local()
    }

    /// Resolves once every operation queued on this module so far has finished.
    pub fn settled(&self) -> LocalBoxFuture<'static, ()> {
        self.inner.core.busy.settled().boxed_local()
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    /// Run store action `action` with `payload`, then update the template.
    pub fn dispatch(&self, action: &str, payload: Value) -> LocalBoxFuture<'static, Result<()>> {
        let module = self.clone();
        let action = action.to_string();
        self.inner
            .core
            .busy
            .enqueue(async move {
                trace!(module = %module.name(), action = %action, "dispatch");
                if let Some(hook) = &module.inner.hooks.before_update {
                    hook(&module);
                }
                module.inner.store.dispatch(&action, payload)?;
                module.updated().await
            })
            .boxed_local()
    }

    async fn updated(&self) -> Result<()> {
        if self.status().is_live() {
            let context = self.inner.store.get();
            self.inner.core.update_template(&context).await?;
        }
        if let Some(hook) = &self.inner.hooks.updated {
            hook(self);
        }
        Ok(())
    }

    /// Push the exported keys of `data` into the store.
    ///
    /// Before the first render the keys are merged directly; afterwards the merge
    /// is dispatched like any other action.
    pub fn set(&self, data: Value) -> LocalBoxFuture<'static, Result<()>> {
        if self.inner.exported_models.is_empty() {
            return future::ready(Ok(())).boxed_local();
        }
        let Value::Object(data) = data else {
            return future::ready(Ok(())).boxed_local();
        };
        let exported: Map<String, Value> = self
            .inner
            .exported_models
            .iter()
            .filter_map(|key| data.get(key).map(|value| (key.clone(), value.clone())))
            .collect();

        let update_action = self.inner.store.update_action().to_string();
        if self.status() == ComponentStatus::Created {
            let result = self.inner.store.dispatch(&update_action, Value::Object(exported));
            return future::ready(result).boxed_local();
        }
        self.dispatch(&update_action, Value::Object(exported))
    }

    /// Owned copy of the whole state.
    pub fn get(&self) -> Value {
        self.inner.store.get()
    }

    /// Owned copy of one model.
    pub fn get_model(&self, name: &str) -> Value {
        self.inner.store.get_model(name)
    }

    /// The store's state signal.
    pub fn state_signal(&self) -> Signal<Value> {
        self.inner.store.signal()
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    pub fn on(&self, event: &str, handler: EventHandler) -> Cleanup {
        self.inner.events.on(event, handler)
    }

    pub fn fire(&self, event: &str, data: &Value) {
        self.inner.events.fire(event, data)
    }

    /// Call named handler `method`.
    pub fn handle_event(&self, method: &str, args: &[Value]) -> Result<()> {
        let handler = self
            .inner
            .handlers
            .get(method)
            .cloned()
            .ok_or_else(|| WeaveError::UnknownHandler {
                component: self.name().to_string(),
                name: method.to_string(),
            })?;
        handler(self, args);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    /// Create a fresh instance of declared item `name`, optionally pushing `state` into it.
    pub fn create_item(&self, name: &str, state: Option<Value>) -> LocalBoxFuture<'static, Result<Item>> {
        let entry = self
            .inner
            .items
            .borrow()
            .get(name)
            .map(|entry| (entry.definition.clone(), entry.loader.clone()));
        let Some((definition, loader)) = entry else {
            return future::ready(Err(WeaveError::UnknownItem {
                component: self.name().to_string(),
                name: name.to_string(),
            }))
            .boxed_local();
        };

        let owner = self.clone();
        let name = name.to_string();
        async move {
            debug!(module = %owner.name(), item = %name, kind = definition.kind(), "creating item");
            let item = match definition {
                Definition::View(options) => Item::View(View::create(&owner, &name, options).await?),
                Definition::Module(options) => {
                    Item::Module(Module::create(owner.inner.app.clone(), &name, loader, options).await?)
                }
            };
            if let Some(state) = state {
                item.set(state).await?;
            }
            Ok(item)
        }
        .boxed_local()
    }

    /// Names of the items this module can create.
    pub fn item_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.items.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    async fn load_items(&self, items: &ItemOptions) -> Result<()> {
        let app = &self.inner.app;
        let module_entry = app.options().module_entry.clone();
        let mut pending: Vec<(String, &'static str, Rc<dyn Loader>, String)> = Vec::new();

        for view in &items.views {
            pending.push((view.clone(), "view", self.inner.loader.clone(), view.clone()));
        }
        for name in &items.refs {
            let reference = app.reference(name)?;
            let loader = app.create_loader(&reference.path, Some(reference.loader.as_str()), reference.args.as_ref())?;
            pending.push((name.clone(), "module", loader, module_entry.clone()));
        }
        for (name, path) in &items.modules {
            let loader = app.create_loader(path, None, None)?;
            pending.push((name.clone(), "module", loader, module_entry.clone()));
        }
        if pending.is_empty() {
            return Ok(());
        }

        let definitions = try_join_all(pending.iter().map(|(_, _, loader, entry)| loader.load(entry))).await?;

        let mut registry = self.inner.items.borrow_mut();
        for ((name, expected, loader, _), definition) in pending.into_iter().zip(definitions) {
            if definition.kind() != expected {
                return Err(WeaveError::DefinitionMismatch {
                    name,
                    expected,
                    found: definition.kind(),
                });
            }
            registry.insert(name, ItemEntry { definition, loader });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Template
    // -------------------------------------------------------------------------

    pub fn region(&self, name: &str) -> Option<RegionHandle> {
        self.inner.core.registry.region(name)
    }

    /// Item created by the reference node with id `id`.
    pub fn item_by_id(&self, id: &str) -> Option<Item> {
        self.inner.core.registry.item_by_id(id)
    }

    pub fn first_element(&self) -> Option<ElementId> {
        self.inner.core.first_element()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}
