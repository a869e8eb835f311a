//! Scope - what a template node sees of the component that owns it.
//!
//! Nodes receive a scope at init. Through it they claim ids, register regions,
//! publish created items, create items and route events back to the owner.
//! The scope holds the owner weakly: nodes never keep their component alive.
//!
//! A standalone scope (no component) is enough for templates made only of
//! elements, text, regions and control flow blocks.

use std::rc::Rc;

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use serde_json::Value;
use tracing::warn;

use super::component::Registry;
use super::item::Item;
use super::module::{Module, WeakModule};
use super::view::{View, WeakView};
use crate::engine::SharedSurface;
use crate::error::{Result, WeaveError};
use crate::primitives::RegionHandle;

const STANDALONE: &str = "standalone";

#[derive(Clone)]
enum Owner {
    Module(WeakModule),
    View(WeakView),
    Standalone(Rc<Registry>),
}

/// Owning context handed to nodes at init.
#[derive(Clone)]
pub struct Scope {
    owner: Owner,
    surface: SharedSurface,
}

impl Scope {
    pub(crate) fn module(module: &Module) -> Self {
        Self {
            owner: Owner::Module(module.downgrade()),
            surface: module.surface().clone(),
        }
    }

    pub(crate) fn view(view: &View) -> Self {
        Self {
            owner: Owner::View(view.downgrade()),
            surface: view.surface().clone(),
        }
    }

    /// A scope with its own registry and no owning component.
    pub fn standalone(surface: SharedSurface) -> Self {
        Self {
            owner: Owner::Standalone(Rc::new(Registry::default())),
            surface,
        }
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    /// The owner is a view.
    pub fn is_view(&self) -> bool {
        matches!(self.owner, Owner::View(_))
    }

    /// Name of the owning component.
    pub fn component_name(&self) -> String {
        match &self.owner {
            Owner::Module(weak) => weak.upgrade().map(|module| module.name().to_string()),
            Owner::View(weak) => weak.upgrade().map(|view| view.name().to_string()),
            Owner::Standalone(_) => Some(STANDALONE.to_string()),
        }
        .unwrap_or_default()
    }

    fn with_registry<R>(&self, f: impl FnOnce(&Registry, &str) -> Result<R>) -> Result<R> {
        match &self.owner {
            Owner::Module(weak) => {
                let module = weak.upgrade().ok_or_else(|| WeaveError::Destroyed("module".into()))?;
                f(module.registry(), module.name())
            }
            Owner::View(weak) => {
                let view = weak.upgrade().ok_or_else(|| WeaveError::Destroyed("view".into()))?;
                f(view.registry(), view.name())
            }
            Owner::Standalone(registry) => f(registry, STANDALONE),
        }
    }

    /// Reserve `id` in the owner; fails if another node holds it.
    pub fn claim_id(&self, id: &str) -> Result<()> {
        self.with_registry(|registry, component| registry.claim_id(component, id))
    }

    pub fn register_region(&self, name: &str, handle: RegionHandle) -> Result<()> {
        self.with_registry(|registry, component| registry.register_region(component, name, handle))
    }

    pub fn region(&self, name: &str) -> Option<RegionHandle> {
        self.with_registry(|registry, _| Ok(registry.region(name))).ok().flatten()
    }

    /// Make `item` reachable by `id` from the owner.
    pub fn publish_id(&self, id: &str, item: Item) -> Result<()> {
        self.with_registry(|registry, _| {
            registry.publish_id(id, item);
            Ok(())
        })
    }

    /// Create item `name` declared by the owning module (a view's module for views).
    pub fn create_item(&self, name: &str, state: Option<Value>) -> LocalBoxFuture<'static, Result<Item>> {
        let module = match &self.owner {
            Owner::Module(weak) => weak.upgrade(),
            Owner::View(weak) => weak.upgrade().and_then(|view| view.owner()),
            Owner::Standalone(_) => {
                return future::ready(Err(WeaveError::UnknownItem {
                    component: STANDALONE.to_string(),
                    name: name.to_string(),
                }))
                .boxed_local();
            }
        };
        match module {
            Some(module) => module.create_item(name, state),
            None => future::ready(Err(WeaveError::Destroyed(name.to_string()))).boxed_local(),
        }
    }

    /// Call handler `method` on the owner.
    ///
    /// Whatever the handler enqueued on its component is spawned on the
    /// application's spawner, so it runs without anyone awaiting it.
    pub fn route_event(&self, method: &str, args: Vec<Value>) -> Result<()> {
        match &self.owner {
            Owner::Module(weak) => {
                let module = weak.upgrade().ok_or_else(|| WeaveError::Destroyed(method.to_string()))?;
                module.handle_event(method, &args)?;
                module.app().spawn(module.settled());
                Ok(())
            }
            Owner::View(weak) => {
                let view = weak.upgrade().ok_or_else(|| WeaveError::Destroyed(method.to_string()))?;
                view.handle_event(method, &args)?;
                if let Some(module) = view.owner() {
                    module.app().spawn(view.settled());
                    module.app().spawn(module.settled());
                }
                Ok(())
            }
            Owner::Standalone(_) => Err(WeaveError::UnknownHandler {
                component: STANDALONE.to_string(),
                name: method.to_string(),
            }),
        }
    }

    /// Dispatch action `method` through the owning view.
    ///
    /// The dispatch is spawned on the application's spawner; failures are logged.
    pub fn route_action(&self, method: &str, args: Vec<Value>) -> Result<()> {
        match &self.owner {
            Owner::View(weak) => {
                let view = weak.upgrade().ok_or_else(|| WeaveError::Destroyed(method.to_string()))?;
                let module = view.owner().ok_or_else(|| WeaveError::Destroyed(view.name().to_string()))?;
                let dispatch = view.action(method, args);
                let method = method.to_string();
                module.app().spawn(async move {
                    if let Err(err) = dispatch.await {
                        warn!(method = %method, error = %err, "routed action failed");
                    }
                });
                Ok(())
            }
            _ => Err(WeaveError::UnknownHandler {
                component: self.component_name(),
                name: method.to_string(),
            }),
        }
    }
}
