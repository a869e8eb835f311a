//! Component core - what modules and views share.
//!
//! - lifecycle status
//! - the `busy` chain serializing renders, dispatches and destroys
//! - the template, built once from the component's template factory
//! - the registry of regions and ids filled in by template nodes at init
//!
//! Template passes borrow the template only while the synchronous part of the
//! pass runs; the returned future completes the pass's asynchronous work.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::trace;

use super::item::Item;
use super::scope::Scope;
use crate::engine::{ElementId, SharedSurface};
use crate::error::{Result, WeaveError};
use crate::pipeline::{Chain, Delay};
use crate::primitives::node::{
    destroy_all, first_element, init_all, link_anchors, node_list, render_all, update_all,
};
use crate::primitives::{Mount, Node, NodeList, RegionHandle};
use crate::types::ComponentStatus;

// =============================================================================
// REGISTRY
// =============================================================================

/// Regions and ids registered by a component's template.
#[derive(Default)]
pub(crate) struct Registry {
    regions: RefCell<HashMap<String, RegionHandle>>,
    ids: RefCell<HashMap<String, Item>>,
    claimed: RefCell<HashSet<String>>,
}

impl Registry {
    pub(crate) fn claim_id(&self, component: &str, id: &str) -> Result<()> {
        if !self.claimed.borrow_mut().insert(id.to_string()) {
            return Err(WeaveError::DuplicateId {
                id: id.to_string(),
                component: component.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn register_region(&self, component: &str, name: &str, handle: RegionHandle) -> Result<()> {
        let mut regions = self.regions.borrow_mut();
        if regions.contains_key(name) {
            return Err(WeaveError::DuplicateId {
                id: name.to_string(),
                component: component.to_string(),
            });
        }
        regions.insert(name.to_string(), handle);
        Ok(())
    }

    pub(crate) fn region(&self, name: &str) -> Option<RegionHandle> {
        self.regions.borrow().get(name).cloned()
    }

    pub(crate) fn publish_id(&self, id: &str, item: Item) {
        self.ids.borrow_mut().insert(id.to_string(), item);
    }

    pub(crate) fn item_by_id(&self, id: &str) -> Option<Item> {
        self.ids.borrow().get(id).cloned()
    }
}

// =============================================================================
// CORE
// =============================================================================

pub(crate) struct Core {
    pub(crate) name: String,
    pub(crate) surface: SharedSurface,
    pub(crate) busy: Chain,
    pub(crate) registry: Registry,
    status: Cell<ComponentStatus>,
    template: NodeList,
}

impl Core {
    pub(crate) fn new(name: impl Into<String>, surface: SharedSurface, template: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            surface,
            busy: Chain::new(),
            registry: Registry::default(),
            status: Cell::new(ComponentStatus::Created),
            template: node_list(template),
        }
    }

    pub(crate) fn status(&self) -> ComponentStatus {
        self.status.get()
    }

    pub(crate) fn set_status(&self, status: ComponentStatus) {
        trace!(component = %self.name, ?status, "status");
        self.status.set(status);
    }

    pub(crate) fn init_template(&self, scope: &Scope) -> LocalBoxFuture<'static, Result<()>> {
        Delay::also(|delay| init_all(&mut self.template.borrow_mut(), scope, delay))
    }

    /// Render the template; once nested content has arrived, re-link sibling anchors.
    pub(crate) fn render_template(&self, mount: Mount, context: &Value) -> LocalBoxFuture<'static, Result<()>> {
        let pass = Delay::also(|delay| render_all(&mut self.template.borrow_mut(), mount, context, delay));
        let template = self.template.clone();
        async move {
            pass.await?;
            if let Ok(mut nodes) = template.try_borrow_mut() {
                link_anchors(&mut nodes, mount.before);
            }
            Ok(())
        }
        .boxed_local()
    }

    pub(crate) fn update_template(&self, context: &Value) -> LocalBoxFuture<'static, Result<()>> {
        Delay::also(|delay| update_all(&mut self.template.borrow_mut(), context, delay))
    }

    pub(crate) fn destroy_template(&self) -> LocalBoxFuture<'static, Result<()>> {
        Delay::also(|delay| destroy_all(&mut self.template.borrow_mut(), delay))
    }

    /// First attached element of the template.
    pub(crate) fn first_element(&self) -> Option<ElementId> {
        let template = self.template.try_borrow().ok()?;
        first_element(&template)
    }
}
