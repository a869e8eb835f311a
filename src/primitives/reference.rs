//! Reference node - a nested component embedded in a template.
//!
//! The node creates its item (a view or module known to the owning component)
//! during init, pushes bound context keys into it, mounts it at the node's
//! position and feeds its own children into the item's regions.
//!
//! # Children
//!
//! Declared children are grouped by the `region` attribute of their top-level
//! static wrapper (`"default"` when absent). Each group is shown in the item's
//! region of the same name. The groups stay governed by this node: it updates
//! them with its own context.
//!
//! # Routing
//!
//! When the item is a module:
//! - event routes call a handler on the owner, with arguments resolved against
//!   the context captured when the route was bound
//! - action routes (owner is a view only) call an action on the owner, with
//!   arguments resolved against the most recent context
//!
//! ```ignore
//! ReferenceNode::new("todo-list")
//!     .id("todos")
//!     .bind("filter", "filter")
//!     .on("selected", "openTodo", vec![ArgDescriptor::Event])
//!     .child(StaticNode::new("div").attr("region", "footer").child(TextNode::new().key("count")));
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use futures::future::{self, try_join_all};
use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use super::args::{resolve_arguments, ArgDescriptor, Route};
use super::node::{init_all, node_list, release_all, update_all, Mount, Node, NodeCore, NodeList};
use super::region::DEFAULT_REGION;
use super::Cleanup;
use crate::engine::ElementId;
use crate::error::{Result, WeaveError};
use crate::pipeline::Delay;
use crate::state::{EventHandler, Item, Scope};
use crate::types::{empty_object, lookup};

/// Embedded component.
pub struct ReferenceNode {
    pub(crate) core: NodeCore,
    name: String,
    scope: Option<Scope>,
    item: Rc<RefCell<Option<Item>>>,
    bindings: Vec<(String, String)>,
    events: BTreeMap<String, Route>,
    actions: BTreeMap<String, Route>,
    children: Vec<Node>,
    groups: BTreeMap<String, NodeList>,
    context: Rc<RefCell<Value>>,
    subscriptions: Vec<Cleanup>,
}

impl ReferenceNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: NodeCore::default(),
            name: name.into(),
            scope: None,
            item: Rc::new(RefCell::new(None)),
            bindings: Vec::new(),
            events: BTreeMap::new(),
            actions: BTreeMap::new(),
            children: Vec::new(),
            groups: BTreeMap::new(),
            context: Rc::new(RefCell::new(empty_object())),
            subscriptions: Vec::new(),
        }
    }

    /// Publish the created item under `id` in the owner.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.core = NodeCore::with_id(Some(id.into()));
        self
    }

    /// Push context key `from` into the item as `to`.
    pub fn bind(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.bindings.push((from.into(), to.into()));
        self
    }

    /// Push context key `key` into the item under the same name.
    pub fn bind_key(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.bind(key.clone(), key)
    }

    /// Route item event `event` to handler `method` on the owner.
    pub fn on(mut self, event: impl Into<String>, method: impl Into<String>, args: Vec<ArgDescriptor>) -> Self {
        self.events.insert(event.into(), Route::new(method, args));
        self
    }

    /// Route item event `event` to action `method` on the owning view.
    pub fn action(mut self, event: impl Into<String>, method: impl Into<String>, args: Vec<ArgDescriptor>) -> Self {
        self.actions.insert(event.into(), Route::new(method, args));
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn with_children(mut self, nodes: Vec<Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The item, once created.
    pub fn item(&self) -> Option<Item> {
        self.item.borrow().clone()
    }

    /// Names of the regions this node feeds.
    pub fn group_names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn init(&mut self, scope: &Scope, delay: &mut Delay) -> Result<()> {
        if !self.core.init(scope)? {
            return Ok(());
        }
        self.scope = Some(scope.clone());

        let creation = scope.create_item(&self.name, None);
        let slot = self.item.clone();
        let id = self.core.id.clone();
        let owner = scope.clone();
        delay.add(async move {
            let item = creation.await?;
            if let Some(id) = id {
                owner.publish_id(&id, item.clone())?;
            }
            *slot.borrow_mut() = Some(item);
            Ok(())
        });

        for child in self.children.drain(..) {
            let group = child.region_marker().unwrap_or(DEFAULT_REGION).to_string();
            self.groups
                .entry(group)
                .or_insert_with(|| node_list(Vec::new()))
                .borrow_mut()
                .push(child);
        }
        for nodes in self.groups.values() {
            init_all(&mut nodes.borrow_mut(), scope, delay)?;
        }
        Ok(())
    }

    pub fn render(&mut self, mount: Mount, context: &Value, delay: &mut Delay) -> Result<()> {
        if self.core.is_rendered() {
            return Ok(());
        }
        let item = self.item().ok_or_else(|| WeaveError::MissingItem(self.name.clone()))?;
        let scope = self.scope.clone().ok_or(WeaveError::Uninitialized)?;
        trace!(item = %self.name, "rendering reference");

        self.core.mount = Some(mount);
        self.core.set_rendered(true);
        *self.context.borrow_mut() = context.clone();

        delay.add(item.set(self.bound(context)));

        let target = Mount::new(mount.parent).before(self.core.anchor.or(mount.before));
        let rendering = item.render(target);
        let groups: Vec<(String, NodeList)> = self
            .groups
            .iter()
            .map(|(name, nodes)| (name.clone(), nodes.clone()))
            .collect();
        let shown = item.clone();
        let group_context = context.clone();
        delay.add(async move {
            rendering.await?;
            let shows = groups.into_iter().map(|(name, nodes)| match shown.region(&name) {
                Some(region) => region.show_node(nodes, group_context.clone()),
                None => future::ready(Err(WeaveError::UnknownRegion {
                    component: shown.name(),
                    name,
                }))
                .boxed_local(),
            });
            try_join_all(shows).await.map(|_| ())
        });

        if let Item::Module(module) = &item {
            for (event, route) in &self.events {
                let handler = event_route(&scope, route.clone(), context.clone());
                self.subscriptions.push(module.on(event, handler));
            }
            if scope.is_view() {
                for (event, route) in &self.actions {
                    let handler = action_route(&scope, route.clone(), self.context.clone());
                    self.subscriptions.push(module.on(event, handler));
                }
            }
        }
        Ok(())
    }

    pub fn update(&mut self, context: &Value, delay: &mut Delay) -> Result<()> {
        if !self.core.is_rendered() {
            return Ok(());
        }
        if let Some(item) = self.item() {
            delay.add(item.set(self.bound(context)));
        }
        *self.context.borrow_mut() = context.clone();
        for nodes in self.groups.values() {
            update_all(&mut nodes.borrow_mut(), context, delay)?;
        }
        Ok(())
    }

    pub fn destroy(&mut self, delay: &mut Delay) -> Result<()> {
        if !self.core.is_rendered() {
            return Ok(());
        }
        if let Some(item) = self.item() {
            delay.add(item.destroy());
            for name in self.groups.keys() {
                if let Some(region) = item.region(name) {
                    delay.add(region.close());
                }
            }
        }
        for dispose in self.subscriptions.drain(..) {
            dispose();
        }
        self.core.set_rendered(false);
        Ok(())
    }

    pub fn release(&mut self) -> Result<()> {
        for nodes in self.groups.values() {
            release_all(&mut nodes.borrow_mut())?;
        }
        self.core.set_rendered(false);
        Ok(())
    }

    pub(crate) fn first_element(&self) -> Option<ElementId> {
        self.item.try_borrow().ok()?.as_ref()?.first_element()
    }

    /// The bound keys of `context`, renamed for the item.
    fn bound(&self, context: &Value) -> Value {
        let data: Map<String, Value> = self
            .bindings
            .iter()
            .map(|(from, to)| (to.clone(), lookup(context, from)))
            .collect();
        Value::Object(data)
    }
}

/// Handler calling `route` on the owner with the context captured now.
fn event_route(scope: &Scope, route: Route, context: Value) -> EventHandler {
    let owner = scope.clone();
    Rc::new(move |event: &Value| {
        let args = resolve_arguments(&context, &route.args, event);
        if let Err(err) = owner.route_event(&route.method, args) {
            warn!(method = %route.method, error = %err, "event route failed");
        }
    })
}

/// Handler calling action `route` on the owning view with the latest context.
fn action_route(scope: &Scope, route: Route, context: Rc<RefCell<Value>>) -> EventHandler {
    let owner = scope.clone();
    Rc::new(move |event: &Value| {
        let args = resolve_arguments(&context.borrow(), &route.args, event);
        if let Err(err) = owner.route_action(&route.method, args) {
            warn!(method = %route.method, error = %err, "action route failed");
        }
    })
}
