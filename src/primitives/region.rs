//! Region - a named, swappable slot inside a component's template.
//!
//! A region owns no element of its own. It renders whatever it currently shows
//! at its position among its siblings:
//!
//! - nothing (empty)
//! - a list of nodes (its declared children, or nodes handed to it)
//! - one item (a view or module created by the owning component)
//!
//! At init the region registers a [`RegionHandle`] with its owning component.
//! Every handle operation first fully closes the current content, then
//! establishes the new one. Operations on one region run one at a time, in the
//! order they were requested.
//!
//! Nodes handed over through [`RegionHandle::show_node`] stay governed by whoever
//! handed them over; the region only updates its declared children.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::debug;

use super::node::{
    destroy_all, first_element, init_all, node_list, release_all, render_all, update_all, Mount, Node, NodeList,
};
use crate::engine::ElementId;
use crate::error::{Result, WeaveError};
use crate::pipeline::{Chain, Delay};
use crate::state::{Item, Scope};
use crate::types::{empty_object, NodeFlags};

/// Region name used when none is given.
pub const DEFAULT_REGION: &str = "default";

enum RegionContent {
    Empty,
    Nodes(NodeList),
    Item(Item),
}

struct RegionInner {
    scope: Option<Scope>,
    flags: NodeFlags,
    mount: Option<Mount>,
    anchor: Option<ElementId>,
    context: Value,
    content: RegionContent,
}

struct RegionState {
    name: String,
    declared: NodeList,
    inner: RefCell<RegionInner>,
    ops: Chain,
}

impl RegionState {
    fn is_rendered(&self) -> bool {
        self.inner.borrow().flags.contains(NodeFlags::RENDERED)
    }

    /// Where content goes, if the region is rendered.
    fn target(&self) -> Option<Mount> {
        let inner = self.inner.borrow();
        if !inner.flags.contains(NodeFlags::RENDERED) {
            return None;
        }
        inner
            .mount
            .map(|mount| Mount::new(mount.parent).before(inner.anchor.or(mount.before)))
    }

    fn scope(&self) -> Result<Scope> {
        self.inner.borrow().scope.clone().ok_or(WeaveError::Uninitialized)
    }

    fn take_content(&self) -> RegionContent {
        std::mem::replace(&mut self.inner.borrow_mut().content, RegionContent::Empty)
    }

    /// Destroy whatever is shown and become empty.
    async fn close_now(&self) -> Result<()> {
        self.inner.borrow_mut().flags.remove(NodeFlags::SHOW_DECLARED);
        match self.take_content() {
            RegionContent::Empty => Ok(()),
            RegionContent::Nodes(nodes) => {
                debug!(region = %self.name, "closing nodes");
                Delay::also(|delay| destroy_all(&mut nodes.borrow_mut(), delay)).await
            }
            RegionContent::Item(item) => {
                debug!(region = %self.name, item = %item.name(), "closing item");
                item.destroy().await
            }
        }
    }

    /// Render `nodes` as the region's content.
    ///
    /// Init work (nested item creation) settles before the render pass starts.
    async fn establish_nodes(&self, nodes: NodeList, context: Value) -> Result<()> {
        if self.target().is_none() {
            return Ok(());
        }
        let scope = self.scope()?;
        {
            let mut inner = self.inner.borrow_mut();
            inner.context = context.clone();
            inner.content = RegionContent::Nodes(nodes.clone());
        }
        Delay::also(|delay| init_all(&mut nodes.borrow_mut(), &scope, delay)).await?;

        let Some(mount) = self.target() else {
            return Ok(());
        };
        Delay::also(|delay| render_all(&mut nodes.borrow_mut(), mount, &context, delay)).await
    }

    fn first_element(&self) -> Option<ElementId> {
        let inner = self.inner.try_borrow().ok()?;
        match &inner.content {
            RegionContent::Empty => None,
            RegionContent::Nodes(nodes) => nodes.try_borrow().ok().and_then(|nodes| first_element(&nodes)),
            RegionContent::Item(item) => item.first_element(),
        }
    }
}

// =============================================================================
// RegionNode
// =============================================================================

/// Template node marking a region.
pub struct RegionNode {
    state: Rc<RegionState>,
}

impl Default for RegionNode {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

impl RegionNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: Rc::new(RegionState {
                name: name.into(),
                declared: node_list(Vec::new()),
                inner: RefCell::new(RegionInner {
                    scope: None,
                    flags: NodeFlags::empty(),
                    mount: None,
                    anchor: None,
                    context: empty_object(),
                    content: RegionContent::Empty,
                }),
                ops: Chain::new(),
            }),
        }
    }

    pub fn child(self, node: impl Into<Node>) -> Self {
        self.state.declared.borrow_mut().push(node.into());
        self
    }

    pub fn with_children(self, nodes: Vec<Node>) -> Self {
        self.state.declared.borrow_mut().extend(nodes);
        self
    }

    /// Show the declared children when the region first renders.
    pub fn show_children(self) -> Self {
        self.state.inner.borrow_mut().flags.insert(NodeFlags::SHOW_DECLARED);
        self
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn handle(&self) -> RegionHandle {
        RegionHandle {
            state: self.state.clone(),
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.state.is_rendered()
    }

    pub fn init(&mut self, scope: &Scope, delay: &mut Delay) -> Result<()> {
        {
            let mut inner = self.state.inner.borrow_mut();
            if inner.flags.contains(NodeFlags::INITIALIZED) {
                return Ok(());
            }
            inner.flags.insert(NodeFlags::INITIALIZED);
            inner.scope = Some(scope.clone());
        }
        scope.register_region(&self.state.name, self.handle())?;
        init_all(&mut self.state.declared.borrow_mut(), scope, delay)
    }

    pub fn render(&mut self, mount: Mount, context: &Value, delay: &mut Delay) -> Result<()> {
        let show_declared = {
            let mut inner = self.state.inner.borrow_mut();
            if inner.flags.contains(NodeFlags::RENDERED) {
                return Ok(());
            }
            inner.flags.insert(NodeFlags::RENDERED);
            inner.mount = Some(mount);
            inner.context = context.clone();
            let show_declared = inner.flags.contains(NodeFlags::SHOW_DECLARED);
            if show_declared {
                inner.content = RegionContent::Nodes(self.state.declared.clone());
            }
            show_declared
        };
        if show_declared {
            let target = Mount::new(mount.parent).before(self.state.inner.borrow().anchor.or(mount.before));
            render_all(&mut self.state.declared.borrow_mut(), target, context, delay)?;
        }
        Ok(())
    }

    pub fn update(&mut self, context: &Value, delay: &mut Delay) -> Result<()> {
        let show_declared = {
            let mut inner = self.state.inner.borrow_mut();
            if !inner.flags.contains(NodeFlags::RENDERED) {
                return Ok(());
            }
            inner.context = context.clone();
            inner.flags.contains(NodeFlags::SHOW_DECLARED)
        };
        if show_declared {
            update_all(&mut self.state.declared.borrow_mut(), context, delay)?;
        }
        Ok(())
    }

    /// Template teardown: destroy shown nodes, hand the item's destroy to `delay`.
    pub fn destroy(&mut self, delay: &mut Delay) -> Result<()> {
        if !self.state.is_rendered() {
            return Ok(());
        }
        let content = self.state.take_content();
        self.state.inner.borrow_mut().flags.remove(NodeFlags::RENDERED);
        match content {
            RegionContent::Empty => {}
            RegionContent::Nodes(nodes) => destroy_all(&mut nodes.borrow_mut(), delay)?,
            RegionContent::Item(item) => delay.add(item.destroy()),
        }
        Ok(())
    }

    pub fn release(&mut self) -> Result<()> {
        release_all(&mut self.state.declared.borrow_mut())
    }

    pub(crate) fn first_element(&self) -> Option<ElementId> {
        self.state.first_element()
    }

    pub(crate) fn anchor(&self) -> Option<ElementId> {
        self.state.inner.try_borrow().ok()?.anchor
    }

    pub(crate) fn set_anchor(&mut self, anchor: Option<ElementId>) {
        self.state.inner.borrow_mut().anchor = anchor;
    }
}

// =============================================================================
// RegionHandle
// =============================================================================

/// Controller for a region, registered with its owning component.
#[derive(Clone)]
pub struct RegionHandle {
    state: Rc<RegionState>,
}

impl RegionHandle {
    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn is_rendered(&self) -> bool {
        self.state.is_rendered()
    }

    /// Nothing is shown.
    pub fn is_empty(&self) -> bool {
        matches!(self.state.inner.borrow().content, RegionContent::Empty)
    }

    /// The declared children are shown.
    pub fn is_showing_children(&self) -> bool {
        self.state.inner.borrow().flags.contains(NodeFlags::SHOW_DECLARED)
    }

    /// The currently shown item, if any.
    pub fn item(&self) -> Option<Item> {
        match &self.state.inner.borrow().content {
            RegionContent::Item(item) => Some(item.clone()),
            _ => None,
        }
    }

    /// Close, then create item `name` through the owning component and render it here.
    ///
    /// Resolves to `None` when the region is not rendered.
    pub fn show(&self, name: &str, state: Value) -> LocalBoxFuture<'static, Result<Option<Item>>> {
        let region = self.state.clone();
        let name = name.to_string();
        let state = Some(state).filter(|state| !state.is_null());
        self.state
            .ops
            .enqueue(async move {
                if !region.is_rendered() {
                    return Ok(None);
                }
                region.close_now().await?;
                debug!(region = %region.name, item = %name, "showing item");
                let item = region.scope()?.create_item(&name, state).await?;
                let Some(mount) = region.target() else {
                    return Ok(None);
                };
                region.inner.borrow_mut().content = RegionContent::Item(item.clone());
                item.render(mount).await?;
                Ok(Some(item))
            })
            .boxed_local()
    }

    /// Close, then render `nodes` here with `context`.
    pub fn show_node(&self, nodes: NodeList, context: Value) -> LocalBoxFuture<'static, Result<()>> {
        let region = self.state.clone();
        self.state
            .ops
            .enqueue(async move {
                if !region.is_rendered() {
                    return Ok(());
                }
                region.close_now().await?;
                debug!(region = %region.name, "showing nodes");
                region.establish_nodes(nodes, context).await
            })
            .boxed_local()
    }

    /// Close, then show the declared children again.
    ///
    /// On a region that is not rendered yet this only marks the children to be
    /// shown at render.
    pub fn show_children(&self) -> LocalBoxFuture<'static, Result<()>> {
        let region = self.state.clone();
        self.state
            .ops
            .enqueue(async move {
                if !region.is_rendered() {
                    region.inner.borrow_mut().flags.insert(NodeFlags::SHOW_DECLARED);
                    return Ok(());
                }
                region.close_now().await?;
                let context = region.inner.borrow().context.clone();
                region.establish_nodes(region.declared.clone(), context).await?;
                region.inner.borrow_mut().flags.insert(NodeFlags::SHOW_DECLARED);
                Ok(())
            })
            .boxed_local()
    }

    /// Destroy whatever is shown. Closing an empty region does nothing.
    pub fn close(&self) -> LocalBoxFuture<'static, Result<()>> {
        let region = self.state.clone();
        self.state
            .ops
            .enqueue(async move { region.close_now().await })
            .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LayoutSurface, SharedSurface, Surface};
    use crate::primitives::{StaticNode, TextNode};
    use futures::executor::block_on;
    use serde_json::json;

    fn setup() -> (Rc<RefCell<LayoutSurface>>, Scope, ElementId) {
        let surface = Rc::new(RefCell::new(LayoutSurface::new()));
        let shared: SharedSurface = surface.clone();
        let root = surface.borrow_mut().create_element("root").unwrap();
        (surface, Scope::standalone(shared), root)
    }

    fn render(region: &mut RegionNode, scope: &Scope, root: ElementId) {
        let mut delay = Delay::new();
        region.init(scope, &mut delay).unwrap();
        region.render(Mount::new(root), &json!({"who": "you"}), &mut delay).unwrap();
        block_on(delay.end()).unwrap();
    }

    #[test]
    fn test_registers_handle_under_name() {
        let (_surface, scope, root) = setup();
        let mut region = RegionNode::new("main");
        render(&mut region, &scope, root);
        let handle = scope.region("main").unwrap();
        assert_eq!(handle.name(), "main");
        assert!(handle.is_rendered());
        assert!(handle.is_empty());
    }

    #[test]
    fn test_declared_children_shown_when_marked() {
        let (surface, scope, root) = setup();
        let mut region = RegionNode::default()
            .child(TextNode::new().text("hello ").key("who"))
            .show_children();
        render(&mut region, &scope, root);
        assert_eq!(surface.borrow().text_content(root), "hello you");

        let mut delay = Delay::new();
        region.update(&json!({"who": "them"}), &mut delay).unwrap();
        assert_eq!(surface.borrow().text_content(root), "hello them");
    }

    #[test]
    fn test_show_node_replaces_content() {
        let (surface, scope, root) = setup();
        let mut region = RegionNode::default()
            .child(TextNode::new().text("declared"))
            .show_children();
        render(&mut region, &scope, root);
        let handle = region.handle();

        let nodes = node_list(vec![StaticNode::new("p").child(TextNode::new().key("msg")).into()]);
        block_on(handle.show_node(nodes.clone(), json!({"msg": "swapped"}))).unwrap();

        assert_eq!(surface.borrow().text_content(root), "swapped");
        assert!(!handle.is_showing_children());
        assert!(nodes.borrow()[0].is_rendered());

        block_on(handle.close()).unwrap();
        assert!(handle.is_empty());
        assert_eq!(surface.borrow().text_content(root), "");
        assert!(!nodes.borrow()[0].is_rendered());

        // Closing twice is a no-op.
        block_on(handle.close()).unwrap();
    }

    #[test]
    fn test_show_children_restores_declared() {
        let (surface, scope, root) = setup();
        let mut region = RegionNode::default().child(TextNode::new().text("declared"));
        render(&mut region, &scope, root);
        assert_eq!(surface.borrow().text_content(root), "");

        let handle = region.handle();
        block_on(handle.show_children()).unwrap();
        assert_eq!(surface.borrow().text_content(root), "declared");
        assert!(handle.is_showing_children());
    }

    #[test]
    fn test_operations_on_unrendered_region_do_nothing() {
        let (surface, scope, root) = setup();
        let mut region = RegionNode::default();
        let mut delay = Delay::new();
        region.init(&scope, &mut delay).unwrap();

        let handle = region.handle();
        let nodes = node_list(vec![TextNode::new().text("x").into()]);
        block_on(handle.show_node(nodes, json!({}))).unwrap();
        assert!(matches!(block_on(handle.show("anything", json!({}))), Ok(None)));
        assert!(handle.is_empty());
        assert!(surface.borrow().children(root).is_empty());
    }

    #[test]
    fn test_destroy_destroys_shown_nodes() {
        let (surface, scope, root) = setup();
        let mut region = RegionNode::default().child(TextNode::new().text("a")).show_children();
        render(&mut region, &scope, root);

        let mut delay = Delay::new();
        region.destroy(&mut delay).unwrap();
        block_on(delay.end()).unwrap();
        assert!(!region.is_rendered());
        assert!(surface.borrow().children(root).is_empty());
    }

    #[test]
    fn test_show_on_standalone_scope_fails() {
        let (_surface, scope, root) = setup();
        let mut region = RegionNode::default();
        render(&mut region, &scope, root);
        let result = block_on(region.handle().show("missing", json!({})));
        assert!(matches!(result, Err(WeaveError::UnknownItem { .. })));
    }

    #[test]
    fn test_duplicate_region_name_is_reported() {
        let (_surface, scope, _root) = setup();
        let mut delay = Delay::new();
        RegionNode::new("side").init(&scope, &mut delay).unwrap();
        assert!(matches!(
            RegionNode::new("side").init(&scope, &mut delay),
            Err(WeaveError::DuplicateId { .. })
        ));
    }
}
