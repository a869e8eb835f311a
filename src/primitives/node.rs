//! Node - the closed set of tree node variants and their lifecycle protocol.
//!
//! Every variant implements the same five operations:
//!
//! - `init(scope, delay)` - one-time wiring (ids, surface, regions, nested items)
//! - `render(mount, context, delay)` - idempotent; creates and attaches elements
//! - `update(context, delay)` - no-op unless rendered; pushes new context down
//! - `destroy(delay)` - no-op unless rendered; children first, then own element
//! - `release()` - frees elements for nodes that are dropped for good
//!
//! Asynchronous work is never awaited inside a node; it is added to the pass's
//! [`Delay`].

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use super::control_flow::{EachBlock, IfBlock};
use super::reference::ReferenceNode;
use super::region::RegionNode;
use super::static_node::{DynamicNode, StaticNode};
use super::text::TextNode;
use crate::engine::{ElementId, SharedSurface};
use crate::error::{Result, WeaveError};
use crate::pipeline::Delay;
use crate::state::Scope;
use crate::types::NodeFlags;

/// A list of nodes shared between an owner and a region that displays them.
pub type NodeList = Rc<RefCell<Vec<Node>>>;

/// Wrap nodes in a [`NodeList`].
pub fn node_list(nodes: Vec<Node>) -> NodeList {
    Rc::new(RefCell::new(nodes))
}

// =============================================================================
// Mount
// =============================================================================

/// Where a node's element goes: under `parent`, before `before` if set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mount {
    pub parent: ElementId,
    pub before: Option<ElementId>,
}

impl Mount {
    pub fn new(parent: ElementId) -> Self {
        Self {
            parent,
            before: None,
        }
    }

    pub fn before(self, before: Option<ElementId>) -> Self {
        Self { before, ..self }
    }
}

// =============================================================================
// Node Core
// =============================================================================

/// State shared by every element-owning node.
#[derive(Default)]
pub struct NodeCore {
    pub(crate) id: Option<String>,
    pub(crate) surface: Option<SharedSurface>,
    pub(crate) element: Option<ElementId>,
    pub(crate) mount: Option<Mount>,
    pub(crate) anchor: Option<ElementId>,
    pub(crate) flags: NodeFlags,
}

impl NodeCore {
    pub(crate) fn with_id(id: Option<String>) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Claim the id and keep the surface. Returns false if already initialized.
    pub(crate) fn init(&mut self, scope: &Scope) -> Result<bool> {
        if self.flags.contains(NodeFlags::INITIALIZED) {
            return Ok(false);
        }
        if let Some(id) = &self.id {
            scope.claim_id(id)?;
        }
        self.surface = Some(scope.surface().clone());
        self.flags.insert(NodeFlags::INITIALIZED);
        Ok(true)
    }

    pub(crate) fn surface(&self) -> Result<&SharedSurface> {
        self.surface.as_ref().ok_or(WeaveError::Uninitialized)
    }

    pub(crate) fn is_rendered(&self) -> bool {
        self.flags.contains(NodeFlags::RENDERED)
    }

    pub(crate) fn set_rendered(&mut self, rendered: bool) {
        self.flags.set(NodeFlags::RENDERED, rendered);
    }

    /// Insert the node's element at `mount`.
    pub(crate) fn attach(&mut self, element: ElementId, mount: Mount) -> Result<()> {
        self.surface()?
            .borrow_mut()
            .insert(mount.parent, element, mount.before)?;
        self.mount = Some(mount);
        Ok(())
    }

    /// Detach the node's element from its parent, keeping it for re-render.
    pub(crate) fn detach(&mut self) -> Result<()> {
        if let (Some(element), Some(mount)) = (self.element, self.mount) {
            self.surface()?.borrow_mut().remove(mount.parent, element)?;
        }
        Ok(())
    }

    pub(crate) fn release(&mut self) -> Result<()> {
        if let Some(element) = self.element.take() {
            self.surface()?.borrow_mut().release(element)?;
        }
        self.set_rendered(false);
        Ok(())
    }
}

// =============================================================================
// Node
// =============================================================================

/// A structural node of a compiled render tree.
pub enum Node {
    Static(StaticNode),
    Dynamic(DynamicNode),
    Text(TextNode),
    Region(RegionNode),
    Reference(ReferenceNode),
    If(IfBlock),
    Each(EachBlock),
}

impl Node {
    pub fn init(&mut self, scope: &Scope, delay: &mut Delay) -> Result<()> {
        match self {
            Node::Static(node) => node.init(scope, delay),
            Node::Dynamic(node) => node.init(scope, delay),
            Node::Text(node) => node.init(scope),
            Node::Region(node) => node.init(scope, delay),
            Node::Reference(node) => node.init(scope, delay),
            Node::If(node) => node.init(scope, delay),
            Node::Each(node) => node.init(scope),
        }
    }

    pub fn render(&mut self, mount: Mount, context: &Value, delay: &mut Delay) -> Result<()> {
        match self {
            Node::Static(node) => node.render(mount, context, delay),
            Node::Dynamic(node) => node.render(mount, context, delay),
            Node::Text(node) => node.render(mount, context),
            Node::Region(node) => node.render(mount, context, delay),
            Node::Reference(node) => node.render(mount, context, delay),
            Node::If(node) => node.render(mount, context, delay),
            Node::Each(node) => node.render(mount, context, delay),
        }
    }

    pub fn update(&mut self, context: &Value, delay: &mut Delay) -> Result<()> {
        match self {
            Node::Static(node) => node.update(context, delay),
            Node::Dynamic(node) => node.update(context, delay),
            Node::Text(node) => node.update(context),
            Node::Region(node) => node.update(context, delay),
            Node::Reference(node) => node.update(context, delay),
            Node::If(node) => node.update(context, delay),
            Node::Each(node) => node.update(context, delay),
        }
    }

    pub fn destroy(&mut self, delay: &mut Delay) -> Result<()> {
        match self {
            Node::Static(node) => node.destroy(delay),
            Node::Dynamic(node) => node.destroy(delay),
            Node::Text(node) => node.destroy(),
            Node::Region(node) => node.destroy(delay),
            Node::Reference(node) => node.destroy(delay),
            Node::If(node) => node.destroy(delay),
            Node::Each(node) => node.destroy(delay),
        }
    }

    /// Free every element owned by this subtree. Call after `destroy`.
    pub fn release(&mut self) -> Result<()> {
        match self {
            Node::Static(node) => node.release(),
            Node::Dynamic(node) => node.release(),
            Node::Text(node) => node.release(),
            Node::Region(node) => node.release(),
            Node::Reference(node) => node.release(),
            Node::If(node) => node.release(),
            Node::Each(node) => node.release(),
        }
    }

    /// Stable identifier, if declared.
    pub fn id(&self) -> Option<&str> {
        match self {
            Node::Static(node) => node.core.id.as_deref(),
            Node::Dynamic(node) => node.inner.core.id.as_deref(),
            Node::Text(node) => node.core.id.as_deref(),
            Node::Region(_) | Node::If(_) | Node::Each(_) => None,
            Node::Reference(node) => node.core.id.as_deref(),
        }
    }

    pub fn is_rendered(&self) -> bool {
        match self {
            Node::Static(node) => node.core.is_rendered(),
            Node::Dynamic(node) => node.inner.core.is_rendered(),
            Node::Text(node) => node.core.is_rendered(),
            Node::Region(node) => node.is_rendered(),
            Node::Reference(node) => node.core.is_rendered(),
            Node::If(node) => node.core.is_rendered(),
            Node::Each(node) => node.core.is_rendered(),
        }
    }

    /// First attached element of this subtree, used as an insertion anchor.
    pub fn element(&self) -> Option<ElementId> {
        if !self.is_rendered() {
            return None;
        }
        match self {
            Node::Static(node) => node.core.element,
            Node::Dynamic(node) => node.inner.core.element,
            Node::Text(node) => node.core.element,
            Node::Region(node) => node.first_element(),
            Node::Reference(node) => node.first_element(),
            Node::If(node) => node.first_element(),
            Node::Each(node) => node.first_element(),
        }
    }

    pub(crate) fn anchor(&self) -> Option<ElementId> {
        match self {
            Node::Static(node) => node.core.anchor,
            Node::Dynamic(node) => node.inner.core.anchor,
            Node::Text(node) => node.core.anchor,
            Node::Region(node) => node.anchor(),
            Node::Reference(node) => node.core.anchor,
            Node::If(node) => node.core.anchor,
            Node::Each(node) => node.core.anchor,
        }
    }

    pub(crate) fn set_anchor(&mut self, anchor: Option<ElementId>) {
        match self {
            Node::Static(node) => node.core.anchor = anchor,
            Node::Dynamic(node) => node.inner.core.anchor = anchor,
            Node::Text(node) => node.core.anchor = anchor,
            Node::Region(node) => node.set_anchor(anchor),
            Node::Reference(node) => node.core.anchor = anchor,
            Node::If(node) => node.core.anchor = anchor,
            Node::Each(node) => node.core.anchor = anchor,
        }
    }

    /// The `region` attribute of a static wrapper, used to group reference children.
    pub(crate) fn region_marker(&self) -> Option<&str> {
        match self {
            Node::Static(node) => node.attribute("region"),
            _ => None,
        }
    }
}

impl From<StaticNode> for Node {
    fn from(node: StaticNode) -> Self {
        Node::Static(node)
    }
}

impl From<DynamicNode> for Node {
    fn from(node: DynamicNode) -> Self {
        Node::Dynamic(node)
    }
}

impl From<TextNode> for Node {
    fn from(node: TextNode) -> Self {
        Node::Text(node)
    }
}

impl From<RegionNode> for Node {
    fn from(node: RegionNode) -> Self {
        Node::Region(node)
    }
}

impl From<ReferenceNode> for Node {
    fn from(node: ReferenceNode) -> Self {
        Node::Reference(node)
    }
}

impl From<IfBlock> for Node {
    fn from(node: IfBlock) -> Self {
        Node::If(node)
    }
}

impl From<EachBlock> for Node {
    fn from(node: EachBlock) -> Self {
        Node::Each(node)
    }
}

// =============================================================================
// List Helpers
// =============================================================================

pub fn init_all(nodes: &mut [Node], scope: &Scope, delay: &mut Delay) -> Result<()> {
    for node in nodes.iter_mut() {
        node.init(scope, delay)?;
    }
    Ok(())
}

/// Render siblings last to first, each inserted before the sibling after it.
///
/// Nodes whose content arrives later (references, new rows) still know where it
/// goes: their anchor is the first element rendered after them.
pub fn render_all(nodes: &mut [Node], mount: Mount, context: &Value, delay: &mut Delay) -> Result<()> {
    let mut next = mount.before;
    for node in nodes.iter_mut().rev() {
        node.set_anchor(next);
        node.render(Mount::new(mount.parent).before(next), context, delay)?;
        if let Some(element) = node.element() {
            next = Some(element);
        }
    }
    Ok(())
}

/// Update siblings last to first, re-pointing anchors at the elements present now.
///
/// The last sibling keeps the anchor it was rendered with.
pub fn update_all(nodes: &mut [Node], context: &Value, delay: &mut Delay) -> Result<()> {
    let mut next = nodes.last().and_then(Node::anchor);
    for node in nodes.iter_mut().rev() {
        node.set_anchor(next);
        node.update(context, delay)?;
        if let Some(element) = node.element() {
            next = Some(element);
        }
    }
    Ok(())
}

pub fn destroy_all(nodes: &mut [Node], delay: &mut Delay) -> Result<()> {
    for node in nodes.iter_mut() {
        node.destroy(delay)?;
    }
    Ok(())
}

pub fn release_all(nodes: &mut [Node]) -> Result<()> {
    for node in nodes.iter_mut() {
        node.release()?;
    }
    Ok(())
}

/// Point each sibling at the first element after it (or `tail`).
pub fn link_anchors(nodes: &mut [Node], tail: Option<ElementId>) {
    let mut next = tail;
    for node in nodes.iter_mut().rev() {
        node.set_anchor(next);
        if let Some(element) = node.element() {
            next = Some(element);
        }
    }
}

/// First element among a list of siblings.
pub fn first_element(nodes: &[Node]) -> Option<ElementId> {
    nodes.iter().find_map(Node::element)
}
