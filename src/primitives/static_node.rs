//! Static and dynamic element nodes.
//!
//! A [`StaticNode`] owns one element with fixed tag and attributes and renders its
//! children into it. A [`DynamicNode`] is the same element with some attributes
//! bound to context keys; `update` rewrites only the attributes whose value changed.
//!
//! ```ignore
//! let card = StaticNode::new("div")
//!     .attr("class", "card")
//!     .child(TextNode::new().text("Hello ").key("name"));
//!
//! let link = DynamicNode::new("a").bind_attr("href", "user.url");
//! ```

use serde_json::Value;

use super::node::{destroy_all, init_all, release_all, render_all, update_all, Mount, Node, NodeCore};
use crate::engine::ElementId;
use crate::error::{Result, WeaveError};
use crate::pipeline::Delay;
use crate::state::Scope;
use crate::types::lookup;

// =============================================================================
// StaticNode
// =============================================================================

/// Element with fixed shape.
pub struct StaticNode {
    pub(crate) core: NodeCore,
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl StaticNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            core: NodeCore::default(),
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Give the node a stable identifier (unique within its component).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.core = NodeCore::with_id(Some(id.into()));
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
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

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The element, once created.
    pub fn element_id(&self) -> Option<ElementId> {
        self.core.element
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn init(&mut self, scope: &Scope, delay: &mut Delay) -> Result<()> {
        if self.core.init(scope)? {
            init_all(&mut self.children, scope, delay)?;
        }
        Ok(())
    }

    pub fn render(&mut self, mount: Mount, context: &Value, delay: &mut Delay) -> Result<()> {
        if self.core.is_rendered() {
            return Ok(());
        }
        let element = self.create()?;
        self.core.attach(element, mount)?;
        self.core.set_rendered(true);
        render_all(&mut self.children, Mount::new(element), context, delay)
    }

    pub fn update(&mut self, context: &Value, delay: &mut Delay) -> Result<()> {
        if !self.core.is_rendered() {
            return Ok(());
        }
        update_all(&mut self.children, context, delay)
    }

    pub fn destroy(&mut self, delay: &mut Delay) -> Result<()> {
        if !self.core.is_rendered() {
            return Ok(());
        }
        destroy_all(&mut self.children, delay)?;
        self.core.detach()?;
        self.core.set_rendered(false);
        Ok(())
    }

    pub fn release(&mut self) -> Result<()> {
        release_all(&mut self.children)?;
        self.core.release()
    }

    /// Create the element on first use; later calls return the same element.
    fn create(&mut self) -> Result<ElementId> {
        if let Some(element) = self.core.element {
            return Ok(element);
        }
        let surface = self.core.surface()?.clone();
        let element = {
            let mut surface = surface.borrow_mut();
            let element = surface.create_element(&self.tag)?;
            for (name, value) in &self.attributes {
                surface.set_attribute(element, name, value)?;
            }
            element
        };
        self.core.element = Some(element);
        Ok(element)
    }
}

// =============================================================================
// DynamicNode
// =============================================================================

struct AttributeBinding {
    name: String,
    key: String,
    last: Option<Option<String>>,
}

/// Element whose attributes follow context keys.
pub struct DynamicNode {
    pub(crate) inner: StaticNode,
    bindings: Vec<AttributeBinding>,
}

impl DynamicNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: StaticNode::new(tag),
            bindings: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.inner = self.inner.id(id);
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner = self.inner.attr(name, value);
        self
    }

    /// Bind attribute `name` to the context value at `key`.
    pub fn bind_attr(mut self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.bindings.push(AttributeBinding {
            name: name.into(),
            key: key.into(),
            last: None,
        });
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.inner = self.inner.child(node);
        self
    }

    pub fn element_id(&self) -> Option<ElementId> {
        self.inner.element_id()
    }

    pub fn init(&mut self, scope: &Scope, delay: &mut Delay) -> Result<()> {
        self.inner.init(scope, delay)
    }

    pub fn render(&mut self, mount: Mount, context: &Value, delay: &mut Delay) -> Result<()> {
        if self.inner.core.is_rendered() {
            return Ok(());
        }
        self.inner.render(mount, context, delay)?;
        self.apply(context)
    }

    pub fn update(&mut self, context: &Value, delay: &mut Delay) -> Result<()> {
        if !self.inner.core.is_rendered() {
            return Ok(());
        }
        self.apply(context)?;
        self.inner.update(context, delay)
    }

    pub fn destroy(&mut self, delay: &mut Delay) -> Result<()> {
        self.inner.destroy(delay)
    }

    pub fn release(&mut self) -> Result<()> {
        self.inner.release()
    }

    fn apply(&mut self, context: &Value) -> Result<()> {
        let element = self.inner.core.element.ok_or(WeaveError::Uninitialized)?;
        let surface = self.inner.core.surface()?.clone();
        let mut surface = surface.borrow_mut();
        for binding in &mut self.bindings {
            let value = attribute_value(&binding.name, &lookup(context, &binding.key));
            if binding.last.as_ref() == Some(&value) {
                continue;
            }
            match &value {
                Some(text) => surface.set_attribute(element, &binding.name, text)?,
                None => surface.remove_attribute(element, &binding.name)?,
            }
            binding.last = Some(value);
        }
        Ok(())
    }
}

/// `null`/`false` remove the attribute, `true` sets it to its own name.
fn attribute_value(name: &str, value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some(name.to_string()),
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::TextNode;
    use crate::state::Scope;
    use crate::engine::{LayoutSurface, SharedSurface, Surface};
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() -> (Rc<RefCell<LayoutSurface>>, Scope, ElementId) {
        let surface = Rc::new(RefCell::new(LayoutSurface::new()));
        let shared: SharedSurface = surface.clone();
        let root = surface.borrow_mut().create_element("root").unwrap();
        (surface, Scope::standalone(shared), root)
    }

    #[test]
    fn test_render_is_idempotent() {
        let (surface, scope, root) = setup();
        let mut node = StaticNode::new("div").attr("class", "box");
        let mut delay = Delay::new();
        node.init(&scope, &mut delay).unwrap();

        node.render(Mount::new(root), &json!({}), &mut delay).unwrap();
        let created = surface.borrow().created_count();
        node.render(Mount::new(root), &json!({}), &mut delay).unwrap();

        assert_eq!(surface.borrow().created_count(), created);
        assert_eq!(surface.borrow().children(root).len(), 1);
        let element = node.element_id().unwrap();
        assert_eq!(surface.borrow().attribute(element, "class"), Some("box".into()));
        assert!(block_on(delay.end()).is_ok());
    }

    #[test]
    fn test_destroy_before_render_is_noop() {
        let (surface, scope, root) = setup();
        let mut node = StaticNode::new("div").child(StaticNode::new("span"));
        let mut delay = Delay::new();
        node.init(&scope, &mut delay).unwrap();

        node.destroy(&mut delay).unwrap();
        assert_eq!(surface.borrow().created_count(), 1); // only root
        assert!(surface.borrow().children(root).is_empty());
        assert!(delay.is_empty());
    }

    #[test]
    fn test_destroy_detaches_and_rerender_reuses_element() {
        let (surface, scope, root) = setup();
        let mut node = StaticNode::new("div").child(TextNode::new().text("hi"));
        let mut delay = Delay::new();
        node.init(&scope, &mut delay).unwrap();

        node.render(Mount::new(root), &json!({}), &mut delay).unwrap();
        let element = node.element_id().unwrap();
        assert_eq!(surface.borrow().text_content(root), "hi");

        node.destroy(&mut delay).unwrap();
        assert!(surface.borrow().children(root).is_empty());
        assert!(surface.borrow().children(element).is_empty());

        let created = surface.borrow().created_count();
        node.render(Mount::new(root), &json!({}), &mut delay).unwrap();
        assert_eq!(surface.borrow().created_count(), created);
        assert_eq!(node.element_id(), Some(element));
        assert_eq!(surface.borrow().text_content(root), "hi");
    }

    #[test]
    fn test_dynamic_attributes_follow_context() {
        let (surface, scope, root) = setup();
        let mut node = DynamicNode::new("a").bind_attr("href", "url").bind_attr("hidden", "hide");
        let mut delay = Delay::new();
        node.init(&scope, &mut delay).unwrap();

        node.render(Mount::new(root), &json!({"url": "/a", "hide": true}), &mut delay)
            .unwrap();
        let element = node.element_id().unwrap();
        assert_eq!(surface.borrow().attribute(element, "href"), Some("/a".into()));
        assert_eq!(surface.borrow().attribute(element, "hidden"), Some("hidden".into()));

        node.update(&json!({"url": "/b", "hide": false}), &mut delay).unwrap();
        assert_eq!(surface.borrow().attribute(element, "href"), Some("/b".into()));
        assert_eq!(surface.borrow().attribute(element, "hidden"), None);
    }

    #[test]
    fn test_duplicate_id_is_reported() {
        let (_surface, scope, _root) = setup();
        let mut a = StaticNode::new("div").id("x");
        let mut b = StaticNode::new("div").id("x");
        let mut delay = Delay::new();
        a.init(&scope, &mut delay).unwrap();
        assert!(matches!(
            b.init(&scope, &mut delay),
            Err(WeaveError::DuplicateId { .. })
        ));
    }
}
