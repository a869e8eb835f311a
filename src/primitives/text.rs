//! Text node - a run of static and context-bound segments.
//!
//! The node owns a single text element. Its content is the concatenation of its
//! segments, with key segments resolved against the render context. `update` only
//! touches the surface when the resulting text differs from what is displayed.
//!
//! ```ignore
//! let greeting = TextNode::new().text("Hello, ").key("user.name").text("!");
//! ```

use serde_json::Value;
use tracing::trace;

use super::node::{Mount, NodeCore};
use crate::error::{Result, WeaveError};
use crate::state::Scope;
use crate::types::{display_value, lookup};

/// One piece of a text node.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Static(String),
    /// Dotted context path, displayed with `null` as the empty string.
    Key(String),
}

/// Text leaf.
#[derive(Default)]
pub struct TextNode {
    pub(crate) core: NodeCore,
    segments: Vec<Segment>,
    shown: Option<String>,
}

impl TextNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.core = NodeCore::with_id(Some(id.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::Static(text.into()));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Text currently on the surface, if rendered at least once.
    pub fn shown(&self) -> Option<&str> {
        self.shown.as_deref()
    }

    pub fn init(&mut self, scope: &Scope) -> Result<()> {
        self.core.init(scope).map(|_| ())
    }

    pub fn render(&mut self, mount: Mount, context: &Value) -> Result<()> {
        if self.core.is_rendered() {
            return Ok(());
        }
        let content = self.compose(context);
        let surface = self.core.surface()?.clone();
        let element = match self.core.element {
            Some(element) => {
                if self.shown.as_deref() != Some(content.as_str()) {
                    surface.borrow_mut().set_text(element, &content)?;
                }
                element
            }
            None => surface.borrow_mut().create_text(&content)?,
        };
        self.core.element = Some(element);
        self.shown = Some(content);
        self.core.attach(element, mount)?;
        self.core.set_rendered(true);
        Ok(())
    }

    pub fn update(&mut self, context: &Value) -> Result<()> {
        if !self.core.is_rendered() {
            return Ok(());
        }
        let content = self.compose(context);
        if self.shown.as_deref() == Some(content.as_str()) {
            return Ok(());
        }
        let element = self.core.element.ok_or(WeaveError::Uninitialized)?;
        trace!(text = %content, "text changed");
        self.core.surface()?.borrow_mut().set_text(element, &content)?;
        self.shown = Some(content);
        Ok(())
    }

    pub fn destroy(&mut self) -> Result<()> {
        if !self.core.is_rendered() {
            return Ok(());
        }
        self.core.detach()?;
        self.core.set_rendered(false);
        Ok(())
    }

    pub fn release(&mut self) -> Result<()> {
        self.shown = None;
        self.core.release()
    }

    fn compose(&self, context: &Value) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Static(text) => text.clone(),
                Segment::Key(key) => display_value(&lookup(context, key)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ElementId, LayoutSurface, SharedSurface, Surface};
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
    fn test_segments_resolve_against_context() {
        let (surface, scope, root) = setup();
        let mut node = TextNode::new().text("Hi ").key("user.name").key("missing");
        node.init(&scope).unwrap();
        node.render(Mount::new(root), &json!({"user": {"name": "Ada"}}))
            .unwrap();
        assert_eq!(surface.borrow().text_content(root), "Hi Ada");
        assert_eq!(node.shown(), Some("Hi Ada"));
    }

    #[test]
    fn test_update_only_when_changed() {
        let (surface, scope, root) = setup();
        let mut node = TextNode::new().key("count");
        node.init(&scope).unwrap();
        node.render(Mount::new(root), &json!({"count": 1})).unwrap();

        node.update(&json!({"count": 1})).unwrap();
        assert_eq!(surface.borrow().text_content(root), "1");

        node.update(&json!({"count": 2})).unwrap();
        assert_eq!(surface.borrow().text_content(root), "2");
    }

    #[test]
    fn test_update_before_render_is_noop() {
        let (surface, scope, root) = setup();
        let mut node = TextNode::new().key("count");
        node.init(&scope).unwrap();
        node.update(&json!({"count": 5})).unwrap();
        assert!(node.shown().is_none());
        assert!(surface.borrow().children(root).is_empty());
    }

    #[test]
    fn test_render_without_init_fails() {
        let (_surface, _scope, root) = setup();
        let mut node = TextNode::new().text("x");
        assert_eq!(
            node.render(Mount::new(root), &json!({})),
            Err(WeaveError::Uninitialized)
        );
    }
}
