//! Surface - the visual element provider.
//!
//! Nodes never touch elements directly; they go through the [`Surface`] trait.
//! Only the node that created an element mutates it.
//!
//! [`LayoutSurface`] is the stock implementation. Elements live in a Taffy tree
//! used as a parent/child element store; layout is left to whoever consumes it:
//!
//! ```ignore
//! let surface = Rc::new(RefCell::new(LayoutSurface::new()));
//! let root = surface.borrow_mut().create_element("root")?;
//! // ... mount a module under `root` ...
//! assert_eq!(surface.borrow().text_content(root), "hello");
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use taffy::{NodeId, Style, TaffyTree};

use crate::error::{Result, WeaveError};

/// Opaque handle to an element owned by a surface.
pub type ElementId = NodeId;

/// Shared, dynamically typed surface handle threaded through every node.
pub type SharedSurface = Rc<RefCell<dyn Surface>>;

// =============================================================================
// Surface Trait
// =============================================================================

/// Visual element provider consumed by the node lifecycle.
pub trait Surface {
    /// Create a detached element with the given tag.
    fn create_element(&mut self, tag: &str) -> Result<ElementId>;

    /// Create a detached text element.
    fn create_text(&mut self, text: &str) -> Result<ElementId>;

    /// Replace the content of a text element.
    fn set_text(&mut self, element: ElementId, text: &str) -> Result<()>;

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) -> Result<()>;

    fn remove_attribute(&mut self, element: ElementId, name: &str) -> Result<()>;

    /// Attach `child` under `parent`, before `before` when it is a child of `parent`,
    /// otherwise at the end.
    fn insert(&mut self, parent: ElementId, child: ElementId, before: Option<ElementId>)
    -> Result<()>;

    /// Detach `child` from `parent`. The element stays alive for re-insertion.
    fn remove(&mut self, parent: ElementId, child: ElementId) -> Result<()>;

    /// Free an element for good.
    fn release(&mut self, element: ElementId) -> Result<()>;
}

// =============================================================================
// Layout Surface
// =============================================================================

/// What an element in a [`LayoutSurface`] holds.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

/// A surface whose elements are Taffy nodes.
pub struct LayoutSurface {
    tree: TaffyTree<ElementKind>,
    created: usize,
}

impl Default for LayoutSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutSurface {
    pub fn new() -> Self {
        Self {
            tree: TaffyTree::new(),
            created: 0,
        }
    }

    /// Number of elements ever created (never decremented).
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Number of live elements.
    pub fn live_count(&self) -> usize {
        self.tree.total_node_count()
    }

    /// Attached children of an element, in order.
    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.tree.children(element).unwrap_or_default()
    }

    /// Parent of an attached element.
    pub fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.tree.parent(element)
    }

    pub fn tag(&self, element: ElementId) -> Option<String> {
        match self.tree.get_node_context(element)? {
            ElementKind::Element { tag, .. } => Some(tag.clone()),
            ElementKind::Text(_) => None,
        }
    }

    pub fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        match self.tree.get_node_context(element)? {
            ElementKind::Element { attributes, .. } => attributes.get(name).cloned(),
            ElementKind::Text(_) => None,
        }
    }

    /// Concatenated text of an element and its attached descendants.
    pub fn text_content(&self, element: ElementId) -> String {
        let mut out = String::new();
        self.collect_text(element, &mut out);
        out
    }

    fn collect_text(&self, element: ElementId, out: &mut String) {
        if let Some(ElementKind::Text(text)) = self.tree.get_node_context(element) {
            out.push_str(text);
        }
        for child in self.children(element) {
            self.collect_text(child, out);
        }
    }

    fn context_mut(&mut self, element: ElementId) -> Result<&mut ElementKind> {
        self.tree
            .get_node_context_mut(element)
            .ok_or_else(|| WeaveError::Surface(format!("unknown element {element:?}")))
    }

    fn attributes_mut(&mut self, element: ElementId) -> Result<&mut BTreeMap<String, String>> {
        match self.context_mut(element)? {
            ElementKind::Element { attributes, .. } => Ok(attributes),
            ElementKind::Text(_) => Err(WeaveError::Surface(format!(
                "text element {element:?} has no attributes"
            ))),
        }
    }
}

impl Surface for LayoutSurface {
    fn create_element(&mut self, tag: &str) -> Result<ElementId> {
        let kind = ElementKind::Element {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
        };
        let id = self.tree.new_leaf_with_context(Style::default(), kind)?;
        self.created += 1;
        Ok(id)
    }

    fn create_text(&mut self, text: &str) -> Result<ElementId> {
        let id = self
            .tree
            .new_leaf_with_context(Style::default(), ElementKind::Text(text.to_string()))?;
        self.created += 1;
        Ok(id)
    }

    fn set_text(&mut self, element: ElementId, text: &str) -> Result<()> {
        match self.context_mut(element)? {
            ElementKind::Text(content) => {
                *content = text.to_string();
            }
            ElementKind::Element { .. } => {
                return Err(WeaveError::Surface(format!(
                    "element {element:?} is not a text element"
                )));
            }
        }
        self.tree.mark_dirty(element)?;
        Ok(())
    }

    fn set_attribute(&mut self, element: ElementId, name: &str, value: &str) -> Result<()> {
        self.attributes_mut(element)?
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&mut self, element: ElementId, name: &str) -> Result<()> {
        self.attributes_mut(element)?.remove(name);
        Ok(())
    }

    fn insert(
        &mut self,
        parent: ElementId,
        child: ElementId,
        before: Option<ElementId>,
    ) -> Result<()> {
        if let Some(old_parent) = self.tree.parent(child) {
            self.tree.remove_child(old_parent, child)?;
        }
        let index = match before {
            Some(anchor) => self.tree.children(parent)?.iter().position(|c| *c == anchor),
            None => None,
        };
        match index {
            Some(index) => self.tree.insert_child_at_index(parent, index, child)?,
            None => self.tree.add_child(parent, child)?,
        }
        Ok(())
    }

    fn remove(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        if self.tree.parent(child) == Some(parent) {
            self.tree.remove_child(parent, child)?;
        }
        Ok(())
    }

    fn release(&mut self, element: ElementId) -> Result<()> {
        self.tree.remove(element)?;
        Ok(())
    }
}
