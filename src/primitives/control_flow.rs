//! Control flow blocks - conditional and list rendering.
//!
//! - [`IfBlock`] - renders one of two branches by the truthiness of a context key
//! - [`EachBlock`] - renders one row per element of a context array
//!
//! Both own no element; their content is inserted at the block's position among
//! its siblings.
//!
//! # Branch switching
//!
//! When the condition flips on update, the old branch is destroyed before the new
//! branch renders. The branches are built once and kept, so switching back reuses
//! their elements.
//!
//! # Rows
//!
//! Rows are built from a factory. On update, existing rows are updated in place,
//! surplus rows are destroyed from the bottom up and released, and missing rows
//! are built, initialized and rendered.
//!
//! ```ignore
//! IfBlock::new("user.admin")
//!     .then(TextNode::new().text("admin"))
//!     .otherwise(TextNode::new().text("guest"));
//!
//! EachBlock::new("todos", "todo", || {
//!     vec![StaticNode::new("li").child(TextNode::new().key("todo.title")).into()]
//! });
//! ```

use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use super::node::{
    destroy_all, first_element, init_all, node_list, release_all, render_all, update_all, Mount, Node, NodeCore,
    NodeList,
};
use crate::engine::ElementId;
use crate::error::{Result, WeaveError};
use crate::pipeline::Delay;
use crate::state::Scope;
use crate::types::{is_truthy, lookup};

/// Where a block's content goes, given its mount and anchor.
fn content_mount(core: &NodeCore) -> Result<Mount> {
    let mount = core.mount.ok_or(WeaveError::Uninitialized)?;
    Ok(Mount::new(mount.parent).before(core.anchor.or(mount.before)))
}

// =============================================================================
// IfBlock
// =============================================================================

/// Conditional block.
pub struct IfBlock {
    pub(crate) core: NodeCore,
    key: String,
    negate: bool,
    then_branch: Vec<Node>,
    else_branch: Vec<Node>,
    showing: Option<bool>,
}

impl IfBlock {
    /// Render `then` when `key` is truthy.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            core: NodeCore::default(),
            key: key.into(),
            negate: false,
            then_branch: Vec::new(),
            else_branch: Vec::new(),
            showing: None,
        }
    }

    /// Render `then` when `key` is falsy.
    pub fn unless(key: impl Into<String>) -> Self {
        Self {
            negate: true,
            ..Self::new(key)
        }
    }

    pub fn then(mut self, node: impl Into<Node>) -> Self {
        self.then_branch.push(node.into());
        self
    }

    pub fn otherwise(mut self, node: impl Into<Node>) -> Self {
        self.else_branch.push(node.into());
        self
    }

    fn condition(&self, context: &Value) -> bool {
        is_truthy(&lookup(context, &self.key)) != self.negate
    }

    fn branch_mut(&mut self, which: bool) -> &mut Vec<Node> {
        if which {
            &mut self.then_branch
        } else {
            &mut self.else_branch
        }
    }

    pub fn init(&mut self, scope: &Scope, delay: &mut Delay) -> Result<()> {
        if self.core.init(scope)? {
            init_all(&mut self.then_branch, scope, delay)?;
            init_all(&mut self.else_branch, scope, delay)?;
        }
        Ok(())
    }

    pub fn render(&mut self, mount: Mount, context: &Value, delay: &mut Delay) -> Result<()> {
        if self.core.is_rendered() {
            return Ok(());
        }
        self.core.mount = Some(mount);
        self.core.set_rendered(true);
        let which = self.condition(context);
        let target = content_mount(&self.core)?;
        render_all(self.branch_mut(which), target, context, delay)?;
        self.showing = Some(which);
        Ok(())
    }

    pub fn update(&mut self, context: &Value, delay: &mut Delay) -> Result<()> {
        if !self.core.is_rendered() {
            return Ok(());
        }
        let which = self.condition(context);
        let showing = self.showing;
        match showing {
            Some(current) if current == which => update_all(self.branch_mut(which), context, delay),
            current => {
                trace!(key = %self.key, branch = which, "switching branch");
                if let Some(current) = current {
                    destroy_all(self.branch_mut(current), delay)?;
                }
                let target = content_mount(&self.core)?;
                render_all(self.branch_mut(which), target, context, delay)?;
                self.showing = Some(which);
                Ok(())
            }
        }
    }

    pub fn destroy(&mut self, delay: &mut Delay) -> Result<()> {
        if !self.core.is_rendered() {
            return Ok(());
        }
        if let Some(current) = self.showing.take() {
            destroy_all(self.branch_mut(current), delay)?;
        }
        self.core.set_rendered(false);
        Ok(())
    }

    pub fn release(&mut self) -> Result<()> {
        release_all(&mut self.then_branch)?;
        release_all(&mut self.else_branch)?;
        self.core.set_rendered(false);
        Ok(())
    }

    pub(crate) fn first_element(&self) -> Option<ElementId> {
        match self.showing? {
            true => first_element(&self.then_branch),
            false => first_element(&self.else_branch),
        }
    }
}

// =============================================================================
// EachBlock
// =============================================================================

/// Builds the nodes of one row.
pub type RowFactory = Rc<dyn Fn() -> Vec<Node>>;

struct Row {
    nodes: NodeList,
    live: Rc<Cell<bool>>,
}

/// List block.
pub struct EachBlock {
    pub(crate) core: NodeCore,
    key: String,
    alias: String,
    factory: RowFactory,
    scope: Option<Scope>,
    rows: Vec<Row>,
}

impl EachBlock {
    /// One row per element of the array at `key`, bound as `alias`.
    pub fn new(key: impl Into<String>, alias: impl Into<String>, factory: impl Fn() -> Vec<Node> + 'static) -> Self {
        Self {
            core: NodeCore::default(),
            key: key.into(),
            alias: alias.into(),
            factory: Rc::new(factory),
            scope: None,
            rows: Vec::new(),
        }
    }

    /// Number of rows currently held.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn init(&mut self, scope: &Scope) -> Result<()> {
        if self.core.init(scope)? {
            self.scope = Some(scope.clone());
        }
        Ok(())
    }

    pub fn render(&mut self, mount: Mount, context: &Value, delay: &mut Delay) -> Result<()> {
        if self.core.is_rendered() {
            return Ok(());
        }
        self.core.mount = Some(mount);
        self.core.set_rendered(true);
        self.sync(context, delay)
    }

    pub fn update(&mut self, context: &Value, delay: &mut Delay) -> Result<()> {
        if !self.core.is_rendered() {
            return Ok(());
        }
        self.sync(context, delay)
    }

    pub fn destroy(&mut self, delay: &mut Delay) -> Result<()> {
        if !self.core.is_rendered() {
            return Ok(());
        }
        self.truncate(0, delay)?;
        self.core.set_rendered(false);
        Ok(())
    }

    pub fn release(&mut self) -> Result<()> {
        for row in self.rows.drain(..) {
            row.live.set(false);
            release_all(&mut row.nodes.borrow_mut())?;
        }
        self.core.set_rendered(false);
        Ok(())
    }

    pub(crate) fn first_element(&self) -> Option<ElementId> {
        self.rows
            .iter()
            .find_map(|row| row.nodes.try_borrow().ok().and_then(|nodes| first_element(&nodes)))
    }

    fn row_context(&self, context: &Value, element: &Value, index: usize) -> Value {
        let mut row = match context {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        row.insert(self.alias.clone(), element.clone());
        row.insert(format!("{}_index", self.alias), Value::from(index));
        Value::Object(row)
    }

    fn sync(&mut self, context: &Value, delay: &mut Delay) -> Result<()> {
        let elements = match lookup(context, &self.key) {
            Value::Array(elements) => elements,
            _ => Vec::new(),
        };

        for (index, (row, element)) in self.rows.iter().zip(&elements).enumerate() {
            let row_context = self.row_context(context, element, index);
            update_all(&mut row.nodes.borrow_mut(), &row_context, delay)?;
        }

        self.truncate(elements.len(), delay)?;

        if elements.len() > self.rows.len() {
            self.extend(context, &elements, delay)?;
        }
        Ok(())
    }

    /// Destroy and release rows past `len`, last first.
    fn truncate(&mut self, len: usize, delay: &mut Delay) -> Result<()> {
        while self.rows.len() > len {
            let Some(row) = self.rows.pop() else { break };
            row.live.set(false);
            let mut nodes = row.nodes.borrow_mut();
            destroy_all(&mut nodes, delay)?;
            release_all(&mut nodes)?;
        }
        Ok(())
    }

    /// Build rows for `elements[self.rows.len()..]`; they render once their init work settles.
    fn extend(&mut self, context: &Value, elements: &[Value], delay: &mut Delay) -> Result<()> {
        let scope = self.scope.clone().ok_or(WeaveError::Uninitialized)?;
        let target = content_mount(&self.core)?;
        let mut init = Delay::new();
        let mut pending = Vec::new();

        for (index, element) in elements.iter().enumerate().skip(self.rows.len()) {
            let nodes = node_list((self.factory)());
            init_all(&mut nodes.borrow_mut(), &scope, &mut init)?;
            let row = Row {
                nodes,
                live: Rc::new(Cell::new(true)),
            };
            pending.push((row.nodes.clone(), row.live.clone(), self.row_context(context, element, index)));
            self.rows.push(row);
        }
        trace!(key = %self.key, added = pending.len(), "adding rows");

        delay.add(async move {
            init.end().await?;
            let mut rendering = Delay::new();
            for (nodes, live, row_context) in pending {
                if live.get() {
                    render_all(&mut nodes.borrow_mut(), target, &row_context, &mut rendering)?;
                }
            }
            rendering.end().await
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{LayoutSurface, SharedSurface, Surface};
    use crate::primitives::{StaticNode, TextNode};
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::RefCell;

    fn setup() -> (Rc<RefCell<LayoutSurface>>, Scope, ElementId) {
        let surface = Rc::new(RefCell::new(LayoutSurface::new()));
        let shared: SharedSurface = surface.clone();
        let root = surface.borrow_mut().create_element("root").unwrap();
        (surface, Scope::standalone(shared), root)
    }

    #[test]
    fn test_if_switches_branches() {
        let (surface, scope, root) = setup();
        let mut block = IfBlock::new("on")
            .then(TextNode::new().text("yes"))
            .otherwise(TextNode::new().text("no"));
        let mut delay = Delay::new();
        block.init(&scope, &mut delay).unwrap();
        block.render(Mount::new(root), &json!({"on": true}), &mut delay).unwrap();
        assert_eq!(surface.borrow().text_content(root), "yes");

        block.update(&json!({"on": false}), &mut delay).unwrap();
        assert_eq!(surface.borrow().text_content(root), "no");
        assert_eq!(surface.borrow().children(root).len(), 1);

        let created = surface.borrow().created_count();
        block.update(&json!({"on": true}), &mut delay).unwrap();
        assert_eq!(surface.borrow().text_content(root), "yes");
        assert_eq!(surface.borrow().created_count(), created);
    }

    #[test]
    fn test_unless_keeps_position_among_siblings() {
        let (surface, scope, root) = setup();
        let mut nodes: Vec<Node> = vec![
            TextNode::new().text("[").into(),
            IfBlock::unless("hidden").then(TextNode::new().text("x")).into(),
            TextNode::new().text("]").into(),
        ];
        let mut delay = Delay::new();
        init_all(&mut nodes, &scope, &mut delay).unwrap();
        render_all(&mut nodes, Mount::new(root), &json!({"hidden": true}), &mut delay).unwrap();
        assert_eq!(surface.borrow().text_content(root), "[]");

        update_all(&mut nodes, &json!({"hidden": false}), &mut delay).unwrap();
        assert_eq!(surface.borrow().text_content(root), "[x]");
    }

    #[test]
    fn test_each_tracks_array_length() {
        let (surface, scope, root) = setup();
        let mut block = EachBlock::new("items", "item", || {
            vec![StaticNode::new("li")
                .child(TextNode::new().key("item_index").text(":").key("item"))
                .into()]
        });
        block.init(&scope).unwrap();

        let mut delay = Delay::new();
        block
            .render(Mount::new(root), &json!({"items": ["a", "b"]}), &mut delay)
            .unwrap();
        block_on(delay.end()).unwrap();
        assert_eq!(block.len(), 2);
        assert_eq!(surface.borrow().text_content(root), "0:a1:b");

        let mut delay = Delay::new();
        block
            .update(&json!({"items": ["z", "b", "c"]}), &mut delay)
            .unwrap();
        block_on(delay.end()).unwrap();
        assert_eq!(block.len(), 3);
        assert_eq!(surface.borrow().text_content(root), "0:z1:b2:c");

        let mut delay = Delay::new();
        block.update(&json!({"items": ["q"]}), &mut delay).unwrap();
        block_on(delay.end()).unwrap();
        assert_eq!(block.len(), 1);
        assert_eq!(surface.borrow().text_content(root), "0:q");
        assert_eq!(surface.borrow().children(root).len(), 1);
    }

    #[test]
    fn test_each_destroy_clears_rows() {
        let (surface, scope, root) = setup();
        let mut block = EachBlock::new("items", "item", || vec![TextNode::new().key("item").into()]);
        block.init(&scope).unwrap();

        let mut delay = Delay::new();
        block.render(Mount::new(root), &json!({"items": [1, 2]}), &mut delay).unwrap();
        block_on(delay.end()).unwrap();

        let mut delay = Delay::new();
        block.destroy(&mut delay).unwrap();
        block_on(delay.end()).unwrap();
        assert!(block.is_empty());
        assert!(surface.borrow().children(root).is_empty());
    }

    #[test]
    fn test_rows_removed_before_render_never_render() {
        let (surface, scope, root) = setup();
        let mut block = EachBlock::new("items", "item", || vec![TextNode::new().key("item").into()]);
        block.init(&scope).unwrap();

        let mut first = Delay::new();
        block.render(Mount::new(root), &json!({"items": [1, 2]}), &mut first).unwrap();
        let mut second = Delay::new();
        block.update(&json!({"items": []}), &mut second).unwrap();

        block_on(first.end()).unwrap();
        block_on(second.end()).unwrap();
        assert!(surface.borrow().children(root).is_empty());
    }
}
