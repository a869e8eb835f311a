//! Template primitives - the node variants a compiled template is built from.
//!
//! - [`StaticNode`] / [`DynamicNode`] - elements with fixed or context-bound attributes
//! - [`TextNode`] - text built from static and context-bound segments
//! - [`RegionNode`] - a named slot whose content can be swapped at runtime
//! - [`ReferenceNode`] - a nested view or module
//! - [`IfBlock`] / [`EachBlock`] - conditional and list rendering
//!
//! # Architecture
//!
//! A template is a `Vec<Node>` built once per component instance. Every node walks
//! the same lifecycle (see [`node`]) and threads a [`Delay`](crate::pipeline::Delay)
//! through each pass so nested asynchronous work completes as one unit.
//!
//! ```ignore
//! let template = vec![
//!     StaticNode::new("header").child(TextNode::new().key("title")).into(),
//!     RegionNode::new("main").into(),
//!     ReferenceNode::new("footer").bind("year", "year").into(),
//! ];
//! ```

mod args;
mod control_flow;
pub mod node;
mod reference;
mod region;
mod static_node;
mod text;

pub use args::{resolve_arguments, ArgDescriptor, Route};
pub use control_flow::{EachBlock, IfBlock, RowFactory};
pub use node::{node_list, Mount, Node, NodeList};
pub use reference::ReferenceNode;
pub use region::{RegionHandle, RegionNode, DEFAULT_REGION};
pub use static_node::{DynamicNode, StaticNode};
pub use text::{Segment, TextNode};

/// Disposer returned by subscriptions.
pub type Cleanup = Box<dyn FnOnce()>;
