//! # spark-weave
//!
//! Compiled component tree runtime for Rust.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for component state.
//!
//! ## Architecture
//!
//! A component's render tree is built once from its template factory. Every node knows
//! how to create, update and tear itself down, so state changes never go through a
//! diffing pass:
//!
//! ```text
//! dispatch → Store (Signal<Value>) → updated hook → template update pass → Surface
//! ```
//!
//! Only [`RegionNode`] and [`ReferenceNode`] change tree shape at runtime. Every
//! lifecycle pass threads a [`Delay`] so nested asynchronous work (child component
//! creation, mounting, cross-component `set`) completes as one unit. Dispatches on a
//! [`Module`] are serialized through a FIFO [`Chain`].
//!
//! ## Modules
//!
//! - [`types`] - Core types (ComponentStatus, NodeFlags, context lookups)
//! - [`engine`] - Surface (visual element provider), application, module references
//! - [`pipeline`] - Delay batching, Chain serialization, mount entry point
//! - [`primitives`] - Node variants and the lifecycle protocol
//! - [`state`] - Store, event bus, Module, View, loaders

pub mod engine;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod primitives;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{Result, WeaveError};

pub use engine::{
    Application, ApplicationOptions, ElementId, ElementKind, LayoutSurface, ModuleReference,
    ModuleReferences, SharedSurface, Surface,
};

pub use pipeline::{mount, Chain, Delay, MountHandle};

pub use primitives::{
    resolve_arguments, ArgDescriptor, Cleanup, DynamicNode, EachBlock, IfBlock, Mount, Node,
    NodeList, ReferenceNode, RegionHandle, RegionNode, Route, Segment, StaticNode, TextNode,
};

pub use state::{
    Action, Definition, EventBus, EventHandler, Item, ItemOptions, Loader, LoaderFactory,
    MemoryLoader, MemoryRegistry, Module, ModuleHandler, ModuleHooks, ModuleOptions, Scope,
    Store, StoreOptions, TemplateFactory, View, ViewHandler, ViewOptions,
};
