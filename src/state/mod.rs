//! State - components and the state they carry.
//!
//! - **Store** - Signal-backed model object with named actions
//! - **EventBus** - Named events with deduplicated handlers
//! - **Module** - Store-owning component with serialized dispatch
//! - **View** - Data-only component that forwards actions to its module
//! - **Loaders** - Where module and view definitions come from
//! - **Scope** - What template nodes see of their owning component

mod component;
mod events;
mod item;
mod loader;
mod module;
mod scope;
mod store;
mod view;

pub use events::{EventBus, EventHandler};
pub use item::Item;
pub use loader::{Definition, Loader, LoaderFactory, MemoryLoader, MemoryRegistry};
pub use module::{
    ItemOptions, Module, ModuleHandler, ModuleHook, ModuleHooks, ModuleOptions, TemplateFactory, INIT_ACTION,
};
pub use scope::Scope;
pub use store::{Action, Store, StoreOptions};
pub use view::{View, ViewHandler, ViewOptions};
