//! Engine - surface, application services, module references.
//!
//! - [`surface`] - Visual element provider trait and the Taffy-backed surface
//! - [`application`] - Session-level handle (surface, loaders, references)
//! - [`registry`] - Module reference registry

pub mod application;
pub mod registry;
pub mod surface;

pub use application::{Application, ApplicationOptions};
pub use registry::{ModuleReference, ModuleReferences};
pub use surface::{ElementId, ElementKind, LayoutSurface, SharedSurface, Surface};
