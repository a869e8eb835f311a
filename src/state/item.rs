//! Item - a created child component: a view or a module.

use std::fmt;

use futures::future::LocalBoxFuture;
use serde_json::Value;

use super::module::Module;
use super::view::View;
use crate::engine::ElementId;
use crate::error::Result;
use crate::primitives::{Mount, RegionHandle};
use crate::types::ComponentStatus;

#[derive(Clone)]
pub enum Item {
    Module(Module),
    View(View),
}

impl Item {
    pub fn name(&self) -> String {
        match self {
            Item::Module(module) => module.name().to_string(),
            Item::View(view) => view.name().to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Item::Module(_) => "module",
            Item::View(_) => "view",
        }
    }

    pub fn status(&self) -> ComponentStatus {
        match self {
            Item::Module(module) => module.status(),
            Item::View(view) => view.status(),
        }
    }

    /// Push data into the item (filtered by exported models for modules).
    pub fn set(&self, data: Value) -> LocalBoxFuture<'static, Result<()>> {
        match self {
            Item::Module(module) => module.set(data),
            Item::View(view) => view.set(data),
        }
    }

    pub fn get(&self) -> Value {
        match self {
            Item::Module(module) => module.get(),
            Item::View(view) => view.get(),
        }
    }

    pub fn render(&self, mount: Mount) -> LocalBoxFuture<'static, Result<()>> {
        match self {
            Item::Module(module) => module.render(mount),
            Item::View(view) => view.render(mount),
        }
    }

    pub fn destroy(&self) -> LocalBoxFuture<'static, Result<()>> {
        match self {
            Item::Module(module) => module.destroy(),
            Item::View(view) => view.destroy(),
        }
    }

    pub fn region(&self, name: &str) -> Option<RegionHandle> {
        match self {
            Item::Module(module) => module.region(name),
            Item::View(view) => view.region(name),
        }
    }

    pub fn as_module(&self) -> Option<&Module> {
        match self {
            Item::Module(module) => Some(module),
            Item::View(_) => None,
        }
    }

    pub fn as_view(&self) -> Option<&View> {
        match self {
            Item::View(view) => Some(view),
            Item::Module(_) => None,
        }
    }

    pub fn first_element(&self) -> Option<ElementId> {
        match self {
            Item::Module(module) => module.first_element(),
            Item::View(view) => view.first_element(),
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}

impl From<Module> for Item {
    fn from(module: Module) -> Self {
        Item::Module(module)
    }
}

impl From<View> for Item {
    fn from(view: View) -> Self {
        Item::View(view)
    }
}
