//! View - a stateless-ish component owned by a module.
//!
//! A view keeps plain data (no store, no actions of its own) and renders a
//! template against it. Its `action` forwards to the owning module's store, so
//! a view is how a template inside a module's region talks back to the module.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use serde_json::Value;
use tracing::debug;

use super::component::{Core, Registry};
use super::module::{Module, TemplateFactory, WeakModule};
use super::scope::Scope;
use crate::engine::{ElementId, SharedSurface};
use crate::error::{Result, WeaveError};
use crate::primitives::{Mount, Node, RegionHandle};
use crate::types::{empty_object, merge_object, ComponentStatus};

/// Named view handler.
pub type ViewHandler = Rc<dyn Fn(&View, &[Value])>;

/// View definition.
#[derive(Clone, Default)]
pub struct ViewOptions {
    pub template: Option<TemplateFactory>,
    pub handlers: HashMap<String, ViewHandler>,
    /// Initial data.
    pub state: Value,
}

impl ViewOptions {
    pub fn with_template<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Vec<Node> + 'static,
    {
        self.template = Some(Rc::new(factory));
        self
    }

    pub fn handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&View, &[Value]) + 'static,
    {
        self.handlers.insert(name.into(), Rc::new(handler));
        self
    }
}

pub(crate) struct ViewInner {
    core: Core,
    owner: WeakModule,
    data: RefCell<Value>,
    handlers: HashMap<String, ViewHandler>,
}

#[derive(Clone)]
pub struct View {
    inner: Rc<ViewInner>,
}

#[derive(Clone)]
pub(crate) struct WeakView(Weak<ViewInner>);

impl WeakView {
    pub(crate) fn upgrade(&self) -> Option<View> {
        self.0.upgrade().map(|inner| View { inner })
    }
}

impl View {
    pub fn create(owner: &Module, name: &str, options: ViewOptions) -> LocalBoxFuture<'static, Result<View>> {
        let ViewOptions {
            template,
            handlers,
            state,
        } = options;
        let mut data = empty_object();
        merge_object(&mut data, state);

        let template = template.map(|factory| factory()).unwrap_or_default();
        let view = View {
            inner: Rc::new(ViewInner {
                core: Core::new(name, owner.surface().clone(), template),
                owner: owner.downgrade(),
                data: RefCell::new(data),
                handlers,
            }),
        };
        let init = view.inner.core.init_template(&Scope::view(&view));
        async move {
            init.await?;
            debug!(view = %view.name(), "created");
            Ok(view)
        }
        .boxed_local()
    }

    pub fn name(&self) -> &str {
        &self.inner.core.name
    }

    pub fn status(&self) -> ComponentStatus {
        self.inner.core.status()
    }

    /// The module that created this view, while it is alive.
    pub fn owner(&self) -> Option<Module> {
        self.inner.owner.upgrade()
    }

    pub(crate) fn surface(&self) -> &SharedSurface {
        &self.inner.core.surface
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.core.registry
    }

    pub(crate) fn downgrade(&self) -> WeakView {
        WeakView(Rc::downgrade(&self.inner))
    }

    /// Owned copy of the view's data.
    pub fn get(&self) -> Value {
        self.inner.data.borrow().clone()
    }

    /// Merge `data` into the view's data and update the template.
    pub fn set(&self, data: Value) -> LocalBoxFuture<'static, Result<()>> {
        if self.status() == ComponentStatus::Created {
            merge_object(&mut self.inner.data.borrow_mut(), data);
            return future::ready(Ok(())).boxed_local();
        }
        let view = self.clone();
        self.inner
            .core
            .busy
            .enqueue(async move {
                merge_object(&mut view.inner.data.borrow_mut(), data);
                if !view.status().is_live() {
                    return Ok(());
                }
                let context = view.get();
                view.inner.core.update_template(&context).await
            })
            .boxed_local()
    }

    pub fn render(&self, mount: Mount) -> LocalBoxFuture<'static, Result<()>> {
        if !self.status().can_render() {
            return future::ready(Ok(())).boxed_local();
        }
        debug!(view = %self.name(), "rendering");
        self.inner.core.set_status(ComponentStatus::Rendering);
        let view = self.clone();
        self.inner
            .core
            .busy
            .enqueue(async move {
                let context = view.get();
                let result = view.inner.core.render_template(mount, &context).await;
                view.inner.core.set_status(ComponentStatus::Rendered);
                result
            })
            .boxed_local()
    }

    pub fn destroy(&self) -> LocalBoxFuture<'static, Result<()>> {
        match self.status() {
            ComponentStatus::Created => {
                self.inner.core.set_status(ComponentStatus::Destroyed);
                return future::ready(Ok(())).boxed_local();
            }
            ComponentStatus::Destroying | ComponentStatus::Destroyed => {
                return future::ready(Ok(())).boxed_local();
            }
            ComponentStatus::Rendering | ComponentStatus::Rendered => {}
        }
        let view = self.clone();
        self.inner
            .core
            .busy
            .enqueue(async move {
                if view.status() != ComponentStatus::Rendered {
                    return Ok(());
                }
                view.inner.core.set_status(ComponentStatus::Destroying);
                let result = view.inner.core.destroy_template().await;
                view.inner.core.set_status(ComponentStatus::Destroyed);
                result
            })
            .boxed_local()
    }

    pub fn settled(&self) -> LocalBoxFuture<'static, ()> {
        self.inner.core.busy.settled().boxed_local()
    }

    /// Dispatch store action `method` on the owning module.
    ///
    /// One argument is passed as the payload itself, none as null, several as an array.
    pub fn action(&self, method: &str, mut args: Vec<Value>) -> LocalBoxFuture<'static, Result<()>> {
        let Some(owner) = self.owner() else {
            return future::ready(Err(WeaveError::Destroyed(self.name().to_string()))).boxed_local();
        };
        let payload = match args.len() {
            0 => Value::Null,
            1 => args.remove(0),
            _ => Value::Array(args),
        };
        owner.dispatch(method, payload)
    }

    /// Call named handler `method`.
    pub fn handle_event(&self, method: &str, args: &[Value]) -> Result<()> {
        let handler = self
            .inner
            .handlers
            .get(method)
            .cloned()
            .ok_or_else(|| WeaveError::UnknownHandler {
                component: self.name().to_string(),
                name: method.to_string(),
            })?;
        handler(self, args);
        Ok(())
    }

    pub fn region(&self, name: &str) -> Option<RegionHandle> {
        self.inner.core.registry.region(name)
    }

    pub fn item_by_id(&self, id: &str) -> Option<super::item::Item> {
        self.inner.core.registry.item_by_id(id)
    }

    pub fn first_element(&self) -> Option<ElementId> {
        self.inner.core.first_element()
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}
