//! Mount API - Application entry point.
//!
//! Loads the application's entry module, renders it under a container element and
//! hands back a [`MountHandle`] that owns the running root component.
//!
//! # Example
//!
//! ```ignore
//! use spark_weave::pipeline::mount;
//!
//! let handle = mount(&app, container).await?;
//! handle.module().dispatch("increment", json!(1)).await?;
//! handle.unmount().await?;
//! ```

use tracing::info;

use crate::engine::{Application, ElementId};
use crate::error::Result;
use crate::primitives::Mount;
use crate::state::Module;
use crate::types::ComponentStatus;

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`mount`] that owns the root module.
pub struct MountHandle {
    module: Module,
    container: ElementId,
}

impl MountHandle {
    /// The root module.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// The element the root module is rendered under.
    pub fn container(&self) -> ElementId {
        self.container
    }

    /// Check if the root module is still live.
    pub fn is_running(&self) -> bool {
        self.module.status() == ComponentStatus::Rendered
    }

    /// Destroy the root module and wait for the teardown pass to finish.
    pub async fn unmount(self) -> Result<()> {
        info!(module = self.module.name(), "unmounting");
        self.module.destroy().await
    }
}

// =============================================================================
// Mount Function
// =============================================================================

/// Load the entry module configured on `app` and render it under `container`.
pub async fn mount(app: &Application, container: ElementId) -> Result<MountHandle> {
    let entry = app.options().entry.clone();
    info!(entry = %entry, "mounting");
    let module = app.load_module(&entry).await?;
    module.render(Mount::new(container)).await?;
    Ok(MountHandle { module, container })
}
