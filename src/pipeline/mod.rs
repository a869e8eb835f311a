//! Pipeline - lifecycle pass plumbing.
//!
//! - [`delay`] - Join-all barrier for the async work of one pass
//! - [`chain`] - FIFO serialization (dispatch `busy` chain, region operations)
//! - [`mount`] - Application entry point

pub mod chain;
pub mod delay;
pub mod mount;

pub use chain::Chain;
pub use delay::{Delay, Pending};
pub use mount::{mount, MountHandle};
