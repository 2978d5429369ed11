//! # respool core
//!
//! Backend-agnostic pooling of transient, frame-scoped resources.
//!
//! [`ResourcePool`](pool::ResourcePool) owns physical resources and hands out
//! typed generational [`ResourceHandle`](handle::ResourceHandle)s. Resources
//! released during a frame are reused by later requests with the same
//! description, and are torn down only after staying unused for several
//! frames.

pub mod handle;
pub mod pool;
pub mod profiling;

pub use handle::ResourceHandle;
pub use pool::{MAX_FRAMES_IN_FLIGHT, PoolResource, PoolSettings, ResourcePool, StatefulResource};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at startup.
pub fn init() {
    log::info!("respool core v{} initialized", VERSION);
}
