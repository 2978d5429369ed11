//! Profiling support via Tracy.
//!
//! This module re-exports CPU profiling from [`respool_core::profiling`].
//! Enable it with the `profiling` feature:
//!
//! ```toml
//! [dependencies]
//! respool-graphics = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! Pool frames, creation and batched transitions are instrumented. The
//! macros themselves live at the crate root of `respool_core`:
//!
//! ```ignore
//! fn record_frame(resources: &mut RenderResources) {
//!     respool_core::profile_function!();
//!     resources.start_frame();
//!     // ...
//!     respool_core::frame_mark!();
//! }
//! ```

pub use respool_core::profiling::*;
