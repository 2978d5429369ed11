//! # respool graphics
//!
//! Transient GPU resources for render passes, pooled per frame.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`BufferPool`], [`ImagePool`] and [`TexelBufferPool`] - pools of physical
//!   resources that independent passes alias when their descriptors match
//! - [`RenderResources`] - the three pools over one device, with batched
//!   state transitions
//! - [`GpuDevice`] - trait for device implementations: Vulkan (ash) and Dummy
//!   (for testing)
//!
//! ## Example
//!
//! ```ignore
//! use respool_graphics::{
//!     BufferDescriptor, BufferUsage, DeviceParameters, RenderResources, create_device,
//! };
//!
//! let device = create_device(&DeviceParameters::default())?;
//! let mut resources = RenderResources::new(device);
//!
//! loop {
//!     resources.start_frame();
//!     let scratch = resources
//!         .buffers
//!         .create(&BufferDescriptor::new(4096, BufferUsage::STORAGE), "scratch")?;
//!     // Record passes...
//!     resources.buffers.release(scratch);
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod profiling;
pub mod render_resources;
pub mod resources;
pub mod types;

// Re-export main types for convenience
pub use backend::{
    CommandBuffer, DummyDevice, GpuDevice, MemoryAllocationBytes, NativeBuffer,
    NativeBufferView, NativeImage, NativeImageView, create_device, has_gpu_backend,
};
pub use config::{BackendPreference, DeviceParameters};
pub use error::GraphicsError;
pub use render_resources::{RenderResources, Transitions};
pub use resources::{
    Buffer, BufferHandle, BufferPool, Image, ImageHandle, ImagePool, TexelBuffer,
    TexelBufferHandle, TexelBufferPool,
};
pub use respool_core::{PoolSettings, ResourceHandle};
pub use types::{
    BufferDescriptor, BufferState, BufferUsage, ImageDescriptor, ImageFormat, ImageState,
    ImageUsage, MemoryProperties, TexelBufferDescriptor,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at startup.
pub fn init() {
    log::info!("respool graphics v{} initialized", VERSION);
}
