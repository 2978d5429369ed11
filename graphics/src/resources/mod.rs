//! Pooled GPU resources.
//!
//! This module contains the physical resources that live in pool slots:
//! - [`Buffer`] - GPU memory buffer, pooled in a [`BufferPool`]
//! - [`Image`] - GPU image with a whole-resource view, pooled in an [`ImagePool`]
//! - [`TexelBuffer`] - buffer with a formatted view, pooled in a [`TexelBufferPool`]
//!
//! Each implements [`PoolResource`](respool_core::PoolResource) over
//! `dyn GpuDevice` and tracks its own usage state for barriers.

mod buffer;
mod image;
mod texel_buffer;

pub use buffer::{Buffer, BufferHandle, BufferPool};
pub use image::{Image, ImageHandle, ImagePool};
pub use texel_buffer::{TexelBuffer, TexelBufferHandle, TexelBufferPool};
