//! Descriptors, formats, usage flags and states for pooled GPU resources.

mod barrier;
mod buffer;
mod image;
mod state;
mod texel_buffer;

pub use barrier::{BufferBarrier, ImageAspects, ImageBarrier, SubresourceRange};
pub use buffer::{BufferDescriptor, BufferUsage, MemoryProperties};
pub use image::{ImageCreateFlags, ImageDescriptor, ImageFormat, ImageType, ImageUsage};
pub use state::{AccessFlags, BufferState, ImageLayout, ImageState, PipelineStages};
pub use texel_buffer::{FormatFeatures, TexelBufferDescriptor};
