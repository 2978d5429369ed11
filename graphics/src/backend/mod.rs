//! GPU device abstraction.
//!
//! Pools never talk to a graphics API directly. They go through the
//! [`GpuDevice`] trait, which creates and destroys physical resources, keeps
//! memory accounting and records barriers.
//!
//! # Available Backends
//!
//! - `dummy`: no-op device that hands out fake handles, used by tests and tooling
//! - `vulkan` (feature `vulkan-backend`, default): native Vulkan through ash and gpu-allocator
//!
//! Resources returned by a device are plain handle bundles. They do not free
//! anything on drop; ownership is tracked by the pools, which hand them back
//! through the matching `destroy_*` call.

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

pub mod dummy;

use std::sync::Arc;

#[cfg(feature = "vulkan-backend")]
use ash::vk;

use crate::config::{BackendPreference, DeviceParameters};
use crate::error::GraphicsError;
use crate::types::{
    BufferBarrier, BufferDescriptor, FormatFeatures, ImageBarrier, ImageCreateFlags,
    ImageDescriptor, ImageFormat, ImageType, TexelBufferDescriptor,
};

pub use dummy::DummyDevice;

// ============================================================================
// Native handles
// ============================================================================

/// Native buffer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeBuffer {
    /// Dummy backend id.
    Dummy(u64),
    /// Vulkan buffer.
    #[cfg(feature = "vulkan-backend")]
    Vulkan(vk::Buffer),
}

/// Native image handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeImage {
    /// Dummy backend id.
    Dummy(u64),
    /// Vulkan image.
    #[cfg(feature = "vulkan-backend")]
    Vulkan(vk::Image),
}

/// Native image view handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeImageView {
    /// Dummy backend id.
    Dummy(u64),
    /// Vulkan image view.
    #[cfg(feature = "vulkan-backend")]
    Vulkan(vk::ImageView),
}

/// Native texel buffer view handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeBufferView {
    /// Dummy backend id.
    Dummy(u64),
    /// Vulkan buffer view.
    #[cfg(feature = "vulkan-backend")]
    Vulkan(vk::BufferView),
}

/// Command buffer barriers are recorded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandBuffer {
    /// Dummy backend id.
    Dummy(u64),
    /// Vulkan command buffer in the recording state.
    #[cfg(feature = "vulkan-backend")]
    Vulkan(vk::CommandBuffer),
}

/// Object a debug name can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugObject {
    Buffer(NativeBuffer),
    BufferView(NativeBufferView),
    Image(NativeImage),
    ImageView(NativeImageView),
}

// ============================================================================
// Device resources
// ============================================================================

/// Physical buffer created by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuBuffer {
    pub handle: NativeBuffer,
    /// Requested size in bytes.
    pub byte_size: u64,
    /// Size of the backing allocation in bytes.
    pub allocation_size: u64,
    /// GPU virtual address, when requested through the usage flags.
    pub device_address: Option<u64>,
}

/// Physical image created by a device, with a view over all of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuImage {
    pub handle: NativeImage,
    pub view: NativeImageView,
    pub image_type: ImageType,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_count: u32,
    pub layer_count: u32,
    pub create_flags: ImageCreateFlags,
    /// Size of the backing allocation in bytes.
    pub allocation_size: u64,
}

/// Physical texel buffer created by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuTexelBuffer {
    pub handle: NativeBuffer,
    pub view: NativeBufferView,
    pub format: ImageFormat,
    /// Requested size in bytes.
    pub byte_size: u64,
    /// Size of the backing allocation in bytes.
    pub allocation_size: u64,
}

/// Bytes allocated by a device, split by resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MemoryAllocationBytes {
    pub images: u64,
    pub buffers: u64,
    pub texel_buffers: u64,
}

impl MemoryAllocationBytes {
    /// Sum over all resource kinds.
    pub fn total(&self) -> u64 {
        self.images + self.buffers + self.texel_buffers
    }
}

// ============================================================================
// Device trait
// ============================================================================

/// GPU device trait for abstracting different graphics APIs.
///
/// All methods take `&self`; implementations guard their own allocator state.
pub trait GpuDevice: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Create a buffer resource.
    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        debug_name: &str,
    ) -> Result<GpuBuffer, GraphicsError>;

    /// Destroy a buffer resource.
    fn destroy_buffer(&self, buffer: GpuBuffer);

    /// Create an image resource together with its whole-resource view.
    fn create_image(
        &self,
        descriptor: &ImageDescriptor,
        debug_name: &str,
    ) -> Result<GpuImage, GraphicsError>;

    /// Destroy an image resource and its whole-resource view.
    fn destroy_image(&self, image: GpuImage);

    /// Create a texel buffer after validating its format features.
    ///
    /// The allocation is accounted as a texel buffer, not as a buffer.
    fn create_texel_buffer(
        &self,
        descriptor: &TexelBufferDescriptor,
        debug_name: &str,
    ) -> Result<GpuTexelBuffer, GraphicsError>;

    /// Destroy a texel buffer and its view.
    fn destroy_texel_buffer(&self, buffer: GpuTexelBuffer);

    /// Create one view per mip level of a single-layer image.
    fn create_subresource_views(
        &self,
        image: &GpuImage,
        debug_name: &str,
    ) -> Result<Vec<NativeImageView>, GraphicsError>;

    /// Destroy views returned by [`create_subresource_views`](Self::create_subresource_views).
    fn destroy_image_views(&self, views: &[NativeImageView]);

    /// Texel buffer features supported for a format.
    fn format_features(&self, format: ImageFormat) -> FormatFeatures;

    /// Attach a debug name to an object.
    fn set_debug_name(&self, object: DebugObject, name: &str);

    /// Bytes currently allocated through this device.
    fn memory_allocations(&self) -> MemoryAllocationBytes;

    /// Allocate a one-shot command buffer and begin recording.
    fn begin_commands(&self) -> Result<CommandBuffer, GraphicsError>;

    /// End recording, submit, wait for completion and free the command buffer.
    fn submit_commands(&self, cmd: CommandBuffer) -> Result<(), GraphicsError>;

    /// Record a single pipeline barrier covering all given barriers.
    fn cmd_pipeline_barrier(
        &self,
        cmd: CommandBuffer,
        buffer_barriers: &[BufferBarrier],
        image_barriers: &[ImageBarrier],
    );
}

/// Create a device according to `params`.
///
/// With [`BackendPreference::Auto`], Vulkan is tried first and the dummy
/// device is used when Vulkan cannot be initialized.
pub fn create_device(params: &DeviceParameters) -> Result<Arc<dyn GpuDevice>, GraphicsError> {
    match params.backend {
        BackendPreference::Dummy => {
            log::info!("Using dummy device");
            Ok(Arc::new(DummyDevice::new()))
        }
        BackendPreference::Vulkan => create_vulkan_device(params),
        BackendPreference::Auto => match create_vulkan_device(params) {
            Ok(device) => Ok(device),
            Err(e) => {
                log::warn!("Failed to create Vulkan device: {}", e);
                log::info!("Using dummy device");
                Ok(Arc::new(DummyDevice::new()))
            }
        },
    }
}

#[cfg(feature = "vulkan-backend")]
fn create_vulkan_device(params: &DeviceParameters) -> Result<Arc<dyn GpuDevice>, GraphicsError> {
    let device = vulkan::VulkanDevice::new(params)?;
    log::info!("Using Vulkan device (ash)");
    Ok(Arc::new(device))
}

#[cfg(not(feature = "vulkan-backend"))]
fn create_vulkan_device(_params: &DeviceParameters) -> Result<Arc<dyn GpuDevice>, GraphicsError> {
    Err(GraphicsError::FeatureNotSupported(
        "built without the vulkan-backend feature".to_string(),
    ))
}

/// Check if a real GPU backend is compiled in.
pub fn has_gpu_backend() -> bool {
    cfg!(feature = "vulkan-backend")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_allocation_total() {
        let bytes = MemoryAllocationBytes {
            images: 1,
            buffers: 2,
            texel_buffers: 4,
        };
        assert_eq!(bytes.total(), 7);
    }

    #[test]
    fn test_create_dummy_device() {
        let params = DeviceParameters::new().with_backend(BackendPreference::Dummy);
        let device = create_device(&params).unwrap();
        assert_eq!(device.name(), "Dummy Device");
    }
}
