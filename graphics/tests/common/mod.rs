//! Common utilities for pool integration tests.
//!
//! This module provides shared test infrastructure that can be reused
//! across different backend implementations.

use std::sync::Arc;

use respool_graphics::{
    BackendPreference, BufferDescriptor, BufferUsage, CommandBuffer, DeviceParameters, GpuDevice,
    ImageDescriptor, ImageFormat, ImageUsage, RenderResources, TexelBufferDescriptor,
    create_device,
};

// ============================================================================
// Backend Enumeration
// ============================================================================

/// Available GPU backends for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Dummy backend (no actual GPU operations).
    Dummy,
    /// Vulkan backend (native via ash).
    Vulkan,
}

impl Backend {
    /// Check if this backend is compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            // Dummy backend is always available
            Backend::Dummy => true,
            Backend::Vulkan => cfg!(feature = "vulkan-backend"),
        }
    }

    /// Convert to DeviceParameters for creating a device.
    pub fn to_device_parameters(self) -> DeviceParameters {
        let params = DeviceParameters::new().with_application_name("respool-tests");
        match self {
            Backend::Dummy => params.with_backend(BackendPreference::Dummy),
            Backend::Vulkan => params.with_backend(BackendPreference::Vulkan),
        }
    }
}

// ============================================================================
// Test Context
// ============================================================================

/// Test context owning a device and the pools on top of it.
pub struct TestContext {
    /// The backend being tested.
    #[allow(dead_code)]
    pub backend: Backend,
    /// Device shared by the pools.
    pub device: Arc<dyn GpuDevice>,
    /// Pools under test.
    pub resources: RenderResources,
}

impl TestContext {
    /// Create a new test context for the given backend.
    ///
    /// Returns `None` if the backend is not available, which includes machines
    /// without a Vulkan driver.
    pub fn new(backend: Backend) -> Option<Self> {
        let _ = env_logger::builder().is_test(true).try_init();

        if !backend.is_available() {
            return None;
        }

        let device = match create_device(&backend.to_device_parameters()) {
            Ok(device) => device,
            Err(e) => {
                eprintln!("Failed to create {:?} device: {}", backend, e);
                return None;
            }
        };
        let resources = RenderResources::new(Arc::clone(&device));

        Some(Self {
            backend,
            device,
            resources,
        })
    }

    /// Run `record` inside a one-shot command buffer and wait for it.
    #[allow(dead_code)]
    pub fn submit<F>(&mut self, record: F)
    where
        F: FnOnce(&mut RenderResources, CommandBuffer),
    {
        let cmd = self
            .device
            .begin_commands()
            .expect("Failed to begin commands");
        record(&mut self.resources, cmd);
        self.device
            .submit_commands(cmd)
            .expect("Failed to submit commands");
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Storage buffer of `size` bytes.
#[allow(dead_code)]
pub fn storage_buffer(size: u64) -> BufferDescriptor {
    BufferDescriptor::new(size, BufferUsage::STORAGE | BufferUsage::TRANSFER_DST)
}

/// Sampled and storage 2D color image.
#[allow(dead_code)]
pub fn color_image(width: u32, height: u32, mips: u32) -> ImageDescriptor {
    ImageDescriptor::new_2d(
        width,
        height,
        ImageFormat::Rgba16Float,
        ImageUsage::SAMPLED | ImageUsage::STORAGE | ImageUsage::TRANSFER_DST,
    )
    .with_mip_count(mips)
}

/// Storage texel buffer of `size` bytes in a format every device supports.
#[allow(dead_code)]
pub fn storage_texels(size: u64) -> TexelBufferDescriptor {
    TexelBufferDescriptor::new(
        BufferDescriptor::new(size, BufferUsage::STORAGE_TEXEL),
        ImageFormat::R32Float,
    )
}
