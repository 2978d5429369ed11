//! Aggregate of the three resource pools sharing one device.

use std::fmt;
use std::sync::Arc;

use respool_core::PoolSettings;

use crate::backend::{CommandBuffer, GpuDevice, MemoryAllocationBytes};
use crate::resources::{
    BufferHandle, BufferPool, ImageHandle, ImagePool, TexelBufferHandle, TexelBufferPool,
};
use crate::types::{BufferBarrier, BufferState, ImageBarrier, ImageState};

/// State transitions to record together.
#[derive(Debug, Clone, Default)]
pub struct Transitions {
    images: Vec<(ImageHandle, ImageState)>,
    texel_buffers: Vec<(TexelBufferHandle, BufferState)>,
    buffers: Vec<(BufferHandle, BufferState)>,
}

impl Transitions {
    /// Empty set of transitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move an image into `state`.
    pub fn image(mut self, handle: ImageHandle, state: ImageState) -> Self {
        self.images.push((handle, state));
        self
    }

    /// Move a texel buffer into `state`.
    pub fn texel_buffer(mut self, handle: TexelBufferHandle, state: BufferState) -> Self {
        self.texel_buffers.push((handle, state));
        self
    }

    /// Move a buffer into `state`.
    pub fn buffer(mut self, handle: BufferHandle, state: BufferState) -> Self {
        self.buffers.push((handle, state));
        self
    }

    /// Whether no transition was added.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.texel_buffers.is_empty() && self.buffers.is_empty()
    }
}

/// Images, texel buffers and buffers used by the render passes of a frame.
///
/// # Example
///
/// ```ignore
/// let mut resources = RenderResources::new(device);
/// resources.start_frame();
/// let hdr = resources.images.create(&hdr_desc, "hdr")?;
/// resources.transition(cmd, &Transitions::new().image(hdr, ImageState::COLOR_ATTACHMENT_WRITE));
/// resources.images.release(hdr);
/// ```
pub struct RenderResources {
    pub images: ImagePool,
    pub texel_buffers: TexelBufferPool,
    pub buffers: BufferPool,
    device: Arc<dyn GpuDevice>,
}

impl RenderResources {
    /// Create empty pools over `device` with default settings.
    pub fn new(device: Arc<dyn GpuDevice>) -> Self {
        Self::with_settings(device, PoolSettings::default())
    }

    /// Create empty pools over `device`, all using `settings`.
    pub fn with_settings(device: Arc<dyn GpuDevice>, settings: PoolSettings) -> Self {
        Self {
            images: ImagePool::with_settings(Arc::clone(&device), settings),
            texel_buffers: TexelBufferPool::with_settings(Arc::clone(&device), settings),
            buffers: BufferPool::with_settings(Arc::clone(&device), settings),
            device,
        }
    }

    /// Device shared by all pools.
    pub fn device(&self) -> &Arc<dyn GpuDevice> {
        &self.device
    }

    /// Advance every pool to the next frame.
    pub fn start_frame(&mut self) {
        respool_core::profile_scope!("RenderResources::start_frame");

        self.images.start_frame();
        self.texel_buffers.start_frame();
        self.buffers.start_frame();
    }

    /// Destroy every pooled resource immediately.
    pub fn destroy_resources(&mut self) {
        self.images.destroy_resources();
        self.texel_buffers.destroy_resources();
        self.buffers.destroy_resources();
    }

    /// Bytes the device currently has allocated.
    pub fn memory_allocations(&self) -> MemoryAllocationBytes {
        self.device.memory_allocations()
    }

    /// Record every needed barrier for `transitions` as one pipeline barrier.
    ///
    /// Transitions that need no barrier are skipped. Nothing is recorded if
    /// all of them are skipped.
    pub fn transition(&mut self, cmd: CommandBuffer, transitions: &Transitions) {
        respool_core::profile_scope!("RenderResources::transition");

        let mut image_barriers: Vec<ImageBarrier> = Vec::with_capacity(transitions.images.len());
        let mut buffer_barriers: Vec<BufferBarrier> =
            Vec::with_capacity(transitions.texel_buffers.len() + transitions.buffers.len());

        for &(handle, state) in &transitions.images {
            if let Some(barrier) = self.images.transition_barrier(handle, state, false) {
                image_barriers.push(barrier);
            }
        }
        for &(handle, state) in &transitions.texel_buffers {
            if let Some(barrier) = self.texel_buffers.transition_barrier(handle, state, false) {
                buffer_barriers.push(barrier);
            }
        }
        for &(handle, state) in &transitions.buffers {
            if let Some(barrier) = self.buffers.transition_barrier(handle, state, false) {
                buffer_barriers.push(barrier);
            }
        }

        if image_barriers.is_empty() && buffer_barriers.is_empty() {
            return;
        }

        log::trace!(
            "Recording {} image and {} buffer barriers",
            image_barriers.len(),
            buffer_barriers.len()
        );
        self.device
            .cmd_pipeline_barrier(cmd, &buffer_barriers, &image_barriers);
    }
}

impl fmt::Debug for RenderResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderResources")
            .field("device", &self.device.name())
            .field("images", &self.images)
            .field("texel_buffers", &self.texel_buffers)
            .field("buffers", &self.buffers)
            .finish()
    }
}

// Pools move with the render thread that owns them.
static_assertions::assert_impl_all!(RenderResources: Send);
