//! Pooled texel buffer resource.

use respool_core::{PoolResource, ResourceHandle, ResourcePool, StatefulResource};

use super::buffer::buffer_transition;
use crate::backend::{
    CommandBuffer, DebugObject, GpuDevice, GpuTexelBuffer, NativeBuffer, NativeBufferView,
};
use crate::error::GraphicsError;
use crate::types::{BufferBarrier, BufferState, ImageFormat, TexelBufferDescriptor};

/// Pool of transient texel buffers.
pub type TexelBufferPool = ResourcePool<TexelBuffer>;

/// Handle to a pooled texel buffer.
pub type TexelBufferHandle = ResourceHandle<TexelBuffer>;

/// A buffer with a formatted view, living in a [`TexelBufferPool`] slot.
///
/// Reuse needs an identical descriptor, including format and atomics
/// support, since both are baked into the view.
#[derive(Debug)]
pub struct TexelBuffer {
    gpu: GpuTexelBuffer,
    state: BufferState,
}

impl TexelBuffer {
    /// Device-side buffer and view.
    pub fn gpu(&self) -> &GpuTexelBuffer {
        &self.gpu
    }

    /// Formatted view over the buffer, bound by shaders.
    pub fn view(&self) -> NativeBufferView {
        self.gpu.view
    }

    /// Texel format of the view.
    pub fn format(&self) -> ImageFormat {
        self.gpu.format
    }

    /// Size of the underlying buffer in bytes.
    pub fn byte_size(&self) -> u64 {
        self.gpu.byte_size
    }

    /// State the last transition left the buffer in.
    pub fn state(&self) -> BufferState {
        self.state
    }
}

// The native handle is the buffer. The view is reached through `view()`.
impl PoolResource for TexelBuffer {
    type Description = TexelBufferDescriptor;
    type Native = NativeBuffer;
    type Device = dyn GpuDevice;
    type Error = GraphicsError;

    fn create(
        device: &dyn GpuDevice,
        description: &TexelBufferDescriptor,
        debug_name: &str,
    ) -> Result<Self, GraphicsError> {
        let gpu = device.create_texel_buffer(description, debug_name)?;
        Ok(Self {
            gpu,
            state: BufferState::empty(),
        })
    }

    fn destroy(self, device: &dyn GpuDevice) {
        log::trace!("Destroying pooled texel buffer {:?}", self.gpu.handle);
        device.destroy_texel_buffer(self.gpu);
    }

    fn native(&self) -> NativeBuffer {
        self.gpu.handle
    }

    fn set_debug_name(&self, device: &dyn GpuDevice, name: &str) {
        device.set_debug_name(DebugObject::Buffer(self.gpu.handle), name);
        device.set_debug_name(DebugObject::BufferView(self.gpu.view), name);
    }
}

impl StatefulResource for TexelBuffer {
    type State = BufferState;
    type Barrier = BufferBarrier;
    type CommandBuffer = CommandBuffer;

    fn transition_barrier(
        &mut self,
        state: BufferState,
        force_barrier: bool,
    ) -> Option<BufferBarrier> {
        buffer_transition(
            self.gpu.handle,
            self.gpu.byte_size,
            &mut self.state,
            state,
            force_barrier,
        )
    }

    fn record_barrier(device: &dyn GpuDevice, cmd: CommandBuffer, barrier: BufferBarrier) {
        device.cmd_pipeline_barrier(cmd, &[barrier], &[]);
    }
}

static_assertions::assert_impl_all!(TexelBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyDevice;
    use crate::types::{BufferDescriptor, BufferUsage, FormatFeatures};
    use std::sync::Arc;

    fn new_pool() -> (Arc<DummyDevice>, TexelBufferPool) {
        let dummy = Arc::new(DummyDevice::new());
        let device: Arc<dyn GpuDevice> = dummy.clone();
        (dummy, TexelBufferPool::new(device))
    }

    fn counters() -> TexelBufferDescriptor {
        TexelBufferDescriptor::new(
            BufferDescriptor::new(4096, BufferUsage::STORAGE_TEXEL),
            ImageFormat::R32Uint,
        )
    }

    #[test]
    fn test_atomics_flag_prevents_reuse() {
        let (dummy, mut pool) = new_pool();
        pool.start_frame();

        let plain = pool.create(&counters(), "plain").unwrap();
        let native = pool.native_handle(plain);
        pool.release(plain);

        let atomic = pool
            .create(&counters().with_atomics(true), "atomic")
            .unwrap();
        assert_ne!(pool.native_handle(atomic), native);
        assert_eq!(pool.slot_count(), 2);
        assert_eq!(dummy.memory_allocations().texel_buffers, 8192);
        assert_eq!(dummy.memory_allocations().buffers, 0);

        pool.release(atomic);
    }

    #[test]
    fn test_unsupported_format_is_rejected() {
        let (dummy, mut pool) = new_pool();
        pool.start_frame();

        dummy.set_format_features(ImageFormat::R32Uint, FormatFeatures::UNIFORM_TEXEL_BUFFER);
        let err = pool.create(&counters(), "counters").unwrap_err();
        assert!(matches!(err, GraphicsError::FeatureNotSupported(_)));
        assert_eq!(pool.slot_count(), 0);
        assert_eq!(dummy.memory_allocations().total(), 0);
    }

    #[test]
    fn test_debug_name_reaches_view() {
        let (dummy, mut pool) = new_pool();
        pool.start_frame();

        let a = pool.create(&counters(), "histogram").unwrap();
        pool.release(a);
        let b = pool.create(&counters(), "tiles").unwrap();

        let texels = pool.resource(b);
        assert_eq!(
            dummy.debug_name(DebugObject::BufferView(texels.view())).as_deref(),
            Some("histogram|tiles")
        );
        assert_eq!(
            dummy.debug_name(DebugObject::Buffer(pool.native_handle(b))).as_deref(),
            Some("histogram|tiles")
        );
        pool.release(b);
    }

    #[test]
    fn test_teardown_releases_accounting() {
        let (dummy, mut pool) = new_pool();
        pool.start_frame();
        let handle = pool.create(&counters(), "counters").unwrap();
        pool.release(handle);

        pool.destroy_resources();
        assert_eq!(dummy.memory_allocations().total(), 0);
        assert_eq!(dummy.live_object_count(), 0);
    }
}
