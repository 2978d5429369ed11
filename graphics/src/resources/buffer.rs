//! Pooled GPU buffer resource.

use respool_core::{PoolResource, ResourceHandle, ResourcePool, StatefulResource};

use crate::backend::{CommandBuffer, DebugObject, GpuBuffer, GpuDevice, NativeBuffer};
use crate::error::GraphicsError;
use crate::types::{BufferBarrier, BufferDescriptor, BufferState};

/// Pool of transient buffers.
pub type BufferPool = ResourcePool<Buffer>;

/// Handle to a pooled buffer.
pub type BufferHandle = ResourceHandle<Buffer>;

/// A physical buffer living in a [`BufferPool`] slot.
///
/// Tracks the usage state it was last transitioned into. The state survives
/// reuse by another logical resource, since the memory is the same.
#[derive(Debug)]
pub struct Buffer {
    gpu: GpuBuffer,
    state: BufferState,
}

impl Buffer {
    /// Device-level buffer.
    pub fn gpu(&self) -> &GpuBuffer {
        &self.gpu
    }

    /// Get the buffer size in bytes.
    pub fn byte_size(&self) -> u64 {
        self.gpu.byte_size
    }

    /// GPU virtual address, if the buffer was created with one.
    pub fn device_address(&self) -> Option<u64> {
        self.gpu.device_address
    }

    /// State the buffer was last transitioned into.
    pub fn state(&self) -> BufferState {
        self.state
    }
}

impl PoolResource for Buffer {
    type Description = BufferDescriptor;
    type Native = NativeBuffer;
    type Device = dyn GpuDevice;
    type Error = GraphicsError;

    fn create(
        device: &dyn GpuDevice,
        description: &BufferDescriptor,
        debug_name: &str,
    ) -> Result<Self, GraphicsError> {
        let gpu = device.create_buffer(description, debug_name)?;
        Ok(Self {
            gpu,
            state: BufferState::empty(),
        })
    }

    fn destroy(self, device: &dyn GpuDevice) {
        log::trace!("Destroying pooled buffer {:?}", self.gpu.handle);
        device.destroy_buffer(self.gpu);
    }

    fn native(&self) -> NativeBuffer {
        self.gpu.handle
    }

    fn set_debug_name(&self, device: &dyn GpuDevice, name: &str) {
        device.set_debug_name(DebugObject::Buffer(self.gpu.handle), name);
    }
}

impl StatefulResource for Buffer {
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

// Ensure Buffer is Send + Sync
static_assertions::assert_impl_all!(Buffer: Send, Sync);

/// Compute the barrier moving a buffer from `current` into `state`.
///
/// Read-after-read in the same state needs no barrier. Anything involving a
/// write does, even when the state repeats.
pub(crate) fn buffer_transition(
    buffer: NativeBuffer,
    byte_size: u64,
    current: &mut BufferState,
    state: BufferState,
    force_barrier: bool,
) -> Option<BufferBarrier> {
    if !force_barrier && *current == state && !current.has_writes() && !state.has_writes() {
        return None;
    }

    let barrier = BufferBarrier {
        buffer,
        src_stages: current.stages(),
        src_access: current.access(),
        dst_stages: state.stages(),
        dst_access: state.access(),
        offset: 0,
        size: byte_size,
    };
    *current = state;
    Some(barrier)
}
