//! Buffer types and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be copied from.
        const TRANSFER_SRC = 1 << 0;
        /// Buffer can be copied to.
        const TRANSFER_DST = 1 << 1;
        /// Buffer can back a uniform texel buffer view.
        const UNIFORM_TEXEL = 1 << 2;
        /// Buffer can back a storage texel buffer view.
        const STORAGE_TEXEL = 1 << 3;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 4;
        /// Buffer can be used as a storage buffer.
        const STORAGE = 1 << 5;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 6;
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 7;
        /// Buffer can be used as an indirect buffer.
        const INDIRECT = 1 << 8;
        /// Buffer exposes a GPU virtual address.
        const SHADER_DEVICE_ADDRESS = 1 << 9;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Memory properties requested for a resource allocation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryProperties: u32 {
        /// Memory local to the GPU.
        const DEVICE_LOCAL = 1 << 0;
        /// Memory the CPU can map.
        const HOST_VISIBLE = 1 << 1;
        /// Host writes need no explicit flush.
        const HOST_COHERENT = 1 << 2;
        /// Host reads are cached.
        const HOST_CACHED = 1 << 3;
    }
}

impl Default for MemoryProperties {
    fn default() -> Self {
        Self::DEVICE_LOCAL
    }
}

/// Shape of a pooled buffer.
///
/// Two buffers can alias the same allocation only if every field matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Size in bytes.
    pub byte_size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
    /// Memory properties of the backing allocation.
    pub properties: MemoryProperties,
}

impl BufferDescriptor {
    /// Create a device-local buffer descriptor.
    pub fn new(byte_size: u64, usage: BufferUsage) -> Self {
        Self {
            byte_size,
            usage,
            properties: MemoryProperties::DEVICE_LOCAL,
        }
    }

    /// Set the memory properties.
    pub fn with_properties(mut self, properties: MemoryProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Returns true if the buffer should report a device address.
    pub fn needs_device_address(&self) -> bool {
        self.usage.contains(BufferUsage::SHADER_DEVICE_ADDRESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_descriptor_defaults_to_device_local() {
        let desc = BufferDescriptor::new(256, BufferUsage::STORAGE);
        assert_eq!(desc.properties, MemoryProperties::DEVICE_LOCAL);
        assert!(!desc.needs_device_address());
    }

    #[test]
    fn test_buffer_descriptor_equality_covers_properties() {
        let a = BufferDescriptor::new(256, BufferUsage::STORAGE);
        let b = a.with_properties(MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT);
        assert_ne!(a, b);
        assert_eq!(a, BufferDescriptor::new(256, BufferUsage::STORAGE));
    }
}
