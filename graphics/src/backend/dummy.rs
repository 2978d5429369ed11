//! Dummy GPU device for testing and development.
//!
//! This device doesn't touch any GPU but keeps enough bookkeeping to observe
//! what the pools do: live object ids, memory accounting, recorded barriers
//! and assigned debug names.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::types::{
    BufferBarrier, BufferDescriptor, FormatFeatures, ImageBarrier, ImageDescriptor, ImageFormat,
    TexelBufferDescriptor,
};

use super::{
    CommandBuffer, DebugObject, GpuBuffer, GpuDevice, GpuImage, GpuTexelBuffer,
    MemoryAllocationBytes, NativeBuffer, NativeBufferView, NativeImage, NativeImageView,
};

/// Allocation granularity the dummy device rounds sizes up to.
const ALLOCATION_ALIGNMENT: u64 = 256;

fn align_up(size: u64) -> u64 {
    size.div_ceil(ALLOCATION_ALIGNMENT).max(1) * ALLOCATION_ALIGNMENT
}

/// Features reported for a format unless overridden.
fn default_format_features(format: ImageFormat) -> FormatFeatures {
    match format {
        ImageFormat::Undefined => FormatFeatures::empty(),
        ImageFormat::R32Uint => FormatFeatures::all(),
        f if f.has_depth() => FormatFeatures::empty(),
        ImageFormat::Rgba8Srgb => FormatFeatures::UNIFORM_TEXEL_BUFFER,
        _ => FormatFeatures::UNIFORM_TEXEL_BUFFER | FormatFeatures::STORAGE_TEXEL_BUFFER,
    }
}

/// Barriers recorded by one `cmd_pipeline_barrier` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBarriers {
    pub cmd: CommandBuffer,
    pub buffers: Vec<BufferBarrier>,
    pub images: Vec<ImageBarrier>,
}

#[derive(Debug, Default)]
struct DummyState {
    live_objects: HashSet<u64>,
    memory: MemoryAllocationBytes,
    format_features: HashMap<ImageFormat, FormatFeatures>,
    debug_names: HashMap<DebugObject, String>,
    barriers: Vec<RecordedBarriers>,
    fail_allocations: bool,
}

/// Dummy GPU device.
#[derive(Debug)]
pub struct DummyDevice {
    next_id: AtomicU64,
    state: Mutex<DummyState>,
}

impl DummyDevice {
    /// Create a new dummy device.
    pub fn new() -> Self {
        Self {
            // Zero is reserved so no native handle compares equal to a default one.
            next_id: AtomicU64::new(1),
            state: Mutex::new(DummyState::default()),
        }
    }

    fn allocate_id(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.state.lock().live_objects.insert(id);
        id
    }

    fn free_id(&self, id: u64) {
        if !self.state.lock().live_objects.remove(&id) {
            log::error!("DummyDevice: object {} destroyed twice", id);
        }
    }

    fn check_allocation(&self) -> Result<(), GraphicsError> {
        if self.state.lock().fail_allocations {
            return Err(GraphicsError::OutOfMemory);
        }
        Ok(())
    }

    /// Override the features reported for `format`.
    pub fn set_format_features(&self, format: ImageFormat, features: FormatFeatures) {
        self.state.lock().format_features.insert(format, features);
    }

    /// Make every following allocation fail with [`GraphicsError::OutOfMemory`].
    pub fn set_fail_allocations(&self, fail: bool) {
        self.state.lock().fail_allocations = fail;
    }

    /// Number of objects created and not yet destroyed.
    pub fn live_object_count(&self) -> usize {
        self.state.lock().live_objects.len()
    }

    /// Last debug name assigned to `object`.
    pub fn debug_name(&self, object: DebugObject) -> Option<String> {
        self.state.lock().debug_names.get(&object).cloned()
    }

    /// Every barrier batch recorded so far.
    pub fn recorded_barriers(&self) -> Vec<RecordedBarriers> {
        self.state.lock().barriers.clone()
    }

    /// Forget the recorded barriers.
    pub fn clear_recorded_barriers(&self) {
        self.state.lock().barriers.clear();
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDevice for DummyDevice {
    fn name(&self) -> &'static str {
        "Dummy Device"
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        debug_name: &str,
    ) -> Result<GpuBuffer, GraphicsError> {
        self.check_allocation()?;

        let id = self.allocate_id();
        log::trace!(
            "DummyDevice: creating buffer {:?} (size: {})",
            debug_name,
            descriptor.byte_size
        );

        let buffer = GpuBuffer {
            handle: NativeBuffer::Dummy(id),
            byte_size: descriptor.byte_size,
            allocation_size: align_up(descriptor.byte_size),
            device_address: descriptor.needs_device_address().then_some(id << 32),
        };

        let mut state = self.state.lock();
        state.memory.buffers += buffer.allocation_size;
        state
            .debug_names
            .insert(DebugObject::Buffer(buffer.handle), debug_name.to_owned());

        Ok(buffer)
    }

    fn destroy_buffer(&self, buffer: GpuBuffer) {
        let NativeBuffer::Dummy(id) = buffer.handle else {
            log::error!("DummyDevice: destroying foreign buffer {:?}", buffer.handle);
            return;
        };
        self.free_id(id);
        self.state.lock().memory.buffers -= buffer.allocation_size;
    }

    fn create_image(
        &self,
        descriptor: &ImageDescriptor,
        debug_name: &str,
    ) -> Result<GpuImage, GraphicsError> {
        if descriptor.mip_count == 0 || descriptor.layer_count == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "image '{}' needs at least one mip and one layer",
                debug_name
            )));
        }
        if descriptor.mip_count > descriptor.full_mip_count() {
            return Err(GraphicsError::InvalidParameter(format!(
                "image '{}' has {} mips but its extent allows at most {}",
                debug_name,
                descriptor.mip_count,
                descriptor.full_mip_count()
            )));
        }
        self.check_allocation()?;

        let image_id = self.allocate_id();
        let view_id = self.allocate_id();
        log::trace!(
            "DummyDevice: creating image {:?} ({}x{}x{}, {:?})",
            debug_name,
            descriptor.width,
            descriptor.height,
            descriptor.depth,
            descriptor.format
        );

        let image = GpuImage {
            handle: NativeImage::Dummy(image_id),
            view: NativeImageView::Dummy(view_id),
            image_type: descriptor.image_type,
            format: descriptor.format,
            width: descriptor.width,
            height: descriptor.height,
            depth: descriptor.depth,
            mip_count: descriptor.mip_count,
            layer_count: descriptor.layer_count,
            create_flags: descriptor.create_flags,
            allocation_size: align_up(descriptor.estimated_byte_size()),
        };

        let mut state = self.state.lock();
        state.memory.images += image.allocation_size;
        state
            .debug_names
            .insert(DebugObject::Image(image.handle), debug_name.to_owned());
        state
            .debug_names
            .insert(DebugObject::ImageView(image.view), debug_name.to_owned());

        Ok(image)
    }

    fn destroy_image(&self, image: GpuImage) {
        if let NativeImageView::Dummy(id) = image.view {
            self.free_id(id);
        }
        let NativeImage::Dummy(id) = image.handle else {
            log::error!("DummyDevice: destroying foreign image {:?}", image.handle);
            return;
        };
        self.free_id(id);
        self.state.lock().memory.images -= image.allocation_size;
    }

    fn create_texel_buffer(
        &self,
        descriptor: &TexelBufferDescriptor,
        debug_name: &str,
    ) -> Result<GpuTexelBuffer, GraphicsError> {
        descriptor.validate(self.format_features(descriptor.format))?;

        let buffer = self.create_buffer(&descriptor.buffer, debug_name)?;
        let view_id = self.allocate_id();

        let mut state = self.state.lock();
        // Tracked as a texel buffer instead.
        state.memory.buffers -= buffer.allocation_size;
        state.memory.texel_buffers += buffer.allocation_size;

        let texel_buffer = GpuTexelBuffer {
            handle: buffer.handle,
            view: NativeBufferView::Dummy(view_id),
            format: descriptor.format,
            byte_size: buffer.byte_size,
            allocation_size: buffer.allocation_size,
        };
        state.debug_names.insert(
            DebugObject::BufferView(texel_buffer.view),
            debug_name.to_owned(),
        );

        Ok(texel_buffer)
    }

    fn destroy_texel_buffer(&self, buffer: GpuTexelBuffer) {
        if let NativeBufferView::Dummy(id) = buffer.view {
            self.free_id(id);
        }
        let NativeBuffer::Dummy(id) = buffer.handle else {
            log::error!("DummyDevice: destroying foreign texel buffer {:?}", buffer.handle);
            return;
        };
        self.free_id(id);
        self.state.lock().memory.texel_buffers -= buffer.allocation_size;
    }

    fn create_subresource_views(
        &self,
        image: &GpuImage,
        debug_name: &str,
    ) -> Result<Vec<NativeImageView>, GraphicsError> {
        if image.layer_count != 1 {
            return Err(GraphicsError::InvalidParameter(
                "Texture arrays not supported".to_string(),
            ));
        }
        if image.mip_count <= 1 {
            return Err(GraphicsError::InvalidParameter(
                "Use the whole-resource view when no mips are present".to_string(),
            ));
        }

        let views: Vec<_> = (0..image.mip_count)
            .map(|_| NativeImageView::Dummy(self.allocate_id()))
            .collect();

        let mut state = self.state.lock();
        for (mip, view) in views.iter().enumerate() {
            state
                .debug_names
                .insert(DebugObject::ImageView(*view), format!("{} mip {}", debug_name, mip));
        }

        Ok(views)
    }

    fn destroy_image_views(&self, views: &[NativeImageView]) {
        for view in views {
            if let NativeImageView::Dummy(id) = view {
                self.free_id(*id);
            }
        }
    }

    fn format_features(&self, format: ImageFormat) -> FormatFeatures {
        self.state
            .lock()
            .format_features
            .get(&format)
            .copied()
            .unwrap_or_else(|| default_format_features(format))
    }

    fn set_debug_name(&self, object: DebugObject, name: &str) {
        self.state.lock().debug_names.insert(object, name.to_owned());
    }

    fn memory_allocations(&self) -> MemoryAllocationBytes {
        self.state.lock().memory
    }

    fn begin_commands(&self) -> Result<CommandBuffer, GraphicsError> {
        Ok(CommandBuffer::Dummy(
            self.next_id.fetch_add(1, Ordering::Relaxed),
        ))
    }

    fn submit_commands(&self, cmd: CommandBuffer) -> Result<(), GraphicsError> {
        log::trace!("DummyDevice: submitting {:?}", cmd);
        Ok(())
    }

    fn cmd_pipeline_barrier(
        &self,
        cmd: CommandBuffer,
        buffer_barriers: &[BufferBarrier],
        image_barriers: &[ImageBarrier],
    ) {
        self.state.lock().barriers.push(RecordedBarriers {
            cmd,
            buffers: buffer_barriers.to_vec(),
            images: image_barriers.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, ImageUsage};

    #[test]
    fn test_buffer_accounting() {
        let device = DummyDevice::new();
        let desc = BufferDescriptor::new(100, BufferUsage::STORAGE);
        let buffer = device.create_buffer(&desc, "scratch").unwrap();

        assert_eq!(buffer.allocation_size, 256);
        assert_eq!(device.memory_allocations().buffers, 256);
        assert_eq!(buffer.device_address, None);

        device.destroy_buffer(buffer);
        assert_eq!(device.memory_allocations().total(), 0);
        assert_eq!(device.live_object_count(), 0);
    }

    #[test]
    fn test_device_address() {
        let device = DummyDevice::new();
        let desc = BufferDescriptor::new(
            64,
            BufferUsage::STORAGE | BufferUsage::SHADER_DEVICE_ADDRESS,
        );
        let buffer = device.create_buffer(&desc, "addressed").unwrap();
        assert!(buffer.device_address.is_some());
        device.destroy_buffer(buffer);
    }

    #[test]
    fn test_texel_buffer_moves_accounting_bucket() {
        let device = DummyDevice::new();
        let desc = TexelBufferDescriptor::new(
            BufferDescriptor::new(512, BufferUsage::STORAGE_TEXEL),
            ImageFormat::R32Uint,
        )
        .with_atomics(true);

        let buffer = device.create_texel_buffer(&desc, "counters").unwrap();
        let memory = device.memory_allocations();
        assert_eq!(memory.buffers, 0);
        assert_eq!(memory.texel_buffers, 512);

        device.destroy_texel_buffer(buffer);
        assert_eq!(device.memory_allocations().total(), 0);
        assert_eq!(device.live_object_count(), 0);
    }

    #[test]
    fn test_texel_buffer_rejects_missing_atomics() {
        let device = DummyDevice::new();
        let desc = TexelBufferDescriptor::new(
            BufferDescriptor::new(512, BufferUsage::STORAGE_TEXEL),
            ImageFormat::Rgba16Float,
        )
        .with_atomics(true);

        let err = device.create_texel_buffer(&desc, "bad").unwrap_err();
        assert!(matches!(err, GraphicsError::FeatureNotSupported(_)));
        assert_eq!(device.live_object_count(), 0);
        assert_eq!(device.memory_allocations().total(), 0);
    }

    #[test]
    fn test_image_rejects_mips_beyond_full_chain() {
        let device = DummyDevice::new();
        let desc = ImageDescriptor::new_2d(1, 1, ImageFormat::Rgba8Unorm, ImageUsage::SAMPLED)
            .with_mip_count(40);
        let err = device.create_image(&desc, "tiny").unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidParameter(_)));
        assert_eq!(device.live_object_count(), 0);

        let full = desc.with_mip_count(desc.full_mip_count());
        let image = device.create_image(&full, "tiny").unwrap();
        device.destroy_image(image);
    }

    #[test]
    fn test_subresource_views() {
        let device = DummyDevice::new();
        let desc = ImageDescriptor::new_2d(64, 64, ImageFormat::Rgba16Float, ImageUsage::STORAGE)
            .with_mip_count(4);
        let image = device.create_image(&desc, "bloom").unwrap();

        let views = device.create_subresource_views(&image, "bloom").unwrap();
        assert_eq!(views.len(), 4);
        assert_eq!(
            device.debug_name(DebugObject::ImageView(views[2])).as_deref(),
            Some("bloom mip 2")
        );

        device.destroy_image_views(&views);
        device.destroy_image(image);
        assert_eq!(device.live_object_count(), 0);
    }

    #[test]
    fn test_subresource_views_reject_single_mip() {
        let device = DummyDevice::new();
        let desc = ImageDescriptor::new_2d(64, 64, ImageFormat::Rgba8Unorm, ImageUsage::SAMPLED);
        let image = device.create_image(&desc, "single").unwrap();

        let err = device.create_subresource_views(&image, "single").unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidParameter(_)));
        device.destroy_image(image);
    }

    #[test]
    fn test_fail_allocations() {
        let device = DummyDevice::new();
        device.set_fail_allocations(true);
        let desc = BufferDescriptor::new(64, BufferUsage::UNIFORM);
        assert_eq!(
            device.create_buffer(&desc, "oom").unwrap_err(),
            GraphicsError::OutOfMemory
        );
    }
}
