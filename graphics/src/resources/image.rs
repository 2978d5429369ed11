//! Pooled GPU image resource and the image pool with per-mip views.

use std::ops::Deref;
use std::sync::Arc;

use respool_core::{PoolResource, PoolSettings, ResourceHandle, ResourcePool, StatefulResource};

use crate::backend::{CommandBuffer, DebugObject, GpuDevice, GpuImage, NativeImage, NativeImageView};
use crate::error::GraphicsError;
use crate::types::{ImageAspects, ImageBarrier, ImageDescriptor, ImageState, SubresourceRange};

/// Handle to a pooled image.
pub type ImageHandle = ResourceHandle<Image>;

/// A physical image living in an [`ImagePool`] slot.
///
/// Carries a view over the whole resource and tracks the usage state, and
/// with it the layout, it was last transitioned into.
#[derive(Debug)]
pub struct Image {
    gpu: GpuImage,
    state: ImageState,
}

impl Image {
    /// Device-level image.
    pub fn gpu(&self) -> &GpuImage {
        &self.gpu
    }

    /// View over every mip and layer.
    pub fn view(&self) -> NativeImageView {
        self.gpu.view
    }

    /// State the image was last transitioned into.
    pub fn state(&self) -> ImageState {
        self.state
    }

    /// Range covering every mip and layer of the image.
    pub fn full_range(&self) -> SubresourceRange {
        SubresourceRange::full(
            ImageAspects::from_format(self.gpu.format),
            self.gpu.mip_count,
            self.gpu.layer_count,
        )
    }
}

impl PoolResource for Image {
    type Description = ImageDescriptor;
    type Native = NativeImage;
    type Device = dyn GpuDevice;
    type Error = GraphicsError;

    fn create(
        device: &dyn GpuDevice,
        description: &ImageDescriptor,
        debug_name: &str,
    ) -> Result<Self, GraphicsError> {
        let gpu = device.create_image(description, debug_name)?;
        Ok(Self {
            gpu,
            state: ImageState::empty(),
        })
    }

    fn destroy(self, device: &dyn GpuDevice) {
        log::trace!("Destroying pooled image {:?}", self.gpu.handle);
        device.destroy_image(self.gpu);
    }

    fn native(&self) -> NativeImage {
        self.gpu.handle
    }

    fn set_debug_name(&self, device: &dyn GpuDevice, name: &str) {
        device.set_debug_name(DebugObject::Image(self.gpu.handle), name);
        device.set_debug_name(DebugObject::ImageView(self.gpu.view), name);
    }
}

impl StatefulResource for Image {
    type State = ImageState;
    type Barrier = ImageBarrier;
    type CommandBuffer = CommandBuffer;

    /// Repeating a read-only state needs no barrier. Unlike buffers, only the
    /// current state's writes are considered.
    fn transition_barrier(&mut self, state: ImageState, force_barrier: bool) -> Option<ImageBarrier> {
        if !force_barrier && self.state == state && !self.state.has_writes() {
            return None;
        }

        let barrier = ImageBarrier {
            image: self.gpu.handle,
            src_stages: self.state.stages(),
            src_access: self.state.access(),
            dst_stages: state.stages(),
            dst_access: state.access(),
            old_layout: self.state.layout(),
            new_layout: state.layout(),
            range: self.full_range(),
        };
        self.state = state;
        Some(barrier)
    }

    fn record_barrier(device: &dyn GpuDevice, cmd: CommandBuffer, barrier: ImageBarrier) {
        device.cmd_pipeline_barrier(cmd, &[], &[barrier]);
    }
}

static_assertions::assert_impl_all!(Image: Send, Sync);

// ============================================================================
// Image pool
// ============================================================================

/// Per-mip views built for the physical image currently in a slot.
#[derive(Debug)]
struct SubresourceViews {
    image: NativeImage,
    views: Vec<NativeImageView>,
}

/// Pool of transient images.
///
/// Wraps a [`ResourcePool<Image>`] and adds a lazily built cache of per-mip
/// views. Read-only pool accessors are reachable through `Deref`; everything
/// that can tear down a slot goes through this type so the cached views are
/// destroyed along with their image.
#[derive(Debug)]
pub struct ImagePool {
    pool: ResourcePool<Image>,
    views: Vec<Option<SubresourceViews>>,
}

impl ImagePool {
    /// Create an empty pool with default settings.
    pub fn new(device: Arc<dyn GpuDevice>) -> Self {
        Self::with_settings(device, PoolSettings::default())
    }

    /// Create an empty pool with explicit settings.
    pub fn with_settings(device: Arc<dyn GpuDevice>, settings: PoolSettings) -> Self {
        Self {
            pool: ResourcePool::with_settings(device, settings),
            views: Vec::new(),
        }
    }

    /// See [`ResourcePool::start_frame`].
    pub fn start_frame(&mut self) {
        let device = Arc::clone(self.pool.device());
        let views = &mut self.views;
        self.pool.start_frame_with(|index, _| {
            if let Some(cached) = views.get_mut(index as usize).and_then(Option::take) {
                device.destroy_image_views(&cached.views);
            }
        });
    }

    /// See [`ResourcePool::destroy_resources`].
    pub fn destroy_resources(&mut self) {
        let device = Arc::clone(self.pool.device());
        for cached in self.views.drain(..).flatten() {
            device.destroy_image_views(&cached.views);
        }
        self.pool.destroy_resources();
    }

    /// See [`ResourcePool::create`].
    pub fn create(
        &mut self,
        description: &ImageDescriptor,
        debug_name: &str,
    ) -> Result<ImageHandle, GraphicsError> {
        self.pool.create(description, debug_name)
    }

    /// See [`ResourcePool::append_debug_name`].
    pub fn append_debug_name(&mut self, handle: ImageHandle, name: &str) {
        self.pool.append_debug_name(handle, name);
    }

    /// See [`ResourcePool::preserve`].
    pub fn preserve(&mut self, handle: ImageHandle) {
        self.pool.preserve(handle);
    }

    /// See [`ResourcePool::release`].
    pub fn release(&mut self, handle: ImageHandle) {
        self.pool.release(handle);
    }

    /// See [`ResourcePool::resource_mut`].
    pub fn resource_mut(&mut self, handle: ImageHandle) -> &mut Image {
        self.pool.resource_mut(handle)
    }

    /// See [`ResourcePool::transition_barrier`].
    pub fn transition_barrier(
        &mut self,
        handle: ImageHandle,
        state: ImageState,
        force_barrier: bool,
    ) -> Option<ImageBarrier> {
        self.pool.transition_barrier(handle, state, force_barrier)
    }

    /// See [`ResourcePool::transition`].
    pub fn transition(&mut self, cmd: CommandBuffer, handle: ImageHandle, state: ImageState) {
        self.pool.transition(cmd, handle, state);
    }

    /// See [`ResourcePool::mark_for_debug`].
    pub fn mark_for_debug(&mut self, name: impl Into<String>) {
        self.pool.mark_for_debug(name);
    }

    /// See [`ResourcePool::clear_debug`].
    pub fn clear_debug(&mut self) {
        self.pool.clear_debug();
    }

    /// One view per mip level of the image behind `handle`.
    ///
    /// Views are built on first use and cached per slot until the slot's
    /// physical image changes. An image with a single mip returns its
    /// whole-resource view instead.
    ///
    /// # Errors
    ///
    /// Fails for layered images and when the device cannot create a view.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid.
    pub fn subresource_views(
        &mut self,
        handle: ImageHandle,
    ) -> Result<&[NativeImageView], GraphicsError> {
        let gpu = *self.pool.resource(handle).gpu();
        if gpu.mip_count == 1 {
            return Ok(std::slice::from_ref(&self.pool.resource(handle).gpu.view));
        }

        let i = handle.index() as usize;
        if self.views.len() <= i {
            self.views.resize_with(i + 1, || None);
        }

        let stale = self.views[i]
            .as_ref()
            .is_none_or(|cached| cached.image != gpu.handle);
        if stale {
            let device = self.pool.device();
            if let Some(old) = self.views[i].take() {
                device.destroy_image_views(&old.views);
            }

            let views =
                device.create_subresource_views(&gpu, self.pool.aliased_debug_name(handle))?;
            log::trace!(
                "Built {} mip views for pooled slot {}",
                views.len(),
                handle.index()
            );
            self.views[i] = Some(SubresourceViews {
                image: gpu.handle,
                views,
            });
        }

        Ok(self.views[i]
            .as_ref()
            .map_or(&[][..], |cached| cached.views.as_slice()))
    }
}

impl Deref for ImagePool {
    type Target = ResourcePool<Image>;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

impl Drop for ImagePool {
    fn drop(&mut self) {
        self.destroy_resources();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyDevice;
    use crate::types::{ImageFormat, ImageLayout, ImageUsage, PipelineStages};

    fn new_pool() -> (Arc<DummyDevice>, ImagePool) {
        let dummy = Arc::new(DummyDevice::new());
        let device: Arc<dyn GpuDevice> = dummy.clone();
        (dummy, ImagePool::new(device))
    }

    fn color(mips: u32) -> ImageDescriptor {
        ImageDescriptor::new_2d(
            256,
            256,
            ImageFormat::Rgba16Float,
            ImageUsage::SAMPLED | ImageUsage::STORAGE,
        )
        .with_mip_count(mips)
    }

    #[test]
    fn test_single_mip_returns_whole_view() {
        let (dummy, mut pool) = new_pool();
        pool.start_frame();

        let handle = pool.create(&color(1), "hdr").unwrap();
        let whole = pool.resource(handle).view();
        let objects = dummy.live_object_count();

        let views = pool.subresource_views(handle).unwrap().to_vec();
        assert_eq!(views, vec![whole]);
        assert_eq!(dummy.live_object_count(), objects);

        pool.release(handle);
    }

    #[test]
    fn test_create_rejects_excess_mips() {
        let (dummy, mut pool) = new_pool();
        pool.start_frame();

        let err = pool.create(&color(40), "overgrown").unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidParameter(_)));
        assert_eq!(pool.slot_count(), 0);
        assert_eq!(dummy.live_object_count(), 0);
    }

    #[test]
    fn test_mip_views_are_cached() {
        let (dummy, mut pool) = new_pool();
        pool.start_frame();

        let handle = pool.create(&color(4), "bloom").unwrap();
        let first = pool.subresource_views(handle).unwrap().to_vec();
        assert_eq!(first.len(), 4);
        assert_eq!(
            dummy.debug_name(DebugObject::ImageView(first[2])).as_deref(),
            Some("bloom mip 2")
        );

        let objects = dummy.live_object_count();
        let second = pool.subresource_views(handle).unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(dummy.live_object_count(), objects);

        pool.release(handle);
    }

    #[test]
    fn test_mip_views_follow_reused_slot() {
        let (_dummy, mut pool) = new_pool();
        pool.start_frame();

        let a = pool.create(&color(3), "a").unwrap();
        let first = pool.subresource_views(a).unwrap().to_vec();
        pool.release(a);

        // Same physical image, so the cache stays valid.
        let b = pool.create(&color(3), "b").unwrap();
        assert_eq!(a.index(), b.index());
        assert_eq!(pool.subresource_views(b).unwrap(), first.as_slice());
        pool.release(b);
    }

    #[test]
    fn test_mip_views_destroyed_with_slot() {
        let (dummy, mut pool) = new_pool();
        pool.start_frame();

        let handle = pool.create(&color(5), "pyramid").unwrap();
        pool.subresource_views(handle).unwrap();
        pool.release(handle);

        let delay = pool.settings().destroy_delay_frames() as usize;
        for _ in 0..delay + 2 {
            pool.start_frame();
        }
        assert_eq!(pool.live_count(), 0);
        assert_eq!(dummy.live_object_count(), 0);
        assert_eq!(dummy.memory_allocations().images, 0);
    }

    #[test]
    fn test_layered_image_has_no_mip_views() {
        let (_dummy, mut pool) = new_pool();
        pool.start_frame();

        let handle = pool
            .create(&color(4).with_layer_count(6), "probe")
            .unwrap();
        let err = pool.subresource_views(handle).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidParameter(_)));
        pool.release(handle);
    }

    #[test]
    fn test_image_transition_layouts() {
        let (dummy, mut pool) = new_pool();
        pool.start_frame();

        let handle = pool.create(&color(1), "target").unwrap();
        let barrier = pool
            .transition_barrier(handle, ImageState::COLOR_ATTACHMENT_WRITE, false)
            .unwrap();
        assert_eq!(barrier.old_layout, ImageLayout::Undefined);
        assert_eq!(barrier.new_layout, ImageLayout::ColorAttachmentOptimal);
        assert_eq!(barrier.dst_stages, PipelineStages::COLOR_ATTACHMENT_OUTPUT);

        // The current state writes, so repeating it still needs a barrier.
        assert!(
            pool.transition_barrier(handle, ImageState::COLOR_ATTACHMENT_WRITE, false)
                .is_some()
        );

        pool.transition(
            CommandBuffer::Dummy(0),
            handle,
            ImageState::FRAGMENT_SHADER_READ,
        );
        pool.transition(
            CommandBuffer::Dummy(0),
            handle,
            ImageState::FRAGMENT_SHADER_READ,
        );
        let recorded = dummy.recorded_barriers();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].images[0].old_layout, ImageLayout::ColorAttachmentOptimal);
        assert_eq!(recorded[0].images[0].new_layout, ImageLayout::General);

        pool.release(handle);
    }

    #[test]
    fn test_depth_barrier_covers_depth_aspect() {
        let (_dummy, mut pool) = new_pool();
        pool.start_frame();

        let desc = ImageDescriptor::new_2d(
            64,
            64,
            ImageFormat::D32Float,
            ImageUsage::DEPTH_STENCIL_ATTACHMENT,
        );
        let handle = pool.create(&desc, "depth").unwrap();
        let barrier = pool
            .transition_barrier(handle, ImageState::DEPTH_ATTACHMENT_READ_WRITE, false)
            .unwrap();
        assert_eq!(barrier.range.aspects, ImageAspects::DEPTH);
        assert_eq!(barrier.new_layout, ImageLayout::DepthAttachmentOptimal);
        pool.release(handle);
    }
}
