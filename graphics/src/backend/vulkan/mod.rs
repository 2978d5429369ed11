//! Vulkan device implementation using ash.
//!
//! This device is headless: it creates a single graphics queue, a command
//! pool for one-shot submissions and a gpu-allocator instance. Pools own the
//! resources it creates and hand them back through the `destroy_*` calls;
//! allocations are looked up by their native handle when that happens.

mod allocator;
mod barriers;
mod command;
mod conversion;
mod debug;
mod device;
mod instance;

use std::collections::HashMap;
use std::ffi::CStr;

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use parking_lot::Mutex;

use crate::backend::{
    CommandBuffer, DebugObject, GpuBuffer, GpuDevice, GpuImage, GpuTexelBuffer,
    MemoryAllocationBytes, NativeBuffer, NativeBufferView, NativeImage, NativeImageView,
};
use crate::config::DeviceParameters;
use crate::error::GraphicsError;
use crate::types::{
    BufferBarrier, BufferDescriptor, FormatFeatures, ImageAspects, ImageBarrier,
    ImageDescriptor, ImageFormat, TexelBufferDescriptor,
};

use barriers::BarrierBatch;
use conversion::{
    convert_aspects, convert_buffer_usage, convert_format_features, convert_image_create_flags,
    convert_image_format, convert_image_type, convert_image_usage, mip_view_type,
    whole_view_type,
};

/// Vulkan GPU device.
///
/// Features:
/// - Validation layers enabled through [`DeviceParameters::validation`]
/// - gpu-allocator for memory management
/// - Debug names through `VK_EXT_debug_utils` when available
/// - Buffer device addresses when the device supports them
pub struct VulkanDevice {
    /// Vulkan entry points (function loader).
    _entry: ash::Entry,
    /// Vulkan instance.
    instance: ash::Instance,
    /// Debug messenger for validation layer output.
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    /// Debug utils extension instance.
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    /// Debug utils extension device, used for object names.
    debug_utils_device: Option<ash::ext::debug_utils::Device>,
    /// Selected physical device.
    physical_device: vk::PhysicalDevice,
    /// Logical device.
    device: ash::Device,
    /// Graphics queue.
    graphics_queue: vk::Queue,
    /// Command pool for one-shot command buffers.
    command_pool: vk::CommandPool,
    /// Serializes use of the command pool and the queue.
    submit_lock: Mutex<()>,
    /// Memory allocator. Taken out before the device is destroyed.
    allocator: Mutex<Option<Allocator>>,
    buffer_allocations: Mutex<HashMap<vk::Buffer, Allocation>>,
    image_allocations: Mutex<HashMap<vk::Image, Allocation>>,
    memory: Mutex<MemoryAllocationBytes>,
    /// Whether buffer device addresses were enabled.
    buffer_device_address: bool,
    validation_enabled: bool,
}

impl std::fmt::Debug for VulkanDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanDevice")
            .field("validation_enabled", &self.validation_enabled)
            .field("buffer_device_address", &self.buffer_device_address)
            .finish()
    }
}

impl VulkanDevice {
    /// Create a new Vulkan device.
    ///
    /// This initializes the Vulkan instance, selects a physical device,
    /// creates a logical device, and sets up the memory allocator.
    pub fn new(params: &DeviceParameters) -> Result<Self, GraphicsError> {
        // Load Vulkan entry points
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            GraphicsError::InitializationFailed(format!("Failed to load Vulkan: {}", e))
        })?;

        let validation_enabled = params.validation;

        let instance::InstanceBundle {
            instance,
            debug_utils,
            debug_messenger,
        } = instance::create_instance(&entry, &params.application_name, validation_enabled)?;

        let destroy_instance = |instance: &ash::Instance| unsafe {
            if let (Some(debug_utils), Some(messenger)) = (&debug_utils, debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            instance.destroy_instance(None);
        };

        let physical = device::select_physical_device(&instance).and_then(|physical_device| {
            device::find_graphics_queue_family(&instance, physical_device)
                .map(|family| (physical_device, family))
        });
        let (physical_device, graphics_queue_family) = match physical {
            Ok(physical) => physical,
            Err(e) => {
                destroy_instance(&instance);
                return Err(e);
            }
        };

        let buffer_device_address =
            device::supports_buffer_device_address(&instance, physical_device);

        let device = match device::create_logical_device(
            &instance,
            physical_device,
            graphics_queue_family,
            buffer_device_address,
        ) {
            Ok(device) => device,
            Err(e) => {
                destroy_instance(&instance);
                return Err(e);
            }
        };

        let graphics_queue = unsafe { device.get_device_queue(graphics_queue_family, 0) };

        let command_pool = match command::create_command_pool(&device, graphics_queue_family) {
            Ok(pool) => pool,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                destroy_instance(&instance);
                return Err(e);
            }
        };

        let allocator = match allocator::create_allocator(
            &instance,
            physical_device,
            device.clone(),
            buffer_device_address,
        ) {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe {
                    device.destroy_command_pool(command_pool, None);
                    device.destroy_device(None);
                }
                destroy_instance(&instance);
                return Err(e);
            }
        };

        let debug_utils_device = debug_utils
            .as_ref()
            .map(|_| ash::ext::debug_utils::Device::new(&instance, &device));

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };
        log::info!(
            "Vulkan device initialized: {:?} (validation: {}, device address: {})",
            device_name,
            validation_enabled,
            buffer_device_address
        );

        Ok(Self {
            _entry: entry,
            instance,
            debug_messenger,
            debug_utils,
            debug_utils_device,
            physical_device,
            device,
            graphics_queue,
            command_pool,
            submit_lock: Mutex::new(()),
            allocator: Mutex::new(Some(allocator)),
            buffer_allocations: Mutex::new(HashMap::new()),
            image_allocations: Mutex::new(HashMap::new()),
            memory: Mutex::new(MemoryAllocationBytes::default()),
            buffer_device_address,
            validation_enabled,
        })
    }

    /// Get the Vulkan device.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the Vulkan instance.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the physical device.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Whether buffers can request device addresses.
    pub fn supports_buffer_device_address(&self) -> bool {
        self.buffer_device_address
    }

    fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: gpu_allocator::MemoryLocation,
        linear: bool,
        what: &str,
    ) -> Result<Allocation, GraphicsError> {
        let mut allocator = self.allocator.lock();
        let allocator = allocator
            .as_mut()
            .ok_or_else(|| GraphicsError::Internal("Allocator already destroyed".to_string()))?;
        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| allocator::allocation_error(e, what))
    }

    fn free(&self, allocation: Allocation) {
        if let Some(allocator) = self.allocator.lock().as_mut()
            && let Err(e) = allocator.free(allocation)
        {
            log::error!("Failed to free allocation: {}", e);
        }
    }

    /// Create a buffer and bind memory to it. Accounting is left to the caller.
    fn create_raw_buffer(
        &self,
        descriptor: &BufferDescriptor,
        debug_name: &str,
    ) -> Result<GpuBuffer, GraphicsError> {
        if descriptor.byte_size == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer '{}' has zero size",
                debug_name
            )));
        }

        let device_address = descriptor.needs_device_address();
        if device_address && !self.buffer_device_address {
            return Err(GraphicsError::FeatureNotSupported(
                "buffer device address".to_string(),
            ));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(descriptor.byte_size)
            .usage(convert_buffer_usage(descriptor.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { self.device.create_buffer(&buffer_info, None) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("Failed to create buffer: {:?}", e))
        })?;

        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };

        let allocation = match self.allocate(
            debug_name,
            requirements,
            allocator::memory_location(descriptor.properties),
            true,
            "buffer",
        ) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe {
            self.device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        } {
            unsafe { self.device.destroy_buffer(buffer, None) };
            self.free(allocation);
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "Failed to bind buffer memory: {:?}",
                e
            )));
        }

        let address = device_address.then(|| {
            let info = vk::BufferDeviceAddressInfo::default().buffer(buffer);
            unsafe { self.device.get_buffer_device_address(&info) }
        });

        let allocation_size = allocation.size();
        self.buffer_allocations.lock().insert(buffer, allocation);

        let gpu_buffer = GpuBuffer {
            handle: NativeBuffer::Vulkan(buffer),
            byte_size: descriptor.byte_size,
            allocation_size,
            device_address: address,
        };
        self.set_debug_name(DebugObject::Buffer(gpu_buffer.handle), debug_name);

        Ok(gpu_buffer)
    }

    /// Destroy a buffer and free its memory. Returns the freed allocation size.
    fn destroy_raw_buffer(&self, buffer: vk::Buffer) -> u64 {
        unsafe { self.device.destroy_buffer(buffer, None) };
        match self.buffer_allocations.lock().remove(&buffer) {
            Some(allocation) => {
                let size = allocation.size();
                self.free(allocation);
                size
            }
            None => {
                log::error!("VulkanDevice: no allocation for buffer {:?}", buffer);
                0
            }
        }
    }

    fn create_image_view(
        &self,
        image: vk::Image,
        view_type: vk::ImageViewType,
        format: ImageFormat,
        base_mip_level: u32,
        level_count: u32,
        layer_count: u32,
    ) -> Result<vk::ImageView, GraphicsError> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(view_type)
            .format(convert_image_format(format))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: convert_aspects(ImageAspects::from_format(format)),
                base_mip_level,
                level_count,
                base_array_layer: 0,
                layer_count,
            });

        unsafe { self.device.create_image_view(&view_info, None) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("Failed to create image view: {:?}", e))
        })
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to be idle before cleanup
            let _ = self.device.device_wait_idle();

            let leaked_buffers = std::mem::take(&mut *self.buffer_allocations.lock());
            let leaked_images = std::mem::take(&mut *self.image_allocations.lock());
            if !leaked_buffers.is_empty() || !leaked_images.is_empty() {
                log::warn!(
                    "VulkanDevice dropped with {} buffers and {} images alive",
                    leaked_buffers.len(),
                    leaked_images.len()
                );
            }
            for (buffer, allocation) in leaked_buffers {
                self.device.destroy_buffer(buffer, None);
                self.free(allocation);
            }
            for (image, allocation) in leaked_images {
                self.device.destroy_image(image, None);
                self.free(allocation);
            }

            self.device.destroy_command_pool(self.command_pool, None);

            // Drop allocator before device
            drop(self.allocator.lock().take());

            self.device.destroy_device(None);

            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

impl GpuDevice for VulkanDevice {
    fn name(&self) -> &'static str {
        "Vulkan Device (ash)"
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        debug_name: &str,
    ) -> Result<GpuBuffer, GraphicsError> {
        log::trace!(
            "VulkanDevice: creating buffer {:?} (size: {})",
            debug_name,
            descriptor.byte_size
        );
        let buffer = self.create_raw_buffer(descriptor, debug_name)?;
        self.memory.lock().buffers += buffer.allocation_size;
        Ok(buffer)
    }

    fn destroy_buffer(&self, buffer: GpuBuffer) {
        let NativeBuffer::Vulkan(handle) = buffer.handle else {
            log::error!("VulkanDevice: destroying foreign buffer {:?}", buffer.handle);
            return;
        };
        let size = self.destroy_raw_buffer(handle);
        self.memory.lock().buffers -= size;
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

        log::trace!(
            "VulkanDevice: creating image {:?} ({}x{}x{}, {:?})",
            debug_name,
            descriptor.width,
            descriptor.height,
            descriptor.depth,
            descriptor.format
        );

        let image_info = vk::ImageCreateInfo::default()
            .flags(convert_image_create_flags(descriptor.create_flags))
            .image_type(convert_image_type(descriptor.image_type))
            .format(convert_image_format(descriptor.format))
            .extent(vk::Extent3D {
                width: descriptor.width,
                height: descriptor.height,
                depth: descriptor.depth,
            })
            .mip_levels(descriptor.mip_count)
            .array_layers(descriptor.layer_count)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(convert_image_usage(descriptor.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { self.device.create_image(&image_info, None) }.map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!("Failed to create image: {:?}", e))
        })?;

        let requirements = unsafe { self.device.get_image_memory_requirements(image) };

        let allocation = match self.allocate(
            debug_name,
            requirements,
            allocator::memory_location(descriptor.properties),
            false,
            "image",
        ) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        if let Err(e) = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        } {
            unsafe { self.device.destroy_image(image, None) };
            self.free(allocation);
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "Failed to bind image memory: {:?}",
                e
            )));
        }

        let view = match self.create_image_view(
            image,
            whole_view_type(
                descriptor.image_type,
                descriptor.layer_count,
                descriptor.create_flags,
            ),
            descriptor.format,
            0,
            descriptor.mip_count,
            descriptor.layer_count,
        ) {
            Ok(view) => view,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                self.free(allocation);
                return Err(e);
            }
        };

        let allocation_size = allocation.size();
        self.image_allocations.lock().insert(image, allocation);
        self.memory.lock().images += allocation_size;

        let gpu_image = GpuImage {
            handle: NativeImage::Vulkan(image),
            view: NativeImageView::Vulkan(view),
            image_type: descriptor.image_type,
            format: descriptor.format,
            width: descriptor.width,
            height: descriptor.height,
            depth: descriptor.depth,
            mip_count: descriptor.mip_count,
            layer_count: descriptor.layer_count,
            create_flags: descriptor.create_flags,
            allocation_size,
        };
        self.set_debug_name(DebugObject::Image(gpu_image.handle), debug_name);
        self.set_debug_name(DebugObject::ImageView(gpu_image.view), debug_name);

        Ok(gpu_image)
    }

    fn destroy_image(&self, image: GpuImage) {
        if let NativeImageView::Vulkan(view) = image.view {
            unsafe { self.device.destroy_image_view(view, None) };
        }
        let NativeImage::Vulkan(handle) = image.handle else {
            log::error!("VulkanDevice: destroying foreign image {:?}", image.handle);
            return;
        };
        unsafe { self.device.destroy_image(handle, None) };
        match self.image_allocations.lock().remove(&handle) {
            Some(allocation) => {
                self.memory.lock().images -= allocation.size();
                self.free(allocation);
            }
            None => log::error!("VulkanDevice: no allocation for image {:?}", handle),
        }
    }

    fn create_texel_buffer(
        &self,
        descriptor: &TexelBufferDescriptor,
        debug_name: &str,
    ) -> Result<GpuTexelBuffer, GraphicsError> {
        descriptor.validate(self.format_features(descriptor.format))?;

        let buffer = self.create_raw_buffer(&descriptor.buffer, debug_name)?;
        let NativeBuffer::Vulkan(handle) = buffer.handle else {
            return Err(GraphicsError::Internal(
                "Vulkan device created a foreign buffer".to_string(),
            ));
        };

        let view_info = vk::BufferViewCreateInfo::default()
            .buffer(handle)
            .format(convert_image_format(descriptor.format))
            .offset(0)
            .range(descriptor.buffer.byte_size);

        let view = match unsafe { self.device.create_buffer_view(&view_info, None) } {
            Ok(view) => view,
            Err(e) => {
                self.destroy_raw_buffer(handle);
                return Err(GraphicsError::ResourceCreationFailed(format!(
                    "Failed to create buffer view: {:?}",
                    e
                )));
            }
        };

        self.memory.lock().texel_buffers += buffer.allocation_size;

        let texel_buffer = GpuTexelBuffer {
            handle: buffer.handle,
            view: NativeBufferView::Vulkan(view),
            format: descriptor.format,
            byte_size: buffer.byte_size,
            allocation_size: buffer.allocation_size,
        };
        self.set_debug_name(DebugObject::BufferView(texel_buffer.view), debug_name);

        Ok(texel_buffer)
    }

    fn destroy_texel_buffer(&self, buffer: GpuTexelBuffer) {
        if let NativeBufferView::Vulkan(view) = buffer.view {
            unsafe { self.device.destroy_buffer_view(view, None) };
        }
        let NativeBuffer::Vulkan(handle) = buffer.handle else {
            log::error!(
                "VulkanDevice: destroying foreign texel buffer {:?}",
                buffer.handle
            );
            return;
        };
        let size = self.destroy_raw_buffer(handle);
        self.memory.lock().texel_buffers -= size;
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
        let NativeImage::Vulkan(handle) = image.handle else {
            return Err(GraphicsError::InvalidParameter(format!(
                "foreign image {:?}",
                image.handle
            )));
        };

        let mut views = Vec::with_capacity(image.mip_count as usize);
        for mip in 0..image.mip_count {
            match self.create_image_view(
                handle,
                mip_view_type(image.image_type),
                image.format,
                mip,
                1,
                1,
            ) {
                Ok(view) => {
                    let view = NativeImageView::Vulkan(view);
                    self.set_debug_name(
                        DebugObject::ImageView(view),
                        &format!("{} mip {}", debug_name, mip),
                    );
                    views.push(view);
                }
                Err(e) => {
                    self.destroy_image_views(&views);
                    return Err(e);
                }
            }
        }

        Ok(views)
    }

    fn destroy_image_views(&self, views: &[NativeImageView]) {
        for view in views {
            if let NativeImageView::Vulkan(view) = view {
                unsafe { self.device.destroy_image_view(*view, None) };
            }
        }
    }

    fn format_features(&self, format: ImageFormat) -> FormatFeatures {
        let properties = unsafe {
            self.instance.get_physical_device_format_properties(
                self.physical_device,
                convert_image_format(format),
            )
        };
        convert_format_features(properties.buffer_features)
    }

    fn set_debug_name(&self, object: DebugObject, name: &str) {
        let Some(debug_utils) = &self.debug_utils_device else {
            return;
        };
        match object {
            DebugObject::Buffer(NativeBuffer::Vulkan(handle)) => {
                debug::set_object_name(debug_utils, handle, name)
            }
            DebugObject::BufferView(NativeBufferView::Vulkan(handle)) => {
                debug::set_object_name(debug_utils, handle, name)
            }
            DebugObject::Image(NativeImage::Vulkan(handle)) => {
                debug::set_object_name(debug_utils, handle, name)
            }
            DebugObject::ImageView(NativeImageView::Vulkan(handle)) => {
                debug::set_object_name(debug_utils, handle, name)
            }
            other => log::error!("VulkanDevice: naming foreign object {:?}", other),
        }
    }

    fn memory_allocations(&self) -> MemoryAllocationBytes {
        *self.memory.lock()
    }

    fn begin_commands(&self) -> Result<CommandBuffer, GraphicsError> {
        let _guard = self.submit_lock.lock();
        let cmd = command::begin_one_shot(&self.device, self.command_pool)?;
        Ok(CommandBuffer::Vulkan(cmd))
    }

    fn submit_commands(&self, cmd: CommandBuffer) -> Result<(), GraphicsError> {
        let CommandBuffer::Vulkan(cmd) = cmd else {
            return Err(GraphicsError::InvalidParameter(format!(
                "foreign command buffer {:?}",
                cmd
            )));
        };
        let _guard = self.submit_lock.lock();
        command::submit_one_shot(&self.device, self.command_pool, self.graphics_queue, cmd)
    }

    fn cmd_pipeline_barrier(
        &self,
        cmd: CommandBuffer,
        buffer_barriers: &[BufferBarrier],
        image_barriers: &[ImageBarrier],
    ) {
        let CommandBuffer::Vulkan(cmd) = cmd else {
            log::error!("VulkanDevice: recording into foreign command buffer {:?}", cmd);
            return;
        };
        BarrierBatch::new(buffer_barriers, image_barriers).record(&self.device, cmd);
    }
}
