//! Type conversions between pool types and Vulkan types.

use ash::vk;

use crate::types::{
    AccessFlags, BufferUsage, FormatFeatures, ImageAspects, ImageCreateFlags, ImageFormat,
    ImageLayout, ImageType, ImageUsage, PipelineStages,
};

/// Convert BufferUsage flags to Vulkan buffer usage flags.
pub fn convert_buffer_usage(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut result = vk::BufferUsageFlags::empty();

    if usage.contains(BufferUsage::TRANSFER_SRC) {
        result |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsage::TRANSFER_DST) {
        result |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(BufferUsage::UNIFORM_TEXEL) {
        result |= vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER;
    }
    if usage.contains(BufferUsage::STORAGE_TEXEL) {
        result |= vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        result |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::STORAGE) {
        result |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        result |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::VERTEX) {
        result |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDIRECT) {
        result |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    if usage.contains(BufferUsage::SHADER_DEVICE_ADDRESS) {
        result |= vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    }

    result
}

/// Convert ImageFormat to Vulkan format.
pub fn convert_image_format(format: ImageFormat) -> vk::Format {
    match format {
        ImageFormat::Undefined => vk::Format::UNDEFINED,

        // 8-bit formats
        ImageFormat::R8Unorm => vk::Format::R8_UNORM,

        // 32-bit formats
        ImageFormat::R32Float => vk::Format::R32_SFLOAT,
        ImageFormat::R32Uint => vk::Format::R32_UINT,
        ImageFormat::Rg16Float => vk::Format::R16G16_SFLOAT,
        ImageFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        ImageFormat::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
        ImageFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        ImageFormat::B10g11r11Ufloat => vk::Format::B10G11R11_UFLOAT_PACK32,

        // 64-bit formats
        ImageFormat::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
        ImageFormat::Rg32Float => vk::Format::R32G32_SFLOAT,

        // 128-bit formats
        ImageFormat::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,

        // Depth/stencil formats
        ImageFormat::D16Unorm => vk::Format::D16_UNORM,
        ImageFormat::D32Float => vk::Format::D32_SFLOAT,
        ImageFormat::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        ImageFormat::D32FloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// Convert ImageUsage flags to Vulkan image usage flags.
pub fn convert_image_usage(usage: ImageUsage) -> vk::ImageUsageFlags {
    let mut result = vk::ImageUsageFlags::empty();

    if usage.contains(ImageUsage::TRANSFER_SRC) {
        result |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(ImageUsage::TRANSFER_DST) {
        result |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(ImageUsage::SAMPLED) {
        result |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(ImageUsage::STORAGE) {
        result |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
        result |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(ImageUsage::DEPTH_STENCIL_ATTACHMENT) {
        result |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }

    result
}

/// Convert an image type to the Vulkan image type.
pub fn convert_image_type(image_type: ImageType) -> vk::ImageType {
    match image_type {
        ImageType::D1 => vk::ImageType::TYPE_1D,
        ImageType::D2 => vk::ImageType::TYPE_2D,
        ImageType::D3 => vk::ImageType::TYPE_3D,
    }
}

/// Convert image creation flags.
pub fn convert_image_create_flags(flags: ImageCreateFlags) -> vk::ImageCreateFlags {
    let mut result = vk::ImageCreateFlags::empty();
    if flags.contains(ImageCreateFlags::CUBE_COMPATIBLE) {
        result |= vk::ImageCreateFlags::CUBE_COMPATIBLE;
    }
    result
}

/// Pick the view type for a whole-resource view.
pub fn whole_view_type(
    image_type: ImageType,
    layer_count: u32,
    flags: ImageCreateFlags,
) -> vk::ImageViewType {
    match image_type {
        ImageType::D1 if layer_count > 1 => vk::ImageViewType::TYPE_1D_ARRAY,
        ImageType::D1 => vk::ImageViewType::TYPE_1D,
        ImageType::D2 if flags.contains(ImageCreateFlags::CUBE_COMPATIBLE) => {
            if layer_count > 6 {
                vk::ImageViewType::CUBE_ARRAY
            } else {
                vk::ImageViewType::CUBE
            }
        }
        ImageType::D2 if layer_count > 1 => vk::ImageViewType::TYPE_2D_ARRAY,
        ImageType::D2 => vk::ImageViewType::TYPE_2D,
        ImageType::D3 => vk::ImageViewType::TYPE_3D,
    }
}

/// Pick the view type for a single-mip view of a single-layer image.
pub fn mip_view_type(image_type: ImageType) -> vk::ImageViewType {
    match image_type {
        ImageType::D1 => vk::ImageViewType::TYPE_1D,
        ImageType::D2 => vk::ImageViewType::TYPE_2D,
        ImageType::D3 => vk::ImageViewType::TYPE_3D,
    }
}

/// Convert image aspects.
pub fn convert_aspects(aspects: ImageAspects) -> vk::ImageAspectFlags {
    let mut result = vk::ImageAspectFlags::empty();
    if aspects.contains(ImageAspects::COLOR) {
        result |= vk::ImageAspectFlags::COLOR;
    }
    if aspects.contains(ImageAspects::DEPTH) {
        result |= vk::ImageAspectFlags::DEPTH;
    }
    if aspects.contains(ImageAspects::STENCIL) {
        result |= vk::ImageAspectFlags::STENCIL;
    }
    result
}

/// Convert an image layout.
pub fn convert_layout(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::ColorAttachmentOptimal => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthAttachmentOptimal => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthReadOnlyOptimal => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::TransferSrcOptimal => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDstOptimal => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    }
}

/// Convert pipeline stages.
///
/// Ray tracing maps onto the KHR ray tracing stage; the barrier is only
/// recorded with it when the state actually names that stage.
pub fn convert_stages(stages: PipelineStages) -> vk::PipelineStageFlags {
    let mut result = vk::PipelineStageFlags::empty();
    if stages.contains(PipelineStages::FRAGMENT_SHADER) {
        result |= vk::PipelineStageFlags::FRAGMENT_SHADER;
    }
    if stages.contains(PipelineStages::EARLY_FRAGMENT_TESTS) {
        result |= vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
    }
    if stages.contains(PipelineStages::LATE_FRAGMENT_TESTS) {
        result |= vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
    }
    if stages.contains(PipelineStages::COLOR_ATTACHMENT_OUTPUT) {
        result |= vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT;
    }
    if stages.contains(PipelineStages::COMPUTE_SHADER) {
        result |= vk::PipelineStageFlags::COMPUTE_SHADER;
    }
    if stages.contains(PipelineStages::RAY_TRACING_SHADER) {
        result |= vk::PipelineStageFlags::RAY_TRACING_SHADER_KHR;
    }
    if stages.contains(PipelineStages::TRANSFER) {
        result |= vk::PipelineStageFlags::TRANSFER;
    }
    result
}

/// Convert memory access flags.
pub fn convert_access(access: AccessFlags) -> vk::AccessFlags {
    let mut result = vk::AccessFlags::empty();
    if access.contains(AccessFlags::SHADER_READ) {
        result |= vk::AccessFlags::SHADER_READ;
    }
    if access.contains(AccessFlags::SHADER_WRITE) {
        result |= vk::AccessFlags::SHADER_WRITE;
    }
    if access.contains(AccessFlags::COLOR_ATTACHMENT_READ) {
        result |= vk::AccessFlags::COLOR_ATTACHMENT_READ;
    }
    if access.contains(AccessFlags::COLOR_ATTACHMENT_WRITE) {
        result |= vk::AccessFlags::COLOR_ATTACHMENT_WRITE;
    }
    if access.contains(AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ) {
        result |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ;
    }
    if access.contains(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE) {
        result |= vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
    }
    if access.contains(AccessFlags::TRANSFER_READ) {
        result |= vk::AccessFlags::TRANSFER_READ;
    }
    if access.contains(AccessFlags::TRANSFER_WRITE) {
        result |= vk::AccessFlags::TRANSFER_WRITE;
    }
    result
}

/// Convert Vulkan buffer format features to texel buffer features.
pub fn convert_format_features(features: vk::FormatFeatureFlags) -> FormatFeatures {
    let mut result = FormatFeatures::empty();
    if features.contains(vk::FormatFeatureFlags::UNIFORM_TEXEL_BUFFER) {
        result |= FormatFeatures::UNIFORM_TEXEL_BUFFER;
    }
    if features.contains(vk::FormatFeatureFlags::STORAGE_TEXEL_BUFFER) {
        result |= FormatFeatures::STORAGE_TEXEL_BUFFER;
    }
    if features.contains(vk::FormatFeatureFlags::STORAGE_TEXEL_BUFFER_ATOMIC) {
        result |= FormatFeatures::STORAGE_TEXEL_BUFFER_ATOMIC;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_buffer_usage() {
        let usage = convert_buffer_usage(BufferUsage::STORAGE_TEXEL | BufferUsage::TRANSFER_DST);
        assert!(usage.contains(vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER));
        assert!(usage.contains(vk::BufferUsageFlags::TRANSFER_DST));
        assert!(!usage.contains(vk::BufferUsageFlags::VERTEX_BUFFER));
    }

    #[test]
    fn test_whole_view_type() {
        let none = ImageCreateFlags::empty();
        let cube = ImageCreateFlags::CUBE_COMPATIBLE;
        assert_eq!(whole_view_type(ImageType::D2, 1, none), vk::ImageViewType::TYPE_2D);
        assert_eq!(whole_view_type(ImageType::D2, 4, none), vk::ImageViewType::TYPE_2D_ARRAY);
        assert_eq!(whole_view_type(ImageType::D2, 6, cube), vk::ImageViewType::CUBE);
        assert_eq!(whole_view_type(ImageType::D2, 12, cube), vk::ImageViewType::CUBE_ARRAY);
        assert_eq!(whole_view_type(ImageType::D1, 3, none), vk::ImageViewType::TYPE_1D_ARRAY);
        assert_eq!(whole_view_type(ImageType::D3, 1, none), vk::ImageViewType::TYPE_3D);
    }

    #[test]
    fn test_convert_layout() {
        assert_eq!(
            convert_layout(ImageLayout::DepthReadOnlyOptimal),
            vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
        );
        assert_eq!(convert_layout(ImageLayout::Undefined), vk::ImageLayout::UNDEFINED);
    }

    #[test]
    fn test_convert_format_features() {
        let features = convert_format_features(
            vk::FormatFeatureFlags::STORAGE_TEXEL_BUFFER
                | vk::FormatFeatureFlags::STORAGE_TEXEL_BUFFER_ATOMIC
                | vk::FormatFeatureFlags::SAMPLED_IMAGE,
        );
        assert_eq!(
            features,
            FormatFeatures::STORAGE_TEXEL_BUFFER | FormatFeatures::STORAGE_TEXEL_BUFFER_ATOMIC
        );
    }
}
