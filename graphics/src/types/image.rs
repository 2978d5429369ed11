//! Image types and descriptors.

use bitflags::bitflags;

use super::MemoryProperties;

/// Dimensionality of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageType {
    /// One-dimensional image.
    D1,
    /// Two-dimensional image.
    #[default]
    D2,
    /// Three-dimensional image.
    D3,
}

/// Image format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ImageFormat {
    /// No format.
    #[default]
    Undefined,

    // 8-bit formats
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,

    // 32-bit formats
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 16-bit RG channels, float.
    Rg16Float,
    /// 8-bit RGBA channels, unsigned normalized.
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8Srgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// Packed 11/11/10-bit unsigned float.
    B10g11r11Ufloat,

    // 64-bit formats
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit RG channels, float.
    Rg32Float,

    // 128-bit formats
    /// 32-bit RGBA channels, float.
    Rgba32Float,

    // Depth/stencil formats
    /// 16-bit depth.
    D16Unorm,
    /// 32-bit depth, float.
    D32Float,
    /// 24-bit depth with 8-bit stencil.
    D24UnormS8Uint,
    /// 32-bit depth float with 8-bit stencil.
    D32FloatS8Uint,
}

impl ImageFormat {
    /// Returns true if this format has a depth component.
    pub fn has_depth(&self) -> bool {
        matches!(
            self,
            Self::D16Unorm | Self::D32Float | Self::D24UnormS8Uint | Self::D32FloatS8Uint
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::D24UnormS8Uint | Self::D32FloatS8Uint)
    }

    /// Returns the size in bytes per texel, 0 for [`ImageFormat::Undefined`].
    pub fn texel_size(&self) -> u64 {
        match self {
            Self::Undefined => 0,
            Self::R8Unorm => 1,
            Self::D16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8Srgb
            | Self::Bgra8Unorm
            | Self::B10g11r11Ufloat
            | Self::D32Float
            | Self::D24UnormS8Uint => 4,
            Self::Rgba16Float | Self::Rg32Float | Self::D32FloatS8Uint => 8,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Usage flags for images.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        /// Image can be copied from.
        const TRANSFER_SRC = 1 << 0;
        /// Image can be copied to.
        const TRANSFER_DST = 1 << 1;
        /// Image can be sampled in a shader.
        const SAMPLED = 1 << 2;
        /// Image can be used as a storage image.
        const STORAGE = 1 << 3;
        /// Image can be used as a color attachment.
        const COLOR_ATTACHMENT = 1 << 4;
        /// Image can be used as a depth/stencil attachment.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
    }
}

impl Default for ImageUsage {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Creation flags for images.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageCreateFlags: u32 {
        /// Six-layer image that can be viewed as a cube.
        const CUBE_COMPATIBLE = 1 << 0;
    }
}

impl Default for ImageCreateFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Shape of a pooled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    /// Image dimensionality.
    pub image_type: ImageType,
    /// Texel format.
    pub format: ImageFormat,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth in texels.
    pub depth: u32,
    /// Mip level count.
    pub mip_count: u32,
    /// Array layer count.
    pub layer_count: u32,
    /// Creation flags.
    pub create_flags: ImageCreateFlags,
    /// Usage flags.
    pub usage: ImageUsage,
    /// Memory properties of the backing allocation.
    pub properties: MemoryProperties,
}

impl ImageDescriptor {
    /// Create a new 2D image descriptor.
    pub fn new_2d(width: u32, height: u32, format: ImageFormat, usage: ImageUsage) -> Self {
        Self {
            width,
            height,
            format,
            usage,
            ..Self::default()
        }
    }

    /// Create a new 3D image descriptor.
    pub fn new_3d(
        width: u32,
        height: u32,
        depth: u32,
        format: ImageFormat,
        usage: ImageUsage,
    ) -> Self {
        Self {
            image_type: ImageType::D3,
            width,
            height,
            depth,
            format,
            usage,
            ..Self::default()
        }
    }

    /// Set the mip level count.
    pub fn with_mip_count(mut self, count: u32) -> Self {
        self.mip_count = count;
        self
    }

    /// Set the array layer count.
    pub fn with_layer_count(mut self, count: u32) -> Self {
        self.layer_count = count;
        self
    }

    /// Set the creation flags.
    pub fn with_create_flags(mut self, flags: ImageCreateFlags) -> Self {
        self.create_flags = flags;
        self
    }

    /// Set the memory properties.
    pub fn with_properties(mut self, properties: MemoryProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Number of mip levels a full chain for this extent would have.
    pub fn full_mip_count(&self) -> u32 {
        let largest = self.width.max(self.height).max(self.depth).max(1);
        32 - largest.leading_zeros()
    }

    /// Rough byte size of all mips and layers, ignoring alignment.
    pub fn estimated_byte_size(&self) -> u64 {
        let mut total = 0u64;
        for mip in 0..self.mip_count {
            let w = u64::from(self.width.checked_shr(mip).unwrap_or(0).max(1));
            let h = u64::from(self.height.checked_shr(mip).unwrap_or(0).max(1));
            let d = u64::from(self.depth.checked_shr(mip).unwrap_or(0).max(1));
            total += w * h * d * self.format.texel_size();
        }
        total * u64::from(self.layer_count)
    }
}

impl Default for ImageDescriptor {
    fn default() -> Self {
        Self {
            image_type: ImageType::D2,
            format: ImageFormat::Undefined,
            width: 1,
            height: 1,
            depth: 1,
            mip_count: 1,
            layer_count: 1,
            create_flags: ImageCreateFlags::empty(),
            usage: ImageUsage::empty(),
            properties: MemoryProperties::DEVICE_LOCAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_mip_count() {
        let desc = ImageDescriptor::new_2d(1920, 1080, ImageFormat::Rgba8Unorm, ImageUsage::SAMPLED);
        assert_eq!(desc.full_mip_count(), 11);
        let desc = ImageDescriptor::new_2d(1, 1, ImageFormat::Rgba8Unorm, ImageUsage::SAMPLED);
        assert_eq!(desc.full_mip_count(), 1);
    }

    #[test]
    fn test_estimated_byte_size() {
        let desc = ImageDescriptor::new_2d(4, 4, ImageFormat::Rgba8Unorm, ImageUsage::SAMPLED)
            .with_mip_count(3);
        // 16 + 4 + 1 texels
        assert_eq!(desc.estimated_byte_size(), 21 * 4);
    }

    #[test]
    fn test_estimated_byte_size_past_full_chain() {
        let desc = ImageDescriptor::new_2d(1, 1, ImageFormat::Rgba8Unorm, ImageUsage::SAMPLED)
            .with_mip_count(40);
        assert_eq!(desc.estimated_byte_size(), 40 * 4);
    }

    #[test]
    fn test_descriptor_equality_covers_create_flags() {
        let a = ImageDescriptor::new_2d(64, 64, ImageFormat::Rgba16Float, ImageUsage::SAMPLED)
            .with_layer_count(6);
        let b = a.with_create_flags(ImageCreateFlags::CUBE_COMPATIBLE);
        assert_ne!(a, b);
    }

    #[test]
    fn test_depth_stencil_format_queries() {
        assert!(ImageFormat::D32Float.has_depth());
        assert!(!ImageFormat::D32Float.has_stencil());
        assert!(ImageFormat::D24UnormS8Uint.has_stencil());
        assert!(!ImageFormat::Rgba8Unorm.has_depth());
    }
}
