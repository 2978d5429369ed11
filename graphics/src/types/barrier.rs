//! Backend-neutral memory barriers produced by state transitions.

use bitflags::bitflags;

use super::{AccessFlags, ImageFormat, ImageLayout, PipelineStages};
use crate::backend::{NativeBuffer, NativeImage};

bitflags! {
    /// Aspects of an image covered by a view or barrier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspects: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

impl ImageAspects {
    /// Aspects implied by a format.
    pub fn from_format(format: ImageFormat) -> Self {
        if format.has_depth() {
            if format.has_stencil() {
                Self::DEPTH | Self::STENCIL
            } else {
                Self::DEPTH
            }
        } else {
            Self::COLOR
        }
    }
}

/// Mip levels and array layers of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    pub aspects: ImageAspects,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl SubresourceRange {
    /// Range covering every mip and layer.
    pub fn full(aspects: ImageAspects, level_count: u32, layer_count: u32) -> Self {
        Self {
            aspects,
            base_mip_level: 0,
            level_count,
            base_array_layer: 0,
            layer_count,
        }
    }

    /// Range covering a single mip level of the first layer.
    pub fn mip(aspects: ImageAspects, level: u32) -> Self {
        Self {
            aspects,
            base_mip_level: level,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }
}

/// Barrier on a whole buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBarrier {
    pub buffer: NativeBuffer,
    pub src_stages: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_stages: PipelineStages,
    pub dst_access: AccessFlags,
    pub offset: u64,
    pub size: u64,
}

/// Barrier with layout transition on an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: NativeImage,
    pub src_stages: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_stages: PipelineStages,
    pub dst_access: AccessFlags,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub range: SubresourceRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspects_from_format() {
        assert_eq!(ImageAspects::from_format(ImageFormat::Rgba8Unorm), ImageAspects::COLOR);
        assert_eq!(ImageAspects::from_format(ImageFormat::D32Float), ImageAspects::DEPTH);
        assert_eq!(
            ImageAspects::from_format(ImageFormat::D24UnormS8Uint),
            ImageAspects::DEPTH | ImageAspects::STENCIL
        );
    }
}
