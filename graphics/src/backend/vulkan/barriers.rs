//! Recording pool barriers as a single Vulkan pipeline barrier.
//!
//! Every barrier in a batch is folded into one `vkCmdPipelineBarrier` call.
//! Source and destination stage masks are the union over the batch.

use ash::vk;

use super::conversion::{convert_access, convert_aspects, convert_layout, convert_stages};
use crate::backend::{NativeBuffer, NativeImage};
use crate::types::{BufferBarrier, ImageBarrier};

/// Stage masks and Vulkan barriers for one batch.
#[derive(Debug, Default)]
pub struct BarrierBatch {
    buffer_barriers: Vec<vk::BufferMemoryBarrier<'static>>,
    image_barriers: Vec<vk::ImageMemoryBarrier<'static>>,
    src_stage_mask: vk::PipelineStageFlags,
    dst_stage_mask: vk::PipelineStageFlags,
}

impl BarrierBatch {
    /// Convert pool barriers, skipping any that carry non-Vulkan handles.
    pub fn new(buffers: &[BufferBarrier], images: &[ImageBarrier]) -> Self {
        let mut batch = Self::default();

        for barrier in buffers {
            let NativeBuffer::Vulkan(buffer) = barrier.buffer else {
                log::error!("VulkanDevice: barrier on foreign buffer {:?}", barrier.buffer);
                continue;
            };
            batch.src_stage_mask |= convert_stages(barrier.src_stages);
            batch.dst_stage_mask |= convert_stages(barrier.dst_stages);
            batch.buffer_barriers.push(
                vk::BufferMemoryBarrier::default()
                    .src_access_mask(convert_access(barrier.src_access))
                    .dst_access_mask(convert_access(barrier.dst_access))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .buffer(buffer)
                    .offset(barrier.offset)
                    .size(barrier.size),
            );
        }

        for barrier in images {
            let NativeImage::Vulkan(image) = barrier.image else {
                log::error!("VulkanDevice: barrier on foreign image {:?}", barrier.image);
                continue;
            };
            batch.src_stage_mask |= convert_stages(barrier.src_stages);
            batch.dst_stage_mask |= convert_stages(barrier.dst_stages);
            batch.image_barriers.push(
                vk::ImageMemoryBarrier::default()
                    .old_layout(convert_layout(barrier.old_layout))
                    .new_layout(convert_layout(barrier.new_layout))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: convert_aspects(barrier.range.aspects),
                        base_mip_level: barrier.range.base_mip_level,
                        level_count: barrier.range.level_count,
                        base_array_layer: barrier.range.base_array_layer,
                        layer_count: barrier.range.layer_count,
                    })
                    .src_access_mask(convert_access(barrier.src_access))
                    .dst_access_mask(convert_access(barrier.dst_access)),
            );
        }

        batch
    }

    /// Check if the batch has any barriers.
    pub fn is_empty(&self) -> bool {
        self.buffer_barriers.is_empty() && self.image_barriers.is_empty()
    }

    /// Source stages, with an empty mask mapped to top of pipe.
    pub fn src_stages(&self) -> vk::PipelineStageFlags {
        if self.src_stage_mask.is_empty() {
            vk::PipelineStageFlags::TOP_OF_PIPE
        } else {
            self.src_stage_mask
        }
    }

    /// Destination stages, with an empty mask mapped to bottom of pipe.
    pub fn dst_stages(&self) -> vk::PipelineStageFlags {
        if self.dst_stage_mask.is_empty() {
            vk::PipelineStageFlags::BOTTOM_OF_PIPE
        } else {
            self.dst_stage_mask
        }
    }

    /// Record all barriers in a single pipeline barrier command.
    ///
    /// Does nothing if the batch is empty.
    pub fn record(&self, device: &ash::Device, cmd: vk::CommandBuffer) {
        if self.is_empty() {
            return;
        }

        unsafe {
            device.cmd_pipeline_barrier(
                cmd,
                self.src_stages(),
                self.dst_stages(),
                vk::DependencyFlags::empty(),
                &[],
                &self.buffer_barriers,
                &self.image_barriers,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AccessFlags, ImageAspects, ImageLayout, PipelineStages, SubresourceRange,
    };
    use ash::vk::Handle;

    fn image_barrier(image: NativeImage) -> ImageBarrier {
        ImageBarrier {
            image,
            src_stages: PipelineStages::empty(),
            src_access: AccessFlags::empty(),
            dst_stages: PipelineStages::COMPUTE_SHADER,
            dst_access: AccessFlags::SHADER_READ,
            old_layout: ImageLayout::Undefined,
            new_layout: ImageLayout::General,
            range: SubresourceRange::full(ImageAspects::COLOR, 1, 1),
        }
    }

    #[test]
    fn test_barrier_batch_empty() {
        let batch = BarrierBatch::new(&[], &[]);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_barrier_batch_stage_fallbacks() {
        let image = NativeImage::Vulkan(vk::Image::from_raw(12345));
        let batch = BarrierBatch::new(&[], &[image_barrier(image)]);

        assert!(!batch.is_empty());
        assert_eq!(batch.src_stages(), vk::PipelineStageFlags::TOP_OF_PIPE);
        assert_eq!(batch.dst_stages(), vk::PipelineStageFlags::COMPUTE_SHADER);
    }

    #[test]
    fn test_barrier_batch_skips_foreign_handles() {
        let batch = BarrierBatch::new(&[], &[image_barrier(NativeImage::Dummy(1))]);
        assert!(batch.is_empty());
    }
}
