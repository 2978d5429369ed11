//! Vulkan command pool and one-shot command buffers.

use ash::vk;

use crate::error::GraphicsError;

/// Timeout for one-shot submissions, in nanoseconds.
const SUBMIT_TIMEOUT_NS: u64 = 10_000_000_000;

/// Create a command pool for graphics operations.
pub fn create_command_pool(
    device: &ash::Device,
    queue_family_index: u32,
) -> Result<vk::CommandPool, GraphicsError> {
    let pool_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(queue_family_index)
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

    let pool = unsafe { device.create_command_pool(&pool_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create command pool: {:?}", e))
    })?;

    Ok(pool)
}

/// Allocate a primary command buffer and begin one-time recording.
pub fn begin_one_shot(
    device: &ash::Device,
    pool: vk::CommandPool,
) -> Result<vk::CommandBuffer, GraphicsError> {
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let cmd = unsafe { device.allocate_command_buffers(&alloc_info) }
        .map_err(|e| {
            GraphicsError::ResourceCreationFailed(format!(
                "Failed to allocate command buffer: {:?}",
                e
            ))
        })?
        .into_iter()
        .next()
        .ok_or_else(|| GraphicsError::Internal("No command buffer allocated".to_string()))?;

    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    if let Err(e) = unsafe { device.begin_command_buffer(cmd, &begin_info) } {
        unsafe { device.free_command_buffers(pool, &[cmd]) };
        return Err(GraphicsError::Internal(format!(
            "Failed to begin command buffer: {:?}",
            e
        )));
    }

    Ok(cmd)
}

/// End, submit and wait for a one-shot command buffer, then free it.
pub fn submit_one_shot(
    device: &ash::Device,
    pool: vk::CommandPool,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
) -> Result<(), GraphicsError> {
    let result = submit_and_wait(device, queue, cmd);
    unsafe { device.free_command_buffers(pool, &[cmd]) };
    result
}

fn submit_and_wait(
    device: &ash::Device,
    queue: vk::Queue,
    cmd: vk::CommandBuffer,
) -> Result<(), GraphicsError> {
    unsafe { device.end_command_buffer(cmd) }.map_err(|e| {
        GraphicsError::Internal(format!("Failed to end command buffer: {:?}", e))
    })?;

    let fence = unsafe { device.create_fence(&vk::FenceCreateInfo::default(), None) }.map_err(
        |e| GraphicsError::ResourceCreationFailed(format!("Failed to create fence: {:?}", e)),
    )?;

    let command_buffers = [cmd];
    let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

    let result = unsafe { device.queue_submit(queue, &[submit_info], fence) }
        .and_then(|()| unsafe { device.wait_for_fences(&[fence], true, SUBMIT_TIMEOUT_NS) });

    unsafe { device.destroy_fence(fence, None) };

    result.map_err(|e| match e {
        vk::Result::ERROR_DEVICE_LOST => GraphicsError::DeviceLost,
        other => GraphicsError::Internal(format!("Failed to submit command buffer: {:?}", other)),
    })
}
