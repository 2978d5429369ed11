//! Pool integration tests for the graphics crate.
//!
//! These tests drive [`RenderResources`] through whole frames against each
//! backend. Tests are parameterized using `rstest`; a backend that cannot be
//! created on the current machine is skipped.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test pool_tests
//! ```

mod common;

use rstest::rstest;

use common::{Backend, TestContext, color_image, storage_buffer, storage_texels};
use respool_graphics::{
    BufferDescriptor, BufferState, BufferUsage, DummyDevice, GraphicsError, ImageFormat,
    ImageState, RenderResources, TexelBufferDescriptor, Transitions,
};

fn run_frames(resources: &mut RenderResources, count: usize) {
    for _ in 0..count {
        resources.start_frame();
    }
}

// ============================================================================
// Aliasing and lifetime
// ============================================================================

/// Two passes with the same buffer shape share one physical buffer.
#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_passes_alias_same_shape(#[case] backend: Backend) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let buffers = &mut ctx.resources.buffers;
    buffers.start_frame();

    let culling = buffers.create(&storage_buffer(4096), "culling").unwrap();
    let native = buffers.native_handle(culling);
    buffers.release(culling);

    let lighting = buffers.create(&storage_buffer(4096), "lighting").unwrap();
    assert_eq!(buffers.native_handle(lighting), native);
    assert_eq!(buffers.aliased_debug_name(lighting), "culling|lighting");
    assert_eq!(buffers.slot_count(), 1);
    assert!(!buffers.is_valid_handle(culling));

    buffers.release(lighting);
}

/// An abandoned shape is torn down after the hysteresis window and its
/// memory returned.
#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_unused_resources_are_reclaimed(#[case] backend: Backend) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let baseline = ctx.resources.memory_allocations();
    ctx.resources.start_frame();

    let image = ctx.resources.images.create(&color_image(128, 128, 1), "gbuffer").unwrap();
    let buffer = ctx.resources.buffers.create(&storage_buffer(1024), "tiles").unwrap();
    assert!(ctx.resources.memory_allocations().images > baseline.images);
    ctx.resources.images.release(image);
    ctx.resources.buffers.release(buffer);

    let delay = ctx.resources.buffers.settings().destroy_delay_frames() as usize;
    run_frames(&mut ctx.resources, delay + 1);
    assert_eq!(ctx.resources.buffers.live_count(), 1);

    ctx.resources.start_frame();
    assert_eq!(ctx.resources.buffers.live_count(), 0);
    assert_eq!(ctx.resources.images.live_count(), 0);
    assert_eq!(ctx.resources.memory_allocations(), baseline);
}

/// A preserved image keeps its handle and contents across frames.
#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_preserved_history_survives(#[case] backend: Backend) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let images = &mut ctx.resources.images;
    images.start_frame();

    let history = images.create(&color_image(64, 64, 1), "taa_history").unwrap();
    let native = images.native_handle(history);
    images.preserve(history);

    images.start_frame();
    assert!(images.is_valid_handle(history));
    assert_eq!(images.native_handle(history), native);

    // A same-shaped request must not steal the preserved slot.
    let other = images.create(&color_image(64, 64, 1), "taa_output").unwrap();
    assert_ne!(other.index(), history.index());

    images.release(history);
    images.release(other);
}

/// Tearing down invalidates every handle.
#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_destroy_resources_invalidates_handles(#[case] backend: Backend) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    ctx.resources.start_frame();
    let buffer = ctx.resources.buffers.create(&storage_buffer(256), "params").unwrap();

    ctx.resources.destroy_resources();
    assert!(!ctx.resources.buffers.is_valid_handle(buffer));
    assert_eq!(ctx.resources.memory_allocations().total(), 0);
}

// ============================================================================
// Texel buffers and views
// ============================================================================

/// Texel buffers are accounted in their own bucket.
#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_texel_buffer_accounting(#[case] backend: Backend) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    ctx.resources.start_frame();

    let texels = ctx
        .resources
        .texel_buffers
        .create(&storage_texels(4096), "light_grid")
        .unwrap();
    let memory = ctx.resources.memory_allocations();
    assert!(memory.texel_buffers >= 4096);
    assert_eq!(memory.buffers, 0);

    ctx.resources.texel_buffers.release(texels);
}

/// Asking for unsupported texel features fails without touching the pool.
#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_texel_buffer_rejects_unsupported_format(#[case] backend: Backend) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    ctx.resources.start_frame();

    // Depth formats never back texel buffers.
    let desc = TexelBufferDescriptor::new(
        BufferDescriptor::new(1024, BufferUsage::STORAGE_TEXEL),
        ImageFormat::D32Float,
    );
    let err = ctx.resources.texel_buffers.create(&desc, "bad").unwrap_err();
    assert!(matches!(err, GraphicsError::FeatureNotSupported(_)));
    assert_eq!(ctx.resources.texel_buffers.slot_count(), 0);
}

/// Per-mip views are created once and named after the logical resource.
#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_mip_views(#[case] backend: Backend) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let images = &mut ctx.resources.images;
    images.start_frame();

    let pyramid = images.create(&color_image(64, 64, 7), "depth_pyramid").unwrap();
    let views = images.subresource_views(pyramid).unwrap().to_vec();
    assert_eq!(views.len(), 7);
    assert_eq!(images.subresource_views(pyramid).unwrap(), views.as_slice());

    let flat = images.create(&color_image(64, 64, 1), "flat").unwrap();
    let whole = images.resource(flat).view();
    assert_eq!(images.subresource_views(flat).unwrap(), &[whole]);

    images.release(pyramid);
    images.release(flat);
}

// ============================================================================
// Barriers
// ============================================================================

/// A frame's transitions are recorded and submitted as one barrier.
#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_transitions_submit(#[case] backend: Backend) {
    let Some(mut ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    ctx.resources.start_frame();

    let image = ctx.resources.images.create(&color_image(32, 32, 1), "target").unwrap();
    let texels = ctx
        .resources
        .texel_buffers
        .create(&storage_texels(512), "texels")
        .unwrap();
    let buffer = ctx.resources.buffers.create(&storage_buffer(512), "buffer").unwrap();

    ctx.submit(|resources, cmd| {
        resources.transition(
            cmd,
            &Transitions::new()
                .image(image, ImageState::COMPUTE_SHADER_WRITE)
                .texel_buffer(texels, BufferState::COMPUTE_SHADER_WRITE)
                .buffer(buffer, BufferState::COMPUTE_SHADER_READ_WRITE),
        );
        resources.transition(
            cmd,
            &Transitions::new()
                .image(image, ImageState::FRAGMENT_SHADER_READ)
                .buffer(buffer, BufferState::TRANSFER_SRC),
        );
    });

    assert_eq!(
        ctx.resources.images.resource(image).state(),
        ImageState::FRAGMENT_SHADER_READ
    );
    assert_eq!(
        ctx.resources.buffers.resource(buffer).state(),
        BufferState::TRANSFER_SRC
    );

    ctx.resources.images.release(image);
    ctx.resources.texel_buffers.release(texels);
    ctx.resources.buffers.release(buffer);
}

// ============================================================================
// Debug pin
// ============================================================================

/// The marked resource keeps its physical slot while the inspector looks at it.
#[test]
fn test_debug_pin_blocks_aliasing() {
    let device = std::sync::Arc::new(DummyDevice::new());
    let mut resources = RenderResources::new(device);

    resources.buffers.mark_for_debug("ssao");
    resources.start_frame();

    let ssao = resources.buffers.create(&storage_buffer(2048), "ssao").unwrap();
    assert_eq!(resources.buffers.active_debug_handle(), Some(ssao));
    assert_eq!(resources.buffers.active_debug_name(), Some("ssao"));
    resources.buffers.release(ssao);

    let blur = resources.buffers.create(&storage_buffer(2048), "blur").unwrap();
    assert_ne!(blur.index(), ssao.index());
    assert_eq!(
        resources.buffers.debug_names(),
        &["ssao".to_string(), "blur".to_string()]
    );

    resources.buffers.release(blur);
    resources.buffers.clear_debug();
    assert_eq!(resources.buffers.active_debug_handle(), None);
}
