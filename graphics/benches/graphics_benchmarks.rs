use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use respool_graphics::{
    BufferDescriptor, BufferState, BufferUsage, CommandBuffer, DummyDevice, GpuDevice,
    ImageDescriptor, ImageFormat, ImageState, ImageUsage, RenderResources, Transitions,
};

fn dummy_resources() -> RenderResources {
    let device: Arc<dyn GpuDevice> = Arc::new(DummyDevice::new());
    RenderResources::new(device)
}

fn pass_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("pass_{i}")).collect()
}

// ---------------------------------------------------------------------------
// Frame churn
// ---------------------------------------------------------------------------

fn bench_render_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frame");

    for passes in [8usize, 32, 128] {
        let names = pass_names(passes);
        group.bench_with_input(BenchmarkId::from_parameter(passes), &passes, |b, _| {
            let mut resources = dummy_resources();
            b.iter(|| {
                resources.start_frame();
                for (i, name) in names.iter().enumerate() {
                    let image = resources
                        .images
                        .create(
                            &ImageDescriptor::new_2d(
                                1920 >> (i % 3),
                                1080 >> (i % 3),
                                ImageFormat::Rgba16Float,
                                ImageUsage::SAMPLED | ImageUsage::COLOR_ATTACHMENT,
                            ),
                            name,
                        )
                        .unwrap();
                    let buffer = resources
                        .buffers
                        .create(
                            &BufferDescriptor::new(4096, BufferUsage::STORAGE),
                            &format!("{name}_params"),
                        )
                        .unwrap();
                    black_box(resources.images.native_handle(image));
                    resources.images.release(image);
                    resources.buffers.release(buffer);
                }
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Barriers
// ---------------------------------------------------------------------------

fn bench_batched_transitions(c: &mut Criterion) {
    c.bench_function("batched_transitions_32", |b| {
        let dummy = Arc::new(DummyDevice::new());
        let device: Arc<dyn GpuDevice> = dummy.clone();
        let mut resources = RenderResources::new(device);
        resources.start_frame();

        let images: Vec<_> = (0..16)
            .map(|i| {
                resources
                    .images
                    .create(
                        &ImageDescriptor::new_2d(
                            256,
                            256,
                            ImageFormat::Rgba8Unorm,
                            ImageUsage::STORAGE,
                        ),
                        &format!("image_{i}"),
                    )
                    .unwrap()
            })
            .collect();
        let buffers: Vec<_> = (0..16)
            .map(|i| {
                resources
                    .buffers
                    .create(
                        &BufferDescriptor::new(1024, BufferUsage::STORAGE),
                        &format!("buffer_{i}"),
                    )
                    .unwrap()
            })
            .collect();

        let mut writes = Transitions::new();
        for &image in &images {
            writes = writes.image(image, ImageState::COMPUTE_SHADER_WRITE);
        }
        for &buffer in &buffers {
            writes = writes.buffer(buffer, BufferState::COMPUTE_SHADER_WRITE);
        }

        let cmd = CommandBuffer::Dummy(0);
        b.iter(|| {
            resources.transition(cmd, black_box(&writes));
            dummy.clear_recorded_barriers();
        });
    });
}

criterion_group!(benches, bench_render_frame, bench_batched_transitions);
criterion_main!(benches);
