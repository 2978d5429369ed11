use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use respool_core::{PoolResource, PoolSettings, ResourcePool};

// ---------------------------------------------------------------------------
// Null resource
// ---------------------------------------------------------------------------

struct NullDevice;

#[derive(Debug, Clone, Copy, PartialEq)]
struct NullDesc {
    width: u32,
    height: u32,
}

struct NullResource(u64);

impl PoolResource for NullResource {
    type Description = NullDesc;
    type Native = u64;
    type Device = NullDevice;
    type Error = ();

    fn create(_: &NullDevice, desc: &NullDesc, _: &str) -> Result<Self, ()> {
        Ok(Self(u64::from(desc.width) << 32 | u64::from(desc.height)))
    }

    fn destroy(self, _: &NullDevice) {}

    fn native(&self) -> u64 {
        self.0
    }

    fn set_debug_name(&self, _: &NullDevice, _: &str) {}
}

fn pass_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("pass_{i}")).collect()
}

// ---------------------------------------------------------------------------
// Frame churn
// ---------------------------------------------------------------------------

fn bench_frame_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_churn");

    for passes in [8usize, 64, 256] {
        let names = pass_names(passes);
        group.bench_with_input(BenchmarkId::from_parameter(passes), &passes, |b, &passes| {
            let mut pool = ResourcePool::<NullResource>::new(Arc::new(NullDevice));
            b.iter(|| {
                pool.start_frame();
                for (i, name) in names.iter().enumerate() {
                    let desc = NullDesc {
                        width: 64 << (i % 4),
                        height: 64,
                    };
                    let handle = pool.create(&desc, name).unwrap();
                    black_box(pool.native_handle(handle));
                    pool.release(handle);
                }
                black_box(passes);
            });
        });
    }

    group.finish();
}

fn bench_handle_validation(c: &mut Criterion) {
    let mut pool = ResourcePool::<NullResource>::new(Arc::new(NullDevice));
    let names = pass_names(128);
    pool.start_frame();
    let handles: Vec<_> = names
        .iter()
        .map(|name| {
            pool.create(&NullDesc { width: 1, height: 1 }, name)
                .unwrap()
        })
        .collect();

    c.bench_function("is_valid_handle_128", |b| {
        b.iter(|| {
            handles
                .iter()
                .filter(|&&h| pool.is_valid_handle(black_box(h)))
                .count()
        });
    });

    for handle in handles {
        pool.release(handle);
    }
}

fn bench_hysteresis_teardown(c: &mut Criterion) {
    let names = pass_names(64);
    c.bench_function("teardown_64_slots", |b| {
        b.iter(|| {
            let settings = PoolSettings::new().with_destroy_delay_frames(0);
            let mut pool =
                ResourcePool::<NullResource>::with_settings(Arc::new(NullDevice), settings);
            pool.start_frame();
            for (i, name) in names.iter().enumerate() {
                let desc = NullDesc {
                    width: i as u32,
                    height: 1,
                };
                let handle = pool.create(&desc, name).unwrap();
                pool.release(handle);
            }
            pool.start_frame();
            pool.start_frame();
            black_box(pool.free_slots().len())
        });
    });
}

criterion_group!(
    benches,
    bench_frame_churn,
    bench_handle_validation,
    bench_hysteresis_teardown,
);
criterion_main!(benches);
