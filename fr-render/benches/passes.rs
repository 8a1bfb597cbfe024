use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fr_core::{settings::RenderSettings, Size};
use fr_render::{PassOutcome, ProgressiveRenderer};
use image::Rgb;

criterion_main!(benches);
criterion_group!(benches, bench_full_refinement);

const SIZE: Size = Size {
    width: 256,
    height: 192,
};

fn refine(settings: &RenderSettings) -> usize {
    let (mut renderer, _events) = ProgressiveRenderer::new();
    renderer
        .initialize(SIZE, vec![Rgb([0, 0, 0]), Rgb([255, 255, 255])])
        .unwrap();
    renderer.configure(settings.clone()).unwrap();
    let mut passes = 0;
    while let PassOutcome::Finished(_) = renderer.render_frame().unwrap() {
        passes += 1;
    }
    passes
}

/// Refine the base view down to single pixels, across backends and threads.
pub fn bench_full_refinement(c: &mut Criterion) {
    let mut group = c.benchmark_group("refinement-base");
    // Count pixels:
    group.throughput(criterion::Throughput::Elements(SIZE.area() as u64));
    // Don't spend too long preparing:
    group.warm_up_time(Duration::from_secs(1));
    group.sample_size(10);

    // Count up powers of two:
    let thread_range = (0..).map(|x| 1 << x).take_while({
        let x = num_cpus::get().next_power_of_two();
        move |y| (*y <= x)
    });
    for threads in thread_range {
        for numeric in fr_core::engine::formats() {
            // Exact iterates grow with every step; keep them short.
            let max_iterations = if numeric == "exact" { 4 } else { 64 };
            let settings = RenderSettings {
                numeric: numeric.to_string(),
                max_iterations,
                threads,
                gradual: false,
                ..Default::default()
            };
            group.bench_with_input(
                BenchmarkId::new(numeric, threads),
                &settings,
                |b, input| b.iter(|| refine(black_box(input))),
            );
        }
    }

    group.finish();
}
