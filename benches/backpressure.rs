use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ordered_pipeline::{AdmissionWindow, CollectingSink, Finalized, PipelineBuilder, StageHandle};
use std::sync::Arc;
use std::time::Duration;

fn benchmark_window_depths(c: &mut Criterion) {
    let mut group = c.benchmark_group("slow_stage_100_samples");
    for depth in [0usize, 2, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let pipeline = PipelineBuilder::new()
                    .add_delay_stage("slow", Duration::from_micros(200))
                    .depth(depth)
                    .item_count(100)
                    .cadence(Duration::from_micros(250))
                    .poll_interval(Duration::from_micros(5))
                    .build()
                    .expect("Build failed");

                let sink = CollectingSink::new();
                let report = pipeline.run(Arc::new(sink.clone())).expect("Run failed");
                black_box(report.high_water);
            });
        });
    }
    group.finish();
}

fn benchmark_admit_retire(c: &mut Criterion) {
    c.bench_function("admit_retire_1000_ready_handles", |b| {
        b.iter(|| {
            let mut window = AdmissionWindow::new(4);
            for i in 0..1000u64 {
                let handle = StageHandle::ready(
                    i,
                    "sequencer",
                    Finalized {
                        index: i,
                        payload: String::new(),
                        elapsed: Duration::ZERO,
                    },
                );
                let _ = window.admit(black_box(handle));
            }
            black_box(window.drain().expect("Drain failed").len());
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10).measurement_time(Duration::from_secs(10));
    targets = benchmark_window_depths, benchmark_admit_retire
);
criterion_main!(benches);
