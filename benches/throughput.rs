use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ordered_pipeline::{CollectingSink, MapStage, PipelineBuilder};
use std::sync::Arc;
use std::time::Duration;

fn benchmark_single_stage_ordered(c: &mut Criterion) {
    c.bench_function("single_stage_200_samples", |b| {
        b.iter(|| {
            let pipeline = PipelineBuilder::new()
                .add_stage(Arc::new(MapStage::new("passthrough", |p: &str| {
                    Ok(p.to_string())
                })))
                .depth(8)
                .item_count(200)
                .cadence(Duration::from_micros(100))
                .poll_interval(Duration::from_micros(5))
                .build()
                .expect("Build failed");

            let sink = CollectingSink::new();
            let report = pipeline.run(Arc::new(sink.clone())).expect("Run failed");
            black_box(report.finalized);
        });
    });
}

fn benchmark_three_stage_ordered(c: &mut Criterion) {
    c.bench_function("three_stage_200_samples", |b| {
        b.iter(|| {
            let pipeline = PipelineBuilder::new()
                .add_delay_stage("stage1", Duration::from_micros(20))
                .add_delay_stage("stage2", Duration::from_micros(20))
                .add_delay_stage("stage3", Duration::from_micros(20))
                .depth(8)
                .item_count(200)
                .cadence(Duration::from_micros(100))
                .poll_interval(Duration::from_micros(5))
                .build()
                .expect("Build failed");

            let sink = CollectingSink::new();
            let report = pipeline.run(Arc::new(sink.clone())).expect("Run failed");
            black_box(report.finalized);
        });
    });
}

fn benchmark_chain_launch(c: &mut Criterion) {
    c.bench_function("chain_launch_50_samples_8_stages", |b| {
        b.iter(|| {
            let mut builder = PipelineBuilder::new()
                .depth(4)
                .item_count(50)
                .cadence(Duration::from_micros(50))
                .poll_interval(Duration::from_micros(5));
            for i in 0..8 {
                builder = builder.add_delay_stage(format!("stage{}", i), Duration::ZERO);
            }
            let pipeline = builder.build().expect("Build failed");

            let sink = CollectingSink::new();
            let report = pipeline.run(Arc::new(sink.clone())).expect("Run failed");
            black_box(report.finalized);
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10).measurement_time(Duration::from_secs(10));
    targets = benchmark_single_stage_ordered, benchmark_three_stage_ordered, benchmark_chain_launch
);
criterion_main!(benches);
