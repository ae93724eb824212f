//! Ordered pipeline demo
//!
//! Pushes 100 samples through two simulated stages and emits them in order,
//! one per second. Set `RUST_LOG=debug` to see per-stage completions.

use ordered_pipeline::{LogSink, PipelineBuilder};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let result = PipelineBuilder::new()
        .add_delay_stage("stageA", Duration::from_millis(900))
        .add_delay_stage("stageB", Duration::from_millis(950))
        .depth(2)
        .item_count(100)
        .cadence(Duration::from_millis(1000))
        .build()
        .and_then(|pipeline| pipeline.run(Arc::new(LogSink)));

    match result {
        Ok(report) => {
            tracing::debug!("{}", report.metrics.summary());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(
                sample = e.index(),
                stage = e.stage(),
                "pipeline failed: {}",
                e
            );
            ExitCode::FAILURE
        }
    }
}
