//! A bounded, order-preserving multi-stage processing pipeline.
//!
//! Every sample gets its own chain of threads: one per stage, linked by
//! one-shot handles, and a terminal order barrier. Stages of different
//! samples overlap freely and finish out of order; the barrier emits results
//! strictly by sequence index, one fixed cadence apart. An admission window
//! caps how many samples are in flight and blocks the driver when it runs
//! ahead.
//!
//! # Features
//!
//! - Eager per-stage threads chained through crossbeam one-shot channels
//! - Atomic turn counter with acquire/release ordering at the barrier
//! - Bounded admission window for backpressure
//! - Fail-fast fault propagation reporting the sample and stage
//! - Per-stage metrics: completions, faults, latency percentiles, emission spacing
//! - Builder pattern for easy pipeline construction
//!
//! # Example
//!
//! ```ignore
//! use ordered_pipeline::{LogSink, PipelineBuilder};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let pipeline = PipelineBuilder::new()
//!     .add_delay_stage("stageA", Duration::from_millis(900))
//!     .add_delay_stage("stageB", Duration::from_millis(950))
//!     .depth(2)
//!     .cadence(Duration::from_millis(1000))
//!     .build()?;
//!
//! let report = pipeline.run(Arc::new(LogSink))?;
//! println!("{}", report.metrics.summary());
//! ```

pub mod chain;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod pipeline;
pub mod sequencer;
pub mod stage;
pub mod window;

// Re-exports for convenience
pub use chain::ChainBuilder;
pub use error::{PipelineError, Result};
pub use handle::StageHandle;
pub use metrics::{BarrierMetrics, LatencyTracker, MetricsSnapshot, PipelineMetrics, StageMetrics};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineConfig, RunReport, MAX_POLL_INTERVAL};
pub use sequencer::{CollectingSink, Finalized, LogSink, Sequencer, Sink};
pub use stage::{DelayStage, Item, MapStage, Stage};
pub use window::{AdmissionWindow, MAX_PIPELINE_DEPTH};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
