use crate::chain::ChainBuilder;
use crate::error::{PipelineError, Result};
use crate::metrics::PipelineMetrics;
use crate::sequencer::{Sequencer, Sink};
use crate::stage::{DelayStage, Item, Stage};
use crate::window::{AdmissionWindow, MAX_PIPELINE_DEPTH};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Polls must stay sub-millisecond so turn hand-over adds no visible delay
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Tunables for a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// In-flight samples besides the one being retired
    pub pipeline_depth: usize,
    /// Samples generated by [`Pipeline::run`]
    pub item_count: u64,
    /// Fixed hold after each emission
    pub cadence: Duration,
    /// Sleep between polls of the turn counter
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pipeline_depth: 2,
            item_count: 100,
            cadence: Duration::from_millis(1000),
            poll_interval: Duration::from_micros(50),
        }
    }
}

/// Builder for constructing pipelines
pub struct PipelineBuilder {
    config: PipelineConfig,
    stages: Vec<Arc<dyn Stage>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with default tunables and no stages
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            stages: Vec::new(),
        }
    }

    /// Start from an existing configuration
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn depth(mut self, pipeline_depth: usize) -> Self {
        self.config.pipeline_depth = pipeline_depth;
        self
    }

    pub fn item_count(mut self, item_count: u64) -> Self {
        self.config.item_count = item_count;
        self
    }

    pub fn cadence(mut self, cadence: Duration) -> Self {
        self.config.cadence = cadence;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.config.poll_interval = poll_interval;
        self
    }

    /// Add a stage to the end of the chain
    pub fn add_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Add a [`DelayStage`] simulating `delay` of compute
    pub fn add_delay_stage(self, name: impl Into<String>, delay: Duration) -> Self {
        self.add_stage(Arc::new(DelayStage::new(name, delay)))
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        if self.stages.is_empty() {
            return Err(PipelineError::NoStages);
        }

        let config = self.config;
        if config.pipeline_depth > MAX_PIPELINE_DEPTH {
            return Err(PipelineError::ConfigError(format!(
                "pipeline depth {} exceeds maximum {}",
                config.pipeline_depth, MAX_PIPELINE_DEPTH
            )));
        }
        if config.cadence.is_zero() {
            return Err(PipelineError::ConfigError("cadence must be non-zero".into()));
        }
        if config.poll_interval.is_zero() {
            return Err(PipelineError::ConfigError(
                "poll interval must be non-zero".into(),
            ));
        }
        if config.poll_interval >= MAX_POLL_INTERVAL {
            return Err(PipelineError::ConfigError(format!(
                "poll interval {:?} must be below {:?}",
                config.poll_interval, MAX_POLL_INTERVAL
            )));
        }
        if config.poll_interval >= config.cadence {
            return Err(PipelineError::ConfigError(format!(
                "poll interval {:?} must be shorter than cadence {:?}",
                config.poll_interval, config.cadence
            )));
        }

        let known_cost: Duration = self.stages.iter().filter_map(|s| s.expected_cost()).sum();
        if known_cost > config.cadence {
            warn!(
                stage_cost_ms = known_cost.as_millis() as u64,
                cadence_ms = config.cadence.as_millis() as u64,
                "stage cost exceeds cadence; emissions will not be evenly spaced"
            );
        }

        Ok(Pipeline {
            config,
            stages: self.stages,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Samples admitted into the window
    pub enqueued: u64,
    /// Samples emitted by the order barrier
    pub finalized: u64,
    /// Most handles ever held by the admission window
    pub high_water: usize,
    /// Wall time of the whole run
    pub elapsed: Duration,
    pub metrics: PipelineMetrics,
}

/// A validated, fixed-topology pipeline.
///
/// Runs are independent: each one gets a fresh turn counter, start time and
/// metrics.
pub struct Pipeline {
    config: PipelineConfig,
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Names of the configured stages, in chain order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run `item_count` generated samples (`"Input String {i}"`) into `sink`
    pub fn run(&self, sink: Arc<dyn Sink>) -> Result<RunReport> {
        let inputs = (0..self.config.item_count).map(|i| format!("Input String {}", i));
        self.run_with(inputs, sink)
    }

    /// Run caller-supplied payloads into `sink`, indexed in iteration order.
    ///
    /// On the first fault the run halts: no further samples are admitted,
    /// samples still waiting for their turn are abandoned, and the fault is
    /// returned. Everything emitted before it stays emitted.
    pub fn run_with<I>(&self, inputs: I, sink: Arc<dyn Sink>) -> Result<RunReport>
    where
        I: IntoIterator<Item = String>,
    {
        let started = Instant::now();
        let sequencer = Arc::new(Sequencer::new(
            self.config.cadence,
            self.config.poll_interval,
        ));
        let metrics = PipelineMetrics::new(self.stages.iter().map(|s| s.name()));
        let chain = ChainBuilder::new(
            self.stages.clone(),
            Arc::clone(&sequencer),
            sink,
            metrics.clone(),
        );
        let mut window = AdmissionWindow::new(self.config.pipeline_depth);

        let outcome = feed(inputs, &chain, &mut window).and_then(|enqueued| {
            info!("Waiting to finish...");
            window.drain()?;
            Ok(enqueued)
        });

        let enqueued = match outcome {
            Ok(enqueued) => enqueued,
            Err(fault) => {
                sequencer.halt();
                error!(
                    sample = fault.index(),
                    stage = fault.stage(),
                    error = %fault,
                    "pipeline halted"
                );
                // Barriers see the halt and return promptly; join them all
                while !window.is_empty() {
                    let _ = window.retire_oldest();
                }
                return Err(fault);
            }
        };

        info!("Finished!");
        Ok(RunReport {
            enqueued,
            finalized: metrics.barrier.total_emitted(),
            high_water: window.high_water(),
            elapsed: started.elapsed(),
            metrics,
        })
    }
}

/// Admit every input, blocking on the oldest sample whenever the window is full
fn feed<I>(inputs: I, chain: &ChainBuilder, window: &mut AdmissionWindow) -> Result<u64>
where
    I: IntoIterator<Item = String>,
{
    let mut enqueued = 0;
    for (index, payload) in (0u64..).zip(inputs) {
        // The new chain is already running while the oldest one is retired
        window.admit(chain.build(Item::new(index, payload))?)?;
        info!("Enqueued sample: {}", index);
        enqueued += 1;
    }
    Ok(enqueued)
}
