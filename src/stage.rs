use crate::error::{PipelineError, Result};
use crate::handle::StageHandle;
use crate::metrics::StageMetrics;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One sample flowing through the pipeline.
///
/// `index` is assigned once by the driver and is the only ordering key;
/// stages rewrite `payload` but never touch `index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub index: u64,
    pub payload: String,
}

impl Item {
    pub fn new(index: u64, payload: impl Into<String>) -> Self {
        Self {
            index,
            payload: payload.into(),
        }
    }
}

/// Trait for a processing stage in the pipeline.
///
/// One instance is shared by every sample's chain, so implementations must
/// be `Sync` and keep per-call state on the stack.
pub trait Stage: Send + Sync + 'static {
    /// Transform the payload of one sample
    fn process(&self, payload: &str) -> Result<String>;

    /// Get a human-readable name for this stage
    fn name(&self) -> &str {
        "stage"
    }

    /// Upper bound on how long `process` takes, when known
    fn expected_cost(&self) -> Option<Duration> {
        None
    }
}

/// Simulated compute: sleeps for a fixed time, then appends its name
#[derive(Debug, Clone)]
pub struct DelayStage {
    name: String,
    delay: Duration,
}

impl DelayStage {
    pub fn new(name: impl Into<String>, delay: Duration) -> Self {
        Self {
            name: name.into(),
            delay,
        }
    }
}

impl Stage for DelayStage {
    fn process(&self, payload: &str) -> Result<String> {
        thread::sleep(self.delay);
        Ok(format!("{} {}", payload, self.name))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn expected_cost(&self) -> Option<Duration> {
        Some(self.delay)
    }
}

/// A stage backed by a closure
pub struct MapStage<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync + 'static,
{
    name: String,
    mapper: F,
}

impl<F> MapStage<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync + 'static,
{
    /// Create a new map stage
    pub fn new(name: impl Into<String>, mapper: F) -> Self {
        Self {
            name: name.into(),
            mapper,
        }
    }
}

impl<F> Stage for MapStage<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync + 'static,
{
    fn process(&self, payload: &str) -> Result<String> {
        (self.mapper)(payload)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Launch `stage` for one sample, bound to the handle of the previous stage.
///
/// The thread starts immediately and blocks on `upstream`; this call never
/// waits for the upstream value. An upstream fault is passed on unchanged.
pub fn launch_stage(
    stage: Arc<dyn Stage>,
    upstream: StageHandle<Item>,
    metrics: StageMetrics,
) -> Result<StageHandle<Item>> {
    let index = upstream.index();
    let name = stage.name().to_string();

    StageHandle::spawn(index, name.clone(), move || {
        let item = upstream.wait()?;

        let started = Instant::now();
        match stage.process(&item.payload) {
            Ok(payload) => {
                metrics.record_completed(started.elapsed());
                debug!(sample = item.index, stage = %name, "stage completed");
                Ok(Item {
                    index: item.index,
                    payload,
                })
            }
            Err(e) => {
                metrics.record_fault();
                warn!(sample = item.index, stage = %name, error = %e, "stage failed");
                Err(match e {
                    fault @ PipelineError::StageFault { .. } => fault,
                    other => PipelineError::StageFault {
                        index: item.index,
                        stage: name,
                        message: other.to_string(),
                    },
                })
            }
        }
    })
}
