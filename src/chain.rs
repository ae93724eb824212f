use crate::error::Result;
use crate::handle::StageHandle;
use crate::metrics::PipelineMetrics;
use crate::sequencer::{launch_barrier, Finalized, Sequencer, Sink};
use crate::stage::{launch_stage, Item, Stage};
use std::sync::Arc;

/// Name of the immediately-ready handle at the head of every chain
pub const INPUT_STAGE: &str = "input";

/// Builds the per-sample chain: input, each configured stage, then the barrier.
///
/// Every launch is non-blocking; `build` only wires each stage to its
/// predecessor's handle and returns once all threads have been spawned.
pub struct ChainBuilder {
    stages: Vec<Arc<dyn Stage>>,
    sequencer: Arc<Sequencer>,
    sink: Arc<dyn Sink>,
    metrics: PipelineMetrics,
}

impl ChainBuilder {
    /// `metrics.stages` must line up with `stages`
    pub fn new(
        stages: Vec<Arc<dyn Stage>>,
        sequencer: Arc<Sequencer>,
        sink: Arc<dyn Sink>,
        metrics: PipelineMetrics,
    ) -> Self {
        debug_assert_eq!(stages.len(), metrics.stages.len());
        Self {
            stages,
            sequencer,
            sink,
            metrics,
        }
    }

    /// Number of stages before the barrier
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Launch the whole chain for one sample and return its barrier handle
    pub fn build(&self, item: Item) -> Result<StageHandle<Finalized>> {
        let mut handle = StageHandle::ready(item.index, INPUT_STAGE, item);

        for (stage, metrics) in self.stages.iter().zip(&self.metrics.stages) {
            handle = launch_stage(Arc::clone(stage), handle, metrics.clone())?;
        }

        launch_barrier(
            handle,
            Arc::clone(&self.sequencer),
            Arc::clone(&self.sink),
            self.metrics.barrier.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::CollectingSink;
    use crate::stage::DelayStage;
    use std::time::{Duration, Instant};

    fn chain(sink: &CollectingSink) -> ChainBuilder {
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(DelayStage::new("stageA", Duration::from_millis(30))),
            Arc::new(DelayStage::new("stageB", Duration::from_millis(30))),
        ];
        let metrics = PipelineMetrics::new(stages.iter().map(|s| s.name()));
        let sequencer = Arc::new(Sequencer::new(
            Duration::from_millis(1),
            Duration::from_micros(50),
        ));
        ChainBuilder::new(stages, sequencer, Arc::new(sink.clone()), metrics)
    }

    #[test]
    fn test_build_does_not_wait_for_stages() {
        let sink = CollectingSink::new();
        let chain = chain(&sink);
        assert_eq!(chain.len(), 2);

        let started = Instant::now();
        let handle = chain.build(Item::new(0, "P")).unwrap();
        assert!(started.elapsed() < Duration::from_millis(30));

        let finalized = handle.wait().unwrap();
        assert_eq!(finalized.payload, "P stageA stageB");
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_same_shape_for_every_sample() {
        let sink = CollectingSink::new();
        let chain = chain(&sink);

        let handles: Vec<_> = (0..3)
            .map(|i| chain.build(Item::new(i, format!("P{}", i))).unwrap())
            .collect();
        for handle in handles {
            handle.wait().unwrap();
        }

        let payloads: Vec<String> = sink.events().into_iter().map(|f| f.payload).collect();
        assert_eq!(
            payloads,
            vec!["P0 stageA stageB", "P1 stageA stageB", "P2 stageA stageB"]
        );
    }
}
