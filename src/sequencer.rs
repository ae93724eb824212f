//! The order barrier at the end of every chain.
//!
//! Each sample's barrier thread waits for its upstream value, then polls the
//! shared [`Sequencer`] counter until it is that sample's turn, emits the
//! result, holds for the configured cadence and hands the turn on. Stages
//! may finish in any order; emissions happen strictly by sequence index and
//! roughly one cadence apart.

use crate::error::{PipelineError, Result};
use crate::handle::StageHandle;
use crate::metrics::BarrierMetrics;
use crate::stage::Item;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Name the barrier stage reports in handles and faults
pub const BARRIER_STAGE: &str = "sequencer";

/// Shared turn counter and timing context for all barrier instances.
///
/// `current` is written only by the barrier holding the turn. `start`,
/// `cadence` and `poll_interval` are read-only after construction.
#[derive(Debug)]
pub struct Sequencer {
    current: AtomicU64,
    halted: AtomicBool,
    start: Instant,
    cadence: Duration,
    poll_interval: Duration,
}

impl Sequencer {
    pub fn new(cadence: Duration, poll_interval: Duration) -> Self {
        Self {
            current: AtomicU64::new(0),
            halted: AtomicBool::new(false),
            start: Instant::now(),
            cadence,
            poll_interval,
        }
    }

    /// Index of the next sample allowed to finalize
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Time since the pipeline started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Sleep-poll until it is `index`'s turn.
    ///
    /// Returns `Halted` instead if the pipeline is halted first.
    pub fn wait_turn(&self, index: u64) -> Result<()> {
        while self.current.load(Ordering::Acquire) != index {
            if self.halted.load(Ordering::Acquire) {
                return Err(PipelineError::Halted { index });
            }
            thread::sleep(self.poll_interval);
        }
        Ok(())
    }

    /// Hand the turn to the next index
    pub fn advance(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }

    /// Stop all waiting barriers; samples not yet at their turn are abandoned
    pub fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }
}

/// A sample that made it through the barrier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    pub index: u64,
    pub payload: String,
    /// Emission time relative to pipeline start
    pub elapsed: Duration,
}

/// Receiver of finalized samples, called in strict index order
pub trait Sink: Send + Sync + 'static {
    fn emit(&self, finalized: &Finalized);
}

/// Sink that logs each finalized sample
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl Sink for LogSink {
    fn emit(&self, finalized: &Finalized) {
        info!(
            "Sample {} output: '{}' finished at {}",
            finalized.index,
            finalized.payload,
            finalized.elapsed.as_millis()
        );
    }
}

/// Sink that keeps every finalized sample in memory
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<Finalized>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything emitted so far, in emission order
    pub fn events(&self) -> Vec<Finalized> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Sink for CollectingSink {
    fn emit(&self, finalized: &Finalized) {
        self.events.lock().push(finalized.clone());
    }
}

/// Launch the order barrier for one sample.
///
/// A faulted upstream still waits for its turn, so every earlier sample gets
/// emitted, then halts the sequencer instead of advancing it. Later samples
/// are abandoned rather than emitted out of a gapped sequence.
pub fn launch_barrier(
    upstream: StageHandle<Item>,
    sequencer: Arc<Sequencer>,
    sink: Arc<dyn Sink>,
    metrics: BarrierMetrics,
) -> Result<StageHandle<Finalized>> {
    let index = upstream.index();

    StageHandle::spawn(index, BARRIER_STAGE, move || {
        let upstream = upstream.wait();

        let waiting = Instant::now();
        sequencer.wait_turn(index)?;
        let waited = waiting.elapsed();

        let item = match upstream {
            Ok(item) => item,
            Err(fault) => {
                warn!(sample = index, error = %fault, "faulted sample reached its turn");
                sequencer.halt();
                return Err(fault);
            }
        };

        let finalized = Finalized {
            index: item.index,
            payload: item.payload,
            elapsed: sequencer.elapsed(),
        };
        sink.emit(&finalized);
        metrics.record_emit(Instant::now(), waited);

        thread::sleep(sequencer.cadence());
        sequencer.advance();

        Ok(finalized)
    })
}
