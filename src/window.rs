use crate::error::{PipelineError, Result};
use crate::handle::StageHandle;
use crate::sequencer::Finalized;
use std::collections::VecDeque;
use tracing::debug;

/// Largest depth a pipeline accepts; every in-flight sample owns one thread per stage
pub const MAX_PIPELINE_DEPTH: usize = 1024;

/// Bounded, oldest-first window of in-flight samples.
///
/// Holds the barrier handle of every sample that has been admitted but not
/// yet retired. Once `depth + 1` samples are in flight, admitting another
/// one first blocks on the oldest until its barrier has fully finished,
/// which keeps the driver from running ahead of the emission cadence.
#[derive(Debug)]
pub struct AdmissionWindow {
    depth: usize,
    handles: VecDeque<StageHandle<Finalized>>,
    high_water: usize,
    retired: u64,
}

impl AdmissionWindow {
    /// Create a window allowing `depth + 1` samples in flight
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            handles: VecDeque::with_capacity(depth.min(MAX_PIPELINE_DEPTH) + 1),
            high_water: 0,
            retired: 0,
        }
    }

    /// Maximum number of in-flight samples
    pub fn capacity(&self) -> usize {
        self.depth.saturating_add(1)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Largest number of samples ever held at once
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Number of samples waited on and removed so far
    pub fn retired(&self) -> u64 {
        self.retired
    }

    /// Make room for one more sample, retiring the oldest if the window is full
    pub fn reserve(&mut self) -> Result<Option<Finalized>> {
        if self.handles.len() < self.capacity() {
            return Ok(None);
        }
        self.retire_oldest()
    }

    /// Append a barrier handle, retiring the oldest first if needed.
    ///
    /// The handle is kept even when retiring the oldest fails, so the caller
    /// can still join it after reacting to the fault.
    pub fn admit(&mut self, handle: StageHandle<Finalized>) -> Result<Option<Finalized>> {
        let retired = self.reserve();
        // reserve already popped the oldest, so this stays within capacity
        self.handles.push_back(handle);
        self.high_water = self.high_water.max(self.handles.len());
        retired
    }

    /// Wait on and remove the oldest handle
    pub fn retire_oldest(&mut self) -> Result<Option<Finalized>> {
        let Some(handle) = self.handles.pop_front() else {
            return Ok(None);
        };
        let index = handle.index();
        self.retired += 1;

        match handle.wait() {
            Ok(finalized) => {
                debug!(sample = index, in_flight = self.handles.len(), "retired sample");
                Ok(Some(finalized))
            }
            Err(fault) => Err(PipelineError::DrainFault {
                index,
                source: Box::new(fault),
            }),
        }
    }

    /// Wait on and remove every remaining handle, oldest first.
    ///
    /// Stops at the first fault; the handles behind it stay in the window.
    pub fn drain(&mut self) -> Result<Vec<Finalized>> {
        let mut finished = Vec::with_capacity(self.handles.len());
        while let Some(finalized) = self.retire_oldest()? {
            finished.push(finalized);
        }
        Ok(finished)
    }
}
