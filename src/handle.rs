//! One-shot result slots connecting one stage to the next.
//!
//! A [`StageHandle`] is the eventual output of one stage applied to one
//! sample. It is produced by exactly one thread and consumed exactly once by
//! [`StageHandle::wait`], which blocks until the value exists and then joins
//! the producing thread.

use crate::error::{PipelineError, Result};
use crossbeam::channel::{self, Receiver};
use std::thread::{self, JoinHandle};

/// Owned, single-use result slot for one stage of one sample
#[derive(Debug)]
pub struct StageHandle<T> {
    index: u64,
    stage: String,
    rx: Receiver<Result<T>>,
    thread: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> StageHandle<T> {
    /// Create a handle whose value is available immediately
    pub fn ready(index: u64, stage: impl Into<String>, value: T) -> Self {
        let (tx, rx) = channel::bounded(1);
        // Capacity 1 and the receiver is alive, so this cannot fail
        let _ = tx.send(Ok(value));
        Self {
            index,
            stage: stage.into(),
            rx,
            thread: None,
        }
    }

    /// Spawn `work` on its own thread right away and return the handle to its output
    pub fn spawn<F>(index: u64, stage: impl Into<String>, work: F) -> Result<Self>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let stage = stage.into();
        let (tx, rx) = channel::bounded(1);

        let thread = thread::Builder::new()
            .name(format!("{}-{}", stage, index))
            .spawn(move || {
                // The consumer may have been dropped on an early exit
                let _ = tx.send(work());
            })
            .map_err(|e| PipelineError::ThreadError(format!("spawn {}: {}", stage, e)))?;

        Ok(Self {
            index,
            stage,
            rx,
            thread: Some(thread),
        })
    }
}

impl<T> StageHandle<T> {
    /// Sequence index of the sample this handle belongs to
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Name of the stage producing this handle's value
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Whether the value (or fault) has already been produced
    pub fn is_ready(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Block until the value exists, then join the producing thread
    pub fn wait(mut self) -> Result<T> {
        let received = self.rx.recv();

        let panicked = match self.thread.take() {
            Some(thread) => thread.join().is_err(),
            None => false,
        };

        match received {
            Ok(result) if !panicked => result,
            _ => Err(PipelineError::UpstreamFault {
                index: self.index,
                stage: self.stage.clone(),
            }),
        }
    }
}
