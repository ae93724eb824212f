use thiserror::Error;

/// Result type for ordered pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur during pipeline execution
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage's own work failed
    #[error("Stage '{stage}' failed on sample {index}: {message}")]
    StageFault {
        index: u64,
        stage: String,
        message: String,
    },

    /// Failure raised by a stage implementation, before it is tied to a sample
    #[error("{0}")]
    WorkFailed(String),

    /// A stage thread went away without producing a value
    #[error("Stage '{stage}' vanished without a result for sample {index}")]
    UpstreamFault { index: u64, stage: String },

    /// A propagated fault observed while retiring or draining a handle
    #[error("Sample {index} failed while retiring: {source}")]
    DrainFault {
        index: u64,
        #[source]
        source: Box<PipelineError>,
    },

    /// The order barrier gave up its turn after the pipeline was halted
    #[error("Sample {index} abandoned: pipeline halted")]
    Halted { index: u64 },

    /// No stages in pipeline
    #[error("Cannot start pipeline with no stages")]
    NoStages,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Thread spawn or join error
    #[error("Thread error: {0}")]
    ThreadError(String),
}

impl PipelineError {
    /// Sequence index of the sample this error belongs to, if any
    pub fn index(&self) -> Option<u64> {
        match self {
            Self::StageFault { index, .. }
            | Self::UpstreamFault { index, .. }
            | Self::DrainFault { index, .. }
            | Self::Halted { index } => Some(*index),
            _ => None,
        }
    }

    /// Name of the stage where the fault originated, if any
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::StageFault { stage, .. } | Self::UpstreamFault { stage, .. } => Some(stage),
            Self::DrainFault { source, .. } => source.stage(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_fault_reports_origin() {
        let err = PipelineError::DrainFault {
            index: 7,
            source: Box::new(PipelineError::StageFault {
                index: 7,
                stage: "stageB".into(),
                message: "boom".into(),
            }),
        };
        assert_eq!(err.index(), Some(7));
        assert_eq!(err.stage(), Some("stageB"));
        assert!(err.to_string().contains("stageB"));
    }

    #[test]
    fn test_config_error_has_no_origin() {
        let err = PipelineError::ConfigError("cadence is zero".into());
        assert_eq!(err.index(), None);
        assert_eq!(err.stage(), None);
    }
}
