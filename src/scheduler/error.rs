use chrono::Weekday;
use thiserror::Error;

/// Why a scheduler run did not happen or did not finish.
///
/// Notification problems are deliberately absent: they are reported inside the
/// job reports and never fail a run.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No directive and the trigger fired on a day with no job.
    #[error("Cannot infer action: {weekday} is not Sunday or Monday. Pass {{ action }} explicitly.")]
    CannotInferAction { weekday: Weekday },

    /// A directory read failed before anything was written.
    #[error("Failed to {operation}: {source:#}")]
    UpstreamRead {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The act store rejected the write.
    #[error("Failed to {operation}: {source:#}")]
    UpstreamWrite {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl SchedulerError {
    pub fn read(operation: &'static str, source: anyhow::Error) -> Self {
        SchedulerError::UpstreamRead { operation, source }
    }

    pub fn write(operation: &'static str, source: anyhow::Error) -> Self {
        SchedulerError::UpstreamWrite { operation, source }
    }

    /// True when the caller asked for something that cannot run, as opposed to
    /// an upstream failure.
    pub fn is_input_error(&self) -> bool {
        matches!(self, SchedulerError::CannotInferAction { .. })
    }
}
