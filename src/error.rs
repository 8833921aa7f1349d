//! Error type carried by deferred mean results

use tokio::task::JoinError;

pub type Result<T> = std::result::Result<T, AggregatorError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatorError {
    /// The worker pool dropped the task before it ran (runtime shut down)
    WorkerCancelled,
    /// The aggregation panicked on the worker
    WorkerPanicked(String),
    /// A blocking wait was attempted where the runtime cannot block
    WaitInsideRuntime,
}

impl From<JoinError> for AggregatorError {
    fn from(err: JoinError) -> Self {
        if err.is_panic() {
            let payload = err.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            AggregatorError::WorkerPanicked(message)
        } else {
            AggregatorError::WorkerCancelled
        }
    }
}

impl std::fmt::Display for AggregatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregatorError::WorkerCancelled => {
                write!(f, "Mean computation was cancelled by the worker pool")
            }
            AggregatorError::WorkerPanicked(msg) => {
                write!(f, "Mean computation panicked: {}", msg)
            }
            AggregatorError::WaitInsideRuntime => {
                write!(f, "Cannot block on a mean inside a current-thread runtime; await it instead")
            }
        }
    }
}

impl std::error::Error for AggregatorError {}
