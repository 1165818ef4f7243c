use thiserror::Error;

/// Control-plane failures surfaced to dispatcher callers.
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("failed to read dispatch status: {0}")]
    StatusRead(#[source] anyhow::Error),
    #[error("failed to persist dispatch status: {0}")]
    StatusWrite(#[source] anyhow::Error),
    #[error("storage failure: {0}")]
    Storage(#[source] anyhow::Error),
    #[error("invalid action '{0}', must be 'start' or 'stop'")]
    InvalidAction(String),
}

impl DispatcherError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, DispatcherError::InvalidAction(_))
    }
}
