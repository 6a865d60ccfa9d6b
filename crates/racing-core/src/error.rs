/// Error kinds propagated through the request pipeline.
///
/// `NotFound` and `DecodeError` never retry; `TransientIo` retries up to the
/// consumer's configured budget before dead-lettering; `Cancelled` leaves the
/// request `InProgress` for a later replay.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to decode message: {0}")]
    DecodeError(String),

    #[error("transient io error: {0}")]
    TransientIo(String),

    #[error("cancelled")]
    Cancelled,

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    /// Whether a message consumer should requeue after this error, subject
    /// to the configured retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransientIo(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
