/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by runs, positions and configuration loading.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An operation was attempted against a state it does not apply to,
    /// e.g. closing without an open position or advancing a finished run.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// Prices must be positive and finite.
    #[error("Price must be positive and finite (got: {0})")]
    InvalidPrice(f64),

    /// Invested amounts and stop-loss reserves must be non-negative and finite.
    #[error("Amount must be non-negative and finite (got: {0})")]
    InvalidAmount(f64),

    /// A quote is older than the one before it.
    #[error("Quote at {current} is older than the previous quote at {previous}")]
    QuoteOutOfOrder {
        /// Timestamp of the last accepted quote.
        previous: chrono::DateTime<chrono::Utc>,
        /// Timestamp of the rejected quote.
        current: chrono::DateTime<chrono::Utc>,
    },

    /// The run configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The strategy callback failed. The error is passed through untouched.
    #[error("Strategy error: {0}")]
    Strategy(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// The report sink could not take the terminal report.
    #[error("Report sink error: {0}")]
    Sink(String),

    /// I/O error occurred.
    // utils.rs
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// Wraps any error raised by strategy code.
    pub fn strategy<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Strategy(err.into())
    }
}
