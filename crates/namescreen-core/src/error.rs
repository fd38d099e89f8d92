//! Error types for namescreen

/// Result type alias using namescreen's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for namescreen operations
///
/// None of these reach callers of the detection entry point: every tier
/// degrades to a lower-confidence path instead of failing the request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An NER or LLM capability cannot be reached
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A provider answered but the answer was unusable
    #[error("provider error: {0}")]
    Provider(String),

    /// Fallback call exceeded its budget
    #[error("operation timed out")]
    Timeout,

    /// Concurrency bound exceeded under the reject policy
    #[error("admission rejected: fallback concurrency limit reached")]
    AdmissionRejected,

    /// Sanctions data not loaded or unreadable
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Empty or non-text comment
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new provider-unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable(msg.into())
    }

    /// Create a new provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a new data-unavailable error
    pub fn data(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }

    /// Create a new malformed-input error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
