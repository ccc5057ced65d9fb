use thiserror::Error;

/// Errors raised by the HAL directory client. Callers treat these as soft
/// failures scoped to one affiliation unit, never as batch-fatal.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Non-retryable HTTP status from the directory service.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Response body could not be parsed into the expected shape.
    #[error("malformed directory response: {0}")]
    Malformed(String),

    /// Transport-level failure (connect, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Bounded retries were exhausted without a usable response.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}
