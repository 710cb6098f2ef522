/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// I/O failure raised by a non-`reqwest` transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A wait between attempts was cancelled; no further attempts were made.
    #[error("retry wait interrupted")]
    Interrupted,
    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl RetryError {
    /// Returns `true` when the error comes from a cancelled retry wait.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}
