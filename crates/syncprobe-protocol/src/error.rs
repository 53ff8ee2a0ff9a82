//! Error types for syncprobe protocol operations

use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while encoding messages or building the corpus
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A message could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A pool was configured with zero entries
    #[error("Pool '{pool}' must contain at least one entry")]
    EmptyPool { pool: &'static str },

    /// A corpus builder thread panicked
    #[error("Corpus builder for '{pool}' panicked")]
    BuilderPanicked { pool: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::EmptyPool { pool: "rooms" };
        assert!(err.to_string().contains("rooms"));

        let err = ProtocolError::BuilderPanicked { pool: "hello" };
        assert_eq!(err.to_string(), "Corpus builder for 'hello' panicked");
    }
}
