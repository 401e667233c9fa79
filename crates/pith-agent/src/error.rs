//! Error types for pith-agent

use thiserror::Error;

/// Result type alias using pith-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a turn
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the provider layer (network, auth, rate limit, malformed response)
    #[error(transparent)]
    Ai(#[from] pith_ai::Error),

    /// The working conversation broke request/response adjacency
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The model kept requesting tools past the iteration budget
    #[error("could not complete after {0} tool iterations")]
    IterationsExhausted(u32),

    /// The turn was interrupted by the user
    #[error("turn cancelled")]
    Cancelled,
}

impl Error {
    /// Failures that originate at the model gateway
    pub fn is_gateway(&self) -> bool {
        matches!(self, Error::Ai(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_names_budget() {
        assert_eq!(
            Error::IterationsExhausted(3).to_string(),
            "could not complete after 3 tool iterations"
        );
    }

    #[test]
    fn test_ai_errors_are_transparent() {
        let err: Error = pith_ai::Error::Auth("bad key".into()).into();
        assert!(err.is_gateway());
        assert_eq!(err.to_string(), pith_ai::Error::Auth("bad key".into()).to_string());
        assert!(!Error::Cancelled.is_gateway());
    }
}
