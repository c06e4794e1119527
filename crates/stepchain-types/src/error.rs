use thiserror::Error;

/// Errors from one remote workflow invocation.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The workflow API answered with a non-success HTTP status.
    #[error("workflow API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request or the streaming body failed at the transport level.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote workflow reported an error in its event stream. The
    /// message is surfaced verbatim.
    #[error("{0}")]
    Upstream(String),
}

/// Errors from chain orchestration operations.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain not found: '{0}'")]
    NotFound(String),

    #[error("chain '{0}' already exists")]
    Duplicate(String),

    #[error("chain '{0}' has no steps remaining")]
    NoMoreSteps(String),

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_error_display() {
        let err = InvokeError::Status {
            status: 503,
            body: "service unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "workflow API returned HTTP 503: service unavailable"
        );

        let err = InvokeError::Upstream("boom".to_string());
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_chain_error_display() {
        let err = ChainError::Duplicate("research".to_string());
        assert_eq!(err.to_string(), "chain 'research' already exists");

        let err = ChainError::NoMoreSteps("research".to_string());
        assert!(err.to_string().contains("no steps remaining"));
    }

    #[test]
    fn test_chain_error_from_invoke() {
        let err: ChainError = InvokeError::Transport("connection reset".to_string()).into();
        assert!(matches!(err, ChainError::Invoke(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
