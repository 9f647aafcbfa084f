//! Structured errors for the pwacache host.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Errors raised by the tool layer itself, before the worker is involved.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Invalid tool arguments (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let code = match &err {
            HostError::InvalidInput(_) => -32602,
            HostError::OutputFailed(_) => -32000,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_codes() {
        let err: McpError = HostError::InvalidInput("url cannot be empty".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert!(err.message.starts_with("INVALID_INPUT"));

        let err: McpError = HostError::OutputFailed("bad".into()).into();
        assert_eq!(err.code, ErrorCode(-32000));
    }
}
