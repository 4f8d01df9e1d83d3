//! Structured errors raised by the tool layer itself.
//!
//! Domain failures come from `edstats_core::Error`; these cover parameter
//! checks and output encoding done before or after calling into the core.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., `top_n` of zero).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded as JSON.
    #[error("ENCODE_FAILED: {0}")]
    EncodeFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::EncodeFailed(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
