//! MCP tool implementations.
//!
//! This module contains all tools exposed by the edstats server.

pub mod cache;
pub mod mutation;
pub mod refresh;
pub mod snapshot;
pub mod stats;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Pretty-print `output` as the single text block of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::EncodeFailed(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Reject `top_n = 0`; `None` means "all rows".
pub(crate) fn check_top_n(top_n: Option<usize>) -> Result<(), ToolError> {
    match top_n {
        Some(0) => Err(ToolError::InvalidInput("top_n must be at least 1".to_string())),
        _ => Ok(()),
    }
}
