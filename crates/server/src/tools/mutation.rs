//! notify_mutation tool implementation.
//!
//! Entry point for whatever watches the LMS for writes. Publishing an event
//! runs the invalidation hook, so the next read recomputes.

use edstats_core::MutationNotifier;
use edstats_core::notify::{EntityKind, MutationAction, MutationEvent};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the notify_mutation tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotifyMutationParams {
    /// Entity that changed: course, enrollment, user or profile.
    pub entity: EntityKind,

    /// created, updated or deleted.
    pub action: MutationAction,

    /// Site the change belongs to, if known.
    #[serde(default)]
    pub tenant: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotifyMutationOutput {
    /// Number of subscribers that handled the event.
    pub delivered: usize,
}

pub async fn notify_impl(
    notifier: &MutationNotifier, params: NotifyMutationParams,
) -> Result<CallToolResult, McpError> {
    let mut event = MutationEvent::new(params.entity, params.action);
    if let Some(tenant) = params.tenant {
        let tenant = tenant.trim();
        if tenant.is_empty() {
            return Err(ToolError::InvalidInput("tenant must not be blank".to_string()).into());
        }
        event = event.for_tenant(tenant);
    }

    let delivered = notifier.publish(&event).await?;
    json_result(&NotifyMutationOutput { delivered })
}
