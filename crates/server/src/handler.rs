//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use edstats_core::{InvalidationHook, MutationNotifier, StatsService};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::cache::{CachePurgeParams, purge_impl};
use crate::tools::mutation::{NotifyMutationParams, notify_impl};
use crate::tools::refresh::refresh_impl;
use crate::tools::snapshot::{SnapshotGetParams, snapshot_get_impl};
use crate::tools::stats::{TopNParams, country_stats_impl, course_stats_impl, total_stats_impl, yearly_stats_impl};

/// The main MCP server handler for edstats.
#[derive(Clone)]
pub struct EdStatsServer {
    tool_router: ToolRouter<Self>,
    service: Arc<StatsService>,
    notifier: Arc<MutationNotifier>,
    hook: Arc<InvalidationHook>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl EdStatsServer {
    /// Create a new server handler.
    ///
    /// `notifier` must already have `hook` registered; it is shared read-only from here on.
    pub fn new(service: Arc<StatsService>, notifier: Arc<MutationNotifier>, hook: Arc<InvalidationHook>) -> Self {
        Self { tool_router: Self::tool_router(), service, notifier, hook }
    }

    #[tool(description = "Courses ranked by enrollment count. Optional top_n limits the list. Served from cache.")]
    async fn course_stats(&self, params: Parameters<TopNParams>) -> Result<CallToolResult, McpError> {
        course_stats_impl(&self.service, params.0).await
    }

    #[tool(description = "Countries ranked by registered users. Optional top_n limits the list. Served from cache.")]
    async fn country_stats(&self, params: Parameters<TopNParams>) -> Result<CallToolResult, McpError> {
        country_stats_impl(&self.service, params.0).await
    }

    #[tool(description = "New users and new enrollments per calendar year, ascending. Served from cache.")]
    async fn yearly_stats(&self) -> Result<CallToolResult, McpError> {
        yearly_stats_impl(&self.service).await
    }

    #[tool(description = "Platform totals: users, courses and enrollments. Served from cache.")]
    async fn total_stats(&self) -> Result<CallToolResult, McpError> {
        total_stats_impl(&self.service).await
    }

    /// Recompute every aggregate and upsert it into the snapshot tables.
    #[tool(description = "Recompute all aggregates from the LMS database and store them as durable snapshots.")]
    async fn refresh_snapshots(&self) -> Result<CallToolResult, McpError> {
        refresh_impl(&self.service).await
    }

    #[tool(description = "Read stored snapshots (courses, countries, years or totals) without querying the LMS.")]
    async fn snapshot_get(&self, params: Parameters<SnapshotGetParams>) -> Result<CallToolResult, McpError> {
        snapshot_get_impl(&self.service, params.0).await
    }

    /// Report an LMS write so cached aggregates are invalidated.
    #[tool(
        description = "Report a created/updated/deleted course, enrollment, user or profile. Clears cached aggregates."
    )]
    async fn notify_mutation(&self, params: Parameters<NotifyMutationParams>) -> Result<CallToolResult, McpError> {
        notify_impl(&self.notifier, params.0).await
    }

    #[tool(description = "Purge cached aggregates: expired entries, one tenant, or everything.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.service.cache_store().as_ref(), &self.hook, params.0).await
    }
}

impl ServerHandler for EdStatsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "edstats".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Aggregate statistics for an Open edX site. Live tools read through a cache; \
                 snapshot_get reads the last refresh."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::fixture;

    #[tokio::test]
    async fn test_all_tools_registered() {
        let fx = fixture().await;
        let hook = Arc::new(InvalidationHook::new(fx.cache.clone()));
        let mut notifier = MutationNotifier::new();
        hook.register(&mut notifier);
        let server = EdStatsServer::new(Arc::new(fx.service), Arc::new(notifier), hook);

        let mut names: Vec<_> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_purge",
                "country_stats",
                "course_stats",
                "notify_mutation",
                "refresh_snapshots",
                "snapshot_get",
                "total_stats",
                "yearly_stats",
            ]
        );
        assert_eq!(server.get_info().server_info.name, "edstats");
    }
}
