//! cache_purge tool implementation.
//!
//! Purges cached aggregates by expiry, by tenant, or all at once.

use edstats_core::InvalidationHook;
use edstats_core::cache::{CacheStore, tenant_prefix};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Drop entries whose TTL has already run out.
    #[serde(default)]
    pub expired: bool,

    /// Drop every cached aggregate of this tenant.
    #[serde(default)]
    pub tenant: Option<String>,

    /// Drop every cached aggregate of every tenant.
    #[serde(default)]
    pub all: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(
    cache: &dyn CacheStore, hook: &InvalidationHook, params: CachePurgeParams,
) -> Result<CallToolResult, McpError> {
    if !params.expired && params.tenant.is_none() && !params.all {
        let msg = "At least one of expired, tenant, or all must be specified";
        return Err(ToolError::InvalidInput(msg.to_string()).into());
    }

    let tenant = match params.tenant.as_deref().map(str::trim) {
        Some("") => return Err(ToolError::InvalidInput("tenant must not be blank".to_string()).into()),
        other => other,
    };

    let mut deleted_total = 0u64;

    if params.all {
        deleted_total += hook.invalidate_all().await?;
    } else {
        if params.expired {
            deleted_total += cache.purge_expired().await?;
        }

        if let Some(tenant) = tenant {
            deleted_total += cache.delete_by_prefix(&tenant_prefix(tenant)).await?;
        }
    }

    json_result(&CachePurgeOutput { deleted: deleted_total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use edstats_core::cache::{AggregateName, MemoryCache, cache_key};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::tools::testing::output;

    async fn seeded() -> (Arc<MemoryCache>, InvalidationHook) {
        let cache = Arc::new(MemoryCache::new());
        for tenant in ["site-a", "site-b"] {
            for name in [AggregateName::TotalStats, AggregateName::YearlyStats] {
                cache
                    .set(&cache_key(tenant, name), b"[]".to_vec(), Duration::from_secs(3600))
                    .await
                    .unwrap();
            }
        }
        cache
            .set(&cache_key("site-a", AggregateName::CourseStatsAll), b"[]".to_vec(), Duration::ZERO)
            .await
            .unwrap();
        let hook = InvalidationHook::new(cache.clone());
        (cache, hook)
    }

    #[tokio::test]
    async fn test_purge_by_tenant() {
        let (cache, hook) = seeded().await;
        let params = CachePurgeParams { tenant: Some("site-b".to_string()), ..Default::default() };

        let out: CachePurgeOutput = output(&purge_impl(cache.as_ref(), &hook, params).await.unwrap());
        assert_eq!(out.deleted, 2);
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (cache, hook) = seeded().await;
        let params = CachePurgeParams { expired: true, ..Default::default() };

        let out: CachePurgeOutput = output(&purge_impl(cache.as_ref(), &hook, params).await.unwrap());
        assert_eq!(out.deleted, 1);
        assert_eq!(cache.len(), 4);
    }

    #[tokio::test]
    async fn test_purge_all() {
        let (cache, hook) = seeded().await;
        let params = CachePurgeParams { all: true, ..Default::default() };

        let out: CachePurgeOutput = output(&purge_impl(cache.as_ref(), &hook, params).await.unwrap());
        assert_eq!(out.deleted, 5);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_blank_tenant_rejected_before_any_delete() {
        let (cache, hook) = seeded().await;
        let params = CachePurgeParams { expired: true, tenant: Some("  ".to_string()), ..Default::default() };

        assert!(purge_impl(cache.as_ref(), &hook, params).await.is_err());
        assert_eq!(cache.len(), 5);
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let (cache, hook) = seeded().await;
        let result = purge_impl(cache.as_ref(), &hook, CachePurgeParams::default()).await;
        assert!(result.is_err());
    }
}
