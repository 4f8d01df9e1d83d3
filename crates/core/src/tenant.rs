//! Tenant resolution.

/// Tenant id used when the deployment does not name one.
pub const DEFAULT_TENANT: &str = "default";

/// Resolves the tenant (site) the current deployment serves.
pub trait TenantResolver: Send + Sync {
    fn resolve_tenant_id(&self) -> String;
}

/// Tenant fixed at startup from the configured site name.
#[derive(Debug, Clone, Default)]
pub struct StaticTenant {
    site_name: Option<String>,
}

impl StaticTenant {
    pub fn new(site_name: Option<String>) -> Self {
        Self { site_name }
    }
}

impl TenantResolver for StaticTenant {
    fn resolve_tenant_id(&self) -> String {
        match self.site_name.as_deref().map(str::trim) {
            Some(site) if !site.is_empty() => site.to_string(),
            _ => DEFAULT_TENANT.to_string(),
        }
    }
}
