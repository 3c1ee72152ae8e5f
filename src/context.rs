//! Request-scoped context
//!
//! Built by the tenant middleware, completed by the auth gate and passed
//! explicitly into every service call.

use serde::Serialize;

use crate::entity::tenant::SYSTEM_TENANT_CODE;
use crate::error::{AppError, AppResult};
use crate::permission::role_code;

/// The tenant a request operates in, already validated
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantScope {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// Authenticated caller, rebuilt on every request from the token and a live user lookup
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: i64,
    pub tenant_id: i64,
    pub tenant_code: String,
    pub username: String,
    pub real_name: String,
    pub role_id: i64,
    pub role_key: String,
    pub dept_id: i64,
    pub app: String,
    pub login_at: i64,
}

impl Identity {
    /// System administrators may act inside any tenant
    pub fn is_system_admin(&self) -> bool {
        self.tenant_code == SYSTEM_TENANT_CODE && role_code::SYSTEM_ADMINS.contains(&self.role_key.as_str())
    }

    pub fn is_tenant_admin(&self) -> bool {
        self.role_key == role_code::TENANT_ADMIN
    }
}

#[derive(Clone, Debug)]
pub struct RequestContext {
    pub tenant: TenantScope,
    pub identity: Option<Identity>,
    pub client_ip: Option<String>,
}

impl RequestContext {
    pub fn new(tenant: TenantScope, client_ip: Option<String>) -> Self {
        Self {
            tenant,
            identity: None,
            client_ip,
        }
    }

    pub fn tenant_id(&self) -> i64 {
        self.tenant.id
    }

    pub fn require_identity(&self) -> AppResult<&Identity> {
        self.identity.as_ref().ok_or(AppError::TokenMissing)
    }

    /// Operator id recorded on writes, 0 when anonymous
    pub fn operator_id(&self) -> i64 {
        self.identity.as_ref().map_or(0, |i| i.user_id)
    }

    pub fn operator_name(&self) -> &str {
        self.identity.as_ref().map_or("anonymous", |i| i.username.as_str())
    }

    pub fn ensure_system_admin(&self) -> AppResult<&Identity> {
        let identity = self.require_identity()?;
        if identity.is_system_admin() {
            Ok(identity)
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn identity(user_id: i64, tenant_id: i64, tenant_code: &str, role_key: &str) -> Identity {
        Identity {
            user_id,
            tenant_id,
            tenant_code: tenant_code.to_string(),
            username: format!("user{}", user_id),
            real_name: String::new(),
            role_id: 0,
            role_key: role_key.to_string(),
            dept_id: 0,
            app: "api".to_string(),
            login_at: 0,
        }
    }

    pub fn context(tenant_id: i64, tenant_code: &str, identity: Option<Identity>) -> RequestContext {
        RequestContext {
            tenant: TenantScope {
                id: tenant_id,
                code: tenant_code.to_string(),
                name: tenant_code.to_string(),
            },
            identity,
            client_ip: None,
        }
    }
}
