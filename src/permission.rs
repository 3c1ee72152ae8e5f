//! Permission resolution
//!
//! Walks user -> role -> role_menu -> menu for one tenant and yields menu ids
//! and permission strings. Every call goes to the database; nothing is cached
//! between requests.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::entity::{menu, role, role_menu, user_role};
use crate::error::AppResult;

/// Role codes with special meaning
pub mod role_code {
    pub const SUPER_ADMIN: &str = "super_admin";
    pub const SYSTEM_ADMIN: &str = "system_admin";
    pub const FINANCE_ADMIN: &str = "finance_admin";
    pub const OPERATOR: &str = "operator";
    pub const CUSTOMER_SERVICE: &str = "customer_service";
    pub const AUDITOR: &str = "auditor";
    pub const TENANT_ADMIN: &str = "tenant_admin";

    /// Codes that can be neither renamed nor deleted
    pub const BUILT_IN: [&str; 6] = [
        SUPER_ADMIN,
        SYSTEM_ADMIN,
        FINANCE_ADMIN,
        OPERATOR,
        CUSTOMER_SERVICE,
        AUDITOR,
    ];

    /// Codes that may cross tenant boundaries when held in the system tenant
    pub const SYSTEM_ADMINS: [&str; 2] = [SUPER_ADMIN, SYSTEM_ADMIN];

    pub fn is_built_in(code: &str) -> bool {
        BUILT_IN.contains(&code)
    }

    /// Codes only the server may hand out
    pub fn is_reserved(code: &str) -> bool {
        is_built_in(code) || code == TENANT_ADMIN
    }
}

/// Data scopes, ordered from broadest to narrowest
pub mod data_scope {
    pub const ALL: i32 = 1;
    pub const DEPT: i32 = 2;
    pub const DEPT_AND_SUB: i32 = 3;
    pub const SELF: i32 = 4;
    pub const CUSTOM: i32 = 5;

    pub const OPTIONS: [(i32, &str); 5] = [
        (ALL, "all data"),
        (DEPT, "own department"),
        (DEPT_AND_SUB, "own department and below"),
        (SELF, "own records only"),
        (CUSTOM, "custom"),
    ];

    pub fn is_valid(scope: i32) -> bool {
        (ALL..=CUSTOM).contains(&scope)
    }

    pub fn label(scope: i32) -> &'static str {
        OPTIONS
            .iter()
            .find(|(value, _)| *value == scope)
            .map_or("", |(_, label)| label)
    }
}

/// Turn a route path (without the API prefix) into a permission key.
///
/// `/role/list` becomes `role:list`.
pub fn permission_key(path: &str) -> String {
    path.trim_matches('/').replace('/', ":")
}

/// Menu ids and permission strings granted to a set of roles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants {
    pub menu_ids: BTreeSet<i64>,
    pub permissions: BTreeSet<String>,
}

pub struct PermissionResolver<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> PermissionResolver<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Active role assignments of a user, as enabled and live role models
    pub async fn active_roles(&self, user_id: i64, tenant_id: i64) -> AppResult<Vec<role::Model>> {
        let now = chrono::Utc::now().timestamp();
        let role_ids: Vec<i64> = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .filter(user_role::Column::TenantId.eq(tenant_id))
            .filter(user_role::active_at(now))
            .all(self.db)
            .await?
            .into_iter()
            .map(|ur| ur.role_id)
            .collect();
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let roles = role::Entity::find()
            .filter(role::Column::Id.is_in(role_ids))
            .filter(role::Column::TenantId.eq(tenant_id))
            .filter(role::Column::Status.eq(role::STATUS_ENABLED))
            .filter(role::Column::DeletedAt.is_null())
            .order_by_asc(role::Column::Id)
            .all(self.db)
            .await?;
        Ok(roles)
    }

    pub async fn resolve_roles(&self, user_id: i64, tenant_id: i64) -> AppResult<Vec<i64>> {
        Ok(self
            .active_roles(user_id, tenant_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    pub async fn resolve_menus_and_permissions(&self, role_ids: &[i64], tenant_id: i64) -> AppResult<Grants> {
        if role_ids.is_empty() {
            return Ok(Grants::default());
        }

        let menu_ids: Vec<i64> = role_menu::Entity::find()
            .filter(role_menu::Column::RoleId.is_in(role_ids.to_vec()))
            .filter(role_menu::Column::TenantId.eq(tenant_id))
            .all(self.db)
            .await?
            .into_iter()
            .map(|rm| rm.menu_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if menu_ids.is_empty() {
            return Ok(Grants::default());
        }

        let menus = menu::Entity::find()
            .filter(menu::Column::Id.is_in(menu_ids))
            .filter(menu::Column::Status.eq(menu::STATUS_ENABLED))
            .filter(menu::Column::DeletedAt.is_null())
            .all(self.db)
            .await?;

        let mut grants = Grants::default();
        for m in menus {
            grants.menu_ids.insert(m.id);
            if !m.permission.is_empty() {
                grants.permissions.insert(m.permission);
            }
        }
        Ok(grants)
    }

    /// Everything a user is granted inside a tenant
    pub async fn user_grants(&self, user_id: i64, tenant_id: i64) -> AppResult<Grants> {
        let role_ids = self.resolve_roles(user_id, tenant_id).await?;
        self.resolve_menus_and_permissions(&role_ids, tenant_id).await
    }

    pub async fn check_permission(&self, user_id: i64, tenant_id: i64, permission: &str) -> AppResult<bool> {
        if permission.is_empty() {
            return Ok(false);
        }
        let grants = self.user_grants(user_id, tenant_id).await?;
        Ok(grants.permissions.contains(permission))
    }

    pub async fn check_role(&self, user_id: i64, tenant_id: i64, role_code: &str) -> AppResult<bool> {
        let roles = self.active_roles(user_id, tenant_id).await?;
        Ok(roles.iter().any(|r| r.code == role_code))
    }

    pub async fn user_permissions(&self, user_id: i64, tenant_id: i64) -> AppResult<Vec<String>> {
        let grants = self.user_grants(user_id, tenant_id).await?;
        Ok(grants.permissions.into_iter().collect())
    }

    pub async fn user_menu_ids(&self, user_id: i64, tenant_id: i64) -> AppResult<Vec<i64>> {
        let grants = self.user_grants(user_id, tenant_id).await?;
        Ok(grants.menu_ids.into_iter().collect())
    }

    /// Broadest data scope across the user's roles. Users without roles only see their own records.
    pub async fn user_data_scope(&self, user_id: i64, tenant_id: i64) -> AppResult<i32> {
        let roles = self.active_roles(user_id, tenant_id).await?;
        Ok(roles
            .iter()
            .map(|r| r.data_scope)
            .filter(|s| data_scope::is_valid(*s))
            .min()
            .unwrap_or(data_scope::SELF))
    }

    /// The user's primary role, if it is still assigned, enabled and live
    pub async fn primary_role(&self, user_id: i64, tenant_id: i64) -> AppResult<Option<role::Model>> {
        let now = chrono::Utc::now().timestamp();
        let Some(assignment) = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .filter(user_role::Column::TenantId.eq(tenant_id))
            .filter(user_role::Column::IsPrimary.eq(1))
            .filter(user_role::active_at(now))
            .one(self.db)
            .await?
        else {
            return Ok(None);
        };

        let role = role::Entity::find_by_id(assignment.role_id)
            .filter(role::Column::TenantId.eq(tenant_id))
            .filter(role::Column::Status.eq(role::STATUS_ENABLED))
            .filter(role::Column::DeletedAt.is_null())
            .one(self.db)
            .await?;
        Ok(role)
    }

    /// Check one permission for many users. Users without it map to `false`.
    pub async fn check_users_permission(
        &self,
        user_ids: &[i64],
        tenant_id: i64,
        permission: &str,
    ) -> AppResult<HashMap<i64, bool>> {
        let mut result: HashMap<i64, bool> = user_ids.iter().map(|id| (*id, false)).collect();
        if user_ids.is_empty() || permission.is_empty() {
            return Ok(result);
        }

        let menu_ids: Vec<i64> = menu::Entity::find()
            .filter(menu::Column::Permission.eq(permission))
            .filter(menu::Column::Status.eq(menu::STATUS_ENABLED))
            .filter(menu::Column::DeletedAt.is_null())
            .all(self.db)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        if menu_ids.is_empty() {
            return Ok(result);
        }

        let granting_roles: HashSet<i64> = role_menu::Entity::find()
            .filter(role_menu::Column::MenuId.is_in(menu_ids))
            .filter(role_menu::Column::TenantId.eq(tenant_id))
            .all(self.db)
            .await?
            .into_iter()
            .map(|rm| rm.role_id)
            .collect();
        if granting_roles.is_empty() {
            return Ok(result);
        }

        let active_roles: Vec<i64> = role::Entity::find()
            .filter(role::Column::Id.is_in(granting_roles))
            .filter(role::Column::TenantId.eq(tenant_id))
            .filter(role::Column::Status.eq(role::STATUS_ENABLED))
            .filter(role::Column::DeletedAt.is_null())
            .all(self.db)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if active_roles.is_empty() {
            return Ok(result);
        }

        let now = chrono::Utc::now().timestamp();
        let holders = user_role::Entity::find()
            .filter(user_role::Column::UserId.is_in(user_ids.to_vec()))
            .filter(user_role::Column::RoleId.is_in(active_roles))
            .filter(user_role::Column::TenantId.eq(tenant_id))
            .filter(user_role::active_at(now))
            .all(self.db)
            .await?;
        for holder in holders {
            result.insert(holder.user_id, true);
        }
        Ok(result)
    }

    /// Keep only the users holding `permission`, in input order
    pub async fn filter_users_by_permission(
        &self,
        user_ids: &[i64],
        tenant_id: i64,
        permission: &str,
    ) -> AppResult<Vec<i64>> {
        let checked = self.check_users_permission(user_ids, tenant_id, permission).await?;
        Ok(user_ids
            .iter()
            .copied()
            .filter(|id| checked.get(id).copied().unwrap_or(false))
            .collect())
    }
}
