//! Tenant management and tenant access validation

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::{check_email, check_len, check_range, like, now, Page, Window};
use crate::context::{RequestContext, TenantScope};
use crate::entity::tenant::TenantStatus;
use crate::entity::{menu, role, role_menu, tenant, user, user_role};
use crate::error::{AppError, AppResult, OptionExt};
use crate::password::PasswordHasher;
use crate::permission::{data_scope, role_code};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantFilter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub domain: String,
    /// 0 means any
    #[serde(default)]
    pub status: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenant {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub domain: String,
    pub max_users: i32,
    #[serde(default)]
    pub storage_limit: i64,
    pub expire_at: Option<i64>,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
    #[serde(default)]
    pub remark: String,
}

impl CreateTenant {
    fn validate(&self) -> AppResult<()> {
        check_len("name", &self.name, 1, 100)?;
        check_len("code", &self.code, 1, 50)?;
        check_len("domain", &self.domain, 0, 100)?;
        check_range("maxUsers", self.max_users.into(), 1, 10_000)?;
        check_range("storageLimit", self.storage_limit, 0, i64::MAX)?;
        check_len("adminName", &self.admin_name, 1, 50)?;
        check_email("adminEmail", &self.admin_email)?;
        check_len("adminPassword", &self.admin_password, 6, 32)?;
        check_len("remark", &self.remark, 0, 500)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenant {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub domain: String,
    pub max_users: i32,
    #[serde(default)]
    pub storage_limit: i64,
    pub expire_at: Option<i64>,
    #[serde(default)]
    pub remark: String,
}

impl UpdateTenant {
    fn validate(&self) -> AppResult<()> {
        check_len("name", &self.name, 1, 100)?;
        check_len("domain", &self.domain, 0, 100)?;
        check_range("maxUsers", self.max_users.into(), 1, 10_000)?;
        check_range("storageLimit", self.storage_limit, 0, i64::MAX)?;
        check_len("remark", &self.remark, 0, 500)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantInfo {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub domain: String,
    pub status: i32,
    pub status_name: String,
    pub max_users: i32,
    pub storage_limit: i64,
    pub expire_at: Option<i64>,
    pub admin_user_id: i64,
    pub admin_name: String,
    pub config: serde_json::Value,
    pub remark: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TenantInfo {
    fn new(model: tenant::Model, admin_name: String) -> Self {
        let config = serde_json::from_str(&model.config).unwrap_or(serde_json::Value::Null);
        let status_name = TenantStatus::from_i32(model.status)
            .map(|s| s.name().to_string())
            .unwrap_or_default();
        Self {
            id: model.id,
            name: model.name,
            code: model.code,
            domain: model.domain,
            status: model.status,
            status_name,
            max_users: model.max_users,
            storage_limit: model.storage_limit,
            expire_at: model.expire_at,
            admin_user_id: model.admin_user_id,
            admin_name,
            config,
            remark: model.remark,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TenantStats {
    pub user_count: u64,
    pub role_count: u64,
    pub menu_count: u64,
    pub last_login_at: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDetail {
    #[serde(flatten)]
    pub tenant: TenantInfo,
    pub stats: TenantStats,
}

#[derive(Debug, Serialize)]
pub struct TenantOption {
    pub id: i64,
    pub code: String,
    pub name: String,
}

pub struct TenantService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TenantService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Look up a live tenant and make sure requests may run inside it
    pub async fn validate_access(&self, tenant_id: i64) -> AppResult<TenantScope> {
        let model = tenant::Entity::find_by_id(tenant_id)
            .filter(tenant::Column::DeletedAt.is_null())
            .one(self.db)
            .await?
            .ok_or(AppError::TenantNotFound)?;
        check_usable(&model, now())?;
        Ok(TenantScope {
            id: model.id,
            code: model.code,
            name: model.name,
        })
    }

    /// Tenant bound to a host name, if any
    pub async fn find_by_domain(&self, host: &str) -> AppResult<Option<tenant::Model>> {
        if host.is_empty() {
            return Ok(None);
        }
        Ok(tenant::Entity::find()
            .filter(tenant::Column::Domain.eq(host))
            .filter(tenant::Column::DeletedAt.is_null())
            .one(self.db)
            .await?)
    }

    /// Live, usable tenant by code. Used by login.
    pub async fn usable_by_code(&self, code: &str) -> AppResult<tenant::Model> {
        let model = self
            .live_by_code(code)
            .await?
            .ok_or(AppError::TenantNotFound)?;
        check_usable(&model, now())?;
        Ok(model)
    }

    async fn live_by_code(&self, code: &str) -> AppResult<Option<tenant::Model>> {
        Ok(tenant::Entity::find()
            .filter(tenant::Column::Code.eq(code))
            .filter(tenant::Column::DeletedAt.is_null())
            .one(self.db)
            .await?)
    }

    async fn live(&self, id: i64) -> AppResult<tenant::Model> {
        tenant::Entity::find_by_id(id)
            .filter(tenant::Column::DeletedAt.is_null())
            .one(self.db)
            .await?
            .ok_or_not_found(format!("tenant {} not found", id))
    }

    async fn admin_names(&self, ids: Vec<i64>) -> AppResult<HashMap<i64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect())
    }

    pub async fn list(&self, ctx: &RequestContext, filter: &TenantFilter, window: Window) -> AppResult<Page<TenantInfo>> {
        ctx.ensure_system_admin()?;

        let mut query = tenant::Entity::find().filter(tenant::Column::DeletedAt.is_null());
        if !filter.name.trim().is_empty() {
            query = query.filter(tenant::Column::Name.like(like(&filter.name)));
        }
        if !filter.code.trim().is_empty() {
            query = query.filter(tenant::Column::Code.like(like(&filter.code)));
        }
        if !filter.domain.trim().is_empty() {
            query = query.filter(tenant::Column::Domain.like(like(&filter.domain)));
        }
        if filter.status > 0 {
            query = query.filter(tenant::Column::Status.eq(filter.status));
        }

        let total = query.clone().count(self.db).await?;
        let rows = query
            .order_by_desc(tenant::Column::Id)
            .offset(window.offset())
            .limit(window.size)
            .all(self.db)
            .await?;

        let admin_ids = rows.iter().map(|t| t.admin_user_id).filter(|id| *id > 0).collect();
        let names = self.admin_names(admin_ids).await?;
        let list = rows
            .into_iter()
            .map(|t| {
                let name = names.get(&t.admin_user_id).cloned().unwrap_or_default();
                TenantInfo::new(t, name)
            })
            .collect();
        Ok(Page::new(list, total, window))
    }

    pub async fn detail(&self, ctx: &RequestContext, id: i64) -> AppResult<TenantDetail> {
        ctx.ensure_system_admin()?;
        let model = self.live(id).await?;
        let stats = self.compute_stats(model.id).await?;
        let admin_name = self
            .admin_names(vec![model.admin_user_id])
            .await?
            .remove(&model.admin_user_id)
            .unwrap_or_default();
        Ok(TenantDetail {
            tenant: TenantInfo::new(model, admin_name),
            stats,
        })
    }

    /// Create a tenant together with its administrator, the `tenant_admin` role
    /// and a binding of every enabled menu to that role.
    pub async fn create(&self, ctx: &RequestContext, hasher: PasswordHasher, req: CreateTenant) -> AppResult<TenantInfo> {
        let operator = ctx.ensure_system_admin()?.user_id;
        req.validate()?;

        let code_taken = tenant::Entity::find()
            .filter(tenant::Column::Code.eq(req.code.as_str()))
            .count(self.db)
            .await?
            > 0;
        if code_taken {
            return Err(AppError::DuplicateCode);
        }
        let admin_taken = user::Entity::find()
            .filter(user::Column::Username.eq(req.admin_name.as_str()))
            .filter(user::Column::DeletedAt.is_null())
            .count(self.db)
            .await?
            > 0;
        if admin_taken {
            return Err(AppError::DuplicateName);
        }

        let password = hasher.hash(&req.admin_password)?;
        let ts = now();
        let txn = self.db.begin().await?;

        let created = tenant::ActiveModel {
            code: Set(req.code),
            name: Set(req.name),
            domain: Set(req.domain),
            status: Set(TenantStatus::Normal.into()),
            max_users: Set(req.max_users),
            storage_limit: Set(req.storage_limit),
            expire_at: Set(req.expire_at),
            admin_user_id: Set(0),
            config: Set("{}".to_string()),
            remark: Set(req.remark),
            created_at: Set(ts),
            updated_at: Set(ts),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let admin = user::ActiveModel {
            tenant_id: Set(created.id),
            username: Set(req.admin_name.clone()),
            password: Set(password),
            real_name: Set("Tenant Administrator".to_string()),
            email: Set(req.admin_email),
            phone: Set(String::new()),
            avatar: Set(String::new()),
            dept_id: Set(0),
            status: Set(user::UserStatus::Normal.into()),
            login_ip: Set(String::new()),
            login_at: Set(None),
            login_count: Set(0),
            remark: Set(String::new()),
            created_by: Set(operator),
            created_at: Set(ts),
            updated_at: Set(ts),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let admin_role = role::ActiveModel {
            tenant_id: Set(created.id),
            name: Set("Tenant Administrator".to_string()),
            code: Set(role_code::TENANT_ADMIN.to_string()),
            description: Set("full access inside the tenant".to_string()),
            status: Set(role::STATUS_ENABLED),
            sort: Set(1),
            data_scope: Set(data_scope::ALL),
            remark: Set(String::new()),
            created_by: Set(admin.id),
            created_at: Set(ts),
            updated_at: Set(ts),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        user_role::ActiveModel {
            tenant_id: Set(created.id),
            user_id: Set(admin.id),
            role_id: Set(admin_role.id),
            is_primary: Set(1),
            assigned_by: Set(operator),
            expires_at: Set(None),
            created_at: Set(ts),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let menu_ids: Vec<i64> = menu::Entity::find()
            .filter(menu::Column::Status.eq(menu::STATUS_ENABLED))
            .filter(menu::Column::DeletedAt.is_null())
            .order_by_asc(menu::Column::Sort)
            .order_by_asc(menu::Column::Id)
            .all(&txn)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        if !menu_ids.is_empty() {
            let rows = menu_ids.into_iter().map(|menu_id| role_menu::ActiveModel {
                tenant_id: Set(created.id),
                role_id: Set(admin_role.id),
                menu_id: Set(menu_id),
                created_at: Set(ts),
                ..Default::default()
            });
            role_menu::Entity::insert_many(rows).exec(&txn).await?;
        }

        let mut active: tenant::ActiveModel = created.into();
        active.admin_user_id = Set(admin.id);
        let created = active.update(&txn).await?;

        txn.commit().await?;

        tracing::info!("Tenant '{}' created with administrator '{}'", created.code, admin.username);
        Ok(TenantInfo::new(created, admin.username))
    }

    pub async fn update(&self, ctx: &RequestContext, req: UpdateTenant) -> AppResult<TenantInfo> {
        ctx.ensure_system_admin()?;
        req.validate()?;
        let model = self.live(req.id).await?;
        if model.is_system() {
            return Err(AppError::BuiltInImmutable);
        }

        let admin_user_id = model.admin_user_id;
        let mut active: tenant::ActiveModel = model.into();
        active.name = Set(req.name);
        active.domain = Set(req.domain);
        active.max_users = Set(req.max_users);
        active.storage_limit = Set(req.storage_limit);
        active.expire_at = Set(req.expire_at);
        active.remark = Set(req.remark);
        active.updated_at = Set(now());
        let updated = active.update(self.db).await?;

        let admin_name = self
            .admin_names(vec![admin_user_id])
            .await?
            .remove(&admin_user_id)
            .unwrap_or_default();
        Ok(TenantInfo::new(updated, admin_name))
    }

    /// Soft-delete the tenant, its users and roles, and drop its bindings
    pub async fn delete(&self, ctx: &RequestContext, id: i64) -> AppResult<()> {
        ctx.ensure_system_admin()?;
        let model = self.live(id).await?;
        if model.is_system() {
            return Err(AppError::BuiltInImmutable);
        }

        let ts = now();
        let txn = self.db.begin().await?;
        tenant::Entity::update_many()
            .col_expr(tenant::Column::DeletedAt, Expr::value(ts))
            .col_expr(tenant::Column::UpdatedAt, Expr::value(ts))
            .filter(tenant::Column::Id.eq(id))
            .exec(&txn)
            .await?;
        user::Entity::update_many()
            .col_expr(user::Column::DeletedAt, Expr::value(ts))
            .filter(user::Column::TenantId.eq(id))
            .filter(user::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;
        role::Entity::update_many()
            .col_expr(role::Column::DeletedAt, Expr::value(ts))
            .filter(role::Column::TenantId.eq(id))
            .filter(role::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;
        role_menu::Entity::delete_many()
            .filter(role_menu::Column::TenantId.eq(id))
            .exec(&txn)
            .await?;
        user_role::Entity::delete_many()
            .filter(user_role::Column::TenantId.eq(id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        tracing::info!("Tenant '{}' deleted", model.code);
        Ok(())
    }

    pub async fn update_status(&self, ctx: &RequestContext, id: i64, status: i32) -> AppResult<()> {
        ctx.ensure_system_admin()?;
        if TenantStatus::from_i32(status).is_none() {
            return Err(AppError::Validation("status must be 1, 2 or 3".to_string()));
        }
        let model = self.live(id).await?;
        if model.is_system() {
            return Err(AppError::BuiltInImmutable);
        }

        let mut active: tenant::ActiveModel = model.into();
        active.status = Set(status);
        active.updated_at = Set(now());
        active.update(self.db).await?;
        Ok(())
    }

    pub async fn stats(&self, ctx: &RequestContext, id: i64) -> AppResult<TenantStats> {
        ctx.ensure_system_admin()?;
        let model = self.live(id).await?;
        self.compute_stats(model.id).await
    }

    async fn compute_stats(&self, tenant_id: i64) -> AppResult<TenantStats> {
        let users = user::Entity::find()
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::DeletedAt.is_null());
        let user_count = users.clone().count(self.db).await?;
        let last_login_at = users
            .filter(user::Column::LoginAt.is_not_null())
            .order_by_desc(user::Column::LoginAt)
            .one(self.db)
            .await?
            .and_then(|u| u.login_at);

        let role_count = role::Entity::find()
            .filter(role::Column::TenantId.eq(tenant_id))
            .filter(role::Column::DeletedAt.is_null())
            .count(self.db)
            .await?;

        let menu_count = role_menu::Entity::find()
            .filter(role_menu::Column::TenantId.eq(tenant_id))
            .all(self.db)
            .await?
            .into_iter()
            .map(|rm| rm.menu_id)
            .collect::<BTreeSet<_>>()
            .len() as u64;

        Ok(TenantStats {
            user_count,
            role_count,
            menu_count,
            last_login_at,
        })
    }

    /// Replace the tenant's JSON configuration. Only objects are accepted.
    pub async fn update_config(&self, ctx: &RequestContext, id: i64, config: serde_json::Value) -> AppResult<()> {
        ctx.ensure_system_admin()?;
        if !config.is_object() {
            return Err(AppError::Validation("config must be a JSON object".to_string()));
        }
        let model = self.live(id).await?;
        if model.is_system() {
            return Err(AppError::BuiltInImmutable);
        }

        let encoded = serde_json::to_string(&config).map_err(|e| AppError::Internal(e.to_string()))?;
        let mut active: tenant::ActiveModel = model.into();
        active.config = Set(encoded);
        active.updated_at = Set(now());
        active.update(self.db).await?;
        Ok(())
    }

    /// Normal, unexpired tenants for selection lists
    pub async fn options(&self, ctx: &RequestContext) -> AppResult<Vec<TenantOption>> {
        ctx.ensure_system_admin()?;
        let ts = now();
        let rows = tenant::Entity::find()
            .filter(tenant::Column::DeletedAt.is_null())
            .filter(tenant::Column::Status.eq(i32::from(TenantStatus::Normal)))
            .filter(
                Condition::any()
                    .add(tenant::Column::ExpireAt.is_null())
                    .add(tenant::Column::ExpireAt.gte(ts)),
            )
            .order_by_asc(tenant::Column::Id)
            .all(self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|t| TenantOption {
                id: t.id,
                code: t.code,
                name: t.name,
            })
            .collect())
    }

    pub async fn by_code(&self, ctx: &RequestContext, code: &str) -> AppResult<TenantInfo> {
        ctx.ensure_system_admin()?;
        let model = self
            .live_by_code(code)
            .await?
            .ok_or_not_found(format!("tenant '{}' not found", code))?;
        let admin_user_id = model.admin_user_id;
        let admin_name = self
            .admin_names(vec![admin_user_id])
            .await?
            .remove(&admin_user_id)
            .unwrap_or_default();
        Ok(TenantInfo::new(model, admin_name))
    }
}

fn check_usable(model: &tenant::Model, now: i64) -> AppResult<()> {
    if !model.is_normal() {
        return Err(AppError::TenantInactive);
    }
    if model.is_expired_at(now) {
        return Err(AppError::TenantExpired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::{context, identity};
    use crate::permission::PermissionResolver;
    use crate::testing::{self, TestData};

    fn system_admin() -> RequestContext {
        context(1, "system", Some(identity(1, 1, "system", role_code::SUPER_ADMIN)))
    }

    fn create_req(code: &str, admin: &str) -> CreateTenant {
        CreateTenant {
            name: format!("{} corp", code),
            code: code.to_string(),
            domain: String::new(),
            max_users: 10,
            storage_limit: 0,
            expire_at: None,
            admin_name: admin.to_string(),
            admin_email: format!("{}@example.com", admin),
            admin_password: "secret123".to_string(),
            remark: String::new(),
        }
    }

    #[tokio::test]
    async fn test_validate_access() {
        let db = testing::setup_db().await;
        let data = TestData::new(&db);
        let acme = data.tenant("acme").await;
        let service = TenantService::new(&db);

        let scope = service.validate_access(acme.id).await.unwrap();
        assert_eq!(scope.code, "acme");
        assert!(matches!(service.validate_access(999).await, Err(AppError::TenantNotFound)));

        let mut active: tenant::ActiveModel = acme.clone().into();
        active.expire_at = Set(Some(now() - 60));
        active.update(&db).await.unwrap();
        assert!(matches!(service.validate_access(acme.id).await, Err(AppError::TenantExpired)));

        let mut active: tenant::ActiveModel = acme.into();
        active.status = Set(TenantStatus::Locked.into());
        let locked = active.update(&db).await.unwrap();
        assert!(matches!(service.validate_access(locked.id).await, Err(AppError::TenantInactive)));
    }

    #[tokio::test]
    async fn test_create_tenant_provisions_admin() {
        let db = testing::setup_seeded_db().await;
        let service = TenantService::new(&db);
        let ctx = system_admin();

        let created = service.create(&ctx, testing::hasher(), create_req("acme", "acme_admin")).await.unwrap();
        assert_eq!(created.admin_name, "acme_admin");
        assert_eq!(created.status, 1);

        let resolver = PermissionResolver::new(&db);
        let role = resolver.primary_role(created.admin_user_id, created.id).await.unwrap().unwrap();
        assert_eq!(role.code, role_code::TENANT_ADMIN);
        assert_eq!(role.data_scope, data_scope::ALL);
        assert!(resolver.check_permission(created.admin_user_id, created.id, "user:create").await.unwrap());

        let stats = service.stats(&ctx, created.id).await.unwrap();
        assert_eq!(stats.user_count, 1);
        assert_eq!(stats.role_count, 1);
        assert!(stats.menu_count > 0);

        assert!(matches!(
            service.create(&ctx, testing::hasher(), create_req("acme", "other")).await,
            Err(AppError::DuplicateCode)
        ));
        assert!(matches!(
            service.create(&ctx, testing::hasher(), create_req("beta", "acme_admin")).await,
            Err(AppError::DuplicateName)
        ));
    }

    #[tokio::test]
    async fn test_management_requires_system_admin() {
        let db = testing::setup_seeded_db().await;
        let service = TenantService::new(&db);
        let ctx = context(2, "acme", Some(identity(5, 2, "acme", role_code::TENANT_ADMIN)));
        assert!(matches!(
            service.list(&ctx, &TenantFilter::default(), Window::default()).await,
            Err(AppError::PermissionDenied)
        ));

        // super_admin outside the system tenant is not a system admin
        let ctx = context(2, "acme", Some(identity(5, 2, "acme", role_code::SUPER_ADMIN)));
        assert!(matches!(service.options(&ctx).await, Err(AppError::PermissionDenied)));
    }

    #[tokio::test]
    async fn test_system_tenant_is_immutable() {
        let db = testing::setup_seeded_db().await;
        let service = TenantService::new(&db);
        let ctx = system_admin();
        let system = service.by_code(&ctx, "system").await.unwrap();

        assert!(matches!(service.delete(&ctx, system.id).await, Err(AppError::BuiltInImmutable)));
        assert!(matches!(service.update_status(&ctx, system.id, 3).await, Err(AppError::BuiltInImmutable)));
        let update = UpdateTenant {
            id: system.id,
            name: "renamed".to_string(),
            domain: String::new(),
            max_users: 5,
            storage_limit: 0,
            expire_at: None,
            remark: String::new(),
        };
        assert!(matches!(service.update(&ctx, update).await, Err(AppError::BuiltInImmutable)));
        assert!(matches!(
            service.update_config(&ctx, system.id, serde_json::json!({"theme": "dark"})).await,
            Err(AppError::BuiltInImmutable)
        ));
        let unchanged = service.by_code(&ctx, "system").await.unwrap();
        assert_eq!(unchanged.config, system.config);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let db = testing::setup_seeded_db().await;
        let service = TenantService::new(&db);
        let ctx = system_admin();
        let created = service.create(&ctx, testing::hasher(), create_req("acme", "acme_admin")).await.unwrap();

        service.delete(&ctx, created.id).await.unwrap();

        assert!(matches!(service.validate_access(created.id).await, Err(AppError::TenantNotFound)));
        let live_users = user::Entity::find()
            .filter(user::Column::TenantId.eq(created.id))
            .filter(user::Column::DeletedAt.is_null())
            .count(&db)
            .await
            .unwrap();
        assert_eq!(live_users, 0);
        let bindings = role_menu::Entity::find()
            .filter(role_menu::Column::TenantId.eq(created.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(bindings, 0);

        let page = service.list(&ctx, &TenantFilter::default(), Window::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.list[0].code, "system");
        assert_eq!(page.list[0].admin_name, "admin");
    }

    #[tokio::test]
    async fn test_config_and_options() {
        let db = testing::setup_seeded_db().await;
        let service = TenantService::new(&db);
        let ctx = system_admin();
        let created = service.create(&ctx, testing::hasher(), create_req("acme", "acme_admin")).await.unwrap();

        assert!(service.update_config(&ctx, created.id, serde_json::json!([1, 2])).await.is_err());
        service
            .update_config(&ctx, created.id, serde_json::json!({"theme": "dark"}))
            .await
            .unwrap();
        let detail = service.detail(&ctx, created.id).await.unwrap();
        assert_eq!(detail.tenant.config["theme"], "dark");

        service.update_status(&ctx, created.id, 2).await.unwrap();
        let options = service.options(&ctx).await.unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].code, "system");
    }
}
