//! Role management and role to menu bindings

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{check_len, check_range, dedup_ids, like, now, require_ids, Page, Window};
use crate::context::RequestContext;
use crate::entity::{menu, role, role_menu, user, user_role};
use crate::error::{AppError, AppResult, OptionExt};
use crate::permission::{data_scope, role_code, PermissionResolver};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleFilter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    /// -1 means any
    #[serde(default = "any_status")]
    pub status: i32,
    /// 0 means any
    #[serde(default)]
    pub data_scope: i32,
}

fn any_status() -> i32 {
    -1
}

impl Default for RoleFilter {
    fn default() -> Self {
        Self {
            name: String::new(),
            code: String::new(),
            status: any_status(),
            data_scope: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInput {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled")]
    pub status: i32,
    #[serde(default)]
    pub sort: i32,
    #[serde(default = "self_scope")]
    pub data_scope: i32,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub menu_ids: Vec<i64>,
}

fn enabled() -> i32 {
    role::STATUS_ENABLED
}

fn self_scope() -> i32 {
    data_scope::SELF
}

fn ensure_assignable_code(code: &str) -> AppResult<()> {
    if role_code::is_reserved(code) {
        return Err(AppError::Validation(format!("role code '{}' is reserved", code)));
    }
    Ok(())
}

impl RoleInput {
    fn validate(&self) -> AppResult<()> {
        check_len("name", &self.name, 1, 50)?;
        check_len("code", &self.code, 1, 50)?;
        check_len("description", &self.description, 0, 200)?;
        check_status(self.status)?;
        check_range("sort", self.sort.into(), 0, i32::MAX.into())?;
        if !data_scope::is_valid(self.data_scope) {
            return Err(AppError::Validation("dataScope must be between 1 and 5".to_string()));
        }
        check_len("remark", &self.remark, 0, 500)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRole {
    pub id: i64,
    #[serde(flatten)]
    pub input: RoleInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRole {
    pub id: i64,
    pub name: String,
    pub code: String,
}

fn check_status(status: i32) -> AppResult<()> {
    if status != role::STATUS_ENABLED && status != role::STATUS_DISABLED {
        return Err(AppError::Validation("status must be 0 or 1".to_string()));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDetail {
    #[serde(flatten)]
    pub role: role::Model,
    pub menu_ids: Vec<i64>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RoleOption {
    pub id: i64,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScopeCount {
    pub data_scope: i32,
    pub label: &'static str,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStats {
    pub total: u64,
    pub enabled: u64,
    pub disabled: u64,
    pub built_in: u64,
    pub by_data_scope: Vec<ScopeCount>,
}

#[derive(Debug, Serialize)]
pub struct ScopeOption {
    pub value: i32,
    pub label: &'static str,
}

pub struct RoleService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> RoleService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    async fn live(&self, tenant_id: i64, id: i64) -> AppResult<role::Model> {
        role::Entity::find_by_id(id)
            .filter(role::Column::TenantId.eq(tenant_id))
            .filter(role::Column::DeletedAt.is_null())
            .one(self.db)
            .await?
            .ok_or_not_found(format!("role {} not found", id))
    }

    async fn ensure_unique(&self, tenant_id: i64, name: &str, code: &str, exclude: Option<i64>) -> AppResult<()> {
        let scoped = || {
            let mut q = role::Entity::find()
                .filter(role::Column::TenantId.eq(tenant_id))
                .filter(role::Column::DeletedAt.is_null());
            if let Some(id) = exclude {
                q = q.filter(role::Column::Id.ne(id));
            }
            q
        };
        if scoped().filter(role::Column::Code.eq(code)).count(self.db).await? > 0 {
            return Err(AppError::DuplicateCode);
        }
        if scoped().filter(role::Column::Name.eq(name)).count(self.db).await? > 0 {
            return Err(AppError::DuplicateName);
        }
        Ok(())
    }

    pub async fn list(&self, ctx: &RequestContext, filter: &RoleFilter, window: Window) -> AppResult<Page<role::Model>> {
        let mut query = role::Entity::find()
            .filter(role::Column::TenantId.eq(ctx.tenant_id()))
            .filter(role::Column::DeletedAt.is_null());
        if !filter.name.trim().is_empty() {
            query = query.filter(role::Column::Name.like(like(&filter.name)));
        }
        if !filter.code.trim().is_empty() {
            query = query.filter(role::Column::Code.like(like(&filter.code)));
        }
        if filter.status >= 0 {
            query = query.filter(role::Column::Status.eq(filter.status));
        }
        if filter.data_scope > 0 {
            query = query.filter(role::Column::DataScope.eq(filter.data_scope));
        }

        let total = query.clone().count(self.db).await?;
        let list = query
            .order_by_asc(role::Column::Sort)
            .order_by_asc(role::Column::Id)
            .offset(window.offset())
            .limit(window.size)
            .all(self.db)
            .await?;
        Ok(Page::new(list, total, window))
    }

    pub async fn detail(&self, ctx: &RequestContext, id: i64) -> AppResult<RoleDetail> {
        let tenant_id = ctx.tenant_id();
        let model = self.live(tenant_id, id).await?;
        let menu_ids = bound_menu_ids(self.db, tenant_id, id).await?;
        let grants = PermissionResolver::new(self.db)
            .resolve_menus_and_permissions(&[id], tenant_id)
            .await?;
        Ok(RoleDetail {
            role: model,
            menu_ids,
            permissions: grants.permissions.into_iter().collect(),
        })
    }

    pub async fn create(&self, ctx: &RequestContext, input: RoleInput) -> AppResult<role::Model> {
        input.validate()?;
        ensure_assignable_code(&input.code)?;
        let tenant_id = ctx.tenant_id();
        self.ensure_unique(tenant_id, &input.name, &input.code, None).await?;
        let menu_ids = dedup_ids(&input.menu_ids);
        ensure_menus_exist(self.db, &menu_ids).await?;

        let ts = now();
        let txn = self.db.begin().await?;
        let created = role::ActiveModel {
            tenant_id: Set(tenant_id),
            name: Set(input.name),
            code: Set(input.code),
            description: Set(input.description),
            status: Set(input.status),
            sort: Set(input.sort),
            data_scope: Set(input.data_scope),
            remark: Set(input.remark),
            created_by: Set(ctx.operator_id()),
            created_at: Set(ts),
            updated_at: Set(ts),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        bind_menus(&txn, tenant_id, created.id, &menu_ids).await?;
        txn.commit().await?;
        Ok(created)
    }

    pub async fn update(&self, ctx: &RequestContext, req: UpdateRole) -> AppResult<role::Model> {
        let input = req.input;
        input.validate()?;
        let tenant_id = ctx.tenant_id();
        let model = self.live(tenant_id, req.id).await?;
        if role_code::is_built_in(&model.code) {
            if model.code != input.code {
                return Err(AppError::BuiltInImmutable);
            }
            if input.status == role::STATUS_DISABLED {
                return Err(AppError::BuiltInImmutable);
            }
        } else if model.code != input.code {
            ensure_assignable_code(&input.code)?;
        }
        self.ensure_unique(tenant_id, &input.name, &input.code, Some(model.id)).await?;
        let menu_ids = dedup_ids(&input.menu_ids);
        ensure_menus_exist(self.db, &menu_ids).await?;

        let txn = self.db.begin().await?;
        let mut active: role::ActiveModel = model.into();
        active.name = Set(input.name);
        active.code = Set(input.code);
        active.description = Set(input.description);
        active.status = Set(input.status);
        active.sort = Set(input.sort);
        active.data_scope = Set(input.data_scope);
        active.remark = Set(input.remark);
        active.updated_at = Set(now());
        let updated = active.update(&txn).await?;
        replace_menus(&txn, tenant_id, updated.id, &menu_ids).await?;
        txn.commit().await?;
        Ok(updated)
    }

    async fn ensure_deletable(&self, model: &role::Model) -> AppResult<()> {
        if role_code::is_built_in(&model.code) {
            return Err(AppError::BuiltInImmutable);
        }
        let holders: Vec<i64> = user_role::Entity::find()
            .filter(user_role::Column::TenantId.eq(model.tenant_id))
            .filter(user_role::Column::RoleId.eq(model.id))
            .filter(user_role::active_at(now()))
            .all(self.db)
            .await?
            .into_iter()
            .map(|ur| ur.user_id)
            .collect();
        if holders.is_empty() {
            return Ok(());
        }
        let live_holders = user::Entity::find()
            .filter(user::Column::Id.is_in(holders))
            .filter(user::Column::DeletedAt.is_null())
            .count(self.db)
            .await?;
        if live_holders > 0 {
            return Err(AppError::InUse(format!(
                "role '{}' is assigned to {} user(s)",
                model.name, live_holders
            )));
        }
        Ok(())
    }

    pub async fn delete(&self, ctx: &RequestContext, id: i64) -> AppResult<()> {
        self.batch_delete(ctx, &[id]).await
    }

    /// Delete several roles. Either every role passes the checks and all are removed, or none are.
    pub async fn batch_delete(&self, ctx: &RequestContext, ids: &[i64]) -> AppResult<()> {
        require_ids("ids", ids)?;
        let tenant_id = ctx.tenant_id();
        let ids = dedup_ids(ids);
        let mut models = Vec::with_capacity(ids.len());
        for id in &ids {
            let model = self.live(tenant_id, *id).await?;
            self.ensure_deletable(&model).await?;
            models.push(model);
        }

        let ts = now();
        let txn = self.db.begin().await?;
        for model in models {
            let mut active: role::ActiveModel = model.into();
            active.deleted_at = Set(Some(ts));
            active.updated_at = Set(ts);
            active.update(&txn).await?;
        }
        role_menu::Entity::delete_many()
            .filter(role_menu::Column::TenantId.eq(tenant_id))
            .filter(role_menu::Column::RoleId.is_in(ids.clone()))
            .exec(&txn)
            .await?;
        user_role::Entity::delete_many()
            .filter(user_role::Column::TenantId.eq(tenant_id))
            .filter(user_role::Column::RoleId.is_in(ids))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn update_status(&self, ctx: &RequestContext, id: i64, status: i32) -> AppResult<()> {
        check_status(status)?;
        let model = self.live(ctx.tenant_id(), id).await?;
        if status == role::STATUS_DISABLED && role_code::is_built_in(&model.code) {
            return Err(AppError::BuiltInImmutable);
        }
        let mut active: role::ActiveModel = model.into();
        active.status = Set(status);
        active.updated_at = Set(now());
        active.update(self.db).await?;
        Ok(())
    }

    /// Duplicate a role under a new name and code, menus included
    pub async fn copy(&self, ctx: &RequestContext, req: CopyRole) -> AppResult<role::Model> {
        check_len("name", &req.name, 1, 50)?;
        check_len("code", &req.code, 1, 50)?;
        ensure_assignable_code(&req.code)?;
        let tenant_id = ctx.tenant_id();
        let source = self.live(tenant_id, req.id).await?;
        self.ensure_unique(tenant_id, &req.name, &req.code, None).await?;
        let menu_ids = bound_menu_ids(self.db, tenant_id, source.id).await?;

        let ts = now();
        let txn = self.db.begin().await?;
        let created = role::ActiveModel {
            tenant_id: Set(tenant_id),
            name: Set(req.name),
            code: Set(req.code),
            description: Set(source.description.clone()),
            status: Set(source.status),
            sort: Set(source.sort),
            data_scope: Set(source.data_scope),
            remark: Set(format!("copied from role {}", source.name)),
            created_by: Set(ctx.operator_id()),
            created_at: Set(ts),
            updated_at: Set(ts),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        bind_menus(&txn, tenant_id, created.id, &menu_ids).await?;
        txn.commit().await?;
        Ok(created)
    }

    pub async fn menus(&self, ctx: &RequestContext, id: i64) -> AppResult<Vec<i64>> {
        let tenant_id = ctx.tenant_id();
        self.live(tenant_id, id).await?;
        bound_menu_ids(self.db, tenant_id, id).await
    }

    pub async fn update_menus(&self, ctx: &RequestContext, id: i64, menu_ids: &[i64]) -> AppResult<()> {
        let tenant_id = ctx.tenant_id();
        self.live(tenant_id, id).await?;
        let menu_ids = dedup_ids(menu_ids);
        ensure_menus_exist(self.db, &menu_ids).await?;

        let txn = self.db.begin().await?;
        replace_menus(&txn, tenant_id, id, &menu_ids).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn permissions(&self, ctx: &RequestContext, id: i64) -> AppResult<Vec<String>> {
        let tenant_id = ctx.tenant_id();
        self.live(tenant_id, id).await?;
        let grants = PermissionResolver::new(self.db)
            .resolve_menus_and_permissions(&[id], tenant_id)
            .await?;
        Ok(grants.permissions.into_iter().collect())
    }

    pub async fn options(&self, ctx: &RequestContext) -> AppResult<Vec<RoleOption>> {
        let rows = role::Entity::find()
            .filter(role::Column::TenantId.eq(ctx.tenant_id()))
            .filter(role::Column::Status.eq(role::STATUS_ENABLED))
            .filter(role::Column::DeletedAt.is_null())
            .order_by_asc(role::Column::Sort)
            .order_by_asc(role::Column::Id)
            .all(self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| RoleOption {
                id: r.id,
                name: r.name,
                code: r.code,
            })
            .collect())
    }

    pub async fn stats(&self, ctx: &RequestContext) -> AppResult<RoleStats> {
        let rows = role::Entity::find()
            .filter(role::Column::TenantId.eq(ctx.tenant_id()))
            .filter(role::Column::DeletedAt.is_null())
            .all(self.db)
            .await?;

        let mut per_scope: HashMap<i32, u64> = HashMap::new();
        for r in &rows {
            *per_scope.entry(r.data_scope).or_default() += 1;
        }
        let enabled = rows.iter().filter(|r| r.is_enabled()).count() as u64;
        Ok(RoleStats {
            total: rows.len() as u64,
            enabled,
            disabled: rows.len() as u64 - enabled,
            built_in: rows.iter().filter(|r| role_code::is_built_in(&r.code)).count() as u64,
            by_data_scope: data_scope::OPTIONS
                .iter()
                .map(|(value, label)| ScopeCount {
                    data_scope: *value,
                    label: *label,
                    count: per_scope.get(value).copied().unwrap_or(0),
                })
                .collect(),
        })
    }

    pub fn data_scopes() -> Vec<ScopeOption> {
        data_scope::OPTIONS
            .iter()
            .map(|(value, label)| ScopeOption {
                value: *value,
                label: *label,
            })
            .collect()
    }

    pub async fn check_users(
        &self,
        ctx: &RequestContext,
        user_ids: &[i64],
        permission: &str,
    ) -> AppResult<HashMap<i64, bool>> {
        PermissionResolver::new(self.db)
            .check_users_permission(user_ids, ctx.tenant_id(), permission)
            .await
    }

    pub async fn filter_users(&self, ctx: &RequestContext, user_ids: &[i64], permission: &str) -> AppResult<Vec<i64>> {
        PermissionResolver::new(self.db)
            .filter_users_by_permission(user_ids, ctx.tenant_id(), permission)
            .await
    }
}

async fn bound_menu_ids<C: ConnectionTrait>(db: &C, tenant_id: i64, role_id: i64) -> AppResult<Vec<i64>> {
    Ok(role_menu::Entity::find()
        .filter(role_menu::Column::TenantId.eq(tenant_id))
        .filter(role_menu::Column::RoleId.eq(role_id))
        .order_by_asc(role_menu::Column::MenuId)
        .all(db)
        .await?
        .into_iter()
        .map(|rm| rm.menu_id)
        .collect())
}

async fn ensure_menus_exist<C: ConnectionTrait>(db: &C, menu_ids: &[i64]) -> AppResult<()> {
    if menu_ids.is_empty() {
        return Ok(());
    }
    let found = menu::Entity::find()
        .filter(menu::Column::Id.is_in(menu_ids.to_vec()))
        .filter(menu::Column::DeletedAt.is_null())
        .count(db)
        .await?;
    if found != menu_ids.len() as u64 {
        return Err(AppError::Validation("menuIds contain unknown menus".to_string()));
    }
    Ok(())
}

async fn bind_menus<C: ConnectionTrait>(db: &C, tenant_id: i64, role_id: i64, menu_ids: &[i64]) -> AppResult<()> {
    if menu_ids.is_empty() {
        return Ok(());
    }
    let ts = now();
    let rows = menu_ids.iter().map(|menu_id| role_menu::ActiveModel {
        tenant_id: Set(tenant_id),
        role_id: Set(role_id),
        menu_id: Set(*menu_id),
        created_at: Set(ts),
        ..Default::default()
    });
    role_menu::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}

async fn replace_menus<C: ConnectionTrait>(db: &C, tenant_id: i64, role_id: i64, menu_ids: &[i64]) -> AppResult<()> {
    role_menu::Entity::delete_many()
        .filter(role_menu::Column::TenantId.eq(tenant_id))
        .filter(role_menu::Column::RoleId.eq(role_id))
        .exec(db)
        .await?;
    bind_menus(db, tenant_id, role_id, menu_ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::context;
    use crate::service::user::UserService;
    use crate::testing::{self, TestData};

    fn input(name: &str, code: &str, menu_ids: Vec<i64>) -> RoleInput {
        RoleInput {
            name: name.to_string(),
            code: code.to_string(),
            description: String::new(),
            status: role::STATUS_ENABLED,
            sort: 0,
            data_scope: data_scope::DEPT,
            remark: String::new(),
            menu_ids,
        }
    }

    #[tokio::test]
    async fn test_create_and_detail() {
        let db = testing::setup_db().await;
        let data = TestData::new(&db);
        let acme = data.tenant("acme").await;
        let page = data.menu(0, 2, "order:list").await;
        let button = data.menu(page.id, 3, "order:refund").await;
        let ctx = context(acme.id, "acme", None);
        let service = RoleService::new(&db);

        let created = service
            .create(&ctx, input("Cashier", "cashier", vec![page.id, button.id, page.id]))
            .await
            .unwrap();
        let detail = service.detail(&ctx, created.id).await.unwrap();
        assert_eq!(detail.menu_ids, vec![page.id, button.id]);
        assert_eq!(detail.permissions, vec!["order:list".to_string(), "order:refund".to_string()]);

        assert!(matches!(
            service.create(&ctx, input("Other", "cashier", vec![])).await,
            Err(AppError::DuplicateCode)
        ));
        assert!(matches!(
            service.create(&ctx, input("Cashier", "cashier2", vec![])).await,
            Err(AppError::DuplicateName)
        ));
        assert!(matches!(
            service.create(&ctx, input("Ghost", "ghost", vec![999])).await,
            Err(AppError::Validation(_))
        ));

        // same code in another tenant is fine
        let other = data.tenant("other").await;
        let other_ctx = context(other.id, "other", None);
        assert!(service.create(&other_ctx, input("Cashier", "cashier", vec![])).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_role_in_use() {
        let db = testing::setup_db().await;
        let data = TestData::new(&db);
        let acme = data.tenant("acme").await;
        let page = data.menu(0, 2, "order:list").await;
        let r = data.role(acme.id, "clerk", 4).await;
        data.bind_menus(acme.id, r.id, &[page.id]).await;
        let u = data.user(acme.id, "alice").await;
        data.assign(acme.id, u.id, r.id, true).await;
        let ctx = context(acme.id, "acme", None);
        let service = RoleService::new(&db);

        assert!(matches!(service.delete(&ctx, r.id).await, Err(AppError::InUse(_))));
        let still = role::Entity::find_by_id(r.id).one(&db).await.unwrap().unwrap();
        assert!(still.deleted_at.is_none());
        assert_eq!(service.menus(&ctx, r.id).await.unwrap(), vec![page.id]);

        // removing the last assignment frees the role
        UserService::new(&db).remove_roles(&ctx, u.id, &[r.id]).await.unwrap();
        service.delete(&ctx, r.id).await.unwrap();
        assert!(matches!(service.detail(&ctx, r.id).await, Err(AppError::NotFound(_))));
        let bindings = role_menu::Entity::find()
            .filter(role_menu::Column::RoleId.eq(r.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(bindings, 0);
    }

    #[tokio::test]
    async fn test_expired_assignment_does_not_block_delete() {
        let db = testing::setup_db().await;
        let data = TestData::new(&db);
        let acme = data.tenant("acme").await;
        let r = data.role(acme.id, "seasonal", 4).await;
        let u = data.user(acme.id, "bob").await;
        data.assign_until(acme.id, u.id, r.id, Some(now() - 5)).await;
        let ctx = context(acme.id, "acme", None);

        RoleService::new(&db).delete(&ctx, r.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_batch_delete_is_all_or_nothing() {
        let db = testing::setup_db().await;
        let data = TestData::new(&db);
        let acme = data.tenant("acme").await;
        let free = data.role(acme.id, "free", 4).await;
        let builtin = data.role(acme.id, role_code::AUDITOR, 4).await;
        let ctx = context(acme.id, "acme", None);
        let service = RoleService::new(&db);

        assert!(matches!(
            service.batch_delete(&ctx, &[free.id, builtin.id]).await,
            Err(AppError::BuiltInImmutable)
        ));
        assert!(service.detail(&ctx, free.id).await.is_ok());
        service.batch_delete(&ctx, &[free.id]).await.unwrap();
        assert!(service.detail(&ctx, free.id).await.is_err());
    }

    #[tokio::test]
    async fn test_built_in_rules() {
        let db = testing::setup_db().await;
        let data = TestData::new(&db);
        let acme = data.tenant("acme").await;
        let builtin = data.role(acme.id, role_code::OPERATOR, 4).await;
        let ctx = context(acme.id, "acme", None);
        let service = RoleService::new(&db);

        assert!(matches!(
            service.update_status(&ctx, builtin.id, role::STATUS_DISABLED).await,
            Err(AppError::BuiltInImmutable)
        ));
        let renamed = UpdateRole {
            id: builtin.id,
            input: input("Operators", "ops", vec![]),
        };
        assert!(matches!(service.update(&ctx, renamed).await, Err(AppError::BuiltInImmutable)));
        let relabelled = UpdateRole {
            id: builtin.id,
            input: input("Operators", role_code::OPERATOR, vec![]),
        };
        assert_eq!(service.update(&ctx, relabelled).await.unwrap().name, "Operators");
    }

    #[tokio::test]
    async fn test_reserved_codes_cannot_be_minted() {
        let db = testing::setup_db().await;
        let data = TestData::new(&db);
        let acme = data.tenant("acme").await;
        let clerk = data.role(acme.id, "clerk", 4).await;
        let ctx = context(acme.id, "acme", None);
        let service = RoleService::new(&db);

        for code in [role_code::SYSTEM_ADMIN, role_code::SUPER_ADMIN, role_code::AUDITOR, role_code::TENANT_ADMIN] {
            assert!(matches!(
                service.create(&ctx, input("Sneaky", code, vec![])).await,
                Err(AppError::Validation(_))
            ));
        }
        let promoted = UpdateRole {
            id: clerk.id,
            input: input("Role clerk", role_code::SYSTEM_ADMIN, vec![]),
        };
        assert!(matches!(service.update(&ctx, promoted).await, Err(AppError::Validation(_))));
        let copied = CopyRole {
            id: clerk.id,
            name: "Clerk admin".to_string(),
            code: role_code::SUPER_ADMIN.to_string(),
        };
        assert!(matches!(service.copy(&ctx, copied).await, Err(AppError::Validation(_))));

        let codes: Vec<String> = role::Entity::find()
            .filter(role::Column::TenantId.eq(acme.id))
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.code)
            .collect();
        assert_eq!(codes, vec!["clerk".to_string()]);
    }

    #[tokio::test]
    async fn test_copy_and_stats() {
        let db = testing::setup_db().await;
        let data = TestData::new(&db);
        let acme = data.tenant("acme").await;
        let page = data.menu(0, 2, "order:list").await;
        let source = data.role(acme.id, "clerk", 2).await;
        data.bind_menus(acme.id, source.id, &[page.id]).await;
        let ctx = context(acme.id, "acme", None);
        let service = RoleService::new(&db);

        let copy = service
            .copy(
                &ctx,
                CopyRole {
                    id: source.id,
                    name: "Clerk copy".to_string(),
                    code: "clerk_copy".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(copy.remark, "copied from role Role clerk");
        assert_eq!(copy.data_scope, 2);
        assert_eq!(service.menus(&ctx, copy.id).await.unwrap(), vec![page.id]);

        service.update_status(&ctx, copy.id, role::STATUS_DISABLED).await.unwrap();
        let stats = service.stats(&ctx).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.enabled, 1);
        assert_eq!(stats.disabled, 1);
        assert_eq!(stats.by_data_scope[1].count, 2);

        let options = service.options(&ctx).await.unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(RoleService::data_scopes().len(), 5);
    }

    #[tokio::test]
    async fn test_update_menus_replaces_bindings() {
        let db = testing::setup_db().await;
        let data = TestData::new(&db);
        let acme = data.tenant("acme").await;
        let a = data.menu(0, 2, "a:list").await;
        let b = data.menu(0, 2, "b:list").await;
        let r = data.role(acme.id, "clerk", 4).await;
        data.bind_menus(acme.id, r.id, &[a.id]).await;
        let ctx = context(acme.id, "acme", None);
        let service = RoleService::new(&db);

        service.update_menus(&ctx, r.id, &[b.id]).await.unwrap();
        assert_eq!(service.permissions(&ctx, r.id).await.unwrap(), vec!["b:list".to_string()]);
        service.update_menus(&ctx, r.id, &[]).await.unwrap();
        assert!(service.menus(&ctx, r.id).await.unwrap().is_empty());
    }
}
