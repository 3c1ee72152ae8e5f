//! User management inside the request tenant

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{check_email, check_len, dedup_ids, like, now, require_ids, Page, Window};
use crate::context::RequestContext;
use crate::entity::user::{UserInfo, UserStatus};
use crate::entity::{role, tenant, user, user_role};
use crate::error::{AppError, AppResult, OptionExt};
use crate::password::PasswordHasher;
use crate::permission::PermissionResolver;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub real_name: String,
    /// 0 means any
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub dept_id: i64,
    #[serde(default)]
    pub role_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub real_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub dept_id: i64,
    #[serde(default = "default_status")]
    pub status: i32,
    #[serde(default)]
    pub role_ids: Vec<i64>,
    #[serde(default)]
    pub remark: String,
}

fn default_status() -> i32 {
    UserStatus::Normal.into()
}

impl CreateUser {
    fn validate(&self) -> AppResult<()> {
        check_len("username", &self.username, 3, 50)?;
        check_len("password", &self.password, 6, 32)?;
        check_profile(&self.real_name, &self.email, &self.phone, &self.avatar, &self.remark)?;
        if UserStatus::from_i32(self.status).is_none() {
            return Err(AppError::Validation("status must be 1, 2 or 3".to_string()));
        }
        require_ids("roleIds", &self.role_ids)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub id: i64,
    pub real_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub dept_id: i64,
    #[serde(default)]
    pub remark: String,
}

fn check_profile(real_name: &str, email: &str, phone: &str, avatar: &str, remark: &str) -> AppResult<()> {
    check_len("realName", real_name, 2, 50)?;
    if !email.is_empty() {
        check_len("email", email, 0, 100)?;
        check_email("email", email)?;
    }
    check_len("phone", phone, 0, 20)?;
    check_len("avatar", avatar, 0, 255)?;
    check_len("remark", remark, 0, 500)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: UserInfo,
    pub role_ids: Vec<i64>,
    pub role_codes: Vec<String>,
    pub primary_role_id: Option<i64>,
    pub permissions: Vec<String>,
    pub data_scope: i32,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignedRole {
    pub role_id: i64,
    pub code: String,
    pub name: String,
    pub is_primary: bool,
    pub expires_at: Option<i64>,
}

pub struct UserService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    async fn live(&self, tenant_id: i64, id: i64) -> AppResult<user::Model> {
        user::Entity::find_by_id(id)
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::DeletedAt.is_null())
            .one(self.db)
            .await?
            .ok_or_not_found(format!("user {} not found", id))
    }

    pub async fn list(&self, ctx: &RequestContext, filter: &UserFilter, window: Window) -> AppResult<Page<UserInfo>> {
        let tenant_id = ctx.tenant_id();
        let mut query = user::Entity::find()
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::DeletedAt.is_null());
        if !filter.username.trim().is_empty() {
            query = query.filter(user::Column::Username.like(like(&filter.username)));
        }
        if !filter.real_name.trim().is_empty() {
            query = query.filter(user::Column::RealName.like(like(&filter.real_name)));
        }
        if filter.status > 0 {
            query = query.filter(user::Column::Status.eq(filter.status));
        }
        if filter.dept_id > 0 {
            query = query.filter(user::Column::DeptId.eq(filter.dept_id));
        }
        if filter.role_id > 0 {
            let holders: Vec<i64> = user_role::Entity::find()
                .filter(user_role::Column::TenantId.eq(tenant_id))
                .filter(user_role::Column::RoleId.eq(filter.role_id))
                .all(self.db)
                .await?
                .into_iter()
                .map(|ur| ur.user_id)
                .collect();
            if holders.is_empty() {
                return Ok(Page::new(Vec::new(), 0, window));
            }
            query = query.filter(user::Column::Id.is_in(holders));
        }

        let total = query.clone().count(self.db).await?;
        let list = query
            .order_by_desc(user::Column::Id)
            .offset(window.offset())
            .limit(window.size)
            .all(self.db)
            .await?
            .into_iter()
            .map(UserInfo::from)
            .collect();
        Ok(Page::new(list, total, window))
    }

    pub async fn detail(&self, ctx: &RequestContext, id: i64) -> AppResult<UserDetail> {
        let tenant_id = ctx.tenant_id();
        let model = self.live(tenant_id, id).await?;
        let resolver = PermissionResolver::new(self.db);
        let roles = resolver.active_roles(id, tenant_id).await?;
        let primary = resolver.primary_role(id, tenant_id).await?;
        let permissions = resolver.user_permissions(id, tenant_id).await?;
        let data_scope = resolver.user_data_scope(id, tenant_id).await?;

        Ok(UserDetail {
            user: model.into(),
            role_ids: roles.iter().map(|r| r.id).collect(),
            role_codes: roles.into_iter().map(|r| r.code).collect(),
            primary_role_id: primary.map(|r| r.id),
            permissions,
            data_scope,
        })
    }

    /// Create a user with its role assignments. The first role becomes primary.
    pub async fn create(&self, ctx: &RequestContext, hasher: PasswordHasher, req: CreateUser) -> AppResult<UserInfo> {
        req.validate()?;
        let tenant_id = ctx.tenant_id();
        let role_ids = dedup_ids(&req.role_ids);
        ensure_roles_in_tenant(self.db, tenant_id, &role_ids).await?;

        let taken = user::Entity::find()
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::Username.eq(req.username.as_str()))
            .filter(user::Column::DeletedAt.is_null())
            .count(self.db)
            .await?
            > 0;
        if taken {
            return Err(AppError::DuplicateName);
        }

        let tenant = tenant::Entity::find_by_id(tenant_id)
            .one(self.db)
            .await?
            .ok_or(AppError::TenantNotFound)?;
        let current = user::Entity::find()
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::DeletedAt.is_null())
            .count(self.db)
            .await?;
        if current >= tenant.max_users.max(0) as u64 {
            return Err(AppError::QuotaExceeded);
        }

        let password = hasher.hash(&req.password)?;
        let ts = now();
        let operator = ctx.operator_id();
        let txn = self.db.begin().await?;

        let created = user::ActiveModel {
            tenant_id: Set(tenant_id),
            username: Set(req.username),
            password: Set(password),
            real_name: Set(req.real_name),
            email: Set(req.email),
            phone: Set(req.phone),
            avatar: Set(req.avatar),
            dept_id: Set(req.dept_id),
            status: Set(req.status),
            login_ip: Set(String::new()),
            login_at: Set(None),
            login_count: Set(0),
            remark: Set(req.remark),
            created_by: Set(operator),
            created_at: Set(ts),
            updated_at: Set(ts),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        insert_assignments(&txn, tenant_id, created.id, &role_ids, operator, None).await?;

        txn.commit().await?;
        Ok(created.into())
    }

    pub async fn update(&self, ctx: &RequestContext, req: UpdateUser) -> AppResult<UserInfo> {
        check_profile(&req.real_name, &req.email, &req.phone, &req.avatar, &req.remark)?;
        let model = self.live(ctx.tenant_id(), req.id).await?;

        let mut active: user::ActiveModel = model.into();
        active.real_name = Set(req.real_name);
        active.email = Set(req.email);
        active.phone = Set(req.phone);
        active.avatar = Set(req.avatar);
        active.dept_id = Set(req.dept_id);
        active.remark = Set(req.remark);
        active.updated_at = Set(now());
        Ok(active.update(self.db).await?.into())
    }

    pub async fn update_status(&self, ctx: &RequestContext, id: i64, status: i32) -> AppResult<()> {
        if UserStatus::from_i32(status).is_none() {
            return Err(AppError::Validation("status must be 1, 2 or 3".to_string()));
        }
        if id == ctx.operator_id() && status != i32::from(UserStatus::Normal) {
            return Err(AppError::Validation("you cannot lock or disable yourself".to_string()));
        }
        let model = self.live(ctx.tenant_id(), id).await?;

        let mut active: user::ActiveModel = model.into();
        active.status = Set(status);
        active.updated_at = Set(now());
        active.update(self.db).await?;
        Ok(())
    }

    /// Soft delete. Neither the caller nor the tenant administrator can be deleted.
    pub async fn delete(&self, ctx: &RequestContext, id: i64) -> AppResult<()> {
        if id == ctx.operator_id() {
            return Err(AppError::Validation("you cannot delete yourself".to_string()));
        }
        let tenant_id = ctx.tenant_id();
        let model = self.live(tenant_id, id).await?;
        let is_tenant_admin = tenant::Entity::find_by_id(tenant_id)
            .one(self.db)
            .await?
            .map_or(false, |t| t.admin_user_id == id);
        if is_tenant_admin {
            return Err(AppError::BuiltInImmutable);
        }

        let ts = now();
        let txn = self.db.begin().await?;
        let mut active: user::ActiveModel = model.into();
        active.deleted_at = Set(Some(ts));
        active.updated_at = Set(ts);
        active.update(&txn).await?;
        user_role::Entity::delete_many()
            .filter(user_role::Column::TenantId.eq(tenant_id))
            .filter(user_role::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }

    /// Assigned roles, primary first
    pub async fn roles(&self, ctx: &RequestContext, id: i64) -> AppResult<Vec<AssignedRole>> {
        let tenant_id = ctx.tenant_id();
        self.live(tenant_id, id).await?;

        let assignments = user_role::Entity::find()
            .filter(user_role::Column::TenantId.eq(tenant_id))
            .filter(user_role::Column::UserId.eq(id))
            .order_by_desc(user_role::Column::IsPrimary)
            .order_by_asc(user_role::Column::Id)
            .all(self.db)
            .await?;
        if assignments.is_empty() {
            return Ok(Vec::new());
        }
        let roles: HashMap<i64, role::Model> = role::Entity::find()
            .filter(role::Column::Id.is_in(assignments.iter().map(|a| a.role_id).collect::<Vec<_>>()))
            .filter(role::Column::DeletedAt.is_null())
            .all(self.db)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        Ok(assignments
            .into_iter()
            .filter_map(|a| {
                roles.get(&a.role_id).map(|r| AssignedRole {
                    role_id: r.id,
                    code: r.code.clone(),
                    name: r.name.clone(),
                    is_primary: a.is_primary == 1,
                    expires_at: a.expires_at,
                })
            })
            .collect())
    }

    /// Replace every assignment. The first role becomes primary.
    pub async fn assign_roles(
        &self,
        ctx: &RequestContext,
        id: i64,
        role_ids: &[i64],
        expires_at: Option<i64>,
    ) -> AppResult<()> {
        require_ids("roleIds", role_ids)?;
        let tenant_id = ctx.tenant_id();
        self.live(tenant_id, id).await?;
        let role_ids = dedup_ids(role_ids);
        ensure_roles_in_tenant(self.db, tenant_id, &role_ids).await?;

        let txn = self.db.begin().await?;
        user_role::Entity::delete_many()
            .filter(user_role::Column::TenantId.eq(tenant_id))
            .filter(user_role::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        insert_assignments(&txn, tenant_id, id, &role_ids, ctx.operator_id(), expires_at).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Drop some assignments. If the primary goes, the oldest remaining one takes over.
    pub async fn remove_roles(&self, ctx: &RequestContext, id: i64, role_ids: &[i64]) -> AppResult<()> {
        require_ids("roleIds", role_ids)?;
        let tenant_id = ctx.tenant_id();
        self.live(tenant_id, id).await?;

        let current = user_role::Entity::find()
            .filter(user_role::Column::TenantId.eq(tenant_id))
            .filter(user_role::Column::UserId.eq(id))
            .order_by_asc(user_role::Column::Id)
            .all(self.db)
            .await?;
        let (removed, kept): (Vec<_>, Vec<_>) = current.into_iter().partition(|a| role_ids.contains(&a.role_id));
        if removed.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin().await?;
        user_role::Entity::delete_many()
            .filter(user_role::Column::Id.is_in(removed.iter().map(|a| a.id).collect::<Vec<_>>()))
            .exec(&txn)
            .await?;
        let lost_primary = removed.iter().any(|a| a.is_primary == 1);
        let needs_heir = lost_primary && !kept.iter().any(|a| a.is_primary == 1);
        if let Some(heir) = kept.first().filter(|_| needs_heir) {
            user_role::Entity::update_many()
                .col_expr(user_role::Column::IsPrimary, Expr::value(1))
                .filter(user_role::Column::Id.eq(heir.id))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn set_primary_role(&self, ctx: &RequestContext, id: i64, role_id: i64) -> AppResult<()> {
        let tenant_id = ctx.tenant_id();
        self.live(tenant_id, id).await?;
        let assignment = user_role::Entity::find()
            .filter(user_role::Column::TenantId.eq(tenant_id))
            .filter(user_role::Column::UserId.eq(id))
            .filter(user_role::Column::RoleId.eq(role_id))
            .one(self.db)
            .await?
            .ok_or_not_found(format!("role {} is not assigned to user {}", role_id, id))?;

        let txn = self.db.begin().await?;
        user_role::Entity::update_many()
            .col_expr(user_role::Column::IsPrimary, Expr::value(0))
            .filter(user_role::Column::TenantId.eq(tenant_id))
            .filter(user_role::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        user_role::Entity::update_many()
            .col_expr(user_role::Column::IsPrimary, Expr::value(1))
            .filter(user_role::Column::Id.eq(assignment.id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(())
    }
}

async fn ensure_roles_in_tenant<C: ConnectionTrait>(db: &C, tenant_id: i64, role_ids: &[i64]) -> AppResult<()> {
    let found = role::Entity::find()
        .filter(role::Column::Id.is_in(role_ids.to_vec()))
        .filter(role::Column::TenantId.eq(tenant_id))
        .filter(role::Column::DeletedAt.is_null())
        .count(db)
        .await?;
    if found != role_ids.len() as u64 {
        return Err(AppError::Validation("roleIds contain roles outside this tenant".to_string()));
    }
    Ok(())
}

async fn insert_assignments<C: ConnectionTrait>(
    db: &C,
    tenant_id: i64,
    user_id: i64,
    role_ids: &[i64],
    assigned_by: i64,
    expires_at: Option<i64>,
) -> AppResult<()> {
    let ts = now();
    let rows = role_ids.iter().enumerate().map(|(i, role_id)| user_role::ActiveModel {
        tenant_id: Set(tenant_id),
        user_id: Set(user_id),
        role_id: Set(*role_id),
        is_primary: Set(i32::from(i == 0)),
        assigned_by: Set(assigned_by),
        expires_at: Set(expires_at),
        created_at: Set(ts),
        ..Default::default()
    });
    user_role::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}
