//! Login, token refresh and the caller's own account

use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use super::{check_len, now, tenant::TenantService};
use crate::captcha::CaptchaChallenge;
use crate::context::{Identity, RequestContext};
use crate::entity::user::{UserInfo, UserStatus};
use crate::entity::{menu, tenant, user};
use crate::error::{AppError, AppResult};
use crate::permission::{data_scope, PermissionResolver};
use crate::state::AppState;
use crate::token::Claims;
use crate::tree::{self, MenuTreeNode, RouterNode};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub tenant_code: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub captcha_id: String,
    #[serde(default)]
    pub captcha: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user_info: UserInfo,
    pub permissions: Vec<String>,
    pub menu_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub user: UserInfo,
    pub tenant_code: String,
    pub tenant_name: String,
    pub role_id: i64,
    pub role_key: String,
    pub role_codes: Vec<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSummary {
    pub permissions: Vec<String>,
    pub menu_ids: Vec<i64>,
    pub data_scope: i32,
}

pub struct SessionService<'a> {
    state: &'a AppState,
}

impl<'a> SessionService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub fn captcha(&self) -> CaptchaChallenge {
        self.state.captcha.issue()
    }

    /// Authenticate with username and password inside a tenant.
    ///
    /// The tenant comes from `tenantCode` and falls back to the resolved request tenant.
    pub async fn login(&self, ctx: &RequestContext, req: LoginRequest) -> AppResult<LoginResult> {
        self.state.captcha.verify(&req.captcha_id, &req.captcha)?;

        let tenants = TenantService::new(&self.state.db);
        let tenant_code = if req.tenant_code.trim().is_empty() {
            ctx.tenant.code.clone()
        } else {
            req.tenant_code.trim().to_string()
        };
        let tenant = tenants.usable_by_code(&tenant_code).await?;

        let account = user::Entity::find()
            .filter(user::Column::TenantId.eq(tenant.id))
            .filter(user::Column::Username.eq(req.username.trim()))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.state.db)
            .await?;
        // Unknown users and wrong passwords are indistinguishable to the caller
        let account = match account {
            Some(u) if self.state.hasher.verify(&req.password, &u.password) => u,
            _ => return Err(AppError::InvalidCredentials),
        };
        ensure_active(&account)?;

        let result = self.issue_session(&tenant, &account).await?;

        let login_count = account.login_count + 1;
        let mut active: user::ActiveModel = account.into();
        active.login_at = Set(Some(now()));
        active.login_count = Set(login_count);
        active.login_ip = Set(ctx.client_ip.clone().unwrap_or_default());
        active.update(&self.state.db).await?;

        Ok(result)
    }

    /// Trade a refresh token for a new token pair. The refresh token is consumed first.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<LoginResult> {
        let user_id = self.state.refresh_tokens.redeem(refresh_token)?;

        let account = user::Entity::find_by_id(user_id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.state.db)
            .await?
            .ok_or(AppError::UserNotFound)?;
        ensure_active(&account)?;

        let scope = TenantService::new(&self.state.db)
            .validate_access(account.tenant_id)
            .await?;
        let tenant = tenant::Entity::find_by_id(scope.id)
            .one(&self.state.db)
            .await?
            .ok_or(AppError::TenantNotFound)?;
        self.issue_session(&tenant, &account).await
    }

    async fn issue_session(&self, tenant: &tenant::Model, account: &user::Model) -> AppResult<LoginResult> {
        let resolver = PermissionResolver::new(&self.state.db);
        let primary = resolver
            .primary_role(account.id, tenant.id)
            .await?
            .ok_or(AppError::RoleMissing)?;
        let grants = resolver.user_grants(account.id, tenant.id).await?;

        let claims = Claims {
            user_id: account.id,
            tenant_id: tenant.id,
            tenant_code: tenant.code.clone(),
            username: account.username.clone(),
            role_id: primary.id,
            role_key: primary.code,
            dept_id: account.dept_id,
            app: self.state.config.jwt.app.clone(),
            ..Default::default()
        };
        let (access_token, claims) = self.state.tokens.issue(claims)?;
        let refresh_token = self.state.refresh_tokens.issue(account.id);

        Ok(LoginResult {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: claims.exp - claims.iat,
            user_info: account.clone().into(),
            permissions: grants.permissions.into_iter().collect(),
            menu_ids: grants.menu_ids.into_iter().collect(),
        })
    }

    /// Build the caller identity for verified claims from a live user row
    pub async fn identify(&self, claims: &Claims) -> AppResult<Identity> {
        let account = user::Entity::find_by_id(claims.user_id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.state.db)
            .await?
            .ok_or(AppError::UserNotFound)?;
        ensure_active(&account)?;

        Ok(Identity {
            user_id: account.id,
            tenant_id: account.tenant_id,
            tenant_code: claims.tenant_code.clone(),
            username: account.username,
            real_name: account.real_name,
            role_id: claims.role_id,
            role_key: claims.role_key.clone(),
            dept_id: account.dept_id,
            app: claims.app.clone(),
            login_at: claims.iat,
        })
    }

    /// Revoke an access token for the rest of its lifetime
    pub fn logout(&self, token: &str, exp: i64) {
        self.state.blacklist.revoke(token, exp);
    }

    pub async fn profile(&self, ctx: &RequestContext) -> AppResult<Profile> {
        let identity = ctx.require_identity()?;
        let account = self.current_user(identity).await?;
        let resolver = PermissionResolver::new(&self.state.db);
        let roles = resolver.active_roles(identity.user_id, identity.tenant_id).await?;
        let permissions = resolver.user_permissions(identity.user_id, identity.tenant_id).await?;

        Ok(Profile {
            user: account.into(),
            tenant_code: identity.tenant_code.clone(),
            tenant_name: ctx.tenant.name.clone(),
            role_id: identity.role_id,
            role_key: identity.role_key.clone(),
            role_codes: roles.into_iter().map(|r| r.code).collect(),
            permissions,
        })
    }

    pub async fn change_password(&self, ctx: &RequestContext, req: ChangePassword) -> AppResult<()> {
        let identity = ctx.require_identity()?;
        check_len("newPassword", &req.new_password, 6, 32)?;
        let account = self.current_user(identity).await?;
        if !self.state.hasher.verify(&req.old_password, &account.password) {
            return Err(AppError::InvalidCredentials);
        }

        let hashed = self.state.hasher.hash(&req.new_password)?;
        let mut active: user::ActiveModel = account.into();
        active.password = Set(hashed);
        active.updated_at = Set(now());
        active.update(&self.state.db).await?;
        Ok(())
    }

    /// Enabled, visible menus the caller holds, as a tree
    pub async fn menus(&self, ctx: &RequestContext) -> AppResult<Vec<MenuTreeNode>> {
        let menus = self.held_menus(ctx).await?;
        tree::build_menu_tree(menus.into_iter().filter(|m| m.visible == 1).collect())
    }

    pub async fn routers(&self, ctx: &RequestContext) -> AppResult<Vec<RouterNode>> {
        let menus = self.held_menus(ctx).await?;
        tree::build_router_tree(menus)
    }

    pub async fn permissions(&self, ctx: &RequestContext) -> AppResult<PermissionSummary> {
        let identity = ctx.require_identity()?;
        let resolver = PermissionResolver::new(&self.state.db);
        let grants = resolver.user_grants(identity.user_id, identity.tenant_id).await?;
        let scope = resolver.user_data_scope(identity.user_id, identity.tenant_id).await?;
        Ok(PermissionSummary {
            permissions: grants.permissions.into_iter().collect(),
            menu_ids: grants.menu_ids.into_iter().collect(),
            data_scope: if data_scope::is_valid(scope) { scope } else { data_scope::SELF },
        })
    }

    async fn held_menus(&self, ctx: &RequestContext) -> AppResult<Vec<menu::Model>> {
        let identity = ctx.require_identity()?;
        let ids = PermissionResolver::new(&self.state.db)
            .user_menu_ids(identity.user_id, identity.tenant_id)
            .await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(menu::Entity::find()
            .filter(menu::Column::Id.is_in(ids))
            .filter(menu::Column::Status.eq(menu::STATUS_ENABLED))
            .filter(menu::Column::DeletedAt.is_null())
            .order_by_asc(menu::Column::Sort)
            .order_by_asc(menu::Column::Id)
            .all(&self.state.db)
            .await?)
    }

    async fn current_user(&self, identity: &Identity) -> AppResult<user::Model> {
        user::Entity::find_by_id(identity.user_id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.state.db)
            .await?
            .ok_or(AppError::UserNotFound)
    }
}

fn ensure_active(account: &user::Model) -> AppResult<()> {
    match account.status() {
        Some(UserStatus::Normal) => Ok(()),
        Some(UserStatus::Locked) => Err(AppError::UserLocked),
        Some(UserStatus::Disabled) | None => Err(AppError::UserDisabled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::fixtures::context;
    use crate::context::TenantScope;
    use crate::testing::{self, TestData};

    fn state(db: sea_orm::DatabaseConnection) -> AppState {
        let mut config = Config::default();
        config.captcha.enabled = false;
        config.security.bcrypt_cost = 4;
        AppState::new(db, config)
    }

    fn login_req(tenant: &str, username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            tenant_code: tenant.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            captcha_id: String::new(),
            captcha: String::new(),
        }
    }

    async fn acme_user(db: &sea_orm::DatabaseConnection) -> (tenant::Model, user::Model) {
        let data = TestData::new(db);
        let acme = data.tenant("acme").await;
        let page = data.menu(0, 2, "order:list").await;
        let role = data.role(acme.id, "clerk", 4).await;
        data.bind_menus(acme.id, role.id, &[page.id]).await;
        let user = data.user(acme.id, "alice").await;
        data.assign(acme.id, user.id, role.id, true).await;
        (acme, user)
    }

    #[tokio::test]
    async fn test_login_issues_tokens() {
        let db = testing::setup_db().await;
        let (acme, alice) = acme_user(&db).await;
        let state = state(db);
        let service = SessionService::new(&state);
        let ctx = context(acme.id, "acme", None);

        let result = service.login(&ctx, login_req("acme", "alice", testing::PASSWORD)).await.unwrap();
        assert_eq!(result.token_type, "Bearer");
        assert_eq!(result.expires_in, 86400);
        assert_eq!(result.permissions, vec!["order:list".to_string()]);

        let claims = state.tokens.verify(&result.access_token).unwrap();
        assert_eq!(claims.user_id, alice.id);
        assert_eq!(claims.tenant_code, "acme");
        assert_eq!(claims.role_key, "clerk");

        let stored = user::Entity::find_by_id(alice.id).one(&state.db).await.unwrap().unwrap();
        assert_eq!(stored.login_count, 1);
        assert!(stored.login_at.is_some());
    }

    #[tokio::test]
    async fn test_login_rejections() {
        let db = testing::setup_db().await;
        let (acme, alice) = acme_user(&db).await;
        let data = TestData::new(&db);
        let roleless = data.user(acme.id, "bob").await;
        let state = state(db);
        let service = SessionService::new(&state);
        let ctx = context(acme.id, "acme", None);

        assert!(matches!(
            service.login(&ctx, login_req("acme", "alice", "wrong-pass")).await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login(&ctx, login_req("acme", "nobody", testing::PASSWORD)).await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login(&ctx, login_req("ghost", "alice", testing::PASSWORD)).await,
            Err(AppError::TenantNotFound)
        ));
        assert!(matches!(
            service.login(&ctx, login_req("acme", &roleless.username, testing::PASSWORD)).await,
            Err(AppError::RoleMissing)
        ));

        let mut active: user::ActiveModel = alice.into();
        active.status = Set(UserStatus::Locked.into());
        active.update(&state.db).await.unwrap();
        assert!(matches!(
            service.login(&ctx, login_req("acme", "alice", testing::PASSWORD)).await,
            Err(AppError::UserLocked)
        ));
    }

    #[tokio::test]
    async fn test_login_to_inactive_tenant() {
        let db = testing::setup_db().await;
        let (acme, _) = acme_user(&db).await;
        let state = state(db);
        let service = SessionService::new(&state);
        let ctx = context(acme.id, "acme", None);

        let mut active: tenant::ActiveModel = acme.clone().into();
        active.expire_at = Set(Some(now() - 1));
        let acme = active.update(&state.db).await.unwrap();
        assert!(matches!(
            service.login(&ctx, login_req("acme", "alice", testing::PASSWORD)).await,
            Err(AppError::TenantExpired)
        ));

        let mut active: tenant::ActiveModel = acme.into();
        active.expire_at = Set(None);
        active.status = Set(3);
        active.update(&state.db).await.unwrap();
        assert!(matches!(
            service.login(&ctx, login_req("acme", "alice", testing::PASSWORD)).await,
            Err(AppError::TenantInactive)
        ));
    }

    #[tokio::test]
    async fn test_refresh_token_is_single_use() {
        let db = testing::setup_db().await;
        let (acme, alice) = acme_user(&db).await;
        let state = state(db);
        let service = SessionService::new(&state);
        let ctx = context(acme.id, "acme", None);

        let first = service.login(&ctx, login_req("acme", "alice", testing::PASSWORD)).await.unwrap();
        let second = service.refresh(&first.refresh_token).await.unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);
        assert_eq!(state.tokens.verify(&second.access_token).unwrap().user_id, alice.id);

        assert!(matches!(service.refresh(&first.refresh_token).await, Err(AppError::TokenInvalid)));
        assert!(service.refresh(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_disabled_user() {
        let db = testing::setup_db().await;
        let (acme, alice) = acme_user(&db).await;
        let state = state(db);
        let service = SessionService::new(&state);
        let ctx = context(acme.id, "acme", None);
        let first = service.login(&ctx, login_req("acme", "alice", testing::PASSWORD)).await.unwrap();

        let stored = user::Entity::find_by_id(alice.id).one(&state.db).await.unwrap().unwrap();
        let mut active: user::ActiveModel = stored.into();
        active.status = Set(UserStatus::Disabled.into());
        active.update(&state.db).await.unwrap();

        assert!(matches!(service.refresh(&first.refresh_token).await, Err(AppError::UserDisabled)));
        // consumed even though the refresh failed
        assert!(matches!(service.refresh(&first.refresh_token).await, Err(AppError::TokenInvalid)));
    }

    #[tokio::test]
    async fn test_change_password_and_summary() {
        let db = testing::setup_db().await;
        let (acme, alice) = acme_user(&db).await;
        let state = state(db);
        let service = SessionService::new(&state);
        let login = service
            .login(&context(acme.id, "acme", None), login_req("acme", "alice", testing::PASSWORD))
            .await
            .unwrap();
        let claims = state.tokens.verify(&login.access_token).unwrap();
        let identity = service.identify(&claims).await.unwrap();
        let ctx = RequestContext {
            tenant: TenantScope {
                id: acme.id,
                code: "acme".to_string(),
                name: acme.name.clone(),
            },
            identity: Some(identity),
            client_ip: None,
        };

        let summary = service.permissions(&ctx).await.unwrap();
        assert_eq!(summary.data_scope, data_scope::SELF);
        assert_eq!(summary.permissions, vec!["order:list".to_string()]);
        assert_eq!(service.routers(&ctx).await.unwrap().len(), 1);

        let bad = ChangePassword {
            old_password: "nope".to_string(),
            new_password: "newsecret".to_string(),
        };
        assert!(matches!(service.change_password(&ctx, bad).await, Err(AppError::InvalidCredentials)));
        let short = ChangePassword {
            old_password: testing::PASSWORD.to_string(),
            new_password: "123".to_string(),
        };
        assert!(matches!(service.change_password(&ctx, short).await, Err(AppError::Validation(_))));
        let good = ChangePassword {
            old_password: testing::PASSWORD.to_string(),
            new_password: "newsecret".to_string(),
        };
        service.change_password(&ctx, good).await.unwrap();

        let profile = service.profile(&ctx).await.unwrap();
        assert_eq!(profile.user.id, alice.id);
        assert_eq!(profile.role_codes, vec!["clerk".to_string()]);
        assert!(service
            .login(&context(acme.id, "acme", None), login_req("acme", "alice", "newsecret"))
            .await
            .is_ok());
    }
}
