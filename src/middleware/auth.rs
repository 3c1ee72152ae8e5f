//! Authentication and authorization gate
//!
//! Runs after tenant resolution. Verifies the bearer token, reloads the
//! user, enforces tenant isolation and finally checks the permission key
//! derived from the route path.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::log_security_event;
use crate::context::RequestContext;
use crate::error::{AppError, AppResult};
use crate::permission::{permission_key, PermissionResolver};
use crate::service::session::SessionService;
use crate::state::AppState;
use crate::token::extract_bearer;

/// The raw access token of an authenticated request, used by logout
#[derive(Clone, Debug)]
pub struct BearerToken {
    pub token: String,
    pub exp: i64,
}

/// Authentication middleware
pub async fn auth_layer(State(state): State<AppState>, mut request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let relative = state.config.router.relative_path(&path).to_string();

    if state.config.router.is_except_login(&relative) {
        return next.run(request).await;
    }

    let Some(ctx) = request.extensions().get::<RequestContext>().cloned() else {
        tracing::error!("no tenant context for {}", path);
        return AppError::TenantNotFound.into_response();
    };

    match authorize(&state, request.headers(), ctx, &relative).await {
        Ok((ctx, bearer)) => {
            request.extensions_mut().insert(ctx);
            request.extensions_mut().insert(bearer);
            next.run(request).await
        }
        Err(err) => {
            if err.is_security() {
                log_security_event(request.headers(), &path, &err.to_string());
            }
            err.into_response()
        }
    }
}

async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    mut ctx: RequestContext,
    relative: &str,
) -> AppResult<(RequestContext, BearerToken)> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or(AppError::TokenMissing)?;
    let token = extract_bearer(header)?;

    let claims = state.tokens.verify(token)?;
    if state.blacklist.is_revoked(token) {
        return Err(AppError::TokenInvalid);
    }

    let identity = SessionService::new(state).identify(&claims).await?;
    if identity.tenant_id != ctx.tenant_id() && !identity.is_system_admin() {
        return Err(AppError::ForbiddenTenant);
    }

    let user_id = identity.user_id;
    let home_tenant = identity.tenant_id;
    ctx.identity = Some(identity);
    let bearer = BearerToken {
        token: token.to_string(),
        exp: claims.exp,
    };

    if state.config.router.is_except_auth(relative) {
        return Ok((ctx, bearer));
    }

    // Roles are held in the user's own tenant
    let key = permission_key(relative);
    let allowed = PermissionResolver::new(&state.db)
        .check_permission(user_id, home_tenant, &key)
        .await?;
    if !allowed {
        tracing::debug!(user_id, permission = %key, "permission denied");
        return Err(AppError::PermissionDenied);
    }
    Ok((ctx, bearer))
}
