//! Session handlers: captcha, login, refresh, logout and the caller's own account

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;

use super::extract::ValidJson;
use crate::captcha::CaptchaChallenge;
use crate::context::RequestContext;
use crate::entity::op_log::OpType;
use crate::error::AppResult;
use crate::handlers::audit::{record, record_as};
use crate::middleware::BearerToken;
use crate::routes::ApiResponse;
use crate::service::session::{ChangePassword, LoginRequest, LoginResult, PermissionSummary, Profile, SessionService};
use crate::state::AppState;
use crate::tree::{MenuTreeNode, RouterNode};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// GET /api/user/captcha
pub async fn captcha(State(state): State<AppState>) -> Json<ApiResponse<CaptchaChallenge>> {
    Json(ApiResponse::success(SessionService::new(&state).captcha()))
}

/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResult>>> {
    let username = req.username.clone();
    let tenant_code = req.tenant_code.clone();
    let outcome = SessionService::new(&state).login(&ctx, req).await;
    record_as(&ctx, &username, OpType::Login, format!("tenant: {}", tenant_code), &outcome);
    Ok(Json(ApiResponse::success(outcome?)))
}

/// POST /api/user/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> AppResult<Json<ApiResponse<LoginResult>>> {
    let outcome = SessionService::new(&state).refresh(&req.refresh_token).await;
    if let Ok(result) = &outcome {
        record_as(&ctx, &result.user_info.username, OpType::RefreshToken, "", &outcome);
    }
    Ok(Json(ApiResponse::success(outcome?)))
}

/// POST /api/user/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Extension(bearer): Extension<BearerToken>,
) -> Json<ApiResponse<()>> {
    SessionService::new(&state).logout(&bearer.token, bearer.exp);
    record(&ctx, OpType::Logout, "", &AppResult::Ok(()));
    Json(ApiResponse::success_msg("logged out"))
}

/// GET /api/user/profile
pub async fn profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = SessionService::new(&state).profile(&ctx).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// POST /api/user/password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<ChangePassword>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = SessionService::new(&state).change_password(&ctx, req).await;
    record(&ctx, OpType::ChangePassword, "", &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("password changed")))
}

/// GET /api/user/menus
pub async fn menus(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<ApiResponse<Vec<MenuTreeNode>>>> {
    let menus = SessionService::new(&state).menus(&ctx).await?;
    Ok(Json(ApiResponse::success(menus)))
}

/// GET /api/user/routers
pub async fn routers(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<ApiResponse<Vec<RouterNode>>>> {
    let routers = SessionService::new(&state).routers(&ctx).await?;
    Ok(Json(ApiResponse::success(routers)))
}

/// GET /api/user/permissions
pub async fn permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<ApiResponse<PermissionSummary>>> {
    let summary = SessionService::new(&state).permissions(&ctx).await?;
    Ok(Json(ApiResponse::success(summary)))
}
