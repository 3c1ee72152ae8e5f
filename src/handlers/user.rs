//! User management handlers

use axum::{
    extract::State,
    response::Json,
    Extension,
};
use serde::Deserialize;

use super::extract::{ValidJson, ValidQuery};
use super::{IdQuery, IdRequest, StatusRequest};
use crate::context::RequestContext;
use crate::entity::op_log::OpType;
use crate::entity::user::UserInfo;
use crate::error::AppResult;
use crate::handlers::audit::record;
use crate::routes::ApiResponse;
use crate::service::user::{AssignedRole, CreateUser, UpdateUser, UserDetail, UserFilter, UserService};
use crate::service::{Page, PageQuery, Window};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRolesRequest {
    pub user_id: i64,
    #[serde(default)]
    pub role_ids: Vec<i64>,
    pub expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRolesRequest {
    pub user_id: i64,
    #[serde(default)]
    pub role_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryRoleRequest {
    pub user_id: i64,
    pub role_id: i64,
}

/// GET /api/user/list
pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(page): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<UserFilter>,
) -> AppResult<Json<ApiResponse<Page<UserInfo>>>> {
    let window = Window::new(page, &state.config.pagination);
    let users = UserService::new(&state.db).list(&ctx, &filter, window).await?;
    Ok(Json(ApiResponse::success(users)))
}

/// GET /api/user/detail
pub async fn user_detail(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> AppResult<Json<ApiResponse<UserDetail>>> {
    let detail = UserService::new(&state.db).detail(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// POST /api/user/create
pub async fn create_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<CreateUser>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    let desc = format!("username: {}", req.username);
    let outcome = UserService::new(&state.db).create(&ctx, state.hasher, req).await;
    record(&ctx, OpType::CreateUser, desc, &outcome);
    Ok(Json(ApiResponse::success(outcome?)))
}

/// POST /api/user/update
pub async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<UpdateUser>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    let desc = format!("id: {}", req.id);
    let outcome = UserService::new(&state.db).update(&ctx, req).await;
    record(&ctx, OpType::UpdateUser, desc, &outcome);
    Ok(Json(ApiResponse::success(outcome?)))
}

/// POST /api/user/status
pub async fn update_user_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<StatusRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = UserService::new(&state.db).update_status(&ctx, req.id, req.status).await;
    record(&ctx, OpType::UpdateUserStatus, format!("id: {}, status: {}", req.id, req.status), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("status updated")))
}

/// POST /api/user/delete
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<IdRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = UserService::new(&state.db).delete(&ctx, req.id).await;
    record(&ctx, OpType::DeleteUser, format!("id: {}", req.id), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("user deleted")))
}

/// GET /api/user/roles
pub async fn user_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> AppResult<Json<ApiResponse<Vec<AssignedRole>>>> {
    let roles = UserService::new(&state.db).roles(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(roles)))
}

/// POST /api/user/roles/assign
pub async fn assign_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<AssignRolesRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = UserService::new(&state.db)
        .assign_roles(&ctx, req.user_id, &req.role_ids, req.expires_at)
        .await;
    record(
        &ctx,
        OpType::AssignRoles,
        format!("user: {}, roles: {:?}", req.user_id, req.role_ids),
        &outcome,
    );
    outcome?;
    Ok(Json(ApiResponse::success_msg("roles assigned")))
}

/// POST /api/user/roles/remove
pub async fn remove_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<RemoveRolesRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = UserService::new(&state.db)
        .remove_roles(&ctx, req.user_id, &req.role_ids)
        .await;
    record(
        &ctx,
        OpType::AssignRoles,
        format!("user: {}, removed roles: {:?}", req.user_id, req.role_ids),
        &outcome,
    );
    outcome?;
    Ok(Json(ApiResponse::success_msg("roles removed")))
}

/// POST /api/user/roles/primary
pub async fn set_primary_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<PrimaryRoleRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = UserService::new(&state.db)
        .set_primary_role(&ctx, req.user_id, req.role_id)
        .await;
    record(
        &ctx,
        OpType::AssignRoles,
        format!("user: {}, primary role: {}", req.user_id, req.role_id),
        &outcome,
    );
    outcome?;
    Ok(Json(ApiResponse::success_msg("primary role updated")))
}
