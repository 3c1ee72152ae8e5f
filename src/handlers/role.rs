//! Role handlers

use axum::{
    extract::State,
    response::Json,
    Extension,
};
use serde::Deserialize;
use std::collections::HashMap;

use super::extract::{ValidJson, ValidQuery};
use super::{IdQuery, IdRequest, IdsRequest, StatusRequest};
use crate::context::RequestContext;
use crate::entity::op_log::OpType;
use crate::entity::role;
use crate::error::AppResult;
use crate::handlers::audit::record;
use crate::routes::ApiResponse;
use crate::service::role::{
    CopyRole, RoleDetail, RoleFilter, RoleInput, RoleOption, RoleService, RoleStats, ScopeOption, UpdateRole,
};
use crate::service::{Page, PageQuery, Window};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMenusRequest {
    pub role_id: i64,
    #[serde(default)]
    pub menu_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersPermissionRequest {
    #[serde(default)]
    pub user_ids: Vec<i64>,
    pub permission: String,
}

/// GET /api/role/list
pub async fn list_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(page): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<RoleFilter>,
) -> AppResult<Json<ApiResponse<Page<role::Model>>>> {
    let window = Window::new(page, &state.config.pagination);
    let roles = RoleService::new(&state.db).list(&ctx, &filter, window).await?;
    Ok(Json(ApiResponse::success(roles)))
}

/// GET /api/role/detail
pub async fn role_detail(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> AppResult<Json<ApiResponse<RoleDetail>>> {
    let detail = RoleService::new(&state.db).detail(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// POST /api/role/create
pub async fn create_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<RoleInput>,
) -> AppResult<Json<ApiResponse<role::Model>>> {
    let desc = format!("code: {}", req.code);
    let outcome = RoleService::new(&state.db).create(&ctx, req).await;
    record(&ctx, OpType::CreateRole, desc, &outcome);
    Ok(Json(ApiResponse::success(outcome?)))
}

/// POST /api/role/update
pub async fn update_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<UpdateRole>,
) -> AppResult<Json<ApiResponse<role::Model>>> {
    let desc = format!("id: {}, code: {}", req.id, req.input.code);
    let outcome = RoleService::new(&state.db).update(&ctx, req).await;
    record(&ctx, OpType::UpdateRole, desc, &outcome);
    Ok(Json(ApiResponse::success(outcome?)))
}

/// POST /api/role/delete
pub async fn delete_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<IdRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = RoleService::new(&state.db).delete(&ctx, req.id).await;
    record(&ctx, OpType::DeleteRole, format!("id: {}", req.id), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("role deleted")))
}

/// POST /api/role/batch-delete
pub async fn batch_delete_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<IdsRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = RoleService::new(&state.db).batch_delete(&ctx, &req.ids).await;
    record(&ctx, OpType::DeleteRole, format!("ids: {:?}", req.ids), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("roles deleted")))
}

/// POST /api/role/status
pub async fn update_role_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<StatusRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = RoleService::new(&state.db).update_status(&ctx, req.id, req.status).await;
    record(&ctx, OpType::UpdateRoleStatus, format!("id: {}, status: {}", req.id, req.status), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("status updated")))
}

/// POST /api/role/copy
pub async fn copy_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<CopyRole>,
) -> AppResult<Json<ApiResponse<role::Model>>> {
    let desc = format!("from: {}, code: {}", req.id, req.code);
    let outcome = RoleService::new(&state.db).copy(&ctx, req).await;
    record(&ctx, OpType::CopyRole, desc, &outcome);
    Ok(Json(ApiResponse::success(outcome?)))
}

/// GET /api/role/menus
pub async fn role_menus(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> AppResult<Json<ApiResponse<Vec<i64>>>> {
    let menu_ids = RoleService::new(&state.db).menus(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(menu_ids)))
}

/// POST /api/role/menus/update
pub async fn update_role_menus(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<RoleMenusRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = RoleService::new(&state.db)
        .update_menus(&ctx, req.role_id, &req.menu_ids)
        .await;
    record(
        &ctx,
        OpType::UpdateRoleMenus,
        format!("role: {}, menus: {}", req.role_id, req.menu_ids.len()),
        &outcome,
    );
    outcome?;
    Ok(Json(ApiResponse::success_msg("role menus updated")))
}

/// GET /api/role/permissions
pub async fn role_permissions(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> AppResult<Json<ApiResponse<Vec<String>>>> {
    let permissions = RoleService::new(&state.db).permissions(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(permissions)))
}

/// GET /api/role/options
pub async fn role_options(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<ApiResponse<Vec<RoleOption>>>> {
    let options = RoleService::new(&state.db).options(&ctx).await?;
    Ok(Json(ApiResponse::success(options)))
}

/// GET /api/role/stats
pub async fn role_stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<ApiResponse<RoleStats>>> {
    let stats = RoleService::new(&state.db).stats(&ctx).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/role/data-scopes
pub async fn data_scopes() -> Json<ApiResponse<Vec<ScopeOption>>> {
    Json(ApiResponse::success(RoleService::data_scopes()))
}

/// POST /api/role/check-users
pub async fn check_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<UsersPermissionRequest>,
) -> AppResult<Json<ApiResponse<HashMap<i64, bool>>>> {
    let result = RoleService::new(&state.db)
        .check_users(&ctx, &req.user_ids, &req.permission)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/role/filter-users
pub async fn filter_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<UsersPermissionRequest>,
) -> AppResult<Json<ApiResponse<Vec<i64>>>> {
    let result = RoleService::new(&state.db)
        .filter_users(&ctx, &req.user_ids, &req.permission)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
