//! Tenant management handlers. The service enforces system-admin access.

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
use crate::error::AppResult;
use crate::handlers::audit::record;
use crate::routes::ApiResponse;
use crate::service::tenant::{
    CreateTenant, TenantDetail, TenantFilter, TenantInfo, TenantOption, TenantService, TenantStats, UpdateTenant,
};
use crate::service::{Page, PageQuery, Window};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TenantConfigRequest {
    pub id: i64,
    pub config: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    pub code: String,
}

/// GET /api/tenant/list
pub async fn list_tenants(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(page): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<TenantFilter>,
) -> AppResult<Json<ApiResponse<Page<TenantInfo>>>> {
    let window = Window::new(page, &state.config.pagination);
    let tenants = TenantService::new(&state.db).list(&ctx, &filter, window).await?;
    Ok(Json(ApiResponse::success(tenants)))
}

/// GET /api/tenant/detail
pub async fn tenant_detail(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> AppResult<Json<ApiResponse<TenantDetail>>> {
    let detail = TenantService::new(&state.db).detail(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// POST /api/tenant/create
pub async fn create_tenant(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<CreateTenant>,
) -> AppResult<Json<ApiResponse<TenantInfo>>> {
    let desc = format!("code: {}, admin: {}", req.code, req.admin_name);
    let outcome = TenantService::new(&state.db).create(&ctx, state.hasher, req).await;
    record(&ctx, OpType::CreateTenant, desc, &outcome);
    Ok(Json(ApiResponse::success(outcome?)))
}

/// POST /api/tenant/update
pub async fn update_tenant(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<UpdateTenant>,
) -> AppResult<Json<ApiResponse<TenantInfo>>> {
    let desc = format!("id: {}", req.id);
    let outcome = TenantService::new(&state.db).update(&ctx, req).await;
    record(&ctx, OpType::UpdateTenant, desc, &outcome);
    Ok(Json(ApiResponse::success(outcome?)))
}

/// POST /api/tenant/delete
pub async fn delete_tenant(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<IdRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = TenantService::new(&state.db).delete(&ctx, req.id).await;
    record(&ctx, OpType::DeleteTenant, format!("id: {}", req.id), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("tenant deleted")))
}

/// POST /api/tenant/status
pub async fn update_tenant_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<StatusRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = TenantService::new(&state.db).update_status(&ctx, req.id, req.status).await;
    record(&ctx, OpType::UpdateTenantStatus, format!("id: {}, status: {}", req.id, req.status), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("status updated")))
}

/// GET /api/tenant/stats
pub async fn tenant_stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> AppResult<Json<ApiResponse<TenantStats>>> {
    let stats = TenantService::new(&state.db).stats(&ctx, query.id).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// POST /api/tenant/config
pub async fn update_tenant_config(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<TenantConfigRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = TenantService::new(&state.db).update_config(&ctx, req.id, req.config).await;
    record(&ctx, OpType::UpdateTenantConfig, format!("id: {}", req.id), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("config updated")))
}

/// GET /api/tenant/options
pub async fn tenant_options(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<ApiResponse<Vec<TenantOption>>>> {
    let options = TenantService::new(&state.db).options(&ctx).await?;
    Ok(Json(ApiResponse::success(options)))
}

/// GET /api/tenant/by-code
pub async fn tenant_by_code(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(query): ValidQuery<CodeQuery>,
) -> AppResult<Json<ApiResponse<TenantInfo>>> {
    let info = TenantService::new(&state.db).by_code(&ctx, &query.code).await?;
    Ok(Json(ApiResponse::success(info)))
}
