//! Menu handlers

use axum::{
    extract::State,
    response::Json,
    Extension,
};

use super::extract::{ValidJson, ValidQuery};
use super::{IdQuery, IdRequest, IdsRequest, StatusRequest};
use crate::context::RequestContext;
use crate::entity::menu;
use crate::entity::op_log::OpType;
use crate::error::AppResult;
use crate::handlers::audit::record;
use crate::routes::ApiResponse;
use crate::service::menu::{MenuDetail, MenuFilter, MenuInput, MenuOptionFilter, MenuService, MenuTreeFilter, UpdateMenu};
use crate::service::{Page, PageQuery, Window};
use crate::state::AppState;
use crate::tree::{MenuOption, MenuTreeNode, RouterNode};

/// GET /api/menu/list
pub async fn list_menus(
    State(state): State<AppState>,
    ValidQuery(page): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<MenuFilter>,
) -> AppResult<Json<ApiResponse<Page<menu::Model>>>> {
    let window = Window::new(page, &state.config.pagination);
    let menus = MenuService::new(&state.db).list(&filter, window).await?;
    Ok(Json(ApiResponse::success(menus)))
}

/// GET /api/menu/tree
pub async fn menu_tree(
    State(state): State<AppState>,
    ValidQuery(filter): ValidQuery<MenuTreeFilter>,
) -> AppResult<Json<ApiResponse<Vec<MenuTreeNode>>>> {
    let tree = MenuService::new(&state.db).tree(&filter).await?;
    Ok(Json(ApiResponse::success(tree)))
}

/// GET /api/menu/detail
pub async fn menu_detail(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> AppResult<Json<ApiResponse<MenuDetail>>> {
    let detail = MenuService::new(&state.db).detail(query.id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// POST /api/menu/create
pub async fn create_menu(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<MenuInput>,
) -> AppResult<Json<ApiResponse<menu::Model>>> {
    let desc = format!("name: {}", req.name);
    let outcome = MenuService::new(&state.db).create(&ctx, req).await;
    record(&ctx, OpType::CreateMenu, desc, &outcome);
    Ok(Json(ApiResponse::success(outcome?)))
}

/// POST /api/menu/update
pub async fn update_menu(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<UpdateMenu>,
) -> AppResult<Json<ApiResponse<menu::Model>>> {
    let desc = format!("id: {}, parent: {}", req.id, req.input.parent_id);
    let outcome = MenuService::new(&state.db).update(&ctx, req).await;
    record(&ctx, OpType::UpdateMenu, desc, &outcome);
    Ok(Json(ApiResponse::success(outcome?)))
}

/// POST /api/menu/delete
pub async fn delete_menu(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<IdRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = MenuService::new(&state.db).delete(&ctx, req.id).await;
    record(&ctx, OpType::DeleteMenu, format!("id: {}", req.id), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("menu deleted")))
}

/// POST /api/menu/batch-delete
pub async fn batch_delete_menus(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<IdsRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = MenuService::new(&state.db).batch_delete(&ctx, &req.ids).await;
    record(&ctx, OpType::DeleteMenu, format!("ids: {:?}", req.ids), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("menus deleted")))
}

/// POST /api/menu/status
pub async fn update_menu_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<StatusRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = MenuService::new(&state.db).update_status(&ctx, req.id, req.status).await;
    record(&ctx, OpType::UpdateMenuStatus, format!("id: {}, status: {}", req.id, req.status), &outcome);
    outcome?;
    Ok(Json(ApiResponse::success_msg("status updated")))
}

/// GET /api/menu/options
pub async fn menu_options(
    State(state): State<AppState>,
    ValidQuery(filter): ValidQuery<MenuOptionFilter>,
) -> AppResult<Json<ApiResponse<Vec<MenuOption>>>> {
    let options = MenuService::new(&state.db).options(&filter).await?;
    Ok(Json(ApiResponse::success(options)))
}

/// GET /api/menu/routers
pub async fn menu_routers(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<RouterNode>>>> {
    let routers = MenuService::new(&state.db).routers().await?;
    Ok(Json(ApiResponse::success(routers)))
}
