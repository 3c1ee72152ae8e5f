use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::handlers;
use crate::middleware::{auth_layer, tenant_layer};
use crate::state::AppState;

pub mod health;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn success_msg(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data: None,
        }
    }
}

/// Create the main router
///
/// Route paths below the prefix double as permission keys, so `/role/list`
/// requires `role:list`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        // Session
        .route("/user/captcha", get(handlers::session::captcha))
        .route("/user/login", post(handlers::session::login))
        .route("/user/refresh", post(handlers::session::refresh))
        .route("/user/logout", post(handlers::session::logout))
        .route("/user/profile", get(handlers::session::profile))
        .route("/user/password", post(handlers::session::change_password))
        .route("/user/menus", get(handlers::session::menus))
        .route("/user/routers", get(handlers::session::routers))
        .route("/user/permissions", get(handlers::session::permissions))
        // Users
        .route("/user/list", get(handlers::user::list_users))
        .route("/user/detail", get(handlers::user::user_detail))
        .route("/user/create", post(handlers::user::create_user))
        .route("/user/update", post(handlers::user::update_user))
        .route("/user/status", post(handlers::user::update_user_status))
        .route("/user/delete", post(handlers::user::delete_user))
        .route("/user/roles", get(handlers::user::user_roles))
        .route("/user/roles/assign", post(handlers::user::assign_roles))
        .route("/user/roles/remove", post(handlers::user::remove_roles))
        .route("/user/roles/primary", post(handlers::user::set_primary_role))
        // Roles
        .route("/role/list", get(handlers::role::list_roles))
        .route("/role/detail", get(handlers::role::role_detail))
        .route("/role/create", post(handlers::role::create_role))
        .route("/role/update", post(handlers::role::update_role))
        .route("/role/delete", post(handlers::role::delete_role))
        .route("/role/batch-delete", post(handlers::role::batch_delete_roles))
        .route("/role/status", post(handlers::role::update_role_status))
        .route("/role/copy", post(handlers::role::copy_role))
        .route("/role/menus", get(handlers::role::role_menus))
        .route("/role/menus/update", post(handlers::role::update_role_menus))
        .route("/role/permissions", get(handlers::role::role_permissions))
        .route("/role/options", get(handlers::role::role_options))
        .route("/role/stats", get(handlers::role::role_stats))
        .route("/role/data-scopes", get(handlers::role::data_scopes))
        .route("/role/check-users", post(handlers::role::check_users))
        .route("/role/filter-users", post(handlers::role::filter_users))
        // Menus
        .route("/menu/list", get(handlers::menu::list_menus))
        .route("/menu/tree", get(handlers::menu::menu_tree))
        .route("/menu/detail", get(handlers::menu::menu_detail))
        .route("/menu/create", post(handlers::menu::create_menu))
        .route("/menu/update", post(handlers::menu::update_menu))
        .route("/menu/delete", post(handlers::menu::delete_menu))
        .route("/menu/batch-delete", post(handlers::menu::batch_delete_menus))
        .route("/menu/status", post(handlers::menu::update_menu_status))
        .route("/menu/options", get(handlers::menu::menu_options))
        .route("/menu/routers", get(handlers::menu::menu_routers))
        // Tenants
        .route("/tenant/list", get(handlers::tenant::list_tenants))
        .route("/tenant/detail", get(handlers::tenant::tenant_detail))
        .route("/tenant/create", post(handlers::tenant::create_tenant))
        .route("/tenant/update", post(handlers::tenant::update_tenant))
        .route("/tenant/delete", post(handlers::tenant::delete_tenant))
        .route("/tenant/status", post(handlers::tenant::update_tenant_status))
        .route("/tenant/stats", get(handlers::tenant::tenant_stats))
        .route("/tenant/config", post(handlers::tenant::update_tenant_config))
        .route("/tenant/options", get(handlers::tenant::tenant_options))
        .route("/tenant/by-code", get(handlers::tenant::tenant_by_code))
        // Audit log
        .route("/oplog/query", get(handlers::audit::query_oplog))
        .route("/oplog/delete", post(handlers::audit::delete_oplog))
        // tenant_layer is outermost and runs first
        .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
        .layer(middleware::from_fn_with_state(state.clone(), tenant_layer));

    let prefix = state.config.router.prefix.trim_end_matches('/').to_string();
    let router = if prefix.is_empty() {
        Router::new().merge(api_routes)
    } else {
        Router::new().nest(&prefix, api_routes)
    };

    router
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
