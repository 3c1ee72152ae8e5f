//! Tenant resolution
//!
//! Every API request runs inside exactly one tenant. The tenant id is taken
//! from the configured header, then the request host, then (when enabled)
//! a query parameter, and finally the configured default. The chosen tenant
//! must exist, be in normal status and not be expired.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Request, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

use super::{client_ip, log_security_event};
use crate::context::{RequestContext, TenantScope};
use crate::error::{AppError, AppResult};
use crate::service::tenant::TenantService;
use crate::state::AppState;

/// Tenant middleware. Inserts a [`RequestContext`] without identity.
pub async fn tenant_layer(State(state): State<AppState>, mut request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if state.config.router.relative_path(&path) == "/health" {
        return next.run(request).await;
    }

    let scope = match resolve(&state, request.headers(), request.uri()).await {
        Ok(scope) => scope,
        Err(err) => {
            if !matches!(err, AppError::Database(_) | AppError::Internal(_)) {
                log_security_event(request.headers(), &path, &err.to_string());
            }
            return err.into_response();
        }
    };

    tracing::debug!(tenant_id = scope.id, tenant = %scope.code, "tenant resolved");
    let ctx = RequestContext::new(scope, client_ip(request.headers()));
    request.extensions_mut().insert(ctx);
    next.run(request).await
}

async fn resolve(state: &AppState, headers: &HeaderMap, uri: &Uri) -> AppResult<TenantScope> {
    let tenants = TenantService::new(&state.db);
    let id = resolve_tenant_id(state, &tenants, headers, uri).await?;
    tenants.validate_access(id).await
}

async fn resolve_tenant_id(
    state: &AppState,
    tenants: &TenantService<'_>,
    headers: &HeaderMap,
    uri: &Uri,
) -> AppResult<i64> {
    let config = &state.config.tenant;

    if let Some(id) = headers
        .get(config.header.as_str())
        .and_then(|v| v.to_str().ok())
        .and_then(parse_id)
    {
        return Ok(id);
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(strip_port)
        .unwrap_or("");
    if let Some(found) = tenants.find_by_domain(host).await? {
        return Ok(found.id);
    }

    if config.allow_query_param {
        let id = Query::<HashMap<String, String>>::try_from_uri(uri)
            .ok()
            .and_then(|Query(params)| params.get(&config.query_param).and_then(|v| parse_id(v)));
        if let Some(id) = id {
            return Ok(id);
        }
    }

    Ok(config.default_tenant_id)
}

fn parse_id(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

fn strip_port(host: &str) -> &str {
    host.split(':').next().unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::{self, TestData};
    use axum::{middleware, response::Json, routing::get, Extension, Router};
    use axum::http::StatusCode;
    use sea_orm::DatabaseConnection;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn current_tenant(Extension(ctx): Extension<RequestContext>) -> Json<Value> {
        Json(json!({ "id": ctx.tenant_id() }))
    }

    async fn app(allow_query_param: bool) -> (Router, DatabaseConnection) {
        let db = testing::setup_seeded_db().await;
        let mut config = Config::default();
        config.tenant.allow_query_param = allow_query_param;
        let state = AppState::new(db.clone(), config);
        let router = Router::new()
            .route("/api/tenant/current", get(current_tenant))
            .layer(middleware::from_fn_with_state(state.clone(), tenant_layer))
            .with_state(state);
        (router, db)
    }

    async fn resolved(app: &Router, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let response = app.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_header_selects_tenant() {
        let (app, db) = app(false).await;
        let acme = TestData::new(&db).tenant("acme").await;
        let header = acme.id.to_string();

        let (status, body) = resolved(&app, "/api/tenant/current", &[("x-tenant-id", &header)]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], acme.id);

        // an unknown id is an error, not a fall back to the default
        let (status, body) = resolved(&app, "/api/tenant/current", &[("x-tenant-id", "999")]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 40001);
    }

    #[tokio::test]
    async fn test_host_domain_selects_tenant() {
        let (app, db) = app(false).await;
        let acme = TestData::new(&db).tenant_on("acme", "acme.example.com").await;

        let (_, body) = resolved(&app, "/api/tenant/current", &[("host", "acme.example.com:8080")]).await;
        assert_eq!(body["id"], acme.id);

        // unparseable header is skipped
        let (_, body) = resolved(
            &app,
            "/api/tenant/current",
            &[("x-tenant-id", "acme"), ("host", "acme.example.com")],
        )
        .await;
        assert_eq!(body["id"], acme.id);

        let (_, body) = resolved(&app, "/api/tenant/current", &[("host", "other.example.com")]).await;
        assert_eq!(body["id"], 1);
    }

    #[tokio::test]
    async fn test_header_wins_over_domain() {
        let (app, db) = app(false).await;
        let data = TestData::new(&db);
        let acme = data.tenant_on("acme", "acme.example.com").await;
        let globex = data.tenant("globex").await;
        let header = globex.id.to_string();

        let (_, body) = resolved(
            &app,
            "/api/tenant/current",
            &[("x-tenant-id", &header), ("host", "acme.example.com")],
        )
        .await;
        assert_eq!(body["id"], globex.id);
        assert_ne!(body["id"], acme.id);
    }

    #[tokio::test]
    async fn test_query_param_only_when_enabled() {
        let (disabled, db) = app(false).await;
        let acme = TestData::new(&db).tenant("acme").await;
        let uri = format!("/api/tenant/current?tenant_id={}", acme.id);
        let (_, body) = resolved(&disabled, &uri, &[]).await;
        assert_eq!(body["id"], 1);

        let (enabled, db) = app(true).await;
        let acme = TestData::new(&db).tenant_on("acme", "acme.example.com").await;
        let globex = TestData::new(&db).tenant("globex").await;
        let uri = format!("/api/tenant/current?tenant_id={}", globex.id);
        let (_, body) = resolved(&enabled, &uri, &[]).await;
        assert_eq!(body["id"], globex.id);

        // the host still outranks the query string
        let (_, body) = resolved(&enabled, &uri, &[("host", "acme.example.com")]).await;
        assert_eq!(body["id"], acme.id);
    }

    #[tokio::test]
    async fn test_default_tenant_when_nothing_given() {
        let (app, _db) = app(true).await;
        let (status, body) = resolved(&app, "/api/tenant/current", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id(" 7 "), Some(7));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-3"), None);
        assert_eq!(parse_id("acme"), None);
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("acme.example.com:8080"), "acme.example.com");
        assert_eq!(strip_port("acme.example.com"), "acme.example.com");
    }
}
