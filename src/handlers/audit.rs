//! Audit log handlers
//!
//! Operation log query and deletion, plus the background recorder every
//! mutating handler writes to.

use axum::{
    extract::State,
    response::Json,
    Extension,
};

use super::extract::{ValidJson, ValidQuery};
use super::IdsRequest;
use crate::context::RequestContext;
use crate::entity::op_log::{OpResult, OpType};
use crate::error::AppResult;
use crate::routes::ApiResponse;
use crate::service::oplog::{LogFilter, LogRecord, OpLogService};
use crate::service::{Page, PageQuery, Window};
use crate::state::AppState;

/// Record the outcome of an operation performed by the request's caller
pub fn record<T>(ctx: &RequestContext, op: OpType, desc: impl Into<String>, outcome: &AppResult<T>) {
    record_as(ctx, ctx.operator_name(), op, desc, outcome);
}

/// Record an operation on behalf of a named account, used before an identity exists
pub fn record_as<T>(ctx: &RequestContext, username: &str, op: OpType, desc: impl Into<String>, outcome: &AppResult<T>) {
    let result = if outcome.is_ok() { OpResult::Success } else { OpResult::Failed };
    service::log_operation(
        ctx.tenant_id(),
        username,
        op.as_str(),
        &desc.into(),
        result.as_str(),
        ctx.client_ip.as_deref(),
    );
}

/// GET /api/oplog/query
pub async fn query_oplog(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidQuery(page): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<LogFilter>,
) -> AppResult<Json<ApiResponse<Page<LogRecord>>>> {
    let window = Window::new(page, &state.config.pagination);
    let logs = OpLogService::new(&state.db).query(&ctx, &filter, window).await?;
    Ok(Json(ApiResponse::success(logs)))
}

/// POST /api/oplog/delete
pub async fn delete_oplog(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidJson(req): ValidJson<IdsRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let outcome = OpLogService::new(&state.db).delete(&ctx, &req.ids).await;
    record(&ctx, OpType::DeleteLog, format!("ids: {:?}", req.ids), &outcome);
    let deleted = outcome?;
    Ok(Json(ApiResponse::success_msg(format!("deleted {} log entries", deleted))))
}

/// Service for adding operation logs
pub mod service {
    use sea_orm::{ActiveModelTrait, Set};
    use tokio::sync::mpsc;

    use crate::entity::op_log;

    /// Log entry to be added
    #[derive(Debug, Clone)]
    pub struct LogEntry {
        pub tenant_id: i64,
        pub username: String,
        pub op_type: String,
        pub op_desc: String,
        pub result: String,
        pub ip: Option<String>,
    }

    static LOG_TX: std::sync::OnceLock<mpsc::Sender<LogEntry>> = std::sync::OnceLock::new();

    /// Start the writer task. Calling it again is a no-op.
    pub fn init(db: sea_orm::DatabaseConnection) {
        if LOG_TX.get().is_some() {
            tracing::debug!("Audit log service already initialized, skipping");
            return;
        }

        let (tx, mut rx) = mpsc::channel::<LogEntry>(200);
        if LOG_TX.set(tx).is_err() {
            tracing::debug!("Audit log service initialized by another thread");
            return;
        }

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                let log = op_log::ActiveModel {
                    tenant_id: Set(entry.tenant_id),
                    op_time: Set(chrono::Utc::now().timestamp()),
                    username: Set(entry.username),
                    op_type: Set(entry.op_type),
                    op_desc: Set(entry.op_desc),
                    result: Set(entry.result),
                    ip: Set(entry.ip),
                    ..Default::default()
                };

                if let Err(e) = log.insert(&db).await {
                    tracing::error!("Failed to log operation: {}", e);
                }
            }
        });
    }

    /// Queue an entry without waiting. A full channel drops it.
    pub fn add_log(entry: LogEntry) {
        if let Some(tx) = LOG_TX.get() {
            if tx.try_send(entry).is_err() {
                tracing::warn!("Log channel is full, operation log dropped");
            }
        } else {
            tracing::warn!(
                "Audit log service not initialized, log dropped: {} - {}",
                entry.op_type,
                entry.op_desc
            );
        }
    }

    pub fn log_operation(tenant_id: i64, username: &str, op_type: &str, op_desc: &str, result: &str, ip: Option<&str>) {
        add_log(LogEntry {
            tenant_id,
            username: username.to_string(),
            op_type: op_type.to_string(),
            op_desc: op_desc.to_string(),
            result: result.to_string(),
            ip: ip.map(|s| s.to_string()),
        });
    }

}
