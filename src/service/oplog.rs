//! Operation log queries, always confined to the request tenant

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};

use super::{dedup_ids, like, require_ids, Page, Window};
use crate::context::RequestContext;
use crate::entity::op_log;
use crate::error::AppResult;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub op_type: String,
    #[serde(default)]
    pub result: String,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: i64,
    pub op_time: i64,
    pub username: String,
    pub op_type: String,
    pub op_desc: String,
    pub result: String,
    pub ip: String,
}

impl From<op_log::Model> for LogRecord {
    fn from(m: op_log::Model) -> Self {
        Self {
            id: m.id,
            op_time: m.op_time,
            username: m.username,
            op_type: m.op_type,
            op_desc: m.op_desc,
            result: m.result,
            ip: m.ip.unwrap_or_default(),
        }
    }
}

pub struct OpLogService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> OpLogService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Newest first
    pub async fn query(&self, ctx: &RequestContext, filter: &LogFilter, window: Window) -> AppResult<Page<LogRecord>> {
        let mut query = op_log::Entity::find().filter(op_log::Column::TenantId.eq(ctx.tenant_id()));
        if !filter.username.trim().is_empty() {
            query = query.filter(op_log::Column::Username.like(like(&filter.username)));
        }
        if !filter.op_type.is_empty() {
            query = query.filter(op_log::Column::OpType.eq(filter.op_type.as_str()));
        }
        if !filter.result.is_empty() {
            query = query.filter(op_log::Column::Result.eq(filter.result.as_str()));
        }
        if let Some(start) = filter.start_time {
            query = query.filter(op_log::Column::OpTime.gte(start));
        }
        if let Some(end) = filter.end_time {
            query = query.filter(op_log::Column::OpTime.lte(end));
        }

        let total = query.clone().count(self.db).await?;
        let list = query
            .order_by_desc(op_log::Column::Id)
            .offset(window.offset())
            .limit(window.size)
            .all(self.db)
            .await?
            .into_iter()
            .map(LogRecord::from)
            .collect();
        Ok(Page::new(list, total, window))
    }

    /// Delete entries by id. Ids belonging to other tenants are ignored.
    pub async fn delete(&self, ctx: &RequestContext, ids: &[i64]) -> AppResult<u64> {
        require_ids("ids", ids)?;
        let result = op_log::Entity::delete_many()
            .filter(op_log::Column::TenantId.eq(ctx.tenant_id()))
            .filter(op_log::Column::Id.is_in(dedup_ids(ids)))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::{context, identity};
    use crate::entity::op_log::{OpResult, OpType};
    use crate::error::AppError;
    use crate::testing;
    use sea_orm::{ActiveModelTrait, Set};

    async fn insert(db: &DatabaseConnection, tenant_id: i64, username: &str, op: OpType, at: i64) -> i64 {
        op_log::ActiveModel {
            tenant_id: Set(tenant_id),
            op_time: Set(at),
            username: Set(username.to_string()),
            op_type: Set(op.as_str().to_string()),
            op_desc: Set(String::new()),
            result: Set(OpResult::Success.as_str().to_string()),
            ip: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_query_is_tenant_scoped() {
        let db = testing::setup_db().await;
        insert(&db, 2, "alice", OpType::Login, 100).await;
        insert(&db, 2, "alice", OpType::CreateUser, 200).await;
        insert(&db, 2, "bob", OpType::Login, 300).await;
        insert(&db, 3, "alice", OpType::Login, 400).await;

        let service = OpLogService::new(&db);
        let ctx = context(2, "acme", Some(identity(5, 2, "acme", "tenant_admin")));

        let page = service.query(&ctx, &LogFilter::default(), Window::default()).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.list[0].username, "bob");

        let filter = LogFilter {
            username: "ali".to_string(),
            op_type: "login".to_string(),
            ..Default::default()
        };
        assert_eq!(service.query(&ctx, &filter, Window::default()).await.unwrap().total, 1);

        let filter = LogFilter {
            start_time: Some(150),
            end_time: Some(300),
            ..Default::default()
        };
        assert_eq!(service.query(&ctx, &filter, Window::default()).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_delete_ignores_other_tenants() {
        let db = testing::setup_db().await;
        let own = insert(&db, 2, "alice", OpType::Login, 100).await;
        let foreign = insert(&db, 3, "mallory", OpType::Login, 100).await;

        let service = OpLogService::new(&db);
        let ctx = context(2, "acme", Some(identity(5, 2, "acme", "tenant_admin")));
        assert_eq!(service.delete(&ctx, &[own, foreign]).await.unwrap(), 1);

        let other = context(3, "beta", None);
        assert_eq!(service.query(&other, &LogFilter::default(), Window::default()).await.unwrap().total, 1);
        assert!(matches!(service.delete(&ctx, &[]).await, Err(AppError::Validation(_))));
    }
}
