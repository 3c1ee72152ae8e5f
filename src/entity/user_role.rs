//! UserRole entity - 用户角色关联表
//!
//! 表名: sys_user_roles. 每个用户应恰有一个主角色 (is_primary = 1).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_user_roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tenant_id: i64,
    pub user_id: i64,
    pub role_id: i64,
    /// 是否主角色: 1=是 0=否
    pub is_primary: i32,
    pub assigned_by: i64,
    /// 过期时间 (Unix 时间戳), 为空表示永久
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_active_at(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Condition matching assignments that have not expired at `now`
pub fn active_at(now: i64) -> sea_orm::Condition {
    sea_orm::Condition::any()
        .add(Column::ExpiresAt.is_null())
        .add(Column::ExpiresAt.gt(now))
}
