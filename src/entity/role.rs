//! Role entity - 角色表
//!
//! 表名: sys_roles

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_DISABLED: i32 = 0;
pub const STATUS_ENABLED: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "sys_roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub tenant_id: i64,

    #[sea_orm(column_type = "String(Some(50))")]
    pub name: String,

    /// 角色编码, 内置角色编码不可修改
    #[sea_orm(column_type = "String(Some(50))")]
    pub code: String,

    #[sea_orm(column_type = "String(Some(200))")]
    pub description: String,

    /// 状态: 1=启用, 0=禁用
    pub status: i32,

    pub sort: i32,

    /// 数据范围: 1=全部 2=本部门 3=本部门及以下 4=仅本人 5=自定义
    pub data_scope: i32,

    #[sea_orm(column_type = "String(Some(500))")]
    pub remark: String,

    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_enabled(&self) -> bool {
        self.status == STATUS_ENABLED
    }
}
