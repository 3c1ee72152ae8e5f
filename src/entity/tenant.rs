//! Tenant entity - 租户表
//!
//! 表名: sys_tenants

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 系统租户编码, 不可编辑不可删除
pub const SYSTEM_TENANT_CODE: &str = "system";

/// 系统租户ID
pub const SYSTEM_TENANT_ID: i64 = 1;

/// 租户状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantStatus {
    Normal = 1,
    Locked = 2,
    Disabled = 3,
}

impl TenantStatus {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(TenantStatus::Normal),
            2 => Some(TenantStatus::Locked),
            3 => Some(TenantStatus::Disabled),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TenantStatus::Normal => "normal",
            TenantStatus::Locked => "locked",
            TenantStatus::Disabled => "disabled",
        }
    }
}

impl From<TenantStatus> for i32 {
    fn from(status: TenantStatus) -> Self {
        status as i32
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_tenants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 租户编码 (唯一)
    #[sea_orm(column_type = "String(Some(50))", unique)]
    pub code: String,

    #[sea_orm(column_type = "String(Some(100))")]
    pub name: String,

    /// 绑定域名, 用于按 Host 解析租户
    #[sea_orm(column_type = "String(Some(100))")]
    pub domain: String,

    /// 状态: 1=正常, 2=锁定, 3=禁用
    pub status: i32,

    pub max_users: i32,

    /// 存储上限 (字节)
    pub storage_limit: i64,

    /// 过期时间 (Unix 时间戳), 为空表示永不过期
    pub expire_at: Option<i64>,

    pub admin_user_id: i64,

    /// JSON 配置
    #[sea_orm(column_type = "Text")]
    pub config: String,

    #[sea_orm(column_type = "String(Some(500))")]
    pub remark: String,

    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_system(&self) -> bool {
        self.code == SYSTEM_TENANT_CODE
    }

    pub fn is_normal(&self) -> bool {
        self.status == i32::from(TenantStatus::Normal)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.expire_at, Some(at) if at < now)
    }
}
