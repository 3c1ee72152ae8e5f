//! User entity - 用户表
//!
//! 表名: sys_users

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 用户状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    /// 正常
    Normal = 1,
    /// 锁定
    Locked = 2,
    /// 禁用
    Disabled = 3,
}

impl UserStatus {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(UserStatus::Normal),
            2 => Some(UserStatus::Locked),
            3 => Some(UserStatus::Disabled),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UserStatus::Normal => "normal",
            UserStatus::Locked => "locked",
            UserStatus::Disabled => "disabled",
        }
    }
}

impl From<UserStatus> for i32 {
    fn from(status: UserStatus) -> Self {
        status as i32
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 所属租户
    pub tenant_id: i64,

    /// 用户名 (租户内唯一)
    #[sea_orm(column_type = "String(Some(50))")]
    pub username: String,

    /// 密码 (bcrypt 哈希)
    #[sea_orm(column_type = "String(Some(128))")]
    #[serde(skip_serializing)]
    pub password: String,

    #[sea_orm(column_type = "String(Some(50))")]
    pub real_name: String,

    #[sea_orm(column_type = "String(Some(100))")]
    pub email: String,

    #[sea_orm(column_type = "String(Some(20))")]
    pub phone: String,

    #[sea_orm(column_type = "String(Some(255))")]
    pub avatar: String,

    /// 部门ID (0 表示无部门)
    pub dept_id: i64,

    /// 用户状态: 1=正常, 2=锁定, 3=禁用
    pub status: i32,

    #[sea_orm(column_type = "String(Some(64))")]
    pub login_ip: String,

    /// 最后登录时间 (Unix 时间戳)
    pub login_at: Option<i64>,

    pub login_count: i32,

    #[sea_orm(column_type = "String(Some(500))")]
    pub remark: String,

    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// 跨表关系通过手动查询处理

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> Option<UserStatus> {
        UserStatus::from_i32(self.status)
    }
}

/// 用户响应 (不含密码)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub tenant_id: i64,
    pub username: String,
    pub real_name: String,
    pub email: String,
    pub phone: String,
    pub avatar: String,
    pub dept_id: i64,
    pub status: i32,
    pub status_name: String,
    pub login_ip: String,
    pub login_at: Option<i64>,
    pub login_count: i32,
    pub remark: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Model> for UserInfo {
    fn from(model: Model) -> Self {
        let status_name = model
            .status()
            .map(|s| s.name().to_string())
            .unwrap_or_default();
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            username: model.username,
            real_name: model.real_name,
            email: model.email,
            phone: model.phone,
            avatar: model.avatar,
            dept_id: model.dept_id,
            status: model.status,
            status_name,
            login_ip: model.login_ip,
            login_at: model.login_at,
            login_count: model.login_count,
            remark: model.remark,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
