//! OpLog entity - 操作日志表
//!
//! 表名: sys_op_log

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 操作类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    Login,
    Logout,
    RefreshToken,
    ChangePassword,
    CreateUser,
    UpdateUser,
    DeleteUser,
    UpdateUserStatus,
    AssignRoles,
    CreateRole,
    UpdateRole,
    DeleteRole,
    UpdateRoleStatus,
    CopyRole,
    UpdateRoleMenus,
    CreateMenu,
    UpdateMenu,
    DeleteMenu,
    UpdateMenuStatus,
    CreateTenant,
    UpdateTenant,
    DeleteTenant,
    UpdateTenantStatus,
    UpdateTenantConfig,
    DeleteLog,
}

impl OpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::Login => "login",
            OpType::Logout => "logout",
            OpType::RefreshToken => "refresh_token",
            OpType::ChangePassword => "change_password",
            OpType::CreateUser => "create_user",
            OpType::UpdateUser => "update_user",
            OpType::DeleteUser => "delete_user",
            OpType::UpdateUserStatus => "update_user_status",
            OpType::AssignRoles => "assign_roles",
            OpType::CreateRole => "create_role",
            OpType::UpdateRole => "update_role",
            OpType::DeleteRole => "delete_role",
            OpType::UpdateRoleStatus => "update_role_status",
            OpType::CopyRole => "copy_role",
            OpType::UpdateRoleMenus => "update_role_menus",
            OpType::CreateMenu => "create_menu",
            OpType::UpdateMenu => "update_menu",
            OpType::DeleteMenu => "delete_menu",
            OpType::UpdateMenuStatus => "update_menu_status",
            OpType::CreateTenant => "create_tenant",
            OpType::UpdateTenant => "update_tenant",
            OpType::DeleteTenant => "delete_tenant",
            OpType::UpdateTenantStatus => "update_tenant_status",
            OpType::UpdateTenantConfig => "update_tenant_config",
            OpType::DeleteLog => "delete_log",
        }
    }
}

/// 操作结果
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpResult {
    Success,
    Failed,
}

impl OpResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpResult::Success => "success",
            OpResult::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sys_op_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub tenant_id: i64,

    /// 操作时间 (Unix 时间戳)
    pub op_time: i64,

    #[sea_orm(column_type = "String(Some(50))")]
    pub username: String,

    #[sea_orm(column_type = "String(Some(32))")]
    pub op_type: String,

    #[sea_orm(column_type = "Text")]
    pub op_desc: String,

    #[sea_orm(column_type = "String(Some(16))")]
    pub result: String,

    #[sea_orm(column_type = "String(Some(64))", nullable)]
    pub ip: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
