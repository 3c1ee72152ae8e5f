//! Menu entity - 菜单表
//!
//! 表名: sys_menus. 菜单是全局的, 租户通过 sys_role_menus 绑定.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_DISABLED: i32 = 0;
pub const STATUS_ENABLED: i32 = 1;

/// 菜单类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuType {
    /// 目录
    Directory = 1,
    /// 菜单
    Menu = 2,
    /// 按钮
    Button = 3,
}

impl MenuType {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(MenuType::Directory),
            2 => Some(MenuType::Menu),
            3 => Some(MenuType::Button),
            _ => None,
        }
    }
}

impl From<MenuType> for i32 {
    fn from(t: MenuType) -> Self {
        t as i32
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "sys_menus")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 父菜单ID (0 表示根)
    pub parent_id: i64,

    #[sea_orm(column_type = "String(Some(100))")]
    pub title: String,

    /// 路由名称 (唯一)
    #[sea_orm(column_type = "String(Some(100))")]
    pub name: String,

    /// 路由地址, 按钮可为空
    #[sea_orm(column_type = "String(Some(200))")]
    pub path: String,

    #[sea_orm(column_type = "String(Some(200))")]
    pub component: String,

    #[sea_orm(column_type = "String(Some(100))")]
    pub icon: String,

    /// 类型: 1=目录 2=菜单 3=按钮
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub menu_type: i32,

    pub sort: i32,

    /// 状态: 1=启用 0=禁用
    pub status: i32,

    /// 是否显示: 1=显示 0=隐藏
    pub visible: i32,

    /// 权限标识, 例如 role:list
    #[sea_orm(column_type = "String(Some(200))")]
    pub permission: String,

    #[sea_orm(column_type = "String(Some(200))")]
    pub redirect: String,

    pub always_show: i32,

    pub breadcrumb: i32,

    #[sea_orm(column_type = "String(Some(200))")]
    pub active_menu: String,

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
    pub fn kind(&self) -> Option<MenuType> {
        MenuType::from_i32(self.menu_type)
    }

    pub fn is_button(&self) -> bool {
        self.kind() == Some(MenuType::Button)
    }

    pub fn is_enabled(&self) -> bool {
        self.status == STATUS_ENABLED
    }
}
