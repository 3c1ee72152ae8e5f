//! Entity module - SeaORM entity definitions
//!
//! Every business table is soft-deleted through a nullable `deleted_at`
//! unix timestamp. Association tables are hard-deleted.

pub mod menu;
pub mod op_log;
pub mod role;
pub mod role_menu;
pub mod tenant;
pub mod user;
pub mod user_role;
