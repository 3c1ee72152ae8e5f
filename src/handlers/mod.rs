//! Request handlers module
//!
//! Handlers stay thin: extract, call the service, record the audit entry.

use serde::Deserialize;

pub mod audit;
pub mod extract;
pub mod menu;
pub mod role;
pub mod session;
pub mod tenant;
pub mod user;

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub id: i64,
    pub status: i32,
}
