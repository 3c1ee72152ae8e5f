//! Tenantry - a multi-tenant administration backend
//!
//! Tenants, users, roles and a global menu catalogue, with JWT sessions and
//! role → menu → permission authorization enforced per request.

pub mod cache;
pub mod captcha;
pub mod config;
pub mod context;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod permission;
pub mod routes;
pub mod service;
pub mod state;
pub mod token;
pub mod tree;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
