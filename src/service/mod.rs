//! Business services
//!
//! Each service borrows a connection and receives the caller's
//! [`RequestContext`](crate::context::RequestContext) explicitly.

use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;
use crate::error::{AppError, AppResult};

pub mod menu;
pub mod oplog;
pub mod role;
pub mod session;
pub mod tenant;
pub mod user;

/// Raw paging parameters as they arrive on the query string
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// A normalized page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub page: u64,
    pub size: u64,
}

impl Window {
    pub fn new(query: PageQuery, config: &PaginationConfig) -> Self {
        let page = query.page.filter(|p| *p > 0).unwrap_or(1);
        let size = query
            .page_size
            .filter(|s| *s > 0)
            .unwrap_or(config.default_size)
            .min(config.max_size);
        Self { page, size }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.size
    }
}

impl Default for Window {
    fn default() -> Self {
        Self { page: 1, size: 20 }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub list: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn new(list: Vec<T>, total: u64, window: Window) -> Self {
        Self {
            list,
            total,
            page: window.page,
            page_size: window.size,
        }
    }
}

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// `%value%` pattern for LIKE filters
pub(crate) fn like(value: &str) -> String {
    format!("%{}%", value.trim())
}

/// Character length must fall in `min..=max`
pub(crate) fn check_len(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::Validation(if min == 0 {
            format!("{} must be at most {} characters", field, max)
        } else {
            format!("{} must be {}-{} characters", field, min, max)
        }));
    }
    Ok(())
}

pub(crate) fn check_range(field: &str, value: i64, min: i64, max: i64) -> AppResult<()> {
    if value < min || value > max {
        return Err(AppError::Validation(format!("{} must be between {} and {}", field, min, max)));
    }
    Ok(())
}

pub(crate) fn check_email(field: &str, value: &str) -> AppResult<()> {
    if is_email(value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} is not a valid email address", field)))
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

pub(crate) fn require_ids(field: &str, ids: &[i64]) -> AppResult<()> {
    if ids.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Deduplicate ids, keeping first occurrence order
pub(crate) fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_normalization() {
        let config = PaginationConfig::default();
        let w = Window::new(PageQuery::default(), &config);
        assert_eq!(w, Window { page: 1, size: 20 });
        assert_eq!(w.offset(), 0);

        let w = Window::new(
            PageQuery {
                page: Some(3),
                page_size: Some(500),
            },
            &config,
        );
        assert_eq!(w, Window { page: 3, size: 100 });
        assert_eq!(w.offset(), 200);

        let w = Window::new(
            PageQuery {
                page: Some(0),
                page_size: Some(0),
            },
            &config,
        );
        assert_eq!(w, Window { page: 1, size: 20 });
    }

    #[test]
    fn test_validators() {
        assert!(check_len("username", "ab", 3, 50).is_err());
        assert!(check_len("username", "abc", 3, 50).is_ok());
        assert!(check_len("remark", "", 0, 500).is_ok());
        assert!(check_len("name", "四个汉字", 2, 4).is_ok());
        assert!(check_range("status", 4, 1, 3).is_err());

        assert!(is_email("a@b.co"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a b@c.com"));
        assert!(!is_email("a@@b.com"));

        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(require_ids("roleIds", &[]).is_err());
    }
}
