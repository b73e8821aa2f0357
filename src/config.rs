use std::env;

use crate::errors::AdminError;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection and browsing defaults, read once on start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminConfig {
    /// Admin API root, e.g. `http://localhost:4000/api/_admin`.
    pub base_url: String,
    pub auth_token: Option<String>,
    pub page_size: usize,
    /// Filter applied to the first relation that is opened.
    pub filter: Option<String>,
    pub timeout_secs: u64,
}

impl AdminConfig {
    /// Reads `ADMIN_URL`, `ADMIN_TOKEN`, `ADMIN_PAGE_SIZE`, `ADMIN_FILTER` and
    /// `ADMIN_TIMEOUT_SECS` from the environment.
    pub fn from_env() -> Result<Self, AdminError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AdminError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("ADMIN_URL")
            .ok_or_else(|| AdminError::Config("ADMIN_URL must be set".to_string()))?;

        let page_size = match non_empty("ADMIN_PAGE_SIZE") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(AdminError::Config(format!(
                        "ADMIN_PAGE_SIZE must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            None => DEFAULT_PAGE_SIZE,
        };

        let timeout_secs = match non_empty("ADMIN_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                AdminError::Config(format!("ADMIN_TIMEOUT_SECS is invalid: {}", e))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            auth_token: non_empty("ADMIN_TOKEN"),
            page_size,
            filter: non_empty("ADMIN_FILTER"),
            timeout_secs,
        })
    }
}
