use std::sync::Arc;

use api::{http::HttpAdminClient, AdminApi};
use browser::{BrowserOptions, TableBrowserController};
use config::AdminConfig;
use errors::AdminError;
use models::schema::{ListSchemasResponse, Relation};

pub mod api;
pub mod browser;
pub mod client;
pub mod config;
pub mod errors;
pub mod export;
pub mod models;

#[cfg(test)]
pub(crate) mod testing;

/// Entry point holding the admin API handle and browsing defaults.
pub struct AdminManager {
    api: Arc<dyn AdminApi>,
    config: AdminConfig,
}

impl AdminManager {
    pub fn connect(config: AdminConfig) -> Result<Self, AdminError> {
        let client = HttpAdminClient::connect(&config)?;
        Ok(Self::with_api(Arc::new(client), config))
    }

    pub fn with_api(api: Arc<dyn AdminApi>, config: AdminConfig) -> Self {
        AdminManager { api, config }
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub async fn list_schemas(&self) -> Result<ListSchemasResponse, AdminError> {
        self.api.list_schemas().await
    }

    /// Opens a browser on `relation` using the configured page size and initial filter.
    pub fn open_browser(&self, relation: Relation) -> TableBrowserController {
        TableBrowserController::new(
            self.api.clone(),
            relation,
            BrowserOptions {
                filter: self.config.filter.clone(),
                page_size: self.config.page_size,
            },
        )
    }
}
