use async_trait::async_trait;
use url::Url;

use crate::{
    errors::AdminError,
    models::{
        rows::{DeleteRowsRequest, InsertRowRequest, ListRowsQuery, ListRowsResponse, UpdateRowRequest},
        schema::ListSchemasResponse,
    },
};

pub mod http;

/// Authenticated access to the admin endpoints.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn list_schemas(&self) -> Result<ListSchemasResponse, AdminError>;
    async fn list_rows(
        &self,
        table_name: &str,
        query: &ListRowsQuery,
    ) -> Result<ListRowsResponse, AdminError>;
    async fn insert_row(
        &self,
        table_name: &str,
        request: &InsertRowRequest,
    ) -> Result<String, AdminError>;
    async fn update_row(
        &self,
        table_name: &str,
        request: &UpdateRowRequest,
    ) -> Result<String, AdminError>;
    async fn delete_rows(
        &self,
        table_name: &str,
        request: &DeleteRowsRequest,
    ) -> Result<String, AdminError>;
    /// Fetches a binary payload addressed by an admin-relative path, e.g. a file URL.
    async fn fetch_file(&self, path: &str) -> Result<Vec<u8>, AdminError>;
}

/// Admin-relative path `/table/{table_name}/{segments..}` with every segment
/// percent-encoded.
pub fn table_path(table_name: &str, segments: &[&str]) -> Result<String, AdminError> {
    let mut url = Url::parse("admin:/")
        .map_err(|e| AdminError::General(format!("failed to build path: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| AdminError::General("path cannot be extended".to_string()))?
        .pop_if_empty()
        .push("table")
        .push(table_name)
        .extend(segments);
    Ok(url.path().to_string())
}
