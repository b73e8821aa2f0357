use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{
    config::AdminConfig,
    errors::AdminError,
    models::{
        rows::{
            DeleteRowsRequest, InsertRowRequest, ListRowsQuery, ListRowsResponse, UpdateRowRequest,
        },
        schema::ListSchemasResponse,
    },
};

use super::{table_path, AdminApi};

pub struct HttpAdminClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpAdminClient {
    pub fn connect(config: &AdminConfig) -> Result<Self, AdminError> {
        let client = Client::builder()
            .user_agent(concat!("tablepane/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdminError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url_for(path);
        debug!("{} {}", method, url);

        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, AdminError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AdminError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("admin request failed with {}: {}", status, body);
            return Err(AdminError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, AdminError> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| AdminError::Decode(e.to_string()))
    }

    async fn text(&self, builder: RequestBuilder) -> Result<String, AdminError> {
        Ok(self.send(builder).await?.text().await?)
    }
}

#[async_trait]
impl AdminApi for HttpAdminClient {
    async fn list_schemas(&self) -> Result<ListSchemasResponse, AdminError> {
        self.json(self.request(Method::GET, "/tables")).await
    }

    async fn list_rows(
        &self,
        table_name: &str,
        query: &ListRowsQuery,
    ) -> Result<ListRowsResponse, AdminError> {
        let builder = self
            .request(Method::GET, &table_path(table_name, &["rows"])?)
            .query(query);
        self.json(builder).await
    }

    async fn insert_row(
        &self,
        table_name: &str,
        request: &InsertRowRequest,
    ) -> Result<String, AdminError> {
        let builder = self
            .request(Method::POST, &table_path(table_name, &[])?)
            .json(request);
        self.text(builder).await
    }

    async fn update_row(
        &self,
        table_name: &str,
        request: &UpdateRowRequest,
    ) -> Result<String, AdminError> {
        let builder = self
            .request(Method::PATCH, &table_path(table_name, &[])?)
            .json(request);
        self.text(builder).await
    }

    async fn delete_rows(
        &self,
        table_name: &str,
        request: &DeleteRowsRequest,
    ) -> Result<String, AdminError> {
        let builder = self
            .request(Method::DELETE, &table_path(table_name, &["rows"])?)
            .json(request);
        self.text(builder).await
    }

    async fn fetch_file(&self, path: &str) -> Result<Vec<u8>, AdminError> {
        let bytes = self
            .send(self.request(Method::GET, path))
            .await?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
