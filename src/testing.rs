use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use mockall::mock;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    api::AdminApi,
    errors::AdminError,
    models::{
        rows::{
            DeleteRowsRequest, InsertRowRequest, ListRowsQuery, ListRowsResponse, UpdateRowRequest,
        },
        schema::{Column, ColumnOption, ListSchemasResponse, Relation, Table, View},
    },
};

mock! {
    pub Admin {}

    #[async_trait]
    impl AdminApi for Admin {
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
        async fn fetch_file(&self, path: &str) -> Result<Vec<u8>, AdminError>;
    }
}

pub fn users_columns() -> Vec<Column> {
    vec![
        Column::new("id", "BLOB")
            .with_option(ColumnOption::Unique {
                is_primary: true,
                conflict_clause: None,
            })
            .with_option(ColumnOption::NotNull)
            .with_option(ColumnOption::Check("is_uuid_v7(id)".to_string())),
        Column::new("email", "TEXT").with_option(ColumnOption::NotNull),
    ]
}

pub fn users_table() -> Relation {
    Relation::Table(Table {
        name: "users".to_string(),
        columns: users_columns(),
        strict: true,
        virtual_table: false,
        temporary: false,
    })
}

pub fn posts_table() -> Relation {
    Relation::Table(Table {
        name: "posts".to_string(),
        columns: vec![Column::new("title", "TEXT")],
        strict: false,
        virtual_table: false,
        temporary: false,
    })
}

pub fn users_view() -> Relation {
    Relation::View(View {
        name: "active_users".to_string(),
        columns: Some(users_columns()),
        query: "SELECT * FROM users".to_string(),
        temporary: false,
    })
}

pub fn encoded_id(i: usize) -> String {
    URL_SAFE.encode(Uuid::from_u128(i as u128).as_bytes())
}

/// Page of `users` rows numbered from `first`; 100 rows in total.
pub fn users_page(first: usize, count: usize, cursor: Option<&str>) -> ListRowsResponse {
    let rows: Vec<Vec<Value>> = (first..first + count)
        .map(|i| {
            vec![
                json!(encoded_id(i)),
                json!(format!("user{}@example.com", i)),
            ]
        })
        .collect();

    ListRowsResponse {
        rows,
        columns: users_columns(),
        total_row_count: 100,
        cursor: cursor.map(str::to_string),
    }
}
