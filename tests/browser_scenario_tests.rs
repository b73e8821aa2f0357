use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use serde_json::{json, Value};
use tablepane::api::AdminApi;
use tablepane::browser::columns::CellView;
use tablepane::browser::{BrowserStatus, DeleteOutcome, TableBrowserController};
use tablepane::config::AdminConfig;
use tablepane::errors::AdminError;
use tablepane::models::rows::{
    DeleteRowsRequest, InsertRowRequest, ListRowsQuery, ListRowsResponse, UpdateRowRequest,
};
use tablepane::models::schema::{Column, ColumnOption, ListSchemasResponse, Relation, Table, View};
use tablepane::AdminManager;
use uuid::Uuid;

const USERS: usize = 100;

fn encoded_id(i: usize) -> String {
    URL_SAFE.encode(Uuid::from_u128(i as u128).as_bytes())
}

fn users_columns() -> Vec<Column> {
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

fn photos_columns() -> Vec<Column> {
    vec![
        Column::new("id", "INTEGER").with_option(ColumnOption::Unique {
            is_primary: true,
            conflict_clause: None,
        }),
        Column::new("image", "TEXT").with_option(ColumnOption::Check(
            "jsonschema('std.FileUpload', image)".to_string(),
        )),
    ]
}

fn schemas() -> ListSchemasResponse {
    ListSchemasResponse {
        tables: vec![
            Table {
                name: "users".to_string(),
                columns: users_columns(),
                strict: true,
                virtual_table: false,
                temporary: false,
            },
            Table {
                name: "photos".to_string(),
                columns: photos_columns(),
                strict: true,
                virtual_table: false,
                temporary: false,
            },
        ],
        indexes: vec![],
        triggers: vec![],
        views: vec![View {
            name: "photo_view".to_string(),
            columns: Some(photos_columns()),
            query: "SELECT * FROM photos".to_string(),
            temporary: false,
        }],
    }
}

/// Serves `users` and `photos` from memory with cursor paging.
struct InMemoryAdmin {
    users: Mutex<Vec<(String, String)>>,
    queries: Mutex<Vec<(String, ListRowsQuery)>>,
    failing: AtomicBool,
}

impl InMemoryAdmin {
    fn new() -> Self {
        let users = (0..USERS)
            .map(|i| (encoded_id(i), format!("user{}@example.com", i)))
            .collect();
        Self {
            users: Mutex::new(users),
            queries: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    fn last_query(&self) -> ListRowsQuery {
        self.queries.lock().unwrap().last().unwrap().1.clone()
    }

    fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    fn list_users(&self, query: &ListRowsQuery) -> Result<ListRowsResponse, AdminError> {
        let users = self.users.lock().unwrap();
        let matching: Vec<&(String, String)> = match query.filter.as_deref() {
            Some(filter) => {
                let email = filter.strip_prefix("email=").ok_or_else(|| AdminError::Status {
                    status: 400,
                    body: format!("unsupported filter: {}", filter),
                })?;
                users.iter().filter(|(_, e)| e == email).collect()
            }
            None => users.iter().collect(),
        };

        let start = match &query.cursor {
            Some(cursor) => matching
                .iter()
                .position(|(id, _)| id == cursor)
                .map(|pos| pos + 1)
                .ok_or_else(|| AdminError::Status {
                    status: 400,
                    body: "bad cursor".to_string(),
                })?,
            None => query.offset.unwrap_or(0),
        };
        let end = (start + query.page_size).min(matching.len());
        let page = &matching[start.min(end)..end];

        Ok(ListRowsResponse {
            rows: page
                .iter()
                .map(|(id, email)| vec![json!(id), json!(email)])
                .collect(),
            columns: users_columns(),
            total_row_count: matching.len() as u64,
            cursor: if end < matching.len() {
                page.last().map(|(id, _)| id.clone())
            } else {
                None
            },
        })
    }

    fn list_photos(&self) -> ListRowsResponse {
        let descriptor = json!({
            "id": "f1",
            "filename": "cat.png",
            "mime_type": "image/png",
        })
        .to_string();

        ListRowsResponse {
            rows: vec![
                vec![json!(1), Value::String(descriptor)],
                vec![json!(2), Value::Null],
            ],
            columns: photos_columns(),
            total_row_count: 2,
            cursor: None,
        }
    }
}

#[async_trait]
impl AdminApi for InMemoryAdmin {
    async fn list_schemas(&self) -> Result<ListSchemasResponse, AdminError> {
        Ok(schemas())
    }

    async fn list_rows(
        &self,
        table_name: &str,
        query: &ListRowsQuery,
    ) -> Result<ListRowsResponse, AdminError> {
        self.queries
            .lock()
            .unwrap()
            .push((table_name.to_string(), query.clone()));

        if self.failing.load(Ordering::SeqCst) {
            return Err(AdminError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        match table_name {
            "users" => self.list_users(query),
            "photos" | "photo_view" => Ok(self.list_photos()),
            other => Err(AdminError::Status {
                status: 404,
                body: format!("no such table: {}", other),
            }),
        }
    }

    async fn insert_row(
        &self,
        _table_name: &str,
        request: &InsertRowRequest,
    ) -> Result<String, AdminError> {
        let id = request.row["id"].as_str().unwrap_or_default().to_string();
        let email = request.row["email"].as_str().unwrap_or_default().to_string();
        self.users.lock().unwrap().push((id.clone(), email));
        Ok(id)
    }

    async fn update_row(
        &self,
        _table_name: &str,
        request: &UpdateRowRequest,
    ) -> Result<String, AdminError> {
        let id = request.primary_key_value.as_str().unwrap_or_default();
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|(uid, _)| uid == id)
            .ok_or_else(|| AdminError::Status {
                status: 404,
                body: "no such row".to_string(),
            })?;
        if let Some(email) = request.row.get("email").and_then(Value::as_str) {
            user.1 = email.to_string();
        }
        Ok(String::new())
    }

    async fn delete_rows(
        &self,
        _table_name: &str,
        request: &DeleteRowsRequest,
    ) -> Result<String, AdminError> {
        assert_eq!(request.primary_key_column, "id");
        self.users
            .lock()
            .unwrap()
            .retain(|(id, _)| !request.values.contains(id));
        Ok(String::new())
    }

    async fn fetch_file(&self, _path: &str) -> Result<Vec<u8>, AdminError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

fn manager(api: Arc<InMemoryAdmin>) -> AdminManager {
    AdminManager::with_api(
        api,
        AdminConfig {
            base_url: "http://localhost:4000/api/_admin".to_string(),
            auth_token: None,
            page_size: 20,
            filter: None,
            timeout_secs: 5,
        },
    )
}

async fn open(manager: &AdminManager, name: &str) -> TableBrowserController {
    let relation: Relation = manager
        .list_schemas()
        .await
        .unwrap()
        .relations()
        .into_iter()
        .find(|r| r.name() == name)
        .unwrap();
    let mut browser = manager.open_browser(relation);
    assert!(browser.sync().await.unwrap());
    browser
}

#[tokio::test]
async fn test_paging_through_users() {
    let api = Arc::new(InMemoryAdmin::new());
    let manager = manager(api.clone());
    let mut browser = open(&manager, "users").await;

    let first = api.last_query();
    assert_eq!(first.cursor, None);
    assert_eq!(first.offset, None);
    assert_eq!(first.page_size, 20);
    assert_eq!(browser.page_count(), Some(5));

    let state = browser.state().unwrap();
    assert_eq!(state.response.rows.len(), 20);
    assert_eq!(
        state.render_row(0).unwrap()[0],
        CellView::Uuid("00000000-0000-0000-0000-000000000000".to_string())
    );

    browser.next_page();
    assert!(browser.sync().await.unwrap());
    assert_eq!(api.last_query().cursor, Some(encoded_id(19)));
    assert_eq!(browser.cursors().len(), 2);
    assert_eq!(
        browser.state().unwrap().pk_value(0),
        Some(encoded_id(20))
    );

    browser.previous_page();
    assert!(browser.sync().await.unwrap());
    let back = api.last_query();
    assert_eq!(back.cursor, None);
    assert_eq!(back.offset, None);

    // Nothing changed, nothing fetched.
    let count = api.query_count();
    assert!(!browser.sync().await.unwrap());
    assert_eq!(api.query_count(), count);
}

#[tokio::test]
async fn test_jump_past_known_cursors_uses_offset() {
    let api = Arc::new(InMemoryAdmin::new());
    let manager = manager(api.clone());
    let mut browser = open(&manager, "users").await;

    browser.set_page_index(3);
    assert!(browser.sync().await.unwrap());

    let query = api.last_query();
    assert_eq!(query.cursor, None);
    assert_eq!(query.offset, Some(60));
    assert_eq!(browser.state().unwrap().pk_value(0), Some(encoded_id(60)));

    // Clamped to the last page.
    browser.set_page_index(40);
    assert_eq!(browser.pagination().page_index, 4);
}

#[tokio::test]
async fn test_failed_fetch_keeps_stale_rows() {
    let api = Arc::new(InMemoryAdmin::new());
    let manager = manager(api.clone());
    let mut browser = open(&manager, "users").await;
    let cursors = browser.cursors().to_vec();

    api.failing.store(true, Ordering::SeqCst);
    browser.next_page();
    assert!(browser.sync().await.unwrap());

    match browser.status() {
        BrowserStatus::Error { message, stale } => {
            assert!(message.contains("503"));
            assert!(stale.is_some());
        }
        other => panic!("expected error status, got {:?}", other),
    }
    assert_eq!(browser.state().unwrap().pk_value(0), Some(encoded_id(0)));
    assert_eq!(browser.cursors().to_vec(), cursors);

    api.failing.store(false, Ordering::SeqCst);
    browser.request_refresh();
    assert!(browser.sync().await.unwrap());
    assert!(matches!(browser.status(), BrowserStatus::Ready(_)));
    assert_eq!(browser.state().unwrap().pk_value(0), Some(encoded_id(20)));
}

#[tokio::test]
async fn test_first_fetch_failure_is_reported() {
    let api = Arc::new(InMemoryAdmin::new());
    api.failing.store(true, Ordering::SeqCst);
    let manager = manager(api.clone());
    let relation = manager.list_schemas().await.unwrap().relations().remove(0);
    let mut browser = manager.open_browser(relation);

    let result = browser.sync().await;
    assert!(matches!(result, Err(AdminError::Status { status: 503, .. })));
    assert!(browser.state().is_none());
}

#[tokio::test]
async fn test_filter_narrows_rows() {
    let api = Arc::new(InMemoryAdmin::new());
    let manager = manager(api.clone());
    let mut browser = open(&manager, "users").await;

    browser.submit_filter("  email=user7@example.com ");
    assert!(browser.sync().await.unwrap());

    assert_eq!(
        api.last_query().filter.as_deref(),
        Some("email=user7@example.com")
    );
    let state = browser.state().unwrap();
    assert_eq!(state.response.total_row_count, 1);
    assert_eq!(browser.page_count(), Some(1));
    assert!(!browser.has_next_page());

    browser.submit_filter("");
    assert!(browser.sync().await.unwrap());
    assert_eq!(api.last_query().filter, None);
    assert_eq!(browser.state().unwrap().response.total_row_count, 100);
}

#[tokio::test]
async fn test_mutations_refetch_rows() {
    let api = Arc::new(InMemoryAdmin::new());
    let manager = manager(api.clone());
    let mut browser = open(&manager, "users").await;

    let doomed = browser.state().unwrap().pk_value(0).unwrap();
    let outcome = browser.delete_rows(vec![doomed]).await.unwrap();
    assert!(matches!(outcome, DeleteOutcome::Deleted(_)));
    let state = browser.state().unwrap();
    assert_eq!(state.response.total_row_count, 99);
    assert_eq!(state.pk_value(0), Some(encoded_id(1)));

    assert_eq!(
        browser.delete_rows(vec![]).await.unwrap(),
        DeleteOutcome::Noop
    );

    let mut form = browser.row_as_form(0).unwrap();
    form.insert("email".to_string(), json!("renamed@example.com"));
    browser.update_row(form).await.unwrap();
    assert_eq!(
        browser.state().unwrap().render_row(0).unwrap()[1].to_string(),
        "renamed@example.com"
    );

    let mut row = serde_json::Map::new();
    row.insert("id".to_string(), json!(encoded_id(500)));
    row.insert("email".to_string(), json!("new@example.com"));
    browser.insert_row(row).await.unwrap();
    assert_eq!(browser.state().unwrap().response.total_row_count, 100);
}

#[tokio::test]
async fn test_thumbnails_only_on_tables() {
    let api = Arc::new(InMemoryAdmin::new());
    let manager = manager(api.clone());

    let mut browser = open(&manager, "photos").await;
    let state = browser.state().unwrap();
    assert_eq!(state.column_defs[1].header, "image [File?]");
    match &state.render_row(0).unwrap()[1] {
        CellView::Thumbnails(thumbs) => {
            assert_eq!(thumbs.len(), 1);
            assert_eq!(
                thumbs[0].url,
                "/table/photos/files?pk_column=id&pk_value=1&file_column_name=image"
            );
            let bytes = browser.fetch_thumbnail(&thumbs[0]).await.unwrap();
            assert_eq!(&bytes[1..4], b"PNG");
        }
        other => panic!("expected thumbnails, got {:?}", other),
    }
    assert_eq!(state.render_row(1).unwrap()[1], CellView::Null);

    let view = manager
        .list_schemas()
        .await
        .unwrap()
        .relations()
        .into_iter()
        .find(|r| r.name() == "photo_view")
        .unwrap();
    browser.select_table(view);
    assert!(browser.state().is_none());
    assert!(browser.sync().await.unwrap());

    let state = browser.state().unwrap();
    assert!(!state.column_defs[1].thumbnails_enabled());
    assert!(matches!(state.render_row(0).unwrap()[1], CellView::Value(_)));

    let result = browser.delete_rows(vec!["1".to_string()]).await;
    assert!(matches!(result, Err(AdminError::ReadOnly(_))));
}
