use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AdminError;

use super::schema::Column;

/// One row, positionally aligned with the response's columns.
pub type RowData = Vec<Value>;

/// A row keyed by column name, as submitted to insert/update.
pub type FormRow = Map<String, Value>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ListRowsResponse {
    pub rows: Vec<RowData>,
    pub columns: Vec<Column>,
    pub total_row_count: u64,
    /// Token retrieving the page after this one.
    #[serde(default)]
    pub cursor: Option<String>,
}

impl ListRowsResponse {
    /// Checks that every row has exactly one value per column.
    pub fn validate(&self) -> Result<(), AdminError> {
        let width = self.columns.len();
        match self.rows.iter().position(|row| row.len() != width) {
            Some(idx) => Err(AdminError::Decode(format!(
                "row {} has {} values, expected {}",
                idx,
                self.rows[idx].len(),
                width
            ))),
            None => Ok(()),
        }
    }
}

/// Query string of `GET /table/{table}/rows`.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct ListRowsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// Everything a page fetch depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchArgs {
    pub table_name: String,
    pub filter: Option<String>,
    pub page_size: usize,
    pub page_index: usize,
    pub cursors: Vec<String>,
}

impl FetchArgs {
    /// Token marking the boundary before `page_index`, if one was recorded.
    pub fn cursor(&self) -> Option<&str> {
        self.page_index
            .checked_sub(1)
            .and_then(|idx| self.cursors.get(idx))
            .map(String::as_str)
    }

    pub fn to_query(&self) -> ListRowsQuery {
        let filter = self
            .filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        let cursor = self.cursor().map(str::to_string);
        // Without a recorded boundary we can still land on the page by counting rows.
        let offset = match (self.page_index, &cursor) {
            (0, _) | (_, Some(_)) => None,
            (idx, None) => Some(idx * self.page_size),
        };

        ListRowsQuery {
            filter,
            page_size: self.page_size,
            cursor,
            offset,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InsertRowRequest {
    pub row: FormRow,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UpdateRowRequest {
    pub primary_key_column: String,
    pub primary_key_value: Value,
    pub row: FormRow,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeleteRowsRequest {
    pub primary_key_column: String,
    pub values: Vec<String>,
}

pub fn row_to_form_row(columns: &[Column], row: &[Value]) -> FormRow {
    columns
        .iter()
        .zip(row.iter())
        .map(|(col, value)| (col.name.clone(), value.clone()))
        .collect()
}
