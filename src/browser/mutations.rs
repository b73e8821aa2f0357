use crate::{
    errors::AdminError,
    models::{
        rows::{DeleteRowsRequest, FormRow, InsertRowRequest, UpdateRowRequest},
        schema::Column,
    },
};

use super::classify::find_primary_key_column_index;

/// Outcome of a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(String),
    /// Nothing was selected; no request was made.
    Noop,
}

pub fn insert_request(row: FormRow) -> InsertRowRequest {
    InsertRowRequest { row }
}

/// Builds an update keyed by the primary key; the key itself cannot be changed.
pub fn update_request(columns: &[Column], mut row: FormRow) -> Result<UpdateRowRequest, AdminError> {
    let pk_index = find_primary_key_column_index(columns)
        .ok_or_else(|| AdminError::MissingPrimaryKey("no primary key column found".to_string()))?;
    let pk_column = columns[pk_index].name.clone();

    let pk_value = row.remove(&pk_column).ok_or_else(|| {
        AdminError::MissingPrimaryKey(format!("row is missing primary key '{}'", pk_column))
    })?;

    Ok(UpdateRowRequest {
        primary_key_column: pk_column,
        primary_key_value: pk_value,
        row,
    })
}

/// Returns `None` for an empty selection.
pub fn delete_request(
    columns: &[Column],
    pk_index: Option<usize>,
    values: Vec<String>,
) -> Result<Option<DeleteRowsRequest>, AdminError> {
    if values.is_empty() {
        return Ok(None);
    }

    let pk_column = pk_index
        .and_then(|idx| columns.get(idx))
        .ok_or_else(|| AdminError::MissingPrimaryKey("no primary key column found".to_string()))?;

    Ok(Some(DeleteRowsRequest {
        primary_key_column: pk_column.name.clone(),
        values,
    }))
}
