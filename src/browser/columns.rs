use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;
use uuid::Uuid;

use crate::{
    api::table_path,
    errors::AdminError,
    models::schema::{Column, TableKind},
};

use super::classify::{classify, Classification, ColumnKind};

/// At most this many thumbnails are shown for a file-array cell.
pub const MAX_THUMBNAILS: usize = 3;

/// Stored descriptor of an uploaded file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileUpload {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    pub mime_type: String,
}

impl FileUpload {
    pub fn is_image(&self) -> bool {
        matches!(self.mime_type.as_str(), "image/jpeg" | "image/png")
    }
}

/// A fetchable image, addressed relative to the admin API root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailRef {
    pub url: String,
    pub mime_type: String,
}

/// Rendered form of a single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellView {
    Null,
    Uuid(String),
    Thumbnails(Vec<ThumbnailRef>),
    Value(Value),
}

impl fmt::Display for CellView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellView::Null => f.write_str("NULL"),
            CellView::Uuid(uuid) => f.write_str(uuid),
            CellView::Thumbnails(thumbs) => {
                let labels: Vec<String> = thumbs
                    .iter()
                    .map(|t| format!("[{}]", t.mime_type))
                    .collect();
                f.write_str(&labels.join(" "))
            }
            CellView::Value(Value::String(s)) => f.write_str(s),
            CellView::Value(other) => write!(f, "{}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ThumbnailSource {
    table_name: String,
    pk_index: usize,
    pk_column: String,
}

/// Header and render policy of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub index: usize,
    pub header: String,
    pub classification: Classification,
    thumbnails: Option<ThumbnailSource>,
}

pub fn format_header(column: &Column, classification: &Classification) -> String {
    let type_label = classification.kind.type_label(&column.data_type);
    let nullable = if classification.nullable { "?" } else { "" };

    match &classification.foreign_key {
        Some(fk) => format!(
            "{} [{}{}] ‣ {}[{}]",
            column.name,
            type_label,
            nullable,
            fk.table,
            fk.columns.join(",")
        ),
        None => format!("{} [{}{}]", column.name, type_label, nullable),
    }
}

/// Builds one column definition per column, in order.
///
/// Thumbnails are only enabled on base tables: image retrieval goes through the record
/// file endpoint, which views are not guaranteed to serve.
pub fn build_column_defs(
    table_name: &str,
    table_kind: TableKind,
    pk_column: Option<usize>,
    columns: &[Column],
) -> Vec<ColumnDef> {
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let classification = classify(column);
            let is_file = matches!(
                classification.kind,
                ColumnKind::File | ColumnKind::FileArray
            );

            let thumbnails = match pk_column {
                Some(pk_index) if is_file && table_kind == TableKind::Table => {
                    columns.get(pk_index).map(|pk| ThumbnailSource {
                        table_name: table_name.to_string(),
                        pk_index,
                        pk_column: pk.name.clone(),
                    })
                }
                _ => None,
            };

            ColumnDef {
                name: column.name.clone(),
                index,
                header: format_header(column, &classification),
                classification,
                thumbnails,
            }
        })
        .collect()
}

impl ColumnDef {
    pub fn thumbnails_enabled(&self) -> bool {
        self.thumbnails.is_some()
    }

    /// Renders this column's cell of `row`.
    ///
    /// Malformed file descriptors are reported as [`AdminError::Render`].
    pub fn render(&self, row: &[Value]) -> Result<CellView, AdminError> {
        let value = row.get(self.index).unwrap_or(&Value::Null);
        let text = match value {
            Value::Null => return Ok(CellView::Null),
            Value::String(text) => text,
            other => return Ok(CellView::Value(other.clone())),
        };

        match self.classification.kind {
            ColumnKind::Uuidv7 => decode_uuid(text).map(CellView::Uuid),
            ColumnKind::File => {
                let Some((source, pk_value)) = self.thumbnail_source(row) else {
                    return Ok(CellView::Value(value.clone()));
                };
                let upload: FileUpload = parse_descriptor(text)?;
                if !upload.is_image() {
                    return Ok(CellView::Value(value.clone()));
                }

                Ok(CellView::Thumbnails(vec![ThumbnailRef {
                    url: file_url(&source.table_name, &source.pk_column, &pk_value, &self.name, None)?,
                    mime_type: upload.mime_type,
                }]))
            }
            ColumnKind::FileArray => {
                let Some((source, pk_value)) = self.thumbnail_source(row) else {
                    return Ok(CellView::Value(value.clone()));
                };
                let uploads: Vec<FileUpload> = parse_descriptor(text)?;
                let thumbs = uploads
                    .into_iter()
                    .enumerate()
                    .filter(|(_, upload)| upload.is_image())
                    .take(MAX_THUMBNAILS)
                    .map(|(idx, upload)| {
                        Ok(ThumbnailRef {
                            url: file_url(
                                &source.table_name,
                                &source.pk_column,
                                &pk_value,
                                &self.name,
                                Some(idx),
                            )?,
                            mime_type: upload.mime_type,
                        })
                    })
                    .collect::<Result<Vec<_>, AdminError>>()?;

                if thumbs.is_empty() {
                    Ok(CellView::Value(value.clone()))
                } else {
                    Ok(CellView::Thumbnails(thumbs))
                }
            }
            ColumnKind::Json | ColumnKind::Plain => Ok(CellView::Value(value.clone())),
        }
    }

    fn thumbnail_source(&self, row: &[Value]) -> Option<(&ThumbnailSource, String)> {
        let source = self.thumbnails.as_ref()?;
        let pk_value = match row.get(source.pk_index)? {
            Value::Null => return None,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Some((source, pk_value))
    }
}

fn parse_descriptor<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, AdminError> {
    serde_json::from_str(text)
        .map_err(|e| AdminError::Render(format!("invalid file descriptor: {}", e)))
}

/// Decodes the URL-safe base64 wire form of a UUID into hyphenated text.
pub fn decode_uuid(encoded: &str) -> Result<String, AdminError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|e| AdminError::Render(format!("invalid uuid encoding '{}': {}", encoded, e)))?;
    let uuid = Uuid::from_slice(&bytes)
        .map_err(|e| AdminError::Render(format!("invalid uuid '{}': {}", encoded, e)))?;
    Ok(uuid.hyphenated().to_string())
}

pub fn file_url(
    table_name: &str,
    pk_column: &str,
    pk_value: &str,
    file_column: &str,
    file_index: Option<usize>,
) -> Result<String, AdminError> {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("pk_column", pk_column)
        .append_pair("pk_value", pk_value)
        .append_pair("file_column_name", file_column);
    if let Some(idx) = file_index {
        query.append_pair("file_index", &idx.to_string());
    }

    Ok(format!(
        "{}?{}",
        table_path(table_name, &["files"])?,
        query.finish()
    ))
}
