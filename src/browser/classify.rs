use crate::models::schema::{Column, Relation};

const UUID_V7_CHECK: &str = "is_uuid_v7";
const JSON_CHECK: &str = "is_json";
const FILE_UPLOAD_CHECK: &str = "jsonschema('std.FileUpload'";
const FILE_UPLOADS_CHECK: &str = "jsonschema('std.FileUploads'";

/// Semantic rendering category of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Plain,
    Json,
    File,
    FileArray,
    Uuidv7,
}

impl ColumnKind {
    /// Label shown in the column header; plain columns show their declared type.
    pub fn type_label<'a>(&self, data_type: &'a str) -> &'a str {
        match self {
            ColumnKind::Uuidv7 => "UUIDv7",
            ColumnKind::Json => "JSON",
            ColumnKind::File => "File",
            ColumnKind::FileArray => "File[]",
            ColumnKind::Plain => data_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ColumnKind,
    pub nullable: bool,
    pub foreign_key: Option<ForeignKeyRef>,
}

fn has_check(column: &Column, prefix: &str) -> bool {
    column.checks().any(|check| check.starts_with(prefix))
}

pub fn classify(column: &Column) -> Classification {
    let kind = if has_check(column, UUID_V7_CHECK) {
        ColumnKind::Uuidv7
    } else if has_check(column, JSON_CHECK) {
        ColumnKind::Json
    } else if has_check(column, FILE_UPLOAD_CHECK) {
        ColumnKind::File
    } else if has_check(column, FILE_UPLOADS_CHECK) {
        ColumnKind::FileArray
    } else {
        ColumnKind::Plain
    };

    let foreign_key = column.foreign_key().map(|(table, columns)| ForeignKeyRef {
        table: table.to_string(),
        columns: columns.to_vec(),
    });

    Classification {
        kind,
        nullable: !column.is_not_null(),
        foreign_key,
    }
}

/// Position of the primary key column, if the relation has one.
pub fn find_primary_key_column_index(columns: &[Column]) -> Option<usize> {
    columns.iter().position(Column::is_primary_key)
}

/// Whether a relation can back a Record API: a strict base table keyed by a UUIDv7
/// primary key.
pub fn satisfies_record_api_requirements(relation: &Relation) -> bool {
    let Relation::Table(table) = relation else {
        return false;
    };
    if !table.strict || table.virtual_table {
        return false;
    }

    find_primary_key_column_index(&table.columns)
        .map(|idx| classify(&table.columns[idx]).kind == ColumnKind::Uuidv7)
        .unwrap_or(false)
}
