use serde::{Deserialize, Serialize};

/// Column constraint as emitted by the schema service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ColumnOption {
    Null,
    NotNull,
    Default(String),
    Check(String),
    Unique {
        is_primary: bool,
        #[serde(default)]
        conflict_clause: Option<String>,
    },
    ForeignKey {
        foreign_table: String,
        referred_columns: Vec<String>,
        #[serde(default)]
        on_delete: Option<String>,
        #[serde(default)]
        on_update: Option<String>,
    },
    Generated {
        expr: String,
        #[serde(default)]
        mode: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub options: Vec<ColumnOption>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, option: ColumnOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn is_not_null(&self) -> bool {
        self.options
            .iter()
            .any(|opt| matches!(opt, ColumnOption::NotNull))
    }

    pub fn is_primary_key(&self) -> bool {
        self.options
            .iter()
            .any(|opt| matches!(opt, ColumnOption::Unique { is_primary: true, .. }))
    }

    /// Expressions of all `CHECK` constraints on this column.
    pub fn checks(&self) -> impl Iterator<Item = &str> {
        self.options.iter().filter_map(|opt| match opt {
            ColumnOption::Check(expr) => Some(expr.as_str()),
            _ => None,
        })
    }

    /// Returns `(foreign_table, referred_columns)` of the first foreign key option.
    pub fn foreign_key(&self) -> Option<(&str, &[String])> {
        self.options.iter().find_map(|opt| match opt {
            ColumnOption::ForeignKey {
                foreign_table,
                referred_columns,
                ..
            } => Some((foreign_table.as_str(), referred_columns.as_slice())),
            _ => None,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub virtual_table: bool,
    #[serde(default)]
    pub temporary: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct View {
    pub name: String,
    /// Only available when the view's columns could be inferred.
    #[serde(default)]
    pub columns: Option<Vec<Column>>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub temporary: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TableKind {
    Table,
    View,
    VirtualTable,
}

/// A browsable relation: either a table or a view.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    Table(Table),
    View(View),
}

impl Relation {
    pub fn name(&self) -> &str {
        match self {
            Relation::Table(table) => &table.name,
            Relation::View(view) => &view.name,
        }
    }

    pub fn kind(&self) -> TableKind {
        match self {
            Relation::Table(table) if table.virtual_table => TableKind::VirtualTable,
            Relation::Table(_) => TableKind::Table,
            Relation::View(_) => TableKind::View,
        }
    }

    pub fn columns(&self) -> &[Column] {
        match self {
            Relation::Table(table) => &table.columns,
            Relation::View(view) => view.columns.as_deref().unwrap_or(&[]),
        }
    }

    /// Internal relations are prefixed with an underscore.
    pub fn is_hidden(&self) -> bool {
        self.name().starts_with('_')
    }

    /// Rows may only be inserted, updated or deleted on visible base tables.
    pub fn is_mutable(&self) -> bool {
        self.kind() == TableKind::Table && !self.is_hidden()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnOrder {
    pub column_name: String,
    #[serde(default)]
    pub ascending: Option<bool>,
    #[serde(default)]
    pub nulls_first: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TableIndex {
    pub name: String,
    pub table_name: String,
    pub columns: Vec<ColumnOrder>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub predicate: Option<String>,
}

impl TableIndex {
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.column_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn display_predicate(&self) -> Option<String> {
        self.predicate.as_ref().map(|p| p.replace("<>", "!="))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TableTrigger {
    pub name: String,
    pub table_name: String,
    pub sql: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ListSchemasResponse {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub indexes: Vec<TableIndex>,
    #[serde(default)]
    pub triggers: Vec<TableTrigger>,
    #[serde(default)]
    pub views: Vec<View>,
}

impl ListSchemasResponse {
    /// Tables first, then views, each in server order.
    pub fn relations(&self) -> Vec<Relation> {
        self.tables
            .iter()
            .cloned()
            .map(Relation::Table)
            .chain(self.views.iter().cloned().map(Relation::View))
            .collect()
    }

    pub fn indexes_for(&self, table_name: &str) -> Vec<&TableIndex> {
        self.indexes
            .iter()
            .filter(|idx| idx.table_name == table_name)
            .collect()
    }

    pub fn triggers_for(&self, table_name: &str) -> Vec<&TableTrigger> {
        self.triggers
            .iter()
            .filter(|trig| trig.table_name == table_name)
            .collect()
    }
}
