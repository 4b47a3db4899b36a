//! Table snapshots and the schema-alteration session.
//!
//! [`TableDescription`] is what a client reports for one table. The
//! [`AlterSession`] keeps such a snapshot, uses it to skip statements that would
//! change nothing, and refreshes it after every DDL statement it runs.

mod alter;
pub mod ddl;


pub use alter::AlterSession;

use serde::{Deserialize, Serialize};

/// A foreign key held by a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub constraint: String,
    pub table: String,
    pub column: String,
}

/// Live metadata for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Type as the server spells it, without the unsigned flag.
    pub data_type: String,
    pub nullable: bool,
    /// Default expression as reported by the server.
    pub default: Option<String>,
    pub primary_key: bool,
    pub unique: bool,
    pub auto_increment: bool,
    pub unsigned: bool,
    pub foreign_key: Option<ForeignKeyRef>,
}

impl ColumnDescriptor {
    /// A nullable, unconstrained column of the given type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            primary_key: false,
            unique: false,
            auto_increment: false,
            unsigned: false,
            foreign_key: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

/// Snapshot of a table's columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    /// Name of the primary-key constraint, when the server reports one.
    pub primary_key_constraint: Option<String>,
}

impl TableDescription {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The primary-key column, if the table has a single-column primary key.
    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.primary_key)
    }
}
