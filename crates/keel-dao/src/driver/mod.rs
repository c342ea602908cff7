//! Database driver and metadata provider interfaces.
//!
//! The accessor never talks to a database directly: it renders a
//! [`Statement`] and hands it to a [`Driver`]. Schema introspection goes
//! through [`Metadata`], which the insert path uses to find primary keys and
//! the procedure path uses to validate calls.

mod sqlite;

pub use sqlite::SqliteDriver;

use keel_core::{Escape, Rowset, Statement};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What a driver reports after executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Rows produced by a SELECT or CALL.
    Rows(Rowset),
    /// Outcome of a data-modifying statement.
    Affected {
        /// Number of rows changed.
        rows: u64,
        /// Generated key of the last inserted row, when the backend has one.
        last_insert_id: Option<i64>,
    },
}

impl QueryOutcome {
    /// Returns the rowset, treating a count as an empty result.
    #[must_use]
    pub fn into_rows(self) -> Rowset {
        match self {
            Self::Rows(rows) => rows,
            Self::Affected { .. } => Vec::new(),
        }
    }

    /// Returns the number of affected rows.
    #[must_use]
    pub fn affected(&self) -> u64 {
        match self {
            Self::Rows(rows) => rows.len() as u64,
            Self::Affected { rows, .. } => *rows,
        }
    }
}

/// Executes rendered statements.
///
/// Implementations also provide literal escaping, so that rendered string
/// values follow the backend's quoting rules.
#[allow(async_fn_in_trait)]
pub trait Driver: Escape + Send + Sync {
    /// Executes one statement.
    async fn execute(&self, statement: &Statement) -> Result<QueryOutcome>;

    /// Switches the active database.
    async fn select_database(&self, name: &str) -> Result<()>;

    /// Opens a transaction.
    async fn begin_transaction(&self) -> Result<()>;

    /// Commits the open transaction, if any.
    async fn commit(&self) -> Result<()>;
}

/// One column of a live table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    /// Declared type as reported by the backend, e.g. `VARCHAR(255)`.
    pub sql_type: String,
    pub nullable: bool,
    /// Default expression as written in the DDL.
    pub default: Option<String>,
    pub primary: bool,
    pub auto_increment: bool,
}

/// One index of a live table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub primary: bool,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// One foreign key of a live table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescription {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    /// Action keyword as reported, e.g. `CASCADE` or `NO ACTION`.
    pub on_update: String,
    pub on_delete: String,
}

/// Live structure of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<ColumnDescription>,
    pub indexes: Vec<IndexDescription>,
    pub foreign_keys: Vec<ForeignKeyDescription>,
}

/// One argument of a stored procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureArgument {
    pub name: String,
    pub sql_type: String,
}

/// Live definition of a stored procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDescription {
    pub name: String,
    pub args: Vec<ProcedureArgument>,
    pub output: Option<String>,
    pub body: String,
}

/// Schema introspection.
#[allow(async_fn_in_trait)]
pub trait Metadata: Send + Sync {
    /// Name of the table's single-column primary key, if it has one.
    async fn primary_key(&self, table: &str) -> Result<Option<String>>;

    /// Columns, indexes and foreign keys of `table`.
    async fn describe_table(&self, table: &str) -> Result<TableDescription>;

    /// Procedures that belong to `table`.
    async fn table_procedures(&self, table: &str) -> Result<Vec<String>>;

    /// Definition of the procedure `name`.
    async fn describe_procedure(&self, name: &str) -> Result<Option<ProcedureDescription>>;
}
