//! Error types for blueprints and migrations.

use keel_dao::DaoError;

/// Validation failures raised while building a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlueprintError {
    /// Unknown column type name.
    #[error("Invalid column type: '{0}'")]
    InvalidType(String),

    /// Unknown index type name.
    #[error("Invalid index type: '{0}'")]
    InvalidIndexType(String),

    /// Unknown foreign key action.
    #[error("Invalid foreign key action: '{0}'")]
    InvalidAction(String),

    /// A modifier that only applies to integer columns.
    #[error("Column '{column}' of type {column_type} cannot be {modifier}")]
    IntegerOnly {
        /// Column name.
        column: String,
        /// Declared type.
        column_type: String,
        /// Rejected modifier (`unsigned`, `auto-increment`).
        modifier: &'static str,
    },

    /// Null default on a column that does not accept null.
    #[error("Column '{0}' is not nullable but defaults to NULL")]
    NullDefault(String),

    /// Primary key column made nullable.
    #[error("Column '{0}' is part of the primary key and cannot be nullable")]
    NullablePrimary(String),

    /// Current-timestamp default on a non-temporal column.
    #[error("Column '{column}' of type {column_type} cannot default to the current timestamp")]
    TimestampDefault {
        /// Column name.
        column: String,
        /// Declared type.
        column_type: String,
    },

    /// Column declared twice.
    #[error("Table '{table}' already has a column '{column}'")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Index name used twice.
    #[error("Table '{table}' already has an index '{index}'")]
    DuplicateIndex {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },

    /// A second primary index.
    #[error("Table '{table}' already has a primary index; '{index}' rejected")]
    SecondPrimaryIndex {
        /// Table name.
        table: String,
        /// Rejected index.
        index: String,
    },

    /// Index without columns.
    #[error("Index '{0}' has no columns")]
    EmptyIndex(String),

    /// Foreign key name used twice.
    #[error("Table '{table}' already has a foreign key '{name}'")]
    DuplicateForeignKey {
        /// Table name.
        table: String,
        /// Foreign key name.
        name: String,
    },

    /// Two foreign keys over the same local columns.
    #[error("Table '{table}' already has a foreign key on ({columns})")]
    DuplicateForeignKeyColumns {
        /// Table name.
        table: String,
        /// Local columns, comma separated.
        columns: String,
    },

    /// Local and referenced column lists differ in length or are empty.
    #[error("Foreign key '{name}' maps {local} local columns to {referenced} referenced columns")]
    ForeignKeyArity {
        /// Foreign key name.
        name: String,
        /// Local column count.
        local: usize,
        /// Referenced column count.
        referenced: usize,
    },

    /// An index, foreign key or seed names a column the table does not declare.
    #[error("Table '{table}' has no column '{column}'")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Procedure argument declared twice.
    #[error("Procedure '{procedure}' already has an argument '{argument}'")]
    DuplicateArgument {
        /// Procedure name.
        procedure: String,
        /// Argument name.
        argument: String,
    },

    /// Table declared twice in one schema.
    #[error("Schema already has a table '{0}'")]
    DuplicateTable(String),

    /// Procedure declared twice in one schema.
    #[error("Schema already has a procedure '{0}'")]
    DuplicateProcedure(String),
}

/// Errors raised by migration tooling.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Blueprint validation failed.
    #[error(transparent)]
    Blueprint(#[from] BlueprintError),

    /// The accessor or driver failed.
    #[error(transparent)]
    Dao(#[from] DaoError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The live database has no such table.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The live database has no such procedure.
    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
