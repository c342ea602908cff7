//! Error types for the accessor.

use keel_core::{FilterError, RenderError};
use thiserror::Error;

/// Accessor errors.
#[derive(Debug, Error)]
pub enum DaoError {
    /// Database error from sqlx, passed through unchanged.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error reported by a non-sqlx driver.
    #[error("driver error: {0}")]
    Driver(String),

    /// Filter grammar misuse.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Statement rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// IO error while loading a SQL resource.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A terminal operation ran without a working table.
    #[error("no working table: call start_operation first")]
    NoWorkingTable,

    /// Database access is switched off in the configuration.
    #[error("database access is disabled")]
    DatabaseDisabled,

    /// Attempted to pop the initial execution context.
    #[error("execution context underflow: the initial context cannot be popped")]
    ContextUnderflow,

    /// The procedure is not known for the working table.
    #[error("procedure '{procedure}' is not defined for table '{table}'")]
    UnknownProcedure {
        /// Working table.
        table: String,
        /// Requested procedure.
        procedure: String,
    },

    /// The driver returned a rowset where a count was expected, or the
    /// other way round.
    #[error("unexpected driver outcome for {0}")]
    UnexpectedOutcome(String),
}

/// Result type alias for accessor operations.
pub type Result<T> = std::result::Result<T, DaoError>;
