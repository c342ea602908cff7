//! # keel-dao
//!
//! A stateful data accessor that can be re-entered safely while an
//! operation is being built, with memoized reads.
//!
//! This crate provides:
//! - [`Accessor`], the fluent builder and executor
//! - [`ContextStack`], the save/restore mechanism behind nested operations
//! - [`Session`] and [`ResultCache`], reads shared across accessors until a flush
//! - [`Driver`] and [`Metadata`], the seams to a database, with [`SqliteDriver`]
//! - [`SqlLoader`] / [`FsSqlLoader`] for named SQL resources
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use keel_dao::{Accessor, SqliteDriver};
//!
//! async fn example() -> keel_dao::Result<()> {
//!     let driver = Arc::new(SqliteDriver::connect("sqlite://app.db").await?);
//!     let mut dao = Accessor::new(driver);
//!     dao.begin().await?;
//!
//!     let adults = dao
//!         .start_operation("users")
//!         .filter("age")?
//!         .greater_or_equals(18_i64)?
//!         .and("name")?
//!         .like("A%")?
//!         .find()
//!         .await?;
//!
//!     dao.flush().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Nested operations
//!
//! Starting an operation while another is being built saves the outer one;
//! the inner terminal call restores it:
//!
//! ```ignore
//! dao.start_operation("orders").filter("status")?.equals_to("open")?;
//! let customer = dao.start_operation("customers").filter("id")?.equals_to(7_i64)?.first().await?;
//! let orders = dao.find().await?; // still filtered on status = 'open'
//! ```
//!
//! ## Parameters
//!
//! Named values are bound to `?name?` (global) or `?key:name?` (scoped)
//! placeholders in the SELECT text and rendered as escaped literals:
//!
//! ```ignore
//! dao.start_operation("users")
//!     .sql("SELECT * FROM users WHERE team = ?team? AND role = ?acl:role?")
//!     .bind_params([("team", "core")], None)
//!     .bind_params([("role", "admin")], Some("acl"))
//!     .find()
//!     .await?;
//! ```

pub mod accessor;
pub mod cache;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod loader;
pub mod session;

pub use accessor::Accessor;
pub use cache::{statement_key, ResultCache};
pub use config::AccessorConfig;
pub use context::{ContextStack, ExecutionContext};
pub use driver::{
    ColumnDescription, Driver, ForeignKeyDescription, IndexDescription, Metadata,
    ProcedureArgument, ProcedureDescription, QueryOutcome, SqliteDriver, TableDescription,
};
pub use error::{DaoError, Result};
pub use loader::{FsSqlLoader, SqlLoader};
pub use session::Session;
