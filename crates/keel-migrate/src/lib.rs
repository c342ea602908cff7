//! Schema blueprints for keel.
//!
//! `keel-migrate` describes database structure as validated Rust values:
//! - **Blueprints** - tables, columns, indexes, foreign keys and procedures,
//!   built with consuming builders that reject invalid structure immediately
//! - **Migrations** - the [`Migration`] trait, returning a desired [`SchemaBlueprint`]
//! - **Current state** - [`CurrentState`], which rebuilds blueprints from live metadata
//! - **Seeding** - [`Seeder`], which inserts a blueprint's seed rows through an accessor
//!
//! Turning the difference between two blueprints into DDL is not part of
//! this crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use keel_migrate::prelude::*;
//!
//! pub struct Initial;
//!
//! impl Migration for Initial {
//!     const NAME: &'static str = "0001_initial";
//!
//!     fn schema() -> std::result::Result<SchemaBlueprint, BlueprintError> {
//!         SchemaBlueprint::new().table(
//!             TableBlueprint::new("users")
//!                 .column(ColumnBlueprint::new("id", ColumnType::BigInt).auto_increment_primary()?)?
//!                 .column(ColumnBlueprint::new("email", ColumnType::String).length(255).not_null()?)?
//!                 .index(IndexBlueprint::new("uniq_email", IndexKind::Unique, ["email"])?)?,
//!         )
//!     }
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the current blueprint of a table as JSON
//! keel-migrate --database sqlite:app.db inspect users
//! ```

pub mod blueprint;
pub mod current_state;
pub mod error;
pub mod seeder;

pub use blueprint::{Migration, SchemaBlueprint};
pub use current_state::CurrentState;
pub use error::{BlueprintError, MigrateError, Result};
pub use seeder::Seeder;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::blueprint::{
        ColumnBlueprint, ColumnType, DefaultValue, ForeignKeyAction, ForeignKeyBlueprint,
        IndexBlueprint, IndexKind, Migration, ProcedureArgument, ProcedureBlueprint,
        SchemaBlueprint, SqlTypeSpec, TableBlueprint,
    };
    pub use crate::current_state::CurrentState;
    pub use crate::error::{BlueprintError, MigrateError, Result};
    pub use crate::seeder::Seeder;
}
