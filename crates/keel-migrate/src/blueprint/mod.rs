//! Declarative schema blueprints.
//!
//! Blueprints are built with consuming builders. Every call that could
//! break an invariant returns a `Result`, so an invalid blueprint cannot
//! be constructed.

mod column;
mod foreign;
mod index;
mod procedure;
mod schema;
mod table;

pub use column::{ColumnBlueprint, ColumnType, DefaultValue, SqlTypeSpec};
pub use foreign::{ForeignKeyAction, ForeignKeyBlueprint};
pub use index::{IndexBlueprint, IndexKind};
pub use procedure::{ProcedureArgument, ProcedureBlueprint};
pub use schema::{Migration, SchemaBlueprint};
pub use table::TableBlueprint;
