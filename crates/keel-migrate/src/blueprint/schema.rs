//! Whole-schema blueprints and the migration trait.

use serde::{Deserialize, Serialize};

use super::procedure::ProcedureBlueprint;
use super::table::TableBlueprint;
use crate::error::BlueprintError;

/// The tables and procedures of one database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaBlueprint {
    pub tables: Vec<TableBlueprint>,
    pub procedures: Vec<ProcedureBlueprint>,
}

impl SchemaBlueprint {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table. Table names are unique.
    pub fn table(mut self, table: TableBlueprint) -> Result<Self, BlueprintError> {
        if self.get_table(&table.name).is_some() {
            return Err(BlueprintError::DuplicateTable(table.name));
        }
        self.tables.push(table);
        Ok(self)
    }

    /// Adds a procedure. Procedure names are unique.
    pub fn procedure(mut self, procedure: ProcedureBlueprint) -> Result<Self, BlueprintError> {
        if self.get_procedure(&procedure.name).is_some() {
            return Err(BlueprintError::DuplicateProcedure(procedure.name));
        }
        self.procedures.push(procedure);
        Ok(self)
    }

    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableBlueprint> {
        self.tables.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn get_procedure(&self, name: &str) -> Option<&ProcedureBlueprint> {
        self.procedures.iter().find(|p| p.name == name)
    }

    /// Table names in declaration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }
}

/// A migration declared in Rust code.
///
/// The migration states the schema it wants; comparing that against the
/// live database is left to the caller.
pub trait Migration {
    /// Migration name (e.g., "0001_initial").
    const NAME: &'static str;

    /// Returns the desired schema.
    fn schema() -> Result<SchemaBlueprint, BlueprintError>;
}
