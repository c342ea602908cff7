//! Current-state mapping: live metadata back into blueprints.
//!
//! The mapper never fills blueprint fields directly. It replays the same
//! builder calls a migration author would write, so a live schema passes
//! exactly the validation a declared one does and both can be compared
//! field by field.

use keel_dao::{ColumnDescription, Metadata, ProcedureDescription, TableDescription};
use tracing::debug;

use crate::blueprint::{
    ColumnBlueprint, ColumnType, DefaultValue, ForeignKeyAction, ForeignKeyBlueprint,
    IndexBlueprint, IndexKind, ProcedureBlueprint, SchemaBlueprint, SqlTypeSpec, TableBlueprint,
};
use crate::error::{BlueprintError, MigrateError, Result};

/// Output name used when the backend reports only an output type.
const DEFAULT_OUTPUT: &str = "result";

/// Reads blueprints out of a live database.
pub struct CurrentState<'a, M: Metadata> {
    metadata: &'a M,
}

impl<'a, M: Metadata> CurrentState<'a, M> {
    pub fn new(metadata: &'a M) -> Self {
        Self { metadata }
    }

    /// Builds the blueprint of an existing table.
    pub async fn table(&self, name: &str) -> Result<TableBlueprint> {
        let description = self.metadata.describe_table(name).await?;
        if description.columns.is_empty() {
            return Err(MigrateError::TableNotFound(name.to_string()));
        }
        debug!(
            table = name,
            columns = description.columns.len(),
            indexes = description.indexes.len(),
            foreign_keys = description.foreign_keys.len(),
            "mapping current table"
        );
        Ok(table_blueprint(description)?)
    }

    /// Builds the blueprint of an existing procedure.
    pub async fn procedure(&self, name: &str) -> Result<ProcedureBlueprint> {
        match self.metadata.describe_procedure(name).await? {
            Some(description) => Ok(procedure_blueprint(description)?),
            None => Err(MigrateError::ProcedureNotFound(name.to_string())),
        }
    }

    /// Builds a schema from the named tables and the procedures attached
    /// to them.
    pub async fn schema<I, S>(&self, tables: I) -> Result<SchemaBlueprint>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut schema = SchemaBlueprint::new();
        for table in tables {
            let table = table.as_ref();
            schema = schema.table(self.table(table).await?)?;
            for procedure in self.metadata.table_procedures(table).await? {
                if schema.get_procedure(&procedure).is_none() {
                    schema = schema.procedure(self.procedure(&procedure).await?)?;
                }
            }
        }
        Ok(schema)
    }
}

fn column_blueprint(
    description: ColumnDescription,
    single_primary: bool,
) -> std::result::Result<ColumnBlueprint, BlueprintError> {
    let spec = SqlTypeSpec::parse(&description.sql_type)?;
    let mut column = ColumnBlueprint::new(description.name, spec.column_type);

    if let Some(length) = spec.length {
        column = column.length(length);
    }
    if spec.unsigned {
        column = column.unsigned()?;
    }
    if description.auto_increment {
        column = column.auto_increment()?;
    }
    if !description.nullable {
        column = column.not_null()?;
    }
    if let Some(default) = description.default.as_deref() {
        column = column.default(DefaultValue::from_sql(default))?;
    }
    if description.primary && single_primary {
        column = column.primary()?;
    }
    Ok(column)
}

fn table_blueprint(
    description: TableDescription,
) -> std::result::Result<TableBlueprint, BlueprintError> {
    let primary_columns = description
        .indexes
        .iter()
        .find(|index| index.primary)
        .map(|index| index.columns.clone())
        .unwrap_or_default();
    let single_primary = primary_columns.len() == 1;

    let mut table = TableBlueprint::new(description.name);
    for column in description.columns {
        table = table.column(column_blueprint(column, single_primary)?)?;
    }

    // A composite key is registered as one index so the declared column
    // order of the key survives.
    if primary_columns.len() > 1 {
        table = table.index(IndexBlueprint::primary(primary_columns)?)?;
    }

    for index in description.indexes.into_iter().filter(|index| !index.primary) {
        let kind = if index.unique {
            IndexKind::Unique
        } else {
            IndexKind::Index
        };
        table = table.index(IndexBlueprint::new(index.name, kind, index.columns)?)?;
    }

    for key in description.foreign_keys {
        let foreign_key = ForeignKeyBlueprint::new(
            key.name,
            key.columns,
            key.referenced_table,
            key.referenced_columns,
        )?
        .on_update(key.on_update.parse::<ForeignKeyAction>()?)
        .on_delete(key.on_delete.parse::<ForeignKeyAction>()?);
        table = table.foreign_key(foreign_key)?;
    }

    Ok(table)
}

fn procedure_blueprint(
    description: ProcedureDescription,
) -> std::result::Result<ProcedureBlueprint, BlueprintError> {
    let mut procedure = ProcedureBlueprint::new(description.name, description.body);
    for arg in description.args {
        procedure = procedure.arg(arg.name, ColumnType::from_sql_type(&arg.sql_type)?)?;
    }
    if let Some(output) = description.output {
        let (name, sql_type) = output
            .trim()
            .split_once(char::is_whitespace)
            .unwrap_or((DEFAULT_OUTPUT, output.trim()));
        procedure = procedure.output(name, ColumnType::from_sql_type(sql_type.trim())?);
    }
    Ok(procedure)
}
