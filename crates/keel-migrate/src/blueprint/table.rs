//! Table blueprints.

use keel_core::Row;
use serde::{Deserialize, Serialize};

use super::column::ColumnBlueprint;
use super::foreign::ForeignKeyBlueprint;
use super::index::IndexBlueprint;
use crate::error::BlueprintError;

/// Desired (or current) structure of one table.
///
/// Every builder call validates against what the table already holds, so a
/// blueprint that was built successfully satisfies all of its invariants:
///
/// ```
/// use keel_migrate::blueprint::{ColumnBlueprint, ColumnType, IndexBlueprint, IndexKind, TableBlueprint};
///
/// let users = TableBlueprint::new("users")
///     .column(ColumnBlueprint::new("id", ColumnType::BigInt).auto_increment_primary()?)?
///     .column(ColumnBlueprint::new("email", ColumnType::String).length(255).not_null()?)?
///     .index(IndexBlueprint::new("uniq_email", IndexKind::Unique, ["email"])?)?;
///
/// assert!(users.primary_index().is_some());
/// # Ok::<(), keel_migrate::BlueprintError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlueprint {
    pub name: String,
    pub label: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub columns: Vec<ColumnBlueprint>,
    pub indexes: Vec<IndexBlueprint>,
    pub foreign_keys: Vec<ForeignKeyBlueprint>,
    /// Rows inserted by seeders.
    pub seeds: Vec<Row>,
}

impl TableBlueprint {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            charset: None,
            collation: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            seeds: Vec::new(),
        }
    }

    /// Sets a human-readable label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the default character set.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the default collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    fn require_column(&self, column: &str) -> Result<(), BlueprintError> {
        if self.get_column(column).is_some() {
            Ok(())
        } else {
            Err(BlueprintError::UnknownColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
        }
    }

    /// Adds a column. A primary column joins the table's primary index,
    /// creating it if needed.
    pub fn column(mut self, column: ColumnBlueprint) -> Result<Self, BlueprintError> {
        if self.get_column(&column.name).is_some() {
            return Err(BlueprintError::DuplicateColumn {
                table: self.name,
                column: column.name,
            });
        }

        // The implicit primary index needs its name to be free.
        if column.primary
            && self.primary_index().is_none()
            && self.get_index(IndexBlueprint::PRIMARY).is_some()
        {
            return Err(BlueprintError::DuplicateIndex {
                table: self.name,
                index: String::from(IndexBlueprint::PRIMARY),
            });
        }

        let primary = column.primary.then(|| column.name.clone());
        self.columns.push(column);

        if let Some(name) = primary {
            match self.indexes.iter_mut().find(|i| i.is_primary()) {
                Some(index) => index.columns.push(name),
                None => self.indexes.push(IndexBlueprint::primary([name])?),
            }
        }
        Ok(self)
    }

    /// Adds an index over declared columns. At most one primary index.
    pub fn index(mut self, index: IndexBlueprint) -> Result<Self, BlueprintError> {
        if self.get_index(&index.name).is_some() {
            return Err(BlueprintError::DuplicateIndex {
                table: self.name,
                index: index.name,
            });
        }
        if index.is_primary() && self.primary_index().is_some() {
            return Err(BlueprintError::SecondPrimaryIndex {
                table: self.name,
                index: index.name,
            });
        }
        for column in &index.columns {
            self.require_column(column)?;
        }

        self.indexes.push(index);
        Ok(self)
    }

    /// Adds a foreign key over declared columns. No two foreign keys may
    /// share the same local-column set.
    pub fn foreign_key(mut self, foreign_key: ForeignKeyBlueprint) -> Result<Self, BlueprintError> {
        if self.get_foreign_key(&foreign_key.name).is_some() {
            return Err(BlueprintError::DuplicateForeignKey {
                table: self.name,
                name: foreign_key.name,
            });
        }
        if self
            .foreign_keys
            .iter()
            .any(|existing| existing.same_local_columns(&foreign_key))
        {
            return Err(BlueprintError::DuplicateForeignKeyColumns {
                table: self.name,
                columns: foreign_key.local_columns.join(", "),
            });
        }
        for column in &foreign_key.local_columns {
            self.require_column(column)?;
        }

        self.foreign_keys.push(foreign_key);
        Ok(self)
    }

    /// Adds a seed row. Every key must be a declared column.
    pub fn seed(mut self, row: Row) -> Result<Self, BlueprintError> {
        for column in row.keys() {
            self.require_column(column)?;
        }
        self.seeds.push(row);
        Ok(self)
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnBlueprint> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Gets an index by name.
    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<&IndexBlueprint> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Gets a foreign key by name.
    #[must_use]
    pub fn get_foreign_key(&self, name: &str) -> Option<&ForeignKeyBlueprint> {
        self.foreign_keys.iter().find(|f| f.name == name)
    }

    /// The primary index, if any.
    #[must_use]
    pub fn primary_index(&self) -> Option<&IndexBlueprint> {
        self.indexes.iter().find(|i| i.is_primary())
    }
}
