//! Column blueprints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BlueprintError;

/// Column data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    String,
    Text,
    Int,
    BigInt,
    Decimal,
    Float,
    Date,
    Datetime,
    Time,
    Timestamp,
    Boolean,
    Blob,
    Json,
    Uuid,
}

impl ColumnType {
    /// Returns the blueprint name of the type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Int => "int",
            Self::BigInt => "bigInt",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Boolean => "boolean",
            Self::Blob => "blob",
            Self::Json => "json",
            Self::Uuid => "uuid",
        }
    }

    /// Returns true for `int` and `bigInt`.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::BigInt)
    }

    /// Returns true for date and time types.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            Self::Date | Self::Datetime | Self::Time | Self::Timestamp
        )
    }

    /// Maps a type as reported by a live database, e.g. `VARCHAR(255)` or
    /// `INTEGER UNSIGNED`, to a blueprint type.
    pub fn from_sql_type(raw: &str) -> Result<Self, BlueprintError> {
        SqlTypeSpec::parse(raw).map(|spec| spec.column_type)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = BlueprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let column_type = match s {
            "string" => Self::String,
            "text" => Self::Text,
            "int" => Self::Int,
            "bigInt" => Self::BigInt,
            "decimal" => Self::Decimal,
            "float" => Self::Float,
            "date" => Self::Date,
            "datetime" => Self::Datetime,
            "time" => Self::Time,
            "timestamp" => Self::Timestamp,
            "boolean" => Self::Boolean,
            "blob" => Self::Blob,
            "json" => Self::Json,
            "uuid" => Self::Uuid,
            other => return Err(BlueprintError::InvalidType(other.to_string())),
        };
        Ok(column_type)
    }
}

/// A live SQL type split into blueprint type, length and signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlTypeSpec {
    pub column_type: ColumnType,
    pub length: Option<u32>,
    pub unsigned: bool,
}

impl SqlTypeSpec {
    /// Parses a declared SQL type.
    ///
    /// An empty declaration (allowed by SQLite) maps to `blob`, matching
    /// SQLite's affinity rules.
    pub fn parse(raw: &str) -> Result<Self, BlueprintError> {
        let upper = raw.trim().to_uppercase();
        let unsigned = upper.split_whitespace().any(|word| word == "UNSIGNED");
        let (base, args) = match upper.split_once('(') {
            Some((base, rest)) => (base.trim(), rest.split(')').next()),
            None => (upper.trim_end_matches(" UNSIGNED").trim(), None),
        };
        let length = args
            .and_then(|args| args.split(',').next())
            .and_then(|first| first.trim().parse().ok());

        let column_type = match base {
            "" | "BLOB" | "BINARY" | "VARBINARY" | "LONGBLOB" | "MEDIUMBLOB" | "BYTEA" => {
                ColumnType::Blob
            }
            "VARCHAR" | "CHAR" | "NCHAR" | "NVARCHAR" | "CHARACTER" | "VARYING CHARACTER" => {
                ColumnType::String
            }
            "TEXT" | "CLOB" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" => ColumnType::Text,
            "INT" | "INTEGER" | "TINYINT" | "SMALLINT" | "MEDIUMINT" => ColumnType::Int,
            "BIGINT" => ColumnType::BigInt,
            "DECIMAL" | "NUMERIC" => ColumnType::Decimal,
            "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" | "REAL" => ColumnType::Float,
            "DATE" => ColumnType::Date,
            "DATETIME" => ColumnType::Datetime,
            "TIME" => ColumnType::Time,
            "TIMESTAMP" => ColumnType::Timestamp,
            "BOOLEAN" | "BOOL" => ColumnType::Boolean,
            "JSON" | "JSONB" => ColumnType::Json,
            "UUID" => ColumnType::Uuid,
            _ => return Err(BlueprintError::InvalidType(raw.to_string())),
        };

        Ok(Self {
            column_type,
            length,
            unsigned,
        })
    }
}

/// Column default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// The database's current date/time.
    CurrentTimestamp,
    /// Any other SQL expression, kept verbatim.
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL representation of this default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
            Self::Expression(expr) => expr.clone(),
        }
    }

    /// Reads a default as written in live DDL.
    #[must_use]
    pub fn from_sql(raw: &str) -> Self {
        let trimmed = raw.trim();
        let upper = trimmed.to_uppercase();
        match upper.as_str() {
            "NULL" => return Self::Null,
            "TRUE" => return Self::Bool(true),
            "FALSE" => return Self::Bool(false),
            "CURRENT_TIMESTAMP" | "CURRENT_TIMESTAMP()" | "NOW()" => return Self::CurrentTimestamp,
            _ => {}
        }
        if let Some(inner) = trimmed
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
        {
            return Self::String(inner.replace("''", "'"));
        }
        if let Ok(i) = trimmed.parse() {
            return Self::Integer(i);
        }
        if let Ok(f) = trimmed.parse() {
            return Self::Float(f);
        }
        Self::Expression(trimmed.to_string())
    }
}

/// One column of a table blueprint.
///
/// Columns start nullable with no default. Modifiers that can break an
/// invariant return a `Result` and fail immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBlueprint {
    pub name: String,
    pub column_type: ColumnType,
    pub length: Option<u32>,
    pub nullable: bool,
    pub auto_increment: bool,
    pub unsigned: bool,
    pub primary: bool,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub default: Option<DefaultValue>,
}

impl ColumnBlueprint {
    /// Creates a column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            length: None,
            nullable: true,
            auto_increment: false,
            unsigned: false,
            primary: false,
            charset: None,
            collation: None,
            default: None,
        }
    }

    /// Creates a column from a type name such as `"bigInt"`.
    pub fn parse(name: impl Into<String>, column_type: &str) -> Result<Self, BlueprintError> {
        Ok(Self::new(name, column_type.parse()?))
    }

    fn integer_only(&self, modifier: &'static str) -> Result<(), BlueprintError> {
        if self.column_type.is_integer() {
            Ok(())
        } else {
            Err(BlueprintError::IntegerOnly {
                column: self.name.clone(),
                column_type: self.column_type.to_string(),
                modifier,
            })
        }
    }

    fn check_default(&self, default: Option<&DefaultValue>) -> Result<(), BlueprintError> {
        match default {
            Some(DefaultValue::Null) if !self.nullable => {
                Err(BlueprintError::NullDefault(self.name.clone()))
            }
            Some(DefaultValue::CurrentTimestamp) if !self.column_type.is_temporal() => {
                Err(BlueprintError::TimestampDefault {
                    column: self.name.clone(),
                    column_type: self.column_type.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Marks the column unsigned. Integer columns only.
    pub fn unsigned(mut self) -> Result<Self, BlueprintError> {
        self.integer_only("unsigned")?;
        self.unsigned = true;
        Ok(self)
    }

    /// Marks the column auto-incrementing. Integer columns only.
    pub fn auto_increment(mut self) -> Result<Self, BlueprintError> {
        self.integer_only("auto-increment")?;
        self.auto_increment = true;
        Ok(self)
    }

    /// Marks the column as (part of) the primary key. Primary columns are
    /// not nullable.
    pub fn primary(mut self) -> Result<Self, BlueprintError> {
        self.nullable = false;
        self.check_default(self.default.as_ref())?;
        self.primary = true;
        Ok(self)
    }

    /// `auto_increment` and `primary` together. Adding the column to a table
    /// registers its primary index.
    pub fn auto_increment_primary(self) -> Result<Self, BlueprintError> {
        self.auto_increment()?.primary()
    }

    /// Accepts null values. Primary columns stay not-null.
    pub fn nullable(mut self) -> Result<Self, BlueprintError> {
        if self.primary {
            return Err(BlueprintError::NullablePrimary(self.name));
        }
        self.nullable = true;
        Ok(self)
    }

    /// Rejects null values.
    pub fn not_null(mut self) -> Result<Self, BlueprintError> {
        self.nullable = false;
        self.check_default(self.default.as_ref())?;
        Ok(self)
    }

    /// Sets the default value.
    pub fn default(mut self, value: DefaultValue) -> Result<Self, BlueprintError> {
        self.check_default(Some(&value))?;
        self.default = Some(value);
        Ok(self)
    }

    /// Sets the character set.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }
}
