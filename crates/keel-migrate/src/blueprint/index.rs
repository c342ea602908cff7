//! Index blueprints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BlueprintError;

/// Index kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexKind {
    Primary,
    Index,
    Unique,
    FullText,
    Spatial,
}

impl IndexKind {
    /// Returns the blueprint name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Index => "index",
            Self::Unique => "unique",
            Self::FullText => "fullText",
            Self::Spatial => "spatial",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndexKind {
    type Err = BlueprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Self::Primary),
            "index" => Ok(Self::Index),
            "unique" => Ok(Self::Unique),
            "fullText" => Ok(Self::FullText),
            "spatial" => Ok(Self::Spatial),
            other => Err(BlueprintError::InvalidIndexType(other.to_string())),
        }
    }
}

/// One index of a table blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBlueprint {
    pub name: String,
    pub kind: IndexKind,
    /// Indexed columns, in key order.
    pub columns: Vec<String>,
}

impl IndexBlueprint {
    /// Name given to primary indexes registered by columns.
    pub const PRIMARY: &'static str = "PRIMARY";

    /// Creates an index. The column list must not be empty.
    pub fn new<I, S>(name: impl Into<String>, kind: IndexKind, columns: I) -> Result<Self, BlueprintError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(BlueprintError::EmptyIndex(name));
        }
        Ok(Self {
            name,
            kind,
            columns,
        })
    }

    /// Creates an index from a kind name such as `"unique"`.
    pub fn parse<I, S>(name: impl Into<String>, kind: &str, columns: I) -> Result<Self, BlueprintError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, kind.parse()?, columns)
    }

    /// The primary index over `columns`.
    pub fn primary<I, S>(columns: I) -> Result<Self, BlueprintError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Self::PRIMARY, IndexKind::Primary, columns)
    }

    /// Returns true for the primary index.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::Primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("fullText".parse::<IndexKind>().unwrap(), IndexKind::FullText);
        assert_eq!(
            "clustered".parse::<IndexKind>(),
            Err(BlueprintError::InvalidIndexType(String::from("clustered")))
        );
    }

    #[test]
    fn test_empty_columns_rejected() {
        let err = IndexBlueprint::new("idx_nothing", IndexKind::Index, Vec::<String>::new())
            .unwrap_err();
        assert_eq!(err, BlueprintError::EmptyIndex(String::from("idx_nothing")));
    }

    #[test]
    fn test_primary() {
        let index = IndexBlueprint::primary(["tenant_id", "id"]).unwrap();
        assert!(index.is_primary());
        assert_eq!(index.name, "PRIMARY");
        assert_eq!(index.columns, vec!["tenant_id", "id"]);
    }
}
