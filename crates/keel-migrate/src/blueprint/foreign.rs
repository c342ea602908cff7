//! Foreign key blueprints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BlueprintError;

/// Referential action on update or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForeignKeyAction {
    Cascade,
    SetNull,
    #[default]
    NoAction,
    Restrict,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub const fn to_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
        }
    }
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// Accepts blueprint names (`setNull`) and SQL keywords (`SET NULL`).
impl FromStr for ForeignKeyAction {
    type Err = BlueprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cascade" | "CASCADE" => Ok(Self::Cascade),
            "setNull" | "SET NULL" => Ok(Self::SetNull),
            "noAction" | "NO ACTION" => Ok(Self::NoAction),
            "restrict" | "RESTRICT" => Ok(Self::Restrict),
            other => Err(BlueprintError::InvalidAction(other.to_string())),
        }
    }
}

/// One foreign key of a table blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyBlueprint {
    pub name: String,
    pub local_columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
}

impl ForeignKeyBlueprint {
    /// Creates a foreign key with `NO ACTION` on both events.
    ///
    /// Both column lists must be non-empty and of the same length.
    pub fn new<L, R, S, T>(
        name: impl Into<String>,
        local_columns: L,
        referenced_table: impl Into<String>,
        referenced_columns: R,
    ) -> Result<Self, BlueprintError>
    where
        L: IntoIterator<Item = S>,
        R: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let name = name.into();
        let local_columns: Vec<String> = local_columns.into_iter().map(Into::into).collect();
        let referenced_columns: Vec<String> =
            referenced_columns.into_iter().map(Into::into).collect();

        if local_columns.is_empty() || local_columns.len() != referenced_columns.len() {
            return Err(BlueprintError::ForeignKeyArity {
                name,
                local: local_columns.len(),
                referenced: referenced_columns.len(),
            });
        }

        Ok(Self {
            name,
            local_columns,
            referenced_table: referenced_table.into(),
            referenced_columns,
            on_update: ForeignKeyAction::NoAction,
            on_delete: ForeignKeyAction::NoAction,
        })
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Returns true when both keys cover the same local columns, in any order.
    #[must_use]
    pub fn same_local_columns(&self, other: &Self) -> bool {
        let mut mine: Vec<&str> = self.local_columns.iter().map(String::as_str).collect();
        let mut theirs: Vec<&str> = other.local_columns.iter().map(String::as_str).collect();
        mine.sort_unstable();
        theirs.sort_unstable();
        mine == theirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_spellings() {
        assert_eq!("setNull".parse::<ForeignKeyAction>().unwrap(), ForeignKeyAction::SetNull);
        assert_eq!("SET NULL".parse::<ForeignKeyAction>().unwrap(), ForeignKeyAction::SetNull);
        assert_eq!("NO ACTION".parse::<ForeignKeyAction>().unwrap(), ForeignKeyAction::NoAction);
        assert!(matches!(
            "explode".parse::<ForeignKeyAction>(),
            Err(BlueprintError::InvalidAction(_))
        ));
    }

    #[test]
    fn test_arity_must_match() {
        let err = ForeignKeyBlueprint::new("fk_x", ["a", "b"], "parents", ["id"]).unwrap_err();
        assert_eq!(
            err,
            BlueprintError::ForeignKeyArity {
                name: String::from("fk_x"),
                local: 2,
                referenced: 1
            }
        );
    }

    #[test]
    fn test_same_local_columns_ignores_order() {
        let a = ForeignKeyBlueprint::new("a", ["x", "y"], "t", ["x", "y"]).unwrap();
        let b = ForeignKeyBlueprint::new("b", ["y", "x"], "u", ["y", "x"]).unwrap();
        let c = ForeignKeyBlueprint::new("c", ["x"], "t", ["x"]).unwrap();
        assert!(a.same_local_columns(&b));
        assert!(!a.same_local_columns(&c));
    }

    #[test]
    fn test_actions() {
        let fk = ForeignKeyBlueprint::new("fk_posts_author", ["author_id"], "authors", ["id"])
            .unwrap()
            .on_delete(ForeignKeyAction::Cascade);
        assert_eq!(fk.on_delete.to_sql(), "CASCADE");
        assert_eq!(fk.on_update, ForeignKeyAction::NoAction);
    }
}
