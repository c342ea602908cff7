//! Stored procedure blueprints.

use serde::{Deserialize, Serialize};

use super::column::ColumnType;
use crate::error::BlueprintError;

/// A named, typed procedure argument or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureArgument {
    pub name: String,
    pub arg_type: ColumnType,
}

/// A stored procedure: signature plus an opaque SQL body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureBlueprint {
    pub name: String,
    pub args: Vec<ProcedureArgument>,
    pub output: Option<ProcedureArgument>,
    pub instructions: String,
}

impl ProcedureBlueprint {
    /// Creates a procedure without arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            output: None,
            instructions: instructions.into(),
        }
    }

    /// Appends an argument. Names are unique per procedure.
    pub fn arg(mut self, name: impl Into<String>, arg_type: ColumnType) -> Result<Self, BlueprintError> {
        let name = name.into();
        if self.args.iter().any(|a| a.name == name) {
            return Err(BlueprintError::DuplicateArgument {
                procedure: self.name,
                argument: name,
            });
        }
        self.args.push(ProcedureArgument { name, arg_type });
        Ok(self)
    }

    /// Declares the output value.
    #[must_use]
    pub fn output(mut self, name: impl Into<String>, arg_type: ColumnType) -> Self {
        self.output = Some(ProcedureArgument {
            name: name.into(),
            arg_type,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature() {
        let procedure = ProcedureBlueprint::new("archive_user", "UPDATE users SET archived = 1 WHERE id = p_id")
            .arg("p_id", ColumnType::BigInt)
            .unwrap()
            .arg("p_reason", ColumnType::String)
            .unwrap()
            .output("archived", ColumnType::Boolean);

        assert_eq!(procedure.args.len(), 2);
        assert_eq!(procedure.args[1].name, "p_reason");
        assert_eq!(procedure.output.unwrap().arg_type, ColumnType::Boolean);
    }

    #[test]
    fn test_duplicate_argument() {
        let err = ProcedureBlueprint::new("p", "SELECT 1")
            .arg("a", ColumnType::Int)
            .unwrap()
            .arg("a", ColumnType::Text)
            .unwrap_err();
        assert_eq!(
            err,
            BlueprintError::DuplicateArgument {
                procedure: String::from("p"),
                argument: String::from("a")
            }
        );
    }
}
