//! Statement rendering.
//!
//! A [`Renderer`] turns a table, an [`Operation`] and a filter list into a
//! [`Statement`]. [`GenericRenderer`] produces portable SQL; drivers with
//! their own syntax can supply another implementation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::{Filter, Joint, Operator};
use crate::params::substitute_placeholders;
use crate::value::{Escape, Row, SqlValue};

/// Errors raised while rendering a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A predicate was opened but never given a comparison.
    #[error("filter '{key}' was opened but never compared")]
    IncompleteFilter {
        /// Key of the incomplete predicate.
        key: String,
    },

    /// INSERT or UPDATE without any column values.
    #[error("{operation} on '{table}' needs at least one column value")]
    EmptyValues {
        /// The operation being rendered.
        operation: Operation,
        /// Target table.
        table: String,
    },

    /// CALL without a procedure name.
    #[error("CALL on '{table}' has no procedure name")]
    MissingProcedure {
        /// Target table.
        table: String,
    },
}

/// The kind of statement being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// SELECT
    Select,
    /// INSERT
    Insert,
    /// UPDATE
    Update,
    /// DELETE
    Delete,
    /// Stored procedure CALL
    Call,
}

impl Operation {
    /// Returns true when the statement produces a rowset.
    #[must_use]
    pub const fn returns_rows(self) -> bool {
        matches!(self, Self::Select | Self::Call)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Call => "CALL",
        };
        f.write_str(name)
    }
}

/// A rendered statement, ready for the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    operation: Operation,
    table: String,
    sql_text: String,
}

impl Statement {
    /// Creates a statement from already-rendered text.
    #[must_use]
    pub fn new(operation: Operation, table: impl Into<String>, sql_text: impl Into<String>) -> Self {
        Self {
            operation,
            table: table.into(),
            sql_text: sql_text.into(),
        }
    }

    /// Returns the statement kind.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the SQL text without a terminator.
    #[must_use]
    pub fn sql_text(&self) -> &str {
        &self.sql_text
    }

    /// Returns the SQL text; a final statement is terminated with `;`,
    /// a non-final one can be embedded in a larger statement.
    #[must_use]
    pub fn output(&self, as_final: bool) -> String {
        if as_final {
            format!("{};", self.sql_text)
        } else {
            self.sql_text.clone()
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_text)
    }
}

/// Everything a renderer needs to produce one statement.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Target table.
    pub table: &'a str,
    /// Statement kind.
    pub operation: Operation,
    /// Substitutions and predicates, in order.
    pub filters: &'a [Filter],
    /// Caller-provided SELECT text (inline or loaded from a resource).
    pub base_sql: Option<&'a str>,
    /// Column values for INSERT / UPDATE.
    pub values: Option<&'a Row>,
    /// Procedure name for CALL.
    pub procedure: Option<&'a str>,
    /// Procedure arguments for CALL.
    pub args: &'a [SqlValue],
}

impl<'a> RenderRequest<'a> {
    fn base(table: &'a str, operation: Operation, filters: &'a [Filter]) -> Self {
        Self {
            table,
            operation,
            filters,
            base_sql: None,
            values: None,
            procedure: None,
            args: &[],
        }
    }

    /// A SELECT request.
    #[must_use]
    pub fn select(table: &'a str, filters: &'a [Filter]) -> Self {
        Self::base(table, Operation::Select, filters)
    }

    /// An INSERT request.
    #[must_use]
    pub fn insert(table: &'a str, values: &'a Row) -> Self {
        Self {
            values: Some(values),
            ..Self::base(table, Operation::Insert, &[])
        }
    }

    /// An UPDATE request.
    #[must_use]
    pub fn update(table: &'a str, values: &'a Row, filters: &'a [Filter]) -> Self {
        Self {
            values: Some(values),
            ..Self::base(table, Operation::Update, filters)
        }
    }

    /// A DELETE request.
    #[must_use]
    pub fn delete(table: &'a str, filters: &'a [Filter]) -> Self {
        Self::base(table, Operation::Delete, filters)
    }

    /// A stored procedure CALL request.
    #[must_use]
    pub fn call(table: &'a str, procedure: &'a str, args: &'a [SqlValue]) -> Self {
        Self {
            procedure: Some(procedure),
            args,
            ..Self::base(table, Operation::Call, &[])
        }
    }

    /// Uses caller-provided SELECT text instead of `SELECT * FROM table`.
    #[must_use]
    pub fn with_base_sql(mut self, sql: Option<&'a str>) -> Self {
        self.base_sql = sql;
        self
    }
}

/// Turns render requests into statements.
pub trait Renderer: Send + Sync {
    /// Renders one statement. String values of sanitized filters must pass
    /// through `escaper`.
    fn render(
        &self,
        request: &RenderRequest<'_>,
        escaper: &dyn Escape,
    ) -> Result<Statement, RenderError>;
}

/// Portable SQL renderer.
///
/// - Substitution filters replace their token in the base text and in
///   predicate keys (never inside rendered values).
/// - `= NULL` / `<> NULL` render as `IS NULL` / `IS NOT NULL`.
/// - Predicates over caller-provided SELECT text wrap it as a derived table
///   so the caller's own WHERE keeps its precedence.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRenderer;

impl GenericRenderer {
    /// Creates a new renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn substitute(text: &str, filters: &[Filter], escaper: &dyn Escape) -> String {
        let literals: BTreeMap<&str, String> = filters
            .iter()
            .filter(|f| f.is_substitution())
            .filter_map(|f| {
                f.value.as_ref().map(|value| {
                    (
                        f.key.as_str(),
                        value.to_sql_literal(f.sanitize.then_some(escaper)),
                    )
                })
            })
            .collect();
        if literals.is_empty() {
            return text.to_string();
        }
        substitute_placeholders(text, |token| literals.get(token).cloned())
    }

    fn where_clause(filters: &[Filter], escaper: &dyn Escape) -> Result<String, RenderError> {
        let mut clause = String::new();
        for filter in filters.iter().filter(|f| !f.is_substitution()) {
            let (Some(operator), Some(value)) = (filter.operator, &filter.value) else {
                return Err(RenderError::IncompleteFilter {
                    key: filter.key.clone(),
                });
            };
            let key = Self::substitute(&filter.key, filters, escaper);
            let term = match (operator, value) {
                (Operator::Eq, SqlValue::Null) => format!("{key} IS NULL"),
                (Operator::Ne, SqlValue::Null) => format!("{key} IS NOT NULL"),
                _ => format!(
                    "{key} {operator} {}",
                    value.to_sql_literal(filter.sanitize.then_some(escaper))
                ),
            };
            if !clause.is_empty() {
                let joint = filter.joint.unwrap_or(Joint::And);
                clause.push_str(&format!(" {joint} "));
            }
            clause.push_str(&term);
        }
        Ok(clause)
    }

    fn assignments(
        request: &RenderRequest<'_>,
        escaper: &dyn Escape,
    ) -> Result<Vec<(String, String)>, RenderError> {
        let values = request.values.filter(|v| !v.is_empty()).ok_or_else(|| {
            RenderError::EmptyValues {
                operation: request.operation,
                table: request.table.to_string(),
            }
        })?;
        Ok(values
            .iter()
            .map(|(column, value)| (column.clone(), value.to_sql_literal(Some(escaper))))
            .collect())
    }
}

impl Renderer for GenericRenderer {
    fn render(
        &self,
        request: &RenderRequest<'_>,
        escaper: &dyn Escape,
    ) -> Result<Statement, RenderError> {
        let table = request.table;
        let sql = match request.operation {
            Operation::Select => {
                let where_clause = Self::where_clause(request.filters, escaper)?;
                match request.base_sql {
                    Some(base) => {
                        let base = base.trim().trim_end_matches(';').trim_end();
                        let base = Self::substitute(base, request.filters, escaper);
                        if where_clause.is_empty() {
                            base
                        } else {
                            format!("SELECT * FROM ({base}) AS {table}_q WHERE {where_clause}")
                        }
                    }
                    None if where_clause.is_empty() => format!("SELECT * FROM {table}"),
                    None => format!("SELECT * FROM {table} WHERE {where_clause}"),
                }
            }
            Operation::Insert => {
                let pairs = Self::assignments(request, escaper)?;
                let columns: Vec<&str> = pairs.iter().map(|(c, _)| c.as_str()).collect();
                let literals: Vec<&str> = pairs.iter().map(|(_, v)| v.as_str()).collect();
                format!(
                    "INSERT INTO {table} ({}) VALUES ({})",
                    columns.join(", "),
                    literals.join(", ")
                )
            }
            Operation::Update => {
                let pairs = Self::assignments(request, escaper)?;
                let set: Vec<String> = pairs.iter().map(|(c, v)| format!("{c} = {v}")).collect();
                let mut sql = format!("UPDATE {table} SET {}", set.join(", "));
                let where_clause = Self::where_clause(request.filters, escaper)?;
                if !where_clause.is_empty() {
                    sql.push_str(" WHERE ");
                    sql.push_str(&where_clause);
                }
                sql
            }
            Operation::Delete => {
                let mut sql = format!("DELETE FROM {table}");
                let where_clause = Self::where_clause(request.filters, escaper)?;
                if !where_clause.is_empty() {
                    sql.push_str(" WHERE ");
                    sql.push_str(&where_clause);
                }
                sql
            }
            Operation::Call => {
                let procedure = request
                    .procedure
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| RenderError::MissingProcedure {
                        table: table.to_string(),
                    })?;
                let args: Vec<String> = request
                    .args
                    .iter()
                    .map(|a| a.to_sql_literal(Some(escaper)))
                    .collect();
                format!("CALL {procedure}({})", args.join(", "))
            }
        };
        Ok(Statement::new(request.operation, table, sql))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterChain;
    use crate::value::{QuoteEscape, ToSqlValue};

    fn render(request: &RenderRequest<'_>) -> String {
        GenericRenderer::new()
            .render(request, &QuoteEscape)
            .unwrap()
            .sql_text()
            .to_string()
    }

    #[test]
    fn test_default_select() {
        assert_eq!(
            render(&RenderRequest::select("users", &[])),
            "SELECT * FROM users"
        );
    }

    #[test]
    fn test_select_with_joints() {
        let mut chain = FilterChain::new();
        chain.open("id", true).unwrap();
        chain.compare(Operator::Gt, 5_i64.to_sql_value()).unwrap();
        chain.or("name", true).unwrap();
        chain.compare(Operator::Like, "A%".to_sql_value()).unwrap();

        assert_eq!(
            render(&RenderRequest::select("users", chain.as_slice())),
            "SELECT * FROM users WHERE id > 5 OR name LIKE 'A%'"
        );
    }

    #[test]
    fn test_in_list_renders_literal_list() {
        let mut chain = FilterChain::new();
        chain.open("id", true).unwrap();
        chain
            .compare(
                Operator::In,
                vec![SqlValue::Int(1), SqlValue::Int(2), "x".to_sql_value()].to_sql_value(),
            )
            .unwrap();

        assert_eq!(
            render(&RenderRequest::select("t", chain.as_slice())),
            "SELECT * FROM t WHERE id IN (1, 2, 'x')"
        );
    }

    #[test]
    fn test_null_comparisons_render_is_null() {
        let mut chain = FilterChain::new();
        chain.open("deleted_at", true).unwrap();
        chain.compare(Operator::Eq, SqlValue::Null).unwrap();
        chain.open("archived_at", true).unwrap();
        chain.compare(Operator::Ne, SqlValue::Null).unwrap();

        assert_eq!(
            render(&RenderRequest::select("t", chain.as_slice())),
            "SELECT * FROM t WHERE deleted_at IS NULL AND archived_at IS NOT NULL"
        );
    }

    #[test]
    fn test_unsanitized_filter_skips_escaping() {
        let mut chain = FilterChain::new();
        chain.open("name", false).unwrap();
        chain.compare(Operator::Eq, "O'Brien".to_sql_value()).unwrap();
        chain.open("alias", true).unwrap();
        chain.compare(Operator::Eq, "O'Brien".to_sql_value()).unwrap();

        assert_eq!(
            render(&RenderRequest::select("t", chain.as_slice())),
            "SELECT * FROM t WHERE name = 'O'Brien' AND alias = 'O''Brien'"
        );
    }

    #[test]
    fn test_substitution_into_base_sql() {
        let filters = vec![
            Filter::substitution("?name?", "O'Brien".to_sql_value()),
            Filter::substitution("?ids?", vec![1_i64, 2].to_sql_value()),
        ];
        let request = RenderRequest::select("users", &filters)
            .with_base_sql(Some("SELECT id FROM users WHERE name = ?name? AND id IN ?ids?;"));

        assert_eq!(
            render(&request),
            "SELECT id FROM users WHERE name = 'O''Brien' AND id IN (1, 2)"
        );
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let filters = vec![
            Filter::substitution("?a?", "?b?".to_sql_value()),
            Filter::substitution("?b?", " OR 1=1 -- ".to_sql_value()),
        ];
        let request = RenderRequest::select("users", &filters)
            .with_base_sql(Some("SELECT * FROM users WHERE name = ?a? AND role = ?b?"));

        assert_eq!(
            render(&request),
            "SELECT * FROM users WHERE name = '?b?' AND role = ' OR 1=1 -- '"
        );

        let mut chain = FilterChain::new();
        chain.open("lower(?a?)", true).unwrap();
        chain.compare(Operator::Eq, "x".to_sql_value()).unwrap();
        chain.prepend(filters);
        assert_eq!(
            render(&RenderRequest::delete("users", chain.as_slice())),
            "DELETE FROM users WHERE lower('?b?') = 'x'"
        );
    }

    #[test]
    fn test_predicates_over_base_sql_wrap_it() {
        let mut chain = FilterChain::new();
        chain.open("id", true).unwrap();
        chain.compare(Operator::Eq, 3_i64.to_sql_value()).unwrap();
        let request = RenderRequest::select("users", chain.as_slice())
            .with_base_sql(Some("SELECT id FROM users WHERE a = 1 OR b = 2"));

        assert_eq!(
            render(&request),
            "SELECT * FROM (SELECT id FROM users WHERE a = 1 OR b = 2) AS users_q WHERE id = 3"
        );
    }

    #[test]
    fn test_substitution_into_predicate_key() {
        let mut chain = FilterChain::new();
        chain.open("coalesce(score, ?fallback?)", true).unwrap();
        chain.compare(Operator::Lt, 10_i64.to_sql_value()).unwrap();
        chain.prepend(vec![Filter::substitution("?fallback?", 0_i64.to_sql_value())]);

        assert_eq!(
            render(&RenderRequest::delete("scores", chain.as_slice())),
            "DELETE FROM scores WHERE coalesce(score, 0) < 10"
        );
    }

    #[test]
    fn test_insert_and_update() {
        let mut row = Row::new();
        row.insert(String::from("email"), "a@x.io".to_sql_value());
        row.insert(String::from("name"), "Ann".to_sql_value());

        assert_eq!(
            render(&RenderRequest::insert("users", &row)),
            "INSERT INTO users (email, name) VALUES ('a@x.io', 'Ann')"
        );

        let mut chain = FilterChain::new();
        chain.open("id", true).unwrap();
        chain.compare(Operator::Eq, 5_i64.to_sql_value()).unwrap();
        assert_eq!(
            render(&RenderRequest::update("users", &row, chain.as_slice())),
            "UPDATE users SET email = 'a@x.io', name = 'Ann' WHERE id = 5"
        );
    }

    #[test]
    fn test_insert_without_values_fails() {
        let row = Row::new();
        let err = GenericRenderer::new()
            .render(&RenderRequest::insert("users", &row), &QuoteEscape)
            .unwrap_err();
        assert!(matches!(err, RenderError::EmptyValues { .. }));
    }

    #[test]
    fn test_incomplete_filter_fails() {
        let mut chain = FilterChain::new();
        chain.open("id", true).unwrap();
        let err = GenericRenderer::new()
            .render(&RenderRequest::select("t", chain.as_slice()), &QuoteEscape)
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::IncompleteFilter {
                key: String::from("id")
            }
        );
    }

    #[test]
    fn test_call() {
        let args = vec![5_i64.to_sql_value(), "x".to_sql_value()];
        assert_eq!(
            render(&RenderRequest::call("users", "touch_user", &args)),
            "CALL touch_user(5, 'x')"
        );
    }

    #[test]
    fn test_statement_output() {
        let statement = Statement::new(Operation::Select, "t", "SELECT 1");
        assert_eq!(statement.output(true), "SELECT 1;");
        assert_eq!(statement.output(false), "SELECT 1");
    }
}
