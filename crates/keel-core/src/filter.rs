//! Filter predicates and the chain that accumulates them.
//!
//! A chain is built with a small grammar: a predicate is *opened* with
//! [`FilterChain::open`] (or the `and`/`or` variants) and then *completed*
//! by exactly one comparison. Every rule is checked at the offending call.
//!
//! ```
//! use keel_core::{FilterChain, Operator, ToSqlValue};
//!
//! let mut chain = FilterChain::new();
//! chain.open("status", true).unwrap();
//! chain.compare(Operator::Eq, "active".to_sql_value()).unwrap();
//! chain.or("role", true).unwrap();
//! chain.compare(Operator::In, vec!["admin", "owner"].to_sql_value()).unwrap();
//! assert_eq!(chain.len(), 2);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::SqlValue;

/// Errors raised when the filter grammar is misused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// `and`/`or` called before any predicate was opened.
    #[error("cannot join '{key}' with {joint}: no filter has been opened")]
    JointWithoutFilter {
        /// Key of the predicate being joined.
        key: String,
        /// The requested joint.
        joint: Joint,
    },

    /// A predicate was opened while the previous one had no comparison.
    #[error("filter '{key}' must be compared before another filter is opened")]
    PreviousIncomplete {
        /// Key of the incomplete predicate.
        key: String,
    },

    /// A comparison was requested with no open predicate.
    #[error("comparison {operator} called before any filter was opened")]
    NoOpenFilter {
        /// The requested operator.
        operator: Operator,
    },

    /// The most recent predicate already carries a comparison.
    #[error("filter '{key}' already has a value; open a new filter first")]
    ValueAlreadySet {
        /// Key of the completed predicate.
        key: String,
    },

    /// `IN` / `NOT IN` was given a scalar.
    #[error("{operator} on '{key}' requires a list value")]
    ListRequired {
        /// Key of the predicate.
        key: String,
        /// The requested operator.
        operator: Operator,
    },

    /// A list was given to a scalar comparison.
    #[error("{operator} on '{key}' does not accept a list value")]
    ScalarRequired {
        /// Key of the predicate.
        key: String,
        /// The requested operator.
        operator: Operator,
    },

    /// NULL was given to an operator other than `=` / `<>`.
    #[error("{operator} on '{key}' does not accept NULL")]
    NullNotAllowed {
        /// Key of the predicate.
        key: String,
        /// The requested operator.
        operator: Operator,
    },
}

/// Boolean connective placed before a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Joint {
    /// AND
    And,
    /// OR
    Or,
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Not equal (<>)
    Ne,
    /// Greater than (>)
    Gt,
    /// Less than (<)
    Lt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than or equal (<=)
    Lte,
    /// Pattern match (LIKE)
    Like,
    /// Membership (IN)
    In,
    /// Non-membership (NOT IN)
    NotIn,
}

impl Operator {
    /// Returns the SQL spelling of the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }

    /// Returns true for `IN` and `NOT IN`.
    #[must_use]
    pub const fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Returns true for the operators that accept NULL.
    #[must_use]
    pub const fn accepts_null(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One WHERE-clause term, or one placeholder substitution when it has no
/// operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Column, expression or placeholder token.
    pub key: String,
    /// Comparison value; `None` until completed.
    pub value: Option<SqlValue>,
    /// Connective to the previous predicate; `None` for the first.
    pub joint: Option<Joint>,
    /// Comparison operator; `None` until completed (or for substitutions).
    pub operator: Option<Operator>,
    /// Whether string values pass through the driver's escape primitive.
    pub sanitize: bool,
}

impl Filter {
    /// Creates an open predicate.
    #[must_use]
    pub fn open(key: impl Into<String>, joint: Option<Joint>, sanitize: bool) -> Self {
        Self {
            key: key.into(),
            value: None,
            joint,
            operator: None,
            sanitize,
        }
    }

    /// Creates a placeholder substitution: `token` is replaced by the
    /// literal rendering of `value` in the statement text.
    #[must_use]
    pub fn substitution(token: impl Into<String>, value: SqlValue) -> Self {
        Self {
            key: token.into(),
            value: Some(value),
            joint: None,
            operator: None,
            sanitize: true,
        }
    }

    /// Returns true once a comparison (or substitution value) is set.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.value.is_some()
    }

    /// Returns true for placeholder substitutions.
    #[must_use]
    pub const fn is_substitution(&self) -> bool {
        self.operator.is_none() && self.value.is_some()
    }
}

/// Ordered list of filters with the opening/completion rules enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a predicate. The first predicate has no joint, later ones are
    /// joined with AND.
    pub fn open(&mut self, key: impl Into<String>, sanitize: bool) -> Result<(), FilterError> {
        self.ensure_last_complete()?;
        let joint = if self.filters.is_empty() {
            None
        } else {
            Some(Joint::And)
        };
        self.filters.push(Filter::open(key, joint, sanitize));
        Ok(())
    }

    /// Opens a predicate joined with AND.
    pub fn and(&mut self, key: impl Into<String>, sanitize: bool) -> Result<(), FilterError> {
        self.open_joined(key.into(), Joint::And, sanitize)
    }

    /// Opens a predicate joined with OR.
    pub fn or(&mut self, key: impl Into<String>, sanitize: bool) -> Result<(), FilterError> {
        self.open_joined(key.into(), Joint::Or, sanitize)
    }

    fn open_joined(&mut self, key: String, joint: Joint, sanitize: bool) -> Result<(), FilterError> {
        if self.filters.is_empty() {
            return Err(FilterError::JointWithoutFilter { key, joint });
        }
        self.ensure_last_complete()?;
        self.filters.push(Filter::open(key, Some(joint), sanitize));
        Ok(())
    }

    fn ensure_last_complete(&self) -> Result<(), FilterError> {
        match self.filters.last() {
            Some(last) if !last.is_complete() => Err(FilterError::PreviousIncomplete {
                key: last.key.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Completes the most recently opened predicate.
    pub fn compare(&mut self, operator: Operator, value: SqlValue) -> Result<(), FilterError> {
        let Some(last) = self.filters.last_mut() else {
            return Err(FilterError::NoOpenFilter { operator });
        };
        if last.is_complete() || last.operator.is_some() {
            return Err(FilterError::ValueAlreadySet {
                key: last.key.clone(),
            });
        }

        if operator.takes_list() && !value.is_list() {
            return Err(FilterError::ListRequired {
                key: last.key.clone(),
                operator,
            });
        }
        if !operator.takes_list() && value.is_list() {
            return Err(FilterError::ScalarRequired {
                key: last.key.clone(),
                operator,
            });
        }
        if value.is_null() && !operator.accepts_null() {
            return Err(FilterError::NullNotAllowed {
                key: last.key.clone(),
                operator,
            });
        }

        last.operator = Some(operator);
        last.value = Some(value);
        Ok(())
    }

    /// Places substitution filters ahead of the existing predicates.
    pub fn prepend(&mut self, substitutions: Vec<Filter>) {
        if substitutions.is_empty() {
            return;
        }
        let mut merged = substitutions;
        merged.append(&mut self.filters);
        self.filters = merged;
    }

    /// Returns the filters in order.
    #[must_use]
    pub fn as_slice(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true when no filter has been opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Returns the first predicate that was opened but never completed.
    #[must_use]
    pub fn first_incomplete(&self) -> Option<&Filter> {
        self.filters.iter().find(|f| !f.is_complete())
    }
}

impl<'a> IntoIterator for &'a FilterChain {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ToSqlValue;

    #[test]
    fn test_first_filter_has_no_joint() {
        let mut chain = FilterChain::new();
        chain.open("id", true).unwrap();
        chain.compare(Operator::Eq, 1_i64.to_sql_value()).unwrap();
        chain.open("name", true).unwrap();

        assert_eq!(chain.as_slice()[0].joint, None);
        assert_eq!(chain.as_slice()[1].joint, Some(Joint::And));
    }

    #[test]
    fn test_second_comparison_fails() {
        let mut chain = FilterChain::new();
        chain.open("a", true).unwrap();
        chain.compare(Operator::Eq, 1_i64.to_sql_value()).unwrap();
        let err = chain.compare(Operator::Eq, 2_i64.to_sql_value()).unwrap_err();
        assert_eq!(
            err,
            FilterError::ValueAlreadySet {
                key: String::from("a")
            }
        );
        assert_eq!(chain.as_slice()[0].value, Some(SqlValue::Int(1)));
    }

    #[test]
    fn test_joint_on_empty_chain_fails() {
        let mut chain = FilterChain::new();
        assert!(matches!(
            chain.and("a", true),
            Err(FilterError::JointWithoutFilter { joint: Joint::And, .. })
        ));
        assert!(matches!(
            chain.or("a", true),
            Err(FilterError::JointWithoutFilter { joint: Joint::Or, .. })
        ));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_comparison_on_empty_chain_fails() {
        let mut chain = FilterChain::new();
        assert_eq!(
            chain.compare(Operator::Gt, 3_i64.to_sql_value()),
            Err(FilterError::NoOpenFilter {
                operator: Operator::Gt
            })
        );
    }

    #[test]
    fn test_in_requires_list() {
        let mut chain = FilterChain::new();
        chain.open("id", true).unwrap();
        assert!(matches!(
            chain.compare(Operator::In, 3_i64.to_sql_value()),
            Err(FilterError::ListRequired { .. })
        ));
        chain.compare(Operator::In, vec![1_i64, 2].to_sql_value()).unwrap();
    }

    #[test]
    fn test_scalar_operator_rejects_list() {
        let mut chain = FilterChain::new();
        chain.open("id", true).unwrap();
        assert!(matches!(
            chain.compare(Operator::Gte, vec![1_i64, 2].to_sql_value()),
            Err(FilterError::ScalarRequired { .. })
        ));
    }

    #[test]
    fn test_null_only_for_equality() {
        let mut chain = FilterChain::new();
        chain.open("deleted_at", true).unwrap();
        assert!(matches!(
            chain.compare(Operator::Lt, SqlValue::Null),
            Err(FilterError::NullNotAllowed { .. })
        ));
        chain.compare(Operator::Ne, SqlValue::Null).unwrap();
    }

    #[test]
    fn test_prepend_keeps_substitutions_first() {
        let mut chain = FilterChain::new();
        chain.open("id", true).unwrap();
        chain.compare(Operator::Eq, 1_i64.to_sql_value()).unwrap();
        chain.prepend(vec![Filter::substitution("?name?", "Ann".to_sql_value())]);

        assert_eq!(chain.len(), 2);
        assert!(chain.as_slice()[0].is_substitution());
        assert_eq!(chain.as_slice()[1].key, "id");
    }

    #[test]
    fn test_opening_after_incomplete_predicate_fails() {
        let mut chain = FilterChain::new();
        chain.open("a", true).unwrap();
        let incomplete = Err(FilterError::PreviousIncomplete {
            key: String::from("a"),
        });
        assert_eq!(chain.and("b", true), incomplete);
        assert_eq!(chain.or("b", true), incomplete);
        assert_eq!(chain.open("b", true), incomplete);
        assert_eq!(chain.len(), 1);

        chain.compare(Operator::Eq, 1_i64.to_sql_value()).unwrap();
        chain.and("b", true).unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_first_incomplete() {
        let mut chain = FilterChain::new();
        chain.open("a", true).unwrap();
        assert_eq!(chain.first_incomplete().map(|f| f.key.as_str()), Some("a"));
        chain.compare(Operator::Like, "x%".to_sql_value()).unwrap();
        assert!(chain.first_incomplete().is_none());
    }
}
