//! SQL values and literal rendering.
//!
//! Values reach SQL text only through [`SqlValue::to_sql_literal`], which
//! routes every string through an [`Escape`] implementation (normally the
//! driver's) when sanitization is requested.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A SQL value that can be bound into a filter or a parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Ordered collection, used by `IN` / `NOT IN`.
    List(Vec<SqlValue>),
    /// Binary blob value.
    Blob(Vec<u8>),
}

/// One result row, keyed by column name.
pub type Row = BTreeMap<String, SqlValue>;

/// The rows returned by a read.
pub type Rowset = Vec<Row>;

/// Escaping primitive for string contents.
///
/// Implementations return the *contents* of a string literal; quoting is
/// added by the caller.
pub trait Escape {
    /// Escapes `raw` so it can be placed between single quotes.
    fn escape(&self, raw: &str) -> String;
}

/// ANSI escaping: single quotes are doubled.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteEscape;

impl Escape for QuoteEscape {
    fn escape(&self, raw: &str) -> String {
        raw.replace('\'', "''")
    }
}

impl SqlValue {
    /// Returns true for [`SqlValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for [`SqlValue::List`].
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as a SQL literal.
    ///
    /// With an escaper, string contents are escaped before quoting. Without
    /// one the contents are quoted verbatim, which is only safe for trusted
    /// input. Lists become a parenthesized, comma-separated literal list.
    #[must_use]
    pub fn to_sql_literal(&self, escaper: Option<&dyn Escape>) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Text(s) => match escaper {
                Some(escaper) => format!("'{}'", escaper.escape(s)),
                None => format!("'{s}'"),
            },
            Self::List(items) => {
                let rendered: Vec<String> =
                    items.iter().map(|v| v.to_sql_literal(escaper)).collect();
                format!("({})", rendered.join(", "))
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }

    /// Renders the value with ANSI quote escaping.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        self.to_sql_literal(Some(&QuoteEscape))
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for i16 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u16 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl<T: ToSqlValue> ToSqlValue for Vec<T> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::List(self.into_iter().map(ToSqlValue::to_sql_value).collect())
    }
}

impl<T: ToSqlValue, const N: usize> ToSqlValue for [T; N] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::List(self.into_iter().map(ToSqlValue::to_sql_value).collect())
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Backslash;

    impl Escape for Backslash {
        fn escape(&self, raw: &str) -> String {
            raw.replace('\'', "\\'")
        }
    }

    #[test]
    fn test_sql_value_inline_scalars() {
        assert_eq!(SqlValue::Null.to_sql_inline(), "NULL");
        assert_eq!(SqlValue::Bool(true).to_sql_inline(), "TRUE");
        assert_eq!(SqlValue::Bool(false).to_sql_inline(), "FALSE");
        assert_eq!(SqlValue::Int(-100).to_sql_inline(), "-100");
        assert_eq!(SqlValue::Float(2.5).to_sql_inline(), "2.5");
    }

    #[test]
    fn test_sql_injection_prevention() {
        let value = SqlValue::Text(String::from("'; DROP TABLE users; --"));
        assert_eq!(value.to_sql_inline(), "'''; DROP TABLE users; --'");
    }

    #[test]
    fn test_custom_escaper_is_used() {
        let value = SqlValue::Text(String::from("O'Brien"));
        assert_eq!(value.to_sql_literal(Some(&Backslash)), "'O\\'Brien'");
    }

    #[test]
    fn test_unsanitized_text_is_quoted_verbatim() {
        let value = SqlValue::Text(String::from("it's"));
        assert_eq!(value.to_sql_literal(None), "'it's'");
    }

    #[test]
    fn test_list_literal_quotes_only_strings() {
        let list = vec![SqlValue::Int(1), SqlValue::Int(2), "x".to_sql_value()].to_sql_value();
        assert_eq!(list.to_sql_inline(), "(1, 2, 'x')");
    }

    #[test]
    fn test_blob_literal() {
        assert_eq!(
            SqlValue::Blob(vec![0x48, 0x45, 0x4C, 0x4C, 0x4F]).to_sql_inline(),
            "X'48454C4C4F'"
        );
    }

    #[test]
    fn test_to_sql_value_conversions() {
        assert_eq!(true.to_sql_value(), SqlValue::Bool(true));
        assert_eq!(42_i32.to_sql_value(), SqlValue::Int(42));
        assert_eq!(None::<i32>.to_sql_value(), SqlValue::Null);
        assert_eq!(
            ["a", "b"].to_sql_value(),
            SqlValue::List(vec![
                SqlValue::Text(String::from("a")),
                SqlValue::Text(String::from("b")),
            ])
        );
    }

    #[test]
    fn test_untagged_json_shape() {
        let row: Row = serde_json::from_str(r#"{"id": 5, "name": "Ann", "gone": null}"#).unwrap();
        assert_eq!(row["id"], SqlValue::Int(5));
        assert_eq!(row["name"], SqlValue::Text(String::from("Ann")));
        assert_eq!(row["gone"], SqlValue::Null);
    }
}
