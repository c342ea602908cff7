//! Named parameter bindings and `?name?` placeholder resolution.
//!
//! SQL text may carry placeholders of two shapes:
//!
//! - `?name?` is filled by a *global* binding;
//! - `?key:name?` is filled only by the binding stored under `key`.
//!
//! Resolution turns every placeholder found in the text into a substitution
//! [`Filter`]; the renderer later replaces each token with its literal.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::value::SqlValue;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\?(?:([A-Za-z_][A-Za-z0-9_.-]*):)?([A-Za-z_][A-Za-z0-9_]*)\?")
        .expect("placeholder pattern is valid")
});

/// Builds the placeholder token for a parameter.
#[must_use]
pub fn placeholder(scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(scope) => format!("?{scope}:{name}?"),
        None => format!("?{name}?"),
    }
}

/// Replaces every placeholder token in `text` in a single pass.
///
/// `literal` maps a token to its replacement; unknown tokens are kept.
/// Replacement text is never scanned again, so a bound value that looks
/// like a placeholder stays literal.
pub fn substitute_placeholders<F>(text: &str, mut literal: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    PLACEHOLDER
        .replace_all(text, |captures: &regex::Captures<'_>| {
            literal(&captures[0]).unwrap_or_else(|| captures[0].to_string())
        })
        .into_owned()
}

/// One set of parameters stored under a binding key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Global bindings fill `?name?`; scoped ones fill `?key:name?`.
    pub global: bool,
    /// Parameter values by name.
    pub params: BTreeMap<String, SqlValue>,
}

/// Outcome of resolving bindings against SQL text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// One substitution filter per distinct placeholder token, in order of
    /// first appearance.
    pub filters: Vec<Filter>,
    /// Bound parameters that matched no placeholder (`key:name`).
    pub unused: Vec<String>,
}

/// All bindings of one operation cycle.
///
/// Global and scoped bindings live in separate namespaces, so a scoped
/// key never collides with a global one of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamBindings {
    global: BTreeMap<String, Binding>,
    scoped: BTreeMap<String, Binding>,
}

impl ParamBindings {
    /// Creates an empty binding set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `params` under `key` in the global or scoped namespace. Names
    /// already bound under the same key are overwritten.
    pub fn bind<I, K>(&mut self, key: &str, global: bool, params: I)
    where
        I: IntoIterator<Item = (K, SqlValue)>,
        K: Into<String>,
    {
        let namespace = if global {
            &mut self.global
        } else {
            &mut self.scoped
        };
        let binding = namespace
            .entry(key.to_string())
            .or_insert_with(|| Binding {
                global,
                params: BTreeMap::new(),
            });
        for (name, value) in params {
            binding.params.insert(name.into(), value);
        }
    }

    /// Returns the binding stored under `key` in the chosen namespace.
    #[must_use]
    pub fn get(&self, key: &str, global: bool) -> Option<&Binding> {
        if global {
            self.global.get(key)
        } else {
            self.scoped.get(key)
        }
    }

    /// Returns the number of binding keys across both namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.global.len() + self.scoped.len()
    }

    /// Returns true when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.scoped.is_empty()
    }

    fn global_value(&self, name: &str) -> Option<(&str, &SqlValue)> {
        self.global
            .iter()
            .find_map(|(key, binding)| binding.params.get(name).map(|v| (key.as_str(), v)))
    }

    fn scoped_value(&self, scope: &str, name: &str) -> Option<&SqlValue> {
        self.scoped
            .get(scope)
            .and_then(|binding| binding.params.get(name))
    }

    /// Resolves the bindings against `sql`, producing one substitution
    /// filter per distinct placeholder that has a bound value.
    #[must_use]
    pub fn resolve(&self, sql: &str) -> Resolution {
        let mut filters = Vec::new();
        let mut seen = BTreeSet::new();
        let mut used: BTreeSet<(bool, String, String)> = BTreeSet::new();

        for captures in PLACEHOLDER.captures_iter(sql) {
            let token = &captures[0];
            if !seen.insert(token.to_string()) {
                continue;
            }
            let name = &captures[2];
            let resolved = match captures.get(1) {
                Some(scope) => self
                    .scoped_value(scope.as_str(), name)
                    .map(|value| (false, scope.as_str().to_string(), value)),
                None => self
                    .global_value(name)
                    .map(|(key, value)| (true, key.to_string(), value)),
            };
            if let Some((global, key, value)) = resolved {
                used.insert((global, key, name.to_string()));
                filters.push(Filter::substitution(token, value.clone()));
            }
        }

        let unused = self
            .global
            .iter()
            .map(|entry| (true, entry))
            .chain(self.scoped.iter().map(|entry| (false, entry)))
            .flat_map(|(global, (key, binding))| {
                binding
                    .params
                    .keys()
                    .map(move |name| (global, key.clone(), name.clone()))
            })
            .filter(|triple| !used.contains(triple))
            .map(|(_, key, name)| format!("{key}:{name}"))
            .collect();

        Resolution { filters, unused }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ToSqlValue;

    #[test]
    fn test_global_binding_fills_plain_placeholders() {
        let mut params = ParamBindings::new();
        params.bind("g0", true, [("id", 5_i64.to_sql_value())]);

        let resolution = params.resolve("SELECT * FROM users WHERE id = ?id? OR parent = ?id?");
        assert_eq!(resolution.filters.len(), 1);
        assert_eq!(resolution.filters[0].key, "?id?");
        assert_eq!(resolution.filters[0].value, Some(SqlValue::Int(5)));
        assert!(resolution.unused.is_empty());
    }

    #[test]
    fn test_scoped_binding_only_fills_tagged_placeholders() {
        let mut params = ParamBindings::new();
        params.bind("orders", false, [("id", 7_i64.to_sql_value())]);

        let resolution = params.resolve("SELECT ?id?, ?orders:id?");
        assert_eq!(resolution.filters.len(), 1);
        assert_eq!(resolution.filters[0].key, "?orders:id?");
    }

    #[test]
    fn test_rebinding_overwrites_value() {
        let mut params = ParamBindings::new();
        params.bind("g0", true, [("name", "Ann".to_sql_value())]);
        params.bind("g0", true, [("name", "Bob".to_sql_value())]);

        assert_eq!(params.len(), 1);
        assert_eq!(
            params.get("g0", true).unwrap().params["name"],
            SqlValue::Text(String::from("Bob"))
        );
    }

    #[test]
    fn test_unused_parameters_are_reported() {
        let mut params = ParamBindings::new();
        params.bind(
            "g0",
            true,
            [("id", 1_i64.to_sql_value()), ("unused", 2_i64.to_sql_value())],
        );

        let resolution = params.resolve("SELECT * FROM t WHERE id = ?id?");
        assert_eq!(resolution.unused, vec![String::from("g0:unused")]);
    }

    #[test]
    fn test_unbound_placeholder_is_left_alone() {
        let params = ParamBindings::new();
        let resolution = params.resolve("SELECT ?missing?");
        assert!(resolution.filters.is_empty());
    }

    #[test]
    fn test_scoped_and_global_keys_do_not_collide() {
        let mut params = ParamBindings::new();
        params.bind("global_2", true, [("id", 1_i64.to_sql_value())]);
        params.bind("global_2", false, [("id", 2_i64.to_sql_value())]);

        assert_eq!(params.len(), 2);
        assert!(params.get("global_2", true).unwrap().global);
        assert!(!params.get("global_2", false).unwrap().global);

        let resolution = params.resolve("SELECT ?id?, ?global_2:id?");
        assert_eq!(resolution.filters.len(), 2);
        assert_eq!(resolution.filters[0].value, Some(SqlValue::Int(1)));
        assert_eq!(resolution.filters[1].value, Some(SqlValue::Int(2)));
        assert!(resolution.unused.is_empty());
    }

    #[test]
    fn test_substitution_is_single_pass() {
        let out = substitute_placeholders("a = ?a? AND b = ?b? AND c = ?c?", |token| match token {
            "?a?" => Some(String::from("'?b?'")),
            "?b?" => Some(String::from("'x'")),
            _ => None,
        });
        assert_eq!(out, "a = '?b?' AND b = 'x' AND c = ?c?");
    }

    #[test]
    fn test_placeholder_token_shapes() {
        assert_eq!(placeholder(None, "id"), "?id?");
        assert_eq!(placeholder(Some("users"), "id"), "?users:id?");
    }
}
