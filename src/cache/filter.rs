//! Filter Engine
//!
//! A [`FilterSpec`] maps dotted key paths (`interface_set.links.subnet.name`)
//! to [`Matcher`]s. Every entry must hold for a record to match. List values
//! met along a path fan out: a record matches when any element does.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Marker for prefix / suffix globs
pub const WILDCARD: char = '*';

static NULL: Value = Value::Null;

/// Predicate type for [`Matcher::Custom`]
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// How a leaf value is tested
#[derive(Clone)]
pub enum Matcher {
    Equals(Value),
    /// String starting with the given prefix (`"prefix*"`)
    Prefix(String),
    /// String ending with the given suffix (`"*suffix"`)
    Suffix(String),
    Truthy,
    Falsy,
    Custom(Predicate),
}

impl Matcher {
    /// Choose the variant from the shape of a literal.
    ///
    /// `"*suffix"` and `"prefix*"` are globs, booleans test truthiness,
    /// everything else is an equality test.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) if s.starts_with(WILDCARD) => {
                Matcher::Suffix(s.trim_start_matches(WILDCARD).to_string())
            }
            Value::String(s) if s.ends_with(WILDCARD) => {
                Matcher::Prefix(s.trim_end_matches(WILDCARD).to_string())
            }
            Value::Bool(true) => Matcher::Truthy,
            Value::Bool(false) => Matcher::Falsy,
            other => Matcher::Equals(other),
        }
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Matcher::Custom(Arc::new(predicate))
    }

    /// Test one leaf value
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Matcher::Equals(expected) => values_equal(value, expected),
            Matcher::Prefix(prefix) => value.as_str().is_some_and(|s| s.starts_with(prefix.as_str())),
            Matcher::Suffix(suffix) => value.as_str().is_some_and(|s| s.ends_with(suffix.as_str())),
            Matcher::Truthy => is_truthy(value),
            Matcher::Falsy => !is_truthy(value),
            Matcher::Custom(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            Matcher::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
            Matcher::Suffix(s) => f.debug_tuple("Suffix").field(s).finish(),
            Matcher::Truthy => f.write_str("Truthy"),
            Matcher::Falsy => f.write_str("Falsy"),
            Matcher::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<Value> for Matcher {
    fn from(value: Value) -> Self {
        Matcher::from_value(value)
    }
}

impl From<&str> for Matcher {
    fn from(value: &str) -> Self {
        Matcher::from_value(Value::String(value.to_string()))
    }
}

impl From<String> for Matcher {
    fn from(value: String) -> Self {
        Matcher::from_value(Value::String(value))
    }
}

impl From<bool> for Matcher {
    fn from(value: bool) -> Self {
        Matcher::from_value(Value::Bool(value))
    }
}

impl From<i64> for Matcher {
    fn from(value: i64) -> Self {
        Matcher::Equals(Value::from(value))
    }
}

/// Truthiness of a JSON value: null, false, zero and empty values are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

// 1 and 1.0 compare equal
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Candidates for `key` in `value`: list entries fan out, a missing key
/// yields `null`, and non-mappings yield nothing.
fn key_candidates<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    let Value::Object(map) = value else {
        return &[];
    };

    match map.get(key) {
        Some(Value::Array(items)) => items.as_slice(),
        Some(v) => std::slice::from_ref(v),
        None => std::slice::from_ref(&NULL),
    }
}

/// True if any value reached through `path` satisfies `matcher`.
///
/// Falsy intermediate values end their branch.
fn any_leaf_matches(value: &Value, path: &[&str], matcher: &Matcher) -> bool {
    let Some((first, rest)) = path.split_first() else {
        return false;
    };

    key_candidates(value, first).iter().any(|candidate| {
        if rest.is_empty() {
            matcher.accepts(candidate)
        } else {
            is_truthy(candidate) && any_leaf_matches(candidate, rest, matcher)
        }
    })
}

/// Every leaf value reachable through a dotted path
pub fn key_spec_values<'a>(record: &'a Value, dotted: &str) -> Vec<&'a Value> {
    fn collect<'a>(value: &'a Value, path: &[&str], out: &mut Vec<&'a Value>) {
        let Some((first, rest)) = path.split_first() else {
            return;
        };
        for candidate in key_candidates(value, first) {
            if rest.is_empty() {
                out.push(candidate);
            } else if is_truthy(candidate) {
                collect(candidate, rest, out);
            }
        }
    }

    let path: Vec<&str> = dotted.split('.').collect();
    let mut out = Vec::new();
    collect(record, &path, &mut out);
    out
}

/// Conjunction of dotted-path predicates
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    entries: BTreeMap<String, Matcher>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the matcher for a dotted path
    pub fn with(mut self, key_spec: &str, matcher: impl Into<Matcher>) -> Self {
        self.insert(key_spec, matcher);
        self
    }

    /// Add a custom predicate for a dotted path
    pub fn with_fn<F>(self, key_spec: &str, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.with(key_spec, Matcher::custom(predicate))
    }

    pub fn insert(&mut self, key_spec: &str, matcher: impl Into<Matcher>) {
        self.entries.insert(key_spec.to_string(), matcher.into());
    }

    /// Parse `key.spec=expr`. The expression is read as JSON when it parses,
    /// otherwise as a plain string.
    pub fn parse_entry(entry: &str) -> Option<(String, Matcher)> {
        let (key, expr) = entry.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let value = serde_json::from_str::<Value>(expr)
            .unwrap_or_else(|_| Value::String(expr.to_string()));
        Some((key.to_string(), Matcher::from_value(value)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if `record` satisfies every entry
    pub fn matches(&self, record: &Value) -> bool {
        self.entries
            .iter()
            .all(|(key_spec, matcher)| key_matches(record, key_spec, matcher))
    }

    /// Identifiers of the records satisfying every entry.
    ///
    /// Each entry selects its own id set and the sets are intersected. An
    /// empty spec selects every record.
    pub fn match_ids(&self, records: &HashMap<String, Value>) -> HashSet<String> {
        let mut per_key = self.entries.iter().map(|(key_spec, matcher)| {
            records
                .iter()
                .filter(|(_, record)| key_matches(record, key_spec, matcher))
                .map(|(id, _)| id.clone())
                .collect::<HashSet<String>>()
        });

        let Some(first) = per_key.next() else {
            return records.keys().cloned().collect();
        };

        per_key.fold(first, |acc, subset| {
            if acc.is_empty() {
                acc
            } else {
                acc.intersection(&subset).cloned().collect()
            }
        })
    }
}

impl<K: AsRef<str>, M: Into<Matcher>> FromIterator<(K, M)> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = (K, M)>>(iter: I) -> Self {
        let mut spec = FilterSpec::new();
        for (key, matcher) in iter {
            spec.insert(key.as_ref(), matcher);
        }
        spec
    }
}

/// Test one record against one dotted path
pub fn key_matches(record: &Value, key_spec: &str, matcher: &Matcher) -> bool {
    let path: Vec<&str> = key_spec.split('.').collect();
    any_leaf_matches(record, &path, matcher)
}
