//! Path resolution against a JSON document

use serde_json::Value;

use super::PathExpression;
use super::document::lookup;

/// Result of resolving a path expression one wildcard level deep
#[derive(Debug, Clone, PartialEq)]
pub enum Match {
    /// Fully concrete path holding a text-like value
    Scalar {
        /// Concrete path, wildcards replaced by array positions
        path: PathExpression,
        /// Value found there
        value: Value,
    },
    /// Partially resolved path that still contains wildcards
    Nested {
        /// Path with the leading wildcards replaced by array positions
        path: PathExpression,
    },
}

impl Match {
    pub fn path(&self) -> &PathExpression {
        match self {
            Match::Scalar { path, .. } | Match::Nested { path } => path,
        }
    }

    /// String form of a scalar match, as sent to the embedding provider.
    pub fn text(&self) -> Option<String> {
        match self {
            Match::Scalar { value, .. } => scalar_text(value),
            Match::Nested { .. } => None,
        }
    }
}

/// Resolve the leftmost wildcard of `expression` against `document`.
///
/// A concrete expression yields at most one [`Match::Scalar`]. Otherwise the
/// array before the first wildcard is enumerated: each element position is
/// substituted for that wildcard, giving a [`Match::Scalar`] when the result
/// is concrete and a [`Match::Nested`] when more wildcards remain.
///
/// Absent fields, non-arrays under a wildcard, and objects, arrays or nulls at
/// a concrete path all resolve to nothing.
pub fn resolve(document: &Value, expression: &PathExpression) -> Vec<Match> {
    let Some(pos) = expression.first_wildcard() else {
        return lookup(document, expression.segments())
            .filter(|value| scalar_text(value).is_some())
            .map(|value| Match::Scalar {
                path: expression.clone(),
                value: value.clone(),
            })
            .into_iter()
            .collect();
    };

    let Some(Value::Array(items)) = lookup(document, &expression.segments()[..pos]) else {
        return Vec::new();
    };

    (0..items.len())
        .flat_map(|index| {
            let path = expression.substitute_first_wildcard(index);
            if path.is_concrete() {
                resolve(document, &path)
            } else {
                vec![Match::Nested { path }]
            }
        })
        .collect()
}

/// Resolve every wildcard level, returning only scalar matches in document order.
pub fn resolve_all(document: &Value, expression: &PathExpression) -> Vec<Match> {
    resolve(document, expression)
        .into_iter()
        .flat_map(|m| match m {
            Match::Nested { path } => resolve_all(document, &path),
            scalar => vec![scalar],
        })
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> PathExpression {
        PathExpression::parse(p).unwrap()
    }

    fn paths(matches: &[Match]) -> Vec<String> {
        matches.iter().map(|m| m.path().to_string()).collect()
    }

    #[test]
    fn test_concrete_path_is_idempotent() {
        let doc = json!({"title": "hello", "meta": {"lang": "en"}});
        let first = resolve(&doc, &path("meta.lang"));
        let second = resolve(&doc, &path("meta.lang"));
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].text().as_deref(), Some("en"));
        assert_eq!(paths(&first), vec!["meta.lang"]);
    }

    #[test]
    fn test_missing_path_yields_nothing() {
        let doc = json!({"title": "hello"});
        assert!(resolve(&doc, &path("body")).is_empty());
        assert!(resolve(&doc, &path("items.#.name")).is_empty());
        assert!(resolve(&doc, &path("title.#")).is_empty());
    }

    #[test]
    fn test_single_wildcard() {
        let doc = json!({"tags": [{"name": "a"}, {"other": 1}, {"name": 7}]});
        let matches = resolve(&doc, &path("tags.#.name"));
        assert_eq!(paths(&matches), vec!["tags.0.name", "tags.2.name"]);
        assert_eq!(matches[1].text().as_deref(), Some("7"));
    }

    #[test]
    fn test_nested_wildcards_resolve_one_level_per_call() {
        let doc = json!({"a": [{"b": [{"c": "x"}, {"c": "y"}]}]});
        let first = resolve(&doc, &path("a.#.b.#.c"));
        assert_eq!(
            first,
            vec![Match::Nested {
                path: path("a.0.b.#.c")
            }]
        );

        let second = resolve(&doc, first[0].path());
        assert_eq!(paths(&second), vec!["a.0.b.0.c", "a.0.b.1.c"]);
    }

    #[test]
    fn test_resolve_all_nested_arrays() {
        let doc = json!({"a": [{"b": [{"c": "x"}, {"c": "y"}]}]});
        let matches = resolve_all(&doc, &path("a.#.b.#.c"));
        assert_eq!(paths(&matches), vec!["a.0.b.0.c", "a.0.b.1.c"]);
        assert_eq!(matches[0].text().as_deref(), Some("x"));
        assert_eq!(matches[1].text().as_deref(), Some("y"));
    }

    #[test]
    fn test_non_scalar_concrete_values_are_skipped() {
        let doc = json!({"obj": {"k": "v"}, "arr": ["a"], "nothing": null});
        assert!(resolve(&doc, &path("obj")).is_empty());
        assert!(resolve(&doc, &path("arr")).is_empty());
        assert!(resolve(&doc, &path("nothing")).is_empty());
    }

    #[test]
    fn test_trailing_wildcard_over_scalars() {
        let doc = json!({"tags": ["red", "blue"]});
        let matches = resolve(&doc, &path("tags.#"));
        assert_eq!(paths(&matches), vec!["tags.0", "tags.1"]);
    }
}
