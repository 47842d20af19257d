//! Reading and writing JSON documents at concrete paths

use serde_json::{Map, Value};

use super::{PathExpression, Segment};
use crate::error::{ProxyError, Result};

/// Look up the value at a concrete prefix of segments.
///
/// Keys index objects by name and arrays by position. A wildcard never
/// matches here; callers substitute it first.
pub fn lookup<'a>(document: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    segments.iter().try_fold(document, |current, segment| match segment {
        Segment::Key(key) => step(current, key),
        Segment::Wildcard => None,
    })
}

fn step<'a>(current: &'a Value, key: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Write `value` at a concrete path, replacing any prior value there.
///
/// Missing (or null) intermediate objects are created. Array positions must
/// already exist.
///
/// # Errors
///
/// Returns [`ProxyError::Document`] when the path contains a wildcard, walks
/// through a scalar, or indexes an array with something other than an
/// in-range position.
pub fn set(document: &mut Value, path: &PathExpression, value: Value) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(ProxyError::document(path, "path is empty"));
    };

    let mut current = document;
    for segment in parents {
        let Segment::Key(key) = segment else {
            return Err(ProxyError::document(path, "path is not concrete"));
        };
        current = child_mut(current, key).ok_or_else(|| {
            ProxyError::document(path, format!("cannot descend into '{key}'"))
        })?;
    }

    let Segment::Key(key) = last else {
        return Err(ProxyError::document(path, "path is not concrete"));
    };

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            let slot = key
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get_mut(i))
                .ok_or_else(|| {
                    ProxyError::document(path, format!("'{key}' is not a valid array position"))
                })?;
            *slot = value;
            Ok(())
        }
        _ => Err(ProxyError::document(path, "parent is not an object or array")),
    }
}

fn child_mut<'a>(current: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => Some(
            map.entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
        ),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}
