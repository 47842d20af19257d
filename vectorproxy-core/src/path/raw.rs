//! Byte-level edits of serialized JSON
//!
//! Enriched documents are forwarded as the client sent them with only the
//! new members spliced in. Number spelling, big integers, duplicate keys and
//! whitespace outside the edited member all survive untouched.

use std::ops::Range;

use super::{PathExpression, Segment};
use crate::error::{ProxyError, Result};

/// One `"key": value` member of a serialized object
struct Member {
    key: String,
    value: Range<usize>,
}

/// Set the member named by the last segment of `path` to the serialized
/// `value`, inside the object the preceding segments lead to.
///
/// An existing member (the last one, when keys repeat) has its value
/// replaced in place. Otherwise the member is appended after the object's
/// last member.
///
/// `raw` must hold a single valid JSON value.
///
/// # Errors
///
/// Returns [`ProxyError::Document`] when a parent is missing, is not an
/// object or array, or the final parent is not an object.
pub fn splice(raw: &[u8], path: &PathExpression, value: &[u8]) -> Result<Vec<u8>> {
    let Some((Segment::Key(key), parents)) = path.segments().split_last() else {
        return Err(ProxyError::document(path, "path does not end in a key"));
    };

    let mut at = skip_whitespace(raw, 0);
    for segment in parents {
        let Segment::Key(step) = segment else {
            return Err(ProxyError::document(path, "path is not concrete"));
        };
        at = child(raw, at, step)
            .map_err(|reason| ProxyError::document(path, reason))?
            .ok_or_else(|| ProxyError::document(path, format!("no member '{step}'")))?
            .start;
    }

    if raw.get(at) != Some(&b'{') {
        return Err(ProxyError::document(path, "parent is not an object"));
    }
    let (members, close) =
        object_members(raw, at).map_err(|reason| ProxyError::document(path, reason))?;

    let mut out = Vec::with_capacity(raw.len() + key.len() + value.len() + 4);
    match members.iter().rev().find(|m| m.key == *key) {
        Some(existing) => {
            out.extend_from_slice(&raw[..existing.value.start]);
            out.extend_from_slice(value);
            out.extend_from_slice(&raw[existing.value.end..]);
        }
        None => {
            let insert_at = members.last().map_or(close, |m| m.value.end);
            out.extend_from_slice(&raw[..insert_at]);
            if !members.is_empty() {
                out.push(b',');
            }
            out.extend_from_slice(serde_json::to_string(key)?.as_bytes());
            out.push(b':');
            out.extend_from_slice(value);
            out.extend_from_slice(&raw[insert_at..]);
        }
    }
    Ok(out)
}

/// Span of the member or element named `step` in the container at `at`.
fn child(
    raw: &[u8],
    at: usize,
    step: &str,
) -> std::result::Result<Option<Range<usize>>, String> {
    match raw.get(at) {
        Some(b'{') => {
            let (members, _) = object_members(raw, at)?;
            Ok(members.into_iter().rev().find(|m| m.key == step).map(|m| m.value))
        }
        Some(b'[') => {
            let Ok(index) = step.parse::<usize>() else {
                return Ok(None);
            };
            Ok(array_elements(raw, at)?.into_iter().nth(index))
        }
        _ => Err(format!("cannot descend into '{step}'")),
    }
}

fn object_members(raw: &[u8], open: usize) -> std::result::Result<(Vec<Member>, usize), String> {
    let mut members = Vec::new();
    let mut at = skip_whitespace(raw, open + 1);
    if raw.get(at) == Some(&b'}') {
        return Ok((members, at));
    }

    loop {
        let key_end = string_end(raw, at)?;
        let key: String = serde_json::from_slice(&raw[at..key_end])
            .map_err(|e| format!("invalid object key: {e}"))?;
        at = skip_whitespace(raw, key_end);
        if raw.get(at) != Some(&b':') {
            return Err("expected ':' after object key".to_string());
        }
        let start = skip_whitespace(raw, at + 1);
        let end = value_end(raw, start)?;
        members.push(Member {
            key,
            value: start..end,
        });

        at = skip_whitespace(raw, end);
        match raw.get(at) {
            Some(b',') => at = skip_whitespace(raw, at + 1),
            Some(b'}') => return Ok((members, at)),
            _ => return Err("unterminated object".to_string()),
        }
    }
}

fn array_elements(raw: &[u8], open: usize) -> std::result::Result<Vec<Range<usize>>, String> {
    let mut elements = Vec::new();
    let mut at = skip_whitespace(raw, open + 1);
    if raw.get(at) == Some(&b']') {
        return Ok(elements);
    }

    loop {
        let end = value_end(raw, at)?;
        elements.push(at..end);
        at = skip_whitespace(raw, end);
        match raw.get(at) {
            Some(b',') => at = skip_whitespace(raw, at + 1),
            Some(b']') => return Ok(elements),
            _ => return Err("unterminated array".to_string()),
        }
    }
}

/// End (exclusive) of the value starting at `start`.
fn value_end(raw: &[u8], start: usize) -> std::result::Result<usize, String> {
    match raw.get(start) {
        Some(b'"') => string_end(raw, start),
        Some(b'{' | b'[') => container_end(raw, start),
        Some(_) => Ok(raw[start..]
            .iter()
            .position(|b| matches!(b, b',' | b'}' | b']') || b.is_ascii_whitespace())
            .map_or(raw.len(), |n| start + n)),
        None => Err("unexpected end of document".to_string()),
    }
}

fn container_end(raw: &[u8], start: usize) -> std::result::Result<usize, String> {
    let mut depth = 0usize;
    let mut at = start;
    while let Some(&byte) = raw.get(at) {
        match byte {
            b'"' => {
                at = string_end(raw, at)?;
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(at + 1);
                }
            }
            _ => {}
        }
        at += 1;
    }
    Err("unterminated container".to_string())
}

fn string_end(raw: &[u8], start: usize) -> std::result::Result<usize, String> {
    if raw.get(start) != Some(&b'"') {
        return Err("expected a string".to_string());
    }
    let mut at = start + 1;
    while let Some(&byte) = raw.get(at) {
        match byte {
            b'\\' => at += 2,
            b'"' => return Ok(at + 1),
            _ => at += 1,
        }
    }
    Err("unterminated string".to_string())
}

fn skip_whitespace(raw: &[u8], from: usize) -> usize {
    raw.get(from..)
        .and_then(|rest| rest.iter().position(|b| !b.is_ascii_whitespace()))
        .map_or(raw.len(), |n| from + n)
}
