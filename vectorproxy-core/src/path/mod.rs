//! Field path expressions
//!
//! A path expression is a dot-separated field locator. The `#` token stands
//! for "each element of the array at this position", so `chapters.#.title`
//! addresses the `title` of every chapter. A literal dot inside a key is
//! written `\.`.

pub mod document;
pub mod raw;
pub mod resolver;

pub use resolver::{Match, resolve, resolve_all};

use std::fmt;
use std::str::FromStr;

use crate::error::{ProxyError, Result};

/// Wildcard token matching every element of an array
pub const WILDCARD: &str = "#";

/// Suffix appended to a field name to form its embedding field
pub const EMBEDDING_SUFFIX: &str = "_embedding";

/// One step of a path expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object key, or array index when applied to an array
    Key(String),
    /// Each element of the array at this position
    Wildcard,
}

/// Parsed path expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpression {
    segments: Vec<Segment>,
}

impl PathExpression {
    /// Parse a path expression.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidPath`] for an empty expression, an empty
    /// segment (`a..b`) or a dangling escape.
    pub fn parse(expression: &str) -> Result<Self> {
        let invalid = |reason: &str| ProxyError::InvalidPath {
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        if expression.is_empty() {
            return Err(invalid("expression is empty"));
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut escaped_segment = false;
        let mut chars = expression.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let next = chars.next().ok_or_else(|| invalid("dangling escape"))?;
                    current.push(next);
                    escaped_segment = true;
                }
                '.' => {
                    segments.push(Self::finish_segment(&current, escaped_segment).ok_or_else(
                        || invalid("empty segment"),
                    )?);
                    current.clear();
                    escaped_segment = false;
                }
                c => current.push(c),
            }
        }
        segments.push(
            Self::finish_segment(&current, escaped_segment)
                .ok_or_else(|| invalid("empty segment"))?,
        );

        Ok(Self { segments })
    }

    fn finish_segment(raw: &str, escaped: bool) -> Option<Segment> {
        match raw {
            "" => None,
            WILDCARD if !escaped => Some(Segment::Wildcard),
            key => Some(Segment::Key(key.to_string())),
        }
    }

    /// Build an expression from already-split segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Position of the leftmost wildcard, if any.
    pub fn first_wildcard(&self) -> Option<usize> {
        self.segments.iter().position(|s| *s == Segment::Wildcard)
    }

    /// True when the expression contains no wildcard.
    pub fn is_concrete(&self) -> bool {
        self.first_wildcard().is_none()
    }

    /// Replace the leftmost wildcard with an array index.
    ///
    /// Only the first remaining wildcard is substituted; later ones are left
    /// for the next level of resolution.
    pub fn substitute_first_wildcard(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        if let Some(pos) = self.first_wildcard() {
            segments[pos] = Segment::Key(index.to_string());
        }
        Self { segments }
    }

    /// Location of the embedding written for this field (`<path>_embedding`).
    ///
    /// Returns `None` when the last segment is a wildcard.
    pub fn embedding_path(&self) -> Option<Self> {
        let (last, parent) = self.segments.split_last()?;
        match last {
            Segment::Key(key) => {
                let mut segments = parent.to_vec();
                segments.push(Segment::Key(format!("{key}{EMBEDDING_SUFFIX}")));
                Some(Self { segments })
            }
            Segment::Wildcard => None,
        }
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                Segment::Wildcard => f.write_str(WILDCARD)?,
                Segment::Key(key) if key == WILDCARD => f.write_str("\\#")?,
                Segment::Key(key) => {
                    for c in key.chars() {
                        if c == '.' || c == '\\' {
                            f.write_str("\\")?;
                        }
                        write!(f, "{c}")?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl FromStr for PathExpression {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> Segment {
        Segment::Key(k.to_string())
    }

    #[test]
    fn test_parse_simple_and_wildcard() {
        let path = PathExpression::parse("a.#.b.#.c").unwrap();
        assert_eq!(
            path.segments(),
            &[key("a"), Segment::Wildcard, key("b"), Segment::Wildcard, key("c")]
        );
        assert_eq!(path.first_wildcard(), Some(1));
        assert!(!path.is_concrete());
    }

    #[test]
    fn test_parse_escapes() {
        let path = PathExpression::parse(r"meta\.data.\#").unwrap();
        assert_eq!(path.segments(), &[key("meta.data"), key("#")]);
        assert!(path.is_concrete());
        assert_eq!(path.to_string(), r"meta\.data.\#");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(PathExpression::parse("").is_err());
        assert!(PathExpression::parse("a..b").is_err());
        assert!(PathExpression::parse("a.").is_err());
        assert!(PathExpression::parse("a\\").is_err());
    }

    #[test]
    fn test_substitute_only_first_wildcard() {
        let path = PathExpression::parse("a.#.b.#.c").unwrap();
        let once = path.substitute_first_wildcard(3);
        assert_eq!(once.to_string(), "a.3.b.#.c");
        let twice = once.substitute_first_wildcard(0);
        assert_eq!(twice.to_string(), "a.3.b.0.c");
        assert!(twice.is_concrete());
    }

    #[test]
    fn test_embedding_path() {
        let path = PathExpression::parse("a.0.title").unwrap();
        assert_eq!(path.embedding_path().unwrap().to_string(), "a.0.title_embedding");
        assert!(PathExpression::parse("a.#").unwrap().embedding_path().is_none());
    }
}
