//! Splitting NDJSON bulk bodies into action/document pairs

use bytes::Bytes;

/// One action line and the document line that follows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPair {
    /// Action/metadata line, forwarded untouched
    pub action: Bytes,
    /// Document line
    pub document: Bytes,
}

impl BulkPair {
    pub fn new(action: impl Into<Bytes>, document: impl Into<Bytes>) -> Self {
        Self {
            action: action.into(),
            document: document.into(),
        }
    }

    /// Append `action\ndocument\n` to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        write_pair(out, &self.action, &self.document);
    }
}

pub(crate) fn write_pair(out: &mut Vec<u8>, action: &[u8], document: &[u8]) {
    out.extend_from_slice(action);
    out.push(b'\n');
    out.extend_from_slice(document);
    out.push(b'\n');
}

/// Bulk body split into ordered pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkBody {
    /// Pairs in input order
    pub pairs: Vec<BulkPair>,
    /// Trailing action line with no document after it
    pub orphan: Option<Bytes>,
}

impl BulkBody {
    /// Split a newline-delimited body.
    ///
    /// Consecutive non-blank lines are paired as (action, document); blank
    /// lines are skipped and never counted. A `\r` before the newline is
    /// dropped.
    pub fn split(body: &Bytes) -> Self {
        let mut lines = split_lines(body).filter(|line| !is_blank(line));
        let mut pairs = Vec::new();
        let mut orphan = None;

        while let Some(action) = lines.next() {
            match lines.next() {
                Some(document) => pairs.push(BulkPair { action, document }),
                None => orphan = Some(action),
            }
        }

        Self { pairs, orphan }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.orphan.is_none()
    }
}

fn split_lines(body: &Bytes) -> impl Iterator<Item = Bytes> + '_ {
    let mut start = 0;
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let rest = &body[start..];
        let (line_end, next_start) = match rest.iter().position(|&b| b == b'\n') {
            Some(offset) => (start + offset, start + offset + 1),
            None => {
                done = true;
                (body.len(), body.len())
            }
        };
        let mut end = line_end;
        if end > start && body[end - 1] == b'\r' {
            end -= 1;
        }
        let line = body.slice(start..end);
        start = next_start;
        Some(line)
    })
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}
