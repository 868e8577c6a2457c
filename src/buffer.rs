//! Line buffer
//!
//! Append-only log of every raw line the server sent on one connection, in
//! arrival order. Lines are never reordered or removed except by `clear`.

/// One inbound protocol line with its arrival index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Position in the arrival order of this connection (not reset by `clear`)
    pub index: u64,
    /// Line text without the trailing CRLF
    pub text: String,
}

/// Ordered history of inbound lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    lines: Vec<Line>,
    next_index: u64,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line; returns its arrival index
    pub fn append(&mut self, text: impl Into<String>) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        self.lines.push(Line {
            index,
            text: text.into(),
        });
        index
    }

    /// Independent copy of the current history
    pub fn snapshot(&self) -> Vec<Line> {
        self.lines.clone()
    }

    /// Discard all history
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// First line (in arrival order) accepted by `pred`
    pub fn find(&self, mut pred: impl FnMut(&str) -> bool) -> Option<&Line> {
        self.lines.iter().find(|line| pred(&line.text))
    }

    /// Text of the last `n` lines, oldest first
    pub fn tail(&self, n: usize) -> Vec<String> {
        let start = self.lines.len().saturating_sub(n);
        self.lines[start..].iter().map(|l| l.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
