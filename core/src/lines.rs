#![deny(missing_docs)]

//! # Line Index
//!
//! Maps byte offsets to 1-based line numbers. `\n`, `\r\n` and a lone `\r`
//! each end a line.

/// Start offsets of every line of a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    lines: Vec<(usize, usize)>,
}

impl LineIndex {
    /// Builds the index for `text`.
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut lines = vec![(1, 0)];
        let mut i = 0;
        while i < bytes.len() {
            let next = match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => i + 2,
                b'\r' | b'\n' => i + 1,
                _ => {
                    i += 1;
                    continue;
                }
            };
            lines.push((lines.len() + 1, next));
            i = next;
        }
        Self { lines }
    }

    /// `(line, start_offset)` pairs, lines 1-based, offsets strictly increasing.
    pub fn lines(&self) -> &[(usize, usize)] {
        &self.lines
    }

    /// Number of lines (a trailing line break opens an empty last line).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// The greatest line whose start is at or before `offset`; `0` if none.
    pub fn line_for(&self, offset: usize) -> usize {
        // binary search for greatest start <= offset
        let idx = self.lines.partition_point(|(_, start)| *start <= offset);
        if idx == 0 {
            0
        } else {
            self.lines[idx - 1].0
        }
    }
}
