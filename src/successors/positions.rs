//! Node offset to source line mapping.
//!
//! The walker never looks at node text; it only needs to know which lines a
//! syntactic construct occupies. A node's line footprint is the ordered
//! sequence of distinct lines covered by its half-open byte range, which for
//! a contiguous span is exactly the line range of its endpoints.

use super::pos::Pos;
use super::walker::FileWalker;
use tree_sitter::Node;

/// Byte offset of the first character of every line, in order.
pub(crate) struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub(crate) fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self {
            starts,
            len: src.len(),
        }
    }

    /// 1-based line of a byte offset. Offsets at or past the end of the
    /// source resolve to the last line.
    pub(crate) fn line_of(&self, byte: usize) -> i64 {
        let byte = byte.min(self.len.saturating_sub(1));
        self.starts.partition_point(|&start| start <= byte) as i64
    }
}

impl FileWalker<'_> {
    /// The `(file, line)` of a byte offset in the current file.
    pub(crate) fn to_pos(&self, byte: usize) -> Pos {
        Pos::new(self.file.clone(), self.lines.line_of(byte))
    }

    /// Line footprint of a node: every distinct line in `[start, end)`, in
    /// order. `None` and zero-width nodes yield an empty footprint, turning
    /// the caller into a no-op.
    pub(crate) fn all_positions(&self, node: Option<Node>) -> Vec<Pos> {
        match node {
            Some(node) => self.positions_in_range(node.start_byte(), node.end_byte()),
            None => Vec::new(),
        }
    }

    pub(crate) fn positions_in_range(&self, start: usize, end: usize) -> Vec<Pos> {
        if start >= end {
            return Vec::new();
        }
        let first = self.lines.line_of(start);
        let last = self.lines.line_of(end - 1);
        (first..=last)
            .map(|line| Pos::new(self.file.clone(), line))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_of_maps_offsets_to_lines() {
        let idx = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(idx.line_of(0), 1);
        assert_eq!(idx.line_of(2), 1); // the newline belongs to line 1
        assert_eq!(idx.line_of(3), 2);
        assert_eq!(idx.line_of(6), 3); // empty line
        assert_eq!(idx.line_of(7), 4);
        assert_eq!(idx.line_of(100), 4); // clamped
    }

    #[test]
    fn line_of_handles_trailing_newline() {
        let idx = LineIndex::new("a\n");
        assert_eq!(idx.line_of(0), 1);
        assert_eq!(idx.line_of(1), 1);
        assert_eq!(idx.line_of(2), 1);
    }
}
