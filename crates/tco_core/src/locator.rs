//! Minimal byte-offset-to-line-number mapping.
//!
//! Diagnostics carry a source line number, but `rustpython_ast` ranges are
//! expressed as byte offsets (`TextSize`). This is a deliberately small
//! reimplementation of the line-index idea a `ruff_source_file`-style crate
//! provides — we only need forward lookup, never column numbers or UTF-16
//! offsets.

use rustpython_ast::text_size::TextSize;

pub struct LineIndex {
    /// Byte offset of the start of each line; `line_starts[0] == 0`.
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based line number containing `offset`.
    pub fn line_number(&self, offset: TextSize) -> u32 {
        let offset: u32 = offset.into();
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line as u32 + 1,
            Err(next_line) => next_line as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_ast::text_size::TextSize;

    #[test]
    fn first_line_is_one() {
        let idx = LineIndex::new("a\nb\nc\n");
        assert_eq!(idx.line_number(TextSize::from(0)), 1);
        assert_eq!(idx.line_number(TextSize::from(2)), 2);
        assert_eq!(idx.line_number(TextSize::from(4)), 3);
    }
}
