pub const TAB_WIDTH: usize = 2;

pub fn spaces(time: usize) -> String {
    " ".repeat(time)
}

/// Indents every line after the first by `level` tab stops.
pub fn indent_value(v: &str, level: usize) -> String {
    v.replace('\n', format!("\n{}", spaces(level * TAB_WIDTH)).as_str())
}

/// A point in source text. `offset` is a UTF-8 byte offset from the start of
/// the document; `line` and `column` are 1-based, columns counted in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Maps byte offsets to line/column positions.
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineIndex {
            source,
            line_starts,
        }
    }

    /// Offsets past the end clamp to the end; offsets inside a multi-byte
    /// char snap back to its start.
    pub fn position(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.source.len());
        while !self.source.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(l) => l,
            Err(l) => l - 1,
        };
        let line_start = self.line_starts[line];
        let column = self.source[line_start..offset].chars().count() + 1;
        Position {
            offset,
            line: line + 1,
            column,
        }
    }
}

/// Byte offset of `needle` in `haystack` starting at `from`, ASCII
/// case-insensitively.
pub fn find_ignore_ascii_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || from > h.len() || n.len() > h.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index() {
        let src = "ab\ncd\n\né!";
        let idx = LineIndex::new(src);
        assert_eq!(idx.position(0), Position { offset: 0, line: 1, column: 1 });
        assert_eq!(idx.position(2), Position { offset: 2, line: 1, column: 3 });
        assert_eq!(idx.position(3), Position { offset: 3, line: 2, column: 1 });
        assert_eq!(idx.position(6), Position { offset: 6, line: 3, column: 1 });
        // 'é' is two bytes; the '!' after it is column 2
        assert_eq!(idx.position(9), Position { offset: 9, line: 4, column: 2 });
        assert_eq!(idx.position(8), Position { offset: 7, line: 4, column: 1 });
        assert_eq!(idx.position(100).offset, src.len());
    }

    #[test]
    fn test_find_ignore_ascii_case() {
        assert_eq!(find_ignore_ascii_case("a</Style>", "</style", 0), Some(1));
        assert_eq!(find_ignore_ascii_case("abc", "d", 0), None);
        assert_eq!(find_ignore_ascii_case("abab", "ab", 1), Some(2));
    }

    #[test]
    fn test_indent_value() {
        assert_eq!(indent_value("a\nb", 1), "a\n  b");
    }
}
