use std::fmt;
use std::ops::Range;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,  // Zero-based line index
    pub start: usize, // Byte offset within the line
    pub end: usize,   // Byte offset within the line (exclusive)
}

impl Span {
    pub fn new(line: usize, start: usize, end: usize) -> Self {
        Span { line, start, end }
    }

    /// Converts the line-relative span into a byte range of the whole source text.
    pub fn to_range(&self, source: &str) -> Range<usize> {
        let offset: usize = source
            .split_inclusive('\n')
            .take(self.line)
            .map(str::len)
            .sum();
        (offset + self.start)..(offset + self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.start + 1)
    }
}
