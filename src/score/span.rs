//! Bits and pieces for pointing at regions of a score.

use std::fmt;

/// A region within a text.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Span {
    /// The byte-offset of the first character of the span.
    pub begin: usize,
    /// The byte-offset of the first character *after* the span.
    pub end: usize,
}

/// Position inside a text in a form that's useful for human readers.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Pos {
    /// Line number, starting at 1
    pub line: usize,
    /// Position within the line, in characters, starting at 1
    pub column: usize,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A data structure for mapping byte offsets to line/column based positions.
pub struct LineMap<'a> {
    /// Ordered vector of the position of line breaks (`\n`)
    line_offsets: Vec<usize>,
    /// The original string, needed for obtaining the column indices.
    source: &'a str,
}

impl<'a> LineMap<'a> {
    pub fn new(s: &'a str) -> Self {
        Self {
            line_offsets: s
                .char_indices()
                .filter_map(|(pos, ch)| if ch == '\n' { Some(pos) } else { None })
                .collect(),
            source: s,
        }
    }

    /// # Examples
    ///
    /// ```
    /// # use pluck_txt::score::span::{LineMap, Pos};
    /// let s = "(12)4\n  ^(34)2\naä(5)";
    /// let m = LineMap::new(s);
    /// assert_eq!(m.offset_to_pos(0), Pos { line: 1, column: 1 });
    /// assert_eq!(m.offset_to_pos(5), Pos { line: 1, column: 6 });
    /// assert_eq!(m.offset_to_pos(8), Pos { line: 2, column: 3 });
    /// assert_eq!(m.offset_to_pos(18), Pos { line: 3, column: 3 });
    /// ```
    pub fn offset_to_pos(&self, offset: usize) -> Pos {
        // Hitting a line break exactly still counts as the line it terminates.
        let line = match self.line_offsets.binary_search(&offset) {
            Ok(line) | Err(line) => line,
        };
        let line_start = self.line_start(line);
        let column = self.source[line_start..offset].chars().count() + 1;
        Pos {
            line: line + 1,
            column,
        }
    }

    /// Print the line containing the start of the span, underlining the span with `^`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use pluck_txt::score::span::{LineMap, Span};
    /// let m = LineMap::new("intro\n(12)4 (05)2\n");
    /// assert_eq!(
    ///     m.excerpt(Span { begin: 12, end: 17 }),
    ///     "   2|(12)4 (05)2\n           ^^^^^\n"
    /// );
    /// ```
    pub fn excerpt(&self, span: Span) -> String {
        let start = self.offset_to_pos(span.begin);
        let line_start = self.line_start(start.line - 1);
        let line_end = self
            .line_offsets
            .get(start.line - 1)
            .copied()
            .unwrap_or_else(|| self.source.len());
        let text = &self.source[line_start..line_end];
        let width = self.source[span.begin..span.end.min(line_end).max(span.begin)]
            .chars()
            .count()
            .max(1);
        format!(
            "{:4}|{}\n     {}{}\n",
            start.line,
            text,
            " ".repeat(start.column - 1),
            "^".repeat(width)
        )
    }

    fn line_start(&self, line: usize) -> usize {
        if line > 0 {
            self.line_offsets[line - 1] + 1
        } else {
            0
        }
    }
}
