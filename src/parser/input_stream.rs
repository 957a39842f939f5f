use std::fmt::Debug;

/// Cursor location inside an [`InputStream`].
///
/// `offset` is a byte offset into the source; `line` and `column` are
/// zero-based, with `column` counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

pub struct InputStream<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
}

impl Debug for InputStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("input", &"[..elided..]")
            .field("position", &self.position)
            .field("line", &self.line)
            .field("column", &self.column)
            .finish()
    }
}

impl<'a> InputStream<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 0,
            column: 0,
        }
    }

    /// Source text between `start` and the current position.
    pub fn slice_from(&self, start: Position) -> &'a str {
        &self.input[start.offset..self.position]
    }
}

impl Iterator for InputStream<'_> {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();

        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }

        Some(ch)
    }
}

impl InputStream<'_> {
    pub fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    pub fn save_position(&self) -> Position {
        Position {
            offset: self.position,
            line: self.line,
            column: self.column,
        }
    }

    /// Consume characters while `p` holds. Returns how many were consumed.
    ///
    /// Named apart from `Iterator::skip_while`, which would otherwise win
    /// method resolution and consume the stream by value.
    pub fn eat_while(&mut self, mut p: impl FnMut(char) -> bool) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            if !p(c) {
                break;
            }
            self.next();
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut input = InputStream::new("ab\ncd");
        input.next();
        input.next();
        assert_eq!(
            input.save_position(),
            Position { offset: 2, line: 0, column: 2 }
        );
        input.next();
        assert_eq!(
            input.save_position(),
            Position { offset: 3, line: 1, column: 0 }
        );
    }

    #[test]
    fn counts_multibyte_chars_as_one_column() {
        let mut input = InputStream::new("é{");
        assert_eq!(input.next(), Some('é'));
        let pos = input.save_position();
        assert_eq!(pos.offset, 2);
        assert_eq!(pos.column, 1);
        assert_eq!(input.peek(), Some('{'));
    }

    #[test]
    fn eat_while_stops_at_first_mismatch() {
        let mut input = InputStream::new("route get");
        let start = input.save_position();
        assert_eq!(input.eat_while(|c| c.is_alphabetic()), 5);
        assert_eq!(input.slice_from(start), "route");
        assert_eq!(input.peek(), Some(' '));
        assert_eq!(input.save_position().column, 5);
    }
}
