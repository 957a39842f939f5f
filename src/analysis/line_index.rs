/// Zero-based line and UTF-16 column, the way editors address text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct LineCol {
    pub line: u32,
    pub character: u32,
}

impl LineCol {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Byte offset <-> [`LineCol`] conversion for one text snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Position of `offset`. Offsets past the end clamp to the end of the
    /// text; offsets inside a multi-byte character snap back to its start.
    pub fn position_at(&self, text: &str, offset: usize) -> LineCol {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }

        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let character = text[line_start..offset].encode_utf16().count();

        LineCol::new(line as u32, character as u32)
    }

    /// Byte offset of `pos`. Columns past the end of a line clamp to the
    /// line end; lines past the end of the text clamp to the text end.
    pub fn offset_at(&self, text: &str, pos: LineCol) -> usize {
        let Some(&line_start) = self.line_starts.get(pos.line as usize) else {
            return text.len();
        };
        let line_end = self
            .line_starts
            .get(pos.line as usize + 1)
            .map(|&next| next - 1)
            .unwrap_or(text.len());
        let line = text[line_start..line_end].trim_end_matches('\r');

        let mut units = 0u32;
        for (i, ch) in line.char_indices() {
            if units >= pos.character {
                return line_start + i;
            }
            units += ch.len_utf16() as u32;
        }
        line_start + line.len()
    }

    /// Text of the line containing `offset`, from its start up to `offset`.
    pub fn line_prefix<'t>(&self, text: &'t str, offset: usize) -> &'t str {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        &text[self.line_starts[line]..offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_ascii() {
        let text = "object User {\n  prop name str\n}";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 3);

        let offset = text.find("prop").unwrap();
        let pos = index.position_at(text, offset);
        assert_eq!(pos, LineCol::new(1, 2));
        assert_eq!(index.offset_at(text, pos), offset);
    }

    #[test]
    fn test_utf16_columns() {
        let text = "title \"𝄞é\" x";
        let index = LineIndex::new(text);
        let x = text.find('x').unwrap();
        // the clef is two UTF-16 units, é is one
        assert_eq!(index.position_at(text, x), LineCol::new(0, 12));
        assert_eq!(index.offset_at(text, LineCol::new(0, 12)), x);
    }

    #[test]
    fn test_clamping() {
        let text = "ab\r\ncd";
        let index = LineIndex::new(text);
        assert_eq!(index.offset_at(text, LineCol::new(0, 99)), 2);
        assert_eq!(index.offset_at(text, LineCol::new(7, 0)), text.len());
        assert_eq!(index.position_at(text, 999), LineCol::new(1, 2));
    }

    #[test]
    fn test_offset_inside_multibyte_char_snaps_back() {
        let text = "é";
        let index = LineIndex::new(text);
        assert_eq!(index.position_at(text, 1), LineCol::new(0, 0));
    }

    #[test]
    fn test_line_prefix() {
        let text = "object A {\n  prop x \n}";
        let index = LineIndex::new(text);
        let cursor = text.find(" \n}").unwrap() + 1;
        assert_eq!(index.line_prefix(text, cursor), "  prop x ");
    }
}
