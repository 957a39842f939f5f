//! Index of `object` declarations for one document version.

use crate::parser::{Keyword, TextRange, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    ObjectType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    /// Byte range of the binder, e.g. `User` in `object User {`.
    pub range: TextRange,
    pub kind: SymbolKind,
    /// From the `object` keyword through the matching `}`, or to the end of
    /// the text when the block is never closed.
    pub extent: TextRange,
}

/// Declared object types in document order.
///
/// Duplicate names are kept; lookups answer with the first declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
}

impl SymbolTable {
    /// Single pass over `tokens`, recording every
    /// `object <Identifier> {` sequence. Anything else is skipped.
    pub fn build<'a>(tokens: impl IntoIterator<Item = Token<'a>>) -> Self {
        let mut entries: Vec<SymbolEntry> = Vec::new();
        // Brace depth at which each recorded object body was opened.
        let mut open_bodies: Vec<(usize, usize)> = Vec::new();
        let mut depth = 0usize;
        let mut window: [Option<Token<'a>>; 2] = [None, None];
        let mut text_end = 0;

        for token in tokens {
            text_end = token.end_offset;
            if token.is_trivia() {
                continue;
            }

            if token.is_open_brace() {
                depth += 1;
                if let [Some(kw), Some(name)] = window {
                    if kw.is_keyword(Keyword::Object) && name.is_identifier() {
                        tracing::trace!(name = name.text, offset = name.start_offset, "object declaration");
                        open_bodies.push((entries.len(), depth));
                        entries.push(SymbolEntry {
                            name: name.text.to_string(),
                            range: name.range(),
                            kind: SymbolKind::ObjectType,
                            extent: TextRange::new(kw.start_offset, token.end_offset),
                        });
                    }
                }
            } else if token.is_close_brace() {
                if let Some(&(index, opened_at)) = open_bodies.last() {
                    if opened_at == depth {
                        entries[index].extent.end = token.end_offset;
                        open_bodies.pop();
                    }
                }
                depth = depth.saturating_sub(1);
            }

            window = [window[1], Some(token)];
        }

        for (index, _) in open_bodies {
            entries[index].extent.end = text_end;
        }

        Self { entries }
    }

    /// First declaration named `name`. Stops scanning at the first match.
    pub fn find(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SymbolEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'t> IntoIterator for &'t SymbolTable {
    type Item = &'t SymbolEntry;
    type IntoIter = std::slice::Iter<'t, SymbolEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;

    fn build(text: &str) -> SymbolTable {
        SymbolTable::build(tokenize(text))
    }

    #[test]
    fn test_declarations_in_document_order() {
        let text = "object User {\n prop name str\n}\nobject Post { prop title str }\nobject Tag{}";
        let table = build(text);
        let names: Vec<_> = table.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Post", "Tag"]);
    }

    #[test]
    fn test_binder_range_slices_to_name() {
        let text = "version \"1\"\n\nobject   Account\n{\n}";
        let table = build(text);
        let entry = table.find("Account").unwrap();
        assert_eq!(entry.range.slice(text), "Account");
        assert_eq!(entry.kind, SymbolKind::ObjectType);
    }

    #[test]
    fn test_extent_covers_whole_block() {
        let text = "object A {\n  prop b B\n}\nobject B { }";
        let table = build(text);
        let a = table.find("A").unwrap();
        assert_eq!(a.extent.slice(text), "object A {\n  prop b B\n}");
        let b = table.find("B").unwrap();
        assert_eq!(b.extent.slice(text), "object B { }");
    }

    #[test]
    fn test_unclosed_block_extends_to_end() {
        let text = "object A {\n  prop b str\n";
        let table = build(text);
        assert_eq!(table.find("A").unwrap().extent.end, text.len());
    }

    #[test]
    fn test_duplicates_are_kept_and_first_wins() {
        let text = "object A { }\nobject A { prop x int }";
        let table = build(text);
        assert_eq!(table.len(), 2);
        assert_eq!(table.find("A").unwrap().range.start, 7);
    }

    #[test]
    fn test_malformed_headers_are_skipped() {
        let text = "object { }\nobject\nroute get \"/x\" { }\nobject 12 { }\nobject B";
        assert!(build(text).is_empty());
    }

    #[test]
    fn test_keyword_named_object_is_not_indexed() {
        assert!(build("object tag { }").is_empty());
    }

    #[test]
    fn test_references_are_not_declarations() {
        let text = "route get \"/u\" {\n  response 200 User\n}";
        assert!(build(text).is_empty());
    }
}
