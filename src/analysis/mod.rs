//! Symbol index and query façade over a single document snapshot.
//!
//! An [`Analysis`] is built once per document version: it owns the text it
//! was built from, the object symbol table and a line index. Every range it
//! hands out is a byte range into that exact text, so an `Analysis` must
//! never be queried with offsets taken from a newer version.

pub mod completion;
pub mod context;
pub mod line_index;
pub mod rename;
pub mod symbols;

use std::sync::Arc;

pub use completion::{compute_completions, detect_trigger, CandidateKind, CompletionCandidate, Trigger};
pub use context::{resolve_context, BlockContext};
pub use line_index::{LineCol, LineIndex};
pub use rename::{apply_edits, compute_rename_edits, validate_name, QueryError, RenameEdit, RenameEditSet};
pub use symbols::{SymbolEntry, SymbolKind, SymbolTable};

use crate::parser::{tokenize, Token, TokenStream};

#[derive(Debug, Clone)]
pub struct Analysis {
    text: Arc<str>,
    version: i32,
    symbols: SymbolTable,
    line_index: LineIndex,
}

impl Analysis {
    pub fn new(text: impl Into<Arc<str>>, version: i32) -> Self {
        let text = text.into();
        let symbols = SymbolTable::build(tokenize(&text));
        let line_index = LineIndex::new(&text);
        tracing::debug!(version, objects = symbols.len(), "document indexed");

        Self {
            text,
            version,
            symbols,
            line_index,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn tokens(&self) -> TokenStream<'_> {
        tokenize(&self.text)
    }

    pub fn position_at(&self, offset: usize) -> LineCol {
        self.line_index.position_at(&self.text, offset)
    }

    pub fn offset_at(&self, pos: LineCol) -> usize {
        self.line_index.offset_at(&self.text, pos)
    }

    /// Identifier token under or directly adjacent to `offset`.
    pub fn word_at(&self, offset: usize) -> Option<Token<'_>> {
        self.tokens()
            .take_while(|t| t.start_offset <= offset)
            .filter(|t| t.range().touches(offset))
            .find(Token::is_identifier)
    }

    /// First object declared as `word`, if any.
    pub fn find_definition(&self, word: &str) -> Option<&SymbolEntry> {
        self.symbols.find(word)
    }

    pub fn definition_at(&self, offset: usize) -> Option<&SymbolEntry> {
        let word = self.word_at(offset)?;
        self.find_definition(word.text)
    }

    /// The identifier a rename at `offset` would act on.
    pub fn prepare_rename(&self, offset: usize) -> Option<Token<'_>> {
        self.word_at(offset)
    }

    pub fn compute_rename_edits(&self, word: &str, new_name: &str) -> Result<RenameEditSet, QueryError> {
        compute_rename_edits(self.tokens(), word, new_name)
    }

    /// Rename the identifier at `offset`. `Ok(None)` when the cursor is not
    /// on an identifier.
    pub fn rename_at(&self, offset: usize, new_name: &str) -> Result<Option<RenameEditSet>, QueryError> {
        validate_name(new_name)?;
        match self.word_at(offset) {
            Some(word) => self.compute_rename_edits(word.text, new_name).map(Some),
            None => Ok(None),
        }
    }

    pub fn resolve_context(&self, offset: usize) -> BlockContext {
        resolve_context(self.tokens(), offset)
    }

    pub fn compute_completions(&self, context: &BlockContext, trigger_prefix: &str) -> Vec<CompletionCandidate> {
        compute_completions(context, trigger_prefix, &self.symbols)
    }

    /// Completion candidates for a cursor at `offset`, using the enclosing
    /// block and the text before the cursor on the same line.
    pub fn completions_at(&self, offset: usize) -> Vec<CompletionCandidate> {
        let context = self.resolve_context(offset);
        let prefix = self.line_index.line_prefix(&self.text, offset);
        self.compute_completions(&context, prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "object User {\n prop name str\n}\n\nroute get /users {\n response 200 User\n}";

    #[test]
    fn test_single_declaration_definition_slice() {
        let analysis = Analysis::new("object name { }", 1);
        let entry = analysis.find_definition("name").unwrap();
        assert_eq!(entry.range.slice(analysis.text()), "name");
    }

    #[test]
    fn test_definition_at_reference() {
        let analysis = Analysis::new(SAMPLE, 1);
        let reference = SAMPLE.rfind("User").unwrap();
        let entry = analysis.definition_at(reference + 2).unwrap();
        assert_eq!(entry.range.start, SAMPLE.find("User").unwrap());
    }

    #[test]
    fn test_definition_not_found() {
        let analysis = Analysis::new(SAMPLE, 1);
        assert!(analysis.find_definition("Missing").is_none());
        // cursor on a keyword
        assert!(analysis.definition_at(1).is_none());
    }

    #[test]
    fn test_word_at_boundaries() {
        let analysis = Analysis::new("object User{}", 1);
        assert_eq!(analysis.word_at(7).map(|t| t.text), Some("User"));
        assert_eq!(analysis.word_at(11).map(|t| t.text), Some("User"));
        assert!(analysis.word_at(12).is_none());
    }

    #[test]
    fn test_completion_after_response_status() {
        let analysis = Analysis::new(SAMPLE, 1);
        let offset = SAMPLE.find("response 200 ").unwrap() + "response 200 ".len();
        let labels: Vec<_> = analysis
            .completions_at(offset)
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert!(labels.contains(&"User".to_string()));
        assert!(labels.contains(&"string".to_string()));
        assert!(labels.contains(&"str".to_string()));
        assert!(labels.contains(&"integer".to_string()));
    }

    #[test]
    fn test_completion_after_route_keyword() {
        let text = "object User { }\nroute ";
        let analysis = Analysis::new(text, 1);
        let labels: Vec<_> = analysis
            .completions_at(text.len())
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, vec!["get", "post", "put", "patch", "delete", "head", "options"]);
    }

    #[test]
    fn test_context_resolution_through_facade() {
        let analysis = Analysis::new(SAMPLE, 1);
        let in_object = SAMPLE.find("prop").unwrap();
        let in_route = SAMPLE.find("response").unwrap();
        assert_eq!(
            analysis.resolve_context(in_object),
            BlockContext::InsideObject("User".to_string())
        );
        assert_eq!(analysis.resolve_context(in_route), BlockContext::InsideRoute);
        assert_eq!(analysis.resolve_context(0), BlockContext::TopLevel);
    }

    #[test]
    fn test_rename_at() {
        let analysis = Analysis::new(SAMPLE, 1);
        let edits = analysis.rename_at(8, "Account").unwrap().unwrap();
        assert_eq!(edits.len(), 2);
        assert!(apply_edits(SAMPLE, &edits).contains("response 200 Account"));

        assert_eq!(analysis.rename_at(0, "Account").unwrap(), None);
        assert!(analysis.rename_at(8, "bad name").is_err());
    }

    #[test]
    fn test_unbalanced_document_is_still_queryable() {
        let text = "object User {\n prop name str\n\nroute get /users {\n response 200 ";
        let analysis = Analysis::new(text, 3);
        assert_eq!(analysis.symbols().len(), 1);
        assert_eq!(analysis.resolve_context(text.len()), BlockContext::InsideRoute);
        assert!(!analysis.completions_at(text.len()).is_empty());
    }

    #[test]
    fn test_positions_round_trip() {
        let analysis = Analysis::new(SAMPLE, 1);
        let offset = SAMPLE.find("response").unwrap();
        let pos = analysis.position_at(offset);
        assert_eq!(pos, LineCol::new(5, 1));
        assert_eq!(analysis.offset_at(pos), offset);
    }
}
