use std::fmt::{self, Display};
use std::str::FromStr;

use lazy_static::lazy_static;
use miette::Diagnostic;
use regex::Regex;
use serde::Serialize;

use crate::parser::{Keyword, TextRange, Token};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameEdit {
    pub range: TextRange,
    pub replacement: String,
}

/// Edits in document order. An empty set is a valid answer.
pub type RenameEditSet = Vec<RenameEdit>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The requested new name is not a usable identifier.
    InvalidName { name: String, reason: &'static str },
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidName { name, reason } => {
                write!(f, "'{}' is not a valid name: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for QueryError {}

impl Diagnostic for QueryError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self {
            QueryError::InvalidName { .. } => Some(Box::new("manyleb::rename::invalid_name")),
        }
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self {
            QueryError::InvalidName { .. } => Some(Box::new(
                "names start with a letter or '_' and continue with letters, digits or '_'",
            )),
        }
    }
}

/// Reject anything that would not tokenize back into a single identifier.
pub fn validate_name(name: &str) -> Result<(), QueryError> {
    let invalid = |reason| QueryError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if !IDENTIFIER.is_match(name) {
        return Err(invalid("name contains characters outside [A-Za-z0-9_] or starts with a digit"));
    }
    if Keyword::from_str(name).is_ok() {
        return Err(invalid("name is a reserved keyword"));
    }
    Ok(())
}

/// Rename every whole identifier token equal to `word`, declarations and
/// references alike.
pub fn compute_rename_edits<'a>(
    tokens: impl IntoIterator<Item = Token<'a>>,
    word: &str,
    new_name: &str,
) -> Result<RenameEditSet, QueryError> {
    validate_name(new_name)?;

    let edits: RenameEditSet = tokens
        .into_iter()
        .filter(|token| token.is_identifier() && token.text == word)
        .map(|token| RenameEdit {
            range: token.range(),
            replacement: new_name.to_string(),
        })
        .collect();

    tracing::debug!(word, new_name, edits = edits.len(), "rename edits computed");
    Ok(edits)
}

/// Apply non-overlapping edits to `text`.
pub fn apply_edits(text: &str, edits: &[RenameEdit]) -> String {
    let mut sorted: Vec<&RenameEdit> = edits.iter().collect();
    sorted.sort_by_key(|edit| edit.range.start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in sorted {
        out.push_str(&text[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&text[cursor..]);
    out
}
