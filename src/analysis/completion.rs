//! Context-sensitive completion candidates.
//!
//! Candidates come in fixed tiers picked by the text before the cursor
//! (a trigger context) and, failing that, by the enclosing block:
//!
//! - after `route ` the HTTP methods, and nothing else;
//! - in a type position (`prop name `, `param id `, `query q `, `body `,
//!   `response 200 `) the built-in scalar types and every declared object;
//! - inside a route block the route-level keywords and declared objects;
//! - inside an object block `prop`, the scalar types and declared objects;
//! - at top level the top-level keywords.
//!
//! This over-suggests compared to a real grammar, which is cheap for a
//! completion list.

use itertools::Itertools;
use serde::Serialize;

use super::context::BlockContext;
use super::symbols::SymbolTable;
use crate::parser::{tokenize, Keyword, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Keyword,
    Method,
    Type,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionCandidate {
    pub label: String,
    pub kind: CandidateKind,
    pub detail: String,
}

impl CompletionCandidate {
    fn new(label: impl Into<String>, kind: CandidateKind, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: detail.into(),
        }
    }
}

pub const TOP_LEVEL_KEYWORDS: &[(&str, &str)] = &[
    ("version", "Specify API version"),
    ("title", "Specify API title"),
    ("description", "Specify API description"),
    ("object", "Define an object type"),
    ("route", "Define an API route"),
];

pub const ROUTE_KEYWORDS: &[(&str, &str)] = &[
    ("description", "Route description"),
    ("tag", "Add a tag"),
    ("body", "Request body type"),
    ("response", "Response definition"),
    ("param", "Path parameter"),
    ("query", "Query parameter"),
];

pub const OBJECT_KEYWORDS: &[(&str, &str)] = &[("prop", "Define a property")];

pub const HTTP_METHODS: &[(&str, &str)] = &[
    ("get", "HTTP GET"),
    ("post", "HTTP POST"),
    ("put", "HTTP PUT"),
    ("patch", "HTTP PATCH"),
    ("delete", "HTTP DELETE"),
    ("head", "HTTP HEAD"),
    ("options", "HTTP OPTIONS"),
];

pub const BUILTIN_TYPES: &[(&str, &str)] = &[
    ("string", "String type"),
    ("str", "String type (alias)"),
    ("integer", "Integer type"),
    ("int", "Integer type (alias)"),
    ("float", "Float type"),
    ("boolean", "Boolean type"),
    ("bool", "Boolean type (alias)"),
    ("any", "Any type"),
    ("null", "Null type"),
];

/// Keywords that are followed by a name (or status code) and then a type.
const NAMED_TYPE_KEYWORDS: &[Keyword] = &[
    Keyword::Prop,
    Keyword::Param,
    Keyword::Query,
    Keyword::Body,
    Keyword::Response,
];

/// Textual pattern at the end of the line prefix that overrides the block
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    AfterRoute,
    TypePosition,
    None,
}

/// Classify the text between the start of the line and the cursor.
///
/// Both triggers require the prefix to end in whitespace, which is what the
/// editor's space trigger character produces.
pub fn detect_trigger(line_prefix: &str) -> Trigger {
    let tokens: Vec<Token<'_>> = tokenize(line_prefix).collect();
    if !tokens.last().is_some_and(Token::is_trivia) {
        return Trigger::None;
    }

    let last_words: Vec<&Token<'_>> = tokens.iter().rev().filter(|t| !t.is_trivia()).take(2).collect();

    match last_words.as_slice() {
        [kw, ..] if kw.is_keyword(Keyword::Route) => Trigger::AfterRoute,
        [kw, ..] if kw.is_keyword(Keyword::Body) => Trigger::TypePosition,
        [name, kw, ..]
            if name.is_word() && kw.keyword().is_some_and(|k| NAMED_TYPE_KEYWORDS.contains(&k)) =>
        {
            Trigger::TypePosition
        }
        _ => Trigger::None,
    }
}

/// Candidates for `context` given the text before the cursor on its line.
pub fn compute_completions(
    context: &BlockContext,
    trigger_prefix: &str,
    symbols: &SymbolTable,
) -> Vec<CompletionCandidate> {
    let trigger = detect_trigger(trigger_prefix);
    tracing::debug!(?trigger, ?context, "computing completions");

    let mut items = Vec::new();
    match (trigger, context) {
        (Trigger::AfterRoute, _) => {
            extend(&mut items, HTTP_METHODS, CandidateKind::Method);
        }
        (Trigger::TypePosition, _) => {
            extend(&mut items, BUILTIN_TYPES, CandidateKind::Type);
            items.extend(object_candidates(symbols));
        }
        (Trigger::None, BlockContext::InsideRoute) => {
            extend(&mut items, ROUTE_KEYWORDS, CandidateKind::Keyword);
            items.extend(object_candidates(symbols));
        }
        (Trigger::None, BlockContext::InsideObject(_)) => {
            extend(&mut items, OBJECT_KEYWORDS, CandidateKind::Keyword);
            extend(&mut items, BUILTIN_TYPES, CandidateKind::Type);
            items.extend(object_candidates(symbols));
        }
        (Trigger::None, BlockContext::TopLevel) => {
            extend(&mut items, TOP_LEVEL_KEYWORDS, CandidateKind::Keyword);
        }
    }
    items
}

fn extend(items: &mut Vec<CompletionCandidate>, table: &[(&str, &str)], kind: CandidateKind) {
    items.extend(
        table
            .iter()
            .map(|(label, detail)| CompletionCandidate::new(*label, kind, *detail)),
    );
}

fn object_candidates(symbols: &SymbolTable) -> impl Iterator<Item = CompletionCandidate> + '_ {
    symbols
        .iter()
        .map(|entry| entry.name.as_str())
        .unique()
        .map(|name| CompletionCandidate::new(name, CandidateKind::Object, "User-defined type"))
}
