use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

use crate::parser::input_stream::InputStream;

/// Reserved words of the manyleb language.
///
/// Classification is purely lexical: a user identifier spelled like one of
/// these is always read as the keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    Version,
    Title,
    Description,
    Object,
    Route,
    Prop,
    Body,
    Response,
    Param,
    Query,
    Tag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier,
    Number,
    String,
    Brace,
    Punctuation,
    Whitespace,
}

/// Half-open byte range into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// True when `offset` lies inside the range or on either boundary.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn slice<'t>(&self, text: &'t str) -> &'t str {
        &text[self.start..self.end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start_offset: usize,
    pub end_offset: usize,
    pub line: usize,
    pub column: usize,
}

impl<'a> Token<'a> {
    pub fn range(&self) -> TextRange {
        TextRange::new(self.start_offset, self.end_offset)
    }

    pub fn is_trivia(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(kw) => Some(kw),
            _ => None,
        }
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// Identifier, keyword or number: anything that reads as a single word.
    pub fn is_word(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier | TokenKind::Keyword(_) | TokenKind::Number
        )
    }

    pub fn is_open_brace(&self) -> bool {
        self.kind == TokenKind::Brace && self.text == "{"
    }

    pub fn is_close_brace(&self) -> bool {
        self.kind == TokenKind::Brace && self.text == "}"
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Keyword(k) => write!(f, "keyword '{}'", k),
            TokenKind::Identifier => write!(f, "identifier '{}'", self.text),
            TokenKind::Number => write!(f, "number {}", self.text),
            TokenKind::String => write!(f, "string {}", self.text),
            TokenKind::Brace | TokenKind::Punctuation => write!(f, "'{}'", self.text),
            TokenKind::Whitespace => write!(f, "whitespace"),
        }
    }
}

/// Lazy tokenizer over a document snapshot.
///
/// Never fails: characters outside the language become single-character
/// punctuation tokens. Whitespace is kept so columns and trigger contexts
/// can be recovered; most consumers skip it with [`Token::is_trivia`].
pub struct TokenStream<'a> {
    pub(crate) input: InputStream<'a>,
}

impl<'a> TokenStream<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            input: InputStream::new(source),
        }
    }

    pub fn is_ident_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    pub fn is_ident_body(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    pub fn classify_word(word: &str) -> TokenKind {
        match Keyword::from_str(word) {
            Ok(kw) => TokenKind::Keyword(kw),
            Err(_) => TokenKind::Identifier,
        }
    }

    // An unterminated literal stops at the end of its line so a half-typed
    // string cannot swallow the rest of the document.
    fn read_string(&mut self) {
        while let Some(c) = self.input.peek() {
            match c {
                '\n' => break,
                '"' => {
                    self.input.next();
                    break;
                }
                '\\' => {
                    self.input.next();
                    if self.input.peek().is_some_and(|c| c != '\n') {
                        self.input.next();
                    }
                }
                _ => {
                    self.input.next();
                }
            }
        }
    }
}

impl<'a> Iterator for TokenStream<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.input.save_position();
        let c = self.input.next()?;

        let kind = match c {
            c if c.is_whitespace() => {
                self.input.eat_while(char::is_whitespace);
                TokenKind::Whitespace
            }
            '{' | '}' => TokenKind::Brace,
            '"' => {
                self.read_string();
                TokenKind::String
            }
            c if c.is_ascii_digit() => {
                self.input.eat_while(|c| c.is_ascii_digit());
                TokenKind::Number
            }
            c if Self::is_ident_start(c) => {
                self.input.eat_while(Self::is_ident_body);
                Self::classify_word(self.input.slice_from(start))
            }
            _ => TokenKind::Punctuation,
        };

        let end = self.input.save_position();
        Some(Token {
            kind,
            text: self.input.slice_from(start),
            start_offset: start.offset,
            end_offset: end.offset,
            line: start.line,
            column: start.column,
        })
    }
}

impl std::iter::FusedIterator for TokenStream<'_> {}

/// Tokenize a document snapshot.
pub fn tokenize(source: &str) -> TokenStream<'_> {
    TokenStream::new(source)
}
