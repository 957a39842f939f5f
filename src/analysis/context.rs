//! Innermost structural block at a cursor offset.

use crate::parser::{Keyword, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockContext {
    TopLevel,
    InsideObject(String),
    InsideRoute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Frame {
    Object(String),
    Route,
    /// A brace with no `object`/`route` header in front of it.
    Anonymous,
}

/// Walk `tokens` up to `offset`, keeping a stack of open blocks.
///
/// Only tokens that end at or before `offset` are consumed, so a cursor
/// placed right after `{` is inside the block and a cursor right before `}`
/// is still inside it. Unmatched closing braces are ignored; unmatched
/// opening braces stay open until the end of the walk.
pub fn resolve_context<'a>(tokens: impl IntoIterator<Item = Token<'a>>, offset: usize) -> BlockContext {
    let mut stack: Vec<Frame> = Vec::new();
    let mut pending: Option<Frame> = None;
    let mut after_object_keyword = false;

    for token in tokens {
        if token.end_offset > offset {
            break;
        }
        if token.is_trivia() {
            continue;
        }

        if token.is_open_brace() {
            stack.push(pending.take().unwrap_or(Frame::Anonymous));
        } else if token.is_close_brace() {
            pending = None;
            if stack.pop().is_none() {
                tracing::trace!(offset = token.start_offset, "unmatched closing brace");
            }
        } else if let Some(kw) = token.keyword() {
            // A route header stays armed until its brace, `}` or a new
            // header, since unquoted paths such as `/users/tag` contain
            // keywords. An object header is cancelled by any keyword.
            pending = match (kw, pending.take()) {
                (Keyword::Route, _) | (_, Some(Frame::Route)) => Some(Frame::Route),
                _ => None,
            };
            after_object_keyword = kw == Keyword::Object;
            continue;
        } else if after_object_keyword && token.is_identifier() {
            pending = Some(Frame::Object(token.text.to_string()));
        }

        after_object_keyword = false;
    }

    stack
        .into_iter()
        .rev()
        .find_map(|frame| match frame {
            Frame::Object(name) => Some(BlockContext::InsideObject(name)),
            Frame::Route => Some(BlockContext::InsideRoute),
            Frame::Anonymous => None,
        })
        .unwrap_or(BlockContext::TopLevel)
}
