pub mod input_stream;
pub mod token_stream;

// Re-export commonly used items
pub use input_stream::{InputStream, Position};
pub use token_stream::{tokenize, Keyword, TextRange, Token, TokenKind, TokenStream};
