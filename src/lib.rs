pub mod analysis;
pub mod config;
pub mod formatter;
pub mod lsp;
pub mod parser;

pub use analysis::Analysis;
