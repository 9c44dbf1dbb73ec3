//! Jam parser: converts a token stream into name-addressed syntax.

mod parse_expr;
mod parser;

pub use parser::{ParseResult, Parser};
