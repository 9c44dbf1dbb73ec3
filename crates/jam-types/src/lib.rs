//! Shared types for the Jam interpreter.
//!
//! This crate defines the syntax tree (in both its name-addressed and
//! lexical-address forms), source spans, and the structured static
//! diagnostics shared by every front-end and transformation stage.

mod error;
mod span;
pub mod ast;

pub use error::{CompileErrors, ErrorCategory, ErrorCode, JamError, MAX_ERRORS};
pub use span::{SourceFile, Span};
