use crate::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of errors reported before fail-fast.
pub const MAX_ERRORS: usize = 20;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Scope,
    Transform,
}

/// Numeric error code (E100–E699).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNEXPECTED_CHARACTER: Self = Self(101);
    pub const INVALID_INTEGER: Self = Self(102);
    pub const CHAINED_COMPARISON: Self = Self(103);

    // ── Scope errors (E500–E599) ──
    pub const DUPLICATE_DECLARATION: Self = Self(500);
    pub const UNBOUND_VARIABLE: Self = Self(501);

    // ── Transform errors (E600–E699) ──
    pub const NON_SIMPLE_RECURSIVE_BINDING: Self = Self(600);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            500..=599 => ErrorCategory::Scope,
            600..=699 => ErrorCategory::Transform,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured static error raised before evaluation starts.
///
/// Lexer, parser, scope resolver and CPS transformer all report through this
/// type so a host can render every stage's diagnostics the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JamError {
    /// Source file name (empty for trees not built from source).
    pub file: String,
    /// Error code (e.g., E501).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Source location.
    #[serde(flatten)]
    pub span: Span,
    /// The exact source line for context.
    pub source_line: String,
    /// Optional fix suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl JamError {
    /// Create a new error with no source context.
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            file: String::new(),
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: String::new(),
            suggestion: None,
        }
    }

    /// Attach the file name and offending line from `source`.
    pub fn with_source(mut self, source: &SourceFile) -> Self {
        self.file = source.name.clone();
        self.source_line = source.line(self.span.start_line).unwrap_or("").to_string();
        self
    }

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for JamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.span, self.code, self.category, self.message
        )
    }
}

impl std::error::Error for JamError {}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Scope => write!(f, "scope"),
            Self::Transform => write!(f, "transform"),
        }
    }
}

/// The collected static errors of one pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<JamError>,
    pub total_errors: usize,
}

impl CompileErrors {
    /// Create an empty result (no errors).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Returns `true` once the error cap has been reached.
    pub fn is_full(&self) -> bool {
        self.total_errors >= MAX_ERRORS
    }

    /// Add an error, respecting the MAX_ERRORS limit.
    pub fn push_error(&mut self, error: JamError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Attach file and line context to every collected error.
    pub fn with_source(mut self, source: &SourceFile) -> Self {
        self.errors = self
            .errors
            .into_iter()
            .map(|e| e.with_source(source))
            .collect();
        self
    }

    /// Codes of the collected errors, in report order.
    pub fn codes(&self) -> Vec<ErrorCode> {
        self.errors.iter().map(|e| e.code).collect()
    }

    /// Structured JSON rendering for hosts.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

impl From<JamError> for CompileErrors {
    fn from(error: JamError) -> Self {
        let mut errors = CompileErrors::empty();
        errors.push_error(error);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_category() {
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::UNBOUND_VARIABLE.category(), ErrorCategory::Scope);
        assert_eq!(
            ErrorCode::NON_SIMPLE_RECURSIVE_BINDING.category(),
            ErrorCategory::Transform
        );
        assert_eq!(format!("{}", ErrorCode::DUPLICATE_DECLARATION), "E500");
    }

    #[test]
    fn error_with_source_context() {
        let src = SourceFile::new("prog.jam", "let x := 1;\nin y");
        let err = JamError::new(ErrorCode::UNBOUND_VARIABLE, "unbound variable 'y'", Span::new(2, 4, 2, 4))
            .with_source(&src);
        assert_eq!(err.file, "prog.jam");
        assert_eq!(err.source_line, "in y");
        assert_eq!(err.to_string(), "2:4: E501 [scope] unbound variable 'y'");
    }

    #[test]
    fn json_uses_line_and_column_names() {
        let err = JamError::new(ErrorCode::UNEXPECTED_TOKEN, "expected 'in'", Span::new(1, 2, 1, 3))
            .with_suggestion("add 'in' after the last definition");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"line\":1"));
        assert!(json.contains("\"column\":2"));
        assert!(json.contains("\"end_column\":3"));
        assert!(json.contains("\"suggestion\""));
        let back: JamError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, err.code);
    }

    #[test]
    fn compile_errors_cap() {
        let mut errs = CompileErrors::empty();
        for i in 0..25 {
            errs.push_error(JamError::new(
                ErrorCode::UNBOUND_VARIABLE,
                format!("error {i}"),
                Span::point(i + 1, 1),
            ));
        }
        assert_eq!(errs.errors.len(), MAX_ERRORS);
        assert_eq!(errs.total_errors, 25);
        assert!(errs.to_json().contains("\"total_errors\":25"));
    }
}
