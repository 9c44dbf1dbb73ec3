//! Core Jam lexer: converts source text to a token stream.
//!
//! - Whitespace (including newlines) is insignificant
//! - Single-line comments (`//`) are stripped
//! - Primitive names may end in `?` (`null?`, `cons?`)
//! - Error recovery: collects up to 20 errors instead of stopping at the first

use jam_types::{CompileErrors, ErrorCode, JamError, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// The Jam lexer.
pub struct Lexer<'src> {
    /// The full source text as bytes.
    source: &'src [u8],
    /// Source file for error reporting.
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
    /// Collected errors.
    errors: CompileErrors,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    /// Errors encountered during lexing.
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();
        while !self.errors.is_full() {
            let token = self.scan();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }
        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let err = JamError::new(code, message, span).with_source(self.source_file);
        self.errors.push_error(err);
    }

    /// Skip whitespace and `//` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token.
    fn scan(&mut self) -> Token {
        loop {
            self.skip_trivia();
            let start = self.pos;
            let start_line = self.line;
            let start_col = self.col;
            let Some(ch) = self.advance() else {
                return Token::new(TokenKind::Eof, self.current_span());
            };

            let kind = match ch {
                b'0'..=b'9' => self.scan_int(start),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_word(start),
                b'+' => TokenKind::Plus,
                b'-' => TokenKind::Minus,
                b'*' => TokenKind::Star,
                b'/' => TokenKind::Slash,
                b'=' => TokenKind::Eq,
                b'~' => TokenKind::Tilde,
                b'&' => TokenKind::Amp,
                b'|' => TokenKind::Pipe,
                b'(' => TokenKind::LParen,
                b')' => TokenKind::RParen,
                b'{' => TokenKind::LBrace,
                b'}' => TokenKind::RBrace,
                b',' => TokenKind::Comma,
                b';' => TokenKind::Semicolon,
                b'!' => self.pick(b'=', TokenKind::BangEq, TokenKind::Bang),
                b'>' => self.pick(b'=', TokenKind::GreaterEq, TokenKind::Greater),
                b'<' => match self.peek() {
                    Some(b'=') => {
                        self.advance();
                        TokenKind::LessEq
                    }
                    Some(b'-') => {
                        self.advance();
                        TokenKind::LeftArrow
                    }
                    _ => TokenKind::Less,
                },
                b':' if self.peek() == Some(b'=') => {
                    self.advance();
                    TokenKind::ColonEq
                }
                _ => {
                    let span = self.span_from(start_line, start_col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        format!("unexpected character '{}'", ch as char),
                        span,
                    );
                    // Error recovery: skip the character and try again
                    continue;
                }
            };
            return Token::new(kind, self.span_from(start_line, start_col));
        }
    }

    /// Consume `next` if present and return `matched`, else `single`.
    fn pick(&mut self, next: u8, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek() == Some(next) {
            self.advance();
            matched
        } else {
            single
        }
    }

    fn text_from(&self, start: usize) -> &'src str {
        std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("")
    }

    fn scan_int(&mut self, start: usize) -> TokenKind {
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }
        let text = self.text_from(start);
        match text.parse::<i64>() {
            Ok(n) => TokenKind::IntLit(n),
            Err(_) => {
                let span = Span::new(self.line, self.col - text.len() as u32, self.line, self.col - 1);
                self.emit_error(
                    ErrorCode::INVALID_INTEGER,
                    format!("integer literal '{text}' does not fit in 64 bits"),
                    span,
                );
                TokenKind::IntLit(0)
            }
        }
    }

    fn scan_word(&mut self, start: usize) -> TokenKind {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        // `null?`, `cons?` ... are single tokens; `x?` is not.
        if self.peek() == Some(b'?') {
            let candidate = format!("{}?", self.text_from(start));
            if let Some(kind) = TokenKind::from_keyword(&candidate) {
                self.advance();
                return kind;
            }
        }
        let text = self.text_from(start);
        TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()))
    }
}
