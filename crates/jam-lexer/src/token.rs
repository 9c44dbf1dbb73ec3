//! Token types for the Jam lexer.
//!
//! Defines [`TokenKind`] covering every lexeme in Jam and [`Token`], which
//! pairs a kind with a source [`Span`].

use jam_types::ast::Prim;
use jam_types::Span;
use std::fmt;

/// Reserved words. Primitive names (`cons`, `null?`, ...) are reserved too.
pub const ALL_KEYWORDS: &[&str] = &[
    "let", "letrec", "in", "if", "then", "else", "map", "to", "ref", "true", "false", "null",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the Jam lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the Jam language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    IntLit(i64),
    True,
    False,
    Null,

    // ── Names ────────────────────────────────────────────────
    Identifier(String),
    /// A primitive function name: `cons`, `first`, `null?`, ...
    Prim(Prim),

    // ── Keywords ─────────────────────────────────────────────
    Let,
    LetRec,
    In,
    If,
    Then,
    Else,
    Map,
    To,
    Ref,

    // ── Operators ────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    Slash,
    /// `=`
    Eq,
    /// `!=`
    BangEq,
    /// `!` (dereference)
    Bang,
    /// `~` (boolean negation)
    Tilde,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `<-` (reference assignment)
    LeftArrow,
    /// `:=` (definition)
    ColonEq,

    // ── Punctuation ──────────────────────────────────────────
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,

    Eof,
}

impl TokenKind {
    /// Map a reserved word or primitive name to its token kind.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "let" => TokenKind::Let,
            "letrec" => TokenKind::LetRec,
            "in" => TokenKind::In,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "map" => TokenKind::Map,
            "to" => TokenKind::To,
            "ref" => TokenKind::Ref,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => return Prim::from_name(s).map(TokenKind::Prim),
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Let
                | TokenKind::LetRec
                | TokenKind::In
                | TokenKind::If
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::Map
                | TokenKind::To
                | TokenKind::Ref
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Prim(_)
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::IntLit(n) => return write!(f, "{n}"),
            TokenKind::Identifier(name) => return f.write_str(name),
            TokenKind::Prim(p) => return f.write_str(p.name()),
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Let => "let",
            TokenKind::LetRec => "letrec",
            TokenKind::In => "in",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::Map => "map",
            TokenKind::To => "to",
            TokenKind::Ref => "ref",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Eq => "=",
            TokenKind::BangEq => "!=",
            TokenKind::Bang => "!",
            TokenKind::Tilde => "~",
            TokenKind::Less => "<",
            TokenKind::LessEq => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEq => ">=",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::LeftArrow => "<-",
            TokenKind::ColonEq => ":=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Eof => "end of file",
        };
        f.write_str(s)
    }
}
