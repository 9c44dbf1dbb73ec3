//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 6. `<-` (right associative)
//! 5. `|`
//! 4. `&`
//! 3. `=`, `!=`, `<`, `<=`, `>`, `>=` (no chaining)
//! 2. `+`, `-`
//! 1. `*`, `/`
//! 0. prefix `-`, `~`, `!`, `ref`; then application `f(args)`
//!
//! `if`, `let`, `letrec` and `map` may appear wherever an operand may, and
//! extend as far to the right as possible.

use std::rc::Rc;

use jam_lexer::token::TokenKind;
use jam_types::ast::*;
use jam_types::ErrorCode;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<NamedExpr> {
        self.parse_assign()
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `AssignExpr = OrExpr [ "<-" AssignExpr ]`
    fn parse_assign(&mut self) -> Option<NamedExpr> {
        let left = self.parse_or()?;
        if self.eat(&TokenKind::LeftArrow) {
            let right = self.parse_assign()?;
            return Some(NamedExpr::binary(BinOp::Assign, left.rc(), right.rc()));
        }
        Some(left)
    }

    /// `OrExpr = AndExpr { "|" AndExpr }`
    fn parse_or(&mut self) -> Option<NamedExpr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Pipe) {
            let right = self.parse_and()?;
            left = NamedExpr::binary(BinOp::Or, left.rc(), right.rc());
        }
        Some(left)
    }

    /// `AndExpr = CompExpr { "&" CompExpr }`
    fn parse_and(&mut self) -> Option<NamedExpr> {
        let mut left = self.parse_comparison()?;
        while self.eat(&TokenKind::Amp) {
            let right = self.parse_comparison()?;
            left = NamedExpr::binary(BinOp::And, left.rc(), right.rc());
        }
        Some(left)
    }

    /// `CompExpr = AddExpr [ CompOp AddExpr ]`
    ///
    /// Comparison operators do NOT chain: `a < b < c` is a parse error.
    fn parse_comparison(&mut self) -> Option<NamedExpr> {
        let mut left = self.parse_additive()?;
        if let Some(op) = self.match_comparison_op() {
            self.advance();
            let right = self.parse_additive()?;
            left = NamedExpr::binary(op, left.rc(), right.rc());
            if self.match_comparison_op().is_some() {
                self.error_at_current_with_suggestion(
                    ErrorCode::CHAINED_COMPARISON,
                    "comparison operators cannot be chained",
                    "combine comparisons with '&': a < b & b < c",
                );
                return None;
            }
        }
        Some(left)
    }

    fn match_comparison_op(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::Eq => Some(BinOp::Eq),
            TokenKind::BangEq => Some(BinOp::NotEq),
            TokenKind::Less => Some(BinOp::Less),
            TokenKind::LessEq => Some(BinOp::LessEq),
            TokenKind::Greater => Some(BinOp::Greater),
            TokenKind::GreaterEq => Some(BinOp::GreaterEq),
            _ => None,
        }
    }

    /// `AddExpr = MulExpr { ("+" | "-") MulExpr }`
    fn parse_additive(&mut self) -> Option<NamedExpr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = NamedExpr::binary(op, left.rc(), right.rc());
        }
        Some(left)
    }

    /// `MulExpr = UnaryExpr { ("*" | "/") UnaryExpr }`
    fn parse_multiplicative(&mut self) -> Option<NamedExpr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = NamedExpr::binary(op, left.rc(), right.rc());
        }
        Some(left)
    }

    /// `UnaryExpr = ("-" | "~" | "!" | "ref") UnaryExpr | CallExpr`
    fn parse_unary(&mut self) -> Option<NamedExpr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Tilde => UnaryOp::Not,
            TokenKind::Bang => UnaryOp::Deref,
            TokenKind::Ref => UnaryOp::Ref,
            _ => return self.parse_call(),
        };
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Some(NamedExpr::new(
            ExprKind::Unary {
                op,
                operand: operand.rc(),
            },
            span,
        ))
    }

    /// `CallExpr = Primary { "(" [ Expr { "," Expr } ] ")" }`
    fn parse_call(&mut self) -> Option<NamedExpr> {
        let mut expr = self.parse_primary()?;
        while self.eat(&TokenKind::LParen) {
            let args = self.parse_comma_list(&TokenKind::RParen)?;
            let span = expr.span.merge(self.previous_span());
            expr = NamedExpr::new(
                ExprKind::App {
                    func: expr.rc(),
                    args,
                },
                span,
            );
        }
        Some(expr)
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_comma_list(&mut self, close: &TokenKind) -> Option<Vec<Rc<NamedExpr>>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Some(items);
        }
        loop {
            items.push(self.parse_expression()?.rc());
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(close)?;
            return Some(items);
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<NamedExpr> {
        let span = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::IntLit(n) => ExprKind::Int(n),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Null => ExprKind::Null,
            TokenKind::Prim(p) => ExprKind::Prim(p),
            TokenKind::Identifier(name) => ExprKind::Var(Ident::new(name, span)),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                return Some(inner);
            }
            TokenKind::LBrace => return self.parse_block(),
            TokenKind::If => return self.parse_if(),
            TokenKind::Let | TokenKind::LetRec => return self.parse_let(),
            TokenKind::Map => return self.parse_map(),
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                );
                return None;
            }
        };
        self.advance();
        Some(NamedExpr::new(kind, span))
    }

    /// `"{" Expr { ";" Expr } [";"] "}"`
    fn parse_block(&mut self) -> Option<NamedExpr> {
        let start = self.advance().span;
        let mut exprs = vec![self.parse_expression()?.rc()];
        while self.eat(&TokenKind::Semicolon) {
            if self.check_exact(&TokenKind::RBrace) {
                break;
            }
            exprs.push(self.parse_expression()?.rc());
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(NamedExpr::new(ExprKind::Block(exprs), span))
    }

    /// `"if" Expr "then" Expr "else" Expr`
    fn parse_if(&mut self) -> Option<NamedExpr> {
        let start = self.advance().span;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::Then)?;
        let then_branch = self.parse_expression()?;
        self.expect(&TokenKind::Else)?;
        let else_branch = self.parse_expression()?;
        let span = start.merge(else_branch.span);
        Some(NamedExpr::new(
            ExprKind::If {
                test: test.rc(),
                then_branch: then_branch.rc(),
                else_branch: else_branch.rc(),
            },
            span,
        ))
    }

    /// `("let" | "letrec") Def { Def } "in" Expr` where `Def = Id ":=" Expr ";"`
    fn parse_let(&mut self) -> Option<NamedExpr> {
        let keyword = self.advance();
        let mut defs = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            self.expect(&TokenKind::ColonEq)?;
            let value = self.parse_expression()?;
            self.expect(&TokenKind::Semicolon)?;
            defs.push(Def::new(name, value.rc()));
            if !matches!(self.peek_kind(), TokenKind::Identifier(_)) {
                break;
            }
        }
        self.expect(&TokenKind::In)?;
        let body = self.parse_expression()?;
        let span = keyword.span.merge(body.span);
        let kind = if keyword.kind == TokenKind::LetRec {
            ExprKind::LetRec {
                defs,
                layout: (),
                body: body.rc(),
            }
        } else {
            ExprKind::Let {
                defs,
                layout: (),
                body: body.rc(),
            }
        };
        Some(NamedExpr::new(kind, span))
    }

    /// `"map" [ Id { "," Id } ] "to" Expr`
    fn parse_map(&mut self) -> Option<NamedExpr> {
        let start = self.advance().span;
        let mut params = Vec::new();
        if !self.check_exact(&TokenKind::To) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::To)?;
        let body = self.parse_expression()?;
        let span = start.merge(body.span);
        Some(NamedExpr::new(
            ExprKind::Map {
                params: params.into(),
                layout: (),
                body: body.rc(),
            },
            span,
        ))
    }
}
