//! Syntax tree for the Jam language.
//!
//! Every node carries a [`Span`] for error reporting. Children are held in
//! [`Rc`] so that closures and suspensions can share subtrees of the program
//! they were created from.
//!
//! The tree is generic over its [`Variable`] form. The parser produces
//! [`NamedExpr`] (variables are identifiers); the scope resolver produces
//! [`ResolvedExpr`] (variables are `(depth, offset)` lexical addresses). The two
//! forms share every other node kind.

use std::fmt;
use std::rc::Rc;

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Variable forms
// ══════════════════════════════════════════════════════════════════════════════

/// How a tree refers to its variables.
pub trait Variable: Clone + fmt::Debug + fmt::Display + PartialEq + 'static {
    /// Per-binding-form metadata carried by `map`, `let` and `letrec` nodes.
    type Layout: Clone + fmt::Debug + PartialEq;
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// An identifier with no source location.
    pub fn synthetic(name: impl Into<String>) -> Self {
        Self::new(name, Span::default())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Variable for Ident {
    type Layout = ();
}

/// A static lexical address.
///
/// `depth` counts binding forms outward from the innermost enclosing one
/// (0 = innermost); `offset` indexes the variable within that form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub depth: usize,
    pub offset: usize,
}

impl Address {
    pub fn new(depth: usize, offset: usize) -> Self {
        Self { depth, offset }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.depth, self.offset)
    }
}

/// Frame shape of one resolved binding form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameLayout {
    /// Number of slots the form's frame holds.
    pub slots: usize,
}

impl Variable for Address {
    type Layout = FrameLayout;
}

/// Name-addressed syntax, as produced by the parser.
pub type NamedExpr = Expr<Ident>;

/// Lexical-address syntax, as produced by the scope resolver.
pub type ResolvedExpr = Expr<Address>;

// ══════════════════════════════════════════════════════════════════════════════
// Operators & primitives
// ══════════════════════════════════════════════════════════════════════════════

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-e`
    Neg,
    /// `~e`
    Not,
    /// `!e` reads a reference cell.
    Deref,
    /// `ref e` allocates a reference cell.
    Ref,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "~",
            Self::Deref => "!",
            Self::Ref => "ref",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    /// `&`: short-circuit conjunction.
    And,
    /// `|`: short-circuit disjunction.
    Or,
    /// `r <- v`: reference-cell assignment.
    Assign,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::And => "&",
            Self::Or => "|",
            Self::Assign => "<-",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Built-in primitive functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    IsNumber,
    IsFunction,
    IsList,
    IsNull,
    IsCons,
    IsRef,
    Arity,
    Cons,
    First,
    Rest,
}

impl Prim {
    /// Every primitive, in tag order.
    pub const ALL: [Prim; 10] = [
        Prim::IsNumber,
        Prim::IsFunction,
        Prim::IsList,
        Prim::IsNull,
        Prim::IsCons,
        Prim::IsRef,
        Prim::Arity,
        Prim::Cons,
        Prim::First,
        Prim::Rest,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::IsNumber => "number?",
            Self::IsFunction => "function?",
            Self::IsList => "list?",
            Self::IsNull => "null?",
            Self::IsCons => "cons?",
            Self::IsRef => "ref?",
            Self::Arity => "arity",
            Self::Cons => "cons",
            Self::First => "first",
            Self::Rest => "rest",
        }
    }

    /// Number of arguments the primitive takes.
    pub fn arity(self) -> usize {
        match self {
            Self::Cons => 2,
            _ => 1,
        }
    }

    pub fn from_name(name: &str) -> Option<Prim> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Position of the primitive in [`Prim::ALL`].
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr<V: Variable> {
    pub kind: ExprKind<V>,
    pub span: Span,
}

/// A `name := value;` definition inside `let` / `letrec`.
#[derive(Debug, Clone, PartialEq)]
pub struct Def<V: Variable> {
    pub name: Ident,
    pub value: Rc<Expr<V>>,
}

impl<V: Variable> Def<V> {
    pub fn new(name: Ident, value: Rc<Expr<V>>) -> Self {
        Self { name, value }
    }
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind<V: Variable> {
    Int(i64),
    Bool(bool),
    /// The empty list.
    Null,
    Var(V),
    Prim(Prim),
    Unary {
        op: UnaryOp,
        operand: Rc<Expr<V>>,
    },
    Binary {
        op: BinOp,
        left: Rc<Expr<V>>,
        right: Rc<Expr<V>>,
    },
    /// `func(args...)`
    App {
        func: Rc<Expr<V>>,
        args: Vec<Rc<Expr<V>>>,
    },
    /// `map params to body`
    Map {
        params: Rc<[Ident]>,
        layout: V::Layout,
        body: Rc<Expr<V>>,
    },
    If {
        test: Rc<Expr<V>>,
        then_branch: Rc<Expr<V>>,
        else_branch: Rc<Expr<V>>,
    },
    /// `let defs in body`: right-hand sides see only the enclosing scope.
    Let {
        defs: Vec<Def<V>>,
        layout: V::Layout,
        body: Rc<Expr<V>>,
    },
    /// `letrec defs in body`: right-hand sides see every definition.
    LetRec {
        defs: Vec<Def<V>>,
        layout: V::Layout,
        body: Rc<Expr<V>>,
    },
    /// `{ e1; e2; ... }`
    Block(Vec<Rc<Expr<V>>>),
}

impl<V: Variable> Expr<V> {
    pub fn new(kind: ExprKind<V>, span: Span) -> Self {
        Self { kind, span }
    }

    /// Wrap in an [`Rc`], for use as a child node.
    pub fn rc(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn int(n: i64) -> Self {
        Self::new(ExprKind::Int(n), Span::default())
    }

    pub fn bool(b: bool) -> Self {
        Self::new(ExprKind::Bool(b), Span::default())
    }

    pub fn null() -> Self {
        Self::new(ExprKind::Null, Span::default())
    }

    pub fn var(var: V) -> Self {
        Self::new(ExprKind::Var(var), Span::default())
    }

    pub fn prim(prim: Prim) -> Self {
        Self::new(ExprKind::Prim(prim), Span::default())
    }

    pub fn unary(op: UnaryOp, operand: Rc<Self>) -> Self {
        let span = operand.span;
        Self::new(ExprKind::Unary { op, operand }, span)
    }

    pub fn binary(op: BinOp, left: Rc<Self>, right: Rc<Self>) -> Self {
        let span = left.span.merge(right.span);
        Self::new(ExprKind::Binary { op, left, right }, span)
    }

    pub fn app(func: Rc<Self>, args: Vec<Rc<Self>>) -> Self {
        let span = func.span;
        Self::new(ExprKind::App { func, args }, span)
    }

    pub fn if_(test: Rc<Self>, then_branch: Rc<Self>, else_branch: Rc<Self>) -> Self {
        let span = test.span;
        Self::new(
            ExprKind::If {
                test,
                then_branch,
                else_branch,
            },
            span,
        )
    }

    pub fn block(exprs: Vec<Rc<Self>>) -> Self {
        Self::new(ExprKind::Block(exprs), Span::default())
    }

    /// Returns `true` for leaf nodes that never need parentheses.
    pub fn is_atom(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Int(_)
                | ExprKind::Bool(_)
                | ExprKind::Null
                | ExprKind::Var(_)
                | ExprKind::Prim(_)
                | ExprKind::App { .. }
                | ExprKind::Block(_)
        )
    }
}

impl Expr<Ident> {
    pub fn map(params: Vec<Ident>, body: Rc<Self>) -> Self {
        let span = body.span;
        Self::new(
            ExprKind::Map {
                params: params.into(),
                layout: (),
                body,
            },
            span,
        )
    }

    pub fn let_(defs: Vec<Def<Ident>>, body: Rc<Self>) -> Self {
        let span = body.span;
        Self::new(
            ExprKind::Let {
                defs,
                layout: (),
                body,
            },
            span,
        )
    }

    pub fn letrec(defs: Vec<Def<Ident>>, body: Rc<Self>) -> Self {
        let span = body.span;
        Self::new(
            ExprKind::LetRec {
                defs,
                layout: (),
                body,
            },
            span,
        )
    }

    /// A reference to the named variable.
    pub fn name(name: impl Into<String>) -> Self {
        Self::var(Ident::synthetic(name))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Unparsing
// ══════════════════════════════════════════════════════════════════════════════

/// Prints `expr`, parenthesized unless it is an atom.
struct Operand<'a, V: Variable>(&'a Expr<V>);

impl<V: Variable> fmt::Display for Operand<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_atom() || matches!(self.0.kind, ExprKind::Unary { .. }) {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

fn write_defs<V: Variable>(f: &mut fmt::Formatter<'_>, defs: &[Def<V>]) -> fmt::Result {
    for def in defs {
        write!(f, "{} := {}; ", def.name, def.value)?;
    }
    Ok(())
}

impl<V: Variable> fmt::Display for Expr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Int(n) if *n < 0 => write!(f, "({n})"),
            ExprKind::Int(n) => write!(f, "{n}"),
            ExprKind::Bool(b) => write!(f, "{b}"),
            ExprKind::Null => f.write_str("null"),
            ExprKind::Var(v) => write!(f, "{v}"),
            ExprKind::Prim(p) => write!(f, "{p}"),
            ExprKind::Unary { op: UnaryOp::Ref, operand } => {
                write!(f, "ref {}", Operand(operand))
            }
            ExprKind::Unary { op, operand } => write!(f, "{op}{}", Operand(operand)),
            ExprKind::Binary { op, left, right } => {
                write!(f, "{} {op} {}", Operand(left), Operand(right))
            }
            ExprKind::App { func, args } => {
                write!(f, "{}(", Operand(func))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            ExprKind::Map { params, body, .. } => {
                f.write_str("map ")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                if !params.is_empty() {
                    f.write_str(" ")?;
                }
                write!(f, "to {body}")
            }
            ExprKind::If {
                test,
                then_branch,
                else_branch,
            } => write!(f, "if {test} then {then_branch} else {else_branch}"),
            ExprKind::Let { defs, body, .. } => {
                f.write_str("let ")?;
                write_defs(f, defs)?;
                write!(f, "in {body}")
            }
            ExprKind::LetRec { defs, body, .. } => {
                f.write_str("letrec ")?;
                write_defs(f, defs)?;
                write!(f, "in {body}")
            }
            ExprKind::Block(exprs) => {
                f.write_str("{")?;
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prim_names_round_trip() {
        for prim in Prim::ALL {
            assert_eq!(Prim::from_name(prim.name()), Some(prim));
        }
        assert_eq!(Prim::Cons.arity(), 2);
        assert_eq!(Prim::First.index(), 8);
    }

    #[test]
    fn unparse_nested_forms() {
        let body = NamedExpr::binary(
            BinOp::Mul,
            NamedExpr::binary(BinOp::Add, NamedExpr::name("x").rc(), NamedExpr::int(1).rc()).rc(),
            NamedExpr::app(NamedExpr::prim(Prim::First).rc(), vec![NamedExpr::name("l").rc()]).rc(),
        );
        let f = NamedExpr::map(vec![Ident::synthetic("x"), Ident::synthetic("l")], body.rc());
        assert_eq!(f.to_string(), "map x, l to (x + 1) * first(l)");
    }

    #[test]
    fn unparse_addressed_variables() {
        let e = ResolvedExpr::unary(UnaryOp::Ref, ResolvedExpr::var(Address::new(1, 2)).rc());
        assert_eq!(e.to_string(), "ref [1,2]");
    }
}
