//! Integration tests for the Jam parser.
//!
//! Most checks compare the unparsed form, which makes grouping explicit.

use jam_lexer::Lexer;
use jam_parser::Parser;
use jam_types::ast::{ExprKind, NamedExpr, Prim};
use jam_types::{CompileErrors, ErrorCode, SourceFile};

fn parse_result(source: &str) -> Result<NamedExpr, CompileErrors> {
    let sf = SourceFile::new("test.jam", source);
    let lex = Lexer::new(&sf).lex();
    assert!(!lex.errors.has_errors(), "lex errors: {}", lex.errors);
    let result = Parser::new(lex.tokens, &sf).parse();
    result.program.ok_or(result.errors)
}

fn parse(source: &str) -> NamedExpr {
    parse_result(source).unwrap_or_else(|errs| panic!("parse errors:\n{errs}"))
}

fn unparse(source: &str) -> String {
    parse(source).to_string()
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(unparse("1 + 2 * 3 - 4"), "(1 + (2 * 3)) - 4");
    assert_eq!(unparse("(1 + 2) * 3"), "(1 + 2) * 3");
}

#[test]
fn boolean_and_comparison_precedence() {
    assert_eq!(unparse("x < 1 | y = 2 & z"), "(x < 1) | ((y = 2) & z)");
}

#[test]
fn assignment_is_right_associative_and_lowest() {
    assert_eq!(unparse("r <- !r + 1"), "r <- (!r + 1)");
}

#[test]
fn unary_binds_looser_than_application() {
    let e = parse("-f(1)");
    match &e.kind {
        ExprKind::Unary { operand, .. } => {
            assert!(matches!(operand.kind, ExprKind::App { .. }))
        }
        other => panic!("expected unary, got {other:?}"),
    }
    assert_eq!(unparse("ref ref 1"), "ref ref 1");
}

#[test]
fn curried_application() {
    assert_eq!(unparse("f(1)(2, 3)"), "f(1)(2, 3)");
    assert_eq!(unparse("g()"), "g()");
}

#[test]
fn let_with_several_definitions() {
    assert_eq!(
        unparse("let x := 1; y := 2; in if x > 0 then y else y + 2"),
        "let x := 1; y := 2; in if x > 0 then y else y + 2"
    );
}

#[test]
fn letrec_and_map() {
    let src = "letrec fact := map n to if n = 0 then 1 else n * fact(n - 1); in fact(5)";
    let e = parse(src);
    match &e.kind {
        ExprKind::LetRec { defs, .. } => {
            assert_eq!(defs.len(), 1);
            assert_eq!(defs[0].name.name, "fact");
            assert!(matches!(defs[0].value.kind, ExprKind::Map { .. }));
        }
        other => panic!("expected letrec, got {other:?}"),
    }
}

#[test]
fn nullary_map() {
    assert_eq!(unparse("map to 5"), "map to 5");
}

#[test]
fn block_with_trailing_semicolon() {
    assert_eq!(unparse("{1; 2; 3;}"), "{1; 2; 3}");
}

#[test]
fn primitive_references() {
    let e = parse("cons?(cons(1, null))");
    match &e.kind {
        ExprKind::App { func, args } => {
            assert_eq!(func.kind, ExprKind::Prim(Prim::IsCons));
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected application, got {other:?}"),
    }
}

#[test]
fn if_extends_right_inside_operator() {
    assert_eq!(
        unparse("1 + if b then 2 else 3 + 4"),
        "1 + (if b then 2 else 3 + 4)"
    );
}

#[test]
fn spans_cover_whole_expression() {
    let e = parse("let x := 1;\nin x + 1");
    assert_eq!(e.span.start_line, 1);
    assert_eq!(e.span.end_line, 2);
}

#[test]
fn chained_comparison_is_rejected() {
    let errs = parse_result("1 < 2 < 3").unwrap_err();
    assert_eq!(errs.codes(), vec![ErrorCode::CHAINED_COMPARISON]);
}

#[test]
fn reserved_word_as_binder_is_rejected() {
    let errs = parse_result("let first := 1; in first").unwrap_err();
    assert_eq!(errs.codes(), vec![ErrorCode::UNEXPECTED_TOKEN]);
    assert!(errs.errors[0].suggestion.is_some());
}

#[test]
fn missing_in_is_reported() {
    let errs = parse_result("let x := 1; 5").unwrap_err();
    assert_eq!(errs.codes(), vec![ErrorCode::UNEXPECTED_TOKEN]);
    assert!(errs.errors[0].message.contains("expected 'in'"), "{}", errs);
}

#[test]
fn trailing_tokens_are_rejected() {
    let errs = parse_result("1 2").unwrap_err();
    assert!(errs.errors[0].message.contains("end of program"));
}
