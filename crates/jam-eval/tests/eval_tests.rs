//! Evaluator tests over name-addressed programs under the eager policies.

use jam_eval::{evaluate, evaluate_with, EvalConfig, EvalError, NamedValue, Policy};
use jam_lexer::Lexer;
use jam_parser::Parser;
use jam_types::ast::NamedExpr;
use jam_types::SourceFile;

fn parse(source: &str) -> NamedExpr {
    let sf = SourceFile::new("test.jam", source);
    let lex = Lexer::new(&sf).lex();
    assert!(!lex.errors.has_errors(), "lex errors: {}", lex.errors);
    let result = Parser::new(lex.tokens, &sf).parse();
    result
        .program
        .unwrap_or_else(|| panic!("parse errors:\n{}", result.errors))
}

fn eval(source: &str) -> Result<NamedValue, EvalError> {
    evaluate(&parse(source), Policy::Value, Policy::Value)
}

fn render(source: &str) -> String {
    let value = eval(source).unwrap_or_else(|e| panic!("evaluation of `{source}` failed: {e}"));
    value.render().unwrap_or_else(|e| panic!("rendering failed: {e}"))
}

fn eval_err(source: &str) -> EvalError {
    match eval(source) {
        Ok(v) => panic!("expected `{source}` to fail, got {v}"),
        Err(e) => e,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Operators
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn integer_arithmetic() {
    assert_eq!(render("1 + 2 * 3"), "7");
    assert_eq!(render("(1 + 2) * 3 - 10"), "-1");
    assert_eq!(render("7 / 2"), "3");
    assert_eq!(render("-7 / 2"), "-3");
}

#[test]
fn division_by_zero() {
    assert_eq!(eval_err("1 / 0"), EvalError::DivisionByZero);
}

#[test]
fn overflow_is_reported() {
    assert_eq!(
        eval_err("9223372036854775807 + 1"),
        EvalError::IntegerOverflow("+".into())
    );
}

#[test]
fn comparisons_and_negation() {
    assert_eq!(render("1 < 2 & ~(2 < 1)"), "true");
    assert_eq!(render("3 >= 3 & 3 <= 2"), "false");
    assert_eq!(render("1 != 2"), "true");
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(render("false & 1 / 0 = 0"), "false");
    assert_eq!(render("true | 1 / 0 = 0"), "true");
    assert_eq!(render("true & false"), "false");
}

#[test]
fn logical_operators_require_booleans() {
    assert_eq!(
        eval_err("true & 1"),
        EvalError::TypeMismatch {
            op: "&".into(),
            value: "1".into()
        }
    );
    assert!(matches!(eval_err("1 | true"), EvalError::TypeMismatch { op, .. } if op == "|"));
}

#[test]
fn arithmetic_type_errors_name_the_operator() {
    assert_eq!(
        eval_err("1 + true"),
        EvalError::TypeMismatch {
            op: "+".into(),
            value: "true".into()
        }
    );
    assert!(matches!(eval_err("-null"), EvalError::TypeMismatch { op, .. } if op == "-"));
    assert!(matches!(eval_err("~3"), EvalError::TypeMismatch { op, .. } if op == "~"));
}

#[test]
fn if_requires_boolean_test() {
    assert_eq!(
        eval_err("if 1 then 2 else 3"),
        EvalError::TypeMismatch {
            op: "if".into(),
            value: "1".into()
        }
    );
    assert_eq!(render("if 1 > 0 then 2 else 1 / 0"), "2");
}

// ══════════════════════════════════════════════════════════════════════════════
// Lists & primitives
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn lists_render_in_parentheses() {
    assert_eq!(render("cons(1, cons(2, cons(3, null)))"), "(1 2 3)");
    assert_eq!(render("null"), "()");
    assert_eq!(render("cons(cons(1, null), cons(null, null))"), "((1) ())");
}

#[test]
fn first_and_rest() {
    assert_eq!(render("first(rest(cons(1, cons(2, null))))"), "2");
    assert_eq!(render("rest(cons(1, null))"), "()");
}

#[test]
fn list_primitive_errors() {
    assert_eq!(
        eval_err("cons(1, 2)"),
        EvalError::NotAList {
            prim: "cons".into(),
            value: "2".into()
        }
    );
    assert!(matches!(eval_err("first(5)"), EvalError::NotAList { prim, .. } if prim == "first"));
    assert!(matches!(eval_err("rest(null)"), EvalError::TypeMismatch { op, .. } if op == "rest"));
}

#[test]
fn type_predicates() {
    let source = "cons?(cons(1, null)) & null?(null) & number?(3) & function?(first) \
                  & function?(map x to x) & ref?(ref 1) & list?(cons(1, null)) & ~list?(5)";
    assert_eq!(render(source), "true");
    assert_eq!(render("number?(true)"), "false");
}

#[test]
fn arity_of_functions() {
    assert_eq!(render("arity(map x, y to x)"), "2");
    assert_eq!(render("arity(map to 1)"), "0");
    assert_eq!(render("arity(cons)"), "2");
    assert_eq!(render("arity(rest)"), "1");
    assert!(matches!(eval_err("arity(5)"), EvalError::TypeMismatch { op, .. } if op == "arity"));
}

#[test]
fn primitive_arity_is_checked() {
    assert_eq!(
        eval_err("first(1, 2)"),
        EvalError::ArityMismatch {
            callee: "first".into(),
            expected: 1,
            actual: 2
        }
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions & bindings
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn closures_capture_their_environment() {
    assert_eq!(render("let f := map x to x + 1; in f(41)"), "42");
    assert_eq!(
        render("let add := map x to map y to x + y; in let inc := add(1); in inc(9)"),
        "10"
    );
    assert_eq!(render("(map to 7)()"), "7");
}

#[test]
fn recursive_functions() {
    let fact = "letrec fact := map n to if n = 0 then 1 else n * fact(n - 1); in fact(10)";
    assert_eq!(render(fact), "3628800");
    let even = "letrec even := map n to if n = 0 then true else odd(n - 1); \
                       odd := map n to if n = 0 then false else even(n - 1); \
                in even(10)";
    assert_eq!(render(even), "true");
}

#[test]
fn deep_recursion_grows_the_stack() {
    let count = "letrec count := map n to if n = 0 then 0 else 1 + count(n - 1); in count(5000)";
    assert_eq!(render(count), "5000");
}

#[test]
fn closure_arity_mismatch() {
    assert_eq!(
        eval_err("(map x to x)(1, 2)"),
        EvalError::ArityMismatch {
            callee: "map x to x".into(),
            expected: 1,
            actual: 2
        }
    );
    assert!(matches!(
        eval_err("let f := map x, y to x; in f(1)"),
        EvalError::ArityMismatch { expected: 2, actual: 1, .. }
    ));
}

#[test]
fn applying_a_non_function() {
    assert_eq!(eval_err("5(1)"), EvalError::NotAFunction("5".into()));
}

#[test]
fn unbound_variable() {
    assert_eq!(eval_err("x + 1"), EvalError::UnboundVariable("x".into()));
}

#[test]
fn let_right_hand_sides_see_the_enclosing_scope() {
    assert_eq!(render("let x := 1; in let x := x + 1; in x"), "2");
    assert_eq!(eval_err("let x := 1; y := x; in y"), EvalError::UnboundVariable("x".into()));
}

#[test]
fn letrec_reads_before_definition_are_forward_references() {
    assert_eq!(
        eval_err("letrec x := y; y := 1; in x"),
        EvalError::ForwardReference("y".into())
    );
    assert_eq!(render("letrec y := 1; x := y; in x"), "1");
}

#[test]
fn blocks_yield_their_last_value() {
    assert_eq!(render("{1; 2; 3}"), "3");
    assert_eq!(render("{1; 2;}"), "2");
}

// ══════════════════════════════════════════════════════════════════════════════
// References & equality
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn reference_cells() {
    assert_eq!(render("let r := ref 0; in {r <- !r + 1; r <- !r + 1; !r}"), "2");
    assert_eq!(render("let r := ref 1; in r <- 2"), "unit");
    assert_eq!(render("ref cons(1, null)"), "(ref (1))");
    assert!(matches!(eval_err("!5"), EvalError::TypeMismatch { op, .. } if op == "!"));
    assert!(matches!(eval_err("5 <- 1"), EvalError::TypeMismatch { op, .. } if op == "<-"));
}

#[test]
fn structural_equality_on_data() {
    assert_eq!(render("cons(1, cons(2, null)) = cons(1, cons(2, null))"), "true");
    assert_eq!(render("cons(1, null) = cons(2, null)"), "false");
    assert_eq!(render("cons(1, null) = null"), "false");
    assert_eq!(render("null = null"), "true");
    assert_eq!(render("1 = true"), "false");
    assert_eq!(render("first = first"), "true");
    assert_eq!(render("first = rest"), "false");
}

#[test]
fn identity_equality_on_refs_and_closures() {
    assert_eq!(render("ref 1 = ref 1"), "false");
    assert_eq!(render("let r := ref 1; in r = r"), "true");
    assert_eq!(render("let f := map x to x; in f = f"), "true");
    assert_eq!(render("(map x to x) = (map x to x)"), "false");
}

#[test]
fn function_values_render_opaquely() {
    assert_eq!(render("map x, y to x"), "<closure/2>");
    assert_eq!(render("first"), "first");
    assert_eq!(render("number?"), "number?");
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
    let program = parse("letrec loop := map n to loop(n + 1); in loop(0)");
    let config = EvalConfig::new(Policy::Value, Policy::Value).with_max_depth(200);
    assert_eq!(evaluate_with(&program, config).unwrap_err(), EvalError::DepthExceeded(200));
}

#[test]
fn error_messages_are_readable() {
    assert_eq!(eval_err("x").to_string(), "unbound variable 'x'");
    assert_eq!(
        eval_err("first(1, 2)").to_string(),
        "first expects 1 argument(s) but was given 2"
    );
}
