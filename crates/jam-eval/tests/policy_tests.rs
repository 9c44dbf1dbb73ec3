//! Binding and cons policy behaviour: laziness, memoization, and agreement
//! of all nine evaluators on pure programs.

use jam_eval::{evaluate_with, EvalConfig, EvalError, NamedValue, Policy};
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

fn eval(source: &str, binding: Policy, cons: Policy) -> Result<NamedValue, EvalError> {
    let config = EvalConfig::new(binding, cons).with_max_depth(500);
    evaluate_with(&parse(source), config)
}

fn render(source: &str, binding: Policy, cons: Policy) -> Result<String, EvalError> {
    eval(source, binding, cons)?.render()
}

const PURE_PROGRAMS: &[(&str, &str)] = &[
    ("1 + 2 * 3", "7"),
    (
        "letrec fact := map n to if n = 0 then 1 else n * fact(n - 1); in fact(6)",
        "720",
    ),
    (
        "letrec mapf := map f, l to if null?(l) then null else cons(f(first(l)), mapf(f, rest(l))); \
         in mapf(map x to x * x, cons(1, cons(2, cons(3, null))))",
        "(1 4 9)",
    ),
    (
        "letrec append := map a, b to if null?(a) then b else cons(first(a), append(rest(a), b)); \
         in append(cons(1, null), cons(2, cons(3, null))) = cons(1, cons(2, cons(3, null)))",
        "true",
    ),
    ("let x := 1; y := 2; in if x > 0 then y else y + 2", "2"),
    (
        "let compose := map f, g to map x to f(g(x)); in compose(map x to x + 1, map x to x * 2)(5)",
        "11",
    ),
    ("arity(map a, b, c to a)", "3"),
];

#[test]
fn all_policies_agree_on_pure_programs() {
    for &(source, expected) in PURE_PROGRAMS {
        for config in EvalConfig::all() {
            let got = render(source, config.binding, config.cons)
                .unwrap_or_else(|e| panic!("`{source}` failed under {config}: {e}"));
            assert_eq!(got, expected, "`{source}` under {config}");
        }
    }
}

#[test]
fn demanded_division_by_zero_fails_everywhere() {
    for config in EvalConfig::all() {
        assert_eq!(
            render("let x := 1 / 0; in x + 1", config.binding, config.cons),
            Err(EvalError::DivisionByZero),
            "under {config}"
        );
        assert_eq!(
            render("1 / 0", config.binding, config.cons),
            Err(EvalError::DivisionByZero)
        );
    }
}

#[test]
fn unused_arguments_are_not_evaluated_lazily() {
    let source = "(map x to 1)(1 / 0)";
    assert_eq!(render(source, Policy::Value, Policy::Value), Err(EvalError::DivisionByZero));
    assert_eq!(render(source, Policy::Name, Policy::Value).as_deref(), Ok("1"));
    assert_eq!(render(source, Policy::Need, Policy::Value).as_deref(), Ok("1"));
}

#[test]
fn by_need_evaluates_at_most_once() {
    let used_twice = "let c := ref 0; in let x := {c <- !c + 1; 5}; in {x + x; !c}";
    assert_eq!(render(used_twice, Policy::Value, Policy::Value).as_deref(), Ok("1"));
    assert_eq!(render(used_twice, Policy::Need, Policy::Value).as_deref(), Ok("1"));

    let unused = "let c := ref 0; in let x := {c <- !c + 1; 5}; in !c";
    assert_eq!(render(unused, Policy::Value, Policy::Value).as_deref(), Ok("1"));
    assert_eq!(render(unused, Policy::Need, Policy::Value).as_deref(), Ok("0"));
}

#[test]
fn by_name_reevaluates_on_every_access() {
    let source = "let r := ref 0; in r = r";
    assert_eq!(render(source, Policy::Value, Policy::Value).as_deref(), Ok("true"));
    assert_eq!(render(source, Policy::Need, Policy::Value).as_deref(), Ok("true"));
    assert_eq!(render(source, Policy::Name, Policy::Value).as_deref(), Ok("false"));

    // Each read of `r` allocates a fresh cell, so the assignment is lost.
    let lost = "let r := ref 0; in {r <- 1; !r}";
    assert_eq!(render(lost, Policy::Need, Policy::Value).as_deref(), Ok("1"));
    assert_eq!(render(lost, Policy::Name, Policy::Value).as_deref(), Ok("0"));
}

#[test]
fn cons_policy_controls_component_evaluation() {
    let source = "let c := ref 0; in let l := cons({c <- !c + 1; 1}, null); in {first(l) + first(l); !c}";
    assert_eq!(render(source, Policy::Value, Policy::Value).as_deref(), Ok("1"));
    assert_eq!(render(source, Policy::Value, Policy::Name).as_deref(), Ok("2"));
    assert_eq!(render(source, Policy::Value, Policy::Need).as_deref(), Ok("1"));
}

#[test]
fn lazy_cons_defers_head_and_tail() {
    for cons in [Policy::Name, Policy::Need] {
        assert_eq!(render("first(cons(1, 1 / 0))", Policy::Value, cons).as_deref(), Ok("1"));
        assert_eq!(
            render("rest(cons(1, 1 / 0))", Policy::Value, cons),
            Err(EvalError::DivisionByZero)
        );
    }
    assert_eq!(
        render("first(cons(1, 1 / 0))", Policy::Value, Policy::Value),
        Err(EvalError::DivisionByZero)
    );
}

#[test]
fn lazy_tails_are_checked_when_forced() {
    assert_eq!(render("first(cons(1, 2))", Policy::Value, Policy::Need).as_deref(), Ok("1"));
    assert!(matches!(
        render("rest(cons(1, 2))", Policy::Value, Policy::Need),
        Err(EvalError::NotAList { .. })
    ));
}

#[test]
fn self_referential_stream() {
    let zeroes = "letrec zeroes := cons(0, zeroes); in first(rest(zeroes))";
    for config in EvalConfig::all() {
        let result = render(zeroes, config.binding, config.cons);
        if config.cons.is_lazy() {
            assert_eq!(result.as_deref(), Ok("0"), "under {config}");
        } else {
            assert!(
                matches!(
                    result,
                    Err(EvalError::ForwardReference(_)) | Err(EvalError::DepthExceeded(_))
                ),
                "under {config}: {result:?}"
            );
        }
    }
}

#[test]
fn infinite_lists_under_lazy_cons() {
    let nats = "letrec nats := map n to cons(n, nats(n + 1)); in first(rest(rest(nats(0))))";
    for binding in Policy::ALL {
        for cons in [Policy::Name, Policy::Need] {
            assert_eq!(render(nats, binding, cons).as_deref(), Ok("2"));
        }
        assert_eq!(
            render(nats, binding, Policy::Value),
            Err(EvalError::DepthExceeded(500))
        );
    }
}

#[test]
fn self_dependent_definition() {
    let source = "letrec x := x + 1; in x";
    assert_eq!(
        render(source, Policy::Value, Policy::Value),
        Err(EvalError::ForwardReference("x".into()))
    );
    assert_eq!(
        render(source, Policy::Need, Policy::Value),
        Err(EvalError::ForwardReference("x".into()))
    );
    assert_eq!(
        render(source, Policy::Name, Policy::Value),
        Err(EvalError::DepthExceeded(500))
    );
}

#[test]
fn lazy_results_outlive_the_evaluation() {
    let value = eval(
        "let l := cons(1 + 1, cons(2 * 2, null)); in l",
        Policy::Need,
        Policy::Need,
    )
    .unwrap();
    assert_eq!(value.to_string(), "(... ...)");
    assert_eq!(value.render().unwrap(), "(2 4)");
    assert_eq!(value.to_string(), "(2 4)");
}
