//! Property tests for the universal interpreter laws: reader/printer
//! round-trips, arithmetic, quote/quasiquote agreement, lambda identity,
//! environment behavior, collection safety, and the argument matcher.

use proptest::prelude::*;

use crate::gc::Heap;
use crate::lang::builtins::install_stdlib;
use crate::lang::eval::{call_lambda, eval, match_list, MatchedArg};
use crate::lang::parser::read_expr;
use crate::lang::print::print_value;
use crate::lang::scope::Scope;
use crate::lang::tokenizer::next_token;
use crate::lang::value::{equal, list_from_slice, symbol_name, Value};

fn boot() -> (Heap, Scope) {
    let mut heap = Heap::new();
    let mut scope = Scope::new(&mut heap);
    install_stdlib(&mut heap, &mut scope);
    (heap, scope)
}

fn run(heap: &mut Heap, scope: &mut Scope, source: &str) -> Result<Value, Value> {
    let mut pos = 0;
    let mut last = heap.nil();
    loop {
        let tok = next_token(source, pos);
        if tok.is_empty() {
            break;
        }
        let (expr, end) = read_expr(heap, source, pos).expect("parse failed");
        last = eval(heap, scope, expr)?;
        pos = end;
    }
    Ok(last)
}

// ---------------------------------------------------------------------------
// Value generators
// ---------------------------------------------------------------------------

/// Blueprint for a heap value, generated without a heap in hand.
#[derive(Clone, Debug)]
enum Blueprint {
    Int(i64),
    Real(f32),
    Sym(String),
    Str(String),
    List(Vec<Blueprint>, Option<Box<Blueprint>>),
}

fn leaf_strategy() -> impl Strategy<Value = Blueprint> {
    prop_oneof![
        any::<i64>().prop_map(Blueprint::Int),
        (-1.0e6f32..1.0e6f32).prop_map(Blueprint::Real),
        symbol_strategy().prop_map(Blueprint::Sym),
        "[a-zA-Z0-9 _!?.+-]{0,12}".prop_map(Blueprint::Str),
    ]
}

/// Symbol names that survive the reader unchanged: no delimiters, not
/// numeric-looking, and never the `unquote` keyword.
fn symbol_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,8}".prop_filter("unquote is a keyword", |s| s != "unquote")
}

fn blueprint_strategy() -> impl Strategy<Value = Blueprint> {
    leaf_strategy().prop_recursive(3, 24, 4, |inner| {
        (
            proptest::collection::vec(inner.clone(), 1..4),
            proptest::option::of(inner.prop_map(Box::new)),
        )
            .prop_map(|(items, tail)| Blueprint::List(items, tail))
    })
}

fn build(heap: &mut Heap, blueprint: &Blueprint) -> Value {
    match blueprint {
        Blueprint::Int(n) => heap.integer(*n),
        Blueprint::Real(r) => heap.real(*r),
        Blueprint::Sym(s) => heap.symbol(s.clone()),
        Blueprint::Str(s) => heap.string(s.clone()),
        Blueprint::List(items, tail) => {
            let mut result = match tail {
                Some(tail) => build(heap, tail),
                None => heap.nil(),
            };
            for item in items.iter().rev() {
                let element = build(heap, item);
                result = heap.alloc_cons(element, result);
            }
            result
        }
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// print → read round-trips to an `equal` value.
    #[test]
    fn print_read_round_trip(blueprint in blueprint_strategy()) {
        let mut heap = Heap::new();
        let value = build(&mut heap, &blueprint);
        let printed = print_value(&heap, value);
        let (reread, _) = read_expr(&mut heap, &printed, 0)
            .unwrap_or_else(|e| panic!("reread of {printed:?} failed: {e}"));
        prop_assert!(equal(&heap, value, reread), "round trip broke on {printed:?}");
    }

    /// `(+ a b)` and `(* a b)` agree with host arithmetic.
    #[test]
    fn integer_arithmetic(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let (mut heap, mut scope) = boot();
        let sum = run(&mut heap, &mut scope, &format!("(+ {a} {b})")).unwrap();
        prop_assert_eq!(print_value(&heap, sum), (a + b).to_string());
        let product = run(&mut heap, &mut scope, &format!("(* {a} {b})")).unwrap();
        prop_assert_eq!(print_value(&heap, product), (a * b).to_string());
    }

    /// `(> a b)` yields `t` iff `a > b`.
    #[test]
    fn greater_than_agrees(a in any::<i32>(), b in any::<i32>()) {
        let (mut heap, mut scope) = boot();
        let result = run(&mut heap, &mut scope, &format!("(> {a} {b})")).unwrap();
        let expected = if a > b { "t" } else { "nil" };
        prop_assert_eq!(symbol_name(&heap, result), Some(expected));
    }

    /// Quoting is stable, and quasiquote of an unquote-free form agrees
    /// with quote.
    #[test]
    fn quote_and_quasiquote_agree(blueprint in blueprint_strategy()) {
        let (mut heap, mut scope) = boot();
        let value = build(&mut heap, &blueprint);

        let quote_sym = heap.symbol("quote");
        let quoted = list_from_slice(&mut heap, &[quote_sym, value]);
        let quote_result = eval(&mut heap, &mut scope, quoted).unwrap();

        let qq_sym = heap.symbol("quasiquote");
        let quasiquoted = list_from_slice(&mut heap, &[qq_sym, value]);
        let qq_result = eval(&mut heap, &mut scope, quasiquoted).unwrap();

        prop_assert!(equal(&heap, quote_result, value));
        prop_assert!(equal(&heap, qq_result, quote_result));
    }

    /// The identity lambda returns a value `equal` to its argument.
    #[test]
    fn identity_lambda(blueprint in blueprint_strategy()) {
        let (mut heap, scope) = boot();
        let x = heap.symbol("x");
        let params = list_from_slice(&mut heap, &[x]);
        let body_ref = heap.symbol("x");
        let body = list_from_slice(&mut heap, &[body_ref]);
        let lam = heap.lambda(params, body, scope.expr);

        let value = build(&mut heap, &blueprint);
        let args = list_from_slice(&mut heap, &[value]);
        let result = call_lambda(&mut heap, lam, args).unwrap();
        prop_assert!(equal(&heap, result, value));
    }

    /// The last `set` wins, and closures observe post-hoc global changes.
    #[test]
    fn environment_laws(first in any::<i32>(), second in any::<i32>(), third in any::<i32>()) {
        let (mut heap, mut scope) = boot();
        let source = format!("(set a {first}) (set a {second}) a");
        let result = run(&mut heap, &mut scope, &source).unwrap();
        prop_assert_eq!(print_value(&heap, result), second.to_string());

        let source = format!("(defun g () a) (set a {third}) (g)");
        let result = run(&mut heap, &mut scope, &source).unwrap();
        prop_assert_eq!(print_value(&heap, result), third.to_string());
    }

    /// Bindings survive collection unchanged, however many forms and
    /// collections are interleaved.
    #[test]
    fn collection_preserves_bindings(values in proptest::collection::vec(any::<i32>(), 1..8)) {
        let (mut heap, mut scope) = boot();
        for (i, v) in values.iter().enumerate() {
            heap.collect(scope.expr);
            run(&mut heap, &mut scope, &format!("(set v{i} {v})")).unwrap();
        }
        heap.collect(scope.expr);
        for (i, v) in values.iter().enumerate() {
            let result = run(&mut heap, &mut scope, &format!("v{i}")).unwrap();
            prop_assert_eq!(print_value(&heap, result), v.to_string());
        }
    }

    /// Matching a list against the format derived from its element kinds
    /// succeeds with the right extractions; a longer format fails.
    #[test]
    fn matcher_agrees_with_kinds(kinds in proptest::collection::vec(0u8..5, 0..6)) {
        let mut heap = Heap::new();
        let mut format = String::new();
        let mut items = Vec::new();
        for (i, kind) in kinds.iter().copied().enumerate() {
            match kind {
                0 => {
                    format.push('d');
                    items.push(heap.integer(i as i64));
                }
                1 => {
                    format.push('f');
                    items.push(heap.real(i as f32 + 0.5));
                }
                2 => {
                    format.push('s');
                    items.push(heap.string(format!("s{i}")));
                }
                3 => {
                    format.push('q');
                    items.push(heap.symbol(format!("q{i}")));
                }
                _ => {
                    format.push('e');
                    items.push(heap.integer(-(i as i64)));
                }
            }
        }
        let args = list_from_slice(&mut heap, &items);

        let matched = match_list(&mut heap, &format, args).unwrap();
        prop_assert_eq!(matched.len(), kinds.len());
        for (i, (kind, arg)) in kinds.iter().copied().zip(matched.iter()).enumerate() {
            match (kind, arg) {
                (0, MatchedArg::Int(n)) => prop_assert_eq!(*n, i as i64),
                (1, MatchedArg::Real(_)) => {}
                (2, MatchedArg::Str(_)) => {}
                (3, MatchedArg::Sym(_)) => {}
                (4, MatchedArg::Value(_)) => {}
                other => prop_assert!(false, "unexpected extraction {other:?}"),
            }
        }

        // One extra specifier must fail with a length error.
        let too_long = format.clone() + "d";
        let err = match_list(&mut heap, &too_long, args).unwrap_err();
        let tag = symbol_name(&heap, crate::lang::value::car(&heap, err)).unwrap().to_owned();
        prop_assert_eq!(tag, "wrong-integer-of-arguments");
    }

    /// A strict specifier never accepts an argument of another kind.
    #[test]
    fn matcher_rejects_kind_mismatch(choice in 0u8..4) {
        let mut heap = Heap::new();
        // Pick an argument guaranteed not to satisfy the specifier.
        let (format, wrong) = match choice {
            0 => ("d", heap.string("no")),
            1 => ("f", heap.integer(1)),
            2 => ("s", heap.symbol("no")),
            _ => ("q", heap.string("no")),
        };
        let args = list_from_slice(&mut heap, &[wrong]);
        let err = match_list(&mut heap, format, args).unwrap_err();
        let tag = symbol_name(&heap, crate::lang::value::car(&heap, err)).unwrap().to_owned();
        prop_assert_eq!(tag, "wrong-argument-type");
    }

    /// Multiple forms per line evaluate left to right with collections in
    /// between, like the REPL drives them.
    #[test]
    fn repl_style_line_evaluation(a in 0i32..1000, b in 0i32..1000) {
        let (mut heap, mut scope) = boot();
        let line = format!("(set a {a}) (set b {b}) (+ a b)");
        let mut pos = 0;
        let mut last = None;
        loop {
            let tok = next_token(&line, pos);
            if tok.is_empty() {
                break;
            }
            heap.collect(scope.expr);
            let (expr, end) = read_expr(&mut heap, &line, pos).unwrap();
            last = Some(eval(&mut heap, &mut scope, expr).unwrap());
            pos = end;
        }
        let result = last.expect("line had forms");
        prop_assert_eq!(print_value(&heap, result), (a as i64 + b as i64).to_string());
    }
}
