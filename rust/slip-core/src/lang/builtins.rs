//! Built-in native functions.
//!
//! A native is a value: an atom carrying a [`NativeId`] plus an opaque
//! parameter, stored in the global frame under its Lisp name.  The
//! evaluator invokes natives through [`call_native`] with the current heap,
//! scope, and an argument list (unevaluated for special forms).

use std::str::FromStr;

use strum::EnumString;

use crate::gc::Heap;
use crate::lang::eval::{eval, eval_block, match_list, wrong_argument_type, EvalResult};
use crate::lang::load;
use crate::lang::scope::{set_scope_value, Scope};
use crate::lang::value::{
    assoc_cell, list_of_symbols_p, list_to_vec, nil_p, symbol_name, symbol_p, Atom, Value,
};

/// Names whose argument lists are passed to the callable unevaluated.
/// Must stay sorted: membership is a binary search.
const SPECIAL_FORMS: &[&str] = &[
    "begin",
    "defun",
    "lambda",
    "quasiquote",
    "quote",
    "set",
    "unquote",
    "when",
    "λ",
];

pub fn is_special_form(name: &str) -> bool {
    SPECIAL_FORMS.binary_search(&name).is_ok()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Identity of a built-in callable.  The serialized form is the Lisp name
/// the native is registered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString)]
pub enum NativeId {
    #[strum(serialize = "car")]
    Car,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "list")]
    List,
    #[strum(serialize = "assoc")]
    Assoc,
    #[strum(serialize = "append")]
    Append,
    #[strum(serialize = "equal")]
    Equal,
    #[strum(serialize = "set")]
    Set,
    #[strum(serialize = "quote")]
    Quote,
    #[strum(serialize = "quasiquote")]
    Quasiquote,
    #[strum(serialize = "unquote")]
    Unquote,
    #[strum(serialize = "begin")]
    Begin,
    #[strum(serialize = "defun")]
    Defun,
    #[strum(serialize = "when")]
    When,
    #[strum(serialize = "lambda", serialize = "λ")]
    Lambda,
    #[strum(serialize = "load")]
    Load,
    #[strum(serialize = "quit")]
    Quit,
    #[strum(serialize = "gc-inspect")]
    GcInspect,
    #[strum(serialize = "scope")]
    ScopeExpr,
    #[strum(serialize = "print")]
    Print,
}

/// Invoke a native.  `args` is a proper list, already evaluated unless the
/// native is a special form.
pub fn call_native(
    id: NativeId,
    param: Value,
    heap: &mut Heap,
    scope: &mut Scope,
    args: Value,
) -> EvalResult {
    match id {
        NativeId::Car => native_car(param, heap, scope, args),
        NativeId::GreaterThan => native_greater_than(param, heap, scope, args),
        NativeId::Add => native_add(param, heap, scope, args),
        NativeId::Mul => native_mul(param, heap, scope, args),
        NativeId::List => native_list(param, heap, scope, args),
        NativeId::Assoc => native_assoc(param, heap, scope, args),
        NativeId::Append => native_append(param, heap, scope, args),
        NativeId::Equal => native_equal(param, heap, scope, args),
        NativeId::Set => native_set(param, heap, scope, args),
        NativeId::Quote => native_quote(param, heap, scope, args),
        NativeId::Quasiquote => native_quasiquote(param, heap, scope, args),
        NativeId::Unquote => native_unquote(param, heap, scope, args),
        NativeId::Begin => native_begin(param, heap, scope, args),
        NativeId::Defun => native_defun(param, heap, scope, args),
        NativeId::When => native_when(param, heap, scope, args),
        NativeId::Lambda => native_lambda(param, heap, scope, args),
        NativeId::Load => native_load(param, heap, scope, args),
        NativeId::Quit => native_quit(param, heap, scope, args),
        NativeId::GcInspect => native_gc_inspect(param, heap, scope, args),
        NativeId::ScopeExpr => native_scope(param, heap, scope, args),
        NativeId::Print => native_print(param, heap, scope, args),
    }
}

fn register_native(heap: &mut Heap, scope: &mut Scope, name: &str) {
    let id = NativeId::from_str(name).expect("native name table out of sync");
    let sym = heap.symbol(name);
    let native = heap.native(id, Value::Void);
    set_scope_value(heap, scope, sym, native);
}

/// Install the standard library into the global frame.
pub fn install_stdlib(heap: &mut Heap, scope: &mut Scope) {
    const NAMES: &[&str] = &[
        "car",
        ">",
        "+",
        "*",
        "list",
        "assoc",
        "append",
        "equal",
        "set",
        "quote",
        "quasiquote",
        "unquote",
        "begin",
        "defun",
        "when",
        "lambda",
        "λ",
        "load",
    ];
    for name in NAMES {
        register_native(heap, scope, name);
    }

    // Self-bound constants.
    for name in ["t", "nil"] {
        let sym = heap.symbol(name);
        let value = heap.symbol(name);
        set_scope_value(heap, scope, sym, value);
    }
}

/// Install the REPL-only natives (process control and introspection).
pub fn install_repl_runtime(heap: &mut Heap, scope: &mut Scope) {
    for name in ["quit", "gc-inspect", "scope", "print"] {
        register_native(heap, scope, name);
    }
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

fn int_value(heap: &Heap, value: Value) -> Option<i64> {
    match value {
        Value::Atom(id) => match heap.atom(id) {
            Atom::Int(n) => Some(*n),
            _ => None,
        },
        _ => None,
    }
}

/// Promote to a real: reals pass through, integers widen.
fn as_real(heap: &mut Heap, value: Value) -> Result<f32, Value> {
    match value {
        Value::Atom(id) => match heap.atom(id) {
            Atom::Real(r) => return Ok(*r),
            Atom::Int(n) => return Ok(*n as f32),
            _ => {}
        },
        _ => {}
    }
    Err(wrong_argument_type(heap, "(or realp integerp)", value))
}

fn add2(heap: &mut Heap, a: Value, b: Value) -> EvalResult {
    if let (Some(x), Some(y)) = (int_value(heap, a), int_value(heap, b)) {
        return Ok(heap.integer(x.wrapping_add(y)));
    }
    let x = as_real(heap, a)?;
    let y = as_real(heap, b)?;
    Ok(heap.real(x + y))
}

fn mul2(heap: &mut Heap, a: Value, b: Value) -> EvalResult {
    if let (Some(x), Some(y)) = (int_value(heap, a), int_value(heap, b)) {
        return Ok(heap.integer(x.wrapping_mul(y)));
    }
    let x = as_real(heap, a)?;
    let y = as_real(heap, b)?;
    Ok(heap.real(x * y))
}

fn greater2(heap: &mut Heap, a: Value, b: Value) -> Result<bool, Value> {
    if let (Some(x), Some(y)) = (int_value(heap, a), int_value(heap, b)) {
        return Ok(x > y);
    }
    let x = as_real(heap, a)?;
    let y = as_real(heap, b)?;
    Ok(x > y)
}

// ---------------------------------------------------------------------------
// List construction and access
// ---------------------------------------------------------------------------

fn native_car(_param: Value, heap: &mut Heap, _scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "e", args)?;
    let xs = matched[0].value();

    if nil_p(heap, xs) {
        return Ok(xs);
    }
    match xs {
        Value::Cons(id) => Ok(heap.cons_car(id)),
        _ => Err(wrong_argument_type(heap, "consp", xs)),
    }
}

fn native_list(_param: Value, _heap: &mut Heap, _scope: &mut Scope, args: Value) -> EvalResult {
    Ok(args)
}

fn native_assoc(_param: Value, heap: &mut Heap, _scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "ee", args)?;
    let key = matched[0].value();
    let alist = matched[1].value();
    match assoc_cell(heap, key, alist) {
        Some(cell) => Ok(cell),
        None => Ok(heap.nil()),
    }
}

fn native_append(_param: Value, heap: &mut Heap, _scope: &mut Scope, args: Value) -> EvalResult {
    let Some(lists) = list_to_vec(heap, args) else {
        return Err(wrong_argument_type(heap, "listp", args));
    };
    let Some((last, heads)) = lists.split_last() else {
        return Ok(heap.nil());
    };

    let mut elements = Vec::new();
    for arg in heads {
        let Some(items) = list_to_vec(heap, *arg) else {
            return Err(wrong_argument_type(heap, "listp", *arg));
        };
        elements.extend(items);
    }

    let mut result = *last;
    for element in elements.into_iter().rev() {
        result = heap.alloc_cons(element, result);
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Arithmetic and comparison
// ---------------------------------------------------------------------------

fn native_add(_param: Value, heap: &mut Heap, _scope: &mut Scope, args: Value) -> EvalResult {
    let mut acc = heap.integer(0);
    let mut cursor = args;
    while !nil_p(heap, cursor) {
        let Value::Cons(id) = cursor else {
            return Err(wrong_argument_type(heap, "consp", cursor));
        };
        let x = heap.cons_car(id);
        acc = add2(heap, acc, x)?;
        cursor = heap.cons_cdr(id);
    }
    Ok(acc)
}

fn native_mul(_param: Value, heap: &mut Heap, _scope: &mut Scope, args: Value) -> EvalResult {
    let mut acc = heap.integer(1);
    let mut cursor = args;
    while !nil_p(heap, cursor) {
        let Value::Cons(id) = cursor else {
            return Err(wrong_argument_type(heap, "consp", cursor));
        };
        let x = heap.cons_car(id);
        acc = mul2(heap, acc, x)?;
        cursor = heap.cons_cdr(id);
    }
    Ok(acc)
}

/// Variadic `>`: `t` iff the arguments are strictly decreasing.
fn native_greater_than(
    _param: Value,
    heap: &mut Heap,
    _scope: &mut Scope,
    args: Value,
) -> EvalResult {
    let Value::Cons(id) = args else {
        return Err(wrong_argument_type(heap, "consp", args));
    };
    let mut previous = heap.cons_car(id);
    let mut cursor = heap.cons_cdr(id);

    let mut sorted = true;
    while !nil_p(heap, cursor) && sorted {
        let Value::Cons(id) = cursor else {
            return Err(wrong_argument_type(heap, "consp", cursor));
        };
        let x = heap.cons_car(id);
        cursor = heap.cons_cdr(id);
        sorted = greater2(heap, previous, x)?;
        previous = x;
    }

    Ok(heap.boolean(sorted))
}

fn native_equal(_param: Value, heap: &mut Heap, _scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "ee", args)?;
    let result = crate::lang::value::equal(heap, matched[0].value(), matched[1].value());
    Ok(heap.boolean(result))
}

// ---------------------------------------------------------------------------
// Special forms (bridged as natives; args arrive unevaluated)
// ---------------------------------------------------------------------------

fn native_quote(_param: Value, heap: &mut Heap, _scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "e", args)?;
    Ok(matched[0].value())
}

fn native_set(_param: Value, heap: &mut Heap, scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "qe", args)?;
    let name = matched[0].sym().to_owned();
    let value = eval(heap, scope, matched[1].value())?;
    let sym = heap.symbol(name);
    set_scope_value(heap, scope, sym, value);
    Ok(value)
}

fn native_begin(_param: Value, heap: &mut Heap, scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "*", args)?;
    eval_block(heap, scope, matched[0].value())
}

fn native_defun(_param: Value, heap: &mut Heap, scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "ee*", args)?;
    let name = matched[0].value();
    let params = matched[1].value();
    let body = matched[2].value();

    if !symbol_p(heap, name) {
        return Err(wrong_argument_type(heap, "symbolp", name));
    }
    if !list_of_symbols_p(heap, params) {
        return Err(wrong_argument_type(heap, "list-of-symbolsp", params));
    }

    // (defun name (p…) body…) ≡ (set name (lambda (p…) body…))
    let lambda = heap.lambda(params, body, scope.expr);
    set_scope_value(heap, scope, name, lambda);
    Ok(lambda)
}

fn native_when(_param: Value, heap: &mut Heap, scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "e*", args)?;
    let condition = matched[0].value();
    let body = matched[1].value();

    let condition = eval(heap, scope, condition)?;
    if !nil_p(heap, condition) {
        return eval_block(heap, scope, body);
    }
    Ok(heap.nil())
}

fn native_lambda(_param: Value, heap: &mut Heap, scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "e*", args)?;
    let params = matched[0].value();
    let body = matched[1].value();

    if !list_of_symbols_p(heap, params) {
        return Err(wrong_argument_type(heap, "list-of-symbolsp", params));
    }

    Ok(heap.lambda(params, body, scope.expr))
}

fn native_quasiquote(_param: Value, heap: &mut Heap, scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "e", args)?;
    quasiquote_expand(heap, scope, matched[0].value())
}

/// Quasiquote of `x`: `(unquote e)` evaluates `e`; any other cons is
/// rebuilt from the quasiquotes of its car and cdr; atoms pass through.
fn quasiquote_expand(heap: &mut Heap, scope: &mut Scope, expr: Value) -> EvalResult {
    let Value::Cons(id) = expr else {
        return Ok(expr);
    };

    // Exactly (unquote e) — anything else copies structurally.
    let head = heap.cons_car(id);
    if symbol_name(heap, head) == Some("unquote") {
        let tail = heap.cons_cdr(id);
        if let Value::Cons(tail_id) = tail {
            let target = heap.cons_car(tail_id);
            if nil_p(heap, heap.cons_cdr(tail_id)) {
                return eval(heap, scope, target);
            }
        }
    }

    let tail = heap.cons_cdr(id);
    let car = quasiquote_expand(heap, scope, head)?;
    let cdr = quasiquote_expand(heap, scope, tail)?;
    Ok(heap.alloc_cons(car, cdr))
}

fn native_unquote(_param: Value, heap: &mut Heap, _scope: &mut Scope, _args: Value) -> EvalResult {
    Err(heap.string("Using unquote outside of quasiquote."))
}

// ---------------------------------------------------------------------------
// I/O and process control
// ---------------------------------------------------------------------------

fn native_load(_param: Value, heap: &mut Heap, scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "s", args)?;
    let path = matched[0].text().to_owned();
    load::load_file(heap, scope, std::path::Path::new(&path))
}

fn native_quit(_param: Value, _heap: &mut Heap, _scope: &mut Scope, _args: Value) -> EvalResult {
    std::process::exit(0);
}

fn native_gc_inspect(
    _param: Value,
    heap: &mut Heap,
    _scope: &mut Scope,
    _args: Value,
) -> EvalResult {
    println!("{}", heap.inspect());
    Ok(heap.nil())
}

fn native_scope(_param: Value, _heap: &mut Heap, scope: &mut Scope, _args: Value) -> EvalResult {
    Ok(scope.expr)
}

fn native_print(_param: Value, heap: &mut Heap, _scope: &mut Scope, args: Value) -> EvalResult {
    let matched = match_list(heap, "s", args)?;
    println!("{}", matched[0].text());
    Ok(heap.nil())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::parser::read_expr;
    use crate::lang::print::print_value;
    use crate::lang::tokenizer::next_token;
    use crate::lang::value::{car, cdr, cons_p, equal, integer_p, lambda_p, real_p, string_p};

    fn boot() -> (Heap, Scope) {
        let mut heap = Heap::new();
        let mut scope = Scope::new(&mut heap);
        install_stdlib(&mut heap, &mut scope);
        (heap, scope)
    }

    /// Evaluate every form in `source`, returning the last result.
    fn run(heap: &mut Heap, scope: &mut Scope, source: &str) -> EvalResult {
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

    fn shows(heap: &mut Heap, scope: &mut Scope, source: &str) -> String {
        let value = run(heap, scope, source).expect("evaluation failed");
        print_value(heap, value)
    }

    fn error_of(heap: &mut Heap, scope: &mut Scope, source: &str) -> Value {
        run(heap, scope, source).expect_err("expected an error")
    }

    fn error_tag(heap: &Heap, error: Value) -> String {
        symbol_name(heap, car(heap, error)).expect("tag").to_owned()
    }

    // -- arithmetic ----------------------------------------------------------

    #[test]
    fn addition_folds_integers() {
        let (mut heap, mut scope) = boot();
        assert_eq!(shows(&mut heap, &mut scope, "(+ 1 2 3)"), "6");
        assert_eq!(shows(&mut heap, &mut scope, "(+)"), "0");
        assert_eq!(shows(&mut heap, &mut scope, "(+ -5 5)"), "0");
    }

    #[test]
    fn multiplication_folds_integers() {
        let (mut heap, mut scope) = boot();
        assert_eq!(shows(&mut heap, &mut scope, "(* 2 3 4)"), "24");
        assert_eq!(shows(&mut heap, &mut scope, "(*)"), "1");
    }

    #[test]
    fn real_operand_promotes() {
        let (mut heap, mut scope) = boot();
        let v = run(&mut heap, &mut scope, "(+ 1 1.5)").unwrap();
        assert!(real_p(&heap, v));
        assert_eq!(print_value(&heap, v), "2.5");

        let v = run(&mut heap, &mut scope, "(* 2 0.5)").unwrap();
        assert!(real_p(&heap, v));
    }

    #[test]
    fn arithmetic_rejects_non_numbers() {
        let (mut heap, mut scope) = boot();
        let err = error_of(&mut heap, &mut scope, "(+ 1 (quote a))");
        assert_eq!(error_tag(&heap, err), "wrong-argument-type");
    }

    #[test]
    fn greater_than_chains() {
        let (mut heap, mut scope) = boot();
        assert_eq!(shows(&mut heap, &mut scope, "(> 3 2 1)"), "t");
        assert_eq!(shows(&mut heap, &mut scope, "(> 3 1 2)"), "nil");
        assert_eq!(shows(&mut heap, &mut scope, "(> 1 2)"), "nil");
        assert_eq!(shows(&mut heap, &mut scope, "(> 2 1.5)"), "t");
        assert_eq!(shows(&mut heap, &mut scope, "(> 5)"), "t");
    }

    // -- lists ---------------------------------------------------------------

    #[test]
    fn list_returns_arguments() {
        let (mut heap, mut scope) = boot();
        assert_eq!(shows(&mut heap, &mut scope, "(list 1 2 3)"), "(1 2 3)");
        assert_eq!(shows(&mut heap, &mut scope, "(list)"), "nil");
    }

    #[test]
    fn car_of_list_and_nil() {
        let (mut heap, mut scope) = boot();
        assert_eq!(shows(&mut heap, &mut scope, "(car (quote (a b c)))"), "a");
        assert_eq!(shows(&mut heap, &mut scope, "(car nil)"), "nil");
        let err = error_of(&mut heap, &mut scope, "(car 5)");
        assert_eq!(error_tag(&heap, err), "wrong-argument-type");
    }

    #[test]
    fn assoc_looks_up_cells() {
        let (mut heap, mut scope) = boot();
        assert_eq!(
            shows(
                &mut heap,
                &mut scope,
                "(assoc (quote b) (quote ((a . 1) (b . 2))))"
            ),
            "(b . 2)"
        );
        assert_eq!(
            shows(&mut heap, &mut scope, "(assoc (quote z) (quote ((a . 1))))"),
            "nil"
        );
    }

    #[test]
    fn append_concatenates() {
        let (mut heap, mut scope) = boot();
        assert_eq!(
            shows(&mut heap, &mut scope, "(append (quote (1 2)) (quote (3 4)))"),
            "(1 2 3 4)"
        );
        assert_eq!(shows(&mut heap, &mut scope, "(append)"), "nil");
        assert_eq!(shows(&mut heap, &mut scope, "(append (quote (1)))"), "(1)");
        // The last argument becomes the tail.
        assert_eq!(
            shows(&mut heap, &mut scope, "(append (quote (1)) 2)"),
            "(1 . 2)"
        );
        let err = error_of(&mut heap, &mut scope, "(append 1 (quote (2)))");
        assert_eq!(error_tag(&heap, err), "wrong-argument-type");
    }

    // -- equality ------------------------------------------------------------

    #[test]
    fn equal_on_structures() {
        let (mut heap, mut scope) = boot();
        assert_eq!(
            shows(&mut heap, &mut scope, "(equal (quote (1 2)) (list 1 2))"),
            "t"
        );
        assert_eq!(shows(&mut heap, &mut scope, "(equal 1 2)"), "nil");
        assert_eq!(shows(&mut heap, &mut scope, "(equal \"a\" \"a\")"), "t");
    }

    // -- quote family --------------------------------------------------------

    #[test]
    fn quote_returns_verbatim() {
        let (mut heap, mut scope) = boot();
        assert_eq!(shows(&mut heap, &mut scope, "(quote (1 2))"), "(1 2)");
        assert_eq!(shows(&mut heap, &mut scope, "'sym"), "sym");
        assert_eq!(shows(&mut heap, &mut scope, "'(a . b)"), "(a . b)");
    }

    #[test]
    fn quasiquote_evaluates_unquotes() {
        let (mut heap, mut scope) = boot();
        assert_eq!(shows(&mut heap, &mut scope, "`(1 ,(+ 2 3) 3)"), "(1 5 3)");
        assert_eq!(shows(&mut heap, &mut scope, "`x"), "x");
        assert_eq!(
            shows(&mut heap, &mut scope, "(set y 9) `(a (b ,y))"),
            "(a (b 9))"
        );
    }

    #[test]
    fn quasiquote_without_unquote_matches_quote() {
        let (mut heap, mut scope) = boot();
        assert_eq!(
            shows(&mut heap, &mut scope, "(equal `(a (b c)) '(a (b c)))"),
            "t"
        );
    }

    #[test]
    fn unquote_outside_quasiquote_errors() {
        let (mut heap, mut scope) = boot();
        let err = error_of(&mut heap, &mut scope, ",(+ 1 2)");
        assert!(string_p(&heap, err));
        let Value::Atom(id) = err else {
            panic!("expected atom")
        };
        let Atom::Str(text) = heap.atom(id) else {
            panic!("expected string")
        };
        assert_eq!(text, "Using unquote outside of quasiquote.");
    }

    // -- set / begin / defun / when / lambda ---------------------------------

    #[test]
    fn set_binds_and_returns_value() {
        let (mut heap, mut scope) = boot();
        assert_eq!(shows(&mut heap, &mut scope, "(set x 10)"), "10");
        assert_eq!(shows(&mut heap, &mut scope, "x"), "10");
        assert_eq!(shows(&mut heap, &mut scope, "(set x 2) x"), "2");
    }

    #[test]
    fn set_requires_a_symbol_name() {
        let (mut heap, mut scope) = boot();
        let err = error_of(&mut heap, &mut scope, "(set 1 2)");
        assert_eq!(error_tag(&heap, err), "wrong-argument-type");
    }

    #[test]
    fn begin_sequences() {
        let (mut heap, mut scope) = boot();
        assert_eq!(shows(&mut heap, &mut scope, "(begin 1 2 3)"), "3");
        assert_eq!(shows(&mut heap, &mut scope, "(begin)"), "nil");
        assert_eq!(
            shows(&mut heap, &mut scope, "(begin (set a 1) (set a (+ a 1)) a)"),
            "2"
        );
    }

    #[test]
    fn when_evaluates_body_on_truth() {
        let (mut heap, mut scope) = boot();
        assert_eq!(shows(&mut heap, &mut scope, "(when t 1 2)"), "2");
        assert_eq!(shows(&mut heap, &mut scope, "(when nil 1 2)"), "nil");
        assert_eq!(shows(&mut heap, &mut scope, "(when (> 2 1) 5)"), "5");
        // Body is not evaluated when the condition is nil.
        assert_eq!(
            shows(&mut heap, &mut scope, "(set z 1) (when nil (set z 2)) z"),
            "1"
        );
    }

    #[test]
    fn lambda_creates_closures() {
        let (mut heap, mut scope) = boot();
        let v = run(&mut heap, &mut scope, "(lambda (x) x)").unwrap();
        assert!(lambda_p(&heap, v));
        assert_eq!(shows(&mut heap, &mut scope, "((lambda (x) (* x x)) 7)"), "49");
        assert_eq!(shows(&mut heap, &mut scope, "((λ (x) x) 3)"), "3");
    }

    #[test]
    fn lambda_rejects_non_symbol_params() {
        let (mut heap, mut scope) = boot();
        let err = error_of(&mut heap, &mut scope, "(lambda (1) 1)");
        assert_eq!(error_tag(&heap, err), "wrong-argument-type");
    }

    #[test]
    fn lambda_arity_is_checked() {
        let (mut heap, mut scope) = boot();
        let err = error_of(&mut heap, &mut scope, "((lambda (x) x))");
        assert_eq!(error_tag(&heap, err), "wrong-integer-of-arguments");
        assert!(integer_p(&heap, cdr(&heap, err)));
    }

    #[test]
    fn defun_defines_named_functions() {
        let (mut heap, mut scope) = boot();
        let v = run(&mut heap, &mut scope, "(defun double (x) (+ x x))").unwrap();
        assert!(lambda_p(&heap, v));
        assert_eq!(shows(&mut heap, &mut scope, "(double 21)"), "42");
    }

    #[test]
    fn defun_rejects_bad_parameter_lists() {
        let (mut heap, mut scope) = boot();
        let err = error_of(&mut heap, &mut scope, "(defun f (1) 1)");
        assert_eq!(error_tag(&heap, err), "wrong-argument-type");
    }

    #[test]
    fn closures_see_later_globals() {
        let (mut heap, mut scope) = boot();
        assert_eq!(
            shows(
                &mut heap,
                &mut scope,
                "(set x 10) (defun get-x () x) (set x 20) (get-x)"
            ),
            "20"
        );
    }

    #[test]
    fn recursive_functions_via_global_frame() {
        let (mut heap, mut scope) = boot();
        let source = "
            (set acc 1)
            (defun fact-iter (n)
              (when (> n 0)
                (begin
                  (set acc (* acc n))
                  (fact-iter (+ n -1)))))
            (fact-iter 5)
            acc";
        assert_eq!(shows(&mut heap, &mut scope, source), "120");
    }

    #[test]
    fn when_base_case_returns_nil() {
        let (mut heap, mut scope) = boot();
        assert_eq!(
            shows(
                &mut heap,
                &mut scope,
                "(defun fact (n) (when (> n 0) (* n (fact (+ n -1))))) (fact 0)"
            ),
            "nil"
        );
    }

    #[test]
    fn calling_a_number_is_expected_callable() {
        let (mut heap, mut scope) = boot();
        let err = error_of(&mut heap, &mut scope, "((+ 1 2) 3)");
        assert_eq!(error_tag(&heap, err), "expected-callable");
    }

    // -- special-form table --------------------------------------------------

    #[test]
    fn special_form_table_is_sorted() {
        let mut sorted = SPECIAL_FORMS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, SPECIAL_FORMS);
    }

    #[test]
    fn special_form_membership() {
        for name in ["set", "quote", "begin", "defun", "lambda", "λ", "when", "quasiquote"] {
            assert!(is_special_form(name), "{name} should be special");
        }
        assert!(!is_special_form("car"));
        assert!(!is_special_form("+"));
    }

    #[test]
    fn special_forms_receive_unevaluated_args() {
        let (mut heap, mut scope) = boot();
        // If quote's argument were evaluated this would be void-variable.
        assert_eq!(shows(&mut heap, &mut scope, "(quote undefined-here)"), "undefined-here");
    }

    #[test]
    fn native_names_parse_to_ids() {
        assert_eq!(NativeId::from_str("+").unwrap(), NativeId::Add);
        assert_eq!(NativeId::from_str("λ").unwrap(), NativeId::Lambda);
        assert_eq!(NativeId::from_str("lambda").unwrap(), NativeId::Lambda);
        assert_eq!(NativeId::from_str("gc-inspect").unwrap(), NativeId::GcInspect);
        assert!(NativeId::from_str("no-such-native").is_err());
    }

    // -- repl runtime --------------------------------------------------------

    #[test]
    fn scope_native_returns_the_chain() {
        let (mut heap, mut scope) = boot();
        install_repl_runtime(&mut heap, &mut scope);
        let v = run(&mut heap, &mut scope, "(scope)").unwrap();
        assert!(cons_p(&heap, v));
    }

    #[test]
    fn print_native_accepts_strings_only() {
        let (mut heap, mut scope) = boot();
        install_repl_runtime(&mut heap, &mut scope);
        let v = run(&mut heap, &mut scope, "(print \"hello\")").unwrap();
        assert!(nil_p(&heap, v));
        let err = error_of(&mut heap, &mut scope, "(print 5)");
        assert_eq!(error_tag(&heap, err), "wrong-argument-type");
    }

    #[test]
    fn gc_inspect_returns_nil() {
        let (mut heap, mut scope) = boot();
        install_repl_runtime(&mut heap, &mut scope);
        let v = run(&mut heap, &mut scope, "(gc-inspect)").unwrap();
        assert!(nil_p(&heap, v));
    }

    // -- gc interplay --------------------------------------------------------

    #[test]
    fn bindings_survive_collection() {
        let (mut heap, mut scope) = boot();
        run(&mut heap, &mut scope, "(set x 42) (defun id (v) v)").unwrap();
        heap.collect(scope.expr);
        assert_eq!(shows(&mut heap, &mut scope, "x"), "42");
        assert_eq!(shows(&mut heap, &mut scope, "(id x)"), "42");
    }

    #[test]
    fn collection_between_forms_preserves_equality() {
        let (mut heap, mut scope) = boot();
        run(&mut heap, &mut scope, "(set xs (list 1 2 3))").unwrap();
        heap.collect(scope.expr);
        assert_eq!(shows(&mut heap, &mut scope, "xs"), "(1 2 3)");
        heap.collect(scope.expr);
        let a = run(&mut heap, &mut scope, "xs").unwrap();
        let b = run(&mut heap, &mut scope, "(list 1 2 3)").unwrap();
        assert!(equal(&heap, a, b));
    }

    // -- load ----------------------------------------------------------------

    #[test]
    fn load_evaluates_a_file_in_the_current_scope() {
        let (mut heap, mut scope) = boot();
        let path = std::env::temp_dir().join(format!("slip-load-{}.slip", std::process::id()));
        std::fs::write(&path, "(set loaded-value 99)\n(+ loaded-value 1)\n").unwrap();

        let source = format!("(load \"{}\")", path.display());
        assert_eq!(shows(&mut heap, &mut scope, &source), "100");
        assert_eq!(shows(&mut heap, &mut scope, "loaded-value"), "99");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let (mut heap, mut scope) = boot();
        let err = error_of(
            &mut heap,
            &mut scope,
            "(load \"/no/such/slip/file.slip\")",
        );
        assert_eq!(error_tag(&heap, err), "read-error");
    }
}
