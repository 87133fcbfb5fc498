//! Evaluator — atom evaluation, application, and the argument matcher.
//!
//! Every evaluation returns `Result<Value, Value>`: errors are themselves
//! heap values (usually `(symbol . detail)` pairs) so handlers can inspect
//! them structurally.  An error unwinds the current form immediately; no
//! partial side effects are rolled back.

use crate::gc::Heap;
use crate::lang::builtins::{call_native, is_special_form};
use crate::lang::scope::{get_scope_value, push_scope_frame, Scope};
use crate::lang::value::{
    cdr, list_from_slice, list_length, list_p, nil_p, symbol_name, Atom, Value,
};

pub type EvalResult = Result<Value, Value>;

// ---------------------------------------------------------------------------
// Error values
// ---------------------------------------------------------------------------

/// `(wrong-argument-type <kind> <obj>)`
pub fn wrong_argument_type(heap: &mut Heap, kind: &str, obj: Value) -> Value {
    let tag = heap.symbol("wrong-argument-type");
    let kind = heap.symbol(kind);
    list_from_slice(heap, &[tag, kind, obj])
}

/// `(wrong-integer-of-arguments . <count>)`
pub fn wrong_integer_of_arguments(heap: &mut Heap, count: i64) -> Value {
    let tag = heap.symbol("wrong-integer-of-arguments");
    let count = heap.integer(count);
    heap.alloc_cons(tag, count)
}

/// `(void-variable . <sym>)`
pub fn void_variable(heap: &mut Heap, name: Value) -> Value {
    let tag = heap.symbol("void-variable");
    heap.alloc_cons(tag, name)
}

/// `(expected-callable . <obj>)`
pub fn expected_callable(heap: &mut Heap, obj: Value) -> Value {
    let tag = heap.symbol("expected-callable");
    heap.alloc_cons(tag, obj)
}

/// `(expected-list . <obj>)`
pub fn expected_list(heap: &mut Heap, obj: Value) -> Value {
    let tag = heap.symbol("expected-list");
    heap.alloc_cons(tag, obj)
}

/// `(unexpected-expression . <obj>)`
pub fn unexpected_expression(heap: &mut Heap, obj: Value) -> Value {
    let tag = heap.symbol("unexpected-expression");
    heap.alloc_cons(tag, obj)
}

/// `(read-error <message> <position>)`
pub fn read_error(heap: &mut Heap, message: &str, position: i64) -> Value {
    let tag = heap.symbol("read-error");
    let message = heap.string(message);
    let position = heap.integer(position);
    list_from_slice(heap, &[tag, message, position])
}

// ---------------------------------------------------------------------------
// Core evaluation
// ---------------------------------------------------------------------------

/// Evaluate an expression in the given scope.
pub fn eval(heap: &mut Heap, scope: &mut Scope, expr: Value) -> EvalResult {
    match expr {
        Value::Atom(_) => eval_atom(heap, scope, expr),
        Value::Cons(id) => {
            let callable = heap.cons_car(id);
            let args = heap.cons_cdr(id);
            eval_funcall(heap, scope, callable, args)
        }
        Value::Void => Err(unexpected_expression(heap, expr)),
    }
}

/// Integers, reals, strings, lambdas, and natives self-evaluate; symbols
/// are looked up in the scope.
fn eval_atom(heap: &mut Heap, scope: &mut Scope, expr: Value) -> EvalResult {
    let Value::Atom(id) = expr else {
        unreachable!("eval_atom on non-atom");
    };
    if !matches!(heap.atom(id), Atom::Symbol(_)) {
        return Ok(expr);
    }

    let cell = get_scope_value(heap, scope, expr);
    if nil_p(heap, cell) {
        return Err(void_variable(heap, expr));
    }
    Ok(cdr(heap, cell))
}

/// Evaluate each element of an argument list, strictly left to right,
/// stopping at the first error.
fn eval_all_args(heap: &mut Heap, scope: &mut Scope, args: Value) -> EvalResult {
    match args {
        Value::Atom(_) => eval_atom(heap, scope, args),
        Value::Cons(id) => {
            let head = heap.cons_car(id);
            let tail = heap.cons_cdr(id);
            let head = eval(heap, scope, head)?;
            let tail = eval_all_args(heap, scope, tail)?;
            Ok(heap.alloc_cons(head, tail))
        }
        Value::Void => Err(unexpected_expression(heap, args)),
    }
}

/// Evaluate a compound form `(head . args)`.
///
/// The head is evaluated first.  When the head is a symbol naming a
/// special form, the arguments are passed unevaluated; otherwise each is
/// evaluated in order.  Natives and lambdas dispatch; anything else is
/// `(expected-callable . head)`.
fn eval_funcall(heap: &mut Heap, scope: &mut Scope, callable_expr: Value, args_expr: Value) -> EvalResult {
    let callable = eval(heap, scope, callable_expr)?;

    let special = symbol_name(heap, callable_expr).is_some_and(is_special_form);
    let args = if special {
        args_expr
    } else {
        eval_all_args(heap, scope, args_expr)?
    };

    if let Value::Atom(id) = callable {
        if let Atom::Native(native_id, param) = heap.atom(id) {
            let (native_id, param) = (*native_id, *param);
            return call_native(native_id, param, heap, scope, args);
        }
    }

    call_lambda(heap, callable, args)
}

/// Apply a lambda: arity check, fresh frame over the captured environment,
/// then the body as an implicit block.
pub fn call_lambda(heap: &mut Heap, lambda: Value, args: Value) -> EvalResult {
    let data = match lambda {
        Value::Atom(id) => match heap.atom(id) {
            Atom::Lambda(data) => Some(*data),
            _ => None,
        },
        _ => None,
    };
    let Some(data) = data else {
        return Err(expected_callable(heap, lambda));
    };

    if !list_p(heap, args) {
        return Err(expected_list(heap, args));
    }

    let given = list_length(heap, args);
    if given != list_length(heap, data.params) {
        return Err(wrong_integer_of_arguments(heap, given));
    }

    let mut scope = Scope::from_expr(data.env);
    push_scope_frame(heap, &mut scope, data.params, args);

    let mut result = heap.nil();
    let mut body = data.body;
    while let Value::Cons(id) = body {
        let form = heap.cons_car(id);
        result = eval(heap, &mut scope, form)?;
        body = heap.cons_cdr(id);
    }
    Ok(result)
}

/// Evaluate each expression of a block in order; the block's value is the
/// value of the last expression (`nil` for an empty block).
pub fn eval_block(heap: &mut Heap, scope: &mut Scope, block: Value) -> EvalResult {
    if !list_p(heap, block) {
        return Err(wrong_argument_type(heap, "listp", block));
    }

    let mut result = heap.nil();
    let mut head = block;
    while let Value::Cons(id) = head {
        let form = heap.cons_car(id);
        result = eval(heap, scope, form)?;
        head = heap.cons_cdr(id);
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Argument-list pattern matching
// ---------------------------------------------------------------------------

/// One argument extracted by [`match_list`].
#[derive(Clone, Debug)]
pub enum MatchedArg {
    Int(i64),
    Real(f32),
    Str(String),
    Sym(String),
    Value(Value),
    Rest(Value),
}

impl MatchedArg {
    pub fn int(&self) -> i64 {
        match self {
            MatchedArg::Int(n) => *n,
            _ => panic!("format mismatch: expected 'd' extraction"),
        }
    }

    pub fn real(&self) -> f32 {
        match self {
            MatchedArg::Real(r) => *r,
            _ => panic!("format mismatch: expected 'f' extraction"),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            MatchedArg::Str(s) => s,
            _ => panic!("format mismatch: expected 's' extraction"),
        }
    }

    pub fn sym(&self) -> &str {
        match self {
            MatchedArg::Sym(s) => s,
            _ => panic!("format mismatch: expected 'q' extraction"),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            MatchedArg::Value(v) | MatchedArg::Rest(v) => *v,
            _ => panic!("format mismatch: expected 'e' or '*' extraction"),
        }
    }
}

/// Match a proper list of already-evaluated arguments against a format
/// string.  Each character consumes one argument:
///
/// | char | accepts        | extracts            |
/// |------|----------------|---------------------|
/// | `d`  | integer atom   | its 64-bit value    |
/// | `f`  | real atom      | its float value     |
/// | `s`  | string atom    | its text            |
/// | `q`  | symbol atom    | its name            |
/// | `e`  | any value      | the value           |
/// | `*`  | remaining list | the remaining list  |
///
/// `*` must be the final specifier.  Kind mismatches yield
/// `(wrong-argument-type . kind)`; length mismatches yield
/// `(wrong-integer-of-arguments . n)`.
pub fn match_list(heap: &mut Heap, format: &str, args: Value) -> Result<Vec<MatchedArg>, Value> {
    let provided = list_length(heap, args);
    let mut out = Vec::with_capacity(format.len());
    let mut xs = args;
    let mut spec = format.chars().peekable();

    while let Some(&kind) = spec.peek() {
        if nil_p(heap, xs) {
            break;
        }
        let Value::Cons(id) = xs else {
            return Err(wrong_argument_type(heap, "consp", xs));
        };
        let x = heap.cons_car(id);

        match kind {
            'd' => match atom_payload(heap, x) {
                Some(Atom::Int(n)) => out.push(MatchedArg::Int(n)),
                _ => return Err(wrong_argument_type(heap, "integerp", x)),
            },
            'f' => match atom_payload(heap, x) {
                Some(Atom::Real(r)) => out.push(MatchedArg::Real(r)),
                _ => return Err(wrong_argument_type(heap, "realp", x)),
            },
            's' => match atom_payload(heap, x) {
                Some(Atom::Str(s)) => out.push(MatchedArg::Str(s)),
                _ => return Err(wrong_argument_type(heap, "stringp", x)),
            },
            'q' => match atom_payload(heap, x) {
                Some(Atom::Symbol(s)) => out.push(MatchedArg::Sym(s)),
                _ => return Err(wrong_argument_type(heap, "symbolp", x)),
            },
            'e' => out.push(MatchedArg::Value(x)),
            '*' => {
                out.push(MatchedArg::Rest(xs));
                xs = heap.nil();
            }
            other => panic!("invalid format specifier '{other}'"),
        }

        spec.next();
        if !nil_p(heap, xs) {
            xs = heap.cons_cdr(id);
        }
    }

    // A trailing `*` matches an exhausted list as the empty rest.
    if spec.peek() == Some(&'*') && nil_p(heap, xs) {
        let nil = heap.nil();
        out.push(MatchedArg::Rest(nil));
        spec.next();
    }

    if spec.next().is_some() || !nil_p(heap, xs) {
        return Err(wrong_integer_of_arguments(heap, provided));
    }

    Ok(out)
}

fn atom_payload(heap: &Heap, value: Value) -> Option<Atom> {
    match value {
        Value::Atom(id) => Some(heap.atom(id).clone()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
