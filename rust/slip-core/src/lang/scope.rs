//! Lexical scope as a heap value.
//!
//! A scope expression is a cons chain of frames, innermost first; each frame
//! is an association list of `(name . value)` cells.  The last frame is the
//! global frame.  Its cons cell identity is preserved across all mutations:
//! `set` splices new global bindings into that cell's car, so closures that
//! captured the chain observe additions made after capture.

use crate::gc::Heap;
use crate::lang::value::{assoc_cell, cons_p, nil_p, Value};

/// A stack of frames, itself an ordinary heap value.
#[derive(Clone, Copy, Debug)]
pub struct Scope {
    pub expr: Value,
}

impl Scope {
    /// A fresh scope: one empty global frame.
    pub fn new(heap: &mut Heap) -> Self {
        let frame = heap.nil();
        let outer = heap.nil();
        Self {
            expr: heap.alloc_cons(frame, outer),
        }
    }

    /// Rehydrate a scope from a captured scope expression (lambda call).
    pub fn from_expr(expr: Value) -> Self {
        Self { expr }
    }
}

/// Find the binding cell for `name`, scanning frames innermost-out.
/// Returns the `(name . value)` cell, or `nil` when unbound.
pub fn get_scope_value(heap: &Heap, scope: &Scope, name: Value) -> Value {
    let mut cursor = scope.expr;
    loop {
        match cursor {
            Value::Cons(id) => {
                let frame = heap.cons_car(id);
                if let Some(cell) = assoc_cell(heap, name, frame) {
                    return cell;
                }
                cursor = heap.cons_cdr(id);
            }
            // Chain terminator (the `nil` past the global frame).
            other => return other,
        }
    }
}

/// Bind `name` to `value`.  An existing binding anywhere in the chain is
/// mutated in place; otherwise the binding is inserted into the global
/// frame, preserving the identity of the global-frame cons cell.
pub fn set_scope_value(heap: &mut Heap, scope: &mut Scope, name: Value, value: Value) {
    let mut cursor = scope.expr;
    loop {
        let Value::Cons(id) = cursor else {
            // Degenerate scope expression; grow a global frame around it.
            let cell = heap.alloc_cons(name, value);
            let frame = {
                let nil = heap.nil();
                heap.alloc_cons(cell, nil)
            };
            scope.expr = heap.alloc_cons(frame, cursor);
            return;
        };

        let frame = heap.cons_car(id);
        if let Some(cell) = assoc_cell(heap, name, frame) {
            let Value::Cons(cell_id) = cell else {
                unreachable!("assoc returns cons cells");
            };
            heap.set_cdr(cell_id, value);
            return;
        }

        let rest = heap.cons_cdr(id);
        if nil_p(heap, rest) {
            // Global frame: splice the new binding into the existing car so
            // environments captured by closures see the addition.
            let cell = heap.alloc_cons(name, value);
            let extended = heap.alloc_cons(cell, frame);
            heap.set_car(id, extended);
            return;
        }

        cursor = rest;
    }
}

/// Push a frame binding `params[i]` to `args[i]`.  The frame is built in
/// reverse order, which is immaterial since lookup is by key.
pub fn push_scope_frame(heap: &mut Heap, scope: &mut Scope, params: Value, args: Value) {
    let mut frame = heap.nil();
    let mut vars = params;
    let mut vals = args;
    while cons_p(heap, vars) && cons_p(heap, vals) {
        let Value::Cons(var_id) = vars else {
            unreachable!();
        };
        let Value::Cons(val_id) = vals else {
            unreachable!();
        };
        let name = heap.cons_car(var_id);
        let value = heap.cons_car(val_id);
        let cell = heap.alloc_cons(name, value);
        frame = heap.alloc_cons(cell, frame);
        vars = heap.cons_cdr(var_id);
        vals = heap.cons_cdr(val_id);
    }
    scope.expr = heap.alloc_cons(frame, scope.expr);
}

/// Drop the innermost frame.
pub fn pop_scope_frame(heap: &Heap, scope: &mut Scope) {
    if let Value::Cons(id) = scope.expr {
        scope.expr = heap.cons_cdr(id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
