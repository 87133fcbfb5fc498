//! Value printing (S-expression representation).

use crate::gc::Heap;
use crate::lang::value::{nil_p, Atom, Value};

/// Print a value in S-expression form.
///
/// Integers print in decimal; reals in default float form (with a trailing
/// `.0` for whole values so they read back as reals); strings double-quoted
/// with their contents verbatim; symbols as their bytes; lambdas and
/// natives as opaque placeholders.
pub fn print_value(heap: &Heap, value: Value) -> String {
    let mut out = String::new();
    print_into(heap, value, &mut out);
    out
}

fn print_into(heap: &Heap, value: Value, out: &mut String) {
    match value {
        Value::Void => {}
        Value::Atom(id) => match heap.atom(id) {
            Atom::Symbol(name) => out.push_str(name),
            Atom::Int(num) => out.push_str(&num.to_string()),
            Atom::Real(num) => out.push_str(&format_real(*num)),
            Atom::Str(text) => {
                out.push('"');
                out.push_str(text);
                out.push('"');
            }
            Atom::Lambda(_) => out.push_str("<lambda>"),
            Atom::Native(..) => out.push_str("<native>"),
        },
        Value::Cons(_) => {
            out.push('(');
            print_cons(heap, value, out);
            out.push(')');
        }
    }
}

fn print_cons(heap: &Heap, value: Value, out: &mut String) {
    let mut cursor = value;
    let mut first = true;
    loop {
        match cursor {
            Value::Cons(id) => {
                if !first {
                    out.push(' ');
                }
                print_into(heap, heap.cons_car(id), out);
                cursor = heap.cons_cdr(id);
                first = false;
            }
            terminal => {
                if !nil_p(heap, terminal) {
                    out.push_str(" . ");
                    print_into(heap, terminal, out);
                }
                return;
            }
        }
    }
}

fn format_real(num: f32) -> String {
    if num.fract() == 0.0 && num.is_finite() {
        format!("{:.1}", num)
    } else {
        format!("{}", num)
    }
}
