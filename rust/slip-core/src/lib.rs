//! Slip — a small Lisp interpreter core.
//!
//! The crate is organized around four tightly coupled pieces: the managed
//! value heap ([`gc`]), the S-expression reader ([`lang::parser`]), the
//! cons-chain scope model ([`lang::scope`]), and the evaluator with its
//! native-function bridge ([`lang::eval`], [`lang::builtins`]).
//!
//! A minimal embedding:
//!
//! ```
//! use slip_core::{Heap, Scope};
//! use slip_core::lang::builtins::install_stdlib;
//! use slip_core::lang::eval::eval;
//! use slip_core::lang::parser::read_expr;
//! use slip_core::lang::print::print_value;
//!
//! let mut heap = Heap::new();
//! let mut scope = Scope::new(&mut heap);
//! install_stdlib(&mut heap, &mut scope);
//!
//! let (form, _) = read_expr(&mut heap, "(+ 1 2 3)", 0).unwrap();
//! let result = eval(&mut heap, &mut scope, form).unwrap();
//! assert_eq!(print_value(&heap, result), "6");
//!
//! // Collection runs between top-level forms, rooted at the scope.
//! heap.collect(scope.expr);
//! ```

pub mod gc;
pub mod lang;

pub use gc::Heap;
pub use lang::scope::Scope;
pub use lang::value::Value;
