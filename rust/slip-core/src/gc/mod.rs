//! Managed value heap: arena slots, stable handles, mark-and-sweep.

pub mod heap;
pub mod types;

pub use heap::Heap;
pub use types::{HeapObject, ObjId};
