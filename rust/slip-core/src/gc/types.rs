//! GC heap object types and handles.

use crate::lang::value::{Atom, Value};

/// Handle to a heap-allocated object.  Copy-able, 8 bytes.
///
/// `index` selects the slot in `Heap::objects`.
/// `generation` detects use-after-free (stale handles panic on access).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl std::fmt::Debug for ObjId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjId({}/{})", self.index, self.generation)
    }
}

/// The concrete object stored on the managed heap.
///
/// Every live value is one of these: a boxed atom, a cons pair, or the
/// tombstone left behind by the collector.
pub enum HeapObject {
    Atom(Atom),
    Cons { car: Value, cdr: Value },
    /// Freed slot, available for reuse.
    Free,
}

impl HeapObject {
    /// Push the ObjIds of every `Value` this object references onto `worklist`
    /// (for GC marking).
    ///
    /// Cons cells reference their car and cdr; lambda atoms reference their
    /// parameter list, body, and captured environment; native atoms reference
    /// their opaque parameter.  All other atoms are leaves.
    pub fn trace_children(&self, worklist: &mut Vec<ObjId>) {
        match self {
            HeapObject::Cons { car, cdr } => {
                push_value_id(car, worklist);
                push_value_id(cdr, worklist);
            }
            HeapObject::Atom(Atom::Lambda(data)) => {
                push_value_id(&data.params, worklist);
                push_value_id(&data.body, worklist);
                push_value_id(&data.env, worklist);
            }
            HeapObject::Atom(Atom::Native(_, param)) => {
                push_value_id(param, worklist);
            }
            HeapObject::Atom(_) => {}
            HeapObject::Free => {}
        }
    }
}

pub(crate) fn push_value_id(value: &Value, worklist: &mut Vec<ObjId>) {
    match value {
        Value::Atom(id) | Value::Cons(id) => worklist.push(*id),
        Value::Void => {}
    }
}
