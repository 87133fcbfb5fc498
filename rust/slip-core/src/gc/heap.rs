//! Arena-based heap with mark-and-sweep collection.
//!
//! Every atom and cons cell produced by the reader or the evaluator lives in
//! one slot of this arena and is addressed by a stable [`ObjId`] handle.
//! Collection runs only from top-level control (between REPL forms), which is
//! the entire safety story for handles held during evaluation of one form.

use super::types::{push_value_id, HeapObject, ObjId};
use crate::lang::builtins::NativeId;
use crate::lang::value::{Atom, LambdaData, Value};

/// The managed heap for Lisp values.
pub struct Heap {
    objects: Vec<HeapObject>,
    generations: Vec<u32>,
    marks: Vec<bool>,
    free_list: Vec<u32>,
    allocated_count: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            generations: Vec::new(),
            marks: Vec::new(),
            free_list: Vec::new(),
            allocated_count: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    fn alloc(&mut self, obj: HeapObject) -> ObjId {
        self.allocated_count += 1;
        if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.objects[i] = obj;
            self.marks[i] = false;
            ObjId {
                index: idx,
                generation: self.generations[i],
            }
        } else {
            let idx = self.objects.len() as u32;
            self.objects.push(obj);
            self.generations.push(0);
            self.marks.push(false);
            ObjId {
                index: idx,
                generation: 0,
            }
        }
    }

    /// Register a fresh atom.  Never deduplicates; `(quote a)` parsed twice
    /// yields two distinct symbol slots with equal payloads.
    pub fn alloc_atom(&mut self, atom: Atom) -> Value {
        Value::Atom(self.alloc(HeapObject::Atom(atom)))
    }

    pub fn alloc_cons(&mut self, car: Value, cdr: Value) -> Value {
        Value::Cons(self.alloc(HeapObject::Cons { car, cdr }))
    }

    // -----------------------------------------------------------------------
    // Value constructors
    // -----------------------------------------------------------------------

    pub fn symbol(&mut self, name: impl Into<String>) -> Value {
        self.alloc_atom(Atom::Symbol(name.into()))
    }

    pub fn integer(&mut self, num: i64) -> Value {
        self.alloc_atom(Atom::Int(num))
    }

    pub fn real(&mut self, num: f32) -> Value {
        self.alloc_atom(Atom::Real(num))
    }

    pub fn string(&mut self, text: impl Into<String>) -> Value {
        self.alloc_atom(Atom::Str(text.into()))
    }

    pub fn lambda(&mut self, params: Value, body: Value, env: Value) -> Value {
        self.alloc_atom(Atom::Lambda(LambdaData { params, body, env }))
    }

    pub fn native(&mut self, id: NativeId, param: Value) -> Value {
        self.alloc_atom(Atom::Native(id, param))
    }

    pub fn nil(&mut self) -> Value {
        self.symbol("nil")
    }

    /// `t` for true, `nil` for false.
    pub fn boolean(&mut self, condition: bool) -> Value {
        if condition {
            self.symbol("t")
        } else {
            self.symbol("nil")
        }
    }

    // -----------------------------------------------------------------------
    // Checked access
    // -----------------------------------------------------------------------

    #[inline]
    fn check(&self, id: ObjId) {
        let i = id.index as usize;
        assert!(
            i < self.objects.len() && self.generations[i] == id.generation,
            "stale ObjId: {:?} (current gen={})",
            id,
            if i < self.generations.len() {
                self.generations[i]
            } else {
                u32::MAX
            }
        );
    }

    pub fn get(&self, id: ObjId) -> &HeapObject {
        self.check(id);
        &self.objects[id.index as usize]
    }

    pub fn get_mut(&mut self, id: ObjId) -> &mut HeapObject {
        self.check(id);
        &mut self.objects[id.index as usize]
    }

    pub fn atom(&self, id: ObjId) -> &Atom {
        match self.get(id) {
            HeapObject::Atom(atom) => atom,
            _ => panic!("atom access on non-atom slot"),
        }
    }

    pub fn cons_car(&self, id: ObjId) -> Value {
        match self.get(id) {
            HeapObject::Cons { car, .. } => *car,
            _ => panic!("cons_car on non-cons"),
        }
    }

    pub fn cons_cdr(&self, id: ObjId) -> Value {
        match self.get(id) {
            HeapObject::Cons { cdr, .. } => *cdr,
            _ => panic!("cons_cdr on non-cons"),
        }
    }

    pub fn set_car(&mut self, id: ObjId, val: Value) {
        match self.get_mut(id) {
            HeapObject::Cons { car, .. } => *car = val,
            _ => panic!("set_car on non-cons"),
        }
    }

    pub fn set_cdr(&mut self, id: ObjId, val: Value) {
        match self.get_mut(id) {
            HeapObject::Cons { cdr, .. } => *cdr = val,
            _ => panic!("set_cdr on non-cons"),
        }
    }

    // -----------------------------------------------------------------------
    // Mark-and-sweep collection
    // -----------------------------------------------------------------------

    /// Collect garbage.  `root` must reach every value that is still needed;
    /// in the interpreter that is the top-level scope expression.
    ///
    /// Must only be called between top-level forms.  Any handle not reachable
    /// from `root` is invalidated by this call.
    pub fn collect(&mut self, root: Value) {
        let before = self.allocated_count;

        // -- Mark --
        for m in self.marks.iter_mut() {
            *m = false;
        }
        self.marks.resize(self.objects.len(), false);

        let mut worklist = Vec::new();
        push_value_id(&root, &mut worklist);

        while let Some(id) = worklist.pop() {
            let i = id.index as usize;
            assert!(
                i < self.objects.len() && self.generations[i] == id.generation,
                "collector reached an unregistered handle: {:?}",
                id
            );
            if self.marks[i] {
                continue;
            }
            assert!(
                !matches!(self.objects[i], HeapObject::Free),
                "collector reached a freed slot: {:?}",
                id
            );
            self.marks[i] = true;
            self.objects[i].trace_children(&mut worklist);
        }

        // -- Sweep --
        for i in 0..self.objects.len() {
            if !self.marks[i] && !matches!(self.objects[i], HeapObject::Free) {
                self.objects[i] = HeapObject::Free;
                self.generations[i] = self.generations[i].wrapping_add(1);
                self.free_list.push(i as u32);
                self.allocated_count -= 1;
            }
        }

        log::debug!(
            "gc: {} live, {} reclaimed, {} slots",
            self.allocated_count,
            before - self.allocated_count,
            self.objects.len()
        );
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    pub fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    pub fn slot_count(&self) -> usize {
        self.objects.len()
    }

    /// Slot map rendering for the `gc-inspect` native: `+` live, `.` free.
    pub fn inspect(&self) -> String {
        self.objects
            .iter()
            .map(|obj| {
                if matches!(obj, HeapObject::Free) {
                    '.'
                } else {
                    '+'
                }
            })
            .collect()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
