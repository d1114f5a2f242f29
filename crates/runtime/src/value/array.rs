use std::cell::{Cell, RefCell};
use std::fmt::Debug;

use super::{normalize_index, normalize_range, Val};
use crate::gc::Gc;
use crate::runtime::Runtime;

/// A growable sequence of value references.
///
/// The backing storage always holds `capacity` initialized slots. Only the first `len` of them
/// are logically part of the array. Elements are shared with whoever else holds them; nothing
/// here ever copies an element's contents.
pub struct Array {
    slots: RefCell<Vec<Val>>,
    len: Cell<usize>,
}

impl Array {
    /// Create an array over `slots`, of which the first `len` are live.
    pub(crate) fn from_slots(slots: Vec<Val>, len: usize) -> Self {
        debug_assert!(len <= slots.len(), "array length exceeds its capacity");
        Array {
            slots: RefCell::new(slots),
            len: Cell::new(len),
        }
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of allocated slots. Never less than [`Self::len`].
    pub fn capacity(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Copy out the live element references.
    pub fn to_vec(&self) -> Vec<Val> {
        self.slots.borrow()[..self.len()].to_vec()
    }

    /// Store `value` at `index` without looking at the logical length.
    ///
    /// Generated code only emits this after it has validated the index. Storing into a slot
    /// between `len` and `capacity` does not change the length.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    pub fn set(&self, index: usize, value: Val) {
        let mut slots = self.slots.borrow_mut();
        let capacity = slots.len();
        assert!(
            index < capacity,
            "array store at {} is beyond capacity {}",
            index,
            capacity
        );
        slots[index] = value;
    }

    /// The element at `index`. Negative indices count from the end.
    ///
    /// Returns the `None` singleton if `index` is out of range.
    pub fn get(&self, rt: &Runtime, index: i64) -> Val {
        match normalize_index(index, self.len()) {
            Some(i) => self.slots.borrow()[i].clone(),
            None => rt.make_none(),
        }
    }

    /// A new array holding the element references in `[start, end)`.
    ///
    /// An empty result has capacity 1; a non-empty one has capacity equal to its length.
    pub fn get_range(&self, rt: &Runtime, start: i64, end: i64) -> Gc<Array> {
        match normalize_range(start, end, self.len()) {
            Some((start, end)) => {
                let slice = self.slots.borrow()[start..end].to_vec();
                let len = slice.len();
                rt.alloc_array(slice, len)
            }
            None => rt.make_array_with_capacity(0, 1),
        }
    }

    /// Append `value`, doubling the capacity when the array is full.
    pub fn push(&self, rt: &Runtime, value: Val) {
        let mut slots = self.slots.borrow_mut();
        let len = self.len();
        if len == slots.len() {
            let new_capacity = (len * 2).max(1);
            slots.resize(new_capacity, rt.make_none());
        }
        slots[len] = value;
        self.len.set(len + 1);
    }
}

impl Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Array")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
