use std::cell::RefCell;
use std::fmt::Debug;

use super::Val;

/// A record of a code-generator-defined type.
///
/// The runtime knows nothing about the fields beyond their positions; the type's methods in the
/// dispatch table give them meaning.
pub struct Instance {
    fields: RefCell<Vec<Val>>,
}

impl Instance {
    pub(crate) fn new(fields: Vec<Val>) -> Self {
        Instance {
            fields: RefCell::new(fields),
        }
    }

    pub fn field_count(&self) -> usize {
        self.fields.borrow().len()
    }

    pub fn field(&self, idx: usize) -> Option<Val> {
        self.fields.borrow().get(idx).cloned()
    }

    /// Replace field `idx`, returning the previous value. Returns `None` if there is no such
    /// field.
    pub fn set_field(&self, idx: usize, val: Val) -> Option<Val> {
        self.fields
            .borrow_mut()
            .get_mut(idx)
            .map(|slot| std::mem::replace(slot, val))
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("fields", &self.field_count())
            .finish()
    }
}
