mod array;
mod instance;
mod string;
#[cfg(test)]
mod test;

use std::fmt::Debug;

use kiln_util::by_ptr::AsCmpPtr;

pub use array::Array;
pub use instance::Instance;
pub use string::Str;

use crate::gc::{Gc, TypeId};

/// A reference to any boxed runtime value.
///
/// The variant tells which payload layout the box has; the box header tells which runtime type
/// it belongs to. For the builtin types these agree one-to-one. Code-generator-defined types are
/// all [`Instance`]s distinguished only by their header.
#[derive(Clone)]
pub enum Val {
    None(Gc<()>),
    Bool(Gc<bool>),
    Int(Gc<i64>),
    Float(Gc<f64>),
    String(Gc<Str>),
    Array(Gc<Array>),
    Instance(Gc<Instance>),
}

impl Val {
    /// The runtime type identity stored in this value's header.
    pub fn type_id(&self) -> TypeId {
        match self {
            Val::None(v) => v.type_id(),
            Val::Bool(v) => v.type_id(),
            Val::Int(v) => v.type_id(),
            Val::Float(v) => v.type_id(),
            Val::String(v) => v.type_id(),
            Val::Array(v) => v.type_id(),
            Val::Instance(v) => v.type_id(),
        }
    }

    /// Name of the payload layout, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Val::None(_) => "None",
            Val::Bool(_) => "Bool",
            Val::Int(_) => "Int",
            Val::Float(_) => "Float",
            Val::String(_) => "String",
            Val::Array(_) => "Array",
            Val::Instance(_) => "Instance",
        }
    }

    /// Returns `true` if both values are the same boxed instance.
    pub fn ptr_eq(&self, other: &Val) -> bool {
        self.as_cmp_ptr() == other.as_cmp_ptr()
    }

    /// Returns `true` if the val is [`None`].
    ///
    /// [`None`]: Val::None
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None(..))
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(v) = self {
            Some(**v)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        if let Self::Int(v) = self {
            Some(**v)
        } else {
            None
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        if let Self::Float(v) = self {
            Some(**v)
        } else {
            None
        }
    }

    pub fn as_string(&self) -> Option<&Gc<Str>> {
        if let Self::String(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&Gc<Array>> {
        if let Self::Array(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_instance(&self) -> Option<&Gc<Instance>> {
        if let Self::Instance(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn try_into_string(self) -> Result<Gc<Str>, Self> {
        if let Self::String(v) = self {
            Ok(v)
        } else {
            Err(self)
        }
    }

    pub fn try_into_array(self) -> Result<Gc<Array>, Self> {
        if let Self::Array(v) = self {
            Ok(v)
        } else {
            Err(self)
        }
    }
}

impl From<Gc<Str>> for Val {
    fn from(v: Gc<Str>) -> Self {
        Val::String(v)
    }
}

impl From<Gc<Array>> for Val {
    fn from(v: Gc<Array>) -> Self {
        Val::Array(v)
    }
}

impl From<Gc<Instance>> for Val {
    fn from(v: Gc<Instance>) -> Self {
        Val::Instance(v)
    }
}

impl AsCmpPtr for Val {
    fn as_cmp_ptr(&self) -> *const () {
        match self {
            Val::None(v) => v.as_cmp_ptr(),
            Val::Bool(v) => v.as_cmp_ptr(),
            Val::Int(v) => v.as_cmp_ptr(),
            Val::Float(v) => v.as_cmp_ptr(),
            Val::String(v) => v.as_cmp_ptr(),
            Val::Array(v) => v.as_cmp_ptr(),
            Val::Instance(v) => v.as_cmp_ptr(),
        }
    }
}

impl Debug for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Val::None(_) => f.write_str("None"),
            Val::Bool(v) => Debug::fmt(&**v, f),
            Val::Int(v) => Debug::fmt(&**v, f),
            Val::Float(v) => Debug::fmt(&**v, f),
            Val::String(v) => Debug::fmt(&**v, f),
            // Arrays may contain themselves, so never recurse here.
            Val::Array(v) => write!(f, "Array(len = {})", v.len()),
            Val::Instance(v) => write!(f, "Instance({})", v.type_id()),
        }
    }
}

/// Resolve a possibly negative `index` against a container of length `len`.
///
/// `-1` is the last element. Returns `None` when `index >= len` or `index < -len`.
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    if index < -len || index >= len {
        return None;
    }
    let index = if index < 0 { index + len } else { index };
    Some(index as usize)
}

/// Resolve the endpoints of a half-open slice `[start, end)` against a container of length
/// `len`.
///
/// The rules are applied in this order:
///
/// 1. a negative `start` counts from the end, and is clamped to 0 if it is still negative;
/// 2. `start` is 0 for an empty container;
/// 3. a negative `end` counts from the end;
/// 4. `end` is raised to `start` if it is below it;
/// 5. `end` is clamped to `len`.
///
/// Returns `None` when the resulting range is empty.
pub(crate) fn normalize_range(start: i64, end: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = start;
    let mut end = end;

    if start < 0 {
        start = (start + len).max(0);
    }
    if len == 0 {
        start = 0;
    }
    if end < 0 {
        end += len;
    }
    if end < start {
        end = start;
    }
    if end >= len {
        end = len;
    }

    if start >= end {
        None
    } else {
        Some((start as usize, end as usize))
    }
}
