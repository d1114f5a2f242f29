//! Boxed value storage.
//!
//! Every runtime value lives behind a [`Gc`] pointer. The heap part is a [`GcValue`], whose
//! first field is a [`GcHeader`] carrying the [`TypeId`] of the value. The header is written
//! once at construction and never changes afterwards.
//!
//! The pointer is reference-counted. There is no tracing collector, so arrays that contain
//! themselves are never reclaimed.

use std::fmt::{Debug, Display};
use std::ops::Deref;
use std::rc::Rc;

use kiln_util::by_ptr::AsCmpPtr;

/// Identity of a runtime type.
///
/// Type ids are assigned by the code generator. They are dense and start at 0, so every
/// `TypeId` is a valid index into a [`VTable`](crate::dispatch::VTable) of the right size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const fn new(id: u32) -> Self {
        TypeId(id)
    }

    /// Position of this type in the dispatch table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The common leading part of every boxed value.
#[repr(C)]
#[derive(Debug)]
pub struct GcHeader {
    type_id: TypeId,
}

impl GcHeader {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

/// The heap allocated part of a [`Gc`].
///
/// The layout of this type ensures the header is always at offset 0.
#[repr(C)]
pub struct GcValue<T: ?Sized> {
    header: GcHeader,
    val: T,
}

impl<T: ?Sized> GcValue<T> {
    pub fn header(&self) -> &GcHeader {
        &self.header
    }

    pub fn value(&self) -> &T {
        &self.val
    }
}

/// A reference-counted pointer to a boxed runtime value.
///
/// Cloning a `Gc` shares the value; it never copies the payload. Two `Gc`s are the *same value*
/// when [`Gc::ptr_eq`] holds.
#[repr(transparent)]
pub struct Gc<T>(Rc<GcValue<T>>);

impl<T> Gc<T> {
    /// Box `val` with the given type identity.
    pub fn new(type_id: TypeId, val: T) -> Self {
        Gc(Rc::new(GcValue {
            header: GcHeader { type_id },
            val,
        }))
    }

    pub fn header(&self) -> &GcHeader {
        self.0.header()
    }

    pub fn type_id(&self) -> TypeId {
        self.0.header.type_id
    }

    /// Returns `true` if both pointers point at the same boxed value.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }

    /// Number of live handles to this value.
    pub fn ref_count(this: &Self) -> usize {
        Rc::strong_count(&this.0)
    }
}

impl<T> Deref for Gc<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0.val
    }
}

impl<T> Clone for Gc<T> {
    fn clone(&self) -> Self {
        Gc(self.0.clone())
    }
}

impl<T> AsCmpPtr for Gc<T> {
    fn as_cmp_ptr(&self) -> *const () {
        self.0.as_cmp_ptr()
    }
}

impl<T: Debug> Debug for Gc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Gc")
            .field(&self.type_id())
            .field(&self.0.val)
            .finish()
    }
}

impl<T: Display> Display for Gc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0.val, f)
    }
}

// A `Gc` is a single thin pointer, so generated code can pass it around as one word.
static_assertions::assert_eq_size!(Gc<i64>, *const ());
static_assertions::assert_eq_size!(Gc<()>, *const ());
static_assertions::assert_eq_size!(TypeId, u32);
