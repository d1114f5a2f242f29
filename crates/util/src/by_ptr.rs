use std::hash::Hash;
use std::rc::Rc;

/// A trait for types that can be compared directly by pointer for equality
pub trait AsCmpPtr {
    /// Get the pointer that directly represents `self`
    fn as_cmp_ptr(&self) -> *const ();

    /// Compare pointer equality.
    fn ptr_eq(this: &Self, other: &impl AsCmpPtr) -> bool {
        this.as_cmp_ptr() == other.as_cmp_ptr()
    }
}

/// A wrapping struct to allow types to be compared and hashed by pointer.
///
/// Two `ByPtr`s are equal when they point at the same allocation, regardless of what the
/// allocation contains. This is what identity-keyed sets (e.g. "values currently being
/// rendered") want.
#[repr(transparent)]
#[derive(Clone, Debug)]
pub struct ByPtr<T>(T);

impl<T: AsCmpPtr> ByPtr<T> {
    /// Create a new `ByPtr` wrapper
    pub fn new(t: T) -> Self {
        Self(t)
    }
}

impl<T: AsCmpPtr, O: AsCmpPtr> PartialEq<O> for ByPtr<T> {
    fn eq(&self, other: &O) -> bool {
        self.0.as_cmp_ptr() == other.as_cmp_ptr()
    }
}

impl<T: AsCmpPtr> Eq for ByPtr<T> {}

impl<T: AsCmpPtr> Hash for ByPtr<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_cmp_ptr().hash(state);
    }
}

// ====== Implementations =======

impl<T: AsCmpPtr> AsCmpPtr for ByPtr<T> {
    fn as_cmp_ptr(&self) -> *const () {
        self.0.as_cmp_ptr()
    }
}

impl<T: ?Sized> AsCmpPtr for Rc<T> {
    fn as_cmp_ptr(&self) -> *const () {
        Rc::as_ptr(self) as *const ()
    }
}
