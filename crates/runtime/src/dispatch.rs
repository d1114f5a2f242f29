//! The dispatch table.
//!
//! Every runtime type owns one [`VTableEntry`], found by indexing the [`VTable`] with the
//! type's [`TypeId`]. An entry is an ordered list of methods. The first slots are the
//! [`Intrinsic`]s and sit at the same position for every type, so a call site that only knows
//! it holds *some* value can still reach the right `toString`.

use std::fmt::{Debug, Display};
use std::rc::Rc;

use enum_ordinalize::Ordinalize;
use itertools::Itertools;
use smol_str::SmolStr;

use crate::error::RuntimeError;
use crate::gc::TypeId;
use crate::runtime::Runtime;
use crate::value::Val;

/// Build a [`Method::Function`] from a name, a function path and its arity range.
///
/// ```text
/// method!("toString", int_to_string, 1, 1)
/// ```
macro_rules! method {
    ($name:literal, $func:path, $min:literal, $max:literal) => {
        $crate::dispatch::Method::Function($crate::dispatch::Function::new(
            $name,
            $func,
            $crate::dispatch::Arity::new($min, $max),
        ))
    };
}

/// Method slots with a fixed position in every entry.
#[derive(Clone, Debug, PartialEq, Eq, Copy, Ordinalize)]
#[repr(u8)]
pub enum Intrinsic {
    /// `toString(self) -> String`
    ToString = 0,
    /// `eq(self, other) -> Bool`
    Eq = 1,
    /// `hash(self) -> Int`
    Hash = 2,
}

impl Intrinsic {
    pub const ALL: [Intrinsic; 3] = [Intrinsic::ToString, Intrinsic::Eq, Intrinsic::Hash];

    /// Position of this intrinsic in a [`VTableEntry`].
    pub fn slot(self) -> usize {
        self.ordinal() as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::ToString => "toString",
            Intrinsic::Eq => "eq",
            Intrinsic::Hash => "hash",
        }
    }
}

impl Display for Intrinsic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepted argument counts of a method, receiver included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    pub const fn new(min: usize, max: usize) -> Self {
        Arity { min, max }
    }

    pub const fn exactly(n: usize) -> Self {
        Arity { min: n, max: n }
    }

    /// `n` or more arguments.
    pub const fn at_least(n: usize) -> Self {
        Arity {
            min: n,
            max: usize::MAX,
        }
    }

    pub fn accepts(self, given: usize) -> bool {
        (self.min..=self.max).contains(&given)
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else if self.max == usize::MAX {
            write!(f, "at least {}", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

/// A plain method. `args[0]` is the receiver.
pub type NativeFn = fn(&Runtime, &[Val]) -> Result<Val, RuntimeError>;

/// A method with captured values. The captures come first, then the arguments with the
/// receiver in front.
pub type ClosureFn = fn(&Runtime, &[Val], &[Val]) -> Result<Val, RuntimeError>;

#[derive(Clone)]
pub struct Function {
    name: SmolStr,
    func: NativeFn,
    arity: Arity,
}

impl Function {
    pub fn new(name: impl Into<SmolStr>, func: NativeFn, arity: Arity) -> Self {
        Function {
            name: name.into(),
            func,
            arity,
        }
    }
}

#[derive(Clone)]
pub struct Closure {
    name: SmolStr,
    func: ClosureFn,
    captures: Rc<[Val]>,
    arity: Arity,
}

impl Closure {
    pub fn new(
        name: impl Into<SmolStr>,
        func: ClosureFn,
        captures: impl Into<Rc<[Val]>>,
        arity: Arity,
    ) -> Self {
        Closure {
            name: name.into(),
            func,
            captures: captures.into(),
            arity,
        }
    }

    pub fn captures(&self) -> &[Val] {
        &self.captures
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl Debug for Closure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("captures", &self.captures.len())
            .field("arity", &self.arity)
            .finish()
    }
}

/// A method implementation stored in a dispatch slot.
#[derive(Debug, Clone)]
pub enum Method {
    Function(Function),
    Closure(Closure),
}

impl Method {
    pub fn name(&self) -> &str {
        match self {
            Method::Function(f) => &f.name,
            Method::Closure(c) => &c.name,
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Method::Function(f) => f.arity,
            Method::Closure(c) => c.arity,
        }
    }

    /// Returns `true` if the method is a [`Closure`](Method::Closure).
    pub fn is_closure(&self) -> bool {
        matches!(self, Self::Closure(..))
    }

    /// Invoke the method. `args[0]` is the receiver.
    pub fn call(&self, rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
        let arity = self.arity();
        if !arity.accepts(args.len()) {
            return Err(RuntimeError::Arity {
                name: self.name().to_owned(),
                arity,
                given: args.len(),
            });
        }
        match self {
            Method::Function(f) => (f.func)(rt, args),
            Method::Closure(c) => (c.func)(rt, &c.captures, args),
        }
    }
}

/// The methods of one runtime type, in slot order.
#[derive(Debug, Clone)]
pub struct VTableEntry {
    name: SmolStr,
    methods: Vec<Method>,
}

impl VTableEntry {
    pub fn new(name: impl Into<SmolStr>, methods: Vec<Method>) -> Self {
        VTableEntry {
            name: name.into(),
            methods,
        }
    }

    /// The type's name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn method(&self, slot: usize) -> Option<&Method> {
        self.methods.get(slot)
    }

    pub fn intrinsic(&self, intrinsic: Intrinsic) -> Option<&Method> {
        self.method(intrinsic.slot())
    }
}

impl Display for VTableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.name,
            self.methods.iter().map(Method::name).format(", ")
        )
    }
}

/// A table from [`TypeId`] to [`VTableEntry`].
///
/// The table has a fixed number of slots, decided when it is created. Slots are filled by
/// [`VTable::register`] during bootstrap and are never changed afterwards.
#[derive(Debug)]
pub struct VTable {
    entries: Box<[Option<VTableEntry>]>,
}

impl VTable {
    /// Allocate a table with room for exactly `num_types` types, all unregistered.
    pub fn init(num_types: usize) -> Self {
        VTable {
            entries: (0..num_types).map(|_| None).collect(),
        }
    }

    /// Number of type slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn register(&mut self, type_id: TypeId, entry: VTableEntry) -> Result<(), RuntimeError> {
        let num_types = self.len();
        let slot = self
            .entries
            .get_mut(type_id.index())
            .ok_or(RuntimeError::TypeOutOfRange { type_id, num_types })?;
        if slot.is_some() {
            return Err(RuntimeError::DuplicateRegistration(type_id));
        }
        tracing::debug!(%type_id, entry = %entry, "register type");
        *slot = Some(entry);
        Ok(())
    }

    pub fn entry(&self, type_id: TypeId) -> Result<&VTableEntry, RuntimeError> {
        match self.entries.get(type_id.index()) {
            Some(Some(entry)) => Ok(entry),
            Some(None) => Err(RuntimeError::Unregistered(type_id)),
            None => Err(RuntimeError::TypeOutOfRange {
                type_id,
                num_types: self.len(),
            }),
        }
    }

    /// Registered entries in type id order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &VTableEntry)> + '_ {
        self.entries.iter().enumerate().filter_map(|(idx, entry)| {
            entry
                .as_ref()
                .map(|entry| (TypeId::new(idx as u32), entry))
        })
    }
}

#[cfg(test)]
mod test {
    use super::{Arity, Intrinsic, VTable, VTableEntry};
    use crate::error::RuntimeError;
    use crate::gc::TypeId;

    #[test]
    fn test_intrinsic_slots_are_fixed() {
        assert_eq!(Intrinsic::ToString.slot(), 0);
        assert_eq!(Intrinsic::Eq.slot(), 1);
        assert_eq!(Intrinsic::Hash.slot(), 2);
        assert_eq!(Intrinsic::from_ordinal(1), Some(Intrinsic::Eq));
    }

    #[test]
    fn test_arity() {
        let a = Arity::new(1, 2);
        assert!(!a.accepts(0));
        assert!(a.accepts(1));
        assert!(a.accepts(2));
        assert!(!a.accepts(3));
        assert_eq!(a.to_string(), "1 to 2");
        assert_eq!(Arity::exactly(1).to_string(), "1");

        let unbounded = Arity::at_least(1);
        assert!(unbounded.accepts(1));
        assert!(unbounded.accepts(100));
        assert!(!unbounded.accepts(0));
        assert_eq!(unbounded.to_string(), "at least 1");
    }

    #[test]
    fn test_register_and_lookup() {
        let mut vt = VTable::init(2);
        assert_eq!(vt.len(), 2);
        assert!(matches!(
            vt.entry(TypeId(0)),
            Err(RuntimeError::Unregistered(TypeId(0)))
        ));

        vt.register(TypeId(1), VTableEntry::new("Thing", vec![]))
            .expect("slot 1 is free");
        assert_eq!(vt.entry(TypeId(1)).expect("registered").name(), "Thing");

        assert!(matches!(
            vt.register(TypeId(1), VTableEntry::new("Other", vec![])),
            Err(RuntimeError::DuplicateRegistration(TypeId(1)))
        ));
        assert!(matches!(
            vt.register(TypeId(2), VTableEntry::new("Other", vec![])),
            Err(RuntimeError::TypeOutOfRange {
                type_id: TypeId(2),
                num_types: 2
            })
        ));

        let registered = vt.iter().map(|(id, e)| (id, e.name())).collect::<Vec<_>>();
        assert_eq!(registered, vec![(TypeId(1), "Thing")]);
    }
}
