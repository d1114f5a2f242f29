use std::cell::RefCell;
use std::fmt::Debug;
use std::hash::Hash;
use std::io::Write;

use bytes::Bytes;
use fnv::FnvHashSet;
use kiln_util::by_ptr::ByPtr;
use once_cell::unsync::OnceCell;

use crate::dispatch::{Arity, Intrinsic, Method, VTable, VTableEntry};
use crate::error::RuntimeError;
use crate::gc::{Gc, TypeId};
use crate::prelude;
use crate::value::{Array, Instance, Str, Val};

/// Type ids of the builtin types, as assigned by the code generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinTypes {
    pub none: TypeId,
    pub int: TypeId,
    pub float: TypeId,
    pub bool: TypeId,
    pub string: TypeId,
    pub array: TypeId,
}

impl BuiltinTypes {
    /// Number of builtin types.
    pub const COUNT: usize = 6;

    /// The builtin types numbered `0..COUNT` in declaration order.
    pub const DEFAULT: BuiltinTypes = BuiltinTypes {
        none: TypeId::new(0),
        int: TypeId::new(1),
        float: TypeId::new(2),
        bool: TypeId::new(3),
        string: TypeId::new(4),
        array: TypeId::new(5),
    };

    pub(crate) fn named(&self) -> [(&'static str, TypeId); Self::COUNT] {
        [
            ("None", self.none),
            ("Int", self.int),
            ("Float", self.float),
            ("Bool", self.bool),
            ("String", self.string),
            ("Array", self.array),
        ]
    }

    /// Check that every id fits in a table of `num_types` and no two builtins share one.
    fn validate(&self, num_types: usize) -> Result<(), RuntimeError> {
        let named = self.named();
        for (i, &(name, type_id)) in named.iter().enumerate() {
            if type_id.index() >= num_types {
                return Err(RuntimeError::TypeOutOfRange { type_id, num_types });
            }
            if let Some(&(first, _)) = named[..i].iter().find(|(_, id)| *id == type_id) {
                return Err(RuntimeError::SharedBuiltinId {
                    type_id,
                    first,
                    second: name,
                });
            }
        }
        Ok(())
    }
}

/// Assembles a [`Runtime`].
///
/// Creating the builder allocates the dispatch table; [`RuntimeBuilder::build`] runs the
/// bootstrap entrypoint and freezes the table. Code-generator-defined types are registered in
/// between.
pub struct RuntimeBuilder {
    types: BuiltinTypes,
    vtable: VTable,
    output: Option<Box<dyn Write>>,
}

impl RuntimeBuilder {
    /// Allocate a dispatch table for `num_types` types.
    pub fn new(num_types: usize, types: BuiltinTypes) -> Result<Self, RuntimeError> {
        types.validate(num_types)?;
        Ok(RuntimeBuilder {
            types,
            vtable: VTable::init(num_types),
            output: None,
        })
    }

    /// Register the methods of a code-generator-defined type.
    pub fn register(mut self, type_id: TypeId, entry: VTableEntry) -> Result<Self, RuntimeError> {
        self.vtable.register(type_id, entry)?;
        Ok(self)
    }

    /// Send `println` output to `output` instead of stdout.
    pub fn output(mut self, output: impl Write + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    /// Register the builtin types and freeze the dispatch table.
    pub fn build(self) -> Result<Runtime, RuntimeError> {
        let RuntimeBuilder {
            types,
            mut vtable,
            output,
        } = self;
        prelude::entrypoint(&mut vtable, &types)?;
        tracing::debug!(
            num_types = vtable.len(),
            registered = vtable.iter().count(),
            "runtime ready"
        );

        Ok(Runtime {
            types,
            vtable,
            none: OnceCell::new(),
            bool_true: OnceCell::new(),
            bool_false: OnceCell::new(),
            literals: Literals::default(),
            rendering: RefCell::new(FnvHashSet::default()),
            hashing: RefCell::new(FnvHashSet::default()),
            comparing: RefCell::new(FnvHashSet::default()),
            output: RefCell::new(output.unwrap_or_else(|| Box::new(std::io::stdout()))),
        })
    }
}

/// Pooled strings returned by the `toString` of `None` and `Bool`.
#[derive(Default)]
struct Literals {
    none: OnceCell<Gc<Str>>,
    true_: OnceCell<Gc<Str>>,
    false_: OnceCell<Gc<Str>>,
}

/// The runtime context every generated program runs against.
///
/// It owns the dispatch table and the singleton values. After [`RuntimeBuilder::build`] the
/// table never changes. Singletons are created lazily on first use.
///
/// A `Runtime` and all values made from it stay on one thread.
pub struct Runtime {
    types: BuiltinTypes,
    vtable: VTable,

    none: OnceCell<Gc<()>>,
    bool_true: OnceCell<Gc<bool>>,
    bool_false: OnceCell<Gc<bool>>,
    literals: Literals,

    /// Arrays whose `toString` is currently on the call stack.
    rendering: RefCell<FnvHashSet<ByPtr<Gc<Array>>>>,
    /// Arrays whose `hash` is currently on the call stack.
    hashing: RefCell<FnvHashSet<ByPtr<Gc<Array>>>>,
    /// Pairs of arrays whose `eq` is currently on the call stack.
    comparing: RefCell<FnvHashSet<(ByPtr<Gc<Array>>, ByPtr<Gc<Array>>)>>,

    output: RefCell<Box<dyn Write>>,
}

static_assertions::assert_not_impl_any!(Runtime: Send, Sync);

impl Runtime {
    /// A runtime with the builtin types only, numbered as in [`BuiltinTypes::DEFAULT`].
    pub fn with_builtins() -> Result<Runtime, RuntimeError> {
        RuntimeBuilder::new(BuiltinTypes::COUNT, BuiltinTypes::DEFAULT)?.build()
    }

    pub fn types(&self) -> &BuiltinTypes {
        &self.types
    }

    pub fn vtable(&self) -> &VTable {
        &self.vtable
    }

    // ====== Constructors ======

    /// The `None` singleton.
    pub fn make_none(&self) -> Val {
        Val::None(
            self.none
                .get_or_init(|| Gc::new(self.types.none, ()))
                .clone(),
        )
    }

    /// One of the two `Bool` singletons.
    pub fn make_bool(&self, value: bool) -> Val {
        let cell = if value {
            &self.bool_true
        } else {
            &self.bool_false
        };
        Val::Bool(cell.get_or_init(|| Gc::new(self.types.bool, value)).clone())
    }

    pub fn make_int(&self, value: i64) -> Val {
        Val::Int(Gc::new(self.types.int, value))
    }

    pub fn make_float(&self, value: f64) -> Val {
        Val::Float(Gc::new(self.types.float, value))
    }

    /// A new string holding `bytes`.
    pub fn make_string(&self, bytes: impl Into<Bytes>) -> Gc<Str> {
        Gc::new(self.types.string, Str::new(bytes.into()))
    }

    /// A new string holding `a` followed by `b`.
    pub fn concat_strings(&self, a: &Str, b: &Str) -> Gc<Str> {
        let mut buf = Vec::with_capacity(a.len() + b.len());
        buf.extend_from_slice(a.as_bytes());
        buf.extend_from_slice(b.as_bytes());
        self.make_string(buf)
    }

    /// A new array with `capacity` slots, the first `length` of which are live.
    ///
    /// Live slots start out as `None`; generated code fills them with [`Array::set`] before
    /// reading them. A `capacity` below `length` is raised to `length`.
    pub fn make_array_with_capacity(&self, length: usize, capacity: usize) -> Gc<Array> {
        let slots = vec![self.make_none(); capacity.max(length)];
        self.alloc_array(slots, length)
    }

    /// A new array holding `items`.
    pub fn make_array(&self, items: impl IntoIterator<Item = Val>) -> Gc<Array> {
        let mut slots = items.into_iter().collect::<Vec<_>>();
        let len = slots.len();
        if slots.is_empty() {
            slots.push(self.make_none());
        }
        self.alloc_array(slots, len)
    }

    pub(crate) fn alloc_array(&self, slots: Vec<Val>, len: usize) -> Gc<Array> {
        Gc::new(self.types.array, Array::from_slots(slots, len))
    }

    /// A new record of the code-generator-defined type `type_id`.
    pub fn make_instance(&self, type_id: TypeId, fields: Vec<Val>) -> Gc<Instance> {
        Gc::new(type_id, Instance::new(fields))
    }

    pub(crate) fn literal_none(&self) -> Gc<Str> {
        self.literals
            .none
            .get_or_init(|| self.make_string("None"))
            .clone()
    }

    pub(crate) fn literal_bool(&self, value: bool) -> Gc<Str> {
        if value {
            self.literals
                .true_
                .get_or_init(|| self.make_string("true"))
                .clone()
        } else {
            self.literals
                .false_
                .get_or_init(|| self.make_string("false"))
                .clone()
        }
    }

    // ====== Dispatch ======

    fn lookup(&self, receiver: &Val, slot: usize) -> Result<Option<&Method>, RuntimeError> {
        let type_id = receiver.type_id();
        let entry = self.vtable.entry(type_id)?;
        let method = entry.method(slot);
        tracing::trace!(
            %type_id,
            type_name = entry.name(),
            slot,
            method = method.map(Method::name),
            "dispatch"
        );
        Ok(method)
    }

    fn missing(&self, receiver: &Val, slot: usize) -> RuntimeError {
        let type_name = self
            .vtable
            .entry(receiver.type_id())
            .map(|e| e.name().to_owned())
            .unwrap_or_else(|_| receiver.type_id().to_string());
        RuntimeError::MissingMethod { type_name, slot }
    }

    /// Call the method in `slot` of the receiver's type. `args[0]` is the receiver.
    pub fn call_method(&self, slot: usize, args: &[Val]) -> Result<Val, RuntimeError> {
        let receiver = args.first().ok_or_else(|| RuntimeError::Arity {
            name: format!("<slot {}>", slot),
            arity: Arity::at_least(1),
            given: 0,
        })?;
        match self.lookup(receiver, slot)? {
            Some(method) => method.call(self, args),
            None => Err(self.missing(receiver, slot)),
        }
    }

    /// Convert any value to a string through its `toString` slot.
    pub fn call_to_string(&self, value: &Val) -> Result<Gc<Str>, RuntimeError> {
        let slot = Intrinsic::ToString.slot();
        let method = self
            .lookup(value, slot)?
            .ok_or_else(|| self.missing(value, slot))?;
        method
            .call(self, std::slice::from_ref(value))?
            .try_into_string()
            .map_err(|ret| RuntimeError::Return {
                name: method.name().to_owned(),
                expected: "String",
                found: ret.type_id(),
            })
    }

    /// Compare two values through the `eq` slot of `a`.
    ///
    /// The same instance is always equal to itself, and values of different types are never
    /// equal. A type without an `eq` method compares by identity.
    pub fn call_eq(&self, a: &Val, b: &Val) -> Result<bool, RuntimeError> {
        if a.ptr_eq(b) {
            return Ok(true);
        }
        if a.type_id() != b.type_id() {
            return Ok(false);
        }
        let method = match self.lookup(a, Intrinsic::Eq.slot())? {
            Some(method) => method,
            None => return Ok(false),
        };
        let ret = method.call(self, &[a.clone(), b.clone()])?;
        ret.as_bool().ok_or_else(|| RuntimeError::Return {
            name: method.name().to_owned(),
            expected: "Bool",
            found: ret.type_id(),
        })
    }

    /// Hash a value through its `hash` slot.
    ///
    /// A type without a `hash` method hashes by identity, which agrees with the identity
    /// fallback of [`Runtime::call_eq`].
    pub fn call_hash(&self, value: &Val) -> Result<i64, RuntimeError> {
        let method = match self.lookup(value, Intrinsic::Hash.slot())? {
            Some(method) => method,
            None => return Ok(prelude::identity_hash(value)),
        };
        let ret = method.call(self, std::slice::from_ref(value))?;
        ret.as_int().ok_or_else(|| RuntimeError::Return {
            name: method.name().to_owned(),
            expected: "Int",
            found: ret.type_id(),
        })
    }

    // ====== Rendering ======

    /// Render an array as `[a, b, c]`, converting each element through the dispatch table.
    ///
    /// The element strings are produced first, then the result is written into a buffer of the
    /// exact final size. An array that is already being rendered further up the stack renders
    /// as `[...]`.
    pub(crate) fn render_array(&self, array: &Gc<Array>) -> Result<Gc<Str>, RuntimeError> {
        let items = array.to_vec();
        if items.is_empty() {
            return Ok(self.make_string("[]"));
        }

        let reprs = match guarded(&self.rendering, ByPtr::new(array.clone()), || {
            items
                .iter()
                .map(|item| self.call_to_string(item))
                .collect::<Result<Vec<_>, _>>()
        }) {
            Some(reprs) => reprs?,
            None => return Ok(self.make_string("[...]")),
        };

        // brackets, items, and ", " between each pair of items
        let total = 2 + reprs.iter().map(|s| s.len()).sum::<usize>() + 2 * (reprs.len() - 1);
        let mut buf = Vec::with_capacity(total);
        buf.push(b'[');
        for (i, repr) in reprs.iter().enumerate() {
            if i > 0 {
                buf.extend_from_slice(b", ");
            }
            buf.extend_from_slice(repr.as_bytes());
        }
        buf.push(b']');
        debug_assert_eq!(buf.len(), total, "array repr size was miscalculated");

        Ok(self.make_string(buf))
    }

    /// Run `f` unless `array` is already being hashed further up the stack.
    pub(crate) fn guard_hash<R>(&self, array: &Gc<Array>, f: impl FnOnce() -> R) -> Option<R> {
        guarded(&self.hashing, ByPtr::new(array.clone()), f)
    }

    /// Run `f` unless `a` is already being compared with `b` further up the stack.
    pub(crate) fn guard_eq<R>(
        &self,
        a: &Gc<Array>,
        b: &Gc<Array>,
        f: impl FnOnce() -> R,
    ) -> Option<R> {
        let key = (ByPtr::new(a.clone()), ByPtr::new(b.clone()));
        guarded(&self.comparing, key, f)
    }

    pub(crate) fn with_output<R>(&self, f: impl FnOnce(&mut dyn Write) -> R) -> R {
        let mut output = self.output.borrow_mut();
        f(&mut **output)
    }
}

/// Run `f` with `key` marked as in progress in `set`. Returns `None` without running `f` if the
/// key is already marked.
fn guarded<K: Hash + Eq + Clone, R>(
    set: &RefCell<FnvHashSet<K>>,
    key: K,
    f: impl FnOnce() -> R,
) -> Option<R> {
    if !set.borrow_mut().insert(key.clone()) {
        return None;
    }
    let ret = f();
    set.borrow_mut().remove(&key);
    Some(ret)
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("types", &self.types)
            .field("vtable", &self.vtable)
            .finish_non_exhaustive()
    }
}
