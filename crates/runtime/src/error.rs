use thiserror::Error;

use crate::dispatch::Arity;
use crate::gc::TypeId;

/// Errors raised by bootstrap and dispatch.
///
/// Out-of-range indexing is *not* an error in this runtime; it yields `None` or an empty
/// container instead.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("type id {type_id} is out of range for a dispatch table of {num_types} types")]
    TypeOutOfRange { type_id: TypeId, num_types: usize },

    #[error("type id {0} is registered twice")]
    DuplicateRegistration(TypeId),

    #[error("builtin types `{first}` and `{second}` share type id {type_id}")]
    SharedBuiltinId {
        type_id: TypeId,
        first: &'static str,
        second: &'static str,
    },

    #[error("type id {0} has no dispatch table entry")]
    Unregistered(TypeId),

    #[error("type `{type_name}` has no method in slot {slot}")]
    MissingMethod { type_name: String, slot: usize },

    #[error("method `{name}` takes {arity} arguments, {given} given")]
    Arity {
        name: String,
        arity: Arity,
        given: usize,
    },

    #[error("expected a receiver of type {expected}, found {found}")]
    Receiver { expected: &'static str, found: TypeId },

    #[error("argument {index} must be {expected}, found {found}")]
    Argument {
        index: usize,
        expected: &'static str,
        found: TypeId,
    },

    #[error("method `{name}` returned {found}, expected {expected}")]
    Return {
        name: String,
        expected: &'static str,
        found: TypeId,
    },

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
