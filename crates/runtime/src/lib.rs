//! Runtime support for compiled kiln programs.
//!
//! Generated code links against this crate. It gets a uniform boxed value representation
//! ([`value::Val`]), a dispatch table that finds the right intrinsic method for any value at
//! runtime ([`dispatch::VTable`]), and the semantics of the builtin `String` and `Array`
//! containers.
//!
//! A program starts by building a [`Runtime`]:
//!
//! ```
//! use kiln_runtime::{BuiltinTypes, RuntimeBuilder};
//!
//! let rt = RuntimeBuilder::new(BuiltinTypes::COUNT, BuiltinTypes::DEFAULT)
//!     .and_then(|b| b.build())
//!     .expect("bootstrap");
//! let s = rt.call_to_string(&rt.make_float(3.0)).expect("dispatch");
//! assert_eq!(*s, "3");
//! ```

#[macro_use]
pub mod dispatch;
pub mod builtins;
pub mod error;
pub mod gc;
pub mod prelude;
pub mod runtime;
pub mod value;


pub use error::RuntimeError;
pub use gc::{Gc, TypeId};
pub use runtime::{BuiltinTypes, Runtime, RuntimeBuilder};
pub use value::Val;
