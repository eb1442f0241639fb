//! # typeclass
//!
//! Ad-hoc polymorphism for runtime-typed values: declare a named
//! capability (a set of required operations), retroactively bind
//! implementations of it to existing types, and dispatch through an
//! explicit registry instead of reflection.
//!
//! The three moving parts:
//!
//! - [`Capability`] declares the contract and owns the registry of
//!   implementations.
//! - The binder ([`Capability::bind`]) validates an operation map,
//!   installs it through a [`TypeExtender`], and registers the result.
//! - The [`TypeGraph`] holds declared subtype edges between runtime
//!   types, so membership queries and dispatch honour subtyping that
//!   Rust itself cannot observe.
//!
//! ```
//! use serde_json::Value;
//! use typeclass::{operation, Capability, Extended, OperationError, OpMap, RequiredOp, TypeKey};
//!
//! let hexable = Capability::declare("Hexable", vec![RequiredOp::new("hex", 1)]).unwrap();
//!
//! let mut ops = OpMap::new();
//! ops.insert(
//!     "hex".to_string(),
//!     operation(|recv, _args| {
//!         let n = recv
//!             .downcast_ref::<i64>()
//!             .ok_or_else(|| OperationError::wrong_receiver("i64"))?;
//!         Ok(Value::String(format!("{n:x}")))
//!     }),
//! );
//! hexable.bind(TypeKey::of::<i64>(), ops).unwrap();
//!
//! assert!(hexable.is_member(&252i64));
//! assert_eq!(252i64.call("hex", &[]).unwrap(), Value::String("fc".into()));
//! ```

pub mod extension;
pub mod typeclass;
pub mod types;

pub use extension::{
    operation, CallError, ConflictPolicy, Extended, ExtensionError, MethodTable, OpMap,
    OperationError, OperationFn, TypeExtender,
};
pub use typeclass::{
    BindError, BindOptions, BindState, BindUnit, Capability, DeclareError, DispatchError,
    Implementation, Registry, RequiredOp,
};
pub use types::{SpecificityTie, TypeGraph, TypeKey};

/// Library version.
pub const VERSION: &str = "0.1.0";
