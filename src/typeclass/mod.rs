//! The typeclass core: declaration, binding, and dispatch.
//!
//! A [`Capability`] is a named contract of required operations declared
//! independently of any type. The binder attaches concrete operation
//! bodies to an existing type (validate, install through the extension
//! primitive, register), after which the capability's [`Registry`]
//! answers membership queries and dispatches operation calls, honouring
//! declared subtype relationships among the implementing types.

/// Binder pipeline and bind lifecycle.
pub mod binder;

/// Capability declaration.
pub mod capability;

/// Declaration, bind, and dispatch errors.
pub mod errors;

/// The capability-to-type binding unit.
pub mod implementation;

/// Per-capability implementation registry.
pub mod registry;

pub use binder::{BindOptions, BindState, BindUnit};
pub use capability::{Capability, RequiredOp};
pub use errors::{BindError, DeclareError, DispatchError};
pub use implementation::Implementation;
pub use registry::Registry;
