//! Type extension: making operations invocable on existing types.
//!
//! The core machinery never attaches anything to a type by itself; it
//! hands a validated operation map to a [`TypeExtender`] and trusts its
//! contract. [`MethodTable`] is the default in-process extender, so the
//! crate works end to end out of the box, but any platform-specific
//! mechanism can be slotted in through the trait.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::types::TypeKey;

/// Per-type method tables, the default [`TypeExtender`].
pub mod method_table;

pub use method_table::{CallError, Extended, MethodTable};

// ---------------------------------------------------------------------------
// Operation calling convention
// ---------------------------------------------------------------------------

/// A bound operation body.
///
/// The receiver is passed explicitly as the first parameter; auxiliary
/// arguments and the return value travel as [`serde_json::Value`].
pub type OperationFn =
    Arc<dyn Fn(&dyn Any, &[Value]) -> Result<Value, OperationError> + Send + Sync>;

/// Operation bodies keyed by operation name, as supplied to a bind.
pub type OpMap = HashMap<String, OperationFn>;

/// Wrap a closure into an [`OperationFn`].
pub fn operation<F>(f: F) -> OperationFn
where
    F: Fn(&dyn Any, &[Value]) -> Result<Value, OperationError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Failure reported by an operation body itself.
///
/// Bodies are type-erased, so a receiver of an unexpected concrete type is
/// reported as a value rather than a panic.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct OperationError {
    /// What went wrong, in the body's own words.
    pub message: String,
}

impl OperationError {
    /// Build an error from any displayable message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Standard error for a receiver that failed to downcast.
    pub fn wrong_receiver(expected: &str) -> Self {
        Self::msg(format!("receiver is not a `{expected}`"))
    }
}

// ---------------------------------------------------------------------------
// Extension seam
// ---------------------------------------------------------------------------

/// How an extender treats an operation name already present on the target
/// type.
///
/// The default mirrors dynamic-language extension: a later installation
/// replaces an earlier one. [`Reject`](ConflictPolicy::Reject) refuses to
/// shadow anything already installed and fails the whole call instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Replace existing operations of the same name.
    #[default]
    Override,
    /// Refuse the installation if any name is already taken.
    Reject,
}

/// Errors reported by a type-extension primitive.
#[derive(Debug, Clone, Error)]
pub enum ExtensionError {
    /// One or more operation names already exist on the target type and
    /// the policy forbids overriding them.
    #[error("type `{type_name}` already defines {operations:?}; overriding is disallowed")]
    Conflict {
        /// Target type name.
        type_name: String,
        /// The colliding operation names, sorted.
        operations: Vec<String>,
    },

    /// The target type does not accept extension at all.
    #[error("type `{type_name}` is sealed and cannot be extended")]
    NotExtensible {
        /// Target type name.
        type_name: String,
    },
}

/// The primitive that physically attaches operations to a type.
///
/// Contract: after a successful `extend`, every operation in `ops` is
/// invocable on values of `target` (and of its declared subtypes, for
/// extenders that dispatch virtually), with the value as first argument.
/// On failure nothing may have been installed; the call is all or nothing.
pub trait TypeExtender {
    /// Attach `ops` to `target` under the given conflict policy.
    fn extend(
        &self,
        target: TypeKey,
        ops: &OpMap,
        policy: ConflictPolicy,
    ) -> Result<(), ExtensionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_wraps_a_closure() {
        let op = operation(|recv, _args| {
            let n = recv
                .downcast_ref::<i32>()
                .ok_or_else(|| OperationError::wrong_receiver("i32"))?;
            Ok(Value::from(n + 1))
        });

        assert_eq!(op(&41i32, &[]).unwrap(), Value::from(42));
        let err = op(&"nope", &[]).unwrap_err();
        assert!(err.message.contains("i32"));
    }

    #[test]
    fn conflict_policy_defaults_to_override() {
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::Override);
    }
}
