//! Per-type method tables, the default type-extension primitive.
//!
//! A process-global map from `TypeId` to the operations installed on that
//! type. Lookup walks the declared-subtype graph, so an operation
//! installed on a supertype is invocable on values of its subtypes, the
//! closest installation winning. The [`Extended`] blanket trait makes the
//! whole thing read like native method calls: `252i64.call("hex", &[])`.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use super::{ConflictPolicy, ExtensionError, OpMap, OperationError, OperationFn, TypeExtender};
use crate::types::{TypeGraph, TypeKey};

/// Global singleton table instance.
static METHOD_TABLE: OnceLock<MethodTable> = OnceLock::new();

/// Errors raised when invoking an installed operation on a value.
#[derive(Debug, Error)]
pub enum CallError {
    /// No installation of the operation is reachable from the value's type.
    #[error("no operation `{operation}` installed on `{type_name}` or its supertypes")]
    UnknownOperation {
        /// The receiver's type name.
        type_name: String,
        /// The requested operation.
        operation: String,
    },

    /// Two supertypes at the same distance both install the operation.
    #[error("operation `{operation}` is ambiguous between {candidates:?}")]
    Ambiguous {
        /// The requested operation.
        operation: String,
        /// Names of the tied installing types.
        candidates: Vec<String>,
    },

    /// The operation body itself failed.
    #[error("operation `{operation}` failed: {source}")]
    Operation {
        /// The invoked operation.
        operation: String,
        /// The body's reported failure.
        #[source]
        source: OperationError,
    },
}

struct TypeMethods {
    key: TypeKey,
    ops: HashMap<String, OperationFn>,
}

#[derive(Default)]
struct TableInner {
    types: HashMap<TypeId, TypeMethods>,
    sealed: HashSet<TypeId>,
}

/// The process-wide method table.
pub struct MethodTable {
    inner: RwLock<TableInner>,
}

impl MethodTable {
    /// Obtain the global table, initialising it on first call.
    pub fn global() -> &'static MethodTable {
        METHOD_TABLE.get_or_init(|| MethodTable {
            inner: RwLock::new(TableInner::default()),
        })
    }

    // -----------------------------------------------------------------------
    // Installation
    // -----------------------------------------------------------------------

    /// Install `ops` on `target`. All or nothing: conflicts are collected
    /// before anything is written.
    pub fn install(
        &self,
        target: TypeKey,
        ops: &OpMap,
        policy: ConflictPolicy,
    ) -> Result<(), ExtensionError> {
        {
            let mut inner = self.inner.write();

            if inner.sealed.contains(&target.id()) {
                return Err(ExtensionError::NotExtensible {
                    type_name: target.name().to_string(),
                });
            }

            let entry = inner.types.entry(target.id()).or_insert_with(|| TypeMethods {
                key: target,
                ops: HashMap::new(),
            });

            if policy == ConflictPolicy::Reject {
                let mut clashes: Vec<String> = ops
                    .keys()
                    .filter(|name| entry.ops.contains_key(*name))
                    .cloned()
                    .collect();
                if !clashes.is_empty() {
                    clashes.sort();
                    return Err(ExtensionError::Conflict {
                        type_name: target.name().to_string(),
                        operations: clashes,
                    });
                }
            }

            for (name, body) in ops {
                if entry.ops.insert(name.clone(), body.clone()).is_some() {
                    log::debug!("replaced operation `{}` on `{}`", name, target.name());
                } else {
                    log::debug!("installed operation `{}` on `{}`", name, target.name());
                }
            }
        }

        // Record the name so erased values of this type stay diagnosable.
        TypeGraph::global().intern(target);
        Ok(())
    }

    /// Mark a type as refusing all future extension.
    pub fn seal(&self, target: TypeKey) {
        self.inner.write().sealed.insert(target.id());
        TypeGraph::global().intern(target);
    }

    /// Whether a type has been sealed.
    pub fn is_sealed(&self, id: TypeId) -> bool {
        self.inner.read().sealed.contains(&id)
    }

    /// Whether the operation is installed directly on the type (no graph
    /// walk).
    pub fn has_op(&self, id: TypeId, operation: &str) -> bool {
        self.inner
            .read()
            .types
            .get(&id)
            .map_or(false, |entry| entry.ops.contains_key(operation))
    }

    // -----------------------------------------------------------------------
    // Invocation
    // -----------------------------------------------------------------------

    /// Invoke `operation` on a value, passing the value as first argument.
    ///
    /// Resolution: an installation on the exact type wins outright;
    /// otherwise the closest installing supertype is used, and a tie at
    /// equal distance is an error.
    pub fn call(
        &self,
        receiver: &dyn Any,
        operation: &str,
        args: &[Value],
    ) -> Result<Value, CallError> {
        let body = self.resolve_op(receiver.type_id(), operation)?;
        body(receiver, args).map_err(|source| CallError::Operation {
            operation: operation.to_string(),
            source,
        })
    }

    /// Whether `operation` is invocable on values of the given type,
    /// directly or through a declared supertype.
    pub fn supports(&self, id: TypeId, operation: &str) -> bool {
        self.resolve_op(id, operation).is_ok()
    }

    // The body is cloned out so no lock is held while user code runs.
    fn resolve_op(&self, id: TypeId, operation: &str) -> Result<OperationFn, CallError> {
        let inner = self.inner.read();

        if let Some(entry) = inner.types.get(&id) {
            if let Some(body) = entry.ops.get(operation) {
                return Ok(body.clone());
            }
        }

        let graph = TypeGraph::global();
        let candidates: Vec<TypeKey> = inner
            .types
            .values()
            .filter(|entry| entry.ops.contains_key(operation) && graph.is_subtype(id, entry.key.id()))
            .map(|entry| entry.key)
            .collect();

        match graph.most_specific(id, &candidates) {
            Ok(Some(key)) => {
                let body = inner
                    .types
                    .get(&key.id())
                    .and_then(|entry| entry.ops.get(operation))
                    .cloned();
                body.ok_or_else(|| CallError::UnknownOperation {
                    type_name: graph.display_name(id).to_string(),
                    operation: operation.to_string(),
                })
            }
            Ok(None) => Err(CallError::UnknownOperation {
                type_name: graph.display_name(id).to_string(),
                operation: operation.to_string(),
            }),
            Err(tie) => Err(CallError::Ambiguous {
                operation: operation.to_string(),
                candidates: tie.candidates.iter().map(|k| k.name().to_string()).collect(),
            }),
        }
    }
}

impl TypeExtender for MethodTable {
    fn extend(
        &self,
        target: TypeKey,
        ops: &OpMap,
        policy: ConflictPolicy,
    ) -> Result<(), ExtensionError> {
        self.install(target, ops, policy)
    }
}

// ---------------------------------------------------------------------------
// Extended - native-feeling invocation on any value
// ---------------------------------------------------------------------------

/// Makes installed operations invocable directly on values.
///
/// Blanket-implemented for every `'static` type, dispatching through the
/// global [`MethodTable`].
pub trait Extended: Any {
    /// Invoke an installed operation with this value as receiver.
    fn call(&self, operation: &str, args: &[Value]) -> Result<Value, CallError>;

    /// Whether this value's type (or a declared supertype) has the
    /// operation installed.
    fn supports(&self, operation: &str) -> bool;
}

impl<T: Any> Extended for T {
    fn call(&self, operation: &str, args: &[Value]) -> Result<Value, CallError> {
        MethodTable::global().call(self, operation, args)
    }

    fn supports(&self, operation: &str) -> bool {
        MethodTable::global().supports(TypeId::of::<T>(), operation)
    }
}
