//! Error types for typeclass declaration, binding, and dispatch.

use thiserror::Error;

use crate::extension::{ExtensionError, OperationError};

/// Errors raised while declaring a capability.
#[derive(Debug, Error)]
pub enum DeclareError {
    /// Two required operations share a name.
    #[error("capability `{capability}` declares operation `{operation}` twice")]
    DuplicateOperation {
        /// The capability being declared.
        capability: String,
        /// The repeated operation name.
        operation: String,
    },

    /// A YAML capability definition failed to parse.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised while binding an implementation to a type.
///
/// Both variants leave the registry and the extension target untouched;
/// a failed bind has no side effects.
#[derive(Debug, Error)]
pub enum BindError {
    /// The supplied operation map is missing required operations.
    #[error("implementation of `{capability}` for `{type_name}` is missing {missing:?}")]
    IncompleteImplementation {
        /// The capability being bound.
        capability: String,
        /// The implementing type.
        type_name: String,
        /// Names of the absent required operations, sorted.
        missing: Vec<String>,
    },

    /// The extension primitive refused the installation.
    #[error("extension of `{type_name}` rejected: {source}")]
    Extension {
        /// The implementing type.
        type_name: String,
        /// The primitive's report.
        #[source]
        source: ExtensionError,
    },
}

/// Errors raised while resolving or invoking an operation through a
/// capability. None of them mutate registry state.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The value's type matches no registered implementation.
    #[error("`{type_name}` has no implementation of `{capability}`")]
    NotImplemented {
        /// The queried capability.
        capability: String,
        /// The receiver's type name.
        type_name: String,
    },

    /// Two registered keys are equally specific for the value's type.
    #[error("`{type_name}` matches multiple implementations of `{capability}`: {candidates:?}")]
    AmbiguousImplementation {
        /// The queried capability.
        capability: String,
        /// The receiver's type name.
        type_name: String,
        /// Names of the tied registered types.
        candidates: Vec<String>,
    },

    /// The operation is not part of the capability's contract.
    #[error("capability `{capability}` has no operation `{operation}`")]
    UnknownOperation {
        /// The queried capability.
        capability: String,
        /// The requested operation.
        operation: String,
    },

    /// The operation body reported a failure.
    #[error("operation `{operation}` failed: {source}")]
    Operation {
        /// The invoked operation.
        operation: String,
        /// The body's reported failure.
        #[source]
        source: OperationError,
    },
}
