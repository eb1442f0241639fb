//! Capability declaration: a named contract of required operations.
//!
//! A capability exists independently of any type. Types join it later,
//! through the binder, and membership is answered by the capability's own
//! registry. Declarations are built programmatically or loaded from YAML:
//!
//! ```yaml
//! capability:
//!   name: "Hexable"
//!   operations:
//!     - name: "hex"
//!       arity: 1
//! ```

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{DeclareError, DispatchError};
use super::implementation::Implementation;
use super::registry::Registry;

/// One operation a capability requires of its implementations.
///
/// The arity (receiver included) is declarative metadata for readers and
/// tooling; bind validation checks only that an operation of this name is
/// supplied, never its argument count or types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredOp {
    /// Operation name, unique within the capability.
    pub name: String,

    /// Declared parameter count, receiver included.
    #[serde(default = "default_arity")]
    pub arity: usize,
}

fn default_arity() -> usize {
    1
}

impl RequiredOp {
    /// Build a required operation.
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

/// A named set of required operations that types can retroactively
/// implement.
///
/// Immutable after declaration except for its registry of
/// implementations.
pub struct Capability {
    name: String,
    required: Vec<RequiredOp>,
    registry: Registry,
}

impl Capability {
    /// Declare a capability with its required operations.
    ///
    /// Fails if two required operations share a name; no other validation
    /// happens at declaration time.
    pub fn declare(
        name: impl Into<String>,
        required: Vec<RequiredOp>,
    ) -> Result<Self, DeclareError> {
        let name = name.into();

        let mut seen: HashSet<&str> = HashSet::new();
        for op in &required {
            if !seen.insert(op.name.as_str()) {
                return Err(DeclareError::DuplicateOperation {
                    capability: name,
                    operation: op.name.clone(),
                });
            }
        }

        log::debug!(
            "declared capability `{}` with {} required operation(s)",
            name,
            required.len()
        );

        Ok(Self {
            registry: Registry::new(name.clone()),
            name,
            required,
        })
    }

    /// Declare a capability from a YAML definition (see module docs for
    /// the format).
    pub fn from_yaml(yaml: &str) -> Result<Self, DeclareError> {
        let wrapper: CapabilityWrapper = serde_yaml::from_str(yaml)?;
        Self::declare(wrapper.capability.name, wrapper.capability.operations)
    }

    /// The capability's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared required operations, in declaration order.
    pub fn required_ops(&self) -> &[RequiredOp] {
        &self.required
    }

    /// Whether the capability requires an operation of this name.
    pub fn requires(&self, operation: &str) -> bool {
        self.required.iter().any(|op| op.name == operation)
    }

    /// The registry of implementations for this capability.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Query conveniences (forwarded to the registry)
    // -----------------------------------------------------------------------

    /// Whether the value's runtime type equals, or is a declared subtype
    /// of, any registered implementing type.
    ///
    /// Recomputed on every call; registrations made after an earlier query
    /// are visible immediately. A `Capability` value passed here is
    /// treated like any other value: unless `Capability` itself was
    /// registered as an implementing type (it never is in practice), the
    /// answer is false.
    pub fn is_member(&self, value: &dyn Any) -> bool {
        self.registry.is_member(value)
    }

    /// Type-level variant of [`is_member`](Self::is_member).
    pub fn is_subtype_member(&self, candidate: TypeId) -> bool {
        self.registry.is_subtype_member(candidate)
    }

    /// Exact-key lookup of a registered implementation.
    pub fn lookup_exact(&self, id: TypeId) -> Option<Arc<Implementation>> {
        self.registry.lookup_exact(id)
    }

    /// Invoke a required operation on a value, dispatching to the most
    /// specific registered implementation for the value's type.
    pub fn invoke(
        &self,
        receiver: &dyn Any,
        operation: &str,
        args: &[Value],
    ) -> Result<Value, DispatchError> {
        if !self.requires(operation) {
            return Err(DispatchError::UnknownOperation {
                capability: self.name.clone(),
                operation: operation.to_string(),
            });
        }
        let implementation = self.registry.resolve_value(receiver)?;
        implementation.invoke(receiver, operation, args)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ops: Vec<&str> = self.required.iter().map(|op| op.name.as_str()).collect();
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("operations", &ops)
            .field("implementations", &self.registry.len())
            .finish()
    }
}

/// YAML shape of a capability definition.
#[derive(Debug, Deserialize)]
struct CapabilityDef {
    name: String,
    #[serde(default)]
    operations: Vec<RequiredOp>,
}

/// Definitions nest under a `capability:` key.
#[derive(Debug, Deserialize)]
struct CapabilityWrapper {
    capability: CapabilityDef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_rejects_duplicate_operations() {
        let err = Capability::declare(
            "Ord",
            vec![RequiredOp::new("cmp", 2), RequiredOp::new("cmp", 2)],
        )
        .unwrap_err();

        match err {
            DeclareError::DuplicateOperation {
                capability,
                operation,
            } => {
                assert_eq!(capability, "Ord");
                assert_eq!(operation, "cmp");
            }
            other => panic!("expected DuplicateOperation, got {other:?}"),
        }
    }

    #[test]
    fn declared_operations_are_queryable() {
        let cap = Capability::declare(
            "Show",
            vec![RequiredOp::new("show", 1), RequiredOp::new("show_list", 1)],
        )
        .unwrap();

        assert_eq!(cap.name(), "Show");
        assert_eq!(cap.required_ops().len(), 2);
        assert!(cap.requires("show"));
        assert!(!cap.requires("read"));
        assert!(cap.registry().is_empty());
    }

    #[test]
    fn from_yaml_declares_the_same_capability() {
        let yaml = r#"
capability:
  name: "Hexable"
  operations:
    - name: "hex"
      arity: 1
"#;
        let cap = Capability::from_yaml(yaml).unwrap();
        assert_eq!(cap.name(), "Hexable");
        assert!(cap.requires("hex"));
        assert_eq!(cap.required_ops()[0].arity, 1);
    }

    #[test]
    fn from_yaml_rejects_duplicates_and_garbage() {
        let duplicated = r#"
capability:
  name: "Eq"
  operations:
    - name: "eq"
    - name: "eq"
"#;
        assert!(matches!(
            Capability::from_yaml(duplicated).unwrap_err(),
            DeclareError::DuplicateOperation { .. }
        ));

        assert!(matches!(
            Capability::from_yaml("not: [valid").unwrap_err(),
            DeclareError::Yaml(_)
        ));
    }

    #[test]
    fn arity_defaults_to_receiver_only() {
        let yaml = r#"
capability:
  name: "Summable"
  operations:
    - name: "total"
"#;
        let cap = Capability::from_yaml(yaml).unwrap();
        assert_eq!(cap.required_ops()[0].arity, 1);
    }

    #[test]
    fn a_capability_is_not_a_member_of_itself() {
        let cap = Capability::declare("Hexable", vec![RequiredOp::new("hex", 1)]).unwrap();
        assert!(!cap.is_member(&cap as &dyn Any));
    }
}
