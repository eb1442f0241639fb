//! An implementation: one capability bound to one concrete type.

use std::any::Any;
use std::fmt;

use serde_json::Value;

use super::errors::DispatchError;
use crate::extension::OpMap;
use crate::types::TypeKey;

/// The binding of a capability to one implementing type, carrying a
/// concrete body for every required operation.
///
/// Constructed by the binder after validation and installation; held by
/// the capability's registry as the sole durable owner and handed out as
/// `Arc<Implementation>`. Immutable once built.
pub struct Implementation {
    capability: String,
    original: TypeKey,
    ops: OpMap,
}

impl Implementation {
    pub(crate) fn new(capability: impl Into<String>, original: TypeKey, ops: OpMap) -> Self {
        Self {
            capability: capability.into(),
            original,
            ops,
        }
    }

    /// Name of the capability this implements.
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// The implementing ("original") type.
    pub fn original_type(&self) -> TypeKey {
        self.original
    }

    /// The body bound for an operation name, if any.
    pub fn op(&self, name: &str) -> Option<&crate::extension::OperationFn> {
        self.ops.get(name)
    }

    /// Names of all bound operations, sorted.
    pub fn op_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ops.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invoke a bound operation with `receiver` as first argument.
    pub fn invoke(
        &self,
        receiver: &dyn Any,
        operation: &str,
        args: &[Value],
    ) -> Result<Value, DispatchError> {
        let body = self
            .ops
            .get(operation)
            .ok_or_else(|| DispatchError::UnknownOperation {
                capability: self.capability.clone(),
                operation: operation.to_string(),
            })?;
        body(receiver, args).map_err(|source| DispatchError::Operation {
            operation: operation.to_string(),
            source,
        })
    }
}

// Operation bodies are opaque closures; show the shape, not the contents.
impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("capability", &self.capability)
            .field("original", &self.original)
            .field("ops", &self.op_names())
            .finish()
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.capability, self.original.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{operation, OperationError};

    struct Meters(f64);

    fn sample() -> Implementation {
        let mut ops = OpMap::new();
        ops.insert(
            "feet".to_string(),
            operation(|recv, _| {
                let m = recv
                    .downcast_ref::<Meters>()
                    .ok_or_else(|| OperationError::wrong_receiver("Meters"))?;
                Ok(Value::from(m.0 * 3.28084))
            }),
        );
        Implementation::new("Convertible", TypeKey::of::<Meters>(), ops)
    }

    #[test]
    fn invoke_runs_the_bound_body() {
        let imp = sample();
        let out = imp.invoke(&Meters(2.0), "feet", &[]).unwrap();
        assert!((out.as_f64().unwrap() - 6.56168).abs() < 1e-9);
    }

    #[test]
    fn unknown_operation_is_an_error() {
        let imp = sample();
        let err = imp.invoke(&Meters(1.0), "yards", &[]).unwrap_err();
        assert!(matches!(err, DispatchError::UnknownOperation { .. }));
    }

    #[test]
    fn display_reads_capability_of_type() {
        let imp = sample();
        assert_eq!(imp.to_string(), "Convertible[Meters]");
    }
}
