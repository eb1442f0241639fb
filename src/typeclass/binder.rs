//! The implementation binder: validate, install, register.
//!
//! Binding runs three strictly sequential, short-circuiting steps:
//! validation of the supplied operation map against the capability's
//! contract, installation through the type-extension primitive, and
//! registration in the capability's registry. A failure at any step
//! leaves every table untouched; there is no partial installation.
//!
//! [`BindUnit`] carries the lifecycle explicitly. A unit is `Authored`
//! when created and moves through `Validated` and `Installed` to the
//! terminal `Registered`; any failure parks it at the terminal
//! `Rejected`. Rebinding never updates in place, it always starts a
//! fresh unit, and the registry keeps whichever registration came last.

use std::sync::Arc;

use super::capability::Capability;
use super::errors::BindError;
use super::implementation::Implementation;
use crate::extension::{ConflictPolicy, MethodTable, OpMap, TypeExtender};
use crate::types::TypeKey;

/// Lifecycle of one bind attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    /// Created; nothing checked yet.
    Authored,
    /// All required operations are present.
    Validated,
    /// Operations installed on the target type.
    Installed,
    /// Published in the capability's registry. Terminal.
    Registered,
    /// Failed validation or installation. Terminal; no side effects
    /// happened.
    Rejected,
}

/// Knobs for a bind attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindOptions {
    /// How the extension primitive treats already-installed operation
    /// names. Defaults to [`ConflictPolicy::Override`], which is what a
    /// rebind needs; use [`ConflictPolicy::Reject`] to refuse shadowing.
    pub on_conflict: ConflictPolicy,
}

/// One bind attempt: a capability, a target type, and the supplied
/// operation bodies, stepped through the bind lifecycle.
pub struct BindUnit<'c> {
    capability: &'c Capability,
    target: TypeKey,
    ops: OpMap,
    state: BindState,
}

impl<'c> BindUnit<'c> {
    /// Author a new unit. No checks run yet.
    pub fn new(capability: &'c Capability, target: TypeKey, ops: OpMap) -> Self {
        Self {
            capability,
            target,
            ops,
            state: BindState::Authored,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BindState {
        self.state
    }

    /// Check that every required operation has a body.
    ///
    /// Reports all missing operations at once. Extra operations beyond
    /// the contract are allowed and installed verbatim.
    pub fn validate(&mut self) -> Result<(), BindError> {
        debug_assert_eq!(self.state, BindState::Authored);

        let mut missing: Vec<String> = self
            .capability
            .required_ops()
            .iter()
            .filter(|op| !self.ops.contains_key(&op.name))
            .map(|op| op.name.clone())
            .collect();

        if missing.is_empty() {
            self.state = BindState::Validated;
            Ok(())
        } else {
            missing.sort();
            self.state = BindState::Rejected;
            Err(BindError::IncompleteImplementation {
                capability: self.capability.name().to_string(),
                type_name: self.target.name().to_string(),
                missing,
            })
        }
    }

    /// Hand the validated operations to the extension primitive.
    pub fn install(
        &mut self,
        extender: &dyn TypeExtender,
        options: BindOptions,
    ) -> Result<(), BindError> {
        debug_assert_eq!(self.state, BindState::Validated);

        match extender.extend(self.target, &self.ops, options.on_conflict) {
            Ok(()) => {
                self.state = BindState::Installed;
                Ok(())
            }
            Err(source) => {
                self.state = BindState::Rejected;
                Err(BindError::Extension {
                    type_name: self.target.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Publish the implementation in the capability's registry.
    ///
    /// Terminal on success. Operation bodies are shared `Arc`s, so the
    /// clone into the implementation is cheap.
    pub fn register(&mut self) -> Arc<Implementation> {
        debug_assert_eq!(self.state, BindState::Installed);

        let implementation = Arc::new(Implementation::new(
            self.capability.name(),
            self.target,
            self.ops.clone(),
        ));
        self.capability.registry().register(implementation.clone());
        self.state = BindState::Registered;

        log::debug!("bound {}", implementation);
        implementation
    }
}

impl Capability {
    /// Bind an implementation of this capability to `target`, using the
    /// global [`MethodTable`] as extension primitive and default options.
    pub fn bind(
        &self,
        target: TypeKey,
        ops: OpMap,
    ) -> Result<Arc<Implementation>, BindError> {
        self.bind_with(MethodTable::global(), BindOptions::default(), target, ops)
    }

    /// Bind with an explicit extension primitive and options.
    pub fn bind_with(
        &self,
        extender: &dyn TypeExtender,
        options: BindOptions,
        target: TypeKey,
        ops: OpMap,
    ) -> Result<Arc<Implementation>, BindError> {
        let mut unit = BindUnit::new(self, target, ops);
        unit.validate()?;
        unit.install(extender, options)?;
        Ok(unit.register())
    }
}
