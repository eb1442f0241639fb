//! Per-capability registry of implementations.
//!
//! Maps implementing `TypeId` to the installed [`Implementation`]. The
//! registry trusts its caller: validation is the binder's job, and
//! `register` will happily overwrite an earlier entry for the same type
//! (last write wins). Membership is recomputed on every query by walking
//! the declared-subtype graph, never cached, so registrations made after
//! an earlier query are visible immediately.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::errors::DispatchError;
use super::implementation::Implementation;
use crate::types::{TypeGraph, TypeKey};

/// Registry of implementations for one capability.
///
/// Entries are published as `Arc` under a write lock, so a concurrent
/// reader either sees a fully constructed implementation or none at all.
pub struct Registry {
    capability: String,
    entries: RwLock<HashMap<TypeId, Arc<Implementation>>>,
}

impl Registry {
    pub(crate) fn new(capability: String) -> Self {
        Self {
            capability,
            entries: RwLock::new(HashMap::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Registration and lookup
    // -----------------------------------------------------------------------

    /// Store an implementation under its implementing type, replacing any
    /// earlier entry for that type.
    pub fn register(&self, implementation: Arc<Implementation>) {
        let key = implementation.original_type();
        TypeGraph::global().intern(key);

        let previous = self
            .entries
            .write()
            .insert(key.id(), implementation);

        if previous.is_some() {
            log::warn!(
                "replacing implementation of `{}` for `{}`",
                self.capability,
                key.name()
            );
        } else {
            log::debug!(
                "registered implementation of `{}` for `{}`",
                self.capability,
                key.name()
            );
        }
    }

    /// Exact-key lookup; no subtype walk.
    pub fn lookup_exact(&self, id: TypeId) -> Option<Arc<Implementation>> {
        self.entries.read().get(&id).cloned()
    }

    /// The implementing types currently registered.
    pub fn keys(&self) -> Vec<TypeKey> {
        self.entries
            .read()
            .values()
            .map(|imp| imp.original_type())
            .collect()
    }

    /// Number of registered implementations.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no implementation has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Whether the value's runtime type equals, or is a declared subtype
    /// of, any registered key.
    pub fn is_member(&self, value: &dyn Any) -> bool {
        self.is_subtype_member(value.type_id())
    }

    /// Whether the candidate type equals, or is a declared subtype of,
    /// any registered key.
    pub fn is_subtype_member(&self, candidate: TypeId) -> bool {
        let graph = TypeGraph::global();
        self.entries
            .read()
            .keys()
            .any(|key| graph.is_subtype(candidate, *key))
    }

    // -----------------------------------------------------------------------
    // Dispatch selection
    // -----------------------------------------------------------------------

    /// Resolve the implementation to dispatch to for a value.
    pub fn resolve_value(&self, value: &dyn Any) -> Result<Arc<Implementation>, DispatchError> {
        self.resolve_type(value.type_id())
    }

    /// Resolve the implementation to dispatch to for a type.
    ///
    /// An exact entry wins outright; otherwise the registered key closest
    /// to the queried type in the declared-subtype graph is chosen, and a
    /// tie between distinct keys at the same distance is an error rather
    /// than an arbitrary pick.
    pub fn resolve_type(&self, id: TypeId) -> Result<Arc<Implementation>, DispatchError> {
        let entries = self.entries.read();

        if let Some(implementation) = entries.get(&id) {
            return Ok(implementation.clone());
        }

        let graph = TypeGraph::global();
        let keys: Vec<TypeKey> = entries.values().map(|imp| imp.original_type()).collect();

        match graph.most_specific(id, &keys) {
            Ok(Some(key)) => entries.get(&key.id()).cloned().ok_or_else(|| {
                DispatchError::NotImplemented {
                    capability: self.capability.clone(),
                    type_name: graph.display_name(id).to_string(),
                }
            }),
            Ok(None) => Err(DispatchError::NotImplemented {
                capability: self.capability.clone(),
                type_name: graph.display_name(id).to_string(),
            }),
            Err(tie) => Err(DispatchError::AmbiguousImplementation {
                capability: self.capability.clone(),
                type_name: graph.display_name(id).to_string(),
                candidates: tie
                    .candidates
                    .iter()
                    .map(|key| key.name().to_string())
                    .collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::OpMap;

    struct Shape;
    struct Circle;

    struct Stream;
    struct FileStream;
    struct SocketStream;
    struct DualStream;

    fn registry(capability: &str) -> Registry {
        Registry::new(capability.to_string())
    }

    fn implementation(capability: &str, key: TypeKey) -> Arc<Implementation> {
        Arc::new(Implementation::new(capability, key, OpMap::new()))
    }

    #[test]
    fn register_then_lookup_exact() {
        let reg = registry("Drawable");
        assert!(reg.lookup_exact(TypeId::of::<Shape>()).is_none());

        reg.register(implementation("Drawable", TypeKey::of::<Shape>()));
        let found = reg.lookup_exact(TypeId::of::<Shape>()).unwrap();
        assert_eq!(found.original_type(), TypeKey::of::<Shape>());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn reregistration_replaces_the_entry() {
        let reg = registry("Drawable");
        reg.register(implementation("Drawable", TypeKey::of::<Shape>()));
        reg.register(implementation("Drawable", TypeKey::of::<Shape>()));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn membership_honors_declared_subtypes() {
        let reg = registry("Drawable");
        TypeGraph::global().declare_subtype::<Circle, Shape>();
        reg.register(implementation("Drawable", TypeKey::of::<Shape>()));

        assert!(reg.is_member(&Shape));
        assert!(reg.is_member(&Circle));
        assert!(reg.is_subtype_member(TypeId::of::<Circle>()));
        assert!(!reg.is_member(&12.5f32));

        // Subtype membership does not create an exact entry.
        assert!(reg.lookup_exact(TypeId::of::<Circle>()).is_none());
    }

    #[test]
    fn resolve_prefers_the_most_specific_key() {
        let reg = registry("Readable");
        TypeGraph::global().declare_subtype::<FileStream, Stream>();
        reg.register(implementation("Readable", TypeKey::of::<Stream>()));
        reg.register(implementation("Readable", TypeKey::of::<FileStream>()));

        let picked = reg.resolve_value(&FileStream).unwrap();
        assert_eq!(picked.original_type(), TypeKey::of::<FileStream>());

        let fallback = reg.resolve_value(&Stream).unwrap();
        assert_eq!(fallback.original_type(), TypeKey::of::<Stream>());
    }

    #[test]
    fn diamond_membership_is_true_but_dispatch_is_ambiguous() {
        let reg = registry("Readable");
        let graph = TypeGraph::global();
        graph.declare_subtype::<DualStream, FileStream>();
        graph.declare_subtype::<DualStream, SocketStream>();

        reg.register(implementation("Readable", TypeKey::of::<FileStream>()));
        reg.register(implementation("Readable", TypeKey::of::<SocketStream>()));

        assert!(reg.is_member(&DualStream));

        let err = reg.resolve_value(&DualStream).unwrap_err();
        match err {
            DispatchError::AmbiguousImplementation { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected AmbiguousImplementation, got {other:?}"),
        }
    }

    #[test]
    fn unregistered_types_fail_to_resolve() {
        let reg = registry("Readable");
        let err = reg.resolve_value(&Shape).unwrap_err();
        assert!(matches!(err, DispatchError::NotImplemented { .. }));
    }
}
