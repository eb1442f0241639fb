//! Runtime type identity and the declared-subtype relation.

/// Declared-subtype graph and specificity selection.
pub mod graph;

/// Stable per-type keys.
pub mod key;

pub use graph::{SpecificityTie, TypeGraph};
pub use key::TypeKey;
