//! Declared-subtype graph over runtime types.
//!
//! Rust exposes no runtime subtype relation between arbitrary types, so
//! this crate keeps one explicitly: callers declare `Sub <: Super` edges
//! and every membership query walks the declared closure. The graph is a
//! process-wide singleton because subtyping is a property of the types
//! themselves, not of any one capability.
//!
//! The relation is reflexive and transitive. A type may declare several
//! direct supertypes, so diamonds are representable; dispatch breaks ties
//! by graph distance and reports a [`SpecificityTie`] when two candidates
//! sit at the same depth.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;

use parking_lot::RwLock;

use super::key::TypeKey;

/// Global singleton graph instance.
static TYPE_GRAPH: OnceLock<TypeGraph> = OnceLock::new();

/// Two or more candidate types at the same minimal distance from the
/// queried type. Callers turn this into their own ambiguity error.
#[derive(Debug, Clone)]
pub struct SpecificityTie {
    /// Distance at which the tie occurred.
    pub depth: usize,
    /// The tied candidate types.
    pub candidates: Vec<TypeKey>,
}

#[derive(Default)]
struct GraphInner {
    /// Direct declared supertypes per type.
    supertypes: HashMap<TypeId, Vec<TypeKey>>,
    /// Names seen for each type, for diagnostics on erased values.
    names: HashMap<TypeId, &'static str>,
}

/// The process-wide registry of declared subtype edges.
pub struct TypeGraph {
    inner: RwLock<GraphInner>,
}

impl TypeGraph {
    /// Obtain the global graph, initialising it on first call.
    pub fn global() -> &'static TypeGraph {
        TYPE_GRAPH.get_or_init(|| TypeGraph {
            inner: RwLock::new(GraphInner::default()),
        })
    }

    // -----------------------------------------------------------------------
    // Edge declaration
    // -----------------------------------------------------------------------

    /// Declare `Sub` to be a subtype of `Super`.
    pub fn declare_subtype<Sub: Any, Super: Any>(&self) {
        self.add_edge(TypeKey::of::<Sub>(), TypeKey::of::<Super>());
    }

    /// Declare a direct edge from `sub` to `sup`.
    ///
    /// Idempotent. Self-edges are ignored (the relation is already
    /// reflexive) and logged at `warn`.
    pub fn add_edge(&self, sub: TypeKey, sup: TypeKey) {
        if sub == sup {
            log::warn!("ignoring self-edge for type `{}`", sub.name());
            return;
        }

        let mut inner = self.inner.write();
        inner.names.insert(sub.id(), sub.name());
        inner.names.insert(sup.id(), sup.name());

        let direct = inner.supertypes.entry(sub.id()).or_default();
        if !direct.contains(&sup) {
            direct.push(sup);
            log::debug!("declared subtype `{}` <: `{}`", sub.name(), sup.name());
        }
    }

    /// Record a name for a type without declaring any edge.
    pub fn intern(&self, key: TypeKey) {
        self.inner.write().names.insert(key.id(), key.name());
    }

    /// The name recorded for a type, if it has ever passed through the
    /// graph. Erased values (`&dyn Any`) only expose their `TypeId`, so
    /// this is the one place a name can be recovered from.
    pub fn name_of(&self, id: TypeId) -> Option<&'static str> {
        self.inner.read().names.get(&id).copied()
    }

    /// Like [`name_of`](Self::name_of), with a placeholder for unseen types.
    pub fn display_name(&self, id: TypeId) -> &'static str {
        self.name_of(id).unwrap_or("<unregistered type>")
    }

    // -----------------------------------------------------------------------
    // Closure queries
    // -----------------------------------------------------------------------

    /// Whether `sub` equals `sup` or reaches it through declared edges.
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        self.distance(sub, sup).is_some()
    }

    /// Number of declared edges on the shortest path from `from` up to
    /// `to`; `Some(0)` for equal types, `None` if unreachable.
    pub fn distance(&self, from: TypeId, to: TypeId) -> Option<usize> {
        if from == to {
            return Some(0);
        }

        let inner = self.inner.read();
        let mut visited: HashSet<TypeId> = HashSet::new();
        let mut queue: VecDeque<(TypeId, usize)> = VecDeque::new();
        visited.insert(from);
        queue.push_back((from, 0));

        // BFS; the visited set keeps accidental cycles from hanging a query.
        while let Some((current, depth)) = queue.pop_front() {
            if let Some(parents) = inner.supertypes.get(&current) {
                for parent in parents {
                    if parent.id() == to {
                        return Some(depth + 1);
                    }
                    if visited.insert(parent.id()) {
                        queue.push_back((parent.id(), depth + 1));
                    }
                }
            }
        }
        None
    }

    /// Direct declared supertypes of a type.
    pub fn supertypes_of(&self, id: TypeId) -> Vec<TypeKey> {
        self.inner
            .read()
            .supertypes
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Pick the candidate closest to `from` in the graph.
    ///
    /// Returns `Ok(None)` when no candidate is reachable, and a
    /// [`SpecificityTie`] when two distinct candidates sit at the same
    /// minimal distance.
    pub fn most_specific(
        &self,
        from: TypeId,
        candidates: &[TypeKey],
    ) -> Result<Option<TypeKey>, SpecificityTie> {
        let mut best_depth = usize::MAX;
        let mut best: Vec<TypeKey> = Vec::new();
        let mut seen: HashSet<TypeId> = HashSet::new();

        for candidate in candidates {
            if !seen.insert(candidate.id()) {
                continue;
            }
            if let Some(depth) = self.distance(from, candidate.id()) {
                if depth < best_depth {
                    best_depth = depth;
                    best = vec![*candidate];
                } else if depth == best_depth {
                    best.push(*candidate);
                }
            }
        }

        match best.len() {
            0 => Ok(None),
            1 => Ok(Some(best[0])),
            _ => Err(SpecificityTie {
                depth: best_depth,
                candidates: best,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Animal;
    struct Dog;
    struct Puppy;

    struct DiamondTop;
    struct DiamondLeft;
    struct DiamondRight;
    struct DiamondBottom;

    struct CycleA;
    struct CycleB;

    #[test]
    fn subtyping_is_reflexive_and_transitive() {
        let graph = TypeGraph::global();
        graph.declare_subtype::<Dog, Animal>();
        graph.declare_subtype::<Puppy, Dog>();

        assert!(graph.is_subtype(TypeId::of::<Dog>(), TypeId::of::<Dog>()));
        assert!(graph.is_subtype(TypeId::of::<Dog>(), TypeId::of::<Animal>()));
        assert!(graph.is_subtype(TypeId::of::<Puppy>(), TypeId::of::<Animal>()));
        assert!(!graph.is_subtype(TypeId::of::<Animal>(), TypeId::of::<Dog>()));

        assert_eq!(
            graph.distance(TypeId::of::<Puppy>(), TypeId::of::<Animal>()),
            Some(2)
        );
    }

    #[test]
    fn self_edges_are_ignored() {
        let graph = TypeGraph::global();
        graph.declare_subtype::<Animal, Animal>();
        assert!(graph.supertypes_of(TypeId::of::<Animal>()).is_empty());
    }

    #[test]
    fn most_specific_prefers_the_closest_candidate() {
        let graph = TypeGraph::global();
        graph.declare_subtype::<Dog, Animal>();
        graph.declare_subtype::<Puppy, Dog>();

        let candidates = [TypeKey::of::<Animal>(), TypeKey::of::<Dog>()];
        let picked = graph
            .most_specific(TypeId::of::<Puppy>(), &candidates)
            .unwrap()
            .unwrap();
        assert_eq!(picked, TypeKey::of::<Dog>());
    }

    #[test]
    fn diamond_at_equal_depth_is_a_tie() {
        let graph = TypeGraph::global();
        graph.declare_subtype::<DiamondLeft, DiamondTop>();
        graph.declare_subtype::<DiamondRight, DiamondTop>();
        graph.declare_subtype::<DiamondBottom, DiamondLeft>();
        graph.declare_subtype::<DiamondBottom, DiamondRight>();

        let candidates = [TypeKey::of::<DiamondLeft>(), TypeKey::of::<DiamondRight>()];
        let tie = graph
            .most_specific(TypeId::of::<DiamondBottom>(), &candidates)
            .unwrap_err();
        assert_eq!(tie.depth, 1);
        assert_eq!(tie.candidates.len(), 2);

        // The shared apex is unambiguous.
        let apex = graph
            .most_specific(TypeId::of::<DiamondBottom>(), &[TypeKey::of::<DiamondTop>()])
            .unwrap()
            .unwrap();
        assert_eq!(apex, TypeKey::of::<DiamondTop>());
    }

    #[test]
    fn cycles_do_not_hang_queries() {
        let graph = TypeGraph::global();
        graph.declare_subtype::<CycleA, CycleB>();
        graph.declare_subtype::<CycleB, CycleA>();

        assert!(graph.is_subtype(TypeId::of::<CycleA>(), TypeId::of::<CycleB>()));
        assert_eq!(graph.distance(TypeId::of::<CycleA>(), TypeId::of::<i128>()), None);
    }

    #[test]
    fn names_are_recorded_for_diagnostics() {
        let graph = TypeGraph::global();
        graph.intern(TypeKey::of::<Animal>());
        assert!(graph
            .name_of(TypeId::of::<Animal>())
            .unwrap()
            .ends_with("Animal"));
        assert_eq!(graph.display_name(TypeId::of::<[u8; 61]>()), "<unregistered type>");
    }
}
