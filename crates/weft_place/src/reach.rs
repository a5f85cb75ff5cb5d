//! Memoized directed reachability over the pip graph.

use std::collections::{HashMap, HashSet};
use weft_fabric::{FabricTopology, WireId};

/// Memo table for reachability queries, keyed by ordered (source,
/// destination) wire pairs.
///
/// The cache is directional: `(a, b)` and `(b, a)` are independent
/// entries. Entries accumulate for the lifetime of one placement trial;
/// the retry driver calls [`reset`](PathCache::reset) before each
/// trial. Not thread-safe; each trial owns its cache.
#[derive(Debug, Default)]
pub struct PathCache {
    entries: HashMap<(WireId, WireId), bool>,
}

impl PathCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached verdict for the pair, if present.
    pub fn get(&self, src: WireId, dst: WireId) -> Option<bool> {
        self.entries.get(&(src, dst)).copied()
    }

    /// Returns `true` if the pair has a cached verdict.
    pub fn contains(&self, src: WireId, dst: WireId) -> bool {
        self.entries.contains_key(&(src, dst))
    }

    /// Records a verdict for the pair.
    pub fn insert(&mut self, src: WireId, dst: WireId, reachable: bool) {
        self.entries.insert((src, dst), reachable);
    }

    /// Drops every entry.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of cached pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Directed reachability queries over a fabric's pip graph.
pub struct ReachabilityOracle<'a, T: FabricTopology + ?Sized> {
    topo: &'a T,
}

impl<'a, T: FabricTopology + ?Sized> ReachabilityOracle<'a, T> {
    /// Creates an oracle over the given topology.
    pub fn new(topo: &'a T) -> Self {
        Self { topo }
    }

    /// Returns whether `dst` is reachable from `src` through downstream
    /// pips, memoizing the verdict in `cache`.
    ///
    /// Each wire is visited at most once per uncached query; a cached
    /// query does no traversal.
    pub fn reachable(&self, cache: &mut PathCache, src: WireId, dst: WireId) -> bool {
        if let Some(hit) = cache.get(src, dst) {
            return hit;
        }
        let found = self.search(src, dst);
        cache.insert(src, dst, found);
        found
    }

    fn search(&self, src: WireId, dst: WireId) -> bool {
        let mut visited: HashSet<WireId> = HashSet::new();
        let mut stack = vec![src];
        visited.insert(src);
        while let Some(wire) = stack.pop() {
            if wire == dst {
                return true;
            }
            for &pip in self.topo.pips_downhill(wire) {
                let next = self.topo.pip(pip).dst_wire;
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        false
    }
}
