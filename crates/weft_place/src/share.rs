//! Exclusivity relation between time-context instances of a physical
//! site.

use std::collections::{HashMap, HashSet};
use weft_fabric::{BelId, FabricTopology};

/// Precomputed bel-to-bels exclusivity index.
///
/// Two bels conflict when they are distinct time-context instances of
/// the same physical site whose contexts are a multiple of `min_ii`
/// slots apart. Each bel's conflict set is computed independently from
/// its own context, so the relation is checked in both directions at
/// query time rather than assumed symmetric.
pub struct ResourceShareIndex {
    conflicts: HashMap<BelId, Vec<BelId>>,
}

impl ResourceShareIndex {
    /// Builds the index for the whole fabric.
    ///
    /// # Panics
    ///
    /// Panics if `min_ii` is 0; settings validation rejects that before
    /// placement.
    pub fn build<T: FabricTopology + ?Sized>(topo: &T, min_ii: u32) -> Self {
        assert!(min_ii >= 1, "min_ii must be at least 1");
        let contexts = topo.context_count();
        let mut conflicts: HashMap<BelId, Vec<BelId>> = HashMap::new();
        for id in topo.bel_ids() {
            let bel = topo.bel(id);
            let mut excluded: HashSet<u32> = HashSet::new();
            for k in 0..contexts {
                excluded.insert((bel.context + k * min_ii) % contexts);
            }
            let mut set = Vec::new();
            for &other_id in topo.bels_at(bel.loc.x, bel.loc.y) {
                if other_id == id {
                    continue;
                }
                let other = topo.bel(other_id);
                if other.bel_type == bel.bel_type
                    && other.name == bel.name
                    && excluded.contains(&other.context)
                {
                    set.push(other_id);
                }
            }
            conflicts.insert(id, set);
        }
        Self { conflicts }
    }

    /// Returns the bels that conflict with the given bel.
    pub fn conflicts(&self, bel: BelId) -> &[BelId] {
        self.conflicts
            .get(&bel)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
