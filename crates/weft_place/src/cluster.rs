//! Rigid placement clusters built from packing rules.
//!
//! Runs once after the preparation passes and before placement. For
//! each expanded packing rule, nets whose driver matches the rule's
//! driver pattern contribute one candidate link per matching user. A
//! successful link puts both cells in one cluster: the driver-side cell
//! anchors it as root and users hang off the root at fixed offsets,
//! unless the user is already clustered, in which case the driver joins
//! the user's cluster below it. The placer then moves each tree as a
//! single unit.

use crate::data::Netlist;
use crate::ids::CellId;
use std::collections::HashSet;
use weft_common::{Ident, Interner};
use weft_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use weft_fabric::PackingRule;

const REFUSED_MEMBERSHIP: DiagnosticCode = DiagnosticCode {
    category: Category::Cluster,
    number: 1,
};
const REFUSED_CYCLE: DiagnosticCode = DiagnosticCode {
    category: Category::Cluster,
    number: 2,
};
const REFUSED_NEGATIVE_Z: DiagnosticCode = DiagnosticCode {
    category: Category::Cluster,
    number: 3,
};

/// Builds the cluster forest from a table of expanded packing rules.
pub struct ClusterConstraintEngine {
    rules: Vec<PackingRule>,
    clock_driver_types: HashSet<Ident>,
}

impl ClusterConstraintEngine {
    /// Creates an engine over already-expanded rules.
    ///
    /// `clock_driver_types` names cell types excluded from generic rule
    /// matching; their rules carry the clock type explicitly in the
    /// driver pattern.
    pub fn new(rules: Vec<PackingRule>, clock_driver_types: HashSet<Ident>) -> Self {
        Self {
            rules,
            clock_driver_types,
        }
    }

    /// Matches every rule against the netlist, linking cells into
    /// clusters. Refused links are reported to `sink` and skipped.
    pub fn run(&self, netlist: &mut Netlist, interner: &Interner, sink: &DiagnosticSink) {
        for rule in &self.rules {
            for net_id in netlist.net_ids() {
                let net = netlist.net(net_id);
                let Some(driver_pin) = net.driver else {
                    continue;
                };
                let dp = netlist.pin(driver_pin);
                let driver_cell = dp.cell;
                if dp.port != rule.driver.port
                    || netlist.cell(driver_cell).cell_type != rule.driver.cell_type
                {
                    continue;
                }
                // Every matching user links; overlapping matches on one
                // net are resolved by the refusal rules, not by order
                // of discovery.
                for user_pin in netlist.net(net_id).users.clone() {
                    let up = netlist.pin(user_pin);
                    let user_cell = up.cell;
                    if up.port != rule.user.port
                        || netlist.cell(user_cell).cell_type != rule.user.cell_type
                    {
                        continue;
                    }
                    if user_cell != driver_cell
                        && !self.clock_driver_types.contains(&netlist.cell(user_cell).cell_type)
                    {
                        self.link(netlist, driver_cell, user_cell, rule, interner, sink);
                    }
                }
            }
        }
    }

    /// Attempts one driver-to-user link. All checks run before any
    /// mutation, so a refused link leaves the forest unchanged.
    fn link(
        &self,
        netlist: &mut Netlist,
        driver: CellId,
        user: CellId,
        rule: &PackingRule,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) {
        let driver_root = netlist.cell(driver).cluster;
        let user_root = netlist.cell(user).cluster;

        if driver_root.is_some() && user_root.is_some() {
            let (code, why) = if driver_root == user_root {
                if self.is_ancestor(netlist, driver, user) {
                    (REFUSED_CYCLE, "link would make a cell its own ancestor")
                } else {
                    (REFUSED_MEMBERSHIP, "cells already share a cluster")
                }
            } else {
                (REFUSED_MEMBERSHIP, "cells belong to different clusters")
            };
            sink.emit(
                Diagnostic::warning(code, format!("refused link: {why}"))
                    .with_note(format!("driver {}", interner.resolve(netlist.cell(driver).name)))
                    .with_note(format!("user {}", interner.resolve(netlist.cell(user).name))),
            );
            return;
        }
        if let Some(root) = user_root {
            // Only the user side is clustered: the driver joins that
            // cluster instead, rel_z slots below the user, inheriting
            // the user's x/y offsets and z anchoring.
            let child_z = self.macro_z(netlist, user) - rule.rel_z;
            if child_z < 0 {
                sink.emit(
                    Diagnostic::warning(
                        REFUSED_NEGATIVE_Z,
                        format!("refused link: composed z {child_z} is negative"),
                    )
                    .with_note(format!("driver {}", interner.resolve(netlist.cell(driver).name))),
                );
                return;
            }
            let u = netlist.cell(user);
            let (ux, uy, uabs) = (u.offset_x, u.offset_y, u.abs_z);
            let c = netlist.cell_mut(driver);
            c.cluster = Some(root);
            c.offset_x = ux;
            c.offset_y = uy;
            c.offset_z = child_z;
            c.abs_z = uabs;
            netlist.cell_mut(root).children.push(driver);
            return;
        }

        // Offsets for the prospective root and child, computed against
        // the forest as it would look after root designation.
        let root_z = if driver_root.is_none() && rule.is_base() {
            rule.base_z
        } else {
            0
        };
        let (child_z, child_abs) = if rule.is_absolute() {
            (rule.rel_z, true)
        } else {
            let anchor_z = match driver_root {
                Some(_) => self.macro_z(netlist, driver),
                None => root_z,
            };
            (anchor_z + rule.rel_z, false)
        };
        if child_z < 0 {
            sink.emit(
                Diagnostic::warning(
                    REFUSED_NEGATIVE_Z,
                    format!("refused link: composed z {child_z} is negative"),
                )
                .with_note(format!("user {}", interner.resolve(netlist.cell(user).name))),
            );
            return;
        }

        let root = match driver_root {
            Some(r) => r,
            None => {
                let c = netlist.cell_mut(driver);
                c.cluster = Some(driver);
                c.offset_x = 0;
                c.offset_y = 0;
                c.offset_z = root_z;
                c.abs_z = rule.is_absolute();
                driver
            }
        };
        let child = netlist.cell_mut(user);
        child.cluster = Some(root);
        child.offset_x = rule.rel_x;
        child.offset_y = rule.rel_y;
        child.offset_z = child_z;
        child.abs_z = child_abs;
        netlist.cell_mut(root).children.push(user);
    }

    /// Walks the root links from `cell` looking for `candidate`.
    fn is_ancestor(&self, netlist: &Netlist, cell: CellId, candidate: CellId) -> bool {
        let mut current = cell;
        loop {
            let Some(root) = netlist.cell(current).cluster else {
                return false;
            };
            if root == current {
                return false;
            }
            if root == candidate {
                return true;
            }
            current = root;
        }
    }

    /// Sums relative z offsets up the ancestry until an absolute-z or
    /// root cell anchors the chain.
    fn macro_z(&self, netlist: &Netlist, cell: CellId) -> i32 {
        let c = netlist.cell(cell);
        match c.cluster {
            Some(root) if root != cell && !c.abs_z => c.offset_z + self.macro_z(netlist, root),
            _ => c.offset_z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_common::Interner;
    use weft_fabric::{CellTypePort, RuleFlags};

    struct Fixture {
        interner: Interner,
        lut: Ident,
        ff: Ident,
        o: Ident,
        d: Ident,
    }

    fn fixture() -> Fixture {
        let interner = Interner::new();
        let lut = interner.get_or_intern("LUT4");
        let ff = interner.get_or_intern("FF");
        let o = interner.get_or_intern("O");
        let d = interner.get_or_intern("D");
        Fixture {
            interner,
            lut,
            ff,
            o,
            d,
        }
    }

    fn base_rule(fx: &Fixture, rel_z: i32) -> PackingRule {
        PackingRule {
            driver: CellTypePort {
                cell_type: fx.lut,
                port: fx.o,
            },
            user: CellTypePort {
                cell_type: fx.ff,
                port: fx.d,
            },
            width: 1,
            base_z: 0,
            rel_x: 0,
            rel_y: 0,
            rel_z,
            flags: RuleFlags {
                base: true,
                absolute: false,
            },
        }
    }

    fn lut_ff(fx: &Fixture, nl: &mut Netlist, suffix: &str, connect: bool) -> (CellId, CellId) {
        let lut = nl.add_cell(fx.interner.get_or_intern(&format!("lut{suffix}")), fx.lut);
        let ff = nl.add_cell(fx.interner.get_or_intern(&format!("ff{suffix}")), fx.ff);
        if connect {
            let net = nl.add_net(fx.interner.get_or_intern(&format!("q{suffix}")));
            nl.connect_driver(lut, fx.o, net);
            nl.connect_user(ff, fx.d, net);
        }
        (lut, ff)
    }

    #[test]
    fn base_rule_links_connected_pair() {
        let fx = fixture();
        let mut nl = Netlist::new();
        let (lut, ff) = lut_ff(&fx, &mut nl, "0", true);
        let (lone_lut, lone_ff) = lut_ff(&fx, &mut nl, "1", false);
        let sink = DiagnosticSink::new();
        let engine = ClusterConstraintEngine::new(vec![base_rule(&fx, 1)], HashSet::new());
        engine.run(&mut nl, &fx.interner, &sink);

        // The connected pair forms one cluster: LUT root at z 0, FF one
        // slot above.
        assert_eq!(nl.cell(lut).cluster, Some(lut));
        assert_eq!(nl.cell(lut).offset_z, 0);
        assert_eq!(nl.cell(lut).children, vec![ff]);
        assert_eq!(nl.cell(ff).cluster, Some(lut));
        assert_eq!(nl.cell(ff).offset_z, 1);
        assert!(!nl.cell(ff).abs_z);

        // The unconnected pair stays unclustered.
        assert!(nl.cell(lone_lut).cluster.is_none());
        assert!(nl.cell(lone_ff).cluster.is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn absolute_rule_pins_child_z() {
        let fx = fixture();
        let mut nl = Netlist::new();
        let (lut, ff) = lut_ff(&fx, &mut nl, "0", true);
        let mut rule = base_rule(&fx, 3);
        rule.flags = RuleFlags {
            base: false,
            absolute: true,
        };
        rule.rel_x = 1;
        let sink = DiagnosticSink::new();
        ClusterConstraintEngine::new(vec![rule], HashSet::new()).run(&mut nl, &fx.interner, &sink);

        assert_eq!(nl.cell(ff).cluster, Some(lut));
        assert_eq!(nl.cell(ff).offset_x, 1);
        assert_eq!(nl.cell(ff).offset_z, 3);
        assert!(nl.cell(ff).abs_z);
        assert!(nl.cell(lut).abs_z);
    }

    #[test]
    fn relative_z_composes_through_chain() {
        // lut drives ff0; a second rule hangs ff1 off ff0's output, so
        // ff1's z composes as macro_z(ff0) + rel_z.
        let fx = fixture();
        let q = fx.interner.get_or_intern("Q");
        let mut nl = Netlist::new();
        let (lut, ff0) = lut_ff(&fx, &mut nl, "0", true);
        let ff1 = nl.add_cell(fx.interner.get_or_intern("ff1"), fx.ff);
        let net = nl.add_net(fx.interner.get_or_intern("chain"));
        nl.connect_driver(ff0, q, net);
        nl.connect_user(ff1, fx.d, net);

        let chain_rule = PackingRule {
            driver: CellTypePort {
                cell_type: fx.ff,
                port: q,
            },
            user: CellTypePort {
                cell_type: fx.ff,
                port: fx.d,
            },
            width: 1,
            base_z: 0,
            rel_x: 0,
            rel_y: 0,
            rel_z: 1,
            flags: RuleFlags {
                base: false,
                absolute: false,
            },
        };
        let sink = DiagnosticSink::new();
        ClusterConstraintEngine::new(vec![base_rule(&fx, 1), chain_rule], HashSet::new())
            .run(&mut nl, &fx.interner, &sink);

        assert_eq!(nl.cell(ff0).offset_z, 1);
        assert_eq!(nl.cell(ff1).cluster, Some(lut));
        assert_eq!(nl.cell(ff1).offset_z, 2);
        assert_eq!(nl.cell(lut).children, vec![ff0, ff1]);
    }

    #[test]
    fn duplicate_link_refused() {
        let fx = fixture();
        let mut nl = Netlist::new();
        let (lut, ff) = lut_ff(&fx, &mut nl, "0", true);
        let sink = DiagnosticSink::new();
        // The same rule twice produces one link and one refusal.
        ClusterConstraintEngine::new(
            vec![base_rule(&fx, 1), base_rule(&fx, 1)],
            HashSet::new(),
        )
        .run(&mut nl, &fx.interner, &sink);

        assert_eq!(nl.cell(lut).children, vec![ff]);
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, REFUSED_MEMBERSHIP);
        assert!(!sink.has_errors());
    }

    #[test]
    fn cyclic_link_leaves_forest_unchanged() {
        // lut drives ff, ff drives lut back; the second direction would
        // make the root its own descendant.
        let fx = fixture();
        let q = fx.interner.get_or_intern("Q");
        let i = fx.interner.get_or_intern("I");
        let mut nl = Netlist::new();
        let (lut, ff) = lut_ff(&fx, &mut nl, "0", true);
        let back = nl.add_net(fx.interner.get_or_intern("back"));
        nl.connect_driver(ff, q, back);
        nl.connect_user(lut, i, back);

        let back_rule = PackingRule {
            driver: CellTypePort {
                cell_type: fx.ff,
                port: q,
            },
            user: CellTypePort {
                cell_type: fx.lut,
                port: i,
            },
            width: 1,
            base_z: 0,
            rel_x: 0,
            rel_y: 0,
            rel_z: 1,
            flags: RuleFlags {
                base: false,
                absolute: false,
            },
        };
        let sink = DiagnosticSink::new();
        ClusterConstraintEngine::new(vec![base_rule(&fx, 1), back_rule], HashSet::new())
            .run(&mut nl, &fx.interner, &sink);

        // First link stands; the reverse one was refused.
        assert_eq!(nl.cell(ff).cluster, Some(lut));
        assert_eq!(nl.cell(lut).cluster, Some(lut));
        assert_eq!(nl.cell(lut).children, vec![ff]);
        assert!(nl.cell(ff).children.is_empty());
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, REFUSED_CYCLE);
    }

    #[test]
    fn driver_joins_existing_downstream_cluster() {
        // The ff chain clusters first (ff0 root at base z 2, ff1 one
        // slot above), then the lut rule finds its user ff0 already
        // clustered. The lut joins that cluster one slot below ff0
        // rather than founding its own.
        let fx = fixture();
        let q = fx.interner.get_or_intern("Q");
        let mut nl = Netlist::new();
        let (lut, ff0) = lut_ff(&fx, &mut nl, "0", true);
        let ff1 = nl.add_cell(fx.interner.get_or_intern("ff1"), fx.ff);
        let net = nl.add_net(fx.interner.get_or_intern("chain"));
        nl.connect_driver(ff0, q, net);
        nl.connect_user(ff1, fx.d, net);

        let chain_rule = PackingRule {
            driver: CellTypePort {
                cell_type: fx.ff,
                port: q,
            },
            user: CellTypePort {
                cell_type: fx.ff,
                port: fx.d,
            },
            width: 1,
            base_z: 2,
            rel_x: 0,
            rel_y: 0,
            rel_z: 1,
            flags: RuleFlags {
                base: true,
                absolute: false,
            },
        };
        let sink = DiagnosticSink::new();
        ClusterConstraintEngine::new(vec![chain_rule, base_rule(&fx, 1)], HashSet::new())
            .run(&mut nl, &fx.interner, &sink);

        assert_eq!(nl.cell(ff0).cluster, Some(ff0));
        assert_eq!(nl.cell(ff0).offset_z, 2);
        assert_eq!(nl.cell(lut).cluster, Some(ff0));
        assert_eq!(nl.cell(lut).offset_z, 1);
        assert!(!nl.cell(lut).abs_z);
        assert_eq!(nl.cell(ff0).children, vec![ff1, lut]);
        assert!(sink.is_empty());
    }

    #[test]
    fn negative_inverse_z_refused_without_mutation() {
        // Same shape as above, but the chain root sits at z 0, so the
        // lut would land at z -1 below it.
        let fx = fixture();
        let q = fx.interner.get_or_intern("Q");
        let mut nl = Netlist::new();
        let (lut, ff0) = lut_ff(&fx, &mut nl, "0", true);
        let ff1 = nl.add_cell(fx.interner.get_or_intern("ff1"), fx.ff);
        let net = nl.add_net(fx.interner.get_or_intern("chain"));
        nl.connect_driver(ff0, q, net);
        nl.connect_user(ff1, fx.d, net);

        let chain_rule = PackingRule {
            driver: CellTypePort {
                cell_type: fx.ff,
                port: q,
            },
            user: CellTypePort {
                cell_type: fx.ff,
                port: fx.d,
            },
            width: 1,
            base_z: 0,
            rel_x: 0,
            rel_y: 0,
            rel_z: 1,
            flags: RuleFlags {
                base: false,
                absolute: false,
            },
        };
        let sink = DiagnosticSink::new();
        ClusterConstraintEngine::new(vec![chain_rule, base_rule(&fx, 1)], HashSet::new())
            .run(&mut nl, &fx.interner, &sink);

        assert!(nl.cell(lut).cluster.is_none());
        assert_eq!(nl.cell(ff0).children, vec![ff1]);
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, REFUSED_NEGATIVE_Z);
    }

    #[test]
    fn negative_composed_z_refused_without_mutation() {
        let fx = fixture();
        let mut nl = Netlist::new();
        let (lut, ff) = lut_ff(&fx, &mut nl, "0", true);
        let sink = DiagnosticSink::new();
        ClusterConstraintEngine::new(vec![base_rule(&fx, -1)], HashSet::new())
            .run(&mut nl, &fx.interner, &sink);

        // Refused before any mutation: no root was created either.
        assert!(nl.cell(lut).cluster.is_none());
        assert!(nl.cell(ff).cluster.is_none());
        assert!(nl.cell(lut).children.is_empty());
        let diags = sink.take_all();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, REFUSED_NEGATIVE_Z);
    }

    #[test]
    fn base_z_offsets_root() {
        let fx = fixture();
        let mut nl = Netlist::new();
        let (lut, ff) = lut_ff(&fx, &mut nl, "0", true);
        let mut rule = base_rule(&fx, 1);
        rule.base_z = 2;
        let sink = DiagnosticSink::new();
        ClusterConstraintEngine::new(vec![rule], HashSet::new()).run(&mut nl, &fx.interner, &sink);

        assert_eq!(nl.cell(lut).offset_z, 2);
        assert_eq!(nl.cell(ff).offset_z, 3);
    }

    #[test]
    fn clock_driver_users_excluded_from_generic_rules() {
        let fx = fixture();
        let mut nl = Netlist::new();
        let lut = nl.add_cell(fx.interner.get_or_intern("lut0"), fx.lut);
        // A buffer cell whose type is registered as a clock driver; its
        // D-like user port must not be swept up by the generic rule.
        let ckbuf_type = fx.interner.get_or_intern("FF");
        let ckbuf = nl.add_cell(fx.interner.get_or_intern("ck0"), ckbuf_type);
        let net = nl.add_net(fx.interner.get_or_intern("q"));
        nl.connect_driver(lut, fx.o, net);
        nl.connect_user(ckbuf, fx.d, net);

        let mut clocks = HashSet::new();
        clocks.insert(ckbuf_type);
        let sink = DiagnosticSink::new();
        ClusterConstraintEngine::new(vec![base_rule(&fx, 1)], clocks)
            .run(&mut nl, &fx.interner, &sink);

        assert!(nl.cell(lut).cluster.is_none());
        assert!(nl.cell(ckbuf).cluster.is_none());
    }
}
