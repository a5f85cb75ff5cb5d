//! The binding-legality predicate consulted on every candidate move.

use crate::data::Netlist;
use crate::reach::{PathCache, ReachabilityOracle};
use crate::share::ResourceShareIndex;
use std::collections::{HashMap, HashSet};
use weft_common::{Ident, InternalError, Interner, WeftResult};
use weft_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use weft_fabric::{BelId, FabricTopology};

const TRACE_EXCLUSIVITY: DiagnosticCode = DiagnosticCode {
    category: Category::Legality,
    number: 1,
};
const TRACE_INTERNAL_PIN: DiagnosticCode = DiagnosticCode {
    category: Category::Legality,
    number: 2,
};
const TRACE_REACH: DiagnosticCode = DiagnosticCode {
    category: Category::Legality,
    number: 3,
};

/// Decides whether a cell's binding to a bel is legal.
///
/// Composes the exclusivity index, the per-tile-type unique-bel-type
/// table, and the reachability oracle into one predicate. Rejections
/// are `Ok(false)`; only a device-database/cell-library mismatch (a
/// bound driver port with no physical source wire) is an error.
pub struct LegalityChecker<'a, T: FabricTopology + ?Sized> {
    topo: &'a T,
    share: ResourceShareIndex,
    oracle: ReachabilityOracle<'a, T>,
    exempt_bel_types: HashSet<Ident>,
    unique_bel_types: HashMap<Ident, Vec<Ident>>,
}

impl<'a, T: FabricTopology + ?Sized> LegalityChecker<'a, T> {
    /// Creates a checker over the given topology.
    ///
    /// `exempt_bel_types` names pass-through I/O bel types whose
    /// bindings are always legal. The unique-bel-type table is
    /// precomputed here: for each tile type, the distinct bel types of
    /// the first tile of that type encountered in grid scan order.
    pub fn new(topo: &'a T, share: ResourceShareIndex, exempt_bel_types: HashSet<Ident>) -> Self {
        let mut unique_bel_types: HashMap<Ident, Vec<Ident>> = HashMap::new();
        let (width, height) = topo.grid_size();
        for y in 0..height {
            for x in 0..width {
                let Some(tile_type) = topo.tile_type(x, y) else {
                    continue;
                };
                if unique_bel_types.contains_key(&tile_type) {
                    continue;
                }
                let mut types = Vec::new();
                for &bel in topo.bels_at(x, y) {
                    let t = topo.bel(bel).bel_type;
                    if !types.contains(&t) {
                        types.push(t);
                    }
                }
                unique_bel_types.insert(tile_type, types);
            }
        }
        Self {
            topo,
            share,
            oracle: ReachabilityOracle::new(topo),
            exempt_bel_types,
            unique_bel_types,
        }
    }

    /// Returns the distinct bel types of tiles of the given type.
    pub fn tile_unique_bel_types(&self, tile_type: Ident) -> &[Ident] {
        self.unique_bel_types
            .get(&tile_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Checks whether the current occupant of `bel` (if any) is legally
    /// placed there.
    ///
    /// With `explain` set, a trace of the decision is emitted to `sink`;
    /// the verdict is unaffected.
    ///
    /// # Errors
    ///
    /// Returns an error when a bound driver port has no physical source
    /// wire on its bel.
    pub fn is_legal(
        &self,
        netlist: &Netlist,
        cache: &mut PathCache,
        bel: BelId,
        explain: bool,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> WeftResult<bool> {
        let Some(cell_id) = netlist.cell_at(bel) else {
            return Ok(true);
        };
        let bel_data = self.topo.bel(bel);
        if self.exempt_bel_types.contains(&bel_data.bel_type) {
            return Ok(true);
        }

        // Exclusivity between time-context instances of the site.
        if self.topo.context_count() > 1 {
            for &other in self.share.conflicts(bel) {
                if netlist.cell_at(other).is_some() {
                    if explain {
                        sink.emit(
                            Diagnostic::note(
                                TRACE_EXCLUSIVITY,
                                format!(
                                    "site {} context {} conflicts with occupied context {}",
                                    interner.resolve(bel_data.name),
                                    bel_data.context,
                                    self.topo.bel(other).context
                                ),
                            ),
                        );
                    }
                    return Ok(false);
                }
            }
        }

        let cell = netlist.cell(cell_id);
        for &pin_id in &cell.pins {
            let pin = netlist.pin(pin_id);
            let Some(net) = netlist.try_net(pin.net) else {
                continue;
            };
            if net.driver == Some(pin_id) {
                if !self.check_output_net(netlist, cache, bel, pin_id, explain, interner, sink)? {
                    return Ok(false);
                }
            } else if !self.check_internal_pin(netlist, bel, pin_id, explain, interner, sink) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Input pins with tile-internal wiring can only be driven by cell
    /// types that exist on the tile itself.
    fn check_internal_pin(
        &self,
        netlist: &Netlist,
        bel: BelId,
        pin_id: crate::ids::PinId,
        explain: bool,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> bool {
        let pin = netlist.pin(pin_id);
        let Some(bel_pin) = self.topo.pin(bel, pin.port) else {
            return true;
        };
        if !bel_pin.internal {
            return true;
        }
        let Some(driver_pin) = netlist.net(pin.net).driver else {
            return true;
        };
        let driver_type = netlist.cell(netlist.pin(driver_pin).cell).cell_type;
        let loc = self.topo.bel(bel).loc;
        let allowed = self
            .topo
            .tile_type(loc.x, loc.y)
            .map(|t| self.tile_unique_bel_types(t).contains(&driver_type))
            .unwrap_or(false);
        if !allowed && explain {
            sink.emit(
                Diagnostic::note(
                    TRACE_INTERNAL_PIN,
                    format!(
                        "internal pin {} cannot be driven by off-tile type {}",
                        interner.resolve(pin.port),
                        interner.resolve(driver_type)
                    ),
                ),
            );
        }
        allowed
    }

    /// Every user of an output net that already has a bound sink wire
    /// must be reachable from the driver's source wire. Users without a
    /// bound sink are satisfiable; downstream is simply not placed yet.
    fn check_output_net(
        &self,
        netlist: &Netlist,
        cache: &mut PathCache,
        bel: BelId,
        driver_pin: crate::ids::PinId,
        explain: bool,
        interner: &Interner,
        sink: &DiagnosticSink,
    ) -> WeftResult<bool> {
        let pin = netlist.pin(driver_pin);
        let Some(src) = self.topo.pin_wire(bel, pin.port) else {
            return Err(InternalError::new(format!(
                "driver port {} has no source wire on bel {}",
                interner.resolve(pin.port),
                interner.resolve(self.topo.bel(bel).name)
            )));
        };
        for &user_pin in &netlist.net(pin.net).users {
            let Some(dst) = netlist.pin_wire(self.topo, user_pin) else {
                continue;
            };
            let hit = cache.contains(src, dst);
            let reachable = self.oracle.reachable(cache, src, dst);
            if explain {
                sink.emit(
                    Diagnostic::note(
                        TRACE_REACH,
                        format!(
                            "{} -> {}: {} ({})",
                            self.topo.wire(src).name,
                            self.topo.wire(dst).name,
                            if reachable { "reachable" } else { "unreachable" },
                            if hit { "cache hit" } else { "cache miss" }
                        ),
                    ),
                );
            }
            if !reachable {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Netlist;
    use weft_fabric::{BelPin, FabricBuilder, FabricModel, Loc, PinDir};

    struct Fixture {
        interner: Interner,
        fabric: FabricModel,
        luts: Vec<BelId>,
        ffs: Vec<BelId>,
        lut_type: Ident,
        ff_type: Ident,
    }

    /// One LOGIC tile, two contexts, one LUT site and one FF site. The
    /// LUT output wire reaches the FF D wire through one pip; the FF D
    /// pin wiring is internal to the tile.
    fn fixture(connect: bool) -> Fixture {
        let interner = Interner::new();
        let logic = interner.get_or_intern("LOGIC");
        let lut_type = interner.get_or_intern("LUT4");
        let ff_type = interner.get_or_intern("FF");
        let o = interner.get_or_intern("O");
        let d = interner.get_or_intern("D");
        let mut b = FabricBuilder::new(2);
        b.add_tile(0, 0, logic);
        let lut_o = b.add_wire("lut_o");
        let ff_d = b.add_wire("ff_d");
        if connect {
            b.add_pip(lut_o, ff_d);
        }
        let lut_site = interner.get_or_intern("X0Y0_L0");
        let ff_site = interner.get_or_intern("X0Y0_F0");
        let lut_pins = |w| {
            vec![BelPin {
                name: o,
                dir: PinDir::Output,
                internal: false,
                wire: Some(w),
            }]
        };
        let ff_pins = |w| {
            vec![BelPin {
                name: d,
                dir: PinDir::Input,
                internal: true,
                wire: Some(w),
            }]
        };
        let luts = (0..2)
            .map(|ctx| b.add_bel(Loc::new(0, 0, 0), lut_site, lut_type, ctx, lut_pins(lut_o)))
            .collect();
        let ffs = (0..2)
            .map(|ctx| b.add_bel(Loc::new(0, 0, 1), ff_site, ff_type, ctx, ff_pins(ff_d)))
            .collect();
        Fixture {
            interner,
            fabric: b.finish(),
            luts,
            ffs,
            lut_type,
            ff_type,
        }
    }

    fn checker(fx: &Fixture, min_ii: u32) -> LegalityChecker<'_, FabricModel> {
        let share = ResourceShareIndex::build(&fx.fabric, min_ii);
        LegalityChecker::new(&fx.fabric, share, HashSet::new())
    }

    /// lut cell driving an ff cell through one net.
    fn lut_ff_netlist(fx: &Fixture) -> (Netlist, crate::ids::CellId, crate::ids::CellId) {
        let mut nl = Netlist::new();
        let lut = nl.add_cell(fx.interner.get_or_intern("lut0"), fx.lut_type);
        let ff = nl.add_cell(fx.interner.get_or_intern("ff0"), fx.ff_type);
        let net = nl.add_net(fx.interner.get_or_intern("q"));
        nl.connect_driver(lut, fx.interner.get_or_intern("O"), net);
        nl.connect_user(ff, fx.interner.get_or_intern("D"), net);
        (nl, lut, ff)
    }

    #[test]
    fn empty_site_is_legal() {
        let fx = fixture(true);
        let checker = checker(&fx, 1);
        let nl = Netlist::new();
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();
        for &bel in fx.luts.iter().chain(&fx.ffs) {
            assert!(checker
                .is_legal(&nl, &mut cache, bel, false, &fx.interner, &sink)
                .unwrap());
        }
    }

    #[test]
    fn exempt_type_is_always_legal() {
        let fx = fixture(false);
        let share = ResourceShareIndex::build(&fx.fabric, 1);
        let mut exempt = HashSet::new();
        exempt.insert(fx.ff_type);
        let checker = LegalityChecker::new(&fx.fabric, share, exempt);

        let (mut nl, _, ff) = lut_ff_netlist(&fx);
        // No pip connects the tile, but the FF bel type is exempt.
        nl.bind(ff, fx.ffs[0]);
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();
        assert!(checker
            .is_legal(&nl, &mut cache, fx.ffs[0], false, &fx.interner, &sink)
            .unwrap());
    }

    #[test]
    fn exclusivity_rejects_conflicting_contexts() {
        let fx = fixture(true);
        let checker = checker(&fx, 1);
        let (mut nl, lut, _) = lut_ff_netlist(&fx);
        let other = nl.add_cell(fx.interner.get_or_intern("lut1"), fx.lut_type);

        nl.bind(lut, fx.luts[0]);
        nl.bind(other, fx.luts[1]);
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();
        // min_ii 1 makes both contexts of the site mutually exclusive.
        assert!(!checker
            .is_legal(&nl, &mut cache, fx.luts[0], false, &fx.interner, &sink)
            .unwrap());
    }

    #[test]
    fn independent_contexts_coexist() {
        let fx = fixture(true);
        let checker = checker(&fx, 1);
        let (mut nl, lut, _) = lut_ff_netlist(&fx);
        nl.bind(lut, fx.luts[0]);
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();
        // The sibling context is empty, so the binding stands.
        assert!(checker
            .is_legal(&nl, &mut cache, fx.luts[0], false, &fx.interner, &sink)
            .unwrap());
    }

    #[test]
    fn unplaced_sink_is_satisfiable() {
        let fx = fixture(false);
        let checker = checker(&fx, 1);
        let (mut nl, lut, _ff) = lut_ff_netlist(&fx);
        nl.bind(lut, fx.luts[0]);
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();
        // No pip exists, but the FF is unbound, so nothing to check.
        assert!(checker
            .is_legal(&nl, &mut cache, fx.luts[0], false, &fx.interner, &sink)
            .unwrap());
    }

    #[test]
    fn unreachable_bound_sink_rejects() {
        let fx = fixture(false);
        let checker = checker(&fx, 1);
        let (mut nl, lut, ff) = lut_ff_netlist(&fx);
        nl.bind(lut, fx.luts[0]);
        nl.bind(ff, fx.ffs[0]);
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();
        assert!(!checker
            .is_legal(&nl, &mut cache, fx.luts[0], false, &fx.interner, &sink)
            .unwrap());
    }

    #[test]
    fn reachable_bound_sink_accepts() {
        let fx = fixture(true);
        let checker = checker(&fx, 1);
        let (mut nl, lut, ff) = lut_ff_netlist(&fx);
        nl.bind(lut, fx.luts[0]);
        nl.bind(ff, fx.ffs[0]);
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();
        assert!(checker
            .is_legal(&nl, &mut cache, fx.luts[0], false, &fx.interner, &sink)
            .unwrap());
        // The internal D pin is driven by an on-tile type, so the FF
        // side is legal too.
        assert!(checker
            .is_legal(&nl, &mut cache, fx.ffs[0], false, &fx.interner, &sink)
            .unwrap());
    }

    #[test]
    fn unreachable_user_rejects_despite_satisfiable_sibling() {
        // Strict per-user aggregation: an unbound sibling user on the
        // same net does not rescue a bound, unreachable one. A
        // per-net-any-user reading would accept this binding.
        let fx = fixture(false);
        let checker = checker(&fx, 1);
        let (mut nl, lut, ff) = lut_ff_netlist(&fx);
        let net = nl.pin(nl.cell(ff).pins[0]).net;
        let unbound = nl.add_cell(fx.interner.get_or_intern("ff1"), fx.ff_type);
        nl.connect_user(unbound, fx.interner.get_or_intern("D"), net);
        nl.bind(lut, fx.luts[0]);
        nl.bind(ff, fx.ffs[0]);
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();
        assert!(!checker
            .is_legal(&nl, &mut cache, fx.luts[0], false, &fx.interner, &sink)
            .unwrap());
    }

    #[test]
    fn internal_pin_rejects_off_tile_driver_type() {
        let fx = fixture(true);
        let checker = checker(&fx, 1);
        let mut nl = Netlist::new();
        // A driver type that exists on no LOGIC tile.
        let alien = nl.add_cell(
            fx.interner.get_or_intern("bram0"),
            fx.interner.get_or_intern("BRAM"),
        );
        let ff = nl.add_cell(fx.interner.get_or_intern("ff0"), fx.ff_type);
        let net = nl.add_net(fx.interner.get_or_intern("n"));
        nl.connect_driver(alien, fx.interner.get_or_intern("O"), net);
        nl.connect_user(ff, fx.interner.get_or_intern("D"), net);
        nl.bind(ff, fx.ffs[0]);
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();
        assert!(!checker
            .is_legal(&nl, &mut cache, fx.ffs[0], false, &fx.interner, &sink)
            .unwrap());
    }

    #[test]
    fn missing_source_wire_is_fatal() {
        let fx = fixture(true);
        let checker = checker(&fx, 1);
        let mut nl = Netlist::new();
        let lut = nl.add_cell(fx.interner.get_or_intern("lut0"), fx.lut_type);
        let ff = nl.add_cell(fx.interner.get_or_intern("ff0"), fx.ff_type);
        let net = nl.add_net(fx.interner.get_or_intern("n"));
        // Port Q does not exist on the LUT bel.
        nl.connect_driver(lut, fx.interner.get_or_intern("Q"), net);
        nl.connect_user(ff, fx.interner.get_or_intern("D"), net);
        nl.bind(lut, fx.luts[0]);
        nl.bind(ff, fx.ffs[0]);
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();
        let err = checker
            .is_legal(&nl, &mut cache, fx.luts[0], false, &fx.interner, &sink)
            .unwrap_err();
        assert!(err.message.contains("no source wire"));
    }

    #[test]
    fn explain_emits_trace_without_changing_verdict() {
        let fx = fixture(true);
        let checker = checker(&fx, 1);
        let (mut nl, lut, ff) = lut_ff_netlist(&fx);
        nl.bind(lut, fx.luts[0]);
        nl.bind(ff, fx.ffs[0]);
        let mut cache = PathCache::new();
        let sink = DiagnosticSink::new();

        let quiet = checker
            .is_legal(&nl, &mut cache, fx.luts[0], false, &fx.interner, &sink)
            .unwrap();
        assert!(sink.is_empty());

        let loud = checker
            .is_legal(&nl, &mut cache, fx.luts[0], true, &fx.interner, &sink)
            .unwrap();
        assert_eq!(quiet, loud);
        let diags = sink.take_all();
        assert!(!diags.is_empty());
        // The pair was cached by the quiet call.
        assert!(diags.iter().any(|d| d.message.contains("cache hit")));
        assert!(!sink.has_errors());
    }

    #[test]
    fn unique_bel_type_table_first_tile_wins() {
        let fx = fixture(true);
        let checker = checker(&fx, 1);
        let logic = fx.interner.get_or_intern("LOGIC");
        let types = checker.tile_unique_bel_types(logic);
        assert_eq!(types, &[fx.lut_type, fx.ff_type]);
        assert!(checker
            .tile_unique_bel_types(fx.interner.get_or_intern("BRAM_TILE"))
            .is_empty());
    }
}
