//! Resource legality and relative-placement constraints for a
//! time-multiplexed fabric.
//!
//! Given a netlist bound (even tentatively) to physical sites, this
//! crate decides whether each binding is legal and precomputes rigid
//! placement clusters before a search-based placer runs. The placement
//! search itself, routing, and device-database loading are external
//! collaborators.
//!
//! The pieces, in the order a host uses them:
//!
//! 1. [`prep`] passes strip synthesis scaffolding from the [`Netlist`].
//! 2. [`ClusterConstraintEngine`] matches packing rules and writes
//!    cluster annotations onto cells.
//! 3. [`PlacementRetryDriver`] wraps the host's placement search; each
//!    candidate move consults [`LegalityChecker::is_legal`], which
//!    composes the [`ResourceShareIndex`] exclusivity relation and the
//!    memoized [`ReachabilityOracle`].

#![warn(missing_docs)]

pub mod cluster;
pub mod data;
pub mod ids;
pub mod legality;
pub mod prep;
pub mod reach;
pub mod retry;
pub mod settings;
pub mod share;

pub use cluster::ClusterConstraintEngine;
pub use data::{Cell, Net, Netlist, ParamValue, Pin};
pub use ids::{CellId, NetId, PinId};
pub use legality::LegalityChecker;
pub use prep::{BufferPorts, ConstantDriver, PrepConfig};
pub use reach::{PathCache, ReachabilityOracle};
pub use retry::PlacementRetryDriver;
pub use settings::{load_settings_from_str, PlacerSettings, SettingsError};
pub use share::ResourceShareIndex;

use weft_diagnostics::DiagnosticSink;

/// Owns the mutable state of one placement attempt: the netlist, the
/// reachability memo table, and the diagnostic sink.
#[derive(Default)]
pub struct PlacementContext {
    /// The netlist being placed.
    pub netlist: Netlist,
    /// The reachability memo table for this attempt.
    pub cache: PathCache,
    /// Accumulated diagnostics.
    pub sink: DiagnosticSink,
}

impl PlacementContext {
    /// Creates a context around an existing netlist.
    pub fn new(netlist: Netlist) -> Self {
        Self {
            netlist,
            cache: PathCache::new(),
            sink: DiagnosticSink::new(),
        }
    }

    /// Runs the given retry driver over this context's state.
    pub fn run_trials<P>(
        &mut self,
        driver: &PlacementRetryDriver,
        seed: Option<u64>,
        placer: P,
    ) -> bool
    where
        P: FnMut(&mut Netlist, &mut PathCache, u64) -> bool,
    {
        driver.run(&mut self.netlist, &mut self.cache, seed, &self.sink, placer)
    }
}
