//! Retry wrapper around an externally supplied placement search.
//!
//! The legality predicate makes the feasible region highly sensitive to
//! move order, so a failed trial is retried with fresh randomness
//! rather than treated as definitive.

use crate::data::Netlist;
use crate::reach::PathCache;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use weft_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

const TRIAL_FAILED: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 201,
};

/// Runs an external placer up to a fixed number of trials.
pub struct PlacementRetryDriver {
    trials: u32,
}

impl PlacementRetryDriver {
    /// Creates a driver with the given trial budget.
    ///
    /// # Panics
    ///
    /// Panics if `trials` is 0; settings validation rejects that.
    pub fn new(trials: u32) -> Self {
        assert!(trials >= 1, "trial budget must be at least 1");
        Self { trials }
    }

    /// Runs the placer until it succeeds or the budget is spent,
    /// returning the last trial's outcome.
    ///
    /// Each trial starts from an empty cache and, after the first, from
    /// a fully unbound netlist; the placer receives the cache and a
    /// fresh seed drawn from `seed` (or entropy when absent).
    pub fn run<P>(
        &self,
        netlist: &mut Netlist,
        cache: &mut PathCache,
        seed: Option<u64>,
        sink: &DiagnosticSink,
        mut placer: P,
    ) -> bool
    where
        P: FnMut(&mut Netlist, &mut PathCache, u64) -> bool,
    {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        for trial in 1..=self.trials {
            cache.reset();
            let trial_seed: u64 = rng.gen();
            if placer(netlist, cache, trial_seed) {
                return true;
            }
            netlist.unbind_all();
            sink.emit(Diagnostic::warning(
                TRIAL_FAILED,
                format!("placement trial {trial} of {} failed", self.trials),
            ));
        }
        false
    }
}
