//! Interned identifiers for cell types, port names, and tile types.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// An interned name for any vocabulary item supplied by the host device
/// database: bel types, cell types, port names, tile types.
///
/// Identifiers are `u32` indices into a session-wide interner, giving O(1)
/// equality and O(1) copying — both matter because the legality checker
/// compares type tags on every candidate move.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Creates an `Ident` from a raw `u32` index.
    ///
    /// Primarily for deserialization and testing; normal code should go
    /// through [`Interner::get_or_intern`].
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index of this identifier.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `Ident` wraps a `u32` which is always a valid `usize` on 32-bit
// and 64-bit platforms. `try_from_usize` rejects values that don't fit.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// Thread-safe string interner backed by [`lasso::ThreadedRodeo`].
///
/// All type tags, port names, and tile-type names are interned once when
/// the device database and netlist are loaded; the placement core then
/// works exclusively with [`Ident`] values.
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Interner {
    /// Creates a new empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns a string, returning its [`Ident`]. Re-interning an existing
    /// string returns the same identifier without allocating.
    pub fn get_or_intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// Interns the indexed form of a port name, e.g. `("D", 3)` → `D[3]`.
    ///
    /// Packing rules of width N expand into N per-bit rules whose port
    /// names carry a bit index in this form.
    pub fn get_or_intern_indexed(&self, base: &str, index: u32) -> Ident {
        self.rodeo.get_or_intern(format!("{base}[{index}]"))
    }

    /// Resolves an [`Ident`] back to its string value.
    ///
    /// # Panics
    ///
    /// Panics if the `Ident` was not created by this interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
