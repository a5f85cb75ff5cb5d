//! Structural data types for the time-multiplexed fabric.
//!
//! Bels, their pins, wires, and pips form the read-only topology that the
//! placement core queries. Type tags are interned [`Ident`]s rather than
//! closed enums: the bel vocabulary comes from the host device database
//! and differs per fabric generation.

use crate::ids::{BelId, PipId, WireId};
use serde::{Deserialize, Serialize};
use weft_common::Ident;

/// A placement location: tile coordinate plus the local bel index within
/// the tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loc {
    /// Tile column.
    pub x: i32,
    /// Tile row.
    pub y: i32,
    /// Local index within the tile.
    pub z: i32,
}

impl Loc {
    /// Creates a new location.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// The direction of a bel pin relative to the bel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDir {
    /// The pin consumes a signal.
    Input,
    /// The pin drives a signal.
    Output,
}

/// A pin on a bel.
///
/// The `internal` flag marks pins whose wiring never leaves the tile; the
/// legality checker requires drivers of such pins to be placeable in the
/// same tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BelPin {
    /// The port name this pin corresponds to (e.g. `D`, `O`, `I[2]`).
    pub name: Ident,
    /// Direction of the pin.
    pub dir: PinDir,
    /// Whether the pin's wiring is internal to the tile.
    pub internal: bool,
    /// The fabric wire this pin attaches to, if any.
    pub wire: Option<WireId>,
}

/// A bel: a physical, placeable fabric resource location.
///
/// On a time-multiplexed fabric, one physical site appears as
/// `context_count` bels sharing the same physical name and differing only
/// in `context`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bel {
    /// The unique ID of this bel.
    pub id: BelId,
    /// The physical site name, shared by all time-context instances of
    /// the same site.
    pub name: Ident,
    /// The functional type tag (e.g. `LUT4`, `FF`, `GENERIC_IOB`).
    pub bel_type: Ident,
    /// The location of this bel in the fabric grid.
    pub loc: Loc,
    /// The time-multiplexing context of this bel, in
    /// `[0, context_count)`.
    pub context: u32,
    /// The pins of this bel.
    pub pins: Vec<BelPin>,
}

impl Bel {
    /// Returns the pin with the given port name, if present.
    pub fn pin(&self, name: Ident) -> Option<&BelPin> {
        self.pins.iter().find(|p| p.name == name)
    }
}

/// A routing wire segment in the fabric interconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wire {
    /// The unique ID of this wire.
    pub id: WireId,
    /// The name of this wire (for diagnostics).
    pub name: String,
}

/// A pip: a directed, programmable edge from one wire to another,
/// intra- or inter-tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pip {
    /// The unique ID of this pip.
    pub id: PipId,
    /// The source wire driving this pip.
    pub src_wire: WireId,
    /// The destination wire this pip drives.
    pub dst_wire: WireId,
}
