//! The read-only fabric topology seam and its in-memory implementation.
//!
//! The placement core consumes topology exclusively through the
//! [`FabricTopology`] trait: bel enumeration per tile, bel
//! type/location/context, pin flags and wire attachments, and the
//! downstream-pip fan-out of a wire. [`FabricModel`] is the concrete
//! implementation populated by host database loaders (and by tests via
//! [`FabricBuilder`]).

use crate::ids::{BelId, PipId, WireId};
use crate::types::{Bel, BelPin, Loc, Pip, Wire};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use weft_common::{Arena, Ident};

/// Read-only accessor for the fabric's placement and routing structure.
///
/// All methods are pure queries; the topology never changes during a
/// placement run.
pub trait FabricTopology {
    /// Returns the number of time-multiplexed contexts of this fabric.
    fn context_count(&self) -> u32;

    /// Returns the number of physical (non-time-multiplexed) sites.
    fn real_bel_count(&self) -> u32;

    /// Returns the grid dimensions as (width, height).
    fn grid_size(&self) -> (i32, i32);

    /// Returns the bel with the given ID.
    fn bel(&self, id: BelId) -> &Bel;

    /// Returns the IDs of all bels, in ID order.
    fn bel_ids(&self) -> Vec<BelId>;

    /// Returns the bels located on the tile at (x, y).
    fn bels_at(&self, x: i32, y: i32) -> &[BelId];

    /// Returns the tile type at (x, y), or `None` outside the grid.
    fn tile_type(&self, x: i32, y: i32) -> Option<Ident>;

    /// Returns the pips whose source is the given wire.
    fn pips_downhill(&self, wire: WireId) -> &[PipId];

    /// Returns the pip with the given ID.
    fn pip(&self, id: PipId) -> &Pip;

    /// Returns the wire with the given ID.
    fn wire(&self, id: WireId) -> &Wire;

    /// Returns the wire attached to the given bel pin, if the pin exists
    /// and has one.
    fn pin_wire(&self, bel: BelId, port: Ident) -> Option<WireId> {
        self.bel(bel).pin(port).and_then(|p| p.wire)
    }

    /// Returns the pin with the given port name on the given bel.
    fn pin(&self, bel: BelId, port: Ident) -> Option<&BelPin> {
        self.bel(bel).pin(port)
    }
}

/// The in-memory fabric model.
///
/// Built once (by a host database loader or [`FabricBuilder`]) and then
/// only read. The downstream-pip index is precomputed so reachability
/// queries never scan the pip arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricModel {
    context_count: u32,
    real_bel_count: u32,
    width: i32,
    height: i32,
    bels: Arena<BelId, Bel>,
    wires: Arena<WireId, Wire>,
    pips: Arena<PipId, Pip>,
    tiles: Vec<TileEntry>,
    #[serde(skip)]
    tile_index: HashMap<(i32, i32), usize>,
    #[serde(skip)]
    downhill: HashMap<WireId, Vec<PipId>>,
}

/// One tile of the fabric grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TileEntry {
    x: i32,
    y: i32,
    tile_type: Ident,
    bels: Vec<BelId>,
}

impl FabricModel {
    /// Rebuilds the derived indices (tile lookup, downstream pips) after
    /// deserialization.
    pub fn rebuild_indices(&mut self) {
        self.tile_index.clear();
        for (i, tile) in self.tiles.iter().enumerate() {
            self.tile_index.insert((tile.x, tile.y), i);
        }
        self.downhill.clear();
        for (id, pip) in self.pips.iter() {
            self.downhill.entry(pip.src_wire).or_default().push(id);
        }
    }
}

impl FabricTopology for FabricModel {
    fn context_count(&self) -> u32 {
        self.context_count
    }

    fn real_bel_count(&self) -> u32 {
        self.real_bel_count
    }

    fn grid_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn bel(&self, id: BelId) -> &Bel {
        self.bels.get(id)
    }

    fn bel_ids(&self) -> Vec<BelId> {
        self.bels.ids().collect()
    }

    fn bels_at(&self, x: i32, y: i32) -> &[BelId] {
        self.tile_index
            .get(&(x, y))
            .map(|&i| self.tiles[i].bels.as_slice())
            .unwrap_or(&[])
    }

    fn tile_type(&self, x: i32, y: i32) -> Option<Ident> {
        self.tile_index
            .get(&(x, y))
            .map(|&i| self.tiles[i].tile_type)
    }

    fn pips_downhill(&self, wire: WireId) -> &[PipId] {
        self.downhill
            .get(&wire)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn pip(&self, id: PipId) -> &Pip {
        self.pips.get(id)
    }

    fn wire(&self, id: WireId) -> &Wire {
        self.wires.get(id)
    }
}

/// Incremental constructor for [`FabricModel`].
///
/// Tiles must be added before the bels they contain. `finish` derives the
/// grid size, the physical-site count, and the downstream-pip index.
pub struct FabricBuilder {
    context_count: u32,
    bels: Arena<BelId, Bel>,
    wires: Arena<WireId, Wire>,
    pips: Arena<PipId, Pip>,
    tiles: Vec<TileEntry>,
    tile_index: HashMap<(i32, i32), usize>,
}

impl FabricBuilder {
    /// Creates a builder for a fabric with the given context count.
    pub fn new(context_count: u32) -> Self {
        Self {
            context_count,
            bels: Arena::new(),
            wires: Arena::new(),
            pips: Arena::new(),
            tiles: Vec::new(),
            tile_index: HashMap::new(),
        }
    }

    /// Adds a tile of the given type at (x, y).
    ///
    /// # Panics
    ///
    /// Panics if a tile already exists at (x, y).
    pub fn add_tile(&mut self, x: i32, y: i32, tile_type: Ident) {
        let prev = self.tile_index.insert((x, y), self.tiles.len());
        assert!(prev.is_none(), "duplicate tile at ({x}, {y})");
        self.tiles.push(TileEntry {
            x,
            y,
            tile_type,
            bels: Vec::new(),
        });
    }

    /// Adds a wire and returns its ID.
    pub fn add_wire(&mut self, name: impl Into<String>) -> WireId {
        let id = self.wires.alloc(Wire {
            id: WireId::from_raw(0),
            name: name.into(),
        });
        self.wires.get_mut(id).id = id;
        id
    }

    /// Adds a pip from `src` to `dst` and returns its ID.
    pub fn add_pip(&mut self, src: WireId, dst: WireId) -> PipId {
        let id = self.pips.alloc(Pip {
            id: PipId::from_raw(0),
            src_wire: src,
            dst_wire: dst,
        });
        self.pips.get_mut(id).id = id;
        id
    }

    /// Adds a bel at the given location and returns its ID.
    ///
    /// # Panics
    ///
    /// Panics if no tile exists at the bel's (x, y).
    pub fn add_bel(
        &mut self,
        loc: Loc,
        name: Ident,
        bel_type: Ident,
        context: u32,
        pins: Vec<BelPin>,
    ) -> BelId {
        let tile = *self
            .tile_index
            .get(&(loc.x, loc.y))
            .unwrap_or_else(|| panic!("no tile at ({}, {})", loc.x, loc.y));
        let id = self.bels.alloc(Bel {
            id: BelId::from_raw(0),
            name,
            bel_type,
            loc,
            context,
            pins,
        });
        self.bels.get_mut(id).id = id;
        self.tiles[tile].bels.push(id);
        id
    }

    /// Finalizes the fabric model.
    pub fn finish(self) -> FabricModel {
        let width = self.tiles.iter().map(|t| t.x + 1).max().unwrap_or(0);
        let height = self.tiles.iter().map(|t| t.y + 1).max().unwrap_or(0);
        let physical: std::collections::HashSet<Ident> =
            self.bels.values().map(|b| b.name).collect();
        let mut model = FabricModel {
            context_count: self.context_count,
            real_bel_count: physical.len() as u32,
            width,
            height,
            bels: self.bels,
            wires: self.wires,
            pips: self.pips,
            tiles: self.tiles,
            tile_index: HashMap::new(),
            downhill: HashMap::new(),
        };
        model.rebuild_indices();
        model
    }
}
