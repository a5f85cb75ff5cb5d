//! The physical netlist: cells, nets, pins, and binding state.
//!
//! Cells, nets, and pins live in arenas keyed by `u32` IDs; preparation
//! passes tombstone removed entities so surviving IDs never shift.
//! Cluster membership is stored directly on cells as `CellId` links, and
//! the bel occupancy map is the single source of truth for which cell
//! sits on which site.

use crate::ids::{CellId, NetId, PinId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use weft_common::{Arena, Ident};
use weft_fabric::{BelId, FabricTopology, WireId};

/// A cell attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    /// A bit vector; `None` marks an undefined bit.
    Bits(Vec<Option<bool>>),
    /// A free-form text value.
    Text(String),
}

impl ParamValue {
    /// Returns `true` if this is a bit vector with every bit defined.
    pub fn is_fully_defined(&self) -> bool {
        match self {
            ParamValue::Bits(bits) => bits.iter().all(|b| b.is_some()),
            ParamValue::Text(_) => true,
        }
    }
}

/// A logical cell instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// The instance name.
    pub name: Ident,
    /// The functional type tag, matched against bel types and packing
    /// rules.
    pub cell_type: Ident,
    /// Attribute storage (folded constants land here).
    pub params: HashMap<Ident, ParamValue>,
    /// The bel this cell is currently bound to, if any.
    pub binding: Option<BelId>,
    /// The root of the cluster this cell belongs to, if any. A root
    /// points at itself.
    pub cluster: Option<CellId>,
    /// Cluster x offset relative to the root.
    pub offset_x: i32,
    /// Cluster y offset relative to the root.
    pub offset_y: i32,
    /// Cluster z offset; absolute from the fabric origin when `abs_z` is
    /// set, relative to the root otherwise.
    pub offset_z: i32,
    /// Whether `offset_z` is an absolute z position.
    pub abs_z: bool,
    /// Child cells of this cluster, in link order. Only roots have
    /// children.
    pub children: Vec<CellId>,
    /// The pins of this cell, in connection order.
    pub pins: Vec<PinId>,
}

impl Cell {
    /// Returns `true` if this cell is the root of its cluster.
    pub fn is_cluster_root(&self, id: CellId) -> bool {
        self.cluster == Some(id)
    }
}

/// A net connecting one driver pin to zero or more user pins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    /// The net name.
    pub name: Ident,
    /// The pin driving this net, if connected.
    pub driver: Option<PinId>,
    /// The pins consuming this net, in connection order.
    pub users: Vec<PinId>,
}

/// One connection point of a cell: a named port attached to a net.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    /// The cell this pin belongs to.
    pub cell: CellId,
    /// The port name; matched against bel pin names when bound.
    pub port: Ident,
    /// The net this pin is attached to.
    pub net: NetId,
}

/// The mutable netlist the placement core operates on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Netlist {
    cells: Arena<CellId, Cell>,
    nets: Arena<NetId, Net>,
    pins: Arena<PinId, Pin>,
    bound: HashMap<BelId, CellId>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cell with the given name and type, returning its ID.
    pub fn add_cell(&mut self, name: Ident, cell_type: Ident) -> CellId {
        self.cells.alloc(Cell {
            name,
            cell_type,
            params: HashMap::new(),
            binding: None,
            cluster: None,
            offset_x: 0,
            offset_y: 0,
            offset_z: 0,
            abs_z: false,
            children: Vec::new(),
            pins: Vec::new(),
        })
    }

    /// Adds a net with the given name, returning its ID.
    pub fn add_net(&mut self, name: Ident) -> NetId {
        self.nets.alloc(Net {
            name,
            driver: None,
            users: Vec::new(),
        })
    }

    /// Connects a cell port as the driver of a net.
    ///
    /// # Panics
    ///
    /// Panics if the net already has a driver.
    pub fn connect_driver(&mut self, cell: CellId, port: Ident, net: NetId) -> PinId {
        assert!(
            self.nets[net].driver.is_none(),
            "net already has a driver"
        );
        let pin = self.pins.alloc(Pin { cell, port, net });
        self.nets[net].driver = Some(pin);
        self.cells[cell].pins.push(pin);
        pin
    }

    /// Connects a cell port as a user of a net.
    pub fn connect_user(&mut self, cell: CellId, port: Ident, net: NetId) -> PinId {
        let pin = self.pins.alloc(Pin { cell, port, net });
        self.nets[net].users.push(pin);
        self.cells[cell].pins.push(pin);
        pin
    }

    /// Disconnects a pin from its net and cell, tombstoning the pin.
    pub fn disconnect(&mut self, pin: PinId) {
        let Some(p) = self.pins.remove(pin) else {
            return;
        };
        if self.nets.contains(p.net) {
            let n = &mut self.nets[p.net];
            if n.driver == Some(pin) {
                n.driver = None;
            }
            n.users.retain(|&u| u != pin);
        }
        if self.cells.contains(p.cell) {
            self.cells[p.cell].pins.retain(|&c| c != pin);
        }
    }

    /// Removes a net, disconnecting its driver and all users.
    pub fn remove_net(&mut self, net: NetId) {
        let Some(n) = self.nets.try_get(net) else {
            return;
        };
        let mut pins: Vec<PinId> = n.users.clone();
        if let Some(d) = n.driver {
            pins.push(d);
        }
        for pin in pins {
            self.disconnect(pin);
        }
        self.nets.remove(net);
    }

    /// Removes a cell, disconnecting its pins and releasing its binding.
    ///
    /// The cell must not belong to a cluster; preparation passes run
    /// before the cluster engine.
    pub fn remove_cell(&mut self, cell: CellId) {
        let Some(c) = self.cells.try_get(cell) else {
            return;
        };
        assert!(c.cluster.is_none(), "removing a clustered cell");
        let pins = c.pins.clone();
        for pin in pins {
            self.disconnect(pin);
        }
        if let Some(bel) = self.cells[cell].binding {
            self.bound.remove(&bel);
        }
        self.cells.remove(cell);
    }

    /// Binds a cell to a bel.
    ///
    /// # Panics
    ///
    /// Panics if the bel is already occupied or the cell already bound.
    pub fn bind(&mut self, cell: CellId, bel: BelId) {
        assert!(self.cells[cell].binding.is_none(), "cell already bound");
        let prev = self.bound.insert(bel, cell);
        assert!(prev.is_none(), "bel already occupied");
        self.cells[cell].binding = Some(bel);
    }

    /// Releases a cell's binding, if it has one.
    pub fn unbind(&mut self, cell: CellId) {
        if let Some(bel) = self.cells[cell].binding.take() {
            self.bound.remove(&bel);
        }
    }

    /// Releases every binding in the netlist.
    pub fn unbind_all(&mut self) {
        let bound: Vec<CellId> = self.bound.values().copied().collect();
        for cell in bound {
            self.cells[cell].binding = None;
        }
        self.bound.clear();
    }

    /// Returns the cell bound to the given bel, if any.
    pub fn cell_at(&self, bel: BelId) -> Option<CellId> {
        self.bound.get(&bel).copied()
    }

    /// Returns the cell with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the cell was removed.
    pub fn cell(&self, id: CellId) -> &Cell {
        self.cells.get(id)
    }

    /// Returns a mutable reference to the cell with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the cell was removed.
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        self.cells.get_mut(id)
    }

    /// Returns the cell with the given ID, or `None` if removed.
    pub fn try_cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.try_get(id)
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &Net {
        self.nets.get(id)
    }

    /// Returns the net with the given ID, or `None` if removed.
    pub fn try_net(&self, id: NetId) -> Option<&Net> {
        self.nets.try_get(id)
    }

    /// Returns the pin with the given ID.
    pub fn pin(&self, id: PinId) -> &Pin {
        self.pins.get(id)
    }

    /// Returns the IDs of all live cells, in allocation order.
    pub fn cell_ids(&self) -> Vec<CellId> {
        self.cells.ids().collect()
    }

    /// Returns the IDs of all live nets, in allocation order.
    pub fn net_ids(&self) -> Vec<NetId> {
        self.nets.ids().collect()
    }

    /// Returns the number of live cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns the fabric wire a pin maps to through its cell's binding,
    /// or `None` if the cell is unbound or the bound bel has no such
    /// port wire.
    pub fn pin_wire<T: FabricTopology + ?Sized>(&self, topo: &T, pin: PinId) -> Option<WireId> {
        let p = self.pins.get(pin);
        let bel = self.cells.get(p.cell).binding?;
        topo.pin_wire(bel, p.port)
    }
}
