//! Netlist preparation passes run before the cluster engine.
//!
//! Host synthesis output carries scaffolding the fabric has no use for:
//! pass-through I/O buffer cells, dedicated GND/VCC driver cells, and
//! constant units whose value never got fully defined. These passes
//! strip that scaffolding. Removals tombstone arena slots, so every
//! surviving cell and net keeps its ID.

use crate::data::{Netlist, ParamValue};
use std::collections::HashMap;
use weft_common::{Ident, Interner};
use weft_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

const REMOVED_BUFFER: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 101,
};
const UNDRIVEN_CONSTANT: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 102,
};

/// The pad-side and fabric-side port names of an I/O buffer cell type.
#[derive(Debug, Clone, Copy)]
pub struct BufferPorts {
    /// The port facing the package pad.
    pub pad: Ident,
    /// The port facing the fabric interconnect.
    pub fabric: Ident,
}

/// A dedicated constant-driver cell type (GND or VCC style).
#[derive(Debug, Clone, Copy)]
pub struct ConstantDriver {
    /// The driver cell type.
    pub cell_type: Ident,
    /// The output port carrying the constant.
    pub port: Ident,
    /// The constant value driven.
    pub value: bool,
}

/// Host-supplied vocabulary for the preparation passes.
///
/// The cell types involved are a property of the host cell library, not
/// of this core, so they arrive as interned names.
#[derive(Default)]
pub struct PrepConfig {
    /// I/O buffer cell types and their port pair.
    pub io_buffers: HashMap<Ident, BufferPorts>,
    /// Constant-driver cell types.
    pub constant_drivers: Vec<ConstantDriver>,
    /// The constant-unit cell type whose value parameter must be fully
    /// defined, paired with that parameter's name.
    pub constant_unit: Option<(Ident, Ident)>,
}

/// Deletes pass-through I/O buffer cells.
///
/// The pad-side pin is disconnected and the fabric-side net removed
/// along with the buffer itself.
pub fn remove_io_buffers(
    netlist: &mut Netlist,
    config: &PrepConfig,
    interner: &Interner,
    sink: &DiagnosticSink,
) {
    for cell_id in netlist.cell_ids() {
        let cell = netlist.cell(cell_id);
        let Some(ports) = config.io_buffers.get(&cell.cell_type).copied() else {
            continue;
        };
        let name = interner.resolve(cell.name).to_string();
        let pins = cell.pins.clone();
        let mut fabric_net = None;
        for pin_id in pins {
            let pin = netlist.pin(pin_id);
            if pin.port == ports.fabric {
                fabric_net = Some(pin.net);
            }
        }
        if let Some(net) = fabric_net {
            netlist.remove_net(net);
        }
        netlist.remove_cell(cell_id);
        sink.emit(Diagnostic::note(
            REMOVED_BUFFER,
            format!("removed i/o buffer {name}"),
        ));
    }
}

/// Folds dedicated GND/VCC driver cells into user-port parameters.
///
/// Each user of a constant net gets a one-bit parameter named after its
/// port; the driver cell and the net are then removed.
pub fn fold_constants(netlist: &mut Netlist, config: &PrepConfig) {
    for cell_id in netlist.cell_ids() {
        let cell = netlist.cell(cell_id);
        let Some(driver) = config
            .constant_drivers
            .iter()
            .find(|d| d.cell_type == cell.cell_type)
            .copied()
        else {
            continue;
        };
        let mut const_net = None;
        for &pin_id in &cell.pins {
            let pin = netlist.pin(pin_id);
            if pin.port == driver.port && netlist.net(pin.net).driver == Some(pin_id) {
                const_net = Some(pin.net);
            }
        }
        if let Some(net) = const_net {
            for user_pin in netlist.net(net).users.clone() {
                let pin = netlist.pin(user_pin);
                let (user_cell, port) = (pin.cell, pin.port);
                netlist
                    .cell_mut(user_cell)
                    .params
                    .insert(port, ParamValue::Bits(vec![Some(driver.value)]));
            }
            netlist.remove_net(net);
        }
        netlist.remove_cell(cell_id);
    }
}

/// Removes constant-unit drivers whose value parameter is missing or
/// not fully defined, along with the nets they drive.
pub fn remove_undriven_constants(
    netlist: &mut Netlist,
    config: &PrepConfig,
    interner: &Interner,
    sink: &DiagnosticSink,
) {
    let Some((unit_type, value_param)) = config.constant_unit else {
        return;
    };
    for cell_id in netlist.cell_ids() {
        let cell = netlist.cell(cell_id);
        if cell.cell_type != unit_type {
            continue;
        }
        let defined = cell
            .params
            .get(&value_param)
            .map(|v| v.is_fully_defined())
            .unwrap_or(false);
        if defined {
            continue;
        }
        let name = interner.resolve(cell.name).to_string();
        let driven: Vec<_> = cell
            .pins
            .iter()
            .map(|&p| netlist.pin(p))
            .filter(|p| netlist.net(p.net).driver.map(|d| netlist.pin(d).cell) == Some(cell_id))
            .map(|p| p.net)
            .collect();
        for net in driven {
            netlist.remove_net(net);
        }
        netlist.remove_cell(cell_id);
        sink.emit(Diagnostic::warning(
            UNDRIVEN_CONSTANT,
            format!("removed constant unit {name} with undefined value"),
        ));
    }
}
