//! Packing-rule tables matched by the cluster constraint engine.
//!
//! A packing rule pairs a driver (cell-type, port) pattern with a user
//! (cell-type, port) pattern and an offset: when a net connects a
//! matching driver port to a matching user port, the two cells are linked
//! into one rigid placement cluster. Rule tables are opaque read-only
//! input from the host device database.

use serde::{Deserialize, Serialize};
use weft_common::{Ident, Interner};

/// A (cell type, port) pattern used on either side of a packing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellTypePort {
    /// The cell type to match.
    pub cell_type: Ident,
    /// The port name to match.
    pub port: Ident,
}

impl CellTypePort {
    /// Creates a new pattern.
    pub fn new(cell_type: Ident, port: Ident) -> Self {
        Self { cell_type, port }
    }
}

/// Flags controlling how a packing rule's offsets are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleFlags {
    /// BASE: the cluster root's z starts at the rule's `base_z`.
    pub base: bool,
    /// ABSOLUTE: the child's offset is fixed from the fabric origin
    /// rather than relative to the driver cell.
    pub absolute: bool,
}

/// A declarative driver/user port-pair pattern with an associated
/// placement offset.
///
/// A rule with `width > 1` matches the indexed forms of both ports
/// (`D[0]`, `D[1]`, …); [`expand_rules`] turns it into per-bit rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingRule {
    /// The driver-side pattern.
    pub driver: CellTypePort,
    /// The user-side pattern.
    pub user: CellTypePort,
    /// Bus width; 1 for scalar ports.
    pub width: u32,
    /// The cluster root's base z (applies when `flags.base`).
    pub base_z: i32,
    /// Relative x offset of the user cell.
    pub rel_x: i32,
    /// Relative y offset of the user cell.
    pub rel_y: i32,
    /// Relative z offset of the user cell.
    pub rel_z: i32,
    /// Interpretation flags.
    pub flags: RuleFlags,
}

impl PackingRule {
    /// Returns `true` if this is a BASE rule.
    pub fn is_base(&self) -> bool {
        self.flags.base
    }

    /// Returns `true` if this is an ABSOLUTE rule.
    pub fn is_absolute(&self) -> bool {
        self.flags.absolute
    }
}

/// Expands rule-table entries into scalar per-bit rules.
///
/// A rule of width N becomes N rules whose driver and user port names are
/// the indexed forms `P[i]`; width-1 rules pass through unchanged.
pub fn expand_rules(rules: &[PackingRule], interner: &Interner) -> Vec<PackingRule> {
    let mut expanded = Vec::new();
    for rule in rules {
        if rule.width > 1 {
            for i in 0..rule.width {
                let mut bit = *rule;
                bit.width = 1;
                bit.driver.port =
                    interner.get_or_intern_indexed(interner.resolve(rule.driver.port), i);
                bit.user.port = interner.get_or_intern_indexed(interner.resolve(rule.user.port), i);
                expanded.push(bit);
            }
        } else {
            expanded.push(*rule);
        }
    }
    expanded
}
