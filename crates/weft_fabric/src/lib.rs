//! Device-topology model for the Weft placement core.
//!
//! This crate provides the read-only [`FabricTopology`] trait that the
//! legality checker and cluster engine consume, the in-memory
//! [`FabricModel`] implementation with its builder, the packing-rule
//! tables matched by the cluster engine, and the fabric registry mapping
//! device names to model factories.
//!
//! # Usage
//!
//! ```
//! use weft_common::Interner;
//! use weft_fabric::{FabricBuilder, FabricTopology};
//!
//! let interner = Interner::new();
//! let mut b = FabricBuilder::new(2);
//! b.add_tile(0, 0, interner.get_or_intern("LOGIC"));
//! let fabric = b.finish();
//! assert_eq!(fabric.context_count(), 2);
//! ```

#![warn(missing_docs)]

pub mod ids;
pub mod registry;
pub mod rules;
pub mod topology;
pub mod types;

pub use ids::{BelId, PipId, WireId};
pub use registry::FabricRegistry;
pub use rules::{expand_rules, CellTypePort, PackingRule, RuleFlags};
pub use topology::{FabricBuilder, FabricModel, FabricTopology};
pub use types::{Bel, BelPin, Loc, PinDir, Pip, Wire};
