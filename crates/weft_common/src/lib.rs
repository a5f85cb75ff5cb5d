//! Shared foundational types for the Weft placement core.
//!
//! This crate provides interned identifiers, the generic arena used for
//! ID-indexed storage of netlist and fabric entities, and the common
//! result types used by the fatal error paths.

#![warn(missing_docs)]

pub mod arena;
pub mod ident;
pub mod result;

pub use arena::{Arena, ArenaId};
pub use ident::{Ident, Interner};
pub use result::{InternalError, WeftResult};
