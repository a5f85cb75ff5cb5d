//! Explicit registry of fabric families.
//!
//! Maps device names to fabric-model factories through an ordered table
//! of matcher/factory pairs populated at startup. Lookup is
//! first-match-wins, so more specific matchers should be registered
//! first.

use crate::topology::FabricModel;
use weft_common::{InternalError, WeftResult};

/// A predicate deciding whether a family handles the given device name.
pub type DeviceMatcher = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// A factory producing a fabric model for a matched device name.
pub type FabricFactory = Box<dyn Fn(&str) -> WeftResult<FabricModel> + Send + Sync>;

struct RegistryEntry {
    family: String,
    matcher: DeviceMatcher,
    factory: FabricFactory,
}

/// An ordered table from device-name matcher to fabric factory.
///
/// Families are registered explicitly at startup; there is no reliance on
/// static-initialization order.
#[derive(Default)]
pub struct FabricRegistry {
    entries: Vec<RegistryEntry>,
}

impl FabricRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a family with its device matcher and factory.
    pub fn register(
        &mut self,
        family: impl Into<String>,
        matcher: impl Fn(&str) -> bool + Send + Sync + 'static,
        factory: impl Fn(&str) -> WeftResult<FabricModel> + Send + Sync + 'static,
    ) {
        self.entries.push(RegistryEntry {
            family: family.into(),
            matcher: Box::new(matcher),
            factory: Box::new(factory),
        });
    }

    /// Returns the names of all registered families, in registration
    /// order.
    pub fn families(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.family.as_str()).collect()
    }

    /// Returns the family name that would handle the given device, if
    /// any.
    pub fn match_device(&self, device: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| (e.matcher)(device))
            .map(|e| e.family.as_str())
    }

    /// Creates a fabric model for the given device name.
    ///
    /// # Errors
    ///
    /// Returns an error if no registered family matches the device, or if
    /// the matched factory fails.
    pub fn create(&self, device: &str) -> WeftResult<FabricModel> {
        for entry in &self.entries {
            if (entry.matcher)(device) {
                return (entry.factory)(device);
            }
        }
        Err(InternalError::new(format!(
            "no fabric registered for device {device:?}"
        )))
    }
}
