//! Placer settings: TOML-deserializable knobs validated against the
//! fabric before placement starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weft_fabric::FabricTopology;

/// Errors raised while loading or validating placer settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings text was not valid TOML.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings are well-formed but inconsistent with the fabric.
    #[error("invalid settings: {0}")]
    Validation(String),
}

/// Knobs for a placement run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlacerSettings {
    /// The context-slot stride for exclusivity. Defaults to
    /// `ceil(cell_count / real_bel_count)` when absent.
    #[serde(default)]
    pub min_ii: Option<u32>,

    /// Number of placement trials before giving up.
    #[serde(default = "default_place_trials")]
    pub place_trials: u32,

    /// Seed for the trial RNG; fresh entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_place_trials() -> u32 {
    1
}

impl Default for PlacerSettings {
    fn default() -> Self {
        Self {
            min_ii: None,
            place_trials: default_place_trials(),
            seed: None,
        }
    }
}

/// Parses settings from TOML text.
///
/// # Errors
///
/// Returns an error on malformed TOML, unknown keys, or a zero trial
/// budget.
pub fn load_settings_from_str(text: &str) -> Result<PlacerSettings, SettingsError> {
    let settings: PlacerSettings = toml::from_str(text)?;
    if settings.place_trials == 0 {
        return Err(SettingsError::Validation(
            "place_trials must be at least 1".into(),
        ));
    }
    if settings.min_ii == Some(0) {
        return Err(SettingsError::Validation("min_ii must be at least 1".into()));
    }
    Ok(settings)
}

impl PlacerSettings {
    /// Resolves the effective `min_ii` for the given fabric and design
    /// size.
    ///
    /// When unset, defaults to `ceil(cell_count / real_bel_count)`,
    /// clamped to at least 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved value is 0 or exceeds the
    /// context count of a time-multiplexed fabric.
    pub fn resolve_min_ii<T: FabricTopology + ?Sized>(
        &self,
        topo: &T,
        cell_count: usize,
    ) -> Result<u32, SettingsError> {
        let resolved = match self.min_ii {
            Some(0) => {
                return Err(SettingsError::Validation("min_ii must be at least 1".into()))
            }
            Some(m) => m,
            None => {
                let sites = topo.real_bel_count() as usize;
                if sites == 0 {
                    1
                } else {
                    (cell_count.div_ceil(sites) as u32).max(1)
                }
            }
        };
        let contexts = topo.context_count();
        if contexts > 1 && resolved > contexts {
            return Err(SettingsError::Validation(format!(
                "min_ii {resolved} exceeds the fabric's {contexts} contexts"
            )));
        }
        Ok(resolved)
    }
}
