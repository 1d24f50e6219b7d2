//! Read-only tuning knobs consumed by the farming systems.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::KeyBinding;

/// Configuration recognised by the farming systems.
///
/// Every field falls back to its default when omitted from a TOML document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Key used to walk toward a cursor position.
    pub movement_key: KeyBinding,
    /// Key bound to the fast-travel skill substituted for walking.
    pub blink_key: KeyBinding,
    /// Key bound to the main attack skill.
    pub combat_key: KeyBinding,
    /// Radius around a position within which unrevealed chunks count toward its exploration score.
    pub view_distance: u32,
    /// Radius within which monsters count as in combat range.
    pub combat_distance: u32,
    /// Side length, in grid cells, of an exploration chunk.
    pub chunk_resolution: u32,
    /// Radius, in pixels, of the circle off-screen cursor targets are clamped onto.
    pub clamp_size: u32,
    /// Radius within which a waypoint or interaction target counts as reached.
    pub node_size: u32,
    /// Number of storable inventory items that triggers a stash run.
    pub store_inventory_count: u32,
    /// Seconds to wait after a wave ends before starting the next one.
    pub wave_end_delay: u32,
    /// Number of waves after which the run is finished.
    pub max_waves: u32,
    /// Whether to trigger the mercenary support skill once per wave.
    pub mercenary_support: bool,
    /// Key bound to the mercenary support skill.
    pub mercenary_key: KeyBinding,
    /// Buff that must be kept active during combat.
    pub sustain_buff: String,
    /// Key that toggles the sustained buff.
    pub sustain_key: KeyBinding,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            movement_key: KeyBinding::from_static("E"),
            blink_key: KeyBinding::from_static("W"),
            combat_key: KeyBinding::from_static("Q"),
            view_distance: 90,
            combat_distance: 15,
            chunk_resolution: 10,
            clamp_size: 400,
            node_size: 20,
            store_inventory_count: 30,
            wave_end_delay: 5,
            max_waves: 15,
            mercenary_support: false,
            mercenary_key: KeyBinding::from_static("T"),
            sustain_buff: "righteous_fire".to_owned(),
            sustain_key: KeyBinding::from_static("R"),
        }
    }
}

/// Reasons a configuration may be rejected.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A numeric option lies outside its permitted range.
    #[error("`{name}` must lie within {min}..={max}, got {value}")]
    OutOfRange {
        /// Name of the offending option.
        name: &'static str,
        /// Value that was supplied.
        value: u32,
        /// Smallest permitted value.
        min: u32,
        /// Largest permitted value.
        max: u32,
    },
    /// A key binding was left empty.
    #[error("key binding `{name}` must not be empty")]
    EmptyKey {
        /// Name of the offending option.
        name: &'static str,
    },
    /// The TOML document could not be parsed.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Settings {
    /// Parses and validates settings from a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks every option against its permitted range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_range("view_distance", self.view_distance, 10..=500)?;
        check_range("combat_distance", self.combat_distance, 10..=500)?;
        check_range("chunk_resolution", self.chunk_resolution, 1..=100)?;
        check_range("clamp_size", self.clamp_size, 100..=1000)?;
        check_range("node_size", self.node_size, 10..=100)?;
        check_range("store_inventory_count", self.store_inventory_count, 10..=60)?;
        check_range("wave_end_delay", self.wave_end_delay, 1..=45)?;
        check_range("max_waves", self.max_waves, 1..=100)?;

        for (name, key) in [
            ("movement_key", &self.movement_key),
            ("blink_key", &self.blink_key),
            ("combat_key", &self.combat_key),
            ("mercenary_key", &self.mercenary_key),
            ("sustain_key", &self.sustain_key),
        ] {
            if key.name().trim().is_empty() {
                return Err(SettingsError::EmptyKey { name });
            }
        }

        Ok(())
    }

    /// Waypoint and interaction radius as a float.
    #[must_use]
    pub fn node_radius(&self) -> f32 {
        self.node_size as f32
    }

    /// Combat range as a float.
    #[must_use]
    pub fn combat_radius(&self) -> f32 {
        self.combat_distance as f32
    }

    /// Exploration view radius as a float.
    #[must_use]
    pub fn view_radius(&self) -> f32 {
        self.view_distance as f32
    }
}

fn check_range(
    name: &'static str,
    value: u32,
    range: RangeInclusive<u32>,
) -> Result<(), SettingsError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            name,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
