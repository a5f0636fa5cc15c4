#![forbid(unsafe_code)]

//! Home screen configuration as data.
//!
//! [`HomeConfig`] groups the grid dimensions, interaction thresholds and
//! arrangement policy. Every field has a default, so an empty document is
//! a valid configuration.
//!
//! ```toml
//! [grid]
//! columns = 5
//! rows = 6
//! layout_mode = "grid"
//!
//! [interaction]
//! long_press_ms = 450
//! edge_band_fraction = 0.12
//!
//! [arrangement]
//! unresolved = "leave_in_place"
//! ```
//!
//! ```rust,ignore
//! let config = HomeConfig::from_toml_file("homegrid.toml")?;
//! ```

#[cfg(feature = "config-file")]
use std::path::Path;

#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};

use homegrid_layout::GridConfig;
use web_time::Duration;

use crate::drag::{
    DEFAULT_EDGE_BAND_FRACTION, DEFAULT_EDGE_HOLD_DELAY, DEFAULT_FOLDER_ZONE_FRACTION,
    DEFAULT_LONG_PRESS, DEFAULT_NEW_PAGE_HOLD_DELAY, DEFAULT_PAGE_TURN_COOLDOWN,
    DEFAULT_TOUCH_SLOP, InteractionConfig,
};

/// Everything a [`HomeScreen`](crate::HomeScreen) needs to start.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct HomeConfig {
    pub grid: GridConfig,
    pub interaction: InteractionPolicyConfig,
    pub arrangement: ArrangementPolicy,
}

/// Serializable form of [`InteractionConfig`]; delays in milliseconds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct InteractionPolicyConfig {
    pub long_press_ms: u64,
    /// Pixels.
    pub touch_slop: f32,
    pub edge_band_fraction: f32,
    pub edge_hold_delay_ms: u64,
    pub page_turn_cooldown_ms: u64,
    pub new_page_hold_delay_ms: u64,
    pub folder_zone_fraction: f32,
}

impl Default for InteractionPolicyConfig {
    fn default() -> Self {
        Self {
            long_press_ms: millis(DEFAULT_LONG_PRESS),
            touch_slop: DEFAULT_TOUCH_SLOP,
            edge_band_fraction: DEFAULT_EDGE_BAND_FRACTION,
            edge_hold_delay_ms: millis(DEFAULT_EDGE_HOLD_DELAY),
            page_turn_cooldown_ms: millis(DEFAULT_PAGE_TURN_COOLDOWN),
            new_page_hold_delay_ms: millis(DEFAULT_NEW_PAGE_HOLD_DELAY),
            folder_zone_fraction: DEFAULT_FOLDER_ZONE_FRACTION,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// What happens to overlapped items that found no free cell on the drop page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "snake_case"))]
pub enum UnresolvedPolicy {
    /// Leave them where they are, overlapping the mover.
    LeaveInPlace,
    /// Spawn them on another page, creating one if every page is full.
    #[default]
    RelocateToOtherPage,
}

/// Caller-side policy on top of the arrangement engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct ArrangementPolicy {
    pub unresolved: UnresolvedPolicy,
    /// Remove empty trailing pages after each settle.
    pub trim_empty_pages_after_settle: bool,
}

impl HomeConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config-file")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// List every out-of-range parameter. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.grid.columns == 0 {
            errors.push("grid.columns must be > 0".into());
        }
        if self.grid.rows == 0 {
            errors.push("grid.rows must be > 0".into());
        }

        let interaction = &self.interaction;
        if interaction.long_press_ms == 0 {
            errors.push("interaction.long_press_ms must be > 0".into());
        }
        if !(interaction.touch_slop.is_finite() && interaction.touch_slop >= 0.0) {
            errors.push(format!(
                "interaction.touch_slop must be finite and >= 0, got {}",
                interaction.touch_slop
            ));
        }
        if !(interaction.edge_band_fraction > 0.0 && interaction.edge_band_fraction < 0.5) {
            errors.push(format!(
                "interaction.edge_band_fraction must be in (0, 0.5), got {}",
                interaction.edge_band_fraction
            ));
        }
        if interaction.edge_hold_delay_ms == 0 {
            errors.push("interaction.edge_hold_delay_ms must be > 0".into());
        }
        if interaction.page_turn_cooldown_ms == 0 {
            errors.push("interaction.page_turn_cooldown_ms must be > 0".into());
        }
        if interaction.new_page_hold_delay_ms <= interaction.edge_hold_delay_ms {
            errors.push(format!(
                "interaction.new_page_hold_delay_ms ({}) must exceed edge_hold_delay_ms ({})",
                interaction.new_page_hold_delay_ms, interaction.edge_hold_delay_ms
            ));
        }
        if !(interaction.folder_zone_fraction > 0.0 && interaction.folder_zone_fraction <= 1.0) {
            errors.push(format!(
                "interaction.folder_zone_fraction must be in (0, 1], got {}",
                interaction.folder_zone_fraction
            ));
        }

        errors
    }

    /// Validate and return `self`, or every violation at once.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Runtime form of the interaction thresholds.
    #[must_use]
    pub fn interaction_config(&self) -> InteractionConfig {
        let interaction = &self.interaction;
        InteractionConfig {
            long_press: Duration::from_millis(interaction.long_press_ms),
            touch_slop: interaction.touch_slop,
            edge_band_fraction: interaction.edge_band_fraction,
            edge_hold_delay: Duration::from_millis(interaction.edge_hold_delay_ms),
            page_turn_cooldown: Duration::from_millis(interaction.page_turn_cooldown_ms),
            new_page_hold_delay: Duration::from_millis(interaction.new_page_hold_delay_ms),
            folder_zone_fraction: interaction.folder_zone_fraction,
        }
    }
}

/// Errors from loading a [`HomeConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    #[cfg(feature = "config-file")]
    Toml(toml::de::Error),
    #[cfg(feature = "config-file")]
    Json(serde_json::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "invalid configuration: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
