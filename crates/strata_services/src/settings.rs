//! Settings management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_core::math::Vec2;
use strata_core::spatial::{GridDimensions, SpatialError};
use thiserror::Error;

/// Gap kept between simulated objects and the far edges of the bounded
/// world, so their corners stay strictly inside the grid.
pub const WORLD_MARGIN: f32 = 0.01;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings JSON")]
    Parse(#[from] serde_json::Error),

    #[error("invalid bounded grid settings")]
    Grid(#[from] SpatialError),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bounded: GridDimensions,
    pub hash: HashGridSettings,
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashGridSettings {
    pub cell_width: f32,
    pub cell_height: f32,
}

impl HashGridSettings {
    /// Cell extent in world units.
    pub fn cell_size(&self) -> Vec2 {
        Vec2::new(self.cell_width, self.cell_height)
    }
}

/// Parameters of the headless broad-phase demo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub object_count: u32,
    pub steps: u32,
    pub seed: u64,
    pub tick_rate_hz: u32,
    /// Smallest and largest object edge, in world units.
    pub min_object_size: f32,
    pub max_object_size: f32,
    /// Maximum speed per axis, in world units per second.
    pub max_speed: f32,
    /// Edge of the square region queried around each probe.
    pub query_size: f32,
    /// Log a progress line every this many steps (0 disables).
    pub log_every: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bounded: GridDimensions::new(64, 64, 32.0, 32.0),
            hash: HashGridSettings::default(),
            simulation: SimulationSettings::default(),
        }
    }
}

impl Default for HashGridSettings {
    fn default() -> Self {
        Self {
            cell_width: 64.0,
            cell_height: 64.0,
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            object_count: 500,
            steps: 600,
            seed: 0x5eed,
            tick_rate_hz: 60,
            min_object_size: 4.0,
            max_object_size: 48.0,
            max_speed: 120.0,
            query_size: 96.0,
            log_every: 120,
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON settings file. Does not validate.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every field the runtime relies on.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.bounded.validate()?;

        let hash = &self.hash;
        if !(hash.cell_width > 0.0 && hash.cell_height > 0.0 && hash.cell_size().is_finite()) {
            return Err(SettingsError::Invalid {
                field: "hash.cell_width/cell_height",
                reason: "must be positive and finite",
            });
        }

        let sim = &self.simulation;
        if sim.tick_rate_hz == 0 {
            return Err(SettingsError::Invalid {
                field: "simulation.tick_rate_hz",
                reason: "must be at least 1",
            });
        }
        if !(sim.min_object_size > 0.0 && sim.min_object_size <= sim.max_object_size) {
            return Err(SettingsError::Invalid {
                field: "simulation.min_object_size",
                reason: "must be positive and no larger than max_object_size",
            });
        }
        if !(sim.max_speed >= 0.0 && sim.max_speed.is_finite()) {
            return Err(SettingsError::Invalid {
                field: "simulation.max_speed",
                reason: "must be finite and non-negative",
            });
        }
        if !(sim.query_size >= 0.0 && sim.query_size.is_finite()) {
            return Err(SettingsError::Invalid {
                field: "simulation.query_size",
                reason: "must be finite and non-negative",
            });
        }
        // Objects and probe rectangles must fit inside the bounded grid,
        // margin included.
        let world = self.bounded.world_size();
        let room = world.x.min(world.y) - WORLD_MARGIN;
        if sim.max_object_size >= room {
            return Err(SettingsError::Invalid {
                field: "simulation.max_object_size",
                reason: "must be smaller than the bounded world",
            });
        }
        if sim.query_size >= room {
            return Err(SettingsError::Invalid {
                field: "simulation.query_size",
                reason: "must be smaller than the bounded world",
            });
        }
        Ok(())
    }
}
