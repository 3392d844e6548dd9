//! Strata Services Layer
//!
//! Platform-facing services. Currently settings loading for the runtime.

pub mod settings;

pub use settings::{
    HashGridSettings, Settings, SettingsError, SimulationSettings, WORLD_MARGIN,
};

use std::path::Path;

/// Load settings from `path`, or the defaults when no path is given.
pub fn init_services(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let settings = match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading settings");
            Settings::load(path)?
        }
        None => {
            tracing::info!("no settings file given, using defaults");
            Settings::default()
        }
    };
    settings.validate()?;
    Ok(settings)
}
