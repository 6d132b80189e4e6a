//! Game settings and preferences
//!
//! Persisted separately from game saves: LocalStorage on web, a JSON file
//! in the data directory on native.

use serde::{Deserialize, Serialize};

use crate::persistence::PersistenceError;
use crate::platform::{KeyValueStore, default_store};
use crate::sim::Rules;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Session rules applied to new runs
    pub rules: Rules,

    // === HUD ===
    /// Show the controls overlay when a run starts
    pub show_tutorial: bool,
    /// Show FPS counter
    pub show_fps: bool,

    // === Visual Effects ===
    /// Flash the board when rows are destroyed
    pub shrink_flash: bool,

    // === Accessibility ===
    /// Reduced motion (no flashes)
    pub reduced_motion: bool,
    /// High contrast palette
    pub high_contrast: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rules: Rules::default(),
            show_tutorial: true,
            show_fps: false,
            shrink_flash: true,
            reduced_motion: false,
            high_contrast: false,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "quantum_grid_settings";

    /// Effective shrink flash (respects reduced_motion)
    pub fn effective_shrink_flash(&self) -> bool {
        self.shrink_flash && !self.reduced_motion
    }

    pub fn load_from(store: &dyn KeyValueStore) -> Result<Self, PersistenceError> {
        match store.get(Self::STORAGE_KEY)? {
            Some(json) => {
                let mut settings: Settings = serde_json::from_str(&json)?;
                settings.rules = settings.rules.sanitized();
                Ok(settings)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn save_to(&self, store: &dyn KeyValueStore) -> Result<(), PersistenceError> {
        store.set(Self::STORAGE_KEY, &serde_json::to_string(self)?)
    }

    /// Load from the platform store, falling back to defaults
    pub fn load() -> Self {
        match Self::load_from(default_store().as_ref()) {
            Ok(settings) => {
                log::info!("Loaded settings");
                settings
            }
            Err(e) => {
                log::warn!("Using default settings: {}", e);
                Self::default()
            }
        }
    }

    /// Save to the platform store
    pub fn save(&self) {
        match self.save_to(default_store().as_ref()) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Failed to save settings: {}", e),
        }
    }
}
