//! User-facing settings

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::SettingsDefaults;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub highlight_color: String,
    /// Gates saving only; stored highlights are always loaded
    pub persistence_enabled: bool,
    pub enabled: bool,
}

impl From<&SettingsDefaults> for Settings {
    fn from(defaults: &SettingsDefaults) -> Self {
        Self {
            highlight_color: defaults.highlight_color.clone(),
            persistence_enabled: defaults.persistence_enabled,
            enabled: defaults.enabled,
        }
    }
}

/// Partial settings change
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub highlight_color: Option<String>,
    pub persistence_enabled: Option<bool>,
    pub enabled: Option<bool>,
}

/// Settings collaborator of the engine
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn current(&self) -> Settings;
}

/// In-process settings shared by every session
pub struct SharedSettings {
    inner: RwLock<Settings>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn get(&self) -> Settings {
        self.inner.read().clone()
    }

    /// Apply `update` and return the previous and new settings
    pub fn update(&self, update: SettingsUpdate) -> (Settings, Settings) {
        let mut settings = self.inner.write();
        let previous = settings.clone();
        if let Some(color) = update.highlight_color {
            settings.highlight_color = color;
        }
        if let Some(persist) = update.persistence_enabled {
            settings.persistence_enabled = persist;
        }
        if let Some(enabled) = update.enabled {
            settings.enabled = enabled;
        }
        (previous, settings.clone())
    }
}

#[async_trait]
impl SettingsProvider for SharedSettings {
    async fn current(&self) -> Settings {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update() {
        let shared = SharedSettings::new(Settings::from(&SettingsDefaults::default()));

        let (before, after) = shared.update(SettingsUpdate {
            highlight_color: Some("#9cf".to_string()),
            ..SettingsUpdate::default()
        });

        assert_eq!(before.highlight_color, "rgba(255, 230, 0, 0.5)");
        assert_eq!(after.highlight_color, "#9cf");
        assert!(after.persistence_enabled);
        assert_eq!(shared.get(), after);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(Settings::from(&SettingsDefaults::default())).unwrap();
        assert_eq!(json["persistenceEnabled"], true);
        assert!(json.get("highlightColor").is_some());
    }
}
