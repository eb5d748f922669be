//! Configuration management for the Marginalia server

use serde::Deserialize;
use std::env;

use crate::anchor::ContextBand;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub settings: SettingsDefaults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

/// Tunables of the anchoring engine
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Tag of the element all structural addresses are relative to
    pub content_root_tag: String,
    pub marker: MarkerConfig,
    /// Characters of text kept in an address step
    pub text_fragment_len: usize,
    /// Element tags scanned by context matching
    pub context_tags: Vec<String>,
    pub context_band: ContextBand,
}

/// Shape of the element that wraps a highlighted span
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    pub tag: String,
    pub class: String,
    pub id_attribute: String,
}

/// Initial values of the user-facing settings
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsDefaults {
    pub highlight_color: String,
    pub persistence_enabled: bool,
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: "sqlite:./marginalia.db".to_string(),
                backend: StorageBackend::Sqlite,
            },
            engine: EngineConfig::default(),
            settings: SettingsDefaults::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            content_root_tag: "body".to_string(),
            marker: MarkerConfig::default(),
            text_fragment_len: 50,
            context_tags: ["p", "div", "span", "li", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            context_band: ContextBand::default(),
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        MarkerConfig {
            tag: "span".to_string(),
            class: "highlighter-marker".to_string(),
            id_attribute: "data-highlight-id".to_string(),
        }
    }
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        SettingsDefaults {
            highlight_color: "rgba(255, 230, 0, 0.5)".to_string(),
            persistence_enabled: true,
            enabled: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
                backend: match env::var("STORAGE_BACKEND") {
                    Ok(value) => match value.to_ascii_lowercase().as_str() {
                        "sqlite" => StorageBackend::Sqlite,
                        "memory" => StorageBackend::Memory,
                        _ => {
                            return Err(ConfigError::Invalid {
                                key: "STORAGE_BACKEND",
                                value,
                            })
                        }
                    },
                    Err(_) => defaults.database.backend,
                },
            },
            engine: EngineConfig {
                content_root_tag: env::var("CONTENT_ROOT_TAG")
                    .map(|t| t.to_ascii_lowercase())
                    .unwrap_or(defaults.engine.content_root_tag),
                marker: MarkerConfig {
                    class: env::var("MARKER_CLASS").unwrap_or(defaults.engine.marker.class),
                    ..defaults.engine.marker
                },
                text_fragment_len: parse_var("TEXT_FRAGMENT_LEN", defaults.engine.text_fragment_len)?,
                context_tags: defaults.engine.context_tags,
                context_band: ContextBand {
                    target_factor: parse_var(
                        "CONTEXT_TARGET_FACTOR",
                        defaults.engine.context_band.target_factor,
                    )?,
                    context_factor: parse_var("CONTEXT_FACTOR", defaults.engine.context_band.context_factor)?,
                },
            },
            settings: SettingsDefaults {
                highlight_color: env::var("HIGHLIGHT_COLOR").unwrap_or(defaults.settings.highlight_color),
                persistence_enabled: parse_var("PERSIST_HIGHLIGHTS", defaults.settings.persistence_enabled)?,
                enabled: parse_var("HIGHLIGHTS_ENABLED", defaults.settings.enabled)?,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}
