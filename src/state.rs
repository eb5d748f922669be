//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::engine::{EngineRegistry, Settings, SharedSettings};
use crate::store::AnchorStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: Arc<dyn AnchorStore>,
    settings: Arc<SharedSettings>,
    registry: EngineRegistry,
}

impl AppState {
    /// Create the state; settings start from the configured defaults
    pub fn new(config: Config, store: Arc<dyn AnchorStore>) -> Self {
        let settings = Arc::new(SharedSettings::new(Settings::from(&config.settings)));
        let registry = EngineRegistry::new(config.engine.clone(), store.clone(), settings.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                settings,
                registry,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the anchor store
    pub fn store(&self) -> &dyn AnchorStore {
        self.inner.store.as_ref()
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.inner.settings
    }

    /// Get the open sessions
    pub fn registry(&self) -> &EngineRegistry {
        &self.inner.registry
    }
}
