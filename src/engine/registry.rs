//! Open sessions, keyed by document identity

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use super::{EngineError, HighlightEngine, PassOutcome, SettingsProvider};
use crate::config::EngineConfig;
use crate::identity::DocumentIdentity;
use crate::store::AnchorStore;

pub struct EngineRegistry {
    config: EngineConfig,
    store: Arc<dyn AnchorStore>,
    settings: Arc<dyn SettingsProvider>,
    engines: RwLock<HashMap<DocumentIdentity, Arc<HighlightEngine>>>,
}

impl EngineRegistry {
    pub fn new(config: EngineConfig, store: Arc<dyn AnchorStore>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            config,
            store,
            settings,
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session for `html` and run its first pass
    ///
    /// An existing session for the same identity is replaced.
    pub async fn open(
        &self,
        identity: DocumentIdentity,
        html: &str,
    ) -> Result<(Arc<HighlightEngine>, PassOutcome), EngineError> {
        let engine = Arc::new(HighlightEngine::new(
            identity.clone(),
            html,
            &self.config,
            self.store.clone(),
            self.settings.clone(),
        )?);

        let outcome = engine.activate().await?;

        if self.engines.write().insert(identity.clone(), engine.clone()).is_some() {
            info!(identity = %identity, "Replaced open session");
        } else {
            info!(identity = %identity, "Opened session");
        }
        Ok((engine, outcome))
    }

    pub fn get(&self, identity: &DocumentIdentity) -> Option<Arc<HighlightEngine>> {
        self.engines.read().get(identity).cloned()
    }

    pub fn close(&self, identity: &DocumentIdentity) -> bool {
        self.engines.write().remove(identity).is_some()
    }

    pub fn len(&self) -> usize {
        self.engines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<HighlightEngine>> {
        self.engines.read().values().cloned().collect()
    }

    /// Recolor every open session; a failing session is logged and skipped
    pub async fn recolor_all(&self, color: &str) -> usize {
        let mut updated = 0;
        for engine in self.snapshot() {
            match engine.update_color(color).await {
                Ok(count) => updated += count,
                Err(e) => warn!(identity = %engine.identity(), error = %e, "Recolor failed"),
            }
        }
        updated
    }

    /// Toggle highlighting in every open session
    pub async fn set_enabled_all(&self, enabled: bool) {
        for engine in self.snapshot() {
            if let Err(e) = engine.set_enabled(enabled).await {
                warn!(identity = %engine.identity(), error = %e, "Toggle failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsDefaults;
    use crate::engine::{Selection, Settings, SharedSettings};
    use crate::store::MemoryAnchorStore;

    fn registry() -> EngineRegistry {
        EngineRegistry::new(
            EngineConfig::default(),
            Arc::new(MemoryAnchorStore::new()),
            Arc::new(SharedSettings::new(Settings::from(&SettingsDefaults::default()))),
        )
    }

    #[tokio::test]
    async fn test_open_get_close() {
        let registry = registry();
        let identity = DocumentIdentity::from_normalized("https://example.com/a");

        let (engine, outcome) = registry.open(identity.clone(), "<p>text</p>").await.unwrap();
        assert!(matches!(outcome, PassOutcome::Completed(_)));
        assert!(Arc::ptr_eq(&engine, &registry.get(&identity).unwrap()));

        assert!(registry.close(&identity));
        assert!(registry.get(&identity).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_strips_stale_markers_and_reapplies() {
        let registry = registry();
        let identity = DocumentIdentity::from_normalized("https://example.com/a");
        let (engine, _) = registry.open(identity.clone(), "<p>Alpha beta gamma</p>").await.unwrap();
        engine
            .highlight_selection(&Selection::Quote {
                text: "beta".to_string(),
                occurrence: 0,
            })
            .await
            .unwrap();
        let rendered = engine.render().await;

        let (reopened, outcome) = registry.open(identity.clone(), &rendered).await.unwrap();

        match outcome {
            PassOutcome::Completed(report) => assert_eq!(report.resolved, 1),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(reopened.render().await.matches("highlighter-marker").count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_recolor_all() {
        let registry = registry();
        for path in ["a", "b"] {
            let identity = DocumentIdentity::from_normalized(format!("https://example.com/{}", path));
            let (engine, _) = registry.open(identity, "<p>Alpha beta</p>").await.unwrap();
            engine
                .highlight_selection(&Selection::Quote {
                    text: "Alpha".to_string(),
                    occurrence: 0,
                })
                .await
                .unwrap();
        }

        assert_eq!(registry.recolor_all("#abc").await, 2);
    }
}
