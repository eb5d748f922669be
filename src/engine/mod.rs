//! Highlight sessions
//!
//! # Overview
//!
//! A [`HighlightEngine`] owns one live document for one identity: the parsed
//! tree, the markers currently materialized in it, and the anchors known for
//! it. Sessions are created and looked up through the [`EngineRegistry`].
//!
//! # Concurrency
//!
//! Work on the tree is serialized by a `tokio::sync::Mutex` that is only
//! held across synchronous sections; store and settings calls happen outside
//! it. A resolution pass is additionally guarded by a small gate so that
//! at most one pass runs per session:
//!
//! - an unforced request arriving mid-pass is dropped
//! - a forced request arriving mid-pass is queued, together with the anchors
//!   it supplied, and runs once the current pass finishes, whether or not
//!   that pass succeeded; a later forced request replaces an earlier one
//!
//! # Persistence
//!
//! Stored anchors are always loaded. Saving happens only while persistence
//! is enabled; with it disabled new highlights live for the session only and
//! still survive forced reloads.

mod registry;
mod settings;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use registry::EngineRegistry;
pub use settings::{Settings, SettingsProvider, SettingsUpdate, SharedSettings};

use crate::anchor::{Anchor, AnchorBuilder, AnchorError, AnchorKind, AnchorResolver, HighlightSet, ResolveReport};
use crate::config::EngineConfig;
use crate::dom::{parse_html, strip_markers, Boundary, Document, DocumentTree, HtmlError, TextRange};
use crate::identity::DocumentIdentity;
use crate::store::{AnchorStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Anchor(#[from] AnchorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Html(#[from] HtmlError),

    #[error("Highlighting is disabled")]
    Disabled,

    #[error("Selection not found: {0}")]
    SelectionNotFound(String),
}

/// A user selection in the live document
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selection {
    /// The `occurrence`-th match of `text` in the content root's text
    #[serde(rename_all = "camelCase")]
    Quote {
        text: String,
        #[serde(default)]
        occurrence: usize,
    },
    /// Explicit boundaries given as child-index paths from the content root
    #[serde(rename_all = "camelCase")]
    Boundaries {
        start_path: Vec<usize>,
        start_offset: usize,
        end_path: Vec<usize>,
        end_offset: usize,
    },
}

impl Selection {
    fn to_range(&self, doc: &Document) -> Result<TextRange, EngineError> {
        let root = doc.content_root().ok_or(AnchorError::MissingRoot)?;
        match self {
            Selection::Quote { text, occurrence } => TextRange::from_quote(doc, root, text, *occurrence)
                .ok_or_else(|| EngineError::SelectionNotFound(format!("{:?} (occurrence {})", text, occurrence))),
            Selection::Boundaries {
                start_path,
                start_offset,
                end_path,
                end_offset,
            } => {
                let node = |path: &[usize]| {
                    doc.node_at_path(root, path)
                        .ok_or_else(|| EngineError::SelectionNotFound(format!("no node at path {:?}", path)))
                };
                Ok(TextRange::new(
                    Boundary::new(node(start_path.as_slice())?, *start_offset),
                    Boundary::new(node(end_path.as_slice())?, *end_offset),
                ))
            }
        }
    }
}

/// Result of a resolution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassOutcome {
    Completed(ResolveReport),
    /// Unforced request for a document whose pass already ran
    AlreadyApplied,
    /// Forced request that will run after the in-flight pass
    Queued,
    /// Unforced request that arrived mid-pass
    Skipped,
    Disabled,
}

/// Summary of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub identity: DocumentIdentity,
    pub title: String,
    pub enabled: bool,
    pub anchors: usize,
    pub visible_highlights: usize,
}

/// Anchors a pass resolves; `None` loads them from the store
type PassRequest = Option<Vec<Anchor>>;

#[derive(Debug, Default)]
struct PassGate {
    in_progress: bool,
    /// Latest forced request made mid-pass
    queued: Option<PassRequest>,
}

/// Owns the gate while a pass runs; releases it if the pass is dropped
struct PassGuard<'a> {
    gate: &'a Mutex<PassGate>,
    active: bool,
}

impl PassGuard<'_> {
    /// Take the queued request, or close the gate when there is none
    fn next_or_finish(&mut self) -> Option<PassRequest> {
        let mut gate = self.gate.lock();
        let next = gate.queued.take();
        if next.is_none() {
            gate.in_progress = false;
            self.active = false;
        }
        next
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            let mut gate = self.gate.lock();
            gate.in_progress = false;
            gate.queued = None;
        }
    }
}

enum PassStart {
    Run(PassRequest),
    Queued,
    Dropped,
}

struct LiveDocument {
    document: Document,
    highlights: HighlightSet,
    /// Every anchor known to the session, in creation order
    anchors: Vec<Anchor>,
    enabled: bool,
}

pub struct HighlightEngine {
    identity: DocumentIdentity,
    title: String,
    builder: AnchorBuilder,
    resolver: AnchorResolver,
    store: Arc<dyn AnchorStore>,
    settings: Arc<dyn SettingsProvider>,
    gate: Mutex<PassGate>,
    live: tokio::sync::Mutex<LiveDocument>,
}

impl HighlightEngine {
    /// Parse `html` into a fresh session
    ///
    /// Markers left over from an earlier render are stripped before parsing.
    /// A document without a content root is rejected.
    pub fn new(
        identity: DocumentIdentity,
        html: &str,
        config: &EngineConfig,
        store: Arc<dyn AnchorStore>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Result<Self, EngineError> {
        let cleaned = strip_markers(html, &config.marker.tag, &config.marker.class)?;
        let document = parse_html(&cleaned, &config.content_root_tag);
        if document.content_root().is_none() {
            return Err(AnchorError::MissingRoot.into());
        }

        let title = document.title().unwrap_or_else(|| identity.to_string());

        Ok(Self {
            identity,
            title,
            builder: AnchorBuilder::new(config),
            resolver: AnchorResolver::new(config),
            store,
            settings,
            gate: Mutex::new(PassGate::default()),
            live: tokio::sync::Mutex::new(LiveDocument {
                document,
                highlights: HighlightSet::new(),
                anchors: Vec::new(),
                enabled: true,
            }),
        })
    }

    pub fn identity(&self) -> &DocumentIdentity {
        &self.identity
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Pick up the enabled flag and run the first pass
    pub async fn activate(&self) -> Result<PassOutcome, EngineError> {
        let settings = self.settings.current().await;
        self.live.lock().await.enabled = settings.enabled;
        self.apply_all(false).await
    }

    /// Resolve the stored anchors (plus session-only ones) into the document
    pub async fn apply_all(&self, force: bool) -> Result<PassOutcome, EngineError> {
        self.run_pass(force, None).await
    }

    /// Resolve exactly `anchors`, bypassing the store
    pub async fn apply_with(&self, anchors: Vec<Anchor>, force: bool) -> Result<PassOutcome, EngineError> {
        self.run_pass(force, Some(anchors)).await
    }

    fn begin_pass(&self, force: bool, request: PassRequest) -> PassStart {
        let mut gate = self.gate.lock();
        if !gate.in_progress {
            gate.in_progress = true;
            return PassStart::Run(request);
        }
        if force {
            gate.queued = Some(request);
            PassStart::Queued
        } else {
            PassStart::Dropped
        }
    }

    async fn run_pass(&self, force: bool, supplied: PassRequest) -> Result<PassOutcome, EngineError> {
        let request = match self.begin_pass(force, supplied) {
            PassStart::Run(request) => request,
            PassStart::Queued => {
                debug!(identity = %self.identity, "Reload queued behind running pass");
                return Ok(PassOutcome::Queued);
            }
            PassStart::Dropped => {
                debug!(identity = %self.identity, "Pass already running; request dropped");
                return Ok(PassOutcome::Skipped);
            }
        };

        let mut guard = PassGuard {
            gate: &self.gate,
            active: true,
        };
        let result = self.pass_once(force, request).await;

        // Queued callers already returned; their failures are only logged
        while let Some(next) = guard.next_or_finish() {
            debug!(identity = %self.identity, "Running queued reload");
            if let Err(e) = self.pass_once(true, next).await {
                warn!(identity = %self.identity, "Queued reload failed: {}", e);
            }
        }
        result
    }

    async fn pass_once(&self, force: bool, supplied: Option<Vec<Anchor>>) -> Result<PassOutcome, EngineError> {
        {
            let live = self.live.lock().await;
            if !live.enabled {
                return Ok(PassOutcome::Disabled);
            }
            if !force && live.highlights.is_applied_for(&self.identity) {
                return Ok(PassOutcome::AlreadyApplied);
            }
        }

        let from_store = supplied.is_none();
        let loaded = match supplied {
            Some(anchors) => anchors,
            None => self.store.load_anchors(&self.identity).await?,
        };

        let mut live = self.live.lock().await;
        if !live.enabled {
            return Ok(PassOutcome::Disabled);
        }

        let anchors = if from_store {
            merge_anchors(loaded, &live.anchors)
        } else {
            loaded
        };

        let LiveDocument {
            document, highlights, ..
        } = &mut *live;
        let outcome = match highlights.apply_all(document, &self.resolver, &self.identity, &anchors, force) {
            Some(report) => PassOutcome::Completed(report),
            None => PassOutcome::AlreadyApplied,
        };
        live.anchors = anchors;
        Ok(outcome)
    }

    /// Turn a selection into a highlight
    ///
    /// The marker is visible as soon as this returns. The anchor is saved
    /// only while persistence is enabled.
    pub async fn highlight_selection(&self, selection: &Selection) -> Result<Anchor, EngineError> {
        let settings = self.settings.current().await;

        let (anchor, known) = {
            let mut live = self.live.lock().await;
            if !live.enabled {
                return Err(EngineError::Disabled);
            }

            let range = selection.to_range(&live.document)?;
            let LiveDocument {
                document,
                highlights,
                anchors,
                ..
            } = &mut *live;

            let kind = AnchorKind::Text;
            let anchor = (kind.ops().build)(&self.builder, document, &self.identity, &range, &settings.highlight_color)?;
            let marker = self.builder.marker_of(document, &anchor)?;
            highlights.insert(&anchor.id, kind, marker, None);
            anchors.push(anchor.clone());
            (anchor, anchors.clone())
        };

        if settings.persistence_enabled {
            let stored = self.store.load_anchors(&self.identity).await?;
            let all = merge_anchors(stored, &known);
            self.store.save_anchors(&self.identity, &all, &self.title).await?;
            debug!(id = %anchor.id, count = all.len(), "Saved highlights");
        } else {
            debug!(id = %anchor.id, "Persistence disabled; highlight kept for this session");
        }

        Ok(anchor)
    }

    /// Remove every marker and forget the document's anchors, stored ones
    /// included
    pub async fn clear_highlights(&self) -> Result<usize, EngineError> {
        let removed = {
            let mut live = self.live.lock().await;
            let LiveDocument {
                document,
                highlights,
                anchors,
                ..
            } = &mut *live;
            anchors.clear();
            highlights.clear(document)
        };

        self.store.delete_anchors(&self.identity).await?;
        info!(identity = %self.identity, "Cleared {} highlights", removed);
        Ok(removed)
    }

    /// Repaint live markers and rewrite the known anchors' color
    pub async fn update_color(&self, color: &str) -> Result<usize, EngineError> {
        let settings = self.settings.current().await;

        let anchors = {
            let mut live = self.live.lock().await;
            let LiveDocument {
                document,
                highlights,
                anchors,
                ..
            } = &mut *live;
            for anchor in anchors.iter_mut() {
                anchor.color = color.to_string();
            }
            highlights.recolor(document, color);
            anchors.clone()
        };

        if settings.persistence_enabled && !anchors.is_empty() {
            self.store.save_anchors(&self.identity, &anchors, &self.title).await?;
        }
        Ok(anchors.len())
    }

    /// Toggle highlighting; disabling removes the markers, enabling re-applies
    pub async fn set_enabled(&self, enabled: bool) -> Result<PassOutcome, EngineError> {
        {
            let mut live = self.live.lock().await;
            live.enabled = enabled;
            if !enabled {
                let LiveDocument {
                    document, highlights, ..
                } = &mut *live;
                let removed = highlights.clear(document);
                debug!(identity = %self.identity, removed, "Highlighting disabled");
            }
        }

        if enabled {
            self.apply_all(false).await
        } else {
            Ok(PassOutcome::Disabled)
        }
    }

    /// Serialized document with its current markers
    pub async fn render(&self) -> String {
        self.live.lock().await.document.to_html()
    }

    pub async fn anchors(&self) -> Vec<Anchor> {
        self.live.lock().await.anchors.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        let live = self.live.lock().await;
        SessionStatus {
            identity: self.identity.clone(),
            title: self.title.clone(),
            enabled: live.enabled,
            anchors: live.anchors.len(),
            visible_highlights: live.highlights.visible_count(&live.document),
        }
    }
}

/// `base` followed by the anchors of `extra` it does not already contain
fn merge_anchors(mut base: Vec<Anchor>, extra: &[Anchor]) -> Vec<Anchor> {
    let known: HashSet<&str> = base.iter().map(|a| a.id.as_str()).collect();
    let missing: Vec<Anchor> = extra
        .iter()
        .filter(|a| !known.contains(a.id.as_str()))
        .cloned()
        .collect();
    base.extend(missing);
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingsDefaults;
    use crate::store::MemoryAnchorStore;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::{Notify, Semaphore};

    const PAGE: &str = "<html><head><title>Notes</title></head><body>\
        <h1>Notes</h1><p>See <b>the report</b> for details.</p><p>Alpha beta gamma</p></body></html>";

    fn identity() -> DocumentIdentity {
        DocumentIdentity::from_normalized("https://example.com/notes")
    }

    fn settings(persist: bool) -> Arc<SharedSettings> {
        let mut settings = Settings::from(&SettingsDefaults::default());
        settings.persistence_enabled = persist;
        Arc::new(SharedSettings::new(settings))
    }

    fn engine(store: Arc<dyn AnchorStore>, settings: Arc<SharedSettings>) -> HighlightEngine {
        HighlightEngine::new(identity(), PAGE, &EngineConfig::default(), store, settings).unwrap()
    }

    fn quote(text: &str) -> Selection {
        Selection::Quote {
            text: text.to_string(),
            occurrence: 0,
        }
    }

    #[tokio::test]
    async fn test_highlight_is_saved_and_reapplied_in_new_session() {
        let store = Arc::new(MemoryAnchorStore::new());
        let first = engine(store.clone(), settings(true));
        first.activate().await.unwrap();

        let anchor = first.highlight_selection(&quote("the report")).await.unwrap();
        assert_eq!(first.title(), "Notes");
        assert_eq!(store.load_anchors(&identity()).await.unwrap(), vec![anchor.clone()]);
        assert_eq!(store.index().await.unwrap()[&identity()].title, "Notes");

        let second = engine(store.clone(), settings(true));
        match second.activate().await.unwrap() {
            PassOutcome::Completed(report) => assert_eq!((report.resolved, report.total), (1, 1)),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(second.render().await.contains(&format!("data-highlight-id=\"{}\"", anchor.id)));
        assert_eq!(second.activate().await.unwrap(), PassOutcome::AlreadyApplied);
    }

    #[tokio::test]
    async fn test_persistence_disabled_keeps_session_highlights() {
        let store = Arc::new(MemoryAnchorStore::new());
        let session = engine(store.clone(), settings(false));
        session.activate().await.unwrap();

        session.highlight_selection(&quote("beta")).await.unwrap();
        assert!(store.load_anchors(&identity()).await.unwrap().is_empty());
        assert!(store.index().await.unwrap().is_empty());

        match session.apply_all(true).await.unwrap() {
            PassOutcome::Completed(report) => assert_eq!(report.resolved, 1),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(session.status().await.visible_highlights, 1);
    }

    #[tokio::test]
    async fn test_clear_removes_markers_and_stored_anchors() {
        let store = Arc::new(MemoryAnchorStore::new());
        let session = engine(store.clone(), settings(true));
        session.activate().await.unwrap();
        let before = session.render().await;

        session.highlight_selection(&quote("the report")).await.unwrap();
        session.highlight_selection(&quote("gamma")).await.unwrap();
        assert_eq!(session.clear_highlights().await.unwrap(), 2);

        assert_eq!(session.render().await, before);
        assert!(store.index().await.unwrap().is_empty());
        assert!(session.anchors().await.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_session_rejects_highlights() {
        let store = Arc::new(MemoryAnchorStore::new());
        let session = engine(store.clone(), settings(true));
        session.activate().await.unwrap();
        session.highlight_selection(&quote("beta")).await.unwrap();

        assert_eq!(session.set_enabled(false).await.unwrap(), PassOutcome::Disabled);
        assert_eq!(session.status().await.visible_highlights, 0);
        assert!(matches!(
            session.highlight_selection(&quote("gamma")).await,
            Err(EngineError::Disabled)
        ));

        assert!(matches!(session.set_enabled(true).await.unwrap(), PassOutcome::Completed(_)));
        assert_eq!(session.status().await.visible_highlights, 1);
    }

    #[tokio::test]
    async fn test_update_color_rewrites_markers_and_store() {
        let store = Arc::new(MemoryAnchorStore::new());
        let session = engine(store.clone(), settings(true));
        session.activate().await.unwrap();
        session.highlight_selection(&quote("beta")).await.unwrap();

        assert_eq!(session.update_color("#9cf").await.unwrap(), 1);

        assert!(session.render().await.contains("background-color: #9cf;"));
        assert_eq!(store.load_anchors(&identity()).await.unwrap()[0].color, "#9cf");
    }

    #[tokio::test]
    async fn test_apply_with_bypasses_store() {
        let store = Arc::new(MemoryAnchorStore::new());
        let source = engine(store.clone(), settings(false));
        source.activate().await.unwrap();
        let anchor = source.highlight_selection(&quote("Alpha")).await.unwrap();

        let session = engine(Arc::new(MemoryAnchorStore::new()), settings(true));
        match session.apply_with(vec![anchor], false).await.unwrap() {
            PassOutcome::Completed(report) => assert_eq!(report.resolved, 1),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(session.anchors().await.len(), 1);
    }

    #[tokio::test]
    async fn test_selection_outside_document() {
        let session = engine(Arc::new(MemoryAnchorStore::new()), settings(true));
        session.activate().await.unwrap();

        assert!(matches!(
            session.highlight_selection(&quote("nowhere")).await,
            Err(EngineError::SelectionNotFound(_))
        ));
        let cross = Selection::Boundaries {
            start_path: vec![1, 0],
            start_offset: 0,
            end_path: vec![1, 1, 0],
            end_offset: 3,
        };
        assert!(matches!(
            session.highlight_selection(&cross).await,
            Err(EngineError::Anchor(AnchorError::Wrap(_)))
        ));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let config = EngineConfig {
            content_root_tag: "main".to_string(),
            ..EngineConfig::default()
        };
        let result = HighlightEngine::new(
            identity(),
            "<p>no main here</p>",
            &config,
            Arc::new(MemoryAnchorStore::new()),
            settings(true),
        );
        assert!(matches!(result, Err(EngineError::Anchor(AnchorError::MissingRoot))));
    }

    /// Store whose loads block until released
    struct GatedStore {
        inner: MemoryAnchorStore,
        entered: Notify,
        release: Semaphore,
        loads: AtomicUsize,
        fail_next: AtomicBool,
    }

    fn gated() -> Arc<GatedStore> {
        Arc::new(GatedStore {
            inner: MemoryAnchorStore::new(),
            entered: Notify::new(),
            release: Semaphore::new(0),
            loads: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        })
    }

    #[async_trait]
    impl AnchorStore for GatedStore {
        async fn load_anchors(&self, identity: &DocumentIdentity) -> Result<Vec<Anchor>, StoreError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.acquire().await.unwrap().forget();
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.load_anchors(identity).await
        }

        async fn save_anchors(&self, identity: &DocumentIdentity, anchors: &[Anchor], title: &str) -> Result<(), StoreError> {
            self.inner.save_anchors(identity, anchors, title).await
        }

        async fn delete_anchors(&self, identity: &DocumentIdentity) -> Result<bool, StoreError> {
            self.inner.delete_anchors(identity).await
        }

        async fn index(&self) -> Result<BTreeMap<DocumentIdentity, crate::store::IndexEntry>, StoreError> {
            self.inner.index().await
        }
    }

    #[tokio::test]
    async fn test_forced_reload_mid_pass_is_queued() {
        let store = gated();
        let session = Arc::new(engine(store.clone(), settings(true)));

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.apply_all(true).await }
        });
        store.entered.notified().await;

        assert_eq!(session.apply_all(false).await.unwrap(), PassOutcome::Skipped);
        assert_eq!(session.apply_all(true).await.unwrap(), PassOutcome::Queued);

        store.release.add_permits(2);
        let outcome = running.await.unwrap().unwrap();

        assert!(matches!(outcome, PassOutcome::Completed(_)));
        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
        assert_eq!(session.apply_all(false).await.unwrap(), PassOutcome::AlreadyApplied);
    }

    #[tokio::test]
    async fn test_queued_apply_with_keeps_its_anchors() {
        let source = engine(Arc::new(MemoryAnchorStore::new()), settings(false));
        source.activate().await.unwrap();
        let anchor = source.highlight_selection(&quote("gamma")).await.unwrap();

        let store = gated();
        let session = Arc::new(engine(store.clone(), settings(true)));
        let running = tokio::spawn({
            let session = session.clone();
            async move { session.apply_all(true).await }
        });
        store.entered.notified().await;

        assert_eq!(
            session.apply_with(vec![anchor.clone()], true).await.unwrap(),
            PassOutcome::Queued
        );

        store.release.add_permits(1);
        assert!(matches!(running.await.unwrap().unwrap(), PassOutcome::Completed(_)));

        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
        assert_eq!(session.anchors().await, vec![anchor]);
        assert_eq!(session.status().await.visible_highlights, 1);
    }

    #[tokio::test]
    async fn test_queued_reload_runs_after_failed_pass() {
        let store = gated();
        store.fail_next.store(true, Ordering::SeqCst);
        let saved = engine(Arc::new(MemoryAnchorStore::new()), settings(false));
        saved.activate().await.unwrap();
        let anchor = saved.highlight_selection(&quote("the report")).await.unwrap();
        store.inner.save_anchors(&identity(), &[anchor], "Notes").await.unwrap();

        let session = Arc::new(engine(store.clone(), settings(true)));
        let running = tokio::spawn({
            let session = session.clone();
            async move { session.apply_all(true).await }
        });
        store.entered.notified().await;

        assert_eq!(session.apply_all(true).await.unwrap(), PassOutcome::Queued);

        store.release.add_permits(2);
        assert!(matches!(running.await.unwrap(), Err(EngineError::Store(_))));

        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
        assert_eq!(session.status().await.visible_highlights, 1);
        assert_eq!(session.apply_all(false).await.unwrap(), PassOutcome::AlreadyApplied);
    }

    #[tokio::test]
    async fn test_gate_reopens_after_dropped_pass() {
        let store = gated();
        let session = Arc::new(engine(store.clone(), settings(true)));

        let running = tokio::spawn({
            let session = session.clone();
            async move { session.apply_all(true).await }
        });
        store.entered.notified().await;
        running.abort();
        let _ = running.await;

        store.release.add_permits(1);
        assert!(matches!(session.apply_all(true).await.unwrap(), PassOutcome::Completed(_)));
    }
}
