//! Live map from source id to implementation, rebuilt whenever the installed extensions change.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::types::{LOCAL_SOURCE_ID, SourceId, SourceInfo};

use super::catalogue::HttpSource;
use super::extension::{Extension, ExtensionReceiver, SourceNameLookup};
use super::local::LocalSource;
use super::stub::StubSource;
use super::variant::Source;

/// Immutable view of the registered sources at one point in time.
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
    sources: HashMap<SourceId, Source>,
}

impl SourceSnapshot {
    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(&id)
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.sources.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.values()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self.sources.keys().copied().collect();
        ids.sort();
        ids
    }
}

/// Readers always see a whole snapshot; reconciliation swaps it in with a single store.
#[derive(Debug)]
pub struct SourceRegistry {
    local: Source,
    published: watch::Sender<Arc<SourceSnapshot>>,
    stubs: DashMap<SourceId, Arc<StubSource>>,
    remembered: DashMap<SourceId, SourceInfo>,
    names: Arc<dyn SourceNameLookup>,
}

impl SourceRegistry {
    /// Registry holding only the local source until the first extension list is applied.
    pub fn new(local: Arc<LocalSource>, names: Arc<dyn SourceNameLookup>) -> Self {
        let local = Source::Local(local);
        let mut sources = HashMap::new();
        sources.insert(LOCAL_SOURCE_ID, local.clone());
        let (published, _) = watch::channel(Arc::new(SourceSnapshot { sources }));
        Self { local, published, stubs: DashMap::new(), remembered: DashMap::new(), names }
    }

    pub fn snapshot(&self) -> Arc<SourceSnapshot> {
        Arc::clone(&self.published.borrow())
    }

    /// Receives every snapshot published after the call.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SourceSnapshot>> {
        self.published.subscribe()
    }

    pub fn local(&self) -> &Source {
        &self.local
    }

    pub fn get(&self, id: SourceId) -> Option<Source> {
        self.published.borrow().get(id).cloned()
    }

    /// The registered source, or a stub that is created once per id and then shared.
    pub fn get_or_stub(&self, id: SourceId) -> Source {
        if let Some(source) = self.get(id) {
            return source;
        }
        let stub = self
            .stubs
            .entry(id)
            .or_insert_with(|| Arc::new(StubSource::new(self.stub_info(id))))
            .clone();
        Source::Stub(stub)
    }

    fn stub_info(&self, id: SourceId) -> SourceInfo {
        self.names
            .source_info(id)
            .filter(SourceInfo::has_name)
            .or_else(|| self.remembered.get(&id).map(|info| info.clone()))
            .unwrap_or_else(|| SourceInfo::unnamed(id))
    }

    /// Info last seen for `id` while it was installed.
    pub fn remembered_info(&self, id: SourceId) -> Option<SourceInfo> {
        self.remembered.get(&id).map(|info| info.clone())
    }

    /// Every registered source that can be browsed, ordered by id.
    pub fn catalogue_sources(&self) -> Vec<Source> {
        let snapshot = self.snapshot();
        let mut sources: Vec<Source> =
            snapshot.iter().filter(|source| source.is_catalogue()).cloned().collect();
        sources.sort_by_key(Source::id);
        sources
    }

    /// Registered sources backed by a website, ordered by id.
    pub fn online_sources(&self) -> Vec<Arc<HttpSource>> {
        self.catalogue_sources().iter().filter_map(|source| source.as_http().cloned()).collect()
    }

    /// Rebuild the map from `extensions` and publish it.
    ///
    /// The local source is always present and never replaced. Within the list, a later source
    /// with the same id replaces an earlier one.
    pub fn apply(&self, extensions: &[Extension]) -> Arc<SourceSnapshot> {
        let mut sources = HashMap::new();
        sources.insert(LOCAL_SOURCE_ID, self.local.clone());

        for extension in extensions {
            for source in &extension.sources {
                let id = source.id();
                if id == LOCAL_SOURCE_ID || source.is_stub() {
                    debug!(pkg = %extension.pkg_name, %id, "skipping reserved source entry");
                    continue;
                }
                self.remembered.insert(id, source.info().clone());
                sources.insert(id, source.clone());
            }
        }

        self.stubs.retain(|id, _| !sources.contains_key(id));

        let snapshot = Arc::new(SourceSnapshot { sources });
        self.published.send_replace(Arc::clone(&snapshot));
        info!(
            extensions = extensions.len(),
            sources = snapshot.len(),
            "source registry updated"
        );
        snapshot
    }

    /// Apply the current extension list, then every later one, until the feed closes.
    ///
    /// Lists published while a pass runs coalesce; only the newest is applied next.
    pub fn spawn(self: &Arc<Self>, mut extensions: ExtensionReceiver) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let initial = extensions.borrow_and_update().clone();
            registry.apply(&initial);

            while extensions.changed().await.is_ok() {
                let latest = extensions.borrow_and_update().clone();
                registry.apply(&latest);
            }
            debug!("extension feed closed; registry reconciler stopped");
        })
    }
}
