//! Process-wide wiring of the core services.

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::Result;
use crate::cache::CoverCache;
use crate::config::CoreConfig;
use crate::cover::{CoverMetadataCache, CoverOutcome, CoverRequest};
use crate::source::{ExtensionReceiver, LocalSource, SourceNameLookup, SourceRegistry};
use crate::storage::StorageManager;
use crate::store::{JsonPreferences, PreferenceStore};
use crate::types::MangaId;

/// Owns the services a frontend talks to. Build it with [`CoreContext::init`], then call
/// [`CoreContext::start`] from inside a tokio runtime.
#[derive(Debug)]
pub struct CoreContext {
    config: CoreConfig,
    storage: Arc<StorageManager>,
    registry: Arc<SourceRegistry>,
    covers: Arc<CoverMetadataCache>,
    cover_cache: Arc<CoverCache>,
    preferences: Arc<dyn PreferenceStore>,
    reconciler: Option<JoinHandle<()>>,
}

impl CoreContext {
    pub fn init(config: CoreConfig, names: Arc<dyn SourceNameLookup>) -> Result<Self> {
        let preferences: Arc<dyn PreferenceStore> =
            Arc::new(JsonPreferences::new(config.preferences_path()));
        Self::with_preferences(config, names, preferences)
    }

    /// Like [`init`](Self::init) with a caller-supplied preference store.
    pub fn with_preferences(
        config: CoreConfig,
        names: Arc<dyn SourceNameLookup>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Result<Self> {
        let storage = Arc::new(
            StorageManager::new(config.storage_dir()).context("preparing storage directories")?,
        );
        let cover_cache =
            Arc::new(CoverCache::new(config.cover_cache_dir()).context("opening cover cache")?);

        let local = Arc::new(LocalSource::new(Arc::clone(&storage)));
        let registry = Arc::new(SourceRegistry::new(local, names));

        let covers = Arc::new(CoverMetadataCache::new());
        let summary = covers.load(preferences.as_ref());
        info!(
            ratios = summary.ratios,
            colors = summary.colors,
            dropped = summary.dropped,
            "cover metadata loaded"
        );

        Ok(Self { config, storage, registry, covers, cover_cache, preferences, reconciler: None })
    }

    /// Start following the installed-extension feed. Replaces any previous reconciler.
    pub fn start(&mut self, extensions: ExtensionReceiver) {
        if let Some(previous) = self.reconciler.take() {
            previous.abort();
        }
        self.reconciler = Some(self.registry.spawn(extensions));
    }

    /// Analyze the cover of one manga using the cached thumbnail or custom cover.
    pub async fn refresh_cover(
        &self,
        request: CoverRequest,
        thumbnail_url: Option<String>,
    ) -> CoverOutcome {
        let provider = self.cover_cache.provider(request.manga_id, thumbnail_url);
        self.covers.compute_and_store(request, provider).await
    }

    /// Drop the custom cover and forget metadata derived from it.
    pub fn reset_custom_cover(&self, manga: MangaId) -> Result<bool> {
        let removed = self.cover_cache.delete_custom_cover(manga)?;
        if removed {
            self.covers.remove(manga);
        }
        Ok(removed)
    }

    pub fn persist(&self) -> Result<()> {
        self.covers.persist(self.preferences.as_ref())
    }

    /// Stop the reconciler and flush cover metadata.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(reconciler) = self.reconciler.take() {
            reconciler.abort();
            if let Err(err) = reconciler.await {
                if !err.is_cancelled() {
                    warn!("registry reconciler ended abnormally: {err}");
                }
            }
        }
        self.persist()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub fn covers(&self) -> &Arc<CoverMetadataCache> {
        &self.covers
    }

    pub fn cover_cache(&self) -> &Arc<CoverCache> {
        &self.cover_cache
    }

    pub fn preferences(&self) -> &Arc<dyn PreferenceStore> {
        &self.preferences
    }
}
