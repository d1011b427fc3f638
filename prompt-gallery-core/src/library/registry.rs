//! Library manifest resolution
//!
//! Decides, once per session, whether the locally cached manifest set is
//! stale relative to the published one, and adopts exactly one of them.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::ManifestSet;
use crate::error::Result;
use crate::store::{LibraryStore, RemoteLibrarySource};

/// Resolves and memoizes the session's manifest set
pub struct ManifestRegistry {
    store: Arc<dyn LibraryStore>,
    remote: Arc<dyn RemoteLibrarySource>,
    auto_update: bool,
    resolved: OnceCell<Arc<ManifestSet>>,
}

impl ManifestRegistry {
    pub fn new(
        store: Arc<dyn LibraryStore>,
        remote: Arc<dyn RemoteLibrarySource>,
        auto_update: bool,
    ) -> Self {
        Self {
            store,
            remote,
            auto_update,
            resolved: OnceCell::new(),
        }
    }

    pub fn auto_update(&self) -> bool {
        self.auto_update
    }

    /// Resolve the manifest set for this session
    ///
    /// The first successful resolution is cached and every later (or
    /// concurrent) caller shares it. A failed resolution is not cached, so a
    /// later call retries.
    pub async fn resolve(&self) -> Result<Arc<ManifestSet>> {
        self.resolved
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    /// The already-resolved set, if any
    pub fn resolved(&self) -> Option<Arc<ManifestSet>> {
        self.resolved.get().cloned()
    }

    /// Read the local cache directly, bypassing remote comparison
    ///
    /// Used as the best-known fallback when full resolution fails.
    pub async fn local_fallback(&self) -> Result<ManifestSet> {
        self.store.local_libraries().await
    }

    async fn load(&self) -> Result<Arc<ManifestSet>> {
        let local = self.store.local_libraries().await?;
        let remote = self.remote.remote_libraries().await?;

        let adopted = if self.auto_update && local.differs_from(&remote) {
            info!(
                "Library update available from {} ({} -> {}), adopting",
                self.remote.name(),
                local.version,
                remote.version
            );
            self.store.update_local_libraries(&remote).await?;
            remote
        } else {
            debug!(
                "Using local libraries (version {}, auto update: {})",
                local.version, self.auto_update
            );
            local
        };

        debug!("Categories: {:?}", adopted.categories());
        Ok(Arc::new(adopted))
    }

    /// Whether every descriptor's document can be fetched
    ///
    /// Reuses the cached resolution. Returns false on the first missing or
    /// failing document, and when resolution itself fails.
    pub async fn verify_all_present(&self) -> bool {
        let set = match self.resolve().await {
            Ok(set) => set,
            Err(e) => {
                warn!("Cannot verify library documents: {}", e);
                return false;
            }
        };

        self.documents_present(&set).await
    }

    /// Whether every document named by `set` can be fetched
    pub async fn documents_present(&self, set: &ManifestSet) -> bool {
        for library in &set.libraries {
            match self.store.document(&library.name).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!("Library document not found: {}", library.name);
                    return false;
                }
                Err(e) => {
                    warn!("Error checking library document {}: {}", library.name, e);
                    return false;
                }
            }
        }

        debug!("All library documents present");
        true
    }
}
