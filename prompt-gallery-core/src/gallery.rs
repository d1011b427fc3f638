//! Gallery session - wires libraries, catalog, state and notifications
//!
//! One [`Gallery`] lives for the length of a user session:
//!
//! ```text
//! open ─▶ load ─┬─ saved state ──────────────▶ custom entries, toggles
//!               ├─ ManifestRegistry::resolve ▶ descriptors, category order
//!               ├─ verify_all_present ───────▶ download link visibility
//!               └─ rebuild_catalog ──────────▶ parsed library entries
//! ```
//!
//! Every mutation takes `&mut self`, so a rebuild can never interleave with a
//! read for display or composition.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, CategoryOrder, DisplayGroup, SearchResults};
use crate::compose::{self, ComposeError};
use crate::error::Result;
use crate::ingest::{IngestReport, Ingestor, PollPolicy};
use crate::library::{ManifestRegistry, ManifestSet};
use crate::notify::{Notification, Notifier};
use crate::parser;
use crate::selection::CategorySelection;
use crate::settings::GallerySettings;
use crate::state::{LoadOutcome, StatePersister};
use crate::store::{
    FsStore, ImageStore, LibraryStore, LocalMirror, RemoteLibrarySource, StateStore,
};
use crate::target::{Delivery, InsertionTarget};

/// The collaborators a gallery talks to
#[derive(Clone)]
pub struct GalleryStores {
    pub libraries: Arc<dyn LibraryStore>,
    pub remote: Arc<dyn RemoteLibrarySource>,
    pub images: Arc<dyn ImageStore>,
    pub state: Arc<dyn StateStore>,
}

impl GalleryStores {
    /// Serve every local concern from one data directory
    pub fn from_fs(store: FsStore, remote: Arc<dyn RemoteLibrarySource>) -> Self {
        Self::from_parts(Arc::new(store), remote)
    }

    /// Like [`GalleryStores::from_fs`], never reaching out to the network
    pub fn offline(store: FsStore) -> Self {
        let store = Arc::new(store);
        let remote = Arc::new(LocalMirror::new(store.clone()));
        Self::from_parts(store, remote)
    }

    fn from_parts(store: Arc<FsStore>, remote: Arc<dyn RemoteLibrarySource>) -> Self {
        Self {
            libraries: store.clone(),
            remote,
            images: store.clone(),
            state: store,
        }
    }
}

pub struct Gallery {
    settings: GallerySettings,
    registry: ManifestRegistry,
    libraries: Arc<dyn LibraryStore>,
    images: Arc<dyn ImageStore>,
    notifier: Arc<dyn Notifier>,
    persister: StatePersister,
    catalog: Catalog,
    manifest: Option<Arc<ManifestSet>>,
    order: CategoryOrder,
    missing: BTreeSet<String>,
    all_present: bool,
    poll: PollPolicy,
}

impl Gallery {
    pub fn open(
        settings: GallerySettings,
        stores: GalleryStores,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let registry = ManifestRegistry::new(
            Arc::clone(&stores.libraries),
            stores.remote,
            settings.auto_update,
        );
        let persister = StatePersister::new(stores.state, settings.save_delay());

        Self {
            settings,
            registry,
            libraries: stores.libraries,
            images: stores.images,
            notifier,
            persister,
            catalog: Catalog::default(),
            manifest: None,
            order: CategoryOrder::default(),
            missing: BTreeSet::new(),
            all_present: false,
            poll: PollPolicy::default(),
        }
    }

    /// Override how long ingestion waits for uploads to become visible
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Start the session: saved state, libraries, presence check, catalog
    ///
    /// Nothing here fails the session. Failures are logged, surfaced as
    /// notifications, and the gallery continues with what it has.
    pub async fn load(&mut self) {
        match self.persister.load().await {
            LoadOutcome::Failed(e) => self.notifier.notify(Notification::warning(
                "Saved Data Unavailable",
                format!("Using default settings: {e}"),
            )),
            LoadOutcome::Malformed => warn!("Saved state was unreadable, using defaults"),
            LoadOutcome::Restored | LoadOutcome::Fresh => {}
        }
        let custom = self.persister.read(|s| s.custom_images.clone());
        self.catalog.set_custom_entries(custom);

        self.manifest = self.resolve_libraries().await;
        self.order = CategoryOrder::resolve(
            self.manifest
                .as_deref()
                .map(|m| m.libraries.as_slice())
                .unwrap_or_default(),
            &self.settings.category_order,
        );

        self.all_present = match (&self.manifest, self.registry.resolved()) {
            (Some(_), Some(_)) => self.registry.verify_all_present().await,
            (Some(fallback), None) => self.registry.documents_present(fallback).await,
            (None, _) => false,
        };

        match self.rebuild_catalog().await {
            Ok(count) => info!("Gallery loaded with {} library entries", count),
            Err(e) => {
                error!("Failed to build catalog: {}", e);
                self.notifier
                    .notify(Notification::error("Library Load Failed", e.to_string()));
            }
        }
    }

    async fn resolve_libraries(&self) -> Option<Arc<ManifestSet>> {
        let err = match self.registry.resolve().await {
            Ok(set) => return Some(set),
            Err(e) => e,
        };

        warn!("Library resolution failed, falling back to local cache: {}", err);
        match self.registry.local_fallback().await {
            Ok(set) => Some(Arc::new(set)),
            Err(fallback) if fallback.is_not_found() => {
                info!("No local libraries yet");
                None
            }
            Err(fallback) => {
                error!("Local libraries unreadable: {}", fallback);
                self.notifier.notify(Notification::error(
                    "Libraries Unavailable",
                    err.to_string(),
                ));
                None
            }
        }
    }

    /// Re-parse every library document into the catalog
    ///
    /// Documents found missing are recorded and not requested again. Empty
    /// ones contribute no entries but still count as present. A store
    /// failure aborts the rebuild and keeps the previous entries.
    pub async fn rebuild_catalog(&mut self) -> Result<usize> {
        let Some(manifest) = self.manifest.clone() else {
            debug!("No libraries resolved, catalog left as is");
            return Ok(0);
        };

        let mut entries = Vec::new();
        for descriptor in &manifest.libraries {
            if self.missing.contains(&descriptor.name) {
                continue;
            }
            match self.libraries.document(&descriptor.name).await? {
                Some(document) if document.trim().is_empty() => {
                    debug!("Library document {} is empty, nothing to parse", descriptor.name);
                }
                Some(document) => entries.extend(parser::parse(&document, descriptor)),
                None => {
                    debug!("Library document {} missing, skipping", descriptor.name);
                    self.missing.insert(descriptor.name.clone());
                }
            }
        }

        let count = entries.len();
        self.catalog.replace_library_entries(entries);
        Ok(count)
    }

    pub fn settings(&self) -> &GallerySettings {
        &self.settings
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn order(&self) -> &CategoryOrder {
        &self.order
    }

    pub fn manifest(&self) -> Option<&ManifestSet> {
        self.manifest.as_deref()
    }

    /// Library documents found missing this session
    pub fn missing_documents(&self) -> impl Iterator<Item = &str> {
        self.missing.iter().map(String::as_str)
    }

    pub fn all_libraries_present(&self) -> bool {
        self.all_present
    }

    pub fn search(&mut self, term: &str) -> SearchResults<'_> {
        self.catalog.search(term)
    }

    /// Groups to render, honouring the active search and sort direction
    pub fn display(&self) -> Vec<DisplayGroup<'_>> {
        self.catalog.grouped_for_display(
            self.catalog.is_search_active(),
            &self.order,
            self.sort_ascending(),
        )
    }

    pub fn sort_ascending(&self) -> bool {
        self.persister.read(|s| s.sort_ascending)
    }

    /// Flip the entry sort direction; saved on the debounced schedule
    ///
    /// Must be called from within a tokio runtime.
    pub fn toggle_sort(&mut self) -> bool {
        let ascending = self.persister.update(|s| {
            s.sort_ascending = !s.sort_ascending;
            s.sort_ascending
        });
        self.persister.schedule_save();
        ascending
    }

    pub fn is_section_expanded(&self, group: &str) -> bool {
        self.persister.read(|s| s.is_section_expanded(group))
    }

    pub async fn set_section_expanded(&mut self, group: &str, expanded: bool) {
        self.persister
            .update(|s| s.section_states.insert(group.to_string(), expanded));
        self.persist().await;
    }

    pub fn is_category_enabled(&self, category: &str) -> bool {
        self.persister.read(|s| s.is_category_enabled(category))
    }

    /// Toggle a category for random prompts
    ///
    /// Returns the categories switched off by exclusivity groups.
    pub async fn set_category_enabled(&mut self, category: &str, enabled: bool) -> Vec<String> {
        let groups = &self.settings.exclusive_categories;
        let disabled = self.persister.update(|s| {
            CategorySelection::new(&mut s.category_states, groups).set_enabled(category, enabled)
        });
        self.persist().await;
        disabled
    }

    /// Library categories in display order
    pub fn categories(&self) -> Vec<&str> {
        let mut categories = self
            .manifest
            .as_deref()
            .map(ManifestSet::categories)
            .unwrap_or_default();
        self.order.sort(&mut categories);
        categories
    }

    /// Categories enabled for random prompts, in display order
    pub fn enabled_categories(&self) -> Vec<String> {
        let categories = self.categories();
        self.persister.read(|s| {
            categories
                .iter()
                .filter(|c| s.is_category_enabled(c))
                .map(|c| c.to_string())
                .collect()
        })
    }

    /// Whether a random prompt could draw from anything
    pub fn can_compose(&self) -> bool {
        self.catalog.has_library_entries()
    }

    /// Compose a random prompt from the enabled categories
    pub fn random_prompt(&self) -> std::result::Result<String, ComposeError> {
        let enabled = self.enabled_categories();
        let result = compose::compose(&self.catalog, &enabled);

        match &result {
            Ok(prompt) => debug!("Composed random prompt ({} chars)", prompt.len()),
            Err(ComposeError::NoCategoriesSelected) => self.notifier.notify(Notification::warning(
                "No Categories Selected",
                "Please select at least one category for random prompts.",
            )),
            Err(ComposeError::NoImagesFound) => self.notifier.notify(Notification::error(
                "No Images Found",
                "No images were found in the selected categories. Please try selecting different categories.",
            )),
        }
        result
    }

    /// Route tags to a widget or the clipboard and confirm to the user
    pub fn deliver(
        &self,
        image_name: &str,
        tags: &str,
        selected: Option<(&InsertionTarget, &str)>,
    ) -> Delivery {
        let delivery = Delivery::plan(selected, tags);
        self.notifier.notify(delivery.notification(image_name));
        delivery
    }

    /// Upload an image and add it as a custom entry
    pub async fn ingest_custom_image(
        &mut self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<IngestReport> {
        let ingestor = Ingestor::new(self.images.as_ref(), self.notifier.as_ref(), self.poll);
        let result = ingestor.ingest(&mut self.catalog, file_name, bytes).await;
        match result {
            Ok(report) => {
                self.sync_custom_entries();
                self.persist().await;
                self.notifier.notify(Notification::success(
                    "Upload Successful",
                    format!("Added custom image: {}", report.name),
                ));
                Ok(report)
            }
            Err(e) => {
                error!("Custom image upload failed: {}", e);
                self.notifier.notify(Notification::error(
                    "Upload Failed",
                    format!("Failed to add custom image: {e}"),
                ));
                Err(e)
            }
        }
    }

    /// Rewrite the tags of a custom entry; false when it does not exist
    pub async fn update_custom_tags(&mut self, name: &str, tags: &str) -> bool {
        if !self.catalog.update_custom_tags(name, tags) {
            return false;
        }
        self.sync_custom_entries();
        self.persist().await;
        true
    }

    pub async fn reset_custom_images(&mut self) {
        self.catalog.reset_custom();
        self.sync_custom_entries();
        self.persist().await;
        self.notifier.notify(Notification::info(
            "Custom Images Reset",
            "All custom images have been cleared.",
        ));
    }

    pub async fn dismiss_no_files_warning(&mut self) {
        self.persister.update(|s| s.no_files_warning_dismissed = true);
        self.persist().await;
    }

    pub async fn dismiss_download_link(&mut self) {
        self.persister.update(|s| s.download_link_dismissed = true);
        self.persist().await;
    }

    /// Offer the image-set download while any library document is missing
    pub fn should_show_download_link(&self) -> bool {
        !self.all_present && !self.persister.read(|s| s.download_link_dismissed)
    }

    /// Nothing to show at all, and the user has not waved the warning away
    pub fn should_show_no_files_warning(&self) -> bool {
        self.catalog.is_empty()
            && !self.catalog.is_search_active()
            && !self.persister.read(|s| s.no_files_warning_dismissed)
    }

    /// Flush pending state; call once when the session ends
    pub async fn shutdown(&mut self) -> Result<()> {
        self.persister.shutdown().await
    }

    fn sync_custom_entries(&self) {
        let custom = self.catalog.custom_entries().to_vec();
        self.persister.update(|s| s.custom_images = custom);
    }

    async fn persist(&mut self) {
        if let Err(e) = self.persister.save_now().await {
            warn!("Failed to save user state: {}", e);
        }
    }
}
