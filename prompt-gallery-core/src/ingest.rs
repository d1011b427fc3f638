//! Custom image ingestion
//!
//! An upload is only usable once the image store serves it back, so ingestion
//! polls for visibility before touching the catalog. Metadata extraction is
//! best effort: the image stays added whatever happens to its tags.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{GalleryError, Result};
use crate::metadata;
use crate::notify::{Notification, Notifier};
use crate::store::{ImageStore, CUSTOM_SUBFOLDER};

/// How long to wait for an upload to become visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_millis(500),
        }
    }
}

/// What happened to the tags of an ingested image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    Extracted(String),
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Storage name, also the custom entry's name
    pub name: String,
    /// False when an entry with that name already existed
    pub added: bool,
    pub metadata: MetadataOutcome,
}

/// Final path component of a storage name, for either separator
pub fn storage_name(assigned: &str) -> &str {
    assigned.rsplit(&['\\', '/'][..]).next().unwrap_or(assigned)
}

/// Poll until the image store serves `name`, or fail with `Timeout`
pub async fn wait_until_visible(
    images: &dyn ImageStore,
    name: &str,
    policy: PollPolicy,
) -> Result<()> {
    for attempt in 1..=policy.attempts {
        match images.exists(CUSTOM_SUBFOLDER, name).await {
            Ok(true) => {
                debug!("{} visible after {} attempt(s)", name, attempt);
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => warn!("Visibility check {} for {} failed: {}", attempt, name, e),
        }
        tokio::time::sleep(policy.delay).await;
    }

    Err(GalleryError::Timeout {
        what: format!("File {name}"),
        attempts: policy.attempts,
        delay: policy.delay,
    })
}

/// Fetch a stored custom image and extract its prompt
pub async fn read_metadata(images: &dyn ImageStore, name: &str) -> MetadataOutcome {
    match images.fetch(CUSTOM_SUBFOLDER, name).await {
        Ok(bytes) => {
            let prompt = metadata::extract(&bytes);
            if prompt.is_empty() {
                MetadataOutcome::NotFound
            } else {
                MetadataOutcome::Extracted(prompt)
            }
        }
        Err(e) => {
            warn!("Failed to fetch {} for metadata: {}", name, e);
            MetadataOutcome::Failed(e.to_string())
        }
    }
}

/// Uploads images and folds them into the catalog's custom entries
pub struct Ingestor<'a> {
    images: &'a dyn ImageStore,
    notifier: &'a dyn Notifier,
    policy: PollPolicy,
}

impl<'a> Ingestor<'a> {
    pub fn new(images: &'a dyn ImageStore, notifier: &'a dyn Notifier, policy: PollPolicy) -> Self {
        Self {
            images,
            notifier,
            policy,
        }
    }

    /// Upload, wait for visibility, then add or refresh the custom entry
    ///
    /// Upload and visibility failures abort before the catalog changes.
    pub async fn ingest(
        &self,
        catalog: &mut Catalog,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<IngestReport> {
        let assigned = self.images.upload(CUSTOM_SUBFOLDER, file_name, bytes).await?;
        let name = storage_name(&assigned).to_string();
        if name.is_empty() {
            return Err(GalleryError::malformed(
                "upload response",
                "missing image name",
            ));
        }

        wait_until_visible(self.images, &name, self.policy).await?;

        let added = catalog.add_custom(CatalogEntry::custom(name.as_str(), ""));
        if !added {
            info!("{} already a custom image, refreshing it", name);
            self.notifier.notify(Notification::info(
                "Image Updated",
                format!("Metadata for \"{name}\" has been updated."),
            ));
        }

        let metadata = read_metadata(self.images, &name).await;
        match &metadata {
            MetadataOutcome::Extracted(tags) => {
                catalog.update_custom_tags(&name, tags);
                self.notifier.notify(Notification::success(
                    "Metadata Extracted",
                    "Prompt tags were successfully extracted from the image.",
                ));
            }
            MetadataOutcome::NotFound => self.notifier.notify(Notification::info(
                "No Metadata Found",
                "No prompt tags were found in the image metadata.",
            )),
            MetadataOutcome::Failed(_) => self.notifier.notify(Notification::error(
                "Metadata Extraction Failed",
                "An error occurred while trying to extract metadata.",
            )),
        }

        Ok(IngestReport {
            name,
            added,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingNotifier;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Image store that becomes visible after a number of checks
    #[derive(Default)]
    struct SlowImageStore {
        files: Mutex<HashMap<String, Vec<u8>>>,
        hidden_checks: Mutex<u32>,
        checks: Mutex<u32>,
        assigned_prefix: String,
        fail_fetch: bool,
    }

    #[async_trait]
    impl ImageStore for SlowImageStore {
        async fn upload(&self, subfolder: &str, file_name: &str, bytes: &[u8]) -> Result<String> {
            self.files
                .lock()
                .unwrap()
                .insert(file_name.to_string(), bytes.to_vec());
            Ok(format!("{}{}/{}", self.assigned_prefix, subfolder, file_name))
        }

        async fn exists(&self, _subfolder: &str, name: &str) -> Result<bool> {
            *self.checks.lock().unwrap() += 1;
            let mut hidden = self.hidden_checks.lock().unwrap();
            if *hidden > 0 {
                *hidden -= 1;
                return Ok(false);
            }
            Ok(self.files.lock().unwrap().contains_key(name))
        }

        async fn fetch(&self, _subfolder: &str, name: &str) -> Result<Vec<u8>> {
            if self.fail_fetch {
                return Err(GalleryError::transport("fetching image", "HTTP 500"));
            }
            self.files
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| GalleryError::not_found(name))
        }
    }

    #[test]
    fn test_storage_name_keeps_last_component() {
        assert_eq!(storage_name("custom\\cat.png"), "cat.png");
        assert_eq!(storage_name("custom/sub/cat.png"), "cat.png");
        assert_eq!(storage_name("cat.png"), "cat.png");
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_after_retries() {
        let store = SlowImageStore {
            hidden_checks: Mutex::new(3),
            ..Default::default()
        };
        store.upload("custom", "a.png", b"x").await.unwrap();

        wait_until_visible(&store, "a.png", PollPolicy::default())
            .await
            .unwrap();
        assert_eq!(*store.checks.lock().unwrap(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_ten_attempts() {
        let store = SlowImageStore::default();
        let err = wait_until_visible(&store, "ghost.png", PollPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GalleryError::Timeout { attempts: 10, .. }));
        assert_eq!(*store.checks.lock().unwrap(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_without_metadata() {
        let store = SlowImageStore {
            assigned_prefix: "uploads\\".into(),
            ..Default::default()
        };
        let notifier = CollectingNotifier::new();
        let mut catalog = Catalog::default();

        let report = Ingestor::new(&store, &notifier, PollPolicy::default())
            .ingest(&mut catalog, "cat.png", b"not a png")
            .await
            .unwrap();

        assert_eq!(report.name, "cat.png");
        assert!(report.added);
        assert_eq!(report.metadata, MetadataOutcome::NotFound);
        assert_eq!(catalog.custom_entries().len(), 1);
        assert_eq!(notifier.summaries(), vec!["No Metadata Found".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reingest_refreshes_existing_entry() {
        let store = SlowImageStore::default();
        let notifier = CollectingNotifier::new();
        let mut catalog = Catalog::default();
        catalog.add_custom(CatalogEntry::custom("cat.png", "kept tags"));

        let report = Ingestor::new(&store, &notifier, PollPolicy::default())
            .ingest(&mut catalog, "cat.png", b"x")
            .await
            .unwrap();

        assert!(!report.added);
        assert_eq!(catalog.custom_entries().len(), 1);
        assert_eq!(catalog.find_custom("cat.png").unwrap().tags, "kept tags");
        assert_eq!(notifier.summaries()[0], "Image Updated");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_keeps_image() {
        let store = SlowImageStore {
            fail_fetch: true,
            ..Default::default()
        };
        let notifier = CollectingNotifier::new();
        let mut catalog = Catalog::default();

        let report = Ingestor::new(&store, &notifier, PollPolicy::default())
            .ingest(&mut catalog, "cat.png", b"x")
            .await
            .unwrap();

        assert!(matches!(report.metadata, MetadataOutcome::Failed(_)));
        assert!(catalog.find_custom("cat.png").is_some());
        assert_eq!(notifier.summaries(), vec!["Metadata Extraction Failed".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invisible_upload_leaves_catalog_untouched() {
        let store = SlowImageStore {
            hidden_checks: Mutex::new(100),
            ..Default::default()
        };
        let notifier = CollectingNotifier::new();
        let mut catalog = Catalog::default();

        let err = Ingestor::new(&store, &notifier, PollPolicy::default())
            .ingest(&mut catalog, "cat.png", b"x")
            .await
            .unwrap_err();

        assert!(matches!(err, GalleryError::Timeout { .. }));
        assert!(catalog.custom_entries().is_empty());
    }
}
