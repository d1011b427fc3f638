//! Storage ports - abstraction over where libraries, images and state live
//!
//! The gallery never touches the filesystem or the network directly. It talks
//! to these traits, which allows swapping between:
//! - [`FsStore`] - the on-disk data directory
//! - [`HttpRemoteSource`] - the published library manifest (feature `remote`)
//! - in-memory fakes (testing)

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::library::ManifestSet;

mod fs;
#[cfg(feature = "remote")]
mod remote;

pub use fs::{FsStore, CUSTOM_SUBFOLDER, IMAGE_EXTENSIONS, STATE_FILE};
#[cfg(feature = "remote")]
pub use remote::HttpRemoteSource;

/// Local library manifests and the documents they name
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Load the locally cached manifest set
    ///
    /// A missing file is `GalleryError::NotFound`, distinct from other failures.
    async fn local_libraries(&self) -> Result<ManifestSet>;

    /// Replace the locally cached manifest set
    async fn update_local_libraries(&self, set: &ManifestSet) -> Result<()>;

    /// Fetch a manifest document by filename, `None` when absent
    async fn document(&self, name: &str) -> Result<Option<String>>;
}

/// Where newer manifest sets are published
#[async_trait]
pub trait RemoteLibrarySource: Send + Sync {
    async fn remote_libraries(&self) -> Result<ManifestSet>;

    /// Source identifier for logging
    fn name(&self) -> &str;
}

/// Thumbnail and custom image storage
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store an uploaded image, returning its assigned storage name
    async fn upload(&self, subfolder: &str, file_name: &str, bytes: &[u8]) -> Result<String>;

    /// Whether the image is visible yet
    async fn exists(&self, subfolder: &str, name: &str) -> Result<bool>;

    /// Read the image bytes
    async fn fetch(&self, subfolder: &str, name: &str) -> Result<Vec<u8>>;
}

/// Key-value slot holding the serialized user state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the saved payload, `None` when nothing has been saved yet
    async fn load(&self) -> Result<Option<String>>;

    /// Overwrite the saved payload
    async fn save(&self, payload: &str) -> Result<()>;
}

/// Remote source that serves the local cache back
///
/// Used when running offline: versions always match, so the local set is
/// adopted without a network round-trip.
pub struct LocalMirror {
    store: Arc<dyn LibraryStore>,
}

impl LocalMirror {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RemoteLibrarySource for LocalMirror {
    async fn remote_libraries(&self) -> Result<ManifestSet> {
        self.store.local_libraries().await
    }

    fn name(&self) -> &str {
        "local-mirror"
    }
}
