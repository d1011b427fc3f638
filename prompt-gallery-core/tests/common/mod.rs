//! Shared helpers for gallery integration tests
//!
//! Each test file pulls this in with `mod common;`, so not every helper is
//! used by every file.
#![allow(dead_code)]

use async_trait::async_trait;
use prompt_gallery_core::library::{LibraryDescriptor, ManifestSet};
use prompt_gallery_core::store::{FsStore, LibraryStore, RemoteLibrarySource, StateStore};
use prompt_gallery_core::{GalleryError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

/// Initialize logging for tests (only once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub const HAIR_YAML: &str = "\
ponyxl:
  Hair:
    Length:
      long:
        - long hair
      short:
        - short hair,
    Style:
      braid:
        - braided hair BREAK
";

pub const BODY_YAML: &str = "\
ponyxl:
  FemaleBody:
    Build:
      slim:
        - tall, slim
    Race:
      elf:
        - elf, pointy ears
";

pub fn hair_library() -> LibraryDescriptor {
    LibraryDescriptor {
        order: 20,
        ..LibraryDescriptor::new("hair.yaml", "Hair")
    }
}

pub fn body_library() -> LibraryDescriptor {
    let mut body = LibraryDescriptor {
        order: 10,
        skip_levels: 1,
        ..LibraryDescriptor::new("female_body.yaml", "Female Body")
    };
    body.sections = Some(
        [("Build", "Build"), ("Race", "Race")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    );
    body
}

pub fn manifest(version: &str, libraries: Vec<LibraryDescriptor>) -> ManifestSet {
    ManifestSet {
        version: version.to_string(),
        libraries,
    }
}

/// Lay out a data directory with the given manifest set and documents
pub fn seed_data_dir(root: &Path, set: &ManifestSet, documents: &[(&str, &str)]) -> FsStore {
    std::fs::create_dir_all(root).unwrap();
    std::fs::write(
        root.join("promptGallery_libraries.json"),
        set.to_json().unwrap(),
    )
    .unwrap();
    for (name, content) in documents {
        std::fs::write(root.join(name), content).unwrap();
    }
    FsStore::new(root)
}

/// Remote source serving a fixed manifest set, or failing when there is none
pub struct StaticRemote {
    set: Option<ManifestSet>,
    pub fetches: AtomicUsize,
}

impl StaticRemote {
    pub fn serving(set: ManifestSet) -> Self {
        Self {
            set: Some(set),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            set: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteLibrarySource for StaticRemote {
    async fn remote_libraries(&self) -> Result<ManifestSet> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.set
            .clone()
            .ok_or_else(|| GalleryError::transport("fetching remote libraries", "unreachable"))
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// State slot kept in memory, counting writes
#[derive(Default)]
pub struct MemoryStateStore {
    saved: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryStateStore {
    pub fn with_payload(payload: &str) -> Self {
        Self {
            saved: Mutex::new(Some(payload.to_string())),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn saved(&self) -> Option<String> {
        self.saved.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.saved())
    }

    async fn save(&self, payload: &str) -> Result<()> {
        *self.saved.lock().unwrap() = Some(payload.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A 1x1 PNG carrying a workflow in its `prompt` text chunk
pub fn png_with_prompt(workflow: &str) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, 1, 1);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .add_text_chunk("prompt".to_string(), workflow.to_string())
            .unwrap();
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&[0]).unwrap();
    }
    bytes
}

/// Library store that starts failing document reads once armed
pub struct FailingDocuments {
    inner: FsStore,
    /// Reads still allowed once armed; negative while disarmed
    remaining: AtomicIsize,
}

impl FailingDocuments {
    pub fn new(inner: FsStore) -> Self {
        Self {
            inner,
            remaining: AtomicIsize::new(-1),
        }
    }

    /// Let `reads` more documents through, then fail every read
    pub fn fail_after(&self, reads: isize) {
        self.remaining.store(reads, Ordering::SeqCst);
    }
}

#[async_trait]
impl LibraryStore for FailingDocuments {
    async fn local_libraries(&self) -> Result<ManifestSet> {
        self.inner.local_libraries().await
    }

    async fn update_local_libraries(&self, set: &ManifestSet) -> Result<()> {
        self.inner.update_local_libraries(set).await
    }

    async fn document(&self, name: &str) -> Result<Option<String>> {
        let remaining = self.remaining.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(GalleryError::transport(
                format!("reading {name}"),
                "storage offline",
            ));
        }
        if remaining > 0 {
            self.remaining.fetch_sub(1, Ordering::SeqCst);
        }
        self.inner.document(name).await
    }
}
