//! Filesystem-backed gallery storage
//!
//! Data directory layout:
//!
//! ```text
//! promptImages/
//! ├── promptGallery_libraries.json  ← local manifest set cache
//! ├── *.yaml                         ← manifest documents
//! ├── thumbnails/<subfolder>/<name>  ← library images (extension optional)
//! └── custom/<name>                  ← user uploads
//! ```
//!
//! User state lives in a separate file so wiping the data directory does not
//! lose it.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ImageStore, LibraryStore, StateStore};
use crate::error::{GalleryError, Result};
use crate::library::{ManifestSet, DEFAULT_LIBRARIES_FILE};

/// Subfolder name reserved for user uploads
pub const CUSTOM_SUBFOLDER: &str = "custom";

/// Extensions tried, in order, when an image is requested without one
pub const IMAGE_EXTENSIONS: &[&str] = &["", ".jpeg", ".jpg", ".png", ".webp"];

/// Default user state filename
pub const STATE_FILE: &str = "prompt_gallery_data.json";

/// Gallery storage rooted at a data directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    libraries_file: String,
    state_path: PathBuf,
}

impl FsStore {
    /// Store rooted at `root`, keeping user state inside it
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_path = root.join(STATE_FILE);
        Self {
            root,
            libraries_file: DEFAULT_LIBRARIES_FILE.to_string(),
            state_path,
        }
    }

    /// Keep user state somewhere else
    pub fn with_state_path(mut self, state_path: impl Into<PathBuf>) -> Self {
        self.state_path = state_path.into();
        self
    }

    /// Use a different local libraries filename
    pub fn with_libraries_file(mut self, libraries_file: impl Into<String>) -> Self {
        self.libraries_file = libraries_file.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    fn libraries_path(&self) -> PathBuf {
        self.root.join(&self.libraries_file)
    }

    fn image_dir(&self, subfolder: &str) -> PathBuf {
        if subfolder == CUSTOM_SUBFOLDER {
            self.root.join(CUSTOM_SUBFOLDER)
        } else {
            self.root.join("thumbnails").join(subfolder)
        }
    }

    /// Locate an image on disk, trying each known extension
    pub async fn find_image(&self, subfolder: &str, name: &str) -> Result<Option<PathBuf>> {
        validate_component(name)?;
        validate_subfolder(subfolder)?;

        let dir = self.image_dir(subfolder);
        for ext in IMAGE_EXTENSIONS {
            let candidate = dir.join(format!("{name}{ext}"));
            match tokio::fs::metadata(&candidate).await {
                Ok(meta) if meta.is_file() => return Ok(Some(candidate)),
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl LibraryStore for FsStore {
    async fn local_libraries(&self) -> Result<ManifestSet> {
        let path = self.libraries_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Local libraries file not found: {}", path.display());
                return Err(GalleryError::not_found(self.libraries_file.clone()));
            }
            Err(e) => {
                return Err(GalleryError::transport(
                    format!("reading {}", path.display()),
                    e,
                ))
            }
        };
        ManifestSet::from_json(&content)
    }

    async fn update_local_libraries(&self, set: &ManifestSet) -> Result<()> {
        let path = self.libraries_path();
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, set.to_json()?)
            .await
            .map_err(|e| GalleryError::transport(format!("writing {}", path.display()), e))?;
        debug!("Local libraries updated: {}", path.display());
        Ok(())
    }

    async fn document(&self, name: &str) -> Result<Option<String>> {
        validate_relative(name)?;
        let path = self.root.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GalleryError::transport(
                format!("reading {}", path.display()),
                e,
            )),
        }
    }
}

#[async_trait]
impl ImageStore for FsStore {
    async fn upload(&self, subfolder: &str, file_name: &str, bytes: &[u8]) -> Result<String> {
        if file_name.is_empty() {
            return Err(GalleryError::Precondition("No filename provided".into()));
        }
        validate_component(file_name)?;
        validate_subfolder(subfolder)?;

        let dir = self.image_dir(subfolder);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| GalleryError::transport(format!("writing {}", path.display()), e))?;

        Ok(format!("{subfolder}/{file_name}"))
    }

    async fn exists(&self, subfolder: &str, name: &str) -> Result<bool> {
        Ok(self.find_image(subfolder, name).await?.is_some())
    }

    async fn fetch(&self, subfolder: &str, name: &str) -> Result<Vec<u8>> {
        let path = self
            .find_image(subfolder, name)
            .await?
            .ok_or_else(|| GalleryError::not_found(format!("image {subfolder}/{name}")))?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| GalleryError::transport(format!("reading {}", path.display()), e))
    }
}

#[async_trait]
impl StateStore for FsStore {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.state_path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GalleryError::transport("loading user state", e)),
        }
    }

    async fn save(&self, payload: &str) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.state_path, payload)
            .await
            .map_err(|e| GalleryError::transport("saving user state", e))
    }
}

fn validate_component(name: &str) -> Result<()> {
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(GalleryError::InvalidPath { path: name.into() });
    }
    Ok(())
}

fn validate_relative(name: &str) -> Result<()> {
    if name.contains("..") || Path::new(name).is_absolute() {
        return Err(GalleryError::InvalidPath { path: name.into() });
    }
    Ok(())
}

fn validate_subfolder(subfolder: &str) -> Result<()> {
    if subfolder.starts_with('/') {
        return Err(GalleryError::InvalidPath {
            path: subfolder.into(),
        });
    }
    validate_relative(subfolder)
}
