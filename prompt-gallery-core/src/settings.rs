//! User configuration
//!
//! Read from `settings.yaml` under the platform config directory. A missing
//! file means defaults; unknown keys are rejected so typos surface early.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{GalleryError, Result};
use crate::library::DEFAULT_LIBRARIES_FILE;
use crate::selection::ExclusivityGroup;

/// Published location of the library manifest set
pub const DEFAULT_REMOTE_URL: &str = "https://raw.githubusercontent.com/Kinglord/ComfyUI_Prompt_Gallery/main/promptImages/promptGallery_libraries.json";

pub const MIN_THUMBNAIL_SIZE: u32 = 50;
pub const MAX_THUMBNAIL_SIZE: u32 = 250;

const SETTINGS_FILE: &str = "settings.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GallerySettings {
    /// Adopt a newer published manifest set automatically
    pub auto_update: bool,

    pub remote_url: String,

    /// Filename of the local manifest set cache inside the data root
    pub libraries_file: String,

    /// Thumbnail edge length in pixels
    pub max_thumbnail_size: u32,

    /// Show entry names under thumbnails
    pub display_labels: bool,

    /// Rank overrides keyed by category / section setting id
    pub category_order: HashMap<String, i64>,

    /// Categories of which at most one may be enabled for random prompts
    pub exclusive_categories: Vec<ExclusivityGroup>,

    /// Delay before low-priority state changes are saved
    pub save_debounce_secs: u64,

    /// Data root override; the platform data directory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            auto_update: true,
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            libraries_file: DEFAULT_LIBRARIES_FILE.to_string(),
            max_thumbnail_size: 100,
            display_labels: true,
            category_order: HashMap::new(),
            exclusive_categories: vec![ExclusivityGroup::new([
                "Game Characters",
                "Show Characters",
            ])],
            save_debounce_secs: 600,
            data_dir: None,
        }
    }
}

impl GallerySettings {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load_from_path(&path),
            None => {
                debug!("No config directory available, using default settings");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file; a missing file yields defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| GalleryError::malformed(format!("settings {}", path.display()), e))
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml_ng::Error> {
        serde_yaml_ng::from_str(content)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            serde_yaml_ng::to_string(self).map_err(|e| GalleryError::malformed("settings", e))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Thumbnail size clamped to the supported range
    pub fn thumbnail_size(&self) -> u32 {
        self.max_thumbnail_size
            .clamp(MIN_THUMBNAIL_SIZE, MAX_THUMBNAIL_SIZE)
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_secs(self.save_debounce_secs)
    }

    /// Data root: the configured override or the platform data directory
    pub fn resolve_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(default_data_dir)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "prompt-gallery")
}

/// `settings.yaml` under the platform config directory
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .or_else(|| dirs::config_dir().map(|d| d.join("prompt-gallery")))
        .map(|dir| dir.join(SETTINGS_FILE))
}

/// Platform data directory holding libraries, thumbnails and user state
pub fn default_data_dir() -> Option<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .or_else(|| dirs::data_dir().map(|d| d.join("prompt-gallery")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = GallerySettings::load_from_path(&dir.path().join("none.yaml")).unwrap();
        assert_eq!(settings, GallerySettings::default());
        assert!(settings.auto_update);
        assert_eq!(settings.save_delay(), Duration::from_secs(600));
        assert_eq!(settings.exclusive_categories.len(), 1);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = "\
auto_update: false
max_thumbnail_size: 400
category_order:
  FemaleBody: 3
  FemaleBody_Build: 4
exclusive_categories:
  - [Hair, Hats]
";
        let settings = GallerySettings::from_yaml(yaml).unwrap();
        assert!(!settings.auto_update);
        assert_eq!(settings.thumbnail_size(), 250);
        assert_eq!(settings.category_order.get("FemaleBody_Build"), Some(&4));
        assert_eq!(settings.exclusive_categories, vec![ExclusivityGroup::new(["Hair", "Hats"])]);
        assert_eq!(settings.libraries_file, "promptGallery_libraries.json");
        assert!(settings.display_labels);
    }

    #[test]
    fn test_thumbnail_size_clamped_low() {
        let settings = GallerySettings {
            max_thumbnail_size: 10,
            ..Default::default()
        };
        assert_eq!(settings.thumbnail_size(), 50);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "auto_updte: false\n").unwrap();

        let err = GallerySettings::load_from_path(&path).unwrap_err();
        assert!(matches!(err, GalleryError::MalformedInput { .. }));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.yaml");
        let settings = GallerySettings {
            display_labels: false,
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        settings.save_to_path(&path).unwrap();

        let loaded = GallerySettings::load_from_path(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.resolve_data_dir(), Some(dir.path().to_path_buf()));
    }
}
