//! Library manifest set parsing
//!
//! The libraries file (`promptGallery_libraries.json`) lists every manifest
//! document, the category it feeds and the hints the parser needs.

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{GalleryError, Result};

/// Category type used for randomized personas
pub const PERSONA_CATEGORY: &str = "Stereotypes";

/// A versioned set of library descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSet {
    /// Opaque version token, compared by inequality only
    ///
    /// Published files use strings, but any JSON scalar is accepted.
    #[serde(deserialize_with = "version_token")]
    pub version: String,

    /// Libraries in declaration order
    #[serde(default)]
    pub libraries: Vec<LibraryDescriptor>,
}

/// One manifest document and how to parse it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDescriptor {
    /// Manifest document filename
    pub name: String,

    /// Category label given to every entry of this document
    #[serde(rename = "type")]
    pub category: String,

    /// Default display rank
    #[serde(default)]
    pub order: i64,

    /// Number of leading path levels to drop
    #[serde(default)]
    pub skip_levels: usize,

    /// Path substring -> section label, in declaration order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<IndexMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_adjustment: Option<PathAdjustment>,

    /// Path segment stripped from every entry path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_key: Option<String>,
}

/// Path rewrite applied after `skipLevels`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathAdjustment {
    /// Segments dropped wherever they appear
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<String>>,

    /// Segment prepended to the path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<String>,
}

fn version_token<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(token) => Ok(token),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!("version must be a scalar, found {other}"))),
    }
}

impl ManifestSet {
    /// Parse a manifest set from its JSON form
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| GalleryError::malformed("library manifest", e))
    }

    /// Serialize to pretty JSON, the on-disk form of the local cache
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether `other` carries a different version token
    ///
    /// No ordering is implied: a remote set with an older version still
    /// counts as different.
    pub fn differs_from(&self, other: &ManifestSet) -> bool {
        self.version != other.version
    }

    /// Category labels in declaration order
    pub fn categories(&self) -> Vec<&str> {
        self.libraries.iter().map(|l| l.category.as_str()).collect()
    }

    /// Find the descriptor feeding a category
    pub fn descriptor_for(&self, category: &str) -> Option<&LibraryDescriptor> {
        self.libraries.iter().find(|l| l.category == category)
    }
}

impl LibraryDescriptor {
    /// Minimal descriptor, mostly useful for tests and ad-hoc parsing
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            order: 0,
            skip_levels: 0,
            sections: None,
            path_adjustment: None,
            ignore_key: None,
        }
    }

    /// Section labels in declaration order
    pub fn section_labels(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|sections| sections.values().map(String::as_str))
    }

    /// Whether entries from this descriptor are randomized personas
    pub fn is_persona(&self) -> bool {
        self.category == PERSONA_CATEGORY
    }
}
