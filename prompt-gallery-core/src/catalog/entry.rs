//! Catalog entry records and image locators

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::store::CUSTOM_SUBFOLDER;

/// Category label of user-uploaded entries
pub const CUSTOM_CATEGORY: &str = "Custom";

/// Route the rendering layer resolves image locators against
pub const IMAGE_ROUTE: &str = "/prompt_gallery/image";

/// Prefix segment of every library thumbnail subfolder
pub const LIBRARY_IMAGE_PREFIX: &str = "ponyxl";

// Same set `encodeURIComponent` leaves alone
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// One taggable image record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Display key
    pub name: String,

    /// Opaque locator the rendering layer resolves to bytes
    pub path: String,

    /// Raw tag text, not yet cleaned
    #[serde(default)]
    pub tags: String,

    /// Category label: a library type or `Custom`
    #[serde(rename = "type")]
    pub category: String,

    /// Immediate parent path segment
    #[serde(default)]
    pub subcategory: String,

    /// Secondary grouping label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl CatalogEntry {
    /// A user-uploaded entry stored under the custom subfolder
    pub fn custom(name: impl Into<String>, tags: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: image_locator(&name, CUSTOM_SUBFOLDER),
            name,
            tags: tags.into(),
            category: CUSTOM_CATEGORY.to_string(),
            subcategory: String::new(),
            section: None,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.category == CUSTOM_CATEGORY
    }

    /// Display group: the section when set, the category otherwise
    pub fn group(&self) -> &str {
        self.section.as_deref().unwrap_or(&self.category)
    }

    /// Whether name or subcategory contains an already-lowercased term
    pub fn matches(&self, term_lower: &str) -> bool {
        self.name.to_lowercase().contains(term_lower)
            || self.subcategory.to_lowercase().contains(term_lower)
    }

    /// Decode the locator back into `(filename, subfolder)`
    pub fn image_ref(&self) -> Option<(String, String)> {
        parse_locator(&self.path)
    }
}

/// Build the locator for an image
pub fn image_locator(filename: &str, subfolder: &str) -> String {
    format!(
        "{IMAGE_ROUTE}?filename={}&subfolder={}",
        utf8_percent_encode(filename, COMPONENT),
        utf8_percent_encode(subfolder, COMPONENT)
    )
}

/// Split a locator built by [`image_locator`] into `(filename, subfolder)`
pub fn parse_locator(locator: &str) -> Option<(String, String)> {
    let query = locator.strip_prefix(IMAGE_ROUTE)?.strip_prefix('?')?;

    let mut filename = None;
    let mut subfolder = String::new();
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=')?;
        let value = percent_decode_str(value).decode_utf8().ok()?.into_owned();
        match key {
            "filename" => filename = Some(value),
            "subfolder" => subfolder = value,
            _ => {}
        }
    }

    filename.map(|f| (f, subfolder))
}
