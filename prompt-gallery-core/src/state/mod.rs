//! Persisted user state
//!
//! Custom images, accordion and random-category toggles, sort direction and
//! dismissed notices. The JSON keys match the payload earlier releases wrote,
//! so existing saves keep loading.

mod persister;

pub use persister::{LoadOutcome, StatePersister, DEFAULT_SAVE_DELAY};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::catalog::CatalogEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserState {
    pub custom_images: Vec<CatalogEntry>,

    /// Accordion group -> expanded
    pub section_states: BTreeMap<String, bool>,

    /// Category -> enabled for random prompts
    pub category_states: BTreeMap<String, bool>,

    pub sort_ascending: bool,
    pub no_files_warning_dismissed: bool,
    pub download_link_dismissed: bool,
}

impl Default for UserState {
    fn default() -> Self {
        Self {
            custom_images: Vec::new(),
            section_states: BTreeMap::new(),
            category_states: BTreeMap::new(),
            sort_ascending: true,
            no_files_warning_dismissed: false,
            download_link_dismissed: false,
        }
    }
}

impl UserState {
    /// Parse a saved payload, or `None` when it is not a JSON object
    ///
    /// Fields are read one by one: a field of the wrong shape falls back to
    /// its default without discarding the others. Custom images are kept
    /// individually for the same reason.
    pub fn from_json(payload: &str) -> Option<Self> {
        let fields = match serde_json::from_str(payload) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                warn!("Ignoring saved state that is not an object");
                return None;
            }
            Err(e) => {
                warn!("Ignoring malformed saved state: {}", e);
                return None;
            }
        };

        let defaults = Self::default();
        Some(Self {
            custom_images: custom_images(&fields),
            section_states: field(&fields, "sectionStates", defaults.section_states),
            category_states: field(&fields, "categoryStates", defaults.category_states),
            sort_ascending: field(&fields, "sortAscending", defaults.sort_ascending),
            no_files_warning_dismissed: field(
                &fields,
                "noFilesWarningDismissed",
                defaults.no_files_warning_dismissed,
            ),
            download_link_dismissed: field(
                &fields,
                "downloadLinkDismissed",
                defaults.download_link_dismissed,
            ),
        })
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_section_expanded(&self, group: &str) -> bool {
        self.section_states.get(group).copied().unwrap_or(false)
    }

    pub fn is_category_enabled(&self, category: &str) -> bool {
        self.category_states.get(category).copied().unwrap_or(false)
    }
}

fn field<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str, fallback: T) -> T {
    match fields.get(key) {
        None | Some(Value::Null) => fallback,
        Some(value) => T::deserialize(value).unwrap_or_else(|e| {
            warn!("Ignoring saved {}: {}", key, e);
            fallback
        }),
    }
}

fn custom_images(fields: &Map<String, Value>) -> Vec<CatalogEntry> {
    let Some(items) = fields.get("customImages") else {
        return Vec::new();
    };
    let Some(items) = items.as_array() else {
        warn!("Ignoring saved customImages: not a list");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match CatalogEntry::deserialize(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Dropping unreadable custom image: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let state = UserState::default();
        assert!(state.sort_ascending);
        assert!(!state.no_files_warning_dismissed);
        assert!(!state.download_link_dismissed);
        assert!(state.custom_images.is_empty());
    }

    #[test]
    fn test_reads_saved_payload() {
        let payload = r#"{
            "customImages": [{"name":"a.png","path":"/prompt_gallery/image?filename=a.png&subfolder=custom","tags":"red","type":"Custom"}],
            "sectionStates": {"Hair": true},
            "categoryStates": {"Hair": true, "Eyes": false},
            "sortAscending": false,
            "noFilesWarningDismissed": true,
            "allYamlFilesPresent": true
        }"#;
        let state = UserState::from_json(payload).unwrap();

        assert_eq!(state.custom_images.len(), 1);
        assert!(state.is_section_expanded("Hair"));
        assert!(!state.is_section_expanded("Eyes"));
        assert!(state.is_category_enabled("Hair"));
        assert!(!state.sort_ascending);
        assert!(state.no_files_warning_dismissed);
        assert!(!state.download_link_dismissed);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let state = UserState::from_json("{}").unwrap();
        assert_eq!(state, UserState::default());
    }

    #[test]
    fn test_malformed_payloads() {
        assert_eq!(UserState::from_json("not json"), None);
        assert_eq!(UserState::from_json("[1, 2]"), None);
    }

    #[test]
    fn test_bad_field_keeps_the_rest() {
        let payload = r#"{
            "customImages": [
                {"name":"a.png","path":"p","tags":"red","type":"Custom"},
                {"name": 7}
            ],
            "sortAscending": "yes",
            "sectionStates": {"Hair": "open"},
            "downloadLinkDismissed": true
        }"#;
        let state = UserState::from_json(payload).unwrap();

        assert_eq!(state.custom_images.len(), 1);
        assert_eq!(state.custom_images[0].name, "a.png");
        assert!(state.sort_ascending);
        assert!(state.section_states.is_empty());
        assert!(state.download_link_dismissed);
    }

    #[test]
    fn test_writes_camel_case_keys() {
        let json = UserState::default().to_json().unwrap();
        assert!(json.contains("\"customImages\""));
        assert!(json.contains("\"sortAscending\":true"));
        assert!(json.contains("\"downloadLinkDismissed\":false"));
    }
}
