//! Prompt Gallery catalog - the in-memory index of taggable images
//!
//! Library entries come from parsing manifest documents; custom entries come
//! from user uploads. The catalog owns search filtering and the grouping and
//! ordering used for display.

mod entry;
pub mod order;

pub use entry::{
    image_locator, parse_locator, CatalogEntry, CUSTOM_CATEGORY, IMAGE_ROUTE,
    LIBRARY_IMAGE_PREFIX,
};
pub use order::CategoryOrder;

use std::cmp::Ordering;
use tracing::debug;

/// Case-insensitive name comparison with a stable tie-break
pub(crate) fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Entries matching the active search term
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults<'a> {
    pub entries: Vec<&'a CatalogEntry>,
    pub custom: Vec<&'a CatalogEntry>,
}

impl SearchResults<'_> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.custom.is_empty()
    }
}

/// One display group (accordion section)
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayGroup<'a> {
    /// Section label or category
    pub name: String,
    pub entries: Vec<&'a CatalogEntry>,
}

/// Library and custom entries plus the current search filter
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    custom: Vec<CatalogEntry>,
    search_term: Option<String>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>, custom: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            custom,
            search_term: None,
        }
    }

    /// Swap in a freshly parsed set of library entries
    ///
    /// Custom entries and the active search survive the swap.
    pub fn replace_library_entries(&mut self, entries: Vec<CatalogEntry>) {
        debug!("Catalog rebuilt with {} library entries", entries.len());
        self.entries = entries;
    }

    /// Every parsed library entry, unfiltered
    pub fn all_entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn custom_entries(&self) -> &[CatalogEntry] {
        &self.custom
    }

    /// Whether any non-custom entry exists (random prompts need one)
    pub fn has_library_entries(&self) -> bool {
        self.entries.iter().any(|e| !e.is_custom())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.custom.is_empty()
    }

    /// Unfiltered library entries of one category
    pub fn entries_in_category(&self, category: &str) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }

    /// Distinct categories of library entries, in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.category.as_str()) {
                seen.push(&entry.category);
            }
        }
        seen
    }

    /// Apply a search term; an empty term clears filtering
    ///
    /// Matches case-insensitively against entry name and subcategory.
    pub fn search(&mut self, term: &str) -> SearchResults<'_> {
        let term = term.to_lowercase();
        self.search_term = if term.is_empty() { None } else { Some(term) };
        self.filtered()
    }

    pub fn clear_search(&mut self) {
        self.search_term = None;
    }

    pub fn is_search_active(&self) -> bool {
        self.search_term.is_some()
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search_term.as_deref()
    }

    /// Entries visible under the current search (everything when inactive)
    pub fn filtered(&self) -> SearchResults<'_> {
        match &self.search_term {
            Some(term) => SearchResults {
                entries: self.entries.iter().filter(|e| e.matches(term)).collect(),
                custom: self.custom.iter().filter(|e| e.matches(term)).collect(),
            },
            None => SearchResults {
                entries: self.entries.iter().collect(),
                custom: self.custom.iter().collect(),
            },
        }
    }

    /// Group entries for display
    ///
    /// Groups are keyed by section (or category), deduplicated on
    /// `(name, path)`, sorted with `order`, and always end with a `Custom`
    /// group. Entries inside a group are sorted by name in the requested
    /// direction.
    pub fn grouped_for_display(
        &self,
        use_filtered: bool,
        order: &CategoryOrder,
        ascending: bool,
    ) -> Vec<DisplayGroup<'_>> {
        let visible = if use_filtered {
            self.filtered()
        } else {
            SearchResults {
                entries: self.entries.iter().collect(),
                custom: self.custom.iter().collect(),
            }
        };

        let mut groups: Vec<DisplayGroup<'_>> = Vec::new();
        for entry in visible.entries {
            let name = entry.group();
            if name == CUSTOM_CATEGORY {
                continue;
            }
            let index = match groups.iter().position(|g| g.name == name) {
                Some(index) => index,
                None => {
                    groups.push(DisplayGroup {
                        name: name.to_string(),
                        entries: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[index];
            if !group
                .entries
                .iter()
                .any(|e| e.name == entry.name && e.path == entry.path)
            {
                group.entries.push(entry);
            }
        }

        groups.push(DisplayGroup {
            name: CUSTOM_CATEGORY.to_string(),
            entries: visible.custom,
        });

        groups.sort_by(|a, b| order.compare(&a.name, &b.name));
        for group in &mut groups {
            group.entries.sort_by(|a, b| {
                let ordering = compare_names(&a.name, &b.name);
                if ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        groups
    }

    /// Add a custom entry, or refresh the path of the existing one
    ///
    /// Returns true when a new entry was added.
    pub fn add_custom(&mut self, entry: CatalogEntry) -> bool {
        match self.custom.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => {
                existing.path = entry.path;
                false
            }
            None => {
                self.custom.push(entry);
                true
            }
        }
    }

    pub fn find_custom(&self, name: &str) -> Option<&CatalogEntry> {
        self.custom.iter().find(|e| e.name == name)
    }

    /// Rewrite the tags of a custom entry; false when it does not exist
    pub fn update_custom_tags(&mut self, name: &str, tags: &str) -> bool {
        match self.custom.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                entry.tags = tags.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_custom_entries(&mut self, custom: Vec<CatalogEntry>) {
        self.custom = custom;
    }

    pub fn reset_custom(&mut self) {
        self.custom.clear();
    }
}
