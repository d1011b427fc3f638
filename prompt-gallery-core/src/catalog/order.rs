//! Category display order
//!
//! Every library type and every declared section gets an integer rank: the
//! user's override when set, else the library default. Sections default to
//! their parent's rank plus their position, so they follow the parent.

use indexmap::IndexMap;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::{compare_names, CUSTOM_CATEGORY};
use crate::library::LibraryDescriptor;

/// Setting id under which a category's rank override is stored
pub fn category_setting_id(category: &str) -> String {
    category.split_whitespace().collect()
}

/// Setting id for a section of a category
pub fn section_setting_id(category: &str, section: &str) -> String {
    format!("{}_{}", category_setting_id(category), section)
}

/// Display name of a section inside the order index
pub fn section_display_name(category: &str, section: &str) -> String {
    format!("{category} - {section}")
}

/// Resolved, deterministic order of categories and sections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryOrder {
    names: Vec<String>,
    ranks: Vec<(String, i64)>,
    aliases: HashMap<String, String>,
}

impl CategoryOrder {
    /// Resolve the order from library defaults and user overrides
    ///
    /// `overrides` is keyed by [`category_setting_id`] / [`section_setting_id`].
    pub fn resolve(libraries: &[LibraryDescriptor], overrides: &HashMap<String, i64>) -> Self {
        let mut ranks: IndexMap<String, i64> = IndexMap::new();
        let mut aliases = HashMap::new();

        for library in libraries {
            let rank = overrides
                .get(&category_setting_id(&library.category))
                .copied()
                .unwrap_or(library.order);
            ranks.insert(library.category.clone(), rank);

            for (position, label) in library.section_labels().enumerate() {
                let default_rank = rank + position as i64 + 1;
                let section_rank = overrides
                    .get(&section_setting_id(&library.category, label))
                    .copied()
                    .unwrap_or(default_rank);
                let display = section_display_name(&library.category, label);
                aliases.entry(label.to_string()).or_insert_with(|| display.clone());
                ranks.insert(display, section_rank);
            }
        }

        let mut ranks: Vec<(String, i64)> = ranks.into_iter().collect();
        ranks.sort_by(|(a_name, a_rank), (b_name, b_rank)| {
            a_rank.cmp(b_rank).then_with(|| compare_names(a_name, b_name))
        });

        Self {
            names: ranks.iter().map(|(name, _)| name.clone()).collect(),
            ranks,
            aliases,
        }
    }

    /// The category order index
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Names paired with their resolved rank, in order
    pub fn ranks(&self) -> &[(String, i64)] {
        &self.ranks
    }

    /// Map a bare section label to its `"<parent> - <label>"` form
    pub fn normalize<'a>(&'a self, name: &'a str) -> Cow<'a, str> {
        match self.aliases.get(name) {
            Some(display) => Cow::Borrowed(display.as_str()),
            None => Cow::Borrowed(name),
        }
    }

    /// Position of a (normalized) name in the index
    pub fn position(&self, name: &str) -> Option<usize> {
        let normalized = self.normalize(name);
        self.names.iter().position(|n| *n == normalized)
    }

    /// Display comparison of two group names
    ///
    /// `Custom` is always last. Known names follow the index; unknown names
    /// come after every known one, alphabetically.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (a == CUSTOM_CATEGORY, b == CUSTOM_CATEGORY) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }

        match (self.position(a), self.position(b)) {
            (Some(ia), Some(ib)) => ia.cmp(&ib),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => compare_names(a, b),
        }
    }

    /// Sort group names for display
    pub fn sort<S: AsRef<str>>(&self, names: &mut [S]) {
        names.sort_by(|a, b| self.compare(a.as_ref(), b.as_ref()));
    }
}
