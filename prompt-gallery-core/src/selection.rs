//! Which categories feed random prompts
//!
//! Toggles live in `UserState.category_states`. Exclusivity groups keep
//! mutually incompatible categories from being enabled together: enabling
//! one member switches every other member of its groups off.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Categories of which at most one may be enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusivityGroup(Vec<String>);

impl ExclusivityGroup {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(members.into_iter().map(Into::into).collect())
    }

    pub fn members(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.iter().any(|m| m == category)
    }
}

/// View over the enabled-for-random toggles
pub struct CategorySelection<'a> {
    states: &'a mut BTreeMap<String, bool>,
    groups: &'a [ExclusivityGroup],
}

impl<'a> CategorySelection<'a> {
    pub fn new(states: &'a mut BTreeMap<String, bool>, groups: &'a [ExclusivityGroup]) -> Self {
        Self { states, groups }
    }

    pub fn is_enabled(&self, category: &str) -> bool {
        self.states.get(category).copied().unwrap_or(false)
    }

    /// Set a toggle and return the categories switched off as a result
    pub fn set_enabled(&mut self, category: &str, enabled: bool) -> Vec<String> {
        self.states.insert(category.to_string(), enabled);
        if !enabled {
            return Vec::new();
        }

        let mut disabled = Vec::new();
        for group in self.groups.iter().filter(|g| g.contains(category)) {
            for other in group.members().iter().filter(|m| *m != category) {
                if self.states.insert(other.clone(), false) == Some(true) {
                    debug!("'{}' disabled by exclusive '{}'", other, category);
                    disabled.push(other.clone());
                }
            }
        }
        disabled
    }

    /// Enabled categories, in the given display order
    pub fn enabled<'n>(&self, display_order: &[&'n str]) -> Vec<&'n str> {
        display_order
            .iter()
            .copied()
            .filter(|category| self.is_enabled(category))
            .collect()
    }
}
