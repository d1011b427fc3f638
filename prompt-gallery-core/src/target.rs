//! Text insertion targets
//!
//! The host graph supplies candidate text widgets; the gallery ranks them so
//! the most likely positive-prompt field comes first, and decides whether a
//! snippet goes into a widget or falls back to the clipboard.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::notify::Notification;
use crate::text;

/// Widget kinds that accept text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    String,
    Text,
    CustomText,
}

impl WidgetKind {
    /// Map a host widget type; anything else is not a candidate
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "string" => Some(WidgetKind::String),
            "text" => Some(WidgetKind::Text),
            "customtext" => Some(WidgetKind::CustomText),
            _ => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            WidgetKind::CustomText => 0,
            WidgetKind::Text => 1,
            WidgetKind::String => 2,
        }
    }
}

/// One text widget on one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionTarget {
    pub node_id: u64,
    pub node_title: String,
    pub widget_index: usize,
    pub widget_name: String,
    pub widget_kind: WidgetKind,
}

impl InsertionTarget {
    /// Stable option value, `<node>:widget:<index>`
    pub fn id(&self) -> String {
        format!("{}:widget:{}", self.node_id, self.widget_index)
    }

    /// Parse an option value back into `(node_id, widget_index)`
    pub fn parse_id(id: &str) -> Option<(u64, usize)> {
        let mut parts = id.split(':');
        let node = parts.next()?.parse().ok()?;
        if parts.next()? != "widget" {
            return None;
        }
        let index = parts.next()?.parse().ok()?;
        Some((node, index))
    }

    fn sort_key(&self) -> (bool, bool, bool, u8, bool, String) {
        let title = self.node_title.to_lowercase();
        let positive = title.contains("positive");
        let prompt = title.contains("prompt");
        (
            !(positive || prompt),
            !positive,
            !prompt,
            self.widget_kind.rank(),
            title.contains("negative"),
            title,
        )
    }
}

impl fmt::Display for InsertionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.node_title, self.widget_name)
    }
}

/// Order candidates, most likely positive prompt first
///
/// Titles mentioning `positive` or `prompt` lead, `positive` before
/// `prompt`; then `customtext` widgets, then `text`; titles mentioning
/// `negative` sink; the rest is alphabetical by title.
pub fn rank_targets(targets: &mut [InsertionTarget]) {
    targets.sort_by_cached_key(InsertionTarget::sort_key);
}

/// Append a snippet to a widget's current value
pub fn insert_into(current: &str, snippet: &str) -> String {
    text::combine(current, &text::clean(snippet.trim()))
}

/// Where a snippet ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Write `value` into the widget
    Target {
        target: InsertionTarget,
        value: String,
    },
    /// Put `text` on the clipboard
    Clipboard { text: String },
}

impl Delivery {
    /// Route a snippet to the chosen widget, or to the clipboard without one
    pub fn plan(selected: Option<(&InsertionTarget, &str)>, snippet: &str) -> Self {
        match selected {
            Some((target, current)) => Delivery::Target {
                target: target.clone(),
                value: insert_into(current, snippet),
            },
            None => Delivery::Clipboard {
                text: text::clean(snippet.trim()),
            },
        }
    }

    /// Confirmation shown once the caller has delivered
    pub fn notification(&self, image_name: &str) -> Notification {
        match self {
            Delivery::Target { target, .. } => Notification::success(
                "Tags Sent!",
                format!("Tags for \"{image_name}\" sent to {target}"),
            ),
            Delivery::Clipboard { .. } => Notification::success(
                "Tags Copied!",
                format!("Tags for \"{image_name}\" copied to clipboard"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn target(id: u64, title: &str, kind: WidgetKind) -> InsertionTarget {
        InsertionTarget {
            node_id: id,
            node_title: title.to_string(),
            widget_index: 0,
            widget_name: "text".to_string(),
            widget_kind: kind,
        }
    }

    #[test]
    fn test_ranking() {
        let mut targets = vec![
            target(1, "Notes", WidgetKind::String),
            target(2, "Negative Prompt", WidgetKind::Text),
            target(3, "Prompt", WidgetKind::Text),
            target(4, "Positive", WidgetKind::String),
            target(5, "Caption", WidgetKind::CustomText),
            target(6, "Negative", WidgetKind::CustomText),
            target(7, "Label", WidgetKind::Text),
        ];
        rank_targets(&mut targets);

        let titles: Vec<_> = targets.iter().map(|t| t.node_title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Positive",
                "Prompt",
                "Negative Prompt",
                "Caption",
                "Negative",
                "Label",
                "Notes",
            ]
        );
    }

    #[test]
    fn test_only_text_widget_kinds_are_candidates() {
        assert_eq!(WidgetKind::from_type("customtext"), Some(WidgetKind::CustomText));
        assert_eq!(WidgetKind::from_type("combo"), None);
        assert_eq!(WidgetKind::from_type("number"), None);
    }

    #[test]
    fn test_id_round_trip_and_label() {
        let t = InsertionTarget {
            widget_index: 2,
            ..target(17, "Positive", WidgetKind::Text)
        };
        assert_eq!(t.id(), "17:widget:2");
        assert_eq!(InsertionTarget::parse_id(&t.id()), Some((17, 2)));
        assert_eq!(InsertionTarget::parse_id("clipboard"), None);
        assert_eq!(t.to_string(), "Positive - text");
    }

    #[test]
    fn test_delivery() {
        let t = target(1, "Positive", WidgetKind::Text);
        let delivery = Delivery::plan(Some((&t, "masterpiece")), " red hair, ");
        assert_eq!(
            delivery,
            Delivery::Target {
                target: t.clone(),
                value: "masterpiece, red hair".into()
            }
        );
        assert_eq!(delivery.notification("red").summary, "Tags Sent!");

        let delivery = Delivery::plan(None, "red hair BREAK blue eyes");
        assert_eq!(
            delivery,
            Delivery::Clipboard {
                text: "red hair. blue eyes".into()
            }
        );
        assert_eq!(delivery.notification("red").summary, "Tags Copied!");
    }

    #[test]
    fn test_insert_after_sentence() {
        assert_eq!(insert_into("a castle.", "dusk"), "a castle. dusk");
        assert_eq!(insert_into("", "dusk"), "dusk");
    }
}
