//! Indented-block manifest parser
//!
//! Manifest documents are a small, loosely YAML-shaped subset: nested keys
//! ending in `:` and, under the deepest key, a single `- tag text` line.
//!
//! ```yaml
//! ponyxl:
//!   FemaleBody:
//!     Build:
//!       slim:
//!         - tall, slim
//! ```
//!
//! The parser keeps a stack of open keys and their indentation. Any line whose
//! next line starts with `-` is a leaf and becomes one [`CatalogEntry`].
//! It never fails: what it cannot interpret it skips or passes through.

use tracing::trace;

use crate::catalog::{image_locator, CatalogEntry, LIBRARY_IMAGE_PREFIX};
use crate::library::LibraryDescriptor;

/// Path marker for persona entries that are meant to be randomized
pub const GENERATE_RANDOM_MARKER: &str = "generate_random";

/// Section assigned to randomized persona entries
pub const RANDOM_SECTION: &str = "Random";

#[derive(Debug)]
struct Frame<'a> {
    key: &'a str,
    indent: usize,
}

/// Parse one manifest document into catalog entries
pub fn parse(document: &str, descriptor: &LibraryDescriptor) -> Vec<CatalogEntry> {
    let lines: Vec<&str> = document.split('\n').collect();
    let mut stack: Vec<Frame> = Vec::new();
    let mut entries = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = line.len() - line.trim_start().len();
        while stack.last().is_some_and(|top| top.indent >= indent) {
            stack.pop();
        }

        // No colon: the whole line becomes the key
        let key = trimmed.split(':').next().unwrap_or_default().trim();
        stack.push(Frame { key, indent });

        let Some(tag_line) = lines
            .get(index + 1)
            .map(|next| next.trim())
            .filter(|next| next.starts_with('-'))
        else {
            continue;
        };

        let tags = tag_line[1..].trim();
        if tags.is_empty() || key.to_lowercase() == "skip" {
            trace!("Skipping leaf '{}' in {}", key, descriptor.name);
            continue;
        }

        entries.push(build_entry(&stack, key, tags, descriptor));
    }

    entries
}

fn build_entry(
    stack: &[Frame],
    key: &str,
    tags: &str,
    descriptor: &LibraryDescriptor,
) -> CatalogEntry {
    let parents = &stack[..stack.len() - 1];
    let raw_path = parents
        .get(descriptor.skip_levels..)
        .unwrap_or_default()
        .iter()
        .map(|frame| frame.key)
        .collect::<Vec<_>>()
        .join("/");

    let path = adjust_path(&raw_path, descriptor);
    let subcategory = path.rsplit('/').next().unwrap_or_default().to_string();

    let section = descriptor.sections.as_ref().and_then(|sections| {
        sections
            .iter()
            .find(|(needle, _)| path.contains(needle.as_str()))
            .map(|(_, label)| label.clone())
    });

    let mut entry = CatalogEntry {
        name: key.to_string(),
        path: image_locator(key, &format!("{LIBRARY_IMAGE_PREFIX}/{path}")),
        tags: tags.to_string(),
        category: descriptor.category.clone(),
        subcategory,
        section,
    };

    if descriptor.is_persona() {
        let full_path = stack
            .iter()
            .map(|frame| frame.key)
            .collect::<Vec<_>>()
            .join("/");
        if full_path.contains(GENERATE_RANDOM_MARKER) {
            entry.section = Some(RANDOM_SECTION.to_string());
            entry.tags = strip_quotes(tags).to_string();
        }
    }

    entry
}

fn adjust_path(raw_path: &str, descriptor: &LibraryDescriptor) -> String {
    let doubled_prefix = format!("{LIBRARY_IMAGE_PREFIX}/");
    let mut path = raw_path
        .strip_prefix(doubled_prefix.as_str())
        .unwrap_or(raw_path)
        .to_string();

    if let Some(ignore_key) = &descriptor.ignore_key {
        path = retain_segments(&path, |segment| segment != ignore_key);
    }

    if let Some(adjustment) = &descriptor.path_adjustment {
        if let Some(remove) = &adjustment.remove {
            path = retain_segments(&path, |segment| !remove.iter().any(|r| r == segment));
        }
        if let Some(add) = &adjustment.add {
            path = format!("{add}/{path}");
        }
    }

    path
}

fn retain_segments(path: &str, keep: impl Fn(&str) -> bool) -> String {
    path.split('/')
        .filter(|segment| keep(segment))
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(text)
}
