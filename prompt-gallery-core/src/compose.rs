//! Random prompt composition
//!
//! Picks one entry per enabled category and joins their cleaned tags.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::catalog::Catalog;
use crate::text;

/// Why no prompt could be composed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("Please select at least one category for random prompts.")]
    NoCategoriesSelected,

    #[error("No images found in the selected categories.")]
    NoImagesFound,
}

/// Compose a random prompt from the enabled categories, in the given order
pub fn compose<S: AsRef<str>>(catalog: &Catalog, enabled: &[S]) -> Result<String, ComposeError> {
    compose_with_rng(catalog, enabled, &mut rand::thread_rng())
}

/// [`compose`] with a caller-supplied random source
pub fn compose_with_rng<S, R>(
    catalog: &Catalog,
    enabled: &[S],
    rng: &mut R,
) -> Result<String, ComposeError>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    if enabled.is_empty() {
        return Err(ComposeError::NoCategoriesSelected);
    }

    let mut prompt = String::new();
    let mut picked = 0usize;

    for category in enabled {
        let candidates = catalog.entries_in_category(category.as_ref());
        let Some(entry) = candidates.choose(rng) else {
            debug!("No entries in category '{}', skipping", category.as_ref());
            continue;
        };

        prompt = text::combine(&prompt, &text::clean(&entry.tags));
        picked += 1;
    }

    if picked == 0 {
        return Err(ComposeError::NoImagesFound);
    }

    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{image_locator, CatalogEntry};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entry(name: &str, category: &str, tags: &str) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            path: image_locator(name, "ponyxl/x"),
            tags: tags.to_string(),
            category: category.to_string(),
            subcategory: "x".to_string(),
            section: None,
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                entry("long", "Hair", "long hair,"),
                entry("blue", "Eyes", " blue eyes BREAK"),
            ],
            vec![CatalogEntry::custom("mine.png", "custom only")],
        )
    }

    #[test]
    fn test_no_categories_selected() {
        let enabled: [&str; 0] = [];
        assert_eq!(
            compose(&catalog(), &enabled),
            Err(ComposeError::NoCategoriesSelected)
        );
    }

    #[test]
    fn test_no_images_found() {
        assert_eq!(
            compose(&catalog(), &["Outfit", "Custom"]),
            Err(ComposeError::NoImagesFound)
        );
    }

    #[test]
    fn test_one_pick_per_category_in_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let prompt = compose_with_rng(&catalog(), &["Hair", "Outfit", "Eyes"], &mut rng).unwrap();
        assert_eq!(prompt, "long hair, blue eyes.");

        let prompt = compose_with_rng(&catalog(), &["Eyes", "Hair"], &mut rng).unwrap();
        assert_eq!(prompt, "blue eyes. long hair");
    }

    #[test]
    fn test_pick_is_one_of_the_candidates() {
        let catalog = Catalog::new(
            vec![
                entry("a", "Hair", "alpha"),
                entry("b", "Hair", "beta"),
                entry("c", "Hair", "gamma"),
            ],
            vec![],
        );
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let prompt = compose_with_rng(&catalog, &["Hair"], &mut rng).unwrap();
            assert!(["alpha", "beta", "gamma"].contains(&prompt.as_str()));
        }
    }
}
