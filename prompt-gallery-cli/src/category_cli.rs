//! Category selection commands
//!
//! Controls which library categories `random` draws from. Exclusivity groups
//! from the settings file apply: enabling one member disables the others.

use anyhow::{bail, Result};
use clap::Subcommand;
use serde_json::json;
use tabled::{Table, Tabled};

use prompt_gallery_core::Gallery;

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// List categories and whether random prompts use them
    List {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Let random prompts draw from a category
    Enable {
        /// Category name as shown by `category list`
        name: String,
    },

    /// Stop random prompts drawing from a category
    Disable {
        /// Category name as shown by `category list`
        name: String,
    },
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    name: String,
    #[tabled(rename = "Entries")]
    entries: usize,
    #[tabled(rename = "Enabled")]
    enabled: &'static str,
}

impl CategoryCommand {
    pub async fn execute(self, gallery: &mut Gallery) -> Result<()> {
        match self {
            CategoryCommand::List { json } => list(gallery, json),
            CategoryCommand::Enable { name } => set(gallery, &name, true).await,
            CategoryCommand::Disable { name } => set(gallery, &name, false).await,
        }
    }
}

fn list(gallery: &Gallery, json: bool) -> Result<()> {
    let categories = gallery.categories();

    if json {
        let items: Vec<_> = categories
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "entries": gallery.catalog().entries_in_category(name).len(),
                    "enabled": gallery.is_category_enabled(name),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if categories.is_empty() {
        eprintln!("No library categories available");
        return Ok(());
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|name| CategoryRow {
            name: name.to_string(),
            entries: gallery.catalog().entries_in_category(name).len(),
            enabled: if gallery.is_category_enabled(name) {
                "yes"
            } else {
                "no"
            },
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

async fn set(gallery: &mut Gallery, name: &str, enabled: bool) -> Result<()> {
    let Some(category) = gallery
        .categories()
        .into_iter()
        .find(|c| c.eq_ignore_ascii_case(name))
        .map(str::to_string)
    else {
        bail!("Unknown category: {name}");
    };

    let disabled = gallery.set_category_enabled(&category, enabled).await;
    let state = if enabled { "enabled" } else { "disabled" };
    println!("{category} {state}");
    for other in disabled {
        println!("{other} disabled (exclusive with {category})");
    }
    Ok(())
}
