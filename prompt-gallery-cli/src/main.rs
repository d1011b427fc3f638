//! Prompt Gallery - browse tagged prompt images and compose random prompts
//!
//! Command line front end over `prompt-gallery-core`. Results go to stdout,
//! logs and notifications to stderr.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use prompt_gallery_core::catalog::{CatalogEntry, DisplayGroup};
use prompt_gallery_core::notify::{LogNotifier, Notifier};
use prompt_gallery_core::settings::{self, GallerySettings};
use prompt_gallery_core::store::FsStore;
use prompt_gallery_core::{metadata, text, Gallery, GalleryStores};

mod category_cli;
mod terminal;

use terminal::TerminalNotifier;

/// Trace modules for targeted logging
#[derive(Debug, Clone, ValueEnum)]
enum TraceModule {
    Libraries,
    Catalog,
    State,
    Ingest,
    All,
}

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "prompt-gallery",
    about = "Searchable gallery of prompt tag snippets backed by thumbnail images",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Enable targeted tracing (comma-separated: libraries,catalog,state,ingest,all)
    #[clap(long, value_delimiter = ',', global = true)]
    trace: Vec<TraceModule>,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[clap(long, global = true)]
    json_logs: bool,

    /// Override the settings file path
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory (libraries, thumbnails, user state)
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Never contact the remote library manifest
    #[clap(long, global = true)]
    offline: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Resolve the library manifest set and show its descriptors
    Libraries {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Check that every library document is present (non-zero exit otherwise)
    Verify,

    /// List catalog entries grouped for display
    List {
        /// Only show this group
        #[clap(long)]
        group: Option<String>,

        /// Sort entries descending
        #[clap(long)]
        descending: bool,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Search entries by name or subcategory
    Search {
        /// Search term (case-insensitive substring)
        term: String,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Compose a random prompt from the enabled categories
    Random,

    /// Manage which categories random prompts draw from
    Category {
        #[clap(subcommand)]
        command: category_cli::CategoryCommand,
    },

    /// Print the prompt embedded in an image's metadata
    Extract {
        /// Path to a PNG image
        image: PathBuf,
    },

    /// Add an image as a custom entry
    AddCustom {
        /// Path to the image
        image: PathBuf,

        /// Tags to use instead of the extracted prompt
        #[clap(long)]
        tags: Option<String>,
    },

    /// Remove every custom entry
    ResetCustom,

    /// Normalize tag text (reads stdin when no text is given)
    Clean {
        text: Option<String>,
    },
}

/// Initialize tracing with CLI flags
///
/// Logs always go to stderr so command output stays pipeable.
fn initialize_tracing(log_level: &LogLevel, trace_modules: &[TraceModule], json: bool) {
    let mut filter = EnvFilter::new(log_level.to_filter_directive());

    for module in trace_modules {
        let directive = match module {
            TraceModule::Libraries => "prompt_gallery_core::library=trace",
            TraceModule::Catalog => "prompt_gallery_core::catalog=trace",
            TraceModule::State => "prompt_gallery_core::state=trace",
            TraceModule::Ingest => "prompt_gallery_core::ingest=trace",
            TraceModule::All => "prompt_gallery_core=trace",
        };

        if let Ok(parsed) = directive.parse() {
            filter = filter.add_directive(parsed);
        }
    }

    if json || !trace_modules.is_empty() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();

        if !trace_modules.is_empty() {
            tracing::info!(trace_modules = ?trace_modules, "Prompt gallery tracing enabled");
        }
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, &cli.trace, cli.json_logs);

    // Commands that never touch the data directory
    match &cli.command {
        Command::Extract { image } => return extract_command(image),
        Command::Clean { text } => return clean_command(text.as_deref()),
        _ => {}
    }

    // Structured log runs keep notifications in the log stream
    let notifier: Arc<dyn Notifier> = if cli.json_logs {
        Arc::new(LogNotifier)
    } else {
        Arc::new(TerminalNotifier)
    };
    let settings = load_settings(cli.config.as_deref())?;
    let mut gallery = open_gallery(settings, cli.data_dir.clone(), cli.offline, notifier)?;
    gallery.load().await;

    let result = match cli.command {
        Command::Libraries { json } => libraries_command(&gallery, json),
        Command::Verify => verify_command(&gallery),
        Command::List {
            group,
            descending,
            json,
        } => list_command(&gallery, group.as_deref(), descending, json),
        Command::Search { term, json } => search_command(&mut gallery, &term, json),
        Command::Random => random_command(&gallery),
        Command::Category { command } => command.execute(&mut gallery).await,
        Command::AddCustom { image, tags } => {
            add_custom_command(&mut gallery, &image, tags.as_deref()).await
        }
        Command::ResetCustom => {
            gallery.reset_custom_images().await;
            Ok(())
        }
        Command::Extract { .. } | Command::Clean { .. } => unreachable!("handled above"),
    };

    gallery
        .shutdown()
        .await
        .context("Failed to save user state")?;
    result
}

fn load_settings(path: Option<&Path>) -> Result<GallerySettings> {
    let settings = match path {
        Some(path) => GallerySettings::load_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => GallerySettings::load().context("Failed to load settings")?,
    };
    debug!("Settings: {:?}", settings);
    Ok(settings)
}

fn open_gallery(
    mut settings: GallerySettings,
    data_dir: Option<PathBuf>,
    offline: bool,
    notifier: Arc<dyn Notifier>,
) -> Result<Gallery> {
    if let Some(dir) = data_dir {
        settings.data_dir = Some(dir);
    }
    let root = settings
        .resolve_data_dir()
        .ok_or_else(|| anyhow!("No data directory available; pass --data-dir"))?;
    info!("Using data directory {}", root.display());

    let store = FsStore::new(&root).with_libraries_file(settings.libraries_file.clone());
    let stores = if offline || !settings.auto_update {
        GalleryStores::offline(store)
    } else {
        online_stores(store, &settings.remote_url)?
    };

    Ok(Gallery::open(settings, stores, notifier))
}

#[cfg(feature = "remote")]
fn online_stores(store: FsStore, url: &str) -> Result<GalleryStores> {
    let remote = prompt_gallery_core::store::HttpRemoteSource::new(url)
        .context("Failed to create remote library source")?;
    Ok(GalleryStores::from_fs(store, Arc::new(remote)))
}

#[cfg(not(feature = "remote"))]
fn online_stores(store: FsStore, _url: &str) -> Result<GalleryStores> {
    debug!("Built without remote support, staying offline");
    Ok(GalleryStores::offline(store))
}

#[derive(Tabled)]
struct LibraryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Document")]
    document: String,
    #[tabled(rename = "Order")]
    order: i64,
    #[tabled(rename = "Sections")]
    sections: String,
    #[tabled(rename = "Present")]
    present: &'static str,
}

fn libraries_command(gallery: &Gallery, json: bool) -> Result<()> {
    let Some(manifest) = gallery.manifest() else {
        bail!("No library manifest available; check the data directory or go online");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(manifest)?);
        return Ok(());
    }

    let missing: Vec<&str> = gallery.missing_documents().collect();
    let rows: Vec<LibraryRow> = manifest
        .libraries
        .iter()
        .map(|lib| LibraryRow {
            category: lib.category.clone(),
            document: lib.name.clone(),
            order: lib.order,
            sections: lib.section_labels().collect::<Vec<_>>().join(", "),
            present: if missing.contains(&lib.name.as_str()) {
                "no"
            } else {
                "yes"
            },
        })
        .collect();

    println!("Library manifest version {}", manifest.version);
    print_table(rows);
    Ok(())
}

fn verify_command(gallery: &Gallery) -> Result<()> {
    if gallery.all_libraries_present() {
        println!("All library documents present");
        return Ok(());
    }

    let missing: Vec<&str> = gallery.missing_documents().collect();
    if missing.is_empty() {
        bail!("Library documents could not be verified");
    }
    for name in &missing {
        eprintln!("missing: {name}");
    }
    bail!("{} library document(s) missing", missing.len())
}

#[derive(Tabled, Serialize)]
struct EntryRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl EntryRow {
    fn new(group: &str, entry: &CatalogEntry) -> Self {
        Self {
            group: group.to_string(),
            name: entry.name.clone(),
            category: entry.category.clone(),
            tags: text::clean(&entry.tags),
        }
    }
}

fn rows_for(groups: &[DisplayGroup<'_>], only: Option<&str>) -> Vec<EntryRow> {
    groups
        .iter()
        .filter(|g| only.map_or(true, |name| g.name.eq_ignore_ascii_case(name)))
        .flat_map(|g| g.entries.iter().map(|e| EntryRow::new(&g.name, e)))
        .collect()
}

fn list_command(gallery: &Gallery, group: Option<&str>, descending: bool, json: bool) -> Result<()> {
    if gallery.should_show_no_files_warning() {
        eprintln!(
            "No prompt images found. Download the image sets into {} to populate the gallery.",
            data_dir_hint(gallery)
        );
    } else if gallery.should_show_download_link() {
        eprintln!("Some library documents are missing; run `prompt-gallery verify` for details.");
    }

    let ascending = gallery.sort_ascending() && !descending;
    let groups = gallery.catalog().grouped_for_display(false, gallery.order(), ascending);
    emit_rows(rows_for(&groups, group), json)
}

fn search_command(gallery: &mut Gallery, term: &str, json: bool) -> Result<()> {
    gallery.search(term);
    let groups = gallery.display();
    let rows = rows_for(&groups, None);
    if rows.is_empty() && !json {
        eprintln!("No entries match \"{term}\"");
        return Ok(());
    }
    emit_rows(rows, json)
}

fn random_command(gallery: &Gallery) -> Result<()> {
    if !gallery.can_compose() {
        bail!("No library entries loaded; nothing to compose from");
    }
    // Failures were already reported through the notifier
    let prompt = gallery
        .random_prompt()
        .map_err(|e| anyhow!("Random prompt failed: {e}"))?;
    println!("{prompt}");
    Ok(())
}

fn extract_command(image: &Path) -> Result<()> {
    let bytes =
        std::fs::read(image).with_context(|| format!("Failed to read {}", image.display()))?;
    let prompt = metadata::extract(&bytes);
    if prompt.is_empty() {
        bail!("No prompt found in {}", image.display());
    }
    println!("{prompt}");
    Ok(())
}

async fn add_custom_command(gallery: &mut Gallery, image: &Path, tags: Option<&str>) -> Result<()> {
    let file_name = image
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Not a file path: {}", image.display()))?;
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;

    let report = gallery
        .ingest_custom_image(file_name, &bytes)
        .await
        .with_context(|| format!("Failed to add {}", image.display()))?;

    if let Some(tags) = tags {
        gallery.update_custom_tags(&report.name, tags).await;
    }
    println!("{}", report.name);
    Ok(())
}

fn clean_command(input: Option<&str>) -> Result<()> {
    let raw = match input {
        Some(text) => text.to_string(),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };
    println!("{}", text::clean(&raw));
    Ok(())
}

fn emit_rows(rows: Vec<EntryRow>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        eprintln!("No entries");
    } else {
        print_table(rows);
    }
    Ok(())
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    println!("{table}");
}

fn data_dir_hint(gallery: &Gallery) -> String {
    gallery
        .settings()
        .resolve_data_dir()
        .or_else(settings::default_data_dir)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "the data directory".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "prompt-gallery",
            "list",
            "--json",
            "--offline",
            "--data-dir",
            "/tmp/gallery",
            "--trace",
            "libraries,state",
        ])
        .unwrap();

        assert!(cli.offline);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/gallery")));
        assert_eq!(cli.trace.len(), 2);
        assert!(matches!(cli.command, Command::List { json: true, .. }));
    }

    #[test]
    fn test_clean_accepts_positional_text() {
        let cli = Cli::try_parse_from(["prompt-gallery", "clean", "a,, b"]).unwrap();
        match cli.command {
            Command::Clean { text } => assert_eq!(text.as_deref(), Some("a,, b")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rows_filter_by_group() {
        let entry = CatalogEntry::custom("cat.png", "red scarf,,");
        let groups = vec![DisplayGroup {
            name: "Custom".to_string(),
            entries: vec![&entry],
        }];

        assert_eq!(rows_for(&groups, Some("custom")).len(), 1);
        assert!(rows_for(&groups, Some("Hair")).is_empty());
        assert_eq!(rows_for(&groups, None)[0].tags, "red scarf");
    }
}
