//! Integration tests for the `prompt-gallery` binary
//!
//! Every run is offline against a throwaway data directory and a settings
//! path that does not exist, so the user's own gallery is never touched.

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const LIBRARIES: &str = r#"{
  "version": "1.0",
  "libraries": [
    {"name": "hair.yaml", "type": "Hair", "order": 20},
    {"name": "outfits.yaml", "type": "Outfits", "order": 10}
  ]
}"#;

const HAIR_YAML: &str = "\
ponyxl:
  Hair:
    Length:
      long:
        - long hair
      short:
        - short hair,
";

fn run(data_dir: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_prompt-gallery"))
        .args(args)
        .arg("--offline")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--config")
        .arg(data_dir.join("no-settings.yaml"))
        .output()?;
    Ok(output)
}

fn seeded(with_outfits: bool) -> Result<TempDir> {
    let temp = TempDir::new()?;
    fs::write(temp.path().join("promptGallery_libraries.json"), LIBRARIES)?;
    fs::write(temp.path().join("hair.yaml"), HAIR_YAML)?;
    if with_outfits {
        fs::write(
            temp.path().join("outfits.yaml"),
            "ponyxl:\n  Outfits:\n    dress:\n      - red dress\n",
        )?;
    }
    Ok(temp)
}

#[test]
fn test_clean_normalizes_text() -> Result<()> {
    let temp = TempDir::new()?;
    let output = run(temp.path(), &["clean", " ,a,,b BREAK c, "])?;

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("a,"));
    assert!(!stdout.contains("BREAK"));
    Ok(())
}

#[test]
fn test_list_json_offline() -> Result<()> {
    let temp = seeded(true)?;
    let output = run(temp.path(), &["list", "--json"])?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    // Outfits ranks before Hair
    assert_eq!(rows[0]["category"], "Outfits");
    assert_eq!(rows[1]["name"], "long");
    assert_eq!(rows[2]["tags"], "short hair");
    Ok(())
}

#[test]
fn test_verify_reports_missing_documents() -> Result<()> {
    let temp = seeded(false)?;
    let output = run(temp.path(), &["verify"])?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing: outfits.yaml"));

    let complete = seeded(true)?;
    assert!(run(complete.path(), &["verify"])?.status.success());
    Ok(())
}

#[test]
fn test_category_selection_persists() -> Result<()> {
    let temp = seeded(true)?;

    let enable = run(temp.path(), &["category", "enable", "hair"])?;
    assert!(enable.status.success());
    assert!(temp.path().join("prompt_gallery_data.json").exists());

    let list = run(temp.path(), &["category", "list", "--json"])?;
    let items: serde_json::Value = serde_json::from_slice(&list.stdout)?;
    let hair = items
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "Hair")
        .unwrap();
    assert_eq!(hair["enabled"], true);
    assert_eq!(hair["entries"], 2);

    let random = run(temp.path(), &["random"])?;
    assert!(random.status.success());
    let prompt = String::from_utf8(random.stdout)?;
    assert!(["long hair", "short hair"].contains(&prompt.trim()));
    Ok(())
}

#[test]
fn test_random_without_categories_fails() -> Result<()> {
    let temp = seeded(true)?;
    let output = run(temp.path(), &["random"])?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No Categories Selected"));
    Ok(())
}

#[test]
fn test_unknown_category_is_rejected() -> Result<()> {
    let temp = seeded(true)?;
    let output = run(temp.path(), &["category", "enable", "Spaceships"])?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown category"));
    Ok(())
}
