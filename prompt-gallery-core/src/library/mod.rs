//! Prompt libraries - versioned manifest sets and their synchronization
//!
//! # Overview
//!
//! A library is one manifest document (loosely YAML) whose leaves become
//! catalog entries of a single category. The set of libraries is itself
//! described by a versioned JSON file that exists twice:
//!
//! ```text
//! Published manifest set (remote)
//!     │   version differs && auto update
//!     ▼
//! promptGallery_libraries.json (local cache)
//!     │
//!     ▼
//! ManifestRegistry::resolve()  ← once per session, shared by every caller
//! ```

mod descriptor;
mod registry;

pub use descriptor::{LibraryDescriptor, ManifestSet, PathAdjustment, PERSONA_CATEGORY};
pub use registry::ManifestRegistry;

/// Default filename of the local manifest set cache
pub const DEFAULT_LIBRARIES_FILE: &str = "promptGallery_libraries.json";
