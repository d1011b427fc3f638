//! Prompt Gallery core library
//!
//! A searchable, categorized catalog of prompt tag snippets backed by
//! thumbnail images. Libraries are versioned manifest documents kept in sync
//! with a published set; user uploads become custom entries whose tags are
//! pulled from the image's embedded workflow.

pub mod catalog;
pub mod compose;
pub mod error;
pub mod gallery;
pub mod ingest;
pub mod library;
pub mod metadata;
pub mod notify;
pub mod parser;
pub mod selection;
pub mod settings;
pub mod state;
pub mod store;
pub mod target;
pub mod text;

pub use error::{GalleryError, Result};
pub use gallery::{Gallery, GalleryStores};
