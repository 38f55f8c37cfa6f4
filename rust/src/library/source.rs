//! Where rule libraries come from.
//!
//! The compiler never reads a library directly; it is handed an already
//! validated [`RuleLibrary`] built from one of these sources. Swapping the
//! catalog (a new guidance revision, a fake in tests) only means choosing a
//! different source.

use std::path::PathBuf;

use super::{LibraryError, RuleLibrary};

/// Catalog shipped with the crate.
pub const DEFAULT_LIBRARY_JSON: &str = include_str!("../../data/rule_library_v2.json");

/// Read-only provider of a validated rule library.
pub trait RuleSource: Send + Sync {
    /// Short label for logs.
    fn describe(&self) -> String;

    fn load(&self) -> Result<RuleLibrary, LibraryError>;
}

/// The embedded default catalog.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedSource;

impl RuleSource for EmbeddedSource {
    fn describe(&self) -> String {
        "embedded".to_string()
    }

    fn load(&self) -> Result<RuleLibrary, LibraryError> {
        RuleLibrary::from_json(DEFAULT_LIBRARY_JSON)
    }
}

/// A JSON catalog on disk.
#[derive(Clone, Debug)]
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RuleSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RuleLibrary, LibraryError> {
        let json = std::fs::read_to_string(&self.path).map_err(|source| LibraryError::Io {
            path: self.path.clone(),
            source,
        })?;
        RuleLibrary::from_json(&json)
    }
}

/// An in-memory JSON catalog.
#[derive(Clone, Debug)]
pub struct JsonSource {
    pub json: String,
}

impl JsonSource {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl RuleSource for JsonSource {
    fn describe(&self) -> String {
        format!("inline ({} bytes)", self.json.len())
    }

    fn load(&self) -> Result<RuleLibrary, LibraryError> {
        RuleLibrary::from_json(&self.json)
    }
}
