//! VCL snippet template source
//!
//! Templates live on disk, one file per processing phase; the file stem is
//! the snippet type key (`recv.vcl` -> `recv`). The source can serve one
//! named file or every `.vcl` file in its directory, in key order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::SnippetConfig;
use crate::error::PushError;

/// Directory-backed source of named VCL fragments
#[derive(Debug, Clone)]
pub struct SnippetSource {
    dir: PathBuf,
    file: Option<String>,
}

impl SnippetSource {
    pub fn new<P: Into<PathBuf>>(dir: P, file: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            file,
        }
    }

    pub fn from_config(config: &SnippetConfig) -> Self {
        Self::new(config.path.clone(), config.file.clone())
    }

    /// Load the configured templates, keyed by snippet type
    pub fn load(&self) -> Result<BTreeMap<String, String>, PushError> {
        match &self.file {
            Some(file) => self.load_file(file),
            None => self.load_all(),
        }
    }

    /// Load a single template file
    pub fn load_file(&self, file: &str) -> Result<BTreeMap<String, String>, PushError> {
        let path = self.dir.join(file);
        let key = snippet_key(&path)
            .ok_or_else(|| PushError::Template(format!("Invalid template name: {}", file)))?;

        let content = std::fs::read_to_string(&path).map_err(|e| {
            PushError::Template(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut snippets = BTreeMap::new();
        snippets.insert(key, content);
        Ok(snippets)
    }

    /// Load every `.vcl` file in the directory
    pub fn load_all(&self) -> Result<BTreeMap<String, String>, PushError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            PushError::Template(format!("Failed to read {}: {}", self.dir.display(), e))
        })?;

        let mut snippets = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                PushError::Template(format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("vcl") {
                continue;
            }

            if let Some(key) = snippet_key(&path) {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    PushError::Template(format!("Failed to read {}: {}", path.display(), e))
                })?;
                snippets.insert(key, content);
            }
        }

        if snippets.is_empty() {
            return Err(PushError::Template(format!(
                "No .vcl templates found in {}",
                self.dir.display()
            )));
        }

        Ok(snippets)
    }
}

/// Derive the snippet type key from a template path (`recv.vcl` -> `recv`)
fn snippet_key(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
