//! Persistent DOI -> identifier cache

use pubmetric_common::persist::{read_json_optional, write_json_atomic};
use pubmetric_common::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Conversions learned by previous runs
#[derive(Debug, Default)]
pub struct DoiLibrary {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
    dirty: bool,
}

impl DoiLibrary {
    /// In-memory library that is never written
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the library at `path`; a missing file gives an empty library
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries: BTreeMap<String, String> = read_json_optional(&path)?.unwrap_or_default();
        debug!(path = %path.display(), entries = entries.len(), "Loaded DOI library");

        Ok(Self {
            path: Some(path),
            entries,
            dirty: false,
        })
    }

    pub fn get(&self, doi: &str) -> Option<&str> {
        self.entries.get(&normalize(doi)).map(String::as_str)
    }

    pub fn insert(&mut self, doi: &str, identifier: impl Into<String>) {
        let identifier = identifier.into();
        let key = normalize(doi);
        if self.entries.get(&key) != Some(&identifier) {
            self.entries.insert(key, identifier);
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the library file if new conversions were learned
    pub fn save(&mut self) -> Result<()> {
        if let (Some(path), true) = (&self.path, self.dirty) {
            write_json_atomic(path, &self.entries)?;
            self.dirty = false;
        }
        Ok(())
    }
}

fn normalize(doi: &str) -> String {
    doi.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_between_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doi_library.json");

        let mut library = DoiLibrary::load(&path).unwrap();
        assert!(library.is_empty());
        library.insert("10.1000/ABC", "123");
        library.save().unwrap();

        let reloaded = DoiLibrary::load(&path).unwrap();
        assert_eq!(reloaded.get("10.1000/abc"), Some("123"));
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_unchanged_library_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doi_library.json");

        let mut library = DoiLibrary::load(&path).unwrap();
        library.save().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_in_memory_library_never_writes() {
        let mut library = DoiLibrary::in_memory();
        library.insert("10.1/x", "1");
        library.save().unwrap();
        assert_eq!(library.get("10.1/x"), Some("1"));
    }
}
