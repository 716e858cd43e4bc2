use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Corrections from a raw recognized player name to the name a human entered.
///
/// Grows only through [`NameDictionary::record_correction`]; entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct NameDictionary {
    entries: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl NameDictionary {
    /// In-memory dictionary that is never persisted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing or corrupt file starts an empty dictionary
    /// that will be saved back to the same path.
    pub fn load(path: &Path) -> Self {
        let entries = if path.exists() {
            match read_entries(path) {
                Ok(entries) => {
                    info!(
                        "Loaded {} player name corrections from {}",
                        entries.len(),
                        path.display()
                    );
                    entries
                }
                Err(e) => {
                    warn!("{:#}", e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Self {
            entries,
            path: Some(path.to_path_buf()),
        }
    }

    pub fn get(&self, raw: &str) -> Option<&str> {
        self.entries.get(raw).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record that `original` should read as `corrected`.
    /// Empty or identical pairs are ignored and return `false`.
    pub fn record_correction(&mut self, original: &str, corrected: &str) -> bool {
        if original.is_empty() || corrected.is_empty() || original == corrected {
            return false;
        }
        self.entries
            .insert(original.to_string(), corrected.to_string());
        info!("Player name correction: {} -> {}", original, corrected);
        true
    }

    /// Write the dictionary back to its file. No-op for in-memory dictionaries.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .context("Failed to serialize player names")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rejects_empty_and_identical() {
        let mut dict = NameDictionary::new();
        assert!(!dict.record_correction("", "Son"));
        assert!(!dict.record_correction("Son", ""));
        assert!(!dict.record_correction("Son", "Son"));
        assert!(dict.is_empty());

        assert!(dict.record_correction("JKim", "Jinhyuk Kim"));
        assert_eq!(dict.get("JKim"), Some("Jinhyuk Kim"));
    }

    #[test]
    fn test_save_and_reload_keeps_native_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player_names.json");

        let mut dict = NameDictionary::load(&path);
        assert!(dict.is_empty());
        dict.record_correction("손흥만", "손흥민");
        dict.record_correction("JKim", "Jinhyuk Kim");
        dict.save().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("손흥민"), "names should be stored unescaped");

        let reloaded = NameDictionary::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("손흥만"), Some("손흥민"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player_names.json");
        std::fs::write(&path, "{\"a\": 1").unwrap();
        assert!(NameDictionary::load(&path).is_empty());
    }

    #[test]
    fn test_in_memory_save_is_noop() {
        let mut dict = NameDictionary::new();
        dict.record_correction("a", "b");
        assert!(dict.save().is_ok());
    }
}
