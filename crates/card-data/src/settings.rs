use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Batch processing limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub max_batch_size: usize,
    pub parallel_jobs: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_batch_size: 50,
            parallel_jobs: 4,
        }
    }
}

/// Recognition settings read from `config.json` in the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tesseract executable; `None` uses `tesseract` from `PATH`.
    pub tesseract_path: Option<PathBuf>,
    pub confidence_threshold: f64,
    /// Prefer the hand-curated ratio boxes over the built-in table.
    pub use_manual_roi: bool,
    pub debug_mode: bool,
    pub enable_caching: bool,
    pub batch: BatchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            confidence_threshold: 0.7,
            use_manual_roi: true,
            debug_mode: false,
            enable_caching: true,
            batch: BatchSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::read(path) {
            Ok(settings) => {
                info!("Settings loaded from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("{:#}. Using default settings.", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}
