mod dictionary;
mod roi;
mod settings;

pub use dictionary::NameDictionary;
pub use roi::{load_roi_config, select_ratio_boxes, RatioBoxTable};
pub use settings::{BatchSettings, Settings};

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CARD_SCAN_DATA_DIR";

/// Resolve the data directory: explicit path, then `CARD_SCAN_DATA_DIR`,
/// then `~/fc_online_data`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        .or_else(|| dirs::home_dir().map(|h| h.join("fc_online_data")))
        .unwrap_or_else(|| PathBuf::from("fc_online_data"))
}

/// Everything the recognizer reads from the data directory
#[derive(Debug, Clone)]
pub struct CardData {
    pub data_dir: PathBuf,
    pub settings: Settings,
    /// Hand-curated ratio boxes; empty when none are configured.
    pub manual_rois: RatioBoxTable,
    pub names: NameDictionary,
}

impl CardData {
    /// Load settings, ROI config and name dictionary from `data_dir`.
    /// Missing files fall back to defaults; nothing here is fatal.
    pub fn load(data_dir: &Path) -> Self {
        let settings = Settings::load(&data_dir.join("config.json"));
        let manual_rois = load_roi_config(&data_dir.join("roi_config.json"));
        let names = NameDictionary::load(&data_dir.join("player_names.json"));

        tracing::info!(
            "Data directory {}: {} manual ROI(s), {} name correction(s)",
            data_dir.display(),
            manual_rois.len(),
            names.len()
        );

        Self {
            data_dir: data_dir.to_path_buf(),
            settings,
            manual_rois,
            names,
        }
    }

    /// Ratio boxes to extract fields with, per the ROI setting.
    pub fn ratio_boxes(&self) -> RatioBoxTable {
        select_ratio_boxes(self.settings.use_manual_roi, &self.manual_rois)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.data_dir.join("debug")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nonexistent() {
        let data = CardData::load(Path::new("/nonexistent"));
        assert_eq!(data.settings, Settings::default());
        assert!(data.manual_rois.is_empty());
        assert!(data.names.is_empty());
        assert_eq!(data.ratio_boxes().len(), 7);
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/cards")));
        assert_eq!(dir, PathBuf::from("/tmp/cards"));
    }

    #[test]
    fn test_load_populated_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("roi_config.json"),
            r#"{"overall": [0.3, 0.0, 0.7, 0.1]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("player_names.json"),
            r#"{"JKim": "Jinhyuk Kim"}"#,
        )
        .unwrap();

        let data = CardData::load(dir.path());
        assert_eq!(data.ratio_boxes().len(), 1);
        assert_eq!(data.names.get("JKim"), Some("Jinhyuk Kim"));
        assert_eq!(data.models_dir(), dir.path().join("models"));
    }
}
