use anyhow::{bail, Result};
use card_data::CardData;
use card_vision::{CardRecognizer, TesseractCli};
use std::sync::Arc;
use tracing::info;

/// Record that the player name read as `original` is really `corrected`.
pub fn correct(data: &CardData, original: &str, corrected: &str) -> Result<()> {
    // The engine is never run; Tesseract is only checked on first use
    let engine = Arc::new(TesseractCli::new(data.settings.tesseract_path.clone()));
    let recognizer = CardRecognizer::new(engine, data.names.clone());
    if !recognizer.record_correction(original, corrected)? {
        bail!(
            "Ignoring correction '{}' -> '{}': names must be non-empty and differ",
            original,
            corrected
        );
    }
    info!("{} name correction(s) on file", recognizer.correction_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_data::NameDictionary;

    #[test]
    fn test_correction_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let data = CardData::load(dir.path());

        correct(&data, "JKim", "Jinhyuk Kim").unwrap();
        let names = NameDictionary::load(&dir.path().join("player_names.json"));
        assert_eq!(names.get("JKim"), Some("Jinhyuk Kim"));
    }

    #[test]
    fn test_identical_pair_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let data = CardData::load(dir.path());
        assert!(correct(&data, "Kim", "Kim").is_err());
        assert!(!dir.path().join("player_names.json").exists());
    }
}
