use anyhow::{Context, Result};
use card_capture::{regions, RatioBox};
use card_state::Field;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Field name to ratio box.
pub type RatioBoxTable = BTreeMap<Field, RatioBox>;

/// Load the hand-curated ratio boxes.
///
/// The file is a JSON object of `field -> [x1, y1, x2, y2]`. Entries with an
/// unknown field name, a malformed value or an invalid box are skipped one by
/// one; a missing or unparsable file yields an empty table.
pub fn load_roi_config(path: &Path) -> RatioBoxTable {
    if !path.exists() {
        debug!("No ROI config at {}", path.display());
        return RatioBoxTable::new();
    }
    match read_raw(path) {
        Ok(raw) => {
            let table = parse_entries(raw);
            info!("Loaded {} ROI entries from {}", table.len(), path.display());
            table
        }
        Err(e) => {
            warn!("{:#}", e);
            RatioBoxTable::new()
        }
    }
}

fn read_raw(path: &Path) -> Result<BTreeMap<String, serde_json::Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn parse_entries(raw: BTreeMap<String, serde_json::Value>) -> RatioBoxTable {
    let mut table = RatioBoxTable::new();
    for (name, value) in raw {
        let field: Field = match name.parse() {
            Ok(f) => f,
            Err(e) => {
                debug!("Skipping ROI entry: {}", e);
                continue;
            }
        };
        match serde_json::from_value::<RatioBox>(value) {
            Ok(b) => {
                table.insert(field, b);
            }
            Err(e) => debug!("Skipping ROI entry '{}': {}", name, e),
        }
    }
    table
}

/// Pick the ratio boxes to extract with: the curated table when enabled and
/// non-empty, otherwise the built-in defaults.
pub fn select_ratio_boxes(use_manual_roi: bool, manual: &RatioBoxTable) -> RatioBoxTable {
    if use_manual_roi && !manual.is_empty() {
        debug!("Using {} manual ROI entries", manual.len());
        manual.clone()
    } else {
        debug!("Using built-in ROI table");
        regions::default_table()
    }
}
