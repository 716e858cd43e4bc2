use anyhow::{Context, Result};
use card_state::BoundingBox;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Field location as fractions (0.0-1.0) of the card's width and height.
///
/// Serialized as `[x1, y1, x2, y2]`, the format of the ratio-box configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct RatioBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl RatioBox {
    /// Build a box, rejecting anything outside `0 <= x1 < x2 <= 1`, `0 <= y1 < y2 <= 1`.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Option<Self> {
        let b = Self { x1, y1, x2, y2 };
        b.is_valid().then_some(b)
    }

    pub fn is_valid(&self) -> bool {
        0.0 <= self.x1
            && self.x1 < self.x2
            && self.x2 <= 1.0
            && 0.0 <= self.y1
            && self.y1 < self.y2
            && self.y2 <= 1.0
    }

    /// Map to pixels of a `width`x`height` image by truncating each corner.
    /// Returns `None` when the box is invalid or collapses to zero area.
    pub fn to_pixels(&self, width: u32, height: u32) -> Option<BoundingBox> {
        if !self.is_valid() {
            return None;
        }
        let x1 = (self.x1 * width as f64) as u32;
        let y1 = (self.y1 * height as f64) as u32;
        let x2 = (self.x2 * width as f64) as u32;
        let y2 = (self.y2 * height as f64) as u32;

        if x1 < x2 && x2 <= width && y1 < y2 && y2 <= height {
            Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }
}

impl TryFrom<[f64; 4]> for RatioBox {
    type Error = String;

    fn try_from(v: [f64; 4]) -> Result<Self, Self::Error> {
        RatioBox::new(v[0], v[1], v[2], v[3])
            .ok_or_else(|| format!("invalid ratio box {:?}", v))
    }
}

impl From<RatioBox> for [f64; 4] {
    fn from(b: RatioBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Built-in field locations for a standard card layout
pub mod regions {
    use super::RatioBox;
    use card_state::Field;
    use std::collections::BTreeMap;

    /// `[x1, y1, x2, y2]` of a field on a standard card.
    pub fn default_box(field: Field) -> [f64; 4] {
        match field {
            Field::Overall => [0.35, 0.05, 0.65, 0.15],
            Field::Position => [0.35, 0.15, 0.65, 0.25],
            Field::Salary => [0.1, 0.35, 0.3, 0.45],
            Field::EnhanceLevel => [0.05, 0.6, 0.25, 0.75],
            Field::PlayerName => [0.2, 0.75, 0.8, 0.9],
            Field::SeasonIcon => [0.05, 0.05, 0.25, 0.15],
            // Thin strip over the boost gauge
            Field::BoostLevel => [0.7, 0.435, 0.97, 0.455],
        }
    }

    /// The full built-in table, one entry per field.
    pub fn default_table() -> BTreeMap<Field, RatioBox> {
        Field::ALL
            .iter()
            .filter_map(|&f| {
                let [x1, y1, x2, y2] = default_box(f);
                RatioBox::new(x1, y1, x2, y2).map(|b| (f, b))
            })
            .collect()
    }
}

/// Crop a sub-image using fractional coordinates, returning it with its pixel box.
/// Returns `None` if the box does not map to a non-empty pixel area.
pub fn crop_ratio(image: &RgbImage, ratio: &RatioBox) -> Option<(BoundingBox, RgbImage)> {
    let bbox = ratio.to_pixels(image.width(), image.height())?;
    Some((bbox, crop_box(image, &bbox)))
}

/// Crop a pixel rectangle, clamped to the image bounds.
pub fn crop_box(image: &RgbImage, bbox: &BoundingBox) -> RgbImage {
    let (w, h) = (image.width(), image.height());
    let x = bbox.x.min(w.saturating_sub(1));
    let y = bbox.y.min(h.saturating_sub(1));
    let cw = bbox.width.min(w - x);
    let ch = bbox.height.min(h - y);

    image::imageops::crop_imm(image, x, y, cw, ch).to_image()
}

/// Decode an image file into RGB.
pub fn read_screenshot(path: &Path) -> Result<RgbImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?;
    Ok(img.to_rgb8())
}

/// Load a screenshot from disk; missing or undecodable files yield `None`.
pub fn load_screenshot(path: &Path) -> Option<RgbImage> {
    if !path.exists() {
        warn!("Image file does not exist: {}", path.display());
        return None;
    }
    match read_screenshot(path) {
        Ok(img) => {
            debug!(
                "Loaded {} ({}x{})",
                path.display(),
                img.width(),
                img.height()
            );
            Some(img)
        }
        Err(e) => {
            warn!("{:#}", e);
            None
        }
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Image files directly inside `dir`, sorted by path.
pub fn list_screenshots(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_state::Field;

    #[test]
    fn test_default_table_is_complete_and_valid() {
        let table = regions::default_table();
        assert_eq!(table.len(), 7);
        for (field, b) in &table {
            assert!(b.is_valid(), "{} default box should be valid", field);
        }
    }

    #[test]
    fn test_ratio_box_rejects_inverted_and_out_of_range() {
        assert!(RatioBox::new(0.5, 0.1, 0.4, 0.2).is_none());
        assert!(RatioBox::new(0.1, 0.1, 1.2, 0.2).is_none());
        assert!(RatioBox::new(-0.1, 0.1, 0.5, 0.2).is_none());
        assert!(RatioBox::new(0.1, 0.3, 0.5, 0.3).is_none());
        assert!(RatioBox::new(0.0, 0.0, 1.0, 1.0).is_some());
    }

    #[test]
    fn test_crop_ratio_size() {
        let img = RgbImage::new(400, 560);
        let b = RatioBox::new(0.25, 0.5, 0.75, 0.75).unwrap();
        let (bbox, cropped) = crop_ratio(&img, &b).unwrap();
        assert_eq!(bbox, BoundingBox::new(100, 280, 200, 140));
        assert_eq!(cropped.width(), 200);
        assert_eq!(cropped.height(), 140);
    }

    #[test]
    fn test_crop_ratio_sizes_match_box_fractions() {
        let (w, h) = (640u32, 896u32);
        let img = RgbImage::new(w, h);
        for &(x1, y1, x2, y2) in &[
            (0.0, 0.0, 1.0, 1.0),
            (0.125, 0.25, 0.5, 0.375),
            (0.5, 0.5, 0.75, 0.625),
            (0.0, 0.875, 0.25, 1.0),
        ] {
            let b = RatioBox::new(x1, y1, x2, y2).unwrap();
            let (_, cropped) = crop_ratio(&img, &b).unwrap();
            assert_eq!(cropped.width(), ((x2 - x1) * w as f64).floor() as u32);
            assert_eq!(cropped.height(), ((y2 - y1) * h as f64).floor() as u32);
            assert!(cropped.width() >= 1 && cropped.height() >= 1);
        }
    }

    #[test]
    fn test_corners_truncate_separately() {
        // 0.35*5 -> 1 and 0.65*5 -> 3, so 2 px where floor(0.3*5) would give 1
        let img = RgbImage::new(5, 5);
        let b = RatioBox::new(0.35, 0.35, 0.65, 0.65).unwrap();
        let (bbox, cropped) = crop_ratio(&img, &b).unwrap();
        assert_eq!(bbox, BoundingBox::new(1, 1, 2, 2));
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_ne!(cropped.width(), ((0.65 - 0.35) * 5.0_f64).floor() as u32);
    }

    #[test]
    fn test_tiny_box_collapses_to_none() {
        let img = RgbImage::new(10, 10);
        let b = RatioBox::new(0.51, 0.51, 0.55, 0.55).unwrap();
        assert!(crop_ratio(&img, &b).is_none());
    }

    #[test]
    fn test_ratio_box_deserializes_from_array() {
        let b: RatioBox = serde_json::from_str("[0.1, 0.2, 0.3, 0.4]").unwrap();
        assert_eq!(b, RatioBox::new(0.1, 0.2, 0.3, 0.4).unwrap());
        assert!(serde_json::from_str::<RatioBox>("[0.3, 0.2, 0.1, 0.4]").is_err());
    }

    #[test]
    fn test_load_missing_screenshot_is_none() {
        assert!(load_screenshot(Path::new("/nonexistent/card.png")).is_none());
    }

    #[test]
    fn test_load_corrupt_screenshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(load_screenshot(&path).is_none());
    }

    #[test]
    fn test_list_screenshots_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(4, 4).save(dir.path().join("b.png")).unwrap();
        std::fs::write(dir.path().join("a.PNG"), b"listed by extension only").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let found = list_screenshots(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.png"]);
    }

    #[test]
    fn test_boost_strip_is_thin() {
        let [_, y1, _, y2] = regions::default_box(Field::BoostLevel);
        assert!(y2 - y1 < 0.05);
    }
}
