use anyhow::{Context, Result};
use card_state::{BoundingBox, Field};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

/// Writes intermediate images for inspection. Never read back.
#[derive(Debug, Clone)]
pub struct DebugSink {
    dir: PathBuf,
}

impl DebugSink {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create debug directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_rgb(&self, name: &str, image: &RgbImage) {
        self.write(name, || image.save(self.path(name)));
    }

    pub fn save_gray(&self, name: &str, image: &GrayImage) {
        self.write(name, || image.save(self.path(name)));
    }

    pub fn save_dynamic(&self, name: &str, image: &DynamicImage) {
        self.write(name, || image.save(self.path(name)));
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.png", name))
    }

    fn write(&self, name: &str, save: impl FnOnce() -> image::ImageResult<()>) {
        if let Err(e) = save() {
            debug!("Failed to write debug image {}: {}", name, e);
        }
    }
}

/// Outline color per field, for the all-fields overview.
pub fn field_color(field: Field) -> Rgb<u8> {
    match field {
        Field::Overall => Rgb([255, 0, 0]),
        Field::Position => Rgb([0, 255, 0]),
        Field::SeasonIcon => Rgb([0, 0, 255]),
        Field::Salary => Rgb([255, 255, 0]),
        Field::EnhanceLevel => Rgb([255, 0, 255]),
        Field::PlayerName => Rgb([0, 255, 255]),
        Field::BoostLevel => Rgb([255, 0, 128]),
    }
}

/// Green for confident results, yellow for middling, red otherwise.
pub fn confidence_color(confidence: f64) -> Rgb<u8> {
    if confidence >= 0.8 {
        GREEN
    } else if confidence >= 0.5 {
        YELLOW
    } else {
        RED
    }
}

fn to_rect(bbox: &BoundingBox) -> Option<Rect> {
    (bbox.width > 0 && bbox.height > 0)
        .then(|| Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width, bbox.height))
}

/// Copy of `image` with a 2px outline around `bbox`.
pub fn annotate_box(image: &RgbImage, bbox: &BoundingBox, color: Rgb<u8>) -> RgbImage {
    annotate_boxes(image, &[(*bbox, color)])
}

/// Copy of `image` with a 2px outline around each box.
pub fn annotate_boxes(image: &RgbImage, boxes: &[(BoundingBox, Rgb<u8>)]) -> RgbImage {
    let mut out = image.clone();
    for (bbox, color) in boxes {
        if let Some(rect) = to_rect(bbox) {
            draw_hollow_rect_mut(&mut out, rect, *color);
        }
        if bbox.width > 2 && bbox.height > 2 {
            let inner = BoundingBox::new(bbox.x + 1, bbox.y + 1, bbox.width - 2, bbox.height - 2);
            if let Some(rect) = to_rect(&inner) {
                draw_hollow_rect_mut(&mut out, rect, *color);
            }
        }
    }
    out
}

/// A gray bar with the detected fill drawn in green.
pub fn gauge_visualization(width: u32, fill_end: f64) -> RgbImage {
    let width = width.max(1);
    let mut bar = RgbImage::from_pixel(width, 50, GRAY);
    let fill = (fill_end.max(0.0) as u32 + 1).min(width);
    draw_filled_rect_mut(&mut bar, Rect::at(0, 0).of_size(fill, 50), GREEN);
    bar
}
