use card_state::BoundingBox;
use image::{GrayImage, RgbImage};
use imageproc::contours::find_contours;
use imageproc::point::Point;
use tracing::{debug, info, warn};

use crate::color::{self, HsvRange};
use crate::debug::DebugSink;

/// Images smaller than this on either side are rejected.
pub const MIN_DIMENSION: u32 = 300;

/// Longer side of the frame detection runs on.
pub const MAX_DIMENSION: u32 = 1280;

/// A candidate contour must cover more than this fraction of the frame.
const MIN_AREA_FRACTION: f64 = 0.1;

/// Accepted height/width range; cards are roughly 1:1.4.
const MIN_ASPECT: f64 = 1.0;
const MAX_ASPECT: f64 = 1.8;

/// Radius of the 5x5 structuring element used to clean the mask.
const MORPH_RADIUS: u8 = 2;

/// Near-white or gray card stock
const BRIGHT: HsvRange = HsvRange::new([0, 0, 150], [180, 60, 255]);
/// Gold tier iconography
const GOLD: HsvRange = HsvRange::new([20, 100, 100], [40, 255, 255]);
/// Blue card backgrounds
const BLUE: HsvRange = HsvRange::new([100, 50, 50], [130, 255, 255]);

/// The card located within a screenshot.
#[derive(Debug, Clone)]
pub struct CardRegion {
    /// Card pixels, cropped from the normalized frame.
    pub image: RgbImage,
    /// Position within the normalized frame.
    pub bbox: BoundingBox,
    /// Normalized frame size divided by source size (1.0 when not downscaled).
    pub scale: f64,
    /// True when detection failed and the whole frame stands in for the card.
    pub fallback: bool,
}

impl CardRegion {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Bounding box mapped back to the coordinates of the source screenshot.
    pub fn source_bbox(&self) -> BoundingBox {
        let inv = 1.0 / self.scale;
        BoundingBox::new(
            (self.bbox.x as f64 * inv).round() as u32,
            (self.bbox.y as f64 * inv).round() as u32,
            (self.bbox.width as f64 * inv).round() as u32,
            (self.bbox.height as f64 * inv).round() as u32,
        )
    }
}

/// Locate the card in a screenshot.
///
/// Returns `None` only when the image is too small to process. If no
/// card-shaped region is found the whole (normalized) frame is returned with
/// `fallback` set, so callers always get something to extract fields from.
pub fn locate_card(image: &RgbImage, debug: Option<&DebugSink>) -> Option<CardRegion> {
    let (w, h) = image.dimensions();
    if w < MIN_DIMENSION || h < MIN_DIMENSION {
        warn!("Image too small: {}x{}", w, h);
        return None;
    }

    let (frame, scale) = normalize_size(image);
    let (fw, fh) = frame.dimensions();
    if let Some(sink) = debug {
        sink.save_rgb("original", &frame);
    }

    let mask = card_mask(&frame);
    if let Some(sink) = debug {
        sink.save_gray("mask", &mask);
    }

    let min_area = fw as f64 * fh as f64 * MIN_AREA_FRACTION;
    if let Some(bbox) = largest_region(&mask, min_area) {
        let aspect = bbox.aspect_ratio();
        if (MIN_ASPECT..=MAX_ASPECT).contains(&aspect) {
            let card = card_capture::crop_box(&frame, &bbox);
            if let Some(sink) = debug {
                sink.save_rgb("card_detected", &card);
                sink.save_rgb(
                    "card_detection",
                    &crate::debug::annotate_box(&frame, &bbox, crate::debug::GREEN),
                );
            }
            info!(
                "Card detected: ({}, {}, {}, {}), aspect {:.2}",
                bbox.x, bbox.y, bbox.width, bbox.height, aspect
            );
            return Some(CardRegion {
                image: card,
                bbox,
                scale,
                fallback: false,
            });
        }
        debug!("Largest region rejected: aspect {:.2}", aspect);
    }

    warn!("Card detection failed, using the whole image");
    if let Some(sink) = debug {
        sink.save_rgb("card_fallback", &frame);
    }
    Some(CardRegion {
        image: frame,
        bbox: BoundingBox::new(0, 0, fw, fh),
        scale,
        fallback: true,
    })
}

/// Downscale so the longer side is at most `MAX_DIMENSION`, keeping aspect ratio.
fn normalize_size(image: &RgbImage) -> (RgbImage, f64) {
    let (w, h) = image.dimensions();
    if w <= MAX_DIMENSION && h <= MAX_DIMENSION {
        return (image.clone(), 1.0);
    }
    let scale = MAX_DIMENSION as f64 / w.max(h) as f64;
    let nw = ((w as f64 * scale) as u32).max(1);
    let nh = ((h as f64 * scale) as u32).max(1);
    debug!("Resized {}x{} -> {}x{}", w, h, nw, nh);
    let resized = image::imageops::resize(image, nw, nh, image::imageops::FilterType::Triangle);
    (resized, scale)
}

/// Union of the bright, gold and blue masks, closed then opened.
fn card_mask(frame: &RgbImage) -> GrayImage {
    let hsv = color::to_hsv(frame);
    let masks = [
        color::in_range(&hsv, &BRIGHT),
        color::in_range(&hsv, &GOLD),
        color::in_range(&hsv, &BLUE),
    ];
    let combined =
        color::union(&masks).unwrap_or_else(|| GrayImage::new(frame.width(), frame.height()));
    let closed = color::close_square(&combined, MORPH_RADIUS);
    color::open_square(&closed, MORPH_RADIUS)
}

/// Bounding box of the largest outermost contour with area above `min_area`.
fn largest_region(mask: &GrayImage, min_area: f64) -> Option<BoundingBox> {
    let contours = find_contours::<i32>(mask);
    let outer: Vec<_> = contours.iter().filter(|c| c.parent.is_none()).collect();
    debug!("{} contour(s), {} outermost", contours.len(), outer.len());

    outer
        .into_iter()
        .map(|c| (polygon_area(&c.points), &c.points))
        .filter(|(area, _)| *area > min_area)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .and_then(|(area, points)| {
            let bbox = bounding_rect(points)?;
            debug!(
                "Largest contour: area {:.0}, box ({}, {}, {}, {})",
                area, bbox.x, bbox.y, bbox.width, bbox.height
            );
            Some(bbox)
        })
}

/// Shoelace area of a closed polygon.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice.abs() as f64 / 2.0
}

/// Inclusive axis-aligned bounding box of contour points.
fn bounding_rect(points: &[Point<i32>]) -> Option<BoundingBox> {
    let min_x = points.iter().map(|p| p.x).min()?;
    let max_x = points.iter().map(|p| p.x).max()?;
    let min_y = points.iter().map(|p| p.y).min()?;
    let max_y = points.iter().map(|p| p.y).max()?;
    Some(BoundingBox::new(
        min_x.max(0) as u32,
        min_y.max(0) as u32,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Dark frame with one filled rectangle.
    fn frame_with_rect(w: u32, h: u32, rect: BoundingBox, color: Rgb<u8>) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let inside = x >= rect.x
                && x < rect.x + rect.width
                && y >= rect.y
                && y < rect.y + rect.height;
            if inside {
                color
            } else {
                Rgb([20, 20, 20])
            }
        })
    }

    fn close_to(a: u32, b: u32, tol: u32) -> bool {
        a.abs_diff(b) <= tol
    }

    #[test]
    fn test_centered_gray_card_is_detected() {
        let rect = BoundingBox::new(300, 380, 600, 840);
        let frame = frame_with_rect(1200, 1600, rect, Rgb([200, 200, 200]));

        let region = locate_card(&frame, None).expect("large image must yield a region");
        assert!(!region.fallback);
        assert!((region.scale - 0.8).abs() < 1e-9);

        let src = region.source_bbox();
        assert!(close_to(src.x, 300, 5), "x = {}", src.x);
        assert!(close_to(src.y, 380, 5), "y = {}", src.y);
        assert!(close_to(src.width, 600, 6), "w = {}", src.width);
        assert!(close_to(src.height, 840, 6), "h = {}", src.height);

        // Detection coordinates live in the 960x1280 normalized frame
        assert!(close_to(region.bbox.x, 240, 3));
        assert!(close_to(region.bbox.width, 480, 4));
        assert_eq!(region.image.width(), region.bbox.width);
        assert_eq!(region.image.height(), region.bbox.height);
    }

    #[test]
    fn test_blue_card_is_detected_without_resize() {
        let rect = BoundingBox::new(200, 100, 400, 560);
        let frame = frame_with_rect(800, 800, rect, Rgb([30, 60, 200]));

        let region = locate_card(&frame, None).unwrap();
        assert!(!region.fallback);
        assert_eq!(region.scale, 1.0);
        assert!(close_to(region.bbox.x, 200, 2));
        assert!(close_to(region.bbox.height, 560, 3));
    }

    #[test]
    fn test_small_image_is_rejected() {
        assert!(locate_card(&RgbImage::new(299, 600), None).is_none());
        assert!(locate_card(&RgbImage::new(600, 250), None).is_none());
    }

    #[test]
    fn test_empty_frame_falls_back_to_whole_image() {
        // Permissive by design: no card found still yields a region.
        let frame = RgbImage::from_pixel(640, 480, Rgb([10, 10, 10]));
        let region = locate_card(&frame, None).unwrap();
        assert!(region.fallback);
        assert_eq!(region.bbox, BoundingBox::new(0, 0, 640, 480));
        assert_eq!(region.image.dimensions(), (640, 480));
    }

    #[test]
    fn test_wide_region_fails_aspect_check() {
        let rect = BoundingBox::new(50, 200, 700, 300);
        let frame = frame_with_rect(800, 800, rect, Rgb([220, 220, 220]));
        let region = locate_card(&frame, None).unwrap();
        assert!(region.fallback);
    }

    #[test]
    fn test_small_card_below_area_floor_falls_back() {
        let rect = BoundingBox::new(10, 10, 100, 140);
        let frame = frame_with_rect(800, 800, rect, Rgb([220, 220, 220]));
        assert!(locate_card(&frame, None).unwrap().fallback);
    }

    #[test]
    fn test_never_none_at_or_above_minimum() {
        for &(w, h) in &[(300, 300), (300, 1500), (1500, 300), (2000, 2000)] {
            let frame = RgbImage::from_pixel(w, h, Rgb([90, 40, 10]));
            assert!(locate_card(&frame, None).is_some(), "{}x{}", w, h);
        }
    }

    #[test]
    fn test_oversized_image_normalized_to_max_dimension() {
        let frame = RgbImage::new(2560, 1440);
        let region = locate_card(&frame, None).unwrap();
        assert_eq!(region.image.width(), 1280);
        assert_eq!(region.image.height(), 720);
    }

    #[test]
    fn test_polygon_area_of_square() {
        let pts = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(polygon_area(&pts), 100.0);
    }
}
