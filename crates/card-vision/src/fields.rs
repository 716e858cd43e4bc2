use card_capture::RatioBox;
use card_state::{BoundingBox, Field};
use image::RgbImage;
use std::collections::BTreeMap;
use tracing::debug;

use crate::debug::DebugSink;
use crate::locator::CardRegion;

/// A field's crop from the card. Always non-empty.
#[derive(Debug, Clone)]
pub struct FieldImage {
    pub field: Field,
    pub image: RgbImage,
    /// Position within the card image.
    pub bbox: BoundingBox,
}

/// Crop every field whose ratio box maps to a non-empty area of the card.
///
/// Invalid or degenerate boxes are skipped; a partial field set is expected.
pub fn extract_fields(
    card: &CardRegion,
    boxes: &BTreeMap<Field, RatioBox>,
    debug: Option<&DebugSink>,
) -> BTreeMap<Field, FieldImage> {
    let (w, h) = (card.width(), card.height());
    let mut fields = BTreeMap::new();

    for (&field, ratio) in boxes {
        let Some((bbox, image)) = card_capture::crop_ratio(&card.image, ratio) else {
            debug!("Skipping {}: box {:?} is empty on a {}x{} card", field, ratio, w, h);
            continue;
        };
        if image.width() == 0 || image.height() == 0 {
            continue;
        }
        if let Some(sink) = debug {
            sink.save_rgb(&format!("field_{}", field), &image);
        }
        fields.insert(field, FieldImage { field, image, bbox });
    }

    debug!("Extracted {} of {} field(s)", fields.len(), boxes.len());

    if let Some(sink) = debug {
        let boxes: Vec<_> = fields
            .values()
            .map(|f| (f.bbox, crate::debug::field_color(f.field)))
            .collect();
        sink.save_rgb("all_fields", &crate::debug::annotate_boxes(&card.image, &boxes));
    }

    fields
}
