pub mod cache;
pub mod classifier;
pub mod color;
pub mod debug;
pub mod fields;
pub mod gauge;
pub mod locator;
pub mod normalizer;
pub mod ocr;
pub mod preprocess;
pub mod profile;
pub mod recognizer;
pub mod voter;

pub use classifier::{Classifier, ClassifierInput, TemplateClassifier};
pub use debug::DebugSink;
pub use fields::{extract_fields, FieldImage};
pub use locator::{locate_card, CardRegion};
pub use ocr::{OcrEngine, OcrOptions, TesseractCli};
pub use recognizer::CardRecognizer;
pub use voter::ModelVoter;

use card_capture::RatioBox;
use card_data::CardData;
use card_state::{Field, RecognitionResult};
use image::RgbImage;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Full pipeline for one screenshot: locate the card, crop its fields and
/// recognize each of them.
pub struct CardScanner {
    recognizer: CardRecognizer,
    boxes: BTreeMap<Field, RatioBox>,
    debug: Option<DebugSink>,
}

impl CardScanner {
    pub fn new(recognizer: CardRecognizer, boxes: BTreeMap<Field, RatioBox>) -> Self {
        Self {
            recognizer,
            boxes,
            debug: None,
        }
    }

    /// Build a scanner from the contents of a data directory, reading text with `engine`.
    pub fn from_data(data: &CardData, engine: Arc<dyn OcrEngine>) -> Self {
        let debug = if data.settings.debug_mode {
            match DebugSink::new(&data.debug_dir()) {
                Ok(sink) => Some(sink),
                Err(e) => {
                    warn!("Debug output disabled: {:#}", e);
                    None
                }
            }
        } else {
            None
        };

        let recognizer = CardRecognizer::new(engine, data.names.clone())
            .with_voter(ModelVoter::load(&data.models_dir()))
            .with_caching(data.settings.enable_caching)
            .with_debug(debug.clone());

        Self::new(recognizer, data.ratio_boxes()).with_debug(debug)
    }

    pub fn with_debug(mut self, sink: Option<DebugSink>) -> Self {
        self.debug = sink;
        self
    }

    /// Scan a screenshot on disk. Unreadable files give a failed result.
    pub fn scan_path(&self, path: &Path) -> RecognitionResult {
        match card_capture::load_screenshot(path) {
            Some(image) => self.scan_image(&image),
            None => RecognitionResult::failed(),
        }
    }

    /// Scan a decoded screenshot. Fails only when the image is too small.
    pub fn scan_image(&self, image: &RgbImage) -> RecognitionResult {
        let Some(card) = locate_card(image, self.debug.as_ref()) else {
            return RecognitionResult::failed();
        };
        let fields = extract_fields(&card, &self.boxes, self.debug.as_ref());

        let mut result = RecognitionResult::new();
        result.card = Some(card.source_bbox());
        for (field, crop) in &fields {
            let outcome = self.recognizer.recognize_field(crop);
            result.fields.insert(*field, outcome);
        }

        info!(
            "Recognized {} field(s){}",
            result.fields.len(),
            if card.fallback { " from the whole frame" } else { "" }
        );

        if let Some(sink) = &self.debug {
            let boxes: Vec<_> = fields
                .iter()
                .filter_map(|(field, crop)| {
                    let conf = result.confidence(*field)?;
                    Some((crop.bbox, debug::confidence_color(conf)))
                })
                .collect();
            sink.save_rgb("recognition_result", &debug::annotate_boxes(&card.image, &boxes));
        }

        result
    }
}
