use card_state::{Field, RecognitionOutcome};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classifier::{Classifier, ClassifierInput, TemplateClassifier};
use crate::fields::FieldImage;
use crate::normalizer::POSITIONS;

/// Fields a classifier may be trained for.
pub const MODEL_FIELDS: [Field; 5] = [
    Field::Overall,
    Field::Position,
    Field::Salary,
    Field::EnhanceLevel,
    Field::SeasonIcon,
];

/// Season tier tags in classifier label order.
pub const SEASONS: [&str; 9] = [
    "21FC", "22FC", "TOTS", "TOTY", "ICON", "HERO", "LOL", "HC", "OTHER",
];

/// Per-field learned classifiers, read-only once loaded.
#[derive(Default, Clone)]
pub struct ModelVoter {
    classifiers: BTreeMap<Field, Arc<dyn Classifier>>,
}

impl ModelVoter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a classifier from `models_dir/<field>/` for each field that has one.
    /// Fields whose directory is missing or fails to load are left out.
    pub fn load(models_dir: &Path) -> Self {
        let mut voter = Self::new();
        for field in MODEL_FIELDS {
            let dir = models_dir.join(field.as_str());
            if !dir.is_dir() {
                continue;
            }
            match TemplateClassifier::load(&dir) {
                Ok(clf) => {
                    voter.register(field, Arc::new(clf));
                }
                Err(e) => warn!("Failed to load {} model: {:#}", field, e),
            }
        }
        info!("ModelVoter ready with {} model(s)", voter.len());
        voter
    }

    /// Add a classifier. Fields outside `MODEL_FIELDS` are refused.
    pub fn register(&mut self, field: Field, classifier: Arc<dyn Classifier>) -> bool {
        if !MODEL_FIELDS.contains(&field) {
            warn!("No classifier support for {}", field);
            return false;
        }
        self.classifiers.insert(field, classifier);
        true
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// Classify a field crop. `None` when the field has no model or inference fails.
    pub fn vote(&self, field: &FieldImage) -> Option<RecognitionOutcome> {
        let classifier = self.classifiers.get(&field.field)?;
        let (w, h) = classifier.input_size();
        let input = ClassifierInput::from_image(&field.image, w, h);

        let probs = match classifier.predict(&input) {
            Ok(probs) => probs,
            Err(e) => {
                warn!("{} model failed: {:#}", field.field, e);
                return None;
            }
        };
        let (index, &confidence) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        let value = label(field.field, index)?;
        debug!(
            "{} model: class {} -> {} ({:.2})",
            field.field, index, value, confidence
        );
        Some(RecognitionOutcome::new(value, confidence as f64))
    }
}

/// Domain value of a class index.
pub fn label(field: Field, index: usize) -> Option<String> {
    let clamp = |list: &[&str]| list.get(index).or(list.last()).map(|s| s.to_string());
    match field {
        Field::Overall => Some((index + 70).to_string()),
        Field::Salary => Some((index + 1).to_string()),
        Field::EnhanceLevel => Some(index.to_string()),
        Field::Position => clamp(&POSITIONS),
        Field::SeasonIcon => clamp(&SEASONS),
        Field::PlayerName | Field::BoostLevel => None,
    }
}

/// The model outcome replaces the OCR outcome only when strictly more confident.
pub fn fuse(ocr: RecognitionOutcome, model: Option<RecognitionOutcome>) -> RecognitionOutcome {
    match model {
        Some(m) if m.confidence > ocr.confidence => m,
        _ => ocr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use card_state::BoundingBox;
    use image::RgbImage;

    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }

        fn predict(&self, input: &ClassifierInput) -> Result<Vec<f32>> {
            assert_eq!(input.pixels.len(), 64);
            assert!(input.pixels.iter().flatten().all(|v| (0.0..=1.0).contains(v)));
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }

        fn predict(&self, _: &ClassifierInput) -> Result<Vec<f32>> {
            anyhow::bail!("corrupt weights")
        }
    }

    fn crop(field: Field) -> FieldImage {
        FieldImage {
            field,
            image: RgbImage::from_pixel(30, 12, image::Rgb([200, 10, 10])),
            bbox: BoundingBox::new(0, 0, 30, 12),
        }
    }

    #[test]
    fn test_argmax_maps_to_label() {
        let mut voter = ModelVoter::new();
        voter.register(Field::Overall, Arc::new(Fixed(vec![0.1, 0.2, 0.6, 0.1])));
        voter.register(Field::Position, Arc::new(Fixed(vec![0.1, 0.0, 0.9])));

        assert_eq!(
            voter.vote(&crop(Field::Overall)),
            Some(RecognitionOutcome::new("72", 0.6f32 as f64))
        );
        assert_eq!(voter.vote(&crop(Field::Position)).unwrap().value, "CB");
        assert!(voter.vote(&crop(Field::Salary)).is_none());
    }

    #[test]
    fn test_unsupported_fields_are_refused() {
        let mut voter = ModelVoter::new();
        assert!(!voter.register(Field::PlayerName, Arc::new(Fixed(vec![1.0]))));
        assert!(!voter.register(Field::BoostLevel, Arc::new(Fixed(vec![1.0]))));
        assert!(voter.is_empty());
    }

    #[test]
    fn test_failed_inference_is_absent() {
        let mut voter = ModelVoter::new();
        voter.register(Field::Salary, Arc::new(Broken));
        assert!(voter.vote(&crop(Field::Salary)).is_none());
    }

    #[test]
    fn test_labels() {
        assert_eq!(label(Field::Salary, 0).unwrap(), "1");
        assert_eq!(label(Field::EnhanceLevel, 3).unwrap(), "3");
        assert_eq!(label(Field::SeasonIcon, 4).unwrap(), "ICON");
        assert_eq!(label(Field::SeasonIcon, 40).unwrap(), "OTHER");
        assert_eq!(label(Field::Position, 99).unwrap(), "RW");
        assert!(label(Field::PlayerName, 0).is_none());
    }

    #[test]
    fn test_fusion_requires_strictly_higher_confidence() {
        let ocr = RecognitionOutcome::new("85", 0.5);
        assert_eq!(fuse(ocr.clone(), None), ocr);
        assert_eq!(
            fuse(ocr.clone(), Some(RecognitionOutcome::new("86", 0.5))),
            ocr
        );
        assert_eq!(
            fuse(ocr, Some(RecognitionOutcome::new("86", 0.75))).value,
            "86"
        );
    }

    #[test]
    fn test_load_skips_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("salary")).unwrap();
        let voter = ModelVoter::load(dir.path());
        // Empty salary dir fails to load and is skipped
        assert!(voter.is_empty());
    }
}
