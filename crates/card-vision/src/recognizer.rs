use anyhow::Result;
use card_data::NameDictionary;
use card_state::{Field, RecognitionOutcome};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::cache::{content_hash, ResultCache};
use crate::debug::DebugSink;
use crate::fields::FieldImage;
use crate::ocr::OcrEngine;
use crate::profile::{fallback_value, profile, FieldProfile};
use crate::voter::{self, ModelVoter};
use crate::{gauge, normalizer};

/// State shared by every recognition call.
struct Shared {
    cache: ResultCache,
    names: NameDictionary,
}

/// Turns field crops into values.
///
/// Owns the result cache and the name dictionary behind a single lock, so one
/// recognizer can serve many images in parallel. OCR runs outside the lock.
pub struct CardRecognizer {
    engine: Arc<dyn OcrEngine>,
    voter: ModelVoter,
    shared: Mutex<Shared>,
    caching: bool,
    debug: Option<DebugSink>,
}

impl CardRecognizer {
    pub fn new(engine: Arc<dyn OcrEngine>, names: NameDictionary) -> Self {
        Self {
            engine,
            voter: ModelVoter::new(),
            shared: Mutex::new(Shared {
                cache: ResultCache::default(),
                names,
            }),
            caching: true,
            debug: None,
        }
    }

    pub fn with_voter(mut self, voter: ModelVoter) -> Self {
        self.voter = voter;
        self
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.caching = enabled;
        self
    }

    pub fn with_debug(mut self, sink: Option<DebugSink>) -> Self {
        self.debug = sink;
        self
    }

    pub fn cache_len(&self) -> usize {
        self.shared.lock().cache.len()
    }

    /// Recognize a field, letting a trained model override the OCR reading
    /// when it is more confident.
    pub fn recognize_field(&self, field: &FieldImage) -> RecognitionOutcome {
        let ocr = self.recognize(field);
        voter::fuse(ocr, self.voter.vote(field))
    }

    /// Recognize a field from its gauge or its text. Never fails: a field
    /// no variant could read gets its fallback value with zero confidence.
    pub fn recognize(&self, field: &FieldImage) -> RecognitionOutcome {
        let Some(profile) = profile(field.field) else {
            return gauge::analyze(&field.image, self.debug.as_ref());
        };

        let key = (field.field, content_hash(&field.image));
        if self.caching {
            let shared = self.shared.lock();
            if let Some(hit) = shared.cache.get(&key) {
                debug!("Cache hit for {}", field.field);
                return apply_dictionary(field.field, hit.clone(), &shared.names);
            }
        }

        let texts = self.read_variants(field, profile);
        let Some((winner, votes)) = tally(&texts) else {
            debug!("No text for {}, using fallback", field.field);
            return RecognitionOutcome::new(fallback_value(field.field), 0.0);
        };
        let voted = RecognitionOutcome::new(winner, votes as f64 / texts.len() as f64);
        debug!(
            "{}: '{}' with {}/{} votes",
            field.field,
            voted.value,
            votes,
            texts.len()
        );

        let mut shared = self.shared.lock();
        let outcome = apply_dictionary(field.field, voted, &shared.names);
        if self.caching {
            shared.cache.insert(key, outcome.clone());
        }
        outcome
    }

    /// Record a human correction of a player name and persist the dictionary.
    ///
    /// Returns `Ok(false)` for a rejected pair. The in-memory entry stays even
    /// if saving fails.
    pub fn record_correction(&self, original: &str, corrected: &str) -> Result<bool> {
        let mut shared = self.shared.lock();
        if !shared.names.record_correction(original, corrected) {
            return Ok(false);
        }
        shared.names.save()?;
        Ok(true)
    }

    /// Number of name corrections on file.
    pub fn correction_count(&self) -> usize {
        self.shared.lock().names.len()
    }

    /// Normalized OCR text of every preprocessing variant, empty where nothing was read.
    fn read_variants(&self, field: &FieldImage, profile: &FieldProfile) -> Vec<String> {
        profile
            .variants
            .iter()
            .enumerate()
            .map(|(i, variant)| {
                let rendered = variant.render(&field.image);
                if let Some(sink) = &self.debug {
                    sink.save_dynamic(&format!("field_{}_variant{}", field.field, i), &rendered);
                }
                match self.engine.recognize(&rendered, &profile.options) {
                    Ok(raw) => {
                        let text = normalizer::normalize(field.field, &raw);
                        debug!(
                            "{} variant {} ({:?}): '{}' -> '{}'",
                            field.field, i, variant, raw, text
                        );
                        text
                    }
                    Err(e) => {
                        debug!("OCR failed on {} variant {}: {:#}", field.field, i, e);
                        String::new()
                    }
                }
            })
            .collect()
    }
}

/// Most frequent non-empty text and its count; ties go to the earliest.
fn tally(texts: &[String]) -> Option<(String, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for text in texts.iter().filter(|t| !t.is_empty()) {
        match counts.iter_mut().find(|(t, _)| *t == text.as_str()) {
            Some((_, n)) => *n += 1,
            None => counts.push((text.as_str(), 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (text, n) in counts {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((text, n));
        }
    }
    best.map(|(t, n)| (t.to_string(), n))
}

/// Swap a player name for its recorded correction, which is authoritative.
fn apply_dictionary(
    field: Field,
    outcome: RecognitionOutcome,
    names: &NameDictionary,
) -> RecognitionOutcome {
    if field != Field::PlayerName {
        return outcome;
    }
    match names.get(&outcome.value) {
        Some(corrected) => RecognitionOutcome::new(corrected, 1.0),
        None => outcome,
    }
}
