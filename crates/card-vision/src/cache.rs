use card_state::{Field, RecognitionOutcome};
use image::RgbImage;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

/// Entries kept before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Identifies one field crop by content.
pub type CacheKey = (Field, u64);

/// Hash of a crop's dimensions and raw pixel bytes.
pub fn content_hash(image: &RgbImage) -> u64 {
    let mut hasher = DefaultHasher::new();
    image.dimensions().hash(&mut hasher);
    image.as_raw().hash(&mut hasher);
    hasher.finish()
}

/// Bounded memo of recognized crops, evicting in insertion order.
#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<CacheKey, RecognitionOutcome>,
    order: VecDeque<CacheKey>,
    capacity: usize,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ResultCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&RecognitionOutcome> {
        self.entries.get(key)
    }

    /// Insert or overwrite. Overwriting keeps the key's original insertion slot.
    pub fn insert(&mut self, key: CacheKey, outcome: RecognitionOutcome) {
        if self.entries.insert(key, outcome).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
