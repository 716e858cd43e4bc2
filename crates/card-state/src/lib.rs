use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A named attribute printed on a player card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Overall,
    Position,
    SeasonIcon,
    Salary,
    EnhanceLevel,
    PlayerName,
    BoostLevel,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Overall,
        Field::Position,
        Field::SeasonIcon,
        Field::Salary,
        Field::EnhanceLevel,
        Field::PlayerName,
        Field::BoostLevel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Overall => "overall",
            Field::Position => "position",
            Field::SeasonIcon => "season_icon",
            Field::Salary => "salary",
            Field::EnhanceLevel => "enhance_level",
            Field::PlayerName => "player_name",
            Field::BoostLevel => "boost_level",
        }
    }

    /// The field rendered as a colored bar instead of text.
    pub fn is_gauge(self) -> bool {
        self == Field::BoostLevel
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown field '{}'", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Pixel rectangle within an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Height over width; 0.0 for a degenerate box.
    pub fn aspect_ratio(&self) -> f64 {
        if self.width == 0 {
            0.0
        } else {
            self.height as f64 / self.width as f64
        }
    }
}

/// Canonical value recognized for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutcome {
    pub value: String,
    /// 1.0 is reserved for dictionary corrections and gauge readings.
    pub confidence: f64,
}

impl RecognitionOutcome {
    pub fn new(value: impl Into<String>, confidence: f64) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }
}

/// Everything recognized from one screenshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub success: bool,
    /// Card bounding box in the coordinates of the source image.
    pub card: Option<BoundingBox>,
    pub fields: BTreeMap<Field, RecognitionOutcome>,
}

impl RecognitionResult {
    pub fn new() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Result for an image that could not be processed at all.
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&RecognitionOutcome> {
        self.fields.get(&field)
    }

    pub fn value(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(|o| o.value.as_str())
    }

    pub fn confidence(&self, field: Field) -> Option<f64> {
        self.fields.get(&field).map(|o| o.confidence)
    }

    /// Fields whose confidence is below `threshold`.
    pub fn low_confidence(&self, threshold: f64) -> Vec<Field> {
        self.fields
            .iter()
            .filter(|(_, o)| o.confidence < threshold)
            .map(|(f, _)| *f)
            .collect()
    }
}
