//! Field-specific cleanup of raw OCR text.
//!
//! Each rule maps whatever Tesseract produced for one preprocessing variant
//! to the canonical form that gets voted on. An empty result means the
//! variant produced nothing usable.

use card_state::Field;

/// Position codes in classifier label order.
pub const POSITIONS: [&str; 18] = [
    "GK", "SW", "CB", "LB", "RB", "DMF", "CMF", "LMF", "RMF", "AMF", "LWF", "RWF", "SS", "CF",
    "ST", "CAM", "CDM", "RW",
];

const POSITION_CORRECTIONS: [(&str, &str); 13] = [
    ("DM", "DMF"),
    ("CM", "CMF"),
    ("AM", "AMF"),
    ("RM", "RMF"),
    ("LM", "LMF"),
    ("RW", "RWF"),
    ("LW", "LWF"),
    ("CD", "CB"),
    ("LWP", "LWF"),
    ("BWF", "RWF"),
    ("DMI", "DMF"),
    ("CNF", "CMF"),
    ("BMP", "RMF"),
];

const SEASON_CORRECTIONS: [(&str, &str); 14] = [
    ("FC21", "21FC"),
    ("FC22", "22FC"),
    ("TOT", "TOTS"),
    ("TTS", "TOTS"),
    ("T0TS", "TOTS"),
    ("TTY", "TOTY"),
    ("TOY", "TOTY"),
    ("T0TY", "TOTY"),
    ("HRO", "HERO"),
    ("HER", "HERO"),
    ("HEP0", "HERO"),
    ("IC0N", "ICON"),
    ("ICN", "ICON"),
    ("1CON", "ICON"),
];

pub fn normalize(field: Field, raw: &str) -> String {
    match field {
        Field::Overall => overall(raw),
        Field::Position => position(raw),
        Field::Salary => salary(raw),
        Field::EnhanceLevel => enhance_level(raw),
        Field::PlayerName => player_name(raw),
        Field::SeasonIcon => season_icon(raw),
        // Read from the gauge, never from text
        Field::BoostLevel => raw.trim().to_string(),
    }
}

/// Digits only; values outside 70..=120 are re-based to `70 + n % 50`.
pub fn overall(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return digits;
    }
    match small_value(&digits) {
        Some(n) if (70..=120).contains(&n) => n.to_string(),
        _ => (70 + digits_mod(&digits, 50)).to_string(),
    }
}

/// Digits only; values above 100 are re-based to `1 + n % 100`.
pub fn salary(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return digits;
    }
    match small_value(&digits) {
        Some(n) if n <= 100 => n.to_string(),
        _ => (1 + digits_mod(&digits, 100)).to_string(),
    }
}

/// Digits only; values above 5 clamp to 5.
pub fn enhance_level(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return digits;
    }
    match small_value(&digits) {
        Some(n) if n <= 5 => n.to_string(),
        _ => "5".to_string(),
    }
}

/// Letters only, uppercased, then corrected toward a known position code.
pub fn position(raw: &str) -> String {
    let text: String = raw
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_uppercase)
        .collect();

    let text = lookup(&POSITION_CORRECTIONS, &text)
        .map(str::to_string)
        .unwrap_or(text);
    if text.is_empty() || POSITIONS.contains(&text.as_str()) {
        return text;
    }

    let guess = if text.contains("LW") || text.contains("LF") {
        "LWF"
    } else if text.contains("RW") || text.contains("RF") {
        "RWF"
    } else if text.contains("DM") {
        "DMF"
    } else if text.contains("CM") {
        "CMF"
    } else if text.contains("AM") {
        "AMF"
    } else if text.contains("CB") {
        "CB"
    } else if text.starts_with('S') && text.chars().count() > 1 {
        "ST"
    } else {
        return text;
    };
    guess.to_string()
}

/// Word characters only (letters of any script, digits, underscore).
pub fn player_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Spaces removed, uppercased, then common misreads mapped to tier tags.
pub fn season_icon(raw: &str) -> String {
    let text: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_uppercase)
        .collect();
    lookup(&SEASON_CORRECTIONS, &text)
        .map(str::to_string)
        .unwrap_or(text)
}

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Value of a digit string, or `None` if it does not fit in a u64.
fn small_value(digits: &str) -> Option<u64> {
    digits.parse().ok()
}

/// `n % m` for an arbitrarily long digit string.
fn digits_mod(digits: &str, m: u64) -> u64 {
    digits
        .bytes()
        .fold(0, |acc, b| (acc * 10 + (b - b'0') as u64) % m)
}
