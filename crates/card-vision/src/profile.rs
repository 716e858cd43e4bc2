use card_state::Field;

use crate::ocr::OcrOptions;
use crate::preprocess::Variant;

const DIGITS: &str = "0123456789";
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// How a text field is read: which renderings to try and how to configure OCR.
#[derive(Debug, Clone, Copy)]
pub struct FieldProfile {
    pub variants: &'static [Variant],
    pub options: OcrOptions,
    /// Reported with zero confidence when no variant yields text.
    pub fallback: &'static str,
}

static OVERALL: FieldProfile = FieldProfile {
    variants: &[
        Variant::Original,
        Variant::Grayscale,
        Variant::Otsu,
        Variant::AdaptiveGaussian,
    ],
    options: OcrOptions::line("eng", Some(DIGITS)),
    fallback: "80",
};

static POSITION: FieldProfile = FieldProfile {
    variants: &[
        Variant::Original,
        Variant::Grayscale,
        Variant::Otsu,
        Variant::Median,
    ],
    options: OcrOptions::line("eng", Some(LETTERS)),
    fallback: "ST",
};

static SALARY: FieldProfile = FieldProfile {
    variants: &[
        Variant::Original,
        Variant::Grayscale,
        Variant::Otsu,
        Variant::Equalize,
    ],
    options: OcrOptions::line("eng", Some(DIGITS)),
    fallback: "1",
};

static ENHANCE_LEVEL: FieldProfile = FieldProfile {
    variants: &[
        Variant::Original,
        Variant::Grayscale,
        Variant::Otsu,
        Variant::Upscale2x,
    ],
    options: OcrOptions::line("eng", Some(DIGITS)),
    fallback: "0",
};

static PLAYER_NAME: FieldProfile = FieldProfile {
    variants: &[
        Variant::Original,
        Variant::Grayscale,
        Variant::Otsu,
        Variant::Contrast(1.5),
    ],
    options: OcrOptions::line("kor+eng", None),
    fallback: "알 수 없음",
};

static SEASON_ICON: FieldProfile = FieldProfile {
    variants: &[
        Variant::Original,
        Variant::Grayscale,
        Variant::Otsu,
        Variant::Canny(100.0, 200.0),
    ],
    options: OcrOptions::line("eng", None),
    fallback: "21FC",
};

/// Text-reading profile for `field`; `None` for the gauge field.
pub fn profile(field: Field) -> Option<&'static FieldProfile> {
    match field {
        Field::Overall => Some(&OVERALL),
        Field::Position => Some(&POSITION),
        Field::Salary => Some(&SALARY),
        Field::EnhanceLevel => Some(&ENHANCE_LEVEL),
        Field::PlayerName => Some(&PLAYER_NAME),
        Field::SeasonIcon => Some(&SEASON_ICON),
        Field::BoostLevel => None,
    }
}

/// Value reported when a field cannot be read at all.
pub fn fallback_value(field: Field) -> &'static str {
    profile(field).map_or("0", |p| p.fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_text_field_has_a_profile() {
        for field in Field::ALL {
            assert_eq!(profile(field).is_some(), !field.is_gauge(), "{}", field);
        }
    }

    #[test]
    fn test_variant_fan_out() {
        for field in Field::ALL.into_iter().filter(|f| !f.is_gauge()) {
            let p = profile(field).unwrap();
            assert_eq!(p.variants.len(), 4);
            assert_eq!(p.variants[0], Variant::Original);
            assert_eq!(p.variants[2], Variant::Otsu);
        }
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(fallback_value(Field::Overall), "80");
        assert_eq!(fallback_value(Field::PlayerName), "알 수 없음");
        assert_eq!(fallback_value(Field::BoostLevel), "0");
    }

    #[test]
    fn test_name_reads_both_scripts() {
        let p = profile(Field::PlayerName).unwrap();
        assert_eq!(p.options.languages, "kor+eng");
        assert!(p.options.whitelist.is_none());
    }
}
