//! Common regex patterns for OCR value cleanup.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Number rule input: everything but digits, separators and sign
    pub static ref NUMBER_NOISE: Regex = Regex::new(r"[^\d.,\-]").unwrap();

    // Numeric attribute values: keep digits and dots only
    pub static ref NON_NUMERIC: Regex = Regex::new(r"[^\d.]").unwrap();

    // Date attribute values are compared on their digit runs
    pub static ref DIGIT_RUN: Regex = Regex::new(r"\d+").unwrap();

    // OCR renderings of masked (asterisk) fields
    pub static ref ASTERISK_NOISE: Vec<Regex> = vec![
        Regex::new(r"[AaRrEe]{3,}").unwrap(),
        Regex::new(r"[xX]{3,}").unwrap(),
        Regex::new(r"[oO]{3,}").unwrap(),
        Regex::new(r"\+{3,}").unwrap(),
    ];
}

/// Replacement for a run of masked characters.
pub const MASK: &str = "*****";

/// Rewrite runs of OCR noise that stand for masked characters to `*****`.
pub fn correct_asterisks(text: &str) -> String {
    ASTERISK_NOISE
        .iter()
        .fold(text.to_string(), |acc, pattern| {
            pattern.replace_all(&acc, MASK).into_owned()
        })
}

/// Keep digits, separators and minus signs.
pub fn strip_number_noise(text: &str) -> String {
    NUMBER_NOISE.replace_all(text, "").into_owned()
}

/// Normalize a numeric string so the decimal separator is `.`.
///
/// With both `,` and `.` present, the one appearing last is the decimal
/// separator and the other is dropped. A lone `,` becomes `.`.
pub fn normalize_decimal(text: &str) -> String {
    match (text.rfind(','), text.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => text.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => text.replace(',', ""),
        (Some(_), None) => text.replace(',', "."),
        _ => text.to_string(),
    }
}
