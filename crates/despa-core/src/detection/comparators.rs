//! Typed value comparators for detection rules.
//!
//! Every comparator returns a plain `bool`. Unparseable input, bad patterns and
//! unknown comparator names are logged and never surface as errors.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use regex::RegexBuilder;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::catalog::DataType;
use crate::patterns::{normalize_decimal, strip_number_noise};

/// Ordering comparator shared by number and date rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl OrderingOp {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            "gte" => Some(Self::Gte),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    /// Resolve a comparator name, falling back to `eq` for unknown names.
    fn resolve(name: &str, kind: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            warn!("Unknown {} comparator '{}', using 'eq'", kind, name);
            Self::Eq
        })
    }

    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Lt => ordering == Ordering::Less,
            Self::Gte => ordering != Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Compare OCR text against an expected string.
///
/// Comparisons are case-insensitive. `regex` searches the raw text with a
/// case-insensitive pattern.
pub fn compare_text(found: &str, expected: &str, comparator: &str) -> bool {
    let found_upper = found.to_uppercase();
    let expected_upper = expected.to_uppercase();

    match comparator {
        "contains" => found_upper.contains(&expected_upper),
        "not_contains" => !found_upper.contains(&expected_upper),
        "exact" => found_upper == expected_upper,
        "not_exact" => found_upper != expected_upper,
        "regex" => match RegexBuilder::new(expected).case_insensitive(true).build() {
            Ok(pattern) => pattern.is_match(found),
            Err(e) => {
                warn!("Invalid regex '{}': {}", expected, e);
                false
            }
        },
        other => {
            warn!("Unknown text comparator '{}', using 'contains'", other);
            found_upper.contains(&expected_upper)
        }
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(&normalize_decimal(text.trim())).ok()
}

/// Compare the number found in OCR text against an expected number.
///
/// The found text is reduced to digits, separators and sign first. When both
/// `,` and `.` appear, the last one is the decimal separator.
pub fn compare_number(found: &str, expected: &str, comparator: &str) -> bool {
    let op = OrderingOp::resolve(comparator, "number");

    let cleaned = strip_number_noise(found);
    if cleaned.is_empty() {
        debug!("No number in '{}'", found);
        return false;
    }

    match (parse_decimal(&cleaned), parse_decimal(expected)) {
        (Some(found_number), Some(expected_number)) => {
            op.holds(found_number.cmp(&expected_number))
        }
        _ => {
            warn!(
                "Could not convert to number: found='{}', expected='{}'",
                found, expected
            );
            false
        }
    }
}

/// Parse with a `chrono` format. Formats without a time component resolve to midnight.
fn parse_date(text: &str, format: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Compare a date found in OCR text against an expected date, both in `format`.
pub fn compare_date(found: &str, expected: &str, comparator: &str, format: &str) -> bool {
    let op = OrderingOp::resolve(comparator, "date");

    match (parse_date(found, format), parse_date(expected, format)) {
        (Some(found_date), Some(expected_date)) => op.holds(found_date.cmp(&expected_date)),
        _ => {
            warn!(
                "Could not parse date: found='{}', expected='{}', format='{}'",
                found, expected, format
            );
            false
        }
    }
}

/// Dispatch on the rule's data type.
pub fn compare_typed(
    data_type: DataType,
    found: &str,
    expected: &str,
    comparator: &str,
    date_format: &str,
) -> bool {
    match data_type {
        DataType::Text => compare_text(found, expected, comparator),
        DataType::Number => compare_number(found, expected, comparator),
        DataType::Date => compare_date(found, expected, comparator, date_format),
    }
}
