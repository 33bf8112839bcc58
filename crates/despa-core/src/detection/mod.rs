//! Page-type detection.
//!
//! Each page is checked against the page types of the catalog in order. A type
//! wins when every one of its rules matches; the first such type is the page's
//! type. Pages no type matches are reported as undetected.

pub mod comparators;
mod engine;

pub use comparators::{compare_date, compare_number, compare_text, compare_typed, OrderingOp};
pub use engine::{PageDetection, PageTypeDetector, RuleMatch};
