//! Document comparison: field-by-field reconciliation of a provisional
//! document against a commercial one.

mod engine;
pub mod similarity;

pub use engine::{normalize_date, DocumentComparator};
pub use similarity::ratio;
