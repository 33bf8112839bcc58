//! Result records of a document-pair comparison.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reason recorded when a required attribute is absent from either document.
pub const REQUIRED_FIELD_MISSING: &str = "required field missing";

/// Final decision for a provisional document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    Approved,
    Rejected,
    PendingReview,
}

impl ComparisonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::PendingReview => "pending_review",
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one configurable attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeComparison {
    pub attribute_name: String,
    pub attribute_key: String,
    pub commercial_value: Value,
    pub provisional_value: Value,
    #[serde(rename = "match")]
    pub matched: bool,
    /// 0.0 - 1.0.
    pub confidence: f64,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Outcome of comparing a provisional document with a commercial one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub comparisons: Vec<AttributeComparison>,
    /// 0 - 100, rounded to 2 decimals.
    pub match_percentage: f64,
    pub matches: usize,
    pub total_comparisons: usize,
    pub status: ComparisonStatus,
}

impl ComparisonResult {
    /// Required attributes that did not match; any of these vetoes approval.
    pub fn failed_required(&self) -> impl Iterator<Item = &AttributeComparison> {
        self.comparisons.iter().filter(|c| c.required && !c.matched)
    }

    pub fn is_approved(&self) -> bool {
        self.status == ComparisonStatus::Approved
    }
}
