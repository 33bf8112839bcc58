use serde_json::Value;
use tracing::{debug, info};

use crate::models::catalog::{ConfigurableAttribute, ValidationKind, ValidationRules};
use crate::models::comparison::{
    AttributeComparison, ComparisonResult, ComparisonStatus, REQUIRED_FIELD_MISSING,
};
use crate::models::config::ComparisonConfig;
use crate::models::fields::{value_text, FieldMap};
use crate::patterns::{DIGIT_RUN, NON_NUMERIC};

use super::similarity::ratio;

/// Confidence of an exact (case-insensitive) match.
const EXACT_CONFIDENCE: f64 = 1.0;

/// Confidence of a match found through a numeric or date validation rule.
const RULE_CONFIDENCE: f64 = 0.95;

/// Compares extracted field maps attribute by attribute.
#[derive(Debug, Clone, Default)]
pub struct DocumentComparator {
    config: ComparisonConfig,
}

impl DocumentComparator {
    pub fn new(config: ComparisonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Compare a provisional document's fields with a commercial document's.
    ///
    /// A required attribute missing on either side counts as a failed
    /// comparison. An optional one is left out of the totals.
    pub fn compare(
        &self,
        commercial: &FieldMap,
        provisional: &FieldMap,
        attributes: &[ConfigurableAttribute],
    ) -> ComparisonResult {
        let mut comparisons = Vec::with_capacity(attributes.len());
        let mut matches = 0;

        for attribute in attributes {
            let commercial_value = commercial.get_path(&attribute.key);
            let provisional_value = provisional.get_path(&attribute.key);

            match (commercial_value, provisional_value) {
                (Some(c), Some(p)) => {
                    let (matched, confidence) =
                        self.compare_values(c, p, attribute.validation_rules.as_ref());
                    if matched {
                        matches += 1;
                    }
                    comparisons.push(AttributeComparison {
                        attribute_name: attribute.name.clone(),
                        attribute_key: attribute.key.clone(),
                        commercial_value: c.clone(),
                        provisional_value: p.clone(),
                        matched,
                        confidence,
                        required: attribute.required,
                        reason: None,
                    });
                }
                (c, p) if attribute.required => {
                    debug!("Required attribute '{}' is missing", attribute.key);
                    comparisons.push(AttributeComparison {
                        attribute_name: attribute.name.clone(),
                        attribute_key: attribute.key.clone(),
                        commercial_value: c.cloned().unwrap_or(Value::Null),
                        provisional_value: p.cloned().unwrap_or(Value::Null),
                        matched: false,
                        confidence: 0.0,
                        required: true,
                        reason: Some(REQUIRED_FIELD_MISSING.to_string()),
                    });
                }
                _ => debug!("Optional attribute '{}' is missing, skipping", attribute.key),
            }
        }

        let total_comparisons = comparisons.len();
        let percentage = if total_comparisons > 0 {
            matches as f64 / total_comparisons as f64 * 100.0
        } else {
            0.0
        };
        let status = self.status_for(percentage, &comparisons);

        info!(
            "Comparison: {}/{} attributes match ({:.2}%), status {}",
            matches, total_comparisons, percentage, status
        );

        ComparisonResult {
            comparisons,
            match_percentage: round2(percentage),
            matches,
            total_comparisons,
            status,
        }
    }

    /// Compare two scalar values, returning `(match, confidence)`.
    pub fn compare_values(
        &self,
        commercial: &Value,
        provisional: &Value,
        rules: Option<&ValidationRules>,
    ) -> (bool, f64) {
        let raw_commercial = value_text(commercial);
        let raw_provisional = value_text(provisional);
        let a = raw_commercial.trim().to_lowercase();
        let b = raw_provisional.trim().to_lowercase();

        if a == b {
            return (true, EXACT_CONFIDENCE);
        }

        let similarity = ratio(&a, &b);
        if similarity >= self.config.similarity_threshold {
            return (true, similarity);
        }

        let Some(rules) = rules else {
            return (false, similarity);
        };

        match rules.kind {
            Some(ValidationKind::Numeric) => {
                let tolerance = rules.tolerance.unwrap_or(self.config.default_tolerance);
                if let (Some(x), Some(y)) = (
                    parse_numeric(&raw_commercial),
                    parse_numeric(&raw_provisional),
                ) {
                    if (x - y).abs() <= tolerance {
                        return (true, RULE_CONFIDENCE);
                    }
                }
            }
            Some(ValidationKind::Date) => {
                if normalize_date(&a) == normalize_date(&b) {
                    return (true, RULE_CONFIDENCE);
                }
            }
            _ => {}
        }

        (false, similarity)
    }

    /// Decide the verdict for a match percentage.
    ///
    /// Any required attribute that did not match rejects the document outright.
    pub fn status_for(
        &self,
        percentage: f64,
        comparisons: &[AttributeComparison],
    ) -> ComparisonStatus {
        if comparisons.iter().any(|c| c.required && !c.matched) {
            ComparisonStatus::Rejected
        } else if percentage >= self.config.approve_at {
            ComparisonStatus::Approved
        } else if percentage >= self.config.review_at {
            ComparisonStatus::PendingReview
        } else {
            ComparisonStatus::Rejected
        }
    }

    /// Compare one provisional document against each commercial document, in input order.
    pub fn compare_against_all<K: Clone>(
        &self,
        provisional: &FieldMap,
        commercials: &[(K, FieldMap)],
        attributes: &[ConfigurableAttribute],
    ) -> Vec<(K, ComparisonResult)> {
        commercials
            .iter()
            .map(|(id, commercial)| {
                (
                    id.clone(),
                    self.compare(commercial, provisional, attributes),
                )
            })
            .collect()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_numeric(text: &str) -> Option<f64> {
    NON_NUMERIC.replace_all(text, "").parse::<f64>().ok()
}

/// Reduce a date to its first three digit runs joined with `-`.
///
/// Strings with fewer than three digit runs are returned unchanged.
pub fn normalize_date(text: &str) -> String {
    let runs: Vec<&str> = DIGIT_RUN.find_iter(text).map(|m| m.as_str()).collect();
    if runs.len() >= 3 {
        runs[..3].join("-")
    } else {
        text.to_string()
    }
}
