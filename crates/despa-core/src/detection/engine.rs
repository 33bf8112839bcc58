use image::DynamicImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::catalog::{DataType, DetectionRule, PageType, Rect};
use crate::models::config::DetectionConfig;
use crate::models::page::PageImage;
use crate::ocr::RegionReader;
use crate::patterns::correct_asterisks;

use super::comparators::compare_typed;

/// Confidence of a rule that only asks for non-empty text.
const PRESENCE_CONFIDENCE: f64 = 1.0;

/// Confidence of a rule whose expected value was compared and matched.
const VALUE_CONFIDENCE: f64 = 0.9;

/// Display name of pages no type matched.
pub const UNDETECTED_NAME: &str = "undetected";

/// UI color of pages no type matched.
pub const UNDETECTED_COLOR: &str = "#6c757d";

/// Evidence that one detection rule matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule_id: i64,
    pub field_name: String,
    #[serde(flatten)]
    pub region: Rect,
    pub expected_value: Option<String>,
    pub found_value: String,
    pub comparator: String,
    pub confidence: f64,
}

/// Detection outcome for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDetection {
    pub page_number: u32,
    pub page_type_id: Option<i64>,
    pub page_type_name: Option<String>,
    pub page_type_display_name: String,
    pub page_type_color: String,
    pub detection_boxes: Vec<RuleMatch>,
    /// Mean confidence of the matched rules, 0.0 when undetected.
    pub confidence: f64,
}

impl PageDetection {
    pub fn detected(page_number: u32, page_type: &PageType, matches: Vec<RuleMatch>) -> Self {
        let confidence = if matches.is_empty() {
            0.0
        } else {
            matches.iter().map(|m| m.confidence).sum::<f64>() / matches.len() as f64
        };

        Self {
            page_number,
            page_type_id: Some(page_type.id),
            page_type_name: Some(page_type.name.clone()),
            page_type_display_name: page_type.label().to_string(),
            page_type_color: page_type.color.clone(),
            detection_boxes: matches,
            confidence,
        }
    }

    pub fn undetected(page_number: u32) -> Self {
        Self {
            page_number,
            page_type_id: None,
            page_type_name: None,
            page_type_display_name: UNDETECTED_NAME.to_string(),
            page_type_color: UNDETECTED_COLOR.to_string(),
            detection_boxes: Vec::new(),
            confidence: 0.0,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.page_type_id.is_some()
    }
}

/// Classifies pages against the page types of a catalog snapshot.
pub struct PageTypeDetector<'a, R: RegionReader + ?Sized> {
    reader: &'a R,
    page_types: &'a [PageType],
    config: DetectionConfig,
}

impl<'a, R: RegionReader + ?Sized> PageTypeDetector<'a, R> {
    pub fn new(reader: &'a R, page_types: &'a [PageType]) -> Self {
        Self {
            reader,
            page_types,
            config: DetectionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Read the rule's region and test it.
    ///
    /// Regions are read as free text whatever the rule's type: date rules need
    /// the separators and month names their format names, and number rules
    /// strip their own noise.
    pub fn check_rule(&self, image: &DynamicImage, rule: &DetectionRule) -> Option<RuleMatch> {
        let mut text = self.reader.read_region(image, rule.region, DataType::Text);
        if self.config.asterisk_correction {
            text = correct_asterisks(&text);
        }

        let confidence = match rule.expectation() {
            None if text.is_empty() => {
                debug!("Rule {} ({}): no text found", rule.id, rule.field_name);
                return None;
            }
            None => PRESENCE_CONFIDENCE,
            Some(expected) => {
                let matched = compare_typed(
                    rule.data_type,
                    &text,
                    expected,
                    rule.comparator(),
                    rule.date_format(),
                );
                debug!(
                    "Rule {} ({}): type={}, comparator={}, expected='{}', found='{}', match={}",
                    rule.id,
                    rule.field_name,
                    rule.data_type.as_str(),
                    rule.comparator(),
                    expected,
                    text,
                    matched
                );
                if !matched {
                    return None;
                }
                VALUE_CONFIDENCE
            }
        };

        Some(RuleMatch {
            rule_id: rule.id,
            field_name: rule.field_name.clone(),
            region: rule.region,
            expected_value: rule.expected_value.clone(),
            found_value: text,
            comparator: rule.comparator().to_string(),
            confidence,
        })
    }

    /// Find the first page type whose rules all match.
    pub fn detect_page_type(&self, image: &DynamicImage) -> Option<(&'a PageType, Vec<RuleMatch>)> {
        'types: for page_type in self.page_types {
            if page_type.rules.is_empty() {
                debug!("Page type '{}' has no rules, skipping", page_type.name);
                continue;
            }

            let mut matches = Vec::with_capacity(page_type.rules.len());
            for rule in page_type.rules_by_priority() {
                match self.check_rule(image, rule) {
                    Some(m) => matches.push(m),
                    None => {
                        debug!(
                            "Page type '{}': rule {} failed, discarding type",
                            page_type.name, rule.id
                        );
                        continue 'types;
                    }
                }
            }

            info!(
                "Page detected as '{}' with {} matching rules",
                page_type.name,
                matches.len()
            );
            return Some((page_type, matches));
        }

        None
    }

    /// Decode and classify a single page.
    pub fn detect_page(&self, page: &PageImage) -> PageDetection {
        let image = match page.decode() {
            Ok(image) => image,
            Err(e) => {
                warn!("Page {}: failed to decode image: {}", page.page_number, e);
                return PageDetection::undetected(page.page_number);
            }
        };

        match self.detect_page_type(&image) {
            Some((page_type, matches)) => {
                PageDetection::detected(page.page_number, page_type, matches)
            }
            None => {
                warn!("Page {}: no page type matched", page.page_number);
                PageDetection::undetected(page.page_number)
            }
        }
    }

    /// Classify every page, in page-number order.
    pub fn detect_document_pages(&self, pages: &[PageImage]) -> Vec<PageDetection> {
        let mut ordered: Vec<&PageImage> = pages.iter().collect();
        ordered.sort_by_key(|p| p.page_number);

        if self.config.should_parallelize(ordered.len()) {
            debug!("Detecting {} pages in parallel", ordered.len());
            ordered.par_iter().map(|page| self.detect_page(page)).collect()
        } else {
            ordered.iter().map(|page| self.detect_page(page)).collect()
        }
    }
}
