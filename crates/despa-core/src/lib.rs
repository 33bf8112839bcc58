//! Core library for customs document reconciliation.
//!
//! This crate provides:
//! - Region OCR over scanned page images (free text, digits, date characters)
//! - Page-type detection from spatial rules
//! - Coordinate-based field extraction with cross-page label merging
//! - Field-by-field document comparison with an approve/review/reject verdict
//! - PDF page loading and text-layer extraction for incoming documents

pub mod error;
pub mod models;
pub mod patterns;
pub mod pdf;
pub mod ocr;
pub mod detection;
pub mod extraction;
pub mod comparison;
pub mod text;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use error::{DespaError, PreconditionError, Result};
pub use models::catalog::{
    Catalog, ConfigurableAttribute, DataType, DetectionRule, FieldCoordinate, PageType, Rect,
    ValidationKind, ValidationRules,
};
pub use models::comparison::{AttributeComparison, ComparisonResult, ComparisonStatus};
pub use models::config::{ComparisonConfig, DespaConfig, DetectionConfig};
pub use models::fields::FieldMap;
pub use models::page::PageImage;
pub use ocr::{OcrRegionReader, OcrResult, RecognitionMode, Recognizer, RegionReader, TextBox};
#[cfg(feature = "native")]
pub use ocr::PureOcrRecognizer;
pub use detection::{PageDetection, PageTypeDetector, RuleMatch};
pub use extraction::{coordinates_by_page, CoordinateExtractor, ExtractedFields};
pub use comparison::DocumentComparator;
pub use pdf::{PdfExtractor, PdfProcessor};
pub use text::TextExtractor;
pub use pipeline::{Pipeline, ProvisionalExtraction, Reconciler};
