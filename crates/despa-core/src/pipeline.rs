//! Document-level orchestration over a catalog snapshot.
//!
//! The engines themselves never fail. This layer checks the caller-level
//! preconditions first (no pages, nothing configured) and reports them as
//! [`PreconditionError`]s.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::comparison::DocumentComparator;
use crate::detection::{PageDetection, PageTypeDetector};
use crate::error::{PreconditionError, Result};
use crate::extraction::{coordinates_by_page, CoordinateExtractor, ExtractedFields};
use crate::models::catalog::Catalog;
use crate::models::comparison::ComparisonResult;
use crate::models::config::{ComparisonConfig, DespaConfig};
use crate::models::fields::FieldMap;
use crate::models::page::PageImage;
use crate::ocr::RegionReader;

/// Detection and extraction output for one provisional document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionalExtraction {
    pub detections: Vec<PageDetection>,
    pub extracted_data: ExtractedFields,
}

/// Runs detection, extraction and comparison against one catalog snapshot.
pub struct Pipeline<'a, R: RegionReader + ?Sized> {
    reader: &'a R,
    catalog: &'a Catalog,
    config: DespaConfig,
}

impl<'a, R: RegionReader + ?Sized> Pipeline<'a, R> {
    pub fn new(reader: &'a R, catalog: &'a Catalog) -> Self {
        Self {
            reader,
            catalog,
            config: DespaConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DespaConfig) -> Self {
        self.config = config;
        self
    }

    /// Classify every page of a provisional document.
    pub fn detect_pages(&self, pages: &[PageImage]) -> Result<Vec<PageDetection>> {
        if pages.is_empty() {
            return Err(PreconditionError::NoImages.into());
        }
        if !self.catalog.has_detection_rules() {
            return Err(PreconditionError::NoDetectionRules.into());
        }

        let detector = PageTypeDetector::new(self.reader, &self.catalog.page_types)
            .with_config(self.config.detection.clone());
        let detections = detector.detect_document_pages(pages);

        info!(
            "Detected {}/{} pages",
            detections.iter().filter(|d| d.is_detected()).count(),
            detections.len()
        );
        Ok(detections)
    }

    /// Detect page types, then read the coordinates of each detected page.
    pub fn extract_provisional(&self, pages: &[PageImage]) -> Result<ProvisionalExtraction> {
        if pages.is_empty() {
            return Err(PreconditionError::NoImages.into());
        }
        if !self.catalog.has_coordinates() {
            return Err(PreconditionError::NoCoordinates.into());
        }

        let detections = self.detect_pages(pages)?;
        let by_page = coordinates_by_page(&detections, &self.catalog.coordinates_by_page_type());

        let extractor =
            CoordinateExtractor::new(self.reader).with_config(self.config.detection.clone());
        let extracted_data = extractor.extract_from_document_images(pages, &by_page);

        info!("Extracted {} fields", extracted_data.len());
        Ok(ProvisionalExtraction {
            detections,
            extracted_data,
        })
    }

    /// Comparison half of the pipeline, sharing this pipeline's catalog and settings.
    pub fn reconciler(&self) -> Reconciler<'a> {
        Reconciler::new(self.catalog).with_config(self.config.comparison.clone())
    }

    /// Compare a provisional document's fields with one commercial document.
    pub fn compare_documents(
        &self,
        commercial: &FieldMap,
        provisional: &FieldMap,
    ) -> Result<ComparisonResult> {
        self.reconciler().compare_documents(commercial, provisional)
    }

    /// Compare a provisional document with every commercial document, in input order.
    pub fn compare_with_all<K: Clone>(
        &self,
        provisional: &FieldMap,
        commercials: &[(K, FieldMap)],
    ) -> Result<Vec<(K, ComparisonResult)>> {
        self.reconciler().compare_with_all(provisional, commercials)
    }
}

/// Compares field maps against the catalog's attributes. Needs no OCR.
pub struct Reconciler<'a> {
    catalog: &'a Catalog,
    config: ComparisonConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            config: ComparisonConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ComparisonConfig) -> Self {
        self.config = config;
        self
    }

    fn comparator(&self) -> Result<DocumentComparator> {
        if self.catalog.attributes.is_empty() {
            return Err(PreconditionError::NoAttributes.into());
        }
        Ok(DocumentComparator::new(self.config.clone()))
    }

    pub fn compare_documents(
        &self,
        commercial: &FieldMap,
        provisional: &FieldMap,
    ) -> Result<ComparisonResult> {
        Ok(self
            .comparator()?
            .compare(commercial, provisional, &self.catalog.attributes))
    }

    pub fn compare_with_all<K: Clone>(
        &self,
        provisional: &FieldMap,
        commercials: &[(K, FieldMap)],
    ) -> Result<Vec<(K, ComparisonResult)>> {
        let comparator = self.comparator()?;
        if commercials.is_empty() {
            return Err(PreconditionError::NoCommercialDocuments.into());
        }
        Ok(comparator.compare_against_all(provisional, commercials, &self.catalog.attributes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DespaError;
    use crate::models::catalog::{ConfigurableAttribute, Rect};
    use crate::models::comparison::ComparisonStatus;
    use crate::testing::{marked_page, ScriptedReader};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CATALOG: &str = r##"{
        "page_types": [
            {
                "id": 4,
                "name": "annex",
                "rules": [
                    {"id": 40, "field_name": "annex", "x1": 0, "y1": 0, "x2": 100, "y2": 20,
                     "expected_value": "ANEXO"}
                ],
                "coordinates": [
                    {"id": 400, "label": "note", "x1": 0, "y1": 60, "x2": 200, "y2": 80}
                ]
            },
            {
                "id": 1,
                "name": "cover",
                "display_name": "Caratula",
                "rules": [
                    {"id": 10, "field_name": "title", "x1": 0, "y1": 0, "x2": 100, "y2": 20,
                     "expected_value": "DECLARACION", "priority": 2},
                    {"id": 11, "field_name": "customs_id", "x1": 100, "y1": 0, "x2": 200, "y2": 20,
                     "expected_value": null, "priority": 1}
                ],
                "coordinates": [
                    {"id": 100, "label": "declaration_number", "x1": 100, "y1": 0, "x2": 200, "y2": 20},
                    {"id": 101, "label": "importer", "x1": 0, "y1": 20, "x2": 200, "y2": 40},
                    {"id": 102, "label": "fob_total", "x1": 0, "y1": 40, "x2": 100, "y2": 60,
                     "data_type": "number"}
                ]
            }
        ],
        "attributes": [
            {"id": 1, "name": "Importer", "key": "importer", "required": true},
            {"id": 2, "name": "FOB total", "key": "fob_total", "required": true,
             "validation_rules": {"type": "numeric", "tolerance": 0.5}}
        ]
    }"##;

    fn catalog() -> Catalog {
        Catalog::from_json(CATALOG).unwrap()
    }

    fn cover_reader() -> ScriptedReader {
        ScriptedReader::new()
            .with(1, Rect::new(0, 0, 100, 20), "DECLARACION")
            .with(1, Rect::new(100, 0, 200, 20), "24001IC04000123X")
            .with(1, Rect::new(0, 20, 200, 40), "ACME S.A.")
            .with(1, Rect::new(0, 40, 100, 60), "1234.80")
    }

    #[test]
    fn test_cover_page_end_to_end() {
        let catalog = catalog();
        let reader = cover_reader();
        let pipeline = Pipeline::new(&reader, &catalog);

        let result = pipeline.extract_provisional(&[marked_page(1, 1)]).unwrap();

        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].page_type_name.as_deref(), Some("cover"));
        assert_eq!(result.detections[0].detection_boxes.len(), 2);

        let keys: Vec<&str> = result.extracted_data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["declaration_number", "fob_total", "importer"]);
        assert_eq!(result.extracted_data["declaration_number"], "24001IC04000123X");
    }

    #[test]
    fn test_undetected_pages_contribute_nothing() {
        let catalog = catalog();
        let reader = cover_reader();
        let pipeline = Pipeline::new(&reader, &catalog);

        let result = pipeline
            .extract_provisional(&[marked_page(1, 1), marked_page(2, 50)])
            .unwrap();

        assert!(!result.detections[1].is_detected());
        assert_eq!(result.extracted_data.len(), 3);
    }

    #[test]
    fn test_extract_then_compare() {
        let catalog = catalog();
        let reader = cover_reader();
        let pipeline = Pipeline::new(&reader, &catalog);

        let extraction = pipeline.extract_provisional(&[marked_page(1, 1)]).unwrap();
        let provisional = FieldMap::from(extraction.extracted_data);
        let commercial: FieldMap =
            serde_json::from_value(json!({"importer": "Acme S.A.", "fob_total": 1234.5})).unwrap();

        let result = pipeline.compare_documents(&commercial, &provisional).unwrap();

        assert_eq!(result.matches, 2);
        assert_eq!(result.status, ComparisonStatus::Approved);
    }

    #[test]
    fn test_preconditions() {
        let catalog = catalog();
        let reader = ScriptedReader::new();
        let pipeline = Pipeline::new(&reader, &catalog);

        assert!(matches!(
            pipeline.detect_pages(&[]),
            Err(DespaError::Precondition(PreconditionError::NoImages))
        ));

        let empty = Catalog::default();
        let bare = Pipeline::new(&reader, &empty);
        let page = [marked_page(1, 1)];
        assert!(matches!(
            bare.detect_pages(&page),
            Err(DespaError::Precondition(PreconditionError::NoDetectionRules))
        ));
        assert!(matches!(
            bare.extract_provisional(&page),
            Err(DespaError::Precondition(PreconditionError::NoCoordinates))
        ));
        assert!(matches!(
            bare.compare_documents(&FieldMap::new(), &FieldMap::new()),
            Err(DespaError::Precondition(PreconditionError::NoAttributes))
        ));

        let no_commercials: [(String, FieldMap); 0] = [];
        assert!(matches!(
            pipeline.compare_with_all(&FieldMap::new(), &no_commercials),
            Err(DespaError::Precondition(PreconditionError::NoCommercialDocuments))
        ));
    }

    #[test]
    fn test_compare_with_all() {
        let mut catalog = catalog();
        catalog.attributes = vec![ConfigurableAttribute::new("Importer", "importer").required()];
        let reader = ScriptedReader::new();
        let pipeline = Pipeline::new(&reader, &catalog);

        let provisional: FieldMap = serde_json::from_value(json!({"importer": "ACME"})).unwrap();
        let commercials = vec![
            (7, serde_json::from_value(json!({"importer": "acme"})).unwrap()),
            (3, FieldMap::new()),
        ];

        let results = pipeline.compare_with_all(&provisional, &commercials).unwrap();

        assert_eq!(results[0].0, 7);
        assert_eq!(results[0].1.status, ComparisonStatus::Approved);
        assert_eq!(results[1].0, 3);
        assert_eq!(results[1].1.status, ComparisonStatus::Rejected);
    }

    #[test]
    fn test_reconciler_uses_comparison_settings() {
        let catalog = catalog();
        let strict = Reconciler::new(&catalog).with_config(ComparisonConfig {
            similarity_threshold: 1.0,
            ..ComparisonConfig::default()
        });

        let commercial: FieldMap =
            serde_json::from_value(json!({"importer": "ACME SA", "fob_total": "10"})).unwrap();
        let provisional: FieldMap =
            serde_json::from_value(json!({"importer": "ACME S.A.", "fob_total": "10"})).unwrap();

        let relaxed = Reconciler::new(&catalog)
            .compare_documents(&commercial, &provisional)
            .unwrap();
        let result = strict.compare_documents(&commercial, &provisional).unwrap();

        assert_eq!(relaxed.status, ComparisonStatus::Approved);
        assert_eq!(result.status, ComparisonStatus::Rejected);
    }
}
