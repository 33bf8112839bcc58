//! Coordinate-based field extraction.
//!
//! Once a page's type is known, every field coordinate of that type is read
//! from the page. Values from all pages are merged into one flat map; a label
//! seen on an earlier page is stored again as `"{label}_p{page}"`.

use std::collections::BTreeMap;

use image::DynamicImage;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::detection::PageDetection;
use crate::models::catalog::FieldCoordinate;
use crate::models::config::DetectionConfig;
use crate::models::page::PageImage;
use crate::ocr::RegionReader;

/// Flat label -> text map produced by extraction.
pub type ExtractedFields = BTreeMap<String, String>;

/// Reads field coordinates from page images.
pub struct CoordinateExtractor<'a, R: RegionReader + ?Sized> {
    reader: &'a R,
    config: DetectionConfig,
}

impl<'a, R: RegionReader + ?Sized> CoordinateExtractor<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self {
            reader,
            config: DetectionConfig::default(),
        }
    }

    /// Use the page fan-out settings of `config`.
    pub fn with_config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Read every coordinate of one decoded page. A repeated label keeps its last value.
    pub fn extract_from_coordinates(
        &self,
        image: &DynamicImage,
        coordinates: &[FieldCoordinate],
    ) -> ExtractedFields {
        let mut fields = ExtractedFields::new();

        for coordinate in coordinates {
            let value = if coordinate.region.is_valid() {
                self.reader
                    .read_region(image, coordinate.region, coordinate.data_type)
            } else {
                warn!(
                    "Invalid coordinates for '{}': {:?}",
                    coordinate.label, coordinate.region
                );
                String::new()
            };

            debug!(
                "Extracted '{}' ({}): {:?}",
                coordinate.label,
                coordinate.data_type.as_str(),
                value
            );
            fields.insert(coordinate.label.clone(), value);
        }

        fields
    }

    /// Decode a page and read its coordinates. Undecodable pages read as empty values.
    pub fn extract_from_page(
        &self,
        page: &PageImage,
        coordinates: &[FieldCoordinate],
    ) -> ExtractedFields {
        match page.decode() {
            Ok(image) => self.extract_from_coordinates(&image, coordinates),
            Err(e) => {
                warn!("Page {}: failed to decode image: {}", page.page_number, e);
                coordinates
                    .iter()
                    .map(|c| (c.label.clone(), String::new()))
                    .collect()
            }
        }
    }

    /// Extract and merge the fields of every page that has coordinates.
    pub fn extract_from_document_images(
        &self,
        pages: &[PageImage],
        coordinates_by_page: &BTreeMap<u32, Vec<FieldCoordinate>>,
    ) -> ExtractedFields {
        let mut work: Vec<(&PageImage, &[FieldCoordinate])> = pages
            .iter()
            .filter_map(|page| match coordinates_by_page.get(&page.page_number) {
                Some(coordinates) => Some((page, coordinates.as_slice())),
                None => {
                    debug!("No coordinates for page {}", page.page_number);
                    None
                }
            })
            .collect();
        work.sort_by_key(|(page, _)| page.page_number);

        let extract = |(page, coordinates): &(&PageImage, &[FieldCoordinate])| {
            (page.page_number, self.extract_from_page(page, coordinates))
        };
        let per_page: Vec<(u32, ExtractedFields)> = if self.config.should_parallelize(work.len()) {
            work.par_iter().map(extract).collect()
        } else {
            work.iter().map(extract).collect()
        };

        let mut merged = ExtractedFields::new();
        for (page_number, fields) in per_page {
            for (label, value) in fields {
                if merged.contains_key(&label) {
                    merged.insert(format!("{}_p{}", label, page_number), value);
                } else {
                    merged.insert(label, value);
                }
            }
        }

        merged
    }
}

/// Map each detected page to the coordinates of its page type.
///
/// Undetected pages, and pages whose type has no coordinates, map to an empty list.
pub fn coordinates_by_page(
    detections: &[PageDetection],
    coordinates_by_type: &BTreeMap<i64, Vec<FieldCoordinate>>,
) -> BTreeMap<u32, Vec<FieldCoordinate>> {
    detections
        .iter()
        .map(|detection| {
            let coordinates = detection
                .page_type_id
                .and_then(|id| coordinates_by_type.get(&id))
                .cloned()
                .unwrap_or_default();
            (detection.page_number, coordinates)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::{DataType, PageType, Rect};
    use crate::testing::{broken_page, marked_page, ScriptedReader};
    use pretty_assertions::assert_eq;

    fn coordinate(label: &str, rect: Rect) -> FieldCoordinate {
        FieldCoordinate {
            id: 0,
            label: label.to_string(),
            region: rect,
            data_type: DataType::Text,
            description: None,
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> ExtractedFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_cross_page_merge() {
        let rect = Rect::new(0, 0, 50, 20);
        let reader = ScriptedReader::new()
            .with(1, rect, "first")
            .with(2, rect, "second");
        let extractor = CoordinateExtractor::new(&reader);

        let mut by_page = BTreeMap::new();
        by_page.insert(1, vec![coordinate("consignee", rect)]);
        by_page.insert(2, vec![coordinate("consignee", rect)]);

        let merged = extractor
            .extract_from_document_images(&[marked_page(2, 2), marked_page(1, 1)], &by_page);

        assert_eq!(merged, fields(&[("consignee", "first"), ("consignee_p2", "second")]));
    }

    #[test]
    fn test_pages_without_coordinates_skipped() {
        let rect = Rect::new(0, 0, 50, 20);
        let reader = ScriptedReader::new().with(1, rect, "a").with(3, rect, "c");
        let extractor = CoordinateExtractor::new(&reader);

        let mut by_page = BTreeMap::new();
        by_page.insert(3, vec![coordinate("total", rect)]);
        by_page.insert(2, Vec::new());

        let merged = extractor.extract_from_document_images(
            &[marked_page(1, 1), marked_page(2, 2), marked_page(3, 3)],
            &by_page,
        );

        assert_eq!(merged, fields(&[("total", "c")]));
        assert_eq!(reader.calls(), 1);
    }

    #[test]
    fn test_repeated_label_on_one_page_keeps_last() {
        let a = Rect::new(0, 0, 50, 20);
        let b = Rect::new(0, 20, 50, 40);
        let reader = ScriptedReader::new().with(1, a, "old").with(1, b, "new");
        let extractor = CoordinateExtractor::new(&reader);
        let image = marked_page(1, 1).decode().unwrap();

        let result =
            extractor.extract_from_coordinates(&image, &[coordinate("x", a), coordinate("x", b)]);

        assert_eq!(result, fields(&[("x", "new")]));
    }

    #[test]
    fn test_invalid_coordinate_reads_empty() {
        let reader = ScriptedReader::new();
        let extractor = CoordinateExtractor::new(&reader);
        let image = marked_page(1, 1).decode().unwrap();

        let bad = [coordinate("bad", Rect::new(50, 0, 10, 20))];
        let result = extractor.extract_from_coordinates(&image, &bad);

        assert_eq!(result, fields(&[("bad", "")]));
        assert_eq!(reader.calls(), 0);
    }

    #[test]
    fn test_broken_page_reads_empty_values() {
        let rect = Rect::new(0, 0, 50, 20);
        let reader = ScriptedReader::new();
        let extractor = CoordinateExtractor::new(&reader);

        let mut by_page = BTreeMap::new();
        by_page.insert(1, vec![coordinate("a", rect), coordinate("b", rect)]);

        let merged = extractor.extract_from_document_images(&[broken_page(1)], &by_page);
        assert_eq!(merged, fields(&[("a", ""), ("b", "")]));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let rect = Rect::new(0, 0, 50, 20);
        let mut reader = ScriptedReader::new();
        let mut by_page = BTreeMap::new();
        let mut pages = Vec::new();
        for n in 1..=6u32 {
            reader = reader.with(n as u8, rect, &format!("value {}", n));
            by_page.insert(n, vec![coordinate("line", rect)]);
            pages.push(marked_page(n, n as u8));
        }

        let parallel =
            CoordinateExtractor::new(&reader).extract_from_document_images(&pages, &by_page);
        let sequential = CoordinateExtractor::new(&reader)
            .with_config(DetectionConfig {
                parallel: false,
                ..DetectionConfig::default()
            })
            .extract_from_document_images(&pages, &by_page);

        assert_eq!(parallel, sequential);
        assert_eq!(parallel.get("line").map(String::as_str), Some("value 1"));
        assert_eq!(parallel.get("line_p6").map(String::as_str), Some("value 6"));
    }

    #[test]
    fn test_coordinates_by_page() {
        let page_type = PageType {
            id: 2,
            name: "cover".to_string(),
            display_name: String::new(),
            description: None,
            color: "#007bff".to_string(),
            rules: Vec::new(),
            coordinates: Vec::new(),
        };
        let detections = vec![
            PageDetection::detected(1, &page_type, Vec::new()),
            PageDetection::undetected(2),
        ];
        let mut by_type = BTreeMap::new();
        by_type.insert(2, vec![coordinate("total", Rect::new(0, 0, 10, 10))]);

        let by_page = coordinates_by_page(&detections, &by_type);

        assert_eq!(by_page.len(), 2);
        assert_eq!(by_page[&1].len(), 1);
        assert!(by_page[&2].is_empty());
    }
}
