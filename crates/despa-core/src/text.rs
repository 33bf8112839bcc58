//! Plain-text extraction for commercial documents.
//!
//! PDFs are read through their text layer. Scanned PDFs, whose layer is empty
//! or nearly so, are OCR'd page by page instead; when OCR yields nothing the
//! short layer is kept. PNG and JPEG files are OCR'd directly.

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::error::{DespaError, OcrError, PdfError, Result};
use crate::ocr::Recognizer;
use crate::pdf::{PdfExtractor, PdfProcessor};

/// Text-layer length below which a PDF is treated as scanned.
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 100;

/// Extracts the full text of a document file.
pub struct TextExtractor<'a, R: Recognizer + ?Sized> {
    recognizer: Option<&'a R>,
    min_text_length: usize,
    layer_only: bool,
}

impl<'a, R: Recognizer + ?Sized> TextExtractor<'a, R> {
    /// `recognizer` is only needed for images and scanned PDFs.
    pub fn new(recognizer: Option<&'a R>) -> Self {
        Self {
            recognizer,
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            layer_only: false,
        }
    }

    pub fn with_min_text_length(mut self, min_text_length: usize) -> Self {
        self.min_text_length = min_text_length;
        self
    }

    /// Never OCR a PDF: return its text layer however short it is.
    pub fn text_layer_only(mut self) -> Self {
        self.layer_only = true;
        self
    }

    /// Extract text according to the file extension (`pdf`, `png`, `jpg`, `jpeg`).
    pub fn extract_text(&self, data: &[u8], extension: &str) -> Result<String> {
        let extension = extension.trim_start_matches('.').to_lowercase();

        match extension.as_str() {
            "pdf" => self.extract_pdf_text(data),
            "png" | "jpg" | "jpeg" => {
                let image = image::load_from_memory(data)?;
                Ok(self.recognize(&image)?.trim().to_string())
            }
            _ => Err(DespaError::UnsupportedFormat(extension)),
        }
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let recognizer = self.recognizer.ok_or(OcrError::Unavailable)?;
        Ok(recognizer.recognize(image)?.text)
    }

    fn extract_pdf_text(&self, data: &[u8]) -> Result<String> {
        let pdf = PdfExtractor::from_bytes(data)?;

        let text = pdf.extract_text().unwrap_or_else(|e| {
            warn!("Text layer extraction failed: {}", e);
            String::new()
        });
        let text = text.trim();

        if text.chars().count() >= self.min_text_length {
            debug!("Using PDF text layer ({} chars)", text.len());
            return Ok(text.to_string());
        }

        if self.layer_only {
            if text.is_empty() {
                return Err(PdfError::NoTextLayer.into());
            }
            debug!("Using short PDF text layer ({} chars)", text.len());
            return Ok(text.to_string());
        }

        if self.recognizer.is_none() {
            if text.is_empty() {
                return Err(OcrError::Unavailable.into());
            }
            warn!("No OCR engine, keeping the short PDF text layer");
            return Ok(text.to_string());
        }

        info!(
            "PDF text layer has {} chars, falling back to OCR",
            text.chars().count()
        );
        let pages = self.ocr_pdf_pages(&pdf);
        if !text.is_empty() && pages.iter().all(|(_, page)| page.trim().is_empty()) {
            warn!("OCR found no text, keeping the PDF text layer");
            return Ok(text.to_string());
        }

        Ok(join_pages(&pages))
    }

    fn ocr_pdf_pages(&self, pdf: &PdfExtractor) -> Vec<(u32, String)> {
        let mut pages = Vec::new();

        for page in 1..=pdf.page_count() {
            let page_text = match pdf.page_image(page) {
                Ok(image) => self.recognize(&image).unwrap_or_else(|e| {
                    warn!("OCR failed on page {}: {}", page, e);
                    String::new()
                }),
                Err(e) => {
                    warn!("No image for page {}: {}", page, e);
                    String::new()
                }
            };
            pages.push((page, page_text));
        }

        pages
    }
}

/// Join per-page OCR text with `--- Page N ---` markers.
pub fn join_pages(pages: &[(u32, String)]) -> String {
    pages
        .iter()
        .map(|(number, text)| format!("--- Page {} ---\n{}", number, text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrResult;
    use image::{ImageFormat, RgbImage};
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    struct FixedText(&'static str);

    impl Recognizer for FixedText {
        fn recognize(&self, image: &DynamicImage) -> std::result::Result<OcrResult, OcrError> {
            Ok(OcrResult {
                boxes: Vec::new(),
                text: self.0.to_string(),
                image_size: (image.width(), image.height()),
            })
        }
    }

    fn png_bytes() -> Vec<u8> {
        let mut data = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(8, 8))
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        data
    }

    /// One-page PDF with `text` in its text layer and no images.
    fn text_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_short_layer_kept_without_recognizer() {
        let extractor: TextExtractor<'_, FixedText> = TextExtractor::new(None);

        let text = extractor
            .extract_text(&text_pdf("INVOICE 0001 TOTAL 10"), "pdf")
            .unwrap();
        assert!(text.contains("INVOICE 0001 TOTAL 10"));
        assert!(!text.contains("--- Page"));
    }

    #[test]
    fn test_short_layer_kept_when_ocr_finds_nothing() {
        let recognizer = FixedText("should not be used");
        let extractor = TextExtractor::new(Some(&recognizer));

        // No page images, so every OCR page is empty
        let text = extractor
            .extract_text(&text_pdf("INVOICE 0001 TOTAL 10"), "pdf")
            .unwrap();
        assert!(text.contains("INVOICE 0001 TOTAL 10"));
    }

    #[test]
    fn test_layer_only_returns_short_layer() {
        let recognizer = FixedText("OCR TEXT");
        let extractor = TextExtractor::new(Some(&recognizer)).text_layer_only();

        let text = extractor
            .extract_text(&text_pdf("INVOICE 0001 TOTAL 10"), "pdf")
            .unwrap();
        assert!(text.contains("INVOICE 0001 TOTAL 10"));
        assert!(!text.contains("OCR TEXT"));
    }

    #[test]
    fn test_layer_only_without_layer() {
        let extractor: TextExtractor<'_, FixedText> = TextExtractor::new(None).text_layer_only();

        assert!(matches!(
            extractor.extract_text(&text_pdf(""), "pdf"),
            Err(DespaError::Pdf(PdfError::NoTextLayer))
        ));
    }

    #[test]
    fn test_scanned_pdf_without_recognizer() {
        let extractor: TextExtractor<'_, FixedText> = TextExtractor::new(None);

        assert!(matches!(
            extractor.extract_text(&text_pdf(""), "pdf"),
            Err(DespaError::Ocr(OcrError::Unavailable))
        ));
    }

    #[test]
    fn test_image_is_ocrd() {
        let recognizer = FixedText("  INVOICE 0001\nTotal 10  ");
        let extractor = TextExtractor::new(Some(&recognizer));

        let text = extractor.extract_text(&png_bytes(), ".PNG").unwrap();
        assert_eq!(text, "INVOICE 0001\nTotal 10");
    }

    #[test]
    fn test_unsupported_extension() {
        let recognizer = FixedText("");
        let extractor = TextExtractor::new(Some(&recognizer));

        let err = extractor.extract_text(b"a,b", "csv").unwrap_err();
        assert!(matches!(err, DespaError::UnsupportedFormat(ext) if ext == "csv"));
    }

    #[test]
    fn test_image_without_recognizer() {
        let extractor: TextExtractor<'_, FixedText> = TextExtractor::new(None);

        let err = extractor.extract_text(&png_bytes(), "jpg").unwrap_err();
        assert!(matches!(err, DespaError::Ocr(OcrError::Unavailable)));
    }

    #[test]
    fn test_broken_pdf() {
        let extractor: TextExtractor<'_, FixedText> = TextExtractor::new(None);
        assert!(matches!(
            extractor.extract_text(b"%PDF-garbage", "pdf"),
            Err(DespaError::Pdf(_))
        ));
    }

    #[test]
    fn test_join_pages() {
        let joined = join_pages(&[(1, "first\n".to_string()), (2, String::new())]);
        assert_eq!(joined, "--- Page 1 ---\nfirst\n\n--- Page 2 ---\n");
    }
}
