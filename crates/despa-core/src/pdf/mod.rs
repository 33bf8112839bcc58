//! PDF processing module.
//!
//! Provisional declarations arrive as scanned PDFs with one embedded image per
//! page. Commercial documents are usually text PDFs.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;
use crate::models::page::PageImage;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Trait for PDF processing implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract the text layer of the entire PDF.
    fn extract_text(&self) -> Result<String>;

    /// The scanned image of a page (1-based).
    fn page_image(&self, page: u32) -> Result<DynamicImage>;

    /// Every page that carries an image, encoded as PNG. `max_pages == 0` means all.
    fn page_images(&self, max_pages: usize) -> Result<Vec<PageImage>>;
}
