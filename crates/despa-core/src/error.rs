//! Error types for the despa-core library.
//!
//! Region reads, rule checks and value comparisons never produce these: they
//! degrade to an empty read or a non-match. Only document-level failures and
//! I/O surface as errors.

use thiserror::Error;

/// Main error type for the despa library.
#[derive(Error, Debug)]
pub enum DespaError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// A document-level precondition was not met.
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration or field map.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The input file type cannot be processed.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// A text-only read of a PDF that carries no text layer.
    #[error("PDF has no text layer")]
    NoTextLayer,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// No recognizer was configured for an operation that needs one.
    #[error("no OCR engine available")]
    Unavailable,
}

/// Caller-level failures that the API layer reports as "not found" or
/// "precondition failed".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// The document has no page images.
    #[error("document has no page images")]
    NoImages,

    /// No page type has any detection rule.
    #[error("no detection rules configured")]
    NoDetectionRules,

    /// No field coordinates are configured for any page type.
    #[error("no extraction coordinates configured")]
    NoCoordinates,

    /// No configurable attributes to compare.
    #[error("no comparable attributes configured")]
    NoAttributes,

    /// Nothing to compare the provisional document against.
    #[error("no commercial documents to compare against")]
    NoCommercialDocuments,
}

/// Result type for the despa library.
pub type Result<T> = std::result::Result<T, DespaError>;
