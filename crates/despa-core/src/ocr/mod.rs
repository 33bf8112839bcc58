//! OCR over page regions.
//!
//! A [`Recognizer`] turns a whole image into text boxes. [`OcrRegionReader`]
//! builds the region-level API the engines use on top of it: crop, grayscale,
//! recognize, filter by data type.

mod region;

#[cfg(feature = "native")]
mod pure_engine;

pub use region::OcrRegionReader;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrRecognizer;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::models::catalog::{DataType, Rect};

/// A detected text box with its coordinates and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Result of OCR processing on an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// Detected and recognized text boxes.
    pub boxes: Vec<TextBox>,

    /// Full text (boxes joined with newlines).
    pub text: String,

    /// Image dimensions (width, height).
    pub image_size: (u32, u32),
}

impl OcrResult {
    /// Create an empty result.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            boxes: Vec::new(),
            text: String::new(),
            image_size: (width, height),
        }
    }

    /// Build a result from unordered boxes, sorting them into reading order.
    pub fn from_boxes(boxes: Vec<TextBox>, image_size: (u32, u32)) -> Self {
        let mut result = Self {
            boxes,
            text: String::new(),
            image_size,
        };
        result.sort_by_reading_order();
        result
    }

    /// Sort boxes by reading order (top-to-bottom, left-to-right).
    pub fn sort_by_reading_order(&mut self) {
        self.boxes.sort_by(|a, b| {
            let (ax, ay, _, _) = a.rect();
            let (bx, by, _, _) = b.rect();

            // Boxes within the same 20px band share a row
            let row_a = (ay / 20.0) as i32;
            let row_b = (by / 20.0) as i32;

            row_a
                .cmp(&row_b)
                .then_with(|| ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
        });

        self.text = self
            .boxes
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
    }
}

/// Every OCR backend implements this.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError>;
}

impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        (**self).recognize(image)
    }
}

/// Character set a region read is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Everything, lines joined with newlines.
    FreeText,
    /// Digits and `.,-`.
    Digits,
    /// Digits and `/-`.
    DateChars,
}

impl RecognitionMode {
    pub fn allows(&self, c: char) -> bool {
        match self {
            Self::FreeText => true,
            Self::Digits => c.is_ascii_digit() || matches!(c, '.' | ',' | '-'),
            Self::DateChars => c.is_ascii_digit() || matches!(c, '/' | '-'),
        }
    }

    /// Drop characters outside the mode's set and trim.
    pub fn filter(&self, text: &str) -> String {
        match self {
            Self::FreeText => text.trim().to_string(),
            _ => text.chars().filter(|c| self.allows(*c)).collect(),
        }
    }
}

impl From<DataType> for RecognitionMode {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::Text => Self::FreeText,
            DataType::Number => Self::Digits,
            DataType::Date => Self::DateChars,
        }
    }
}

/// Reads the text inside one rectangle of a page image.
///
/// Never fails: unusable rectangles and recognition errors read as `""`.
pub trait RegionReader: Send + Sync {
    fn read_region(&self, image: &DynamicImage, rect: Rect, data_type: DataType) -> String;
}
