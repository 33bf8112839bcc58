//! Test doubles shared by the engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, GenericImageView, GrayImage, Luma};

use crate::models::catalog::{DataType, Rect};
use crate::models::page::PageImage;
use crate::error::OcrError;
use crate::ocr::{OcrResult, Recognizer, RegionReader};

/// Region reader that answers from a table keyed by page marker and rectangle.
///
/// Test pages are filled with a single gray level (the marker) so the reader
/// can tell them apart after a PNG round trip.
#[derive(Default)]
pub(crate) struct ScriptedReader {
    reads: HashMap<(u8, Rect), String>,
    calls: AtomicUsize,
}

impl ScriptedReader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, marker: u8, rect: Rect, text: &str) -> Self {
        self.reads.insert((marker, rect), text.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RegionReader for ScriptedReader {
    fn read_region(&self, image: &DynamicImage, rect: Rect, _data_type: DataType) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !rect.is_valid() {
            return String::new();
        }
        let marker = image.get_pixel(0, 0)[0];
        self.reads.get(&(marker, rect)).cloned().unwrap_or_default()
    }
}

/// A 200x100 page filled with `marker`.
pub(crate) fn marked_page(page_number: u32, marker: u8) -> PageImage {
    let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 100, Luma([marker])));
    PageImage::from_image(page_number, &image).unwrap()
}

/// A page whose bytes are not an image.
pub(crate) fn broken_page(page_number: u32) -> PageImage {
    PageImage {
        page_number,
        data: b"not an image".to_vec(),
        width: 0,
        height: 0,
    }
}

/// Recognizer that reads the same text from every image.
pub(crate) struct FixedRecognizer {
    text: String,
}

impl FixedRecognizer {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl Recognizer for FixedRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        Ok(OcrResult {
            boxes: Vec::new(),
            text: self.text.clone(),
            image_size: (image.width(), image.height()),
        })
    }
}
