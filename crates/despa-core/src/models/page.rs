//! Page images handed to the detection and extraction engines.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::Result;

/// One encoded page image of a document. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub page_number: u32,
    /// Encoded image bytes (PNG, JPEG, ...).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PageImage {
    /// Wrap encoded bytes, reading the dimensions from the image header.
    pub fn new(page_number: u32, data: Vec<u8>) -> Result<Self> {
        let (width, height) = ImageReader::new(Cursor::new(&data))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Self {
            page_number,
            data,
            width,
            height,
        })
    }

    /// Encode a decoded image as PNG.
    pub fn from_image(page_number: u32, image: &DynamicImage) -> Result<Self> {
        let mut data = Vec::new();
        image.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)?;
        Ok(Self {
            page_number,
            data,
            width: image.width(),
            height: image.height(),
        })
    }

    pub fn from_file(page_number: u32, path: &Path) -> Result<Self> {
        Self::new(page_number, std::fs::read(path)?)
    }

    pub fn decode(&self) -> Result<DynamicImage> {
        Ok(image::load_from_memory(&self.data)?)
    }
}
