//! PDF text and page-image extraction using lopdf and pdf-extract.

use image::{DynamicImage, GrayImage, ImageBuffer, Rgb};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::{PdfProcessor, Result};
use crate::error::PdfError;
use crate::models::page::PageImage;

/// PDF content extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }

    /// Create an extractor and load `data` into it.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut extractor = Self::new();
        extractor.load(data)?;
        Ok(extractor)
    }

    fn document(&self) -> Result<&Document> {
        self.document
            .as_ref()
            .ok_or_else(|| PdfError::Parse("No document loaded".to_string()))
    }

    /// Images referenced from a page's own XObject resources.
    fn page_xobject_images(&self, doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
        let mut images = Vec::new();

        let Some(resources) = page_resources(doc, page_id) else {
            return images;
        };
        let Ok(xobjects) = resources.get(b"XObject") else {
            return images;
        };
        if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
            for (_name, obj_ref) in xobj_dict.iter() {
                if let Ok((_, obj)) = doc.dereference(obj_ref) {
                    if let Some(img) = decode_image_object(doc, obj) {
                        images.push(img);
                    }
                }
            }
        }

        images
    }

    /// Every decodable image object in the document, in object-id order.
    fn document_images(&self, doc: &Document) -> Vec<DynamicImage> {
        let images: Vec<DynamicImage> = doc
            .objects
            .values()
            .filter_map(|object| decode_image_object(doc, object))
            .collect();

        debug!("Found {} images in document", images.len());
        images
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        self.document()?;
        pdf_extract::extract_text_from_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }

    fn page_image(&self, page: u32) -> Result<DynamicImage> {
        let doc = self.document()?;
        let pages = doc.get_pages();
        let page_id = pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        if let Some(first) = self.page_xobject_images(doc, *page_id).into_iter().next() {
            return Ok(first);
        }

        // Some producers hang the scans off shared resources; fall back to the
        // n-th image of the whole document.
        trace!("No XObject image on page {}, scanning all objects", page);
        self.document_images(doc)
            .into_iter()
            .nth((page - 1) as usize)
            .ok_or_else(|| PdfError::ImageExtraction(format!("no image found for page {}", page)))
    }

    fn page_images(&self, max_pages: usize) -> Result<Vec<PageImage>> {
        let mut page_count = self.page_count();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }
        if max_pages > 0 {
            page_count = page_count.min(max_pages as u32);
        }

        let mut images = Vec::with_capacity(page_count as usize);
        for page in 1..=page_count {
            match self.page_image(page) {
                Ok(image) => {
                    let encoded = PageImage::from_image(page, &image)
                        .map_err(|e| PdfError::ImageExtraction(e.to_string()))?;
                    images.push(encoded);
                }
                Err(e) => warn!("Skipping page {}: {}", page, e),
            }
        }

        debug!("Extracted {} page images", images.len());
        Ok(images)
    }
}

/// Resources dictionary for a page, following `Parent` inheritance.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
            return Some(res_dict.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_resources(doc, *parent_id),
        _ => None,
    }
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )
                .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter {:?}", filter_name.map(String::from_utf8_lossy));
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    // Image masks are 1-bit stencils without a color space
    let is_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let color_space: &[u8] = if is_mask { b"DeviceGray" } else { color_space };

    image_from_raw(&data, width, height, color_space, bits)
}

fn image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: i64,
) -> Option<DynamicImage> {
    let pixels = (width as usize) * (height as usize);

    match (color_space, bits_per_component) {
        (b"DeviceRGB" | b"RGB", 8) if data.len() >= pixels * 3 => {
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data[..pixels * 3].to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        (b"DeviceGray" | b"G", 8) if data.len() >= pixels => {
            GrayImage::from_raw(width, height, data[..pixels].to_vec())
                .map(DynamicImage::ImageLuma8)
        }
        (b"DeviceGray" | b"G", 1) => {
            // Rows are padded to whole bytes
            let row_bytes = (width as usize).div_ceil(8);
            if data.len() < row_bytes * height as usize {
                return None;
            }
            let mut luma = Vec::with_capacity(pixels);
            for row in data.chunks(row_bytes).take(height as usize) {
                for x in 0..width as usize {
                    let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
                    luma.push(if bit == 1 { 255 } else { 0 });
                }
            }
            GrayImage::from_raw(width, height, luma).map(DynamicImage::ImageLuma8)
        }
        _ => {
            trace!(
                "Could not decode image: colorspace={:?}, bits={}, data_len={}",
                String::from_utf8_lossy(color_space),
                bits_per_component,
                data.len()
            );
            None
        }
    }
}
