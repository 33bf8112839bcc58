use image::DynamicImage;
use tracing::{trace, warn};

use crate::models::catalog::{DataType, Rect};
use crate::models::config::OcrConfig;

use super::{RecognitionMode, Recognizer, RegionReader};

/// [`RegionReader`] backed by a whole-image [`Recognizer`].
pub struct OcrRegionReader<R> {
    recognizer: R,
    grayscale: bool,
}

impl<R: Recognizer> OcrRegionReader<R> {
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            grayscale: true,
        }
    }

    pub fn with_config(mut self, config: &OcrConfig) -> Self {
        self.grayscale = config.grayscale;
        self
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    fn crop(&self, image: &DynamicImage, rect: Rect) -> Option<DynamicImage> {
        let Some(clamped) = rect.clamp_to(image.width(), image.height()) else {
            warn!(
                "Region ({}, {})-({}, {}) lies outside the {}x{} image",
                rect.x1,
                rect.y1,
                rect.x2,
                rect.y2,
                image.width(),
                image.height()
            );
            return None;
        };

        let crop = image.crop_imm(clamped.x1, clamped.y1, clamped.width(), clamped.height());
        Some(if self.grayscale {
            DynamicImage::ImageLuma8(crop.to_luma8())
        } else {
            crop
        })
    }
}

impl<R: Recognizer> RegionReader for OcrRegionReader<R> {
    fn read_region(&self, image: &DynamicImage, rect: Rect, data_type: DataType) -> String {
        if !rect.is_valid() {
            warn!(
                "Invalid region ({}, {})-({}, {}), skipping",
                rect.x1, rect.y1, rect.x2, rect.y2
            );
            return String::new();
        }

        let Some(crop) = self.crop(image, rect) else {
            return String::new();
        };

        match self.recognizer.recognize(&crop) {
            Ok(result) => {
                let text = RecognitionMode::from(data_type).filter(&result.text);
                trace!("Read {:?} from region {:?}", text, rect);
                text
            }
            Err(e) => {
                warn!("OCR failed for region {:?}: {}", rect, e);
                String::new()
            }
        }
    }
}
