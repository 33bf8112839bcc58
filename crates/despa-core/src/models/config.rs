//! Configuration structures for the reconciliation pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Main configuration for the despa pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DespaConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Page-type detection configuration.
    pub detection: DetectionConfig,

    /// Document comparison configuration.
    pub comparison: ComparisonConfig,

    /// Model configuration.
    pub models: ModelConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Keep `[UNK]` tokens in recognized text instead of mapping them to spaces.
    pub keep_unk: bool,

    /// Convert region crops to grayscale before recognition.
    pub grayscale: bool,

    /// Size of the recognizer pool used by parallel page processing.
    pub engines: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            keep_unk: false,
            grayscale: true,
            engines: 4,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum text-layer length to skip OCR for a PDF.
    pub min_text_length: usize,

    /// Maximum pages to load as images (0 = unlimited).
    pub max_pages: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_length: 100,
            max_pages: 0,
        }
    }
}

/// Page-type detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Process pages on the rayon pool.
    pub parallel: bool,

    /// Minimum page count before going parallel.
    pub parallel_threshold: usize,

    /// Rewrite OCR noise runs (`AAA`, `xxx`, `+++`) to `*****` before comparing.
    ///
    /// Off by default: the letter pattern also hits ordinary words, so
    /// `DECLARACION` would read as `DECL*****CION`. Turn it on for catalogs
    /// whose rules expect masked values such as `CUIT *****`.
    pub asterisk_correction: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 1,
            asterisk_correction: false,
        }
    }
}

impl DetectionConfig {
    /// Whether a batch of `items` pages should be spread across threads.
    pub fn should_parallelize(&self, items: usize) -> bool {
        self.parallel && items > self.parallel_threshold
    }
}

/// Document comparison configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Match percentage (inclusive) at or above which a document is approved.
    pub approve_at: f64,

    /// Match percentage (inclusive) at or above which a document goes to review.
    pub review_at: f64,

    /// Minimum similarity ratio (0.0 - 1.0) for a textual match.
    pub similarity_threshold: f64,

    /// Numeric tolerance used when an attribute's rules name none.
    pub default_tolerance: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            approve_at: 90.0,
            review_at: 70.0,
            similarity_threshold: 0.8,
            default_tolerance: 0.01,
        }
    }
}

/// Model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl DespaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.models.model_dir.join(model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = DespaConfig::default();
        assert_eq!(config.comparison.approve_at, 90.0);
        assert_eq!(config.comparison.review_at, 70.0);
        assert_eq!(config.comparison.similarity_threshold, 0.8);
        assert_eq!(config.pdf.min_text_length, 100);
        assert!(!config.detection.asterisk_correction);
        assert_eq!(config.ocr.engines, 4);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: DespaConfig =
            serde_json::from_str(r#"{"comparison": {"approve_at": 95.0}}"#).unwrap();
        assert_eq!(config.comparison.approve_at, 95.0);
        assert_eq!(config.comparison.review_at, 70.0);
        assert_eq!(config.models.recognition_model, "latin_rec.onnx");
    }

    #[test]
    fn test_should_parallelize() {
        let config = DetectionConfig::default();
        assert!(!config.should_parallelize(1));
        assert!(config.should_parallelize(2));

        let sequential = DetectionConfig {
            parallel: false,
            ..DetectionConfig::default()
        };
        assert!(!sequential.should_parallelize(10));
    }

    #[test]
    fn test_model_path() {
        let config = DespaConfig::default();
        assert_eq!(config.model_path("det.onnx"), PathBuf::from("models/det.onnx"));
    }
}
