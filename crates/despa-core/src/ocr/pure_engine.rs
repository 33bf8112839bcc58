//! Pure Rust recognizer using `pure-onnx-ocr`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::{ModelConfig, OcrConfig};

use super::{OcrResult, Recognizer, TextBox};

type Engine = pure_onnx_ocr::engine::OcrEngine;

/// Fixed-size pool of engines that are `Send` but not `Sync`.
///
/// Slot 0 is filled at construction; other slots are started the first time a
/// call finds every started engine busy.
struct EnginePool<E> {
    slots: Vec<Mutex<Option<E>>>,
    next: AtomicUsize,
}

impl<E> EnginePool<E> {
    fn new(size: usize, first: E) -> Self {
        let mut slots: Vec<Mutex<Option<E>>> = Vec::with_capacity(size.max(1));
        slots.push(Mutex::new(Some(first)));
        slots.extend((1..size).map(|_| Mutex::new(None)));
        Self {
            slots,
            next: AtomicUsize::new(0),
        }
    }

    fn size(&self) -> usize {
        self.slots.len()
    }

    /// Run `f` on the first idle engine, else wait for one in turn.
    fn with<T>(
        &self,
        start: impl FnOnce() -> Result<E, OcrError>,
        f: impl FnOnce(&E) -> Result<T, OcrError>,
    ) -> Result<T, OcrError> {
        for slot in &self.slots {
            if let Ok(mut engine) = slot.try_lock() {
                return Self::run_on(&mut engine, start, f);
            }
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let mut engine = self.slots[index]
            .lock()
            .map_err(|_| OcrError::Recognition("OCR engine lock poisoned".to_string()))?;
        Self::run_on(&mut engine, start, f)
    }

    fn run_on<T>(
        slot: &mut Option<E>,
        start: impl FnOnce() -> Result<E, OcrError>,
        f: impl FnOnce(&E) -> Result<T, OcrError>,
    ) -> Result<T, OcrError> {
        if slot.is_none() {
            debug!("Starting another OCR engine");
            *slot = Some(start()?);
        }
        match slot.as_ref() {
            Some(engine) => f(engine),
            None => Err(OcrError::Recognition("OCR engine not started".to_string())),
        }
    }
}

/// Recognizer backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// Recognition runs on a pool of up to `ocr.engines` engines so that pages
/// processed in parallel do not queue on a single one.
pub struct PureOcrRecognizer {
    pool: EnginePool<Engine>,
    det_path: PathBuf,
    rec_path: PathBuf,
    dict_path: PathBuf,
    config: OcrConfig,
}

impl PureOcrRecognizer {
    /// Load the detection and recognition models named in `models` from `model_dir`.
    pub fn from_dir(
        model_dir: &Path,
        models: &ModelConfig,
        config: OcrConfig,
    ) -> Result<Self, OcrError> {
        let det_path = model_dir.join(&models.detection_model);
        let rec_path = model_dir.join(&models.recognition_model);
        let dict_path = model_dir.join(&models.dictionary);

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let first = build_engine(&det_path, &rec_path, &dict_path)?;
        let pool = EnginePool::new(config.engines, first);

        info!(
            "Loaded pure-onnx-ocr engine from {} (pool of {})",
            model_dir.display(),
            pool.size()
        );

        Ok(Self {
            pool,
            det_path,
            rec_path,
            dict_path,
            config,
        })
    }

    fn clean_text(&self, text: &str) -> String {
        if self.config.keep_unk {
            text.to_string()
        } else {
            text.replace("[UNK]", " ")
        }
    }
}

fn build_engine(det_path: &Path, rec_path: &Path, dict_path: &Path) -> Result<Engine, OcrError> {
    pure_onnx_ocr::engine::OcrEngineBuilder::new()
        .det_model_path(det_path)
        .rec_model_path(rec_path)
        .dictionary_path(dict_path)
        .build()
        .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))
}

impl Recognizer for PureOcrRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let boxes = self.pool.with(
            || build_engine(&self.det_path, &self.rec_path, &self.dict_path),
            |engine| {
                let results = engine
                    .run_from_image(image)
                    .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;
                Ok(results
                    .iter()
                    .map(|r| TextBox {
                        bbox: polygon_to_bbox(&r.bounding_box),
                        text: self.clean_text(&r.text),
                        confidence: r.confidence,
                    })
                    .collect::<Vec<TextBox>>())
            },
        )?;

        debug!(
            "OCR on {}x{}: {} text boxes in {}ms",
            width,
            height,
            boxes.len(),
            start.elapsed().as_millis()
        );

        Ok(OcrResult::from_boxes(boxes, (width, height)))
    }
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    /// Stand-in engine: `Send`, not `Sync`, remembers which one it is.
    struct Numbered {
        id: usize,
        uses: Cell<usize>,
    }

    impl Numbered {
        fn new(id: usize) -> Self {
            Self { id, uses: Cell::new(0) }
        }
    }

    fn read(pool: &EnginePool<Numbered>, started: &Cell<usize>) -> usize {
        pool.with(
            || {
                started.set(started.get() + 1);
                Ok(Numbered::new(started.get()))
            },
            |engine| {
                engine.uses.set(engine.uses.get() + 1);
                Ok(engine.id)
            },
        )
        .unwrap()
    }

    #[test]
    fn test_idle_pool_uses_first_engine() {
        let pool = EnginePool::new(4, Numbered::new(0));
        let started = Cell::new(0);

        let ids: Vec<usize> = (0..3).map(|_| read(&pool, &started)).collect();

        assert_eq!(ids, vec![0, 0, 0]);
        assert_eq!(started.get(), 0);
        assert_eq!(pool.size(), 4);
    }

    #[test]
    fn test_busy_engine_starts_another() {
        let pool = EnginePool::new(2, Numbered::new(0));
        let started = Cell::new(0);

        let busy = pool.slots[0].lock().unwrap();
        assert_eq!(read(&pool, &started), 1);
        assert_eq!(read(&pool, &started), 1);
        assert_eq!(started.get(), 1);
        drop(busy);

        assert_eq!(read(&pool, &started), 0);
    }

    #[test]
    fn test_pool_has_at_least_one_engine() {
        let pool = EnginePool::new(0, Numbered::new(0));
        let started = Cell::new(0);

        assert_eq!(pool.size(), 1);
        assert_eq!(read(&pool, &started), 0);
    }

    #[test]
    fn test_start_failure_is_reported() {
        let pool = EnginePool::new(2, Numbered::new(0));
        let _busy = pool.slots[0].lock().unwrap();

        let result = pool.with(
            || Err(OcrError::ModelLoad("missing".to_string())),
            |engine: &Numbered| Ok(engine.id),
        );
        assert!(matches!(result, Err(OcrError::ModelLoad(_))));
    }
}
