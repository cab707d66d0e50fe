use image::DynamicImage;
use log::info;
use ocr_rs::OcrEngine;

use super::types::{BoundingBox, RecognizedText, TextObservation};
use crate::{error::OcrError, settings::OcrSettings};

/// A single-shot text recognition pass over one image. Observations come
/// back in the engine's detection order.
pub trait TextRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextObservation>, OcrError>;
}

/// PaddleOCR (PP-OCRv5 mobile) models run through `ocr-rs`.
pub struct PaddleRecognizer {
    engine: OcrEngine,
}

impl PaddleRecognizer {
    pub fn new(settings: &OcrSettings) -> Result<Self, OcrError> {
        let det_path = settings.det_path();
        let rec_path = settings.rec_path();
        let charset_path = settings.charset_path();
        for path in [&det_path, &rec_path, &charset_path] {
            if !path.exists() {
                return Err(OcrError::MissingModel(path.display().to_string()));
            }
        }

        let engine = OcrEngine::new(&det_path, &rec_path, &charset_path, None)
            .map_err(|e| OcrError::EngineNotAvailable(e.to_string()))?;
        info!("OCR engine ready, models in {}", settings.models_dir.display());
        Ok(Self { engine })
    }
}

impl TextRecognizer for PaddleRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextObservation>, OcrError> {
        let raw_results = self
            .engine
            .recognize(image)
            .map_err(|e| OcrError::Processing(e.to_string()))?;

        // the engine reports one candidate per region
        Ok(raw_results
            .into_iter()
            .filter(|r| !r.text.trim().is_empty())
            .map(|r| TextObservation {
                bounding_box: BoundingBox {
                    x: r.bbox.rect.left() as i32,
                    y: r.bbox.rect.top() as i32,
                    width: r.bbox.rect.width() as u32,
                    height: r.bbox.rect.height() as u32,
                },
                candidates: vec![RecognizedText {
                    string: r.text,
                    confidence: r.confidence,
                }],
            })
            .collect())
    }
}
