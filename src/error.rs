//! Error taxonomy: a session either fails to set up, or a single
//! capture/recognition pass fails. Both are logged and dropped by callers.

use thiserror::Error;

/// Capture session setup failures. Setup is aborted, never retried.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Unable to access camera: {0:#}")]
    CameraUnavailable(anyhow::Error),

    #[error("Error adding input to capture session: {0:#}")]
    Input(anyhow::Error),
}

/// Still capture failures.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no preview frame has been received yet")]
    NoFrame,

    #[error("capture session is not running")]
    SessionClosed,

    #[error("Unable to encode photo: {0}")]
    Encode(#[from] image::ImageError),
}

/// Completion and recognition failures for one captured photo.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Unable to get image data")]
    MissingData,

    #[error("Unable to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Error recognizing text: {0}")]
    Recognition(#[from] OcrError),
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("model file not found: {0}")]
    MissingModel(String),

    #[error("OCR processing failed: {0}")]
    Processing(String),
}
