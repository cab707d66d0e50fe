use slint::{Rgba8Pixel, SharedPixelBuffer};

use crate::{camera::CapturedPhoto, error::CaptureError};

/// Everything the background threads hand back to the UI thread.
pub enum AppEvent {
    /// A decoded preview frame, already rotated for display.
    Frame(SharedPixelBuffer<Rgba8Pixel>),
    /// Completion of one capture request.
    PhotoCaptured(Result<CapturedPhoto, CaptureError>),
    /// Top candidate of the first text observation in a captured photo.
    TextRecognized(String),
}
