//! Text recognition.
//!
//! - `engine` - the `TextRecognizer` seam and its PaddleOCR implementation
//! - `types` - observations and candidates returned by a recognition pass

pub mod engine;
pub mod types;

pub use engine::{PaddleRecognizer, TextRecognizer};
pub use types::{BoundingBox, RecognizedText, TextObservation};
