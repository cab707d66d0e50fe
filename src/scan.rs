use std::{
    sync::mpsc::{channel, Receiver, Sender},
    thread::JoinHandle,
    time::Instant,
};

use log::{error, info};

use crate::{
    camera::CapturedPhoto,
    error::{OcrError, ScanError},
    event::AppEvent,
    ocr::{PaddleRecognizer, TextRecognizer},
    settings::OcrSettings,
};

/// Decodes a captured photo and recognizes its text. Returns the top
/// candidate of the first observation; every other observation is
/// discarded. `Ok(None)` means no text was found.
pub fn scan_photo<R: TextRecognizer + ?Sized>(
    recognizer: &R,
    photo: &CapturedPhoto,
) -> Result<Option<String>, ScanError> {
    if photo.data.is_empty() {
        return Err(ScanError::MissingData);
    }
    let image = image::load_from_memory(&photo.data).map_err(ScanError::Decode)?;
    let observations = recognizer.recognize(&image)?;
    Ok(observations
        .first()
        .and_then(|observation| observation.top_candidates(1).first())
        .map(|candidate| candidate.string.clone()))
}

/// Background worker owning the recognition engine.
pub struct Scanner {
    requests: Option<Sender<CapturedPhoto>>,
    worker: Option<JoinHandle<()>>,
}

impl Scanner {
    pub fn start(settings: OcrSettings, events: Sender<AppEvent>) -> Self {
        Self::with_recognizer(move || PaddleRecognizer::new(&settings), events)
    }

    /// `make_recognizer` runs on the worker thread, once.
    pub fn with_recognizer<F, R>(make_recognizer: F, events: Sender<AppEvent>) -> Self
    where
        F: FnOnce() -> Result<R, OcrError> + Send + 'static,
        R: TextRecognizer + 'static,
    {
        let (requests, request_receiver) = channel();
        let worker = std::thread::spawn(move || {
            let recognizer = make_recognizer();
            if let Err(err) = &recognizer {
                error!("text recognition unavailable: {err}");
            }
            run_scanner(recognizer, request_receiver, events);
        });
        Self {
            requests: Some(requests),
            worker: Some(worker),
        }
    }

    pub fn submit(&self, photo: CapturedPhoto) {
        let sent = self.requests.as_ref().map(|requests| requests.send(photo).is_ok());
        if sent != Some(true) {
            error!("scanner is not running, photo dropped");
        }
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.requests = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("scanner thread panicked");
            }
        }
    }
}

fn run_scanner<R: TextRecognizer>(
    recognizer: Result<R, OcrError>,
    requests: Receiver<CapturedPhoto>,
    events: Sender<AppEvent>,
) {
    for photo in requests {
        let recognizer = match &recognizer {
            Ok(recognizer) => recognizer,
            Err(err) => {
                error!("Error recognizing text: {err}");
                continue;
            }
        };
        let t = Instant::now();
        match scan_photo(recognizer, &photo) {
            Ok(Some(text)) => {
                info!("recognized {text:?} in {}ms", t.elapsed().as_millis());
                if events.send(AppEvent::TextRecognized(text)).is_err() {
                    break;
                }
            }
            Ok(None) => info!("no text found in {}ms", t.elapsed().as_millis()),
            Err(err) => error!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, time::Duration};

    use image::{DynamicImage, ImageFormat, RgbImage};

    use super::*;
    use crate::ocr::{BoundingBox, RecognizedText, TextObservation};

    struct StubRecognizer(Vec<Vec<&'static str>>);

    impl TextRecognizer for StubRecognizer {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<TextObservation>, OcrError> {
            Ok(self
                .0
                .iter()
                .map(|candidates| TextObservation {
                    candidates: candidates
                        .iter()
                        .map(|s| RecognizedText {
                            string: s.to_string(),
                            confidence: 1.,
                        })
                        .collect(),
                    bounding_box: BoundingBox::default(),
                })
                .collect())
        }
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<TextObservation>, OcrError> {
            Err(OcrError::Processing("boom".into()))
        }
    }

    fn png_photo() -> CapturedPhoto {
        let mut data = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut data, ImageFormat::Png)
            .unwrap();
        CapturedPhoto {
            data: data.into_inner(),
            width: 4,
            height: 4,
        }
    }

    #[test]
    fn takes_top_candidate_of_first_observation() {
        let recognizer = StubRecognizer(vec![vec!["1+1", "l+l"], vec!["second"]]);
        assert_eq!(scan_photo(&recognizer, &png_photo()).unwrap().as_deref(), Some("1+1"));
    }

    #[test]
    fn no_text_is_not_an_error() {
        assert_eq!(scan_photo(&StubRecognizer(vec![]), &png_photo()).unwrap(), None);
        // first observation without candidates hides the rest
        let recognizer = StubRecognizer(vec![vec![], vec!["later"]]);
        assert_eq!(scan_photo(&recognizer, &png_photo()).unwrap(), None);
    }

    #[test]
    fn failures_map_to_scan_errors() {
        let empty = CapturedPhoto {
            data: vec![],
            width: 0,
            height: 0,
        };
        assert!(matches!(
            scan_photo(&StubRecognizer(vec![]), &empty),
            Err(ScanError::MissingData)
        ));

        let garbage = CapturedPhoto {
            data: vec![1, 2, 3, 4],
            width: 1,
            height: 1,
        };
        assert!(matches!(
            scan_photo(&StubRecognizer(vec![]), &garbage),
            Err(ScanError::Decode(_))
        ));

        assert!(matches!(
            scan_photo(&FailingRecognizer, &png_photo()),
            Err(ScanError::Recognition(_))
        ));
    }

    #[test]
    fn scanner_reports_recognized_text() {
        let (sender, receiver) = channel();
        let scanner = Scanner::with_recognizer(|| Ok(StubRecognizer(vec![vec!["hello"]])), sender);
        scanner.submit(png_photo());
        match receiver.recv_timeout(Duration::from_secs(5)) {
            Ok(AppEvent::TextRecognized(text)) => assert_eq!(text, "hello"),
            _ => panic!("expected recognized text"),
        }
    }

    #[test]
    fn scanner_without_engine_stays_silent() {
        let (sender, receiver) = channel();
        let scanner = Scanner::with_recognizer(
            || Err::<StubRecognizer, _>(OcrError::MissingModel("det.mnn".into())),
            sender,
        );
        scanner.submit(png_photo());
        drop(scanner);
        assert!(receiver.try_recv().is_err());
    }
}
