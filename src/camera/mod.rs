use std::sync::{mpsc::Sender, Arc, Mutex};

#[cfg(target_os = "android")]
use self::camera2::AndroidCamera;
use anyhow::{anyhow, Result};
use image::RgbaImage;
use slint::SharedPixelBuffer;

use crate::event::AppEvent;

#[cfg(target_os = "android")]
mod camera2;

#[cfg(not(target_os = "android"))]
mod pcam;

pub mod convert;
mod photo_output;
mod session;

pub use photo_output::{CapturedPhoto, PhotoOutput};
pub use session::{CaptureSession, SessionConfig};

/// Where a running camera delivers its frames: the preview channel, plus
/// the slot the photo output captures from.
#[derive(Clone)]
pub struct FrameSink {
    events: Sender<AppEvent>,
    latest: Arc<Mutex<Option<RgbaImage>>>,
}

impl FrameSink {
    pub fn new(events: Sender<AppEvent>) -> Self {
        Self {
            events,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    pub fn push(&self, frame: RgbaImage) -> Result<()> {
        let buf = SharedPixelBuffer::clone_from_slice(frame.as_raw(), frame.width(), frame.height());
        self.events
            .send(AppEvent::Frame(buf))
            .map_err(|_| anyhow!("preview receiver closed"))?;
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(frame);
        }
        Ok(())
    }

    pub fn latest_frame(&self) -> Option<RgbaImage> {
        self.latest.lock().ok().and_then(|latest| latest.clone())
    }
}

/// Picks the preview size to request from the sizes a device supports:
/// the wanted size if supported, else the largest that fits inside it,
/// else the smallest available.
pub fn choose_preview_size(supported: &[(u32, u32)], width: u32, height: u32) -> Option<(u32, u32)> {
    if supported.contains(&(width, height)) {
        return Some((width, height));
    }
    let area = |&(w, h): &(u32, u32)| w as u64 * h as u64;
    supported
        .iter()
        .filter(|(w, h)| *w <= width && *h <= height)
        .max_by_key(|s| area(s))
        .or_else(|| supported.iter().min_by_key(|s| area(s)))
        .copied()
}

/// A camera the capture session can drive.
pub trait CaptureDevice {
    /// Acquires the device. Fails when it does not exist or the app may
    /// not use it.
    fn open(&mut self, camera_index: usize) -> Result<()>;

    /// Attaches the opened device as input and starts streaming into `sink`.
    fn start_preview(&mut self, width: u32, height: u32, sink: FrameSink) -> Result<()>;

    fn stop_preview(&mut self);
}

pub struct Camera {
    #[cfg(target_os = "android")]
    camera: Box<AndroidCamera>,
    #[cfg(not(target_os = "android"))]
    camera: pcam::Camera,
}

impl Camera {
    pub fn new(#[cfg(target_os = "android")] app: slint::android::AndroidApp) -> Self {
        Camera {
            // boxed: NDK callbacks hold a pointer to it
            #[cfg(target_os = "android")]
            camera: Box::new(AndroidCamera::new(app)),
            #[cfg(not(target_os = "android"))]
            camera: pcam::Camera::new(),
        }
    }
}

impl CaptureDevice for Camera {
    fn open(&mut self, camera_index: usize) -> Result<()> {
        #[cfg(target_os = "android")]
        self.camera.open(&format!("{camera_index}"))?;
        #[cfg(not(target_os = "android"))]
        self.camera.open(camera_index)?;
        Ok(())
    }

    fn start_preview(&mut self, width: u32, height: u32, sink: FrameSink) -> Result<()> {
        self.camera.start_preview(width, height, sink)
    }

    fn stop_preview(&mut self) {
        #[cfg(target_os = "android")]
        self.camera.close();
        #[cfg(not(target_os = "android"))]
        self.camera.stop_preview();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;

    use super::*;

    #[test]
    fn preview_size_prefers_exact_then_largest_fitting() {
        let sizes = [(640, 480), (1280, 720), (1920, 1080), (320, 240)];
        assert_eq!(choose_preview_size(&sizes, 1280, 720), Some((1280, 720)));
        assert_eq!(choose_preview_size(&sizes, 1600, 900), Some((1280, 720)));
        assert_eq!(choose_preview_size(&sizes, 100, 100), Some((320, 240)));
        assert_eq!(choose_preview_size(&[], 1280, 720), None);
    }

    #[test]
    fn sink_forwards_frame_and_keeps_latest() {
        let (sender, receiver) = channel();
        let sink = FrameSink::new(sender);
        assert!(sink.latest_frame().is_none());

        sink.push(RgbaImage::new(3, 2)).unwrap();
        match receiver.try_recv() {
            Ok(AppEvent::Frame(buf)) => assert_eq!((buf.width(), buf.height()), (3, 2)),
            _ => panic!("expected a frame event"),
        }
        assert_eq!(sink.latest_frame().unwrap().dimensions(), (3, 2));

        drop(receiver);
        assert!(sink.push(RgbaImage::new(1, 1)).is_err());
    }
}
