use std::io::Cursor;

use image::{codecs::jpeg::JpegEncoder, DynamicImage};
use log::info;

use super::FrameSink;
use crate::error::CaptureError;

/// One encoded still image.
#[derive(Debug, Clone)]
pub struct CapturedPhoto {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Still photo sink of a capture session. Each request encodes the most
/// recent preview frame as a JPEG.
pub struct PhotoOutput {
    sink: FrameSink,
    jpeg_quality: u8,
}

impl PhotoOutput {
    pub fn new(sink: FrameSink, jpeg_quality: u8) -> Self {
        Self { sink, jpeg_quality }
    }

    pub fn capture(&self) -> Result<CapturedPhoto, CaptureError> {
        let frame = self.sink.latest_frame().ok_or(CaptureError::NoFrame)?;
        let (width, height) = frame.dimensions();
        // jpeg has no alpha channel
        let rgb = DynamicImage::ImageRgba8(frame).to_rgb8();
        let mut data = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut data, self.jpeg_quality).encode_image(&rgb)?;
        let data = data.into_inner();
        info!("captured photo {width}x{height}, {} bytes", data.len());
        Ok(CapturedPhoto {
            data,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;

    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;

    #[test]
    fn capture_without_frame_fails() {
        let (sender, _receiver) = channel();
        let output = PhotoOutput::new(FrameSink::new(sender), 90);
        assert!(matches!(output.capture(), Err(CaptureError::NoFrame)));
    }

    #[test]
    fn capture_encodes_latest_frame_as_jpeg() {
        let (sender, receiver) = channel();
        let sink = FrameSink::new(sender);
        let output = PhotoOutput::new(sink.clone(), 80);

        sink.push(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]))).unwrap();
        sink.push(RgbaImage::from_pixel(16, 8, Rgba([255, 255, 255, 255]))).unwrap();
        assert_eq!(receiver.try_iter().count(), 2);

        let photo = output.capture().unwrap();
        assert_eq!((photo.width, photo.height), (16, 8));
        assert_eq!(image::guess_format(&photo.data).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&photo.data).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (16, 8));
        assert!(decoded.pixels().all(|p| p.0.iter().all(|c| *c > 240)));
    }
}
