use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::{anyhow, Result};
use kamera::Camera as KCamera;
use log::{debug, info, warn};

use super::{convert::bgra_to_rgba, FrameSink};

/// Desktop camera: a kamera device polled on its own thread.
pub struct Camera {
    index: Option<usize>,
    running: Option<Arc<AtomicBool>>,
    camera_task: Option<std::thread::JoinHandle<Result<()>>>,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            index: None,
            running: None,
            camera_task: None,
        }
    }

    pub fn open(&mut self, index: usize) -> Result<()> {
        // probe now so a missing device fails setup instead of the stream thread
        if KCamera::new_device(index).is_none() {
            return Err(anyhow!("camera {index} does not exist"));
        }
        self.index = Some(index);
        Ok(())
    }

    /// kamera negotiates the stream size itself; the requested size is only logged.
    pub fn start_preview(&mut self, width: u32, height: u32, sink: FrameSink) -> Result<()> {
        let index = self.index.ok_or_else(|| anyhow!("camera is not open"))?;
        self.stop_preview();
        info!("start preview on camera {index}, requested {width}x{height}");
        let running = Arc::new(AtomicBool::new(true));
        self.running = Some(running.clone());
        self.camera_task = Some(std::thread::spawn(move || {
            let camera = KCamera::new_device(index).ok_or_else(|| anyhow!("camera {index} does not exist"))?;
            camera.start();
            let mut count = 0;
            let mut timer = Instant::now();
            while running.load(Ordering::Relaxed) {
                let frame = match camera.wait_for_frame() {
                    Some(f) => f,
                    None => {
                        warn!("no frame from camera {index}");
                        std::thread::sleep(Duration::from_millis(10));
                        continue;
                    }
                };

                let (width, height) = frame.size_u32();
                let frame_data = frame.data();
                let rgba = match bgra_to_rgba(frame_data.data_u8(), width, height) {
                    Some(rgba) => rgba,
                    None => continue,
                };
                if sink.push(rgba).is_err() {
                    break;
                }

                count += 1;
                if count == 30 {
                    let time = timer.elapsed().as_millis();
                    debug!("30 frames in {time}ms ({width}x{height})");
                    count = 0;
                    timer = Instant::now();
                }
            }
            camera.stop();
            Ok(())
        }));
        Ok(())
    }

    pub fn stop_preview(&mut self) {
        if let Some(running) = self.running.take() {
            running.store(false, Ordering::Relaxed);
        }
        if let Some(handle) = self.camera_task.take() {
            info!("stop preview..");
            match handle.join() {
                Ok(Err(err)) => warn!("preview thread ended with error: {err:#}"),
                Err(_) => warn!("preview thread panicked"),
                Ok(Ok(())) => {}
            }
        }
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.stop_preview();
    }
}
