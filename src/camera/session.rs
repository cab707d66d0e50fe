use std::{
    sync::mpsc::{channel, Receiver, Sender},
    thread::JoinHandle,
};

use log::{error, info, warn};

use super::{CaptureDevice, FrameSink, PhotoOutput};
use crate::{
    error::{CaptureError, SetupError},
    event::AppEvent,
    settings::CameraSettings,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub camera_index: usize,
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
}

impl From<&CameraSettings> for SessionConfig {
    fn from(settings: &CameraSettings) -> Self {
        Self {
            camera_index: settings.index,
            width: settings.preview_width,
            height: settings.preview_height,
            jpeg_quality: settings.jpeg_quality,
        }
    }
}

enum SessionCommand {
    CapturePhoto,
    Stop,
}

/// One camera input and one photo output, running on a background thread.
/// The device is built on that thread, so backends need not be `Send`.
pub struct CaptureSession {
    commands: Sender<SessionCommand>,
    events: Sender<AppEvent>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureSession {
    pub fn start<F, D>(make_camera: F, config: SessionConfig, events: Sender<AppEvent>) -> Self
    where
        F: FnOnce() -> D + Send + 'static,
        D: CaptureDevice,
    {
        let (commands, command_receiver) = channel();
        let worker_events = events.clone();
        let worker = std::thread::spawn(move || {
            let camera = make_camera();
            run_session(camera, config, worker_events, command_receiver);
        });
        Self {
            commands,
            events,
            worker: Some(worker),
        }
    }

    /// False once the session thread has exited, after a failed setup or `stop`.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Requests one still. Completion arrives as `AppEvent::PhotoCaptured`.
    pub fn capture_photo(&self) {
        if self.commands.send(SessionCommand::CapturePhoto).is_err() {
            let _ = self
                .events
                .send(AppEvent::PhotoCaptured(Err(CaptureError::SessionClosed)));
        }
    }

    pub fn stop(&mut self) {
        let _ = self.commands.send(SessionCommand::Stop);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("capture session thread panicked");
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn setup<D: CaptureDevice>(
    camera: &mut D,
    config: &SessionConfig,
    sink: FrameSink,
) -> Result<(), SetupError> {
    camera
        .open(config.camera_index)
        .map_err(SetupError::CameraUnavailable)?;
    camera
        .start_preview(config.width, config.height, sink)
        .map_err(SetupError::Input)
}

fn run_session<D: CaptureDevice>(
    mut camera: D,
    config: SessionConfig,
    events: Sender<AppEvent>,
    commands: Receiver<SessionCommand>,
) {
    let sink = FrameSink::new(events.clone());
    let output = PhotoOutput::new(sink.clone(), config.jpeg_quality);

    if let Err(err) = setup(&mut camera, &config, sink) {
        error!("{err}");
        return;
    }
    info!("capture session running: {config:?}");

    for command in commands {
        match command {
            SessionCommand::CapturePhoto => {
                if events.send(AppEvent::PhotoCaptured(output.capture())).is_err() {
                    warn!("photo completion dropped: receiver closed");
                    break;
                }
            }
            SessionCommand::Stop => break,
        }
    }

    camera.stop_preview();
    info!("capture session stopped");
}
