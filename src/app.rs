use std::{path::PathBuf, sync::mpsc::channel, time::Instant};

use anyhow::Result;
use log::{error, info};
use slint::{Image, Timer, TimerMode};

use crate::{
    camera::{Camera, CaptureSession, SessionConfig},
    event::AppEvent,
    scan::Scanner,
    settings::Settings,
    toast::{ToastFrame, ToastState},
};

slint::slint! {
    export component MainWindow inherits Window {
        in property <image> camera-texture;
        in property <bool> toast-visible;
        in property <string> toast-text;
        in property <float> toast-opacity: 1.0;
        in property <length> toast-font-size: 12px;
        callback take-photo();

        title: "Scan Photo";
        background: white;

        // preview occupies the top half, aspect-fill
        Rectangle {
            x: 0px;
            y: 0px;
            width: root.width;
            height: root.height / 2;
            background: #ff2d55;
            clip: true;
            Image {
                width: parent.width;
                height: parent.height;
                source: root.camera-texture;
                image-fit: cover;
            }
        }

        Rectangle {
            width: label.preferred-width + 32px;
            height: 44px;
            x: (root.width - self.width) / 2;
            y: root.height - self.height - 50px;
            background: touch.pressed ? #333333 : black;
            label := Text {
                text: "Take Photo";
                color: white;
                font-size: 17px;
            }
            touch := TouchArea {
                clicked => {
                    root.take-photo();
                }
            }
        }

        if root.toast-visible: Rectangle {
            x: root.width / 2 - 75px;
            y: root.height - 100px;
            width: 150px;
            height: 35px;
            background: #00000099;
            border-radius: 10px;
            clip: true;
            opacity: root.toast-opacity;
            Text {
                width: parent.width;
                height: parent.height;
                text: root.toast-text;
                color: white;
                font-size: root.toast-font-size;
                horizontal-alignment: center;
                vertical-alignment: center;
                overflow: elide;
            }
        }
    }
}

fn settings_dir(#[cfg(target_os = "android")] android_app: &slint::android::AndroidApp) -> PathBuf {
    #[cfg(target_os = "android")]
    {
        match crate::android::files_dir(android_app) {
            Ok(dir) => dir,
            Err(err) => {
                error!("unable to resolve files dir: {err:#}");
                PathBuf::from(".")
            }
        }
    }
    #[cfg(not(target_os = "android"))]
    {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

pub fn run(#[cfg(target_os = "android")] android_app: slint::android::AndroidApp) -> Result<()> {
    let settings = Settings::load(&settings_dir(
        #[cfg(target_os = "android")]
        &android_app,
    ));
    info!("settings: {settings:?}");

    let app = MainWindow::new()?;
    app.set_toast_font_size(settings.toast.font_size);

    let (event_sender, event_receiver) = channel();

    // camera startup stays off the UI thread
    let session = CaptureSession::start(
        move || {
            Camera::new(
                #[cfg(target_os = "android")]
                android_app,
            )
        },
        SessionConfig::from(&settings.camera),
        event_sender.clone(),
    );
    let scanner = Scanner::start(settings.ocr.clone(), event_sender);
    let mut toast = ToastState::new(settings.toast.clone());

    let app_weak = app.as_weak();
    let timer = Timer::default();
    timer.start(TimerMode::Repeated, std::time::Duration::from_millis(10), move || {
        let Some(app) = app_weak.upgrade() else {
            return;
        };
        let mut frame = None;
        for event in event_receiver.try_iter() {
            match event {
                AppEvent::Frame(buffer) => frame = Some(buffer),
                AppEvent::PhotoCaptured(Ok(photo)) => scanner.submit(photo),
                AppEvent::PhotoCaptured(Err(err)) => error!("Error capturing photo: {err}"),
                AppEvent::TextRecognized(text) => toast.show(text, Instant::now()),
            }
        }
        if let Some(buffer) = frame {
            app.set_camera_texture(Image::from_rgba8(buffer));
        }
        match toast.tick(Instant::now()) {
            ToastFrame::Visible { message, opacity } => {
                app.set_toast_text(message.into());
                app.set_toast_opacity(opacity);
                app.set_toast_visible(true);
            }
            ToastFrame::Hidden => app.set_toast_visible(false),
        }
    });

    app.on_take_photo(move || session.capture_photo());

    app.run()?;
    Ok(())
}
