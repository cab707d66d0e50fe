pub mod app;
pub mod camera;
pub mod error;
pub mod event;
pub mod ocr;
pub mod scan;
pub mod settings;
pub mod toast;

#[cfg(target_os = "android")]
mod android;

#[cfg(target_os = "android")]
#[no_mangle]
fn android_main(android_app: slint::android::AndroidApp) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("scan_photo"),
    );
    if let Err(err) = slint::android::init(android_app.clone()) {
        log::error!("slint init failed: {err}");
        return;
    }
    if let Err(err) = app::run(android_app) {
        log::error!("app exited with error: {err:?}");
    }
}
