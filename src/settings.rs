use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "scan_photo.json";

/// Application settings. Every field has a default, so a partial or
/// missing settings file is fine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera: CameraSettings,
    pub ocr: OcrSettings,
    pub toast: ToastSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub index: usize,
    pub preview_width: u32,
    pub preview_height: u32,
    /// JPEG quality of captured stills, 1..=100.
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    pub models_dir: PathBuf,
    pub det_model: String,
    pub rec_model: String,
    pub charset: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastSettings {
    pub delay_ms: u64,
    pub fade_ms: u64,
    pub font_size: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            index: 0,
            preview_width: 1280,
            preview_height: 720,
            jpeg_quality: 90,
        }
    }
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            det_model: "PP-OCRv5_mobile_det.mnn".to_string(),
            rec_model: "en_PP-OCRv5_mobile_rec_infer.mnn".to_string(),
            charset: "ppocr_keys_en.txt".to_string(),
        }
    }
}

impl Default for ToastSettings {
    fn default() -> Self {
        Self {
            delay_ms: 100,
            fade_ms: 4000,
            font_size: 12.,
        }
    }
}

impl ToastSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }
}

impl OcrSettings {
    pub fn det_path(&self) -> PathBuf {
        self.models_dir.join(&self.det_model)
    }

    pub fn rec_path(&self) -> PathBuf {
        self.models_dir.join(&self.rec_model)
    }

    pub fn charset_path(&self) -> PathBuf {
        self.models_dir.join(&self.charset)
    }
}

impl Settings {
    /// Loads `dir/scan_photo.json`. A missing file yields the defaults; an
    /// unreadable or malformed one is logged and also yields the defaults.
    /// A relative `models_dir` is resolved against `dir`.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(SETTINGS_FILE);
        let mut settings = match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text).unwrap_or_else(|err| {
                warn!("invalid settings file {}: {err}", path.display());
                Self::default()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("no settings file at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                warn!("unable to read {}: {err}", path.display());
                Self::default()
            }
        };
        if settings.ocr.models_dir.is_relative() {
            settings.ocr.models_dir = dir.join(&settings.ocr.models_dir);
        }
        settings.camera.jpeg_quality = settings.camera.jpeg_quality.clamp(1, 100);
        settings
    }

    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings = Settings::parse(r#"{ "camera": { "index": 1 } }"#).unwrap();
        assert_eq!(settings.camera.index, 1);
        assert_eq!(settings.camera.preview_width, 1280);
        assert_eq!(settings.toast, ToastSettings::default());
        assert_eq!(settings.ocr.det_model, "PP-OCRv5_mobile_det.mnn");
    }

    #[test]
    fn missing_file_resolves_models_against_dir() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings.ocr.models_dir, dir.path().join("models"));
        assert_eq!(settings.camera, CameraSettings::default());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings.toast.fade_ms, 4000);
        assert_eq!(settings.camera.jpeg_quality, 90);
    }

    #[test]
    fn absolute_models_dir_and_quality_clamp() {
        let dir = tempdir().unwrap();
        let models_dir = tempdir().unwrap();
        let models = models_dir.path().to_path_buf();
        let json = serde_json::json!({
            "camera": { "jpeg_quality": 0 },
            "ocr": { "models_dir": models },
        });
        fs::write(dir.path().join(SETTINGS_FILE), json.to_string()).unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings.ocr.models_dir, models);
        assert_eq!(settings.ocr.det_path(), models.join("PP-OCRv5_mobile_det.mnn"));
        assert_eq!(settings.camera.jpeg_quality, 1);
    }

    #[test]
    fn test_dirs_are_removed_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().to_path_buf();
        fs::write(path.join(SETTINGS_FILE), "{}").unwrap();
        assert_eq!(Settings::load(&path).camera, CameraSettings::default());
        dir.close().unwrap();
        assert!(!path.exists());
    }
}
