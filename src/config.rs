//! Backend configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then command-line flags (or their environment variables).
//!
//! ```toml
//! [detector]
//! model = "/opt/models/version-RFB-320.onnx"
//! score_threshold = 0.8
//!
//! [encoder]
//! model = "/opt/models/arcface-mobile.onnx"
//! input_size = 112
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::constants;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Face detector settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Path to the detector ONNX model.
    pub model: PathBuf,
    /// Width the frame is resized to before detection.
    pub input_width: u32,
    /// Height the frame is resized to before detection.
    pub input_height: u32,
    /// Minimum face confidence to keep a detection.
    pub score_threshold: f32,
    /// Overlap above which weaker detections are suppressed.
    pub iou_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: default_model_path(constants::DETECTOR_MODEL_FILE),
            input_width: constants::DEFAULT_DETECTOR_WIDTH,
            input_height: constants::DEFAULT_DETECTOR_HEIGHT,
            score_threshold: constants::DEFAULT_SCORE_THRESHOLD,
            iou_threshold: constants::DEFAULT_IOU_THRESHOLD,
        }
    }
}

/// Face embedding settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    /// Path to the embedding ONNX model.
    pub model: PathBuf,
    /// Side of the square face crop fed to the model.
    pub input_size: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            model: default_model_path(constants::ENCODER_MODEL_FILE),
            input_size: constants::DEFAULT_ENCODER_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub detector: DetectorConfig,
    pub encoder: EncoderConfig,
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, the platform config
    /// directory is consulted and a missing file falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::from_file(path)?
            }
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => {
                    tracing::debug!("no config file, using defaults");
                    Self::default()
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Replace model paths with those given on the command line.
    #[must_use]
    pub fn with_overrides(mut self, detector: Option<PathBuf>, encoder: Option<PathBuf>) -> Self {
        if let Some(path) = detector {
            self.detector.model = path;
        }
        if let Some(path) = encoder {
            self.encoder.model = path;
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let det = &self.detector;
        if det.input_width == 0 || det.input_height == 0 {
            return Err(ConfigError::Invalid(
                "detector input dimensions must be non-zero".to_string(),
            ));
        }
        if self.encoder.input_size == 0 {
            return Err(ConfigError::Invalid(
                "encoder input_size must be non-zero".to_string(),
            ));
        }
        for (name, value) in [
            ("score_threshold", det.score_threshold),
            ("iou_threshold", det.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "detector {name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// `<config_dir>/face-matcher/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| {
        dir.join(constants::APP_DIR_NAME)
            .join(constants::CONFIG_FILE_NAME)
    })
}

fn default_model_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(constants::APP_DIR_NAME))
        .unwrap_or_default()
        .join(constants::MODELS_DIR_NAME)
        .join(file_name)
}
