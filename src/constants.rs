//! Application-wide constants and configuration values.
//!
//! This module defines the static values used throughout face_matcher,
//! including the match threshold, model defaults, environment variable
//! names, and the user-facing error messages emitted in verdicts.

// === Application Metadata ===

/// Current application version (from Cargo.toml).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Directory name used under the platform config and data directories.
pub const APP_DIR_NAME: &str = "face-matcher";

// === Matching ===

/// Minimum similarity (inclusive) for two faces to count as the same person.
pub const MATCH_THRESHOLD: f32 = 0.6;

// === Path Configuration ===

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Name of the models subdirectory inside the data directory.
pub const MODELS_DIR_NAME: &str = "models";
/// Default detector model file name.
pub const DETECTOR_MODEL_FILE: &str = "detector.onnx";
/// Default encoder model file name.
pub const ENCODER_MODEL_FILE: &str = "encoder.onnx";

// === Environment ===

pub const ENV_CONFIG: &str = "FACE_MATCHER_CONFIG";
pub const ENV_DETECTOR_MODEL: &str = "FACE_MATCHER_DETECTOR_MODEL";
pub const ENV_ENCODER_MODEL: &str = "FACE_MATCHER_ENCODER_MODEL";
/// When set, logs are appended to this file instead of stderr.
pub const ENV_LOG_FILE: &str = "FACE_MATCHER_LOG_FILE";
/// Log level used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

// === Detector Defaults ===

/// Detector input width in pixels (RFB-320 layout).
pub const DEFAULT_DETECTOR_WIDTH: u32 = 320;
/// Detector input height in pixels (RFB-320 layout).
pub const DEFAULT_DETECTOR_HEIGHT: u32 = 240;
/// Minimum face confidence for a detection to be kept.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;
/// Overlap above which the weaker of two detections is suppressed.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.3;
/// Pixel mean subtracted before feeding the detector.
pub const DETECTOR_MEAN: f32 = 127.0;
/// Pixel scale applied after mean subtraction for the detector.
pub const DETECTOR_SCALE: f32 = 128.0;

// === Encoder Defaults ===

/// Side length of the square face crop fed to the encoder.
pub const DEFAULT_ENCODER_SIZE: u32 = 112;
/// Pixel mean subtracted before feeding the encoder.
pub const ENCODER_MEAN: f32 = 127.5;
/// Pixel scale applied after mean subtraction for the encoder.
pub const ENCODER_SCALE: f32 = 127.5;

// === Verdict Messages ===

pub const ERR_NO_FACE_FRAME: &str = "No face detected in verification video";
pub const ERR_NO_FACE_PROFILE: &str = "No face detected in profile photo";
pub const ERR_MULTIPLE_FACES_FRAME: &str = "Multiple faces detected in video";
pub const ERR_USAGE: &str = "Usage: face_matcher <frame_path> <profile_path>";
