//! Face comparison pipeline.
//!
//! Decoding, the encoder seam with its ONNX implementation, and the
//! matcher that turns two images into a score.

pub mod encoder;
pub mod image_loader;
pub mod matcher;
pub mod onnx;

pub use encoder::{face_distance, EncoderError, FaceEncoder, FaceEncoding};
pub use matcher::{match_faces, match_files, MatchError, MatchScore};
pub use onnx::OnnxFaceEncoder;
