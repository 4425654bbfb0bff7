//! Face encoding types and the backend seam.
//!
//! A [`FaceEncoder`] turns an image into one [`FaceEncoding`] per detected
//! face. The matcher only talks to this trait, so the ONNX backend can be
//! swapped for any other detector/embedder pair.

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;

/// Errors raised while loading or running a face backend.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("Failed to read image {}: {source}", .path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode image {}: {source}", .path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Model not found: {}", .0.display())]
    ModelMissing(PathBuf),
    #[error("Failed to load model {}: {message}", .path.display())]
    ModelLoad { path: PathBuf, message: String },
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Encoding dimensions differ ({left} vs {right})")]
    DimensionMismatch { left: usize, right: usize },
}

/// Fixed-length vector summarising one detected face.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceEncoding(Vec<f32>);

impl FaceEncoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Scale the vector to unit length. A zero vector is left untouched.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let norm = self.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut self.0 {
                *v /= norm;
            }
        }
        self
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Detects every face in an image and encodes each one.
pub trait FaceEncoder {
    /// Returns one encoding per detected face, strongest detection first.
    fn encode(&self, image: &RgbImage) -> Result<Vec<FaceEncoding>, EncoderError>;
}

/// Euclidean distance between two encodings; lower means more similar.
///
/// A NaN or infinite component anywhere in either encoding is an error.
pub fn face_distance(known: &FaceEncoding, candidate: &FaceEncoding) -> Result<f32, EncoderError> {
    if known.len() != candidate.len() {
        return Err(EncoderError::DimensionMismatch {
            left: known.len(),
            right: candidate.len(),
        });
    }

    let sum: f32 = known
        .as_slice()
        .iter()
        .zip(candidate.as_slice())
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    let distance = sum.sqrt();
    if !distance.is_finite() {
        return Err(EncoderError::Inference(
            "non-finite face distance".to_string(),
        ));
    }
    Ok(distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical_is_zero() {
        let a = FaceEncoding::new(vec![0.1, 0.2, 0.3]);
        assert_eq!(face_distance(&a, &a.clone()).unwrap(), 0.0);
    }

    #[test]
    fn test_distance_is_euclidean() {
        let a = FaceEncoding::new(vec![0.0, 0.0]);
        let b = FaceEncoding::new(vec![3.0, 4.0]);
        assert!((face_distance(&a, &b).unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_rejects_mismatched_lengths() {
        let a = FaceEncoding::new(vec![1.0; 128]);
        let b = FaceEncoding::new(vec![1.0; 512]);
        let err = face_distance(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            EncoderError::DimensionMismatch {
                left: 128,
                right: 512
            }
        ));
    }

    #[test]
    fn test_distance_rejects_nan_component() {
        let a = FaceEncoding::new(vec![f32::NAN, 0.0]);
        let b = FaceEncoding::new(vec![0.0, 0.0]);
        let err = face_distance(&a, &b).unwrap_err();
        assert_eq!(err.to_string(), "Inference failed: non-finite face distance");
    }

    #[test]
    fn test_distance_rejects_infinite_component() {
        let a = FaceEncoding::new(vec![f32::INFINITY, 0.0]);
        let b = FaceEncoding::new(vec![0.0, 0.0]);
        assert!(matches!(
            face_distance(&a, &b).unwrap_err(),
            EncoderError::Inference(_)
        ));
    }

    #[test]
    fn test_normalized_has_unit_length() {
        let enc = FaceEncoding::new(vec![3.0, 4.0]).normalized();
        assert!((enc.as_slice()[0] - 0.6).abs() < 1e-6);
        assert!((enc.as_slice()[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_zero_vector_unchanged() {
        let enc = FaceEncoding::new(vec![0.0; 4]).normalized();
        assert_eq!(enc.as_slice(), &[0.0; 4]);
    }
}
