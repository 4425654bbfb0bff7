//! Frame-versus-profile comparison.

use std::path::Path;

use image::RgbImage;
use thiserror::Error;

use super::encoder::{face_distance, EncoderError, FaceEncoder};
use super::image_loader;
use crate::config::ConfigError;
use crate::constants;
use crate::state::MatchVerdict;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{}", constants::ERR_NO_FACE_FRAME)]
    NoFaceInFrame,
    #[error("{}", constants::ERR_NO_FACE_PROFILE)]
    NoFaceInProfile,
    #[error("{}", constants::ERR_MULTIPLE_FACES_FRAME)]
    MultipleFacesInFrame,
    #[error(transparent)]
    Encoder(#[from] EncoderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Similarity of the frame face to the profile face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchScore {
    /// `1 - distance`, clamped to `[0, 1]`.
    pub similarity: f32,
    pub is_match: bool,
}

impl MatchScore {
    /// Convert a face distance into a thresholded similarity.
    pub fn from_distance(distance: f32) -> Self {
        let similarity = (1.0 - distance).clamp(0.0, 1.0);
        Self {
            similarity,
            is_match: similarity >= constants::MATCH_THRESHOLD,
        }
    }
}

/// Decode both images and compare them.
pub fn match_files(
    frame_path: &Path,
    profile_path: &Path,
    encoder: &dyn FaceEncoder,
) -> Result<MatchScore, MatchError> {
    let frame = image_loader::load_rgb(frame_path)?;
    let profile = image_loader::load_rgb(profile_path)?;
    match_faces(&frame, &profile, encoder)
}

/// Compare the single face in `frame` against the face in `profile`.
///
/// The frame must contain exactly one face. The profile must contain at
/// least one; when it has several, the strongest detection is used.
pub fn match_faces(
    frame: &RgbImage,
    profile: &RgbImage,
    encoder: &dyn FaceEncoder,
) -> Result<MatchScore, MatchError> {
    let frame_encodings = encoder.encode(frame)?;
    let profile_encodings = encoder.encode(profile)?;

    let Some(frame_encoding) = frame_encodings.first() else {
        return Err(MatchError::NoFaceInFrame);
    };
    let Some(profile_encoding) = profile_encodings.first() else {
        return Err(MatchError::NoFaceInProfile);
    };
    if frame_encodings.len() > 1 {
        return Err(MatchError::MultipleFacesInFrame);
    }
    if profile_encodings.len() > 1 {
        tracing::warn!(
            faces = profile_encodings.len(),
            "multiple faces in profile photo, using the first"
        );
    }

    let distance = face_distance(profile_encoding, frame_encoding)?;
    let score = MatchScore::from_distance(distance);
    tracing::info!(
        distance,
        similarity = score.similarity,
        is_match = score.is_match,
        "faces compared"
    );
    Ok(score)
}

/// Fold a comparison outcome into the verdict printed to the caller.
pub fn verdict(outcome: Result<MatchScore, MatchError>) -> MatchVerdict {
    match outcome {
        Ok(score) => MatchVerdict::matched(score.similarity, score.is_match),
        Err(err) => {
            tracing::debug!(error = %err, "match did not complete");
            MatchVerdict::failure(err.to_string())
        }
    }
}
