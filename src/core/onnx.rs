//! ONNX face backend.
//!
//! Two models run back to back: an RFB/UltraFace-style detector that
//! yields per-anchor face scores and normalised corner boxes, then an
//! embedding network that maps each square face crop to a vector.
//!
//! Both models are loaded once per process through `tract`, with their
//! input shapes pinned from [`Config`] so the graphs can be optimised.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use tract_onnx::prelude::*;

use super::encoder::{EncoderError, FaceEncoder, FaceEncoding};
use crate::config::Config;
use crate::constants;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Runs one model on a single NCHW input tensor.
pub trait ModelRunner {
    fn infer(&self, input: Tensor) -> TractResult<TVec<TValue>>;
}

impl ModelRunner for Plan {
    fn infer(&self, input: Tensor) -> TractResult<TVec<TValue>> {
        self.run(tvec!(input.into()))
    }
}

/// A detected face, corners normalised to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl FaceBox {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &FaceBox) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// Detector + embedder pair backed by ONNX models.
pub struct OnnxFaceEncoder {
    detector: Box<dyn ModelRunner>,
    encoder: Box<dyn ModelRunner>,
    detector_width: u32,
    detector_height: u32,
    encoder_size: u32,
    score_threshold: f32,
    iou_threshold: f32,
}

impl OnnxFaceEncoder {
    /// Load and optimise both models described by `config`.
    pub fn load(config: &Config) -> Result<Self, EncoderError> {
        let det = &config.detector;
        let enc = &config.encoder;

        let detector = load_plan(
            &det.model,
            [1, 3, det.input_height as usize, det.input_width as usize],
        )?;
        let encoder = load_plan(
            &enc.model,
            [1, 3, enc.input_size as usize, enc.input_size as usize],
        )?;

        tracing::debug!(
            detector = %det.model.display(),
            encoder = %enc.model.display(),
            "face models loaded"
        );

        Ok(Self::with_runners(Box::new(detector), Box::new(encoder), config))
    }

    /// Assemble the pipeline from already-loaded models.
    pub fn with_runners(
        detector: Box<dyn ModelRunner>,
        encoder: Box<dyn ModelRunner>,
        config: &Config,
    ) -> Self {
        Self {
            detector,
            encoder,
            detector_width: config.detector.input_width,
            detector_height: config.detector.input_height,
            encoder_size: config.encoder.input_size,
            score_threshold: config.detector.score_threshold,
            iou_threshold: config.detector.iou_threshold,
        }
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceBox>, EncoderError> {
        let input = image_tensor(
            image,
            self.detector_width,
            self.detector_height,
            constants::DETECTOR_MEAN,
            constants::DETECTOR_SCALE,
        );
        let outputs = self.detector.infer(input).map_err(inference_error)?;

        if outputs.len() < 2 {
            return Err(EncoderError::Inference(format!(
                "detector produced {} outputs, expected scores and boxes",
                outputs.len()
            )));
        }
        let scores = outputs[0].as_slice::<f32>().map_err(inference_error)?;
        let boxes = outputs[1].as_slice::<f32>().map_err(inference_error)?;

        let candidates = decode_detections(scores, boxes, self.score_threshold)?;
        let kept = non_max_suppression(candidates, self.iou_threshold);
        tracing::debug!(faces = kept.len(), "detector finished");
        Ok(kept)
    }

    fn embed(&self, image: &RgbImage, face: &FaceBox) -> Result<Option<FaceEncoding>, EncoderError> {
        let Some(crop) = crop_face(image, face) else {
            return Ok(None);
        };
        let input = image_tensor(
            &crop,
            self.encoder_size,
            self.encoder_size,
            constants::ENCODER_MEAN,
            constants::ENCODER_SCALE,
        );
        let outputs = self.encoder.infer(input).map_err(inference_error)?;
        let first = outputs
            .first()
            .ok_or_else(|| EncoderError::Inference("encoder produced no output".to_string()))?;
        let encoding = FaceEncoding::new(first.as_slice::<f32>().map_err(inference_error)?.to_vec());
        if encoding.is_empty() {
            return Err(EncoderError::Inference(
                "encoder produced an empty embedding".to_string(),
            ));
        }
        Ok(Some(encoding.normalized()))
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&self, image: &RgbImage) -> Result<Vec<FaceEncoding>, EncoderError> {
        let faces = self.detect(image)?;
        let mut encodings = Vec::with_capacity(faces.len());
        for face in &faces {
            if let Some(encoding) = self.embed(image, face)? {
                encodings.push(encoding);
            }
        }
        Ok(encodings)
    }
}

fn load_plan(path: &Path, shape: [usize; 4]) -> Result<Plan, EncoderError> {
    if !path.is_file() {
        return Err(EncoderError::ModelMissing(path.to_path_buf()));
    }

    tract_onnx::onnx()
        .model_for_path(path)
        .and_then(|model| model.with_input_fact(0, f32::fact(shape).into()))
        .and_then(|model| model.into_optimized())
        .and_then(|model| model.into_runnable())
        .map_err(|e| EncoderError::ModelLoad {
            path: path.to_path_buf(),
            message: format!("{e:#}"),
        })
}

#[allow(clippy::needless_pass_by_value)]
fn inference_error(e: TractError) -> EncoderError {
    EncoderError::Inference(format!("{e:#}"))
}

/// Resize to `width`x`height` and lay out as normalised NCHW floats.
fn image_tensor(image: &RgbImage, width: u32, height: u32, mean: f32, scale: f32) -> Tensor {
    let resized = imageops::resize(image, width, height, FilterType::Triangle);
    tract_ndarray::Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, c, y, x)| {
            #[allow(clippy::cast_possible_truncation)]
            let pixel = resized.get_pixel(x as u32, y as u32);
            (f32::from(pixel.0[c]) - mean) / scale
        },
    )
    .into()
}

/// Turn flat detector outputs into boxes whose face score clears `threshold`.
///
/// `scores` holds `[background, face]` pairs and `boxes` holds
/// `[x1, y1, x2, y2]` quads, one of each per anchor.
pub fn decode_detections(
    scores: &[f32],
    boxes: &[f32],
    threshold: f32,
) -> Result<Vec<FaceBox>, EncoderError> {
    let anchors = scores.len() / 2;
    if scores.len() % 2 != 0 || boxes.len() != anchors * 4 {
        return Err(EncoderError::Inference(format!(
            "detector output shapes disagree ({} scores, {} box values)",
            scores.len(),
            boxes.len()
        )));
    }

    let found = scores
        .chunks_exact(2)
        .zip(boxes.chunks_exact(4))
        .filter(|(score, _)| score[1] >= threshold)
        .map(|(score, quad)| FaceBox {
            x1: quad[0].clamp(0.0, 1.0),
            y1: quad[1].clamp(0.0, 1.0),
            x2: quad[2].clamp(0.0, 1.0),
            y2: quad[3].clamp(0.0, 1.0),
            score: score[1],
        })
        .collect();
    Ok(found)
}

/// Greedy NMS: keep the strongest box, drop everything overlapping it by
/// more than `iou_threshold`, repeat.
pub fn non_max_suppression(mut candidates: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<FaceBox> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Cut a square region centred on `face` out of `image`, clamped to its bounds.
///
/// Returns `None` when the box collapses to less than one pixel.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn crop_face(image: &RgbImage, face: &FaceBox) -> Option<RgbImage> {
    let (w, h) = image.dimensions();
    let (wf, hf) = (w as f32, h as f32);

    let cx = (face.x1 + face.x2) / 2.0 * wf;
    let cy = (face.y1 + face.y2) / 2.0 * hf;
    let side = ((face.x2 - face.x1) * wf).max((face.y2 - face.y1) * hf);

    let left = (cx - side / 2.0).max(0.0).round() as u32;
    let top = (cy - side / 2.0).max(0.0).round() as u32;
    let right = ((cx + side / 2.0).min(wf).round() as u32).min(w);
    let bottom = ((cy + side / 2.0).min(hf).round() as u32).min(h);

    if right <= left || bottom <= top {
        return None;
    }
    Some(imageops::crop_imm(image, left, top, right - left, bottom - top).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn face(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> FaceBox {
        FaceBox {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    #[test]
    fn test_decode_filters_by_face_score() {
        let scores = [0.9, 0.1, 0.2, 0.8, 0.25, 0.75];
        let boxes = [
            0.0, 0.0, 0.1, 0.1, //
            0.2, 0.2, 0.4, 0.4, //
            0.5, 0.5, 0.9, 0.9,
        ];
        let found = decode_detections(&scores, &boxes, 0.7).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].score, 0.8);
        assert_eq!(found[1].x1, 0.5);
    }

    #[test]
    fn test_decode_clamps_boxes() {
        let found = decode_detections(&[0.0, 1.0], &[-0.2, -0.1, 1.3, 0.5], 0.5).unwrap();
        assert_eq!(found[0], face(0.0, 0.0, 1.0, 0.5, 1.0));
    }

    #[test]
    fn test_decode_rejects_shape_mismatch() {
        let err = decode_detections(&[0.1, 0.9, 0.2, 0.8], &[0.0; 4], 0.5).unwrap_err();
        assert!(matches!(err, EncoderError::Inference(_)));
    }

    #[test]
    fn test_iou_of_identical_boxes_is_one() {
        let a = face(0.1, 0.1, 0.5, 0.5, 0.9);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_of_disjoint_boxes_is_zero() {
        let a = face(0.0, 0.0, 0.2, 0.2, 0.9);
        let b = face(0.5, 0.5, 0.7, 0.7, 0.9);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_nms_merges_overlapping_detections() {
        let kept = non_max_suppression(
            vec![
                face(0.11, 0.1, 0.5, 0.5, 0.8),
                face(0.1, 0.1, 0.5, 0.5, 0.95),
                face(0.6, 0.6, 0.9, 0.9, 0.75),
            ],
            0.3,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.95);
        assert_eq!(kept[1].score, 0.75);
    }

    #[test]
    fn test_crop_face_is_square_and_in_bounds() {
        let image = RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]));
        let crop = crop_face(&image, &face(0.25, 0.2, 0.45, 0.8, 0.9)).unwrap();
        assert_eq!(crop.width(), crop.height());
        assert_eq!(crop.width(), 60);
    }

    #[test]
    fn test_crop_face_clamps_at_edges() {
        let image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let crop = crop_face(&image, &face(0.0, 0.0, 0.4, 0.4, 0.9)).unwrap();
        assert!(crop.width() <= 100 && crop.height() <= 100);
        assert_eq!(crop.dimensions(), (40, 40));
    }

    #[test]
    fn test_crop_face_degenerate_box() {
        let image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        assert!(crop_face(&image, &face(0.5, 0.5, 0.5, 0.5, 0.9)).is_none());
    }

    #[test]
    fn test_image_tensor_layout() {
        let image = RgbImage::from_pixel(8, 8, Rgb([255, 127, 0]));
        let tensor = image_tensor(&image, 4, 2, 127.0, 128.0);
        assert_eq!(tensor.shape(), &[1, 3, 2, 4]);
        let values = tensor.as_slice::<f32>().unwrap();
        assert!((values[0] - 1.0).abs() < 1e-6);
        assert_eq!(values[8], 0.0);
        assert!((values[16] + 127.0 / 128.0).abs() < 1e-6);
    }

    /// Returns fixed outputs after checking the input shape it was fed.
    struct FixedModel {
        input_shape: Vec<usize>,
        outputs: Vec<Tensor>,
    }

    impl ModelRunner for FixedModel {
        fn infer(&self, input: Tensor) -> TractResult<TVec<TValue>> {
            if input.shape() != self.input_shape.as_slice() {
                return Err(TractError::msg(format!(
                    "unexpected input shape {:?}, wanted {:?}",
                    input.shape(),
                    self.input_shape
                )));
            }
            Ok(self.outputs.iter().cloned().map(TValue::from).collect())
        }
    }

    fn small_config() -> Config {
        let mut config = Config::default();
        config.detector.input_width = 8;
        config.detector.input_height = 6;
        config.encoder.input_size = 4;
        config
    }

    fn fixed_detector(scores: &[f32], boxes: &[f32]) -> Box<dyn ModelRunner> {
        let anchors = scores.len() / 2;
        Box::new(FixedModel {
            input_shape: vec![1, 3, 6, 8],
            outputs: vec![
                Tensor::from_shape(&[1, anchors, 2], scores).unwrap(),
                Tensor::from_shape(&[1, anchors, 4], boxes).unwrap(),
            ],
        })
    }

    fn fixed_encoder(embedding: &[f32]) -> Box<dyn ModelRunner> {
        Box::new(FixedModel {
            input_shape: vec![1, 3, 4, 4],
            outputs: vec![Tensor::from_shape(&[1, embedding.len()], embedding).unwrap()],
        })
    }

    #[test]
    fn test_encode_one_face_yields_unit_encoding() {
        let detector = fixed_detector(
            &[0.9, 0.1, 0.05, 0.95],
            &[0.0, 0.0, 0.1, 0.1, 0.25, 0.25, 0.75, 0.75],
        );
        let pipeline = OnnxFaceEncoder::with_runners(
            detector,
            fixed_encoder(&[3.0, 0.0, 4.0, 0.0]),
            &small_config(),
        );
        let image = RgbImage::from_pixel(40, 40, Rgb([120, 110, 100]));

        let encodings = pipeline.encode(&image).unwrap();
        assert_eq!(encodings.len(), 1);
        let values = encodings[0].as_slice();
        assert_eq!(values.len(), 4);
        assert!((values[0] - 0.6).abs() < 1e-6);
        assert!((values[2] - 0.8).abs() < 1e-6);
        let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_encode_without_detections_is_empty() {
        let detector = fixed_detector(&[0.9, 0.1], &[0.1, 0.1, 0.5, 0.5]);
        let pipeline = OnnxFaceEncoder::with_runners(
            detector,
            fixed_encoder(&[1.0, 0.0]),
            &small_config(),
        );
        let image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        assert!(pipeline.encode(&image).unwrap().is_empty());
    }

    #[test]
    fn test_encode_two_separate_faces() {
        let detector = fixed_detector(
            &[0.1, 0.9, 0.2, 0.8],
            &[0.0, 0.0, 0.3, 0.3, 0.6, 0.6, 0.9, 0.9],
        );
        let pipeline = OnnxFaceEncoder::with_runners(
            detector,
            fixed_encoder(&[0.0, 2.0]),
            &small_config(),
        );
        let image = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        assert_eq!(pipeline.encode(&image).unwrap().len(), 2);
    }

    #[test]
    fn test_detector_with_single_output_is_error() {
        let detector = Box::new(FixedModel {
            input_shape: vec![1, 3, 6, 8],
            outputs: vec![Tensor::from_shape(&[1, 1, 2], &[0.1f32, 0.9]).unwrap()],
        });
        let pipeline = OnnxFaceEncoder::with_runners(
            detector,
            fixed_encoder(&[1.0]),
            &small_config(),
        );
        let image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let err = pipeline.encode(&image).unwrap_err();
        assert!(err.to_string().contains("expected scores and boxes"));
    }

    #[test]
    fn test_empty_embedding_is_error() {
        let detector = fixed_detector(&[0.0, 1.0], &[0.2, 0.2, 0.8, 0.8]);
        let pipeline =
            OnnxFaceEncoder::with_runners(detector, fixed_encoder(&[]), &small_config());
        let image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let err = pipeline.encode(&image).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Inference failed: encoder produced an empty embedding"
        );
    }

    #[test]
    fn test_missing_model_reports_path() {
        let err = load_plan(Path::new("/nonexistent/detector.onnx"), [1, 3, 240, 320])
            .err()
            .unwrap();
        assert!(matches!(err, EncoderError::ModelMissing(_)));
        assert_eq!(err.to_string(), "Model not found: /nonexistent/detector.onnx");
    }
}
