//! In-process face encoder: SCRFD detection + ArcFace recognition on ONNX
//! Runtime.
//!
//! Sessions need `&mut` to run, so each sits behind a mutex. Inference runs
//! on tokio's blocking pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use ort::session::Session;
use ort::value::Value;

use super::geometry::{
    crop_face, decode_stride, l2_normalize, letterbox, match_detector_heads, non_max_suppression,
    recognizer_input, FaceBox, DETECTOR_INPUT_SIZE, NMS_IOU_THRESHOLD, RECOGNIZER_INPUT_SIZE,
};
use super::{EncoderError, FaceEncoder};
use crate::descriptor::FaceDescriptor;

#[derive(Clone)]
pub struct OnnxEncoder {
    detector: Arc<Mutex<Session>>,
    recognizer: Arc<Mutex<Session>>,
    score_threshold: f32,
}

fn model_err(context: &str, e: impl std::fmt::Display) -> EncoderError {
    EncoderError::Model(format!("{context}: {e}"))
}

impl OnnxEncoder {
    /// Load both models from disk.
    pub fn load(
        detector_model: &Path,
        recognizer_model: &Path,
        score_threshold: f32,
    ) -> Result<Self, EncoderError> {
        for path in [detector_model, recognizer_model] {
            if !path.exists() {
                return Err(EncoderError::Model(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let detector = Session::builder()
            .and_then(|b| b.commit_from_file(detector_model))
            .map_err(|e| model_err("failed to load detector", e))?;
        let recognizer = Session::builder()
            .and_then(|b| b.commit_from_file(recognizer_model))
            .map_err(|e| model_err("failed to load recognizer", e))?;

        tracing::info!(
            detector = %detector_model.display(),
            recognizer = %recognizer_model.display(),
            "Face models loaded",
        );

        Ok(Self {
            detector: Arc::new(Mutex::new(detector)),
            recognizer: Arc::new(Mutex::new(recognizer)),
            score_threshold,
        })
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceBox>, EncoderError> {
        let input = letterbox(image, DETECTOR_INPUT_SIZE);
        let size = i64::from(DETECTOR_INPUT_SIZE);
        let tensor = Value::from_array(([1i64, 3, size, size].to_vec(), input.data))
            .map_err(|e| model_err("detector input", e))?;

        let mut session = self
            .detector
            .lock()
            .map_err(|_| EncoderError::Model("detector session poisoned".into()))?;
        let input_name = session.inputs[0].name.clone();
        let outputs = session
            .run(ort::inputs![input_name => tensor])
            .map_err(|e| model_err("detector inference", e))?;

        let shapes: Vec<(String, Vec<usize>)> = outputs
            .iter()
            .filter_map(|(name, value)| {
                let (shape, _) = value.try_extract_tensor::<f32>().ok()?;
                let dims = shape.iter().map(|&d| usize::try_from(d).unwrap_or(0)).collect();
                Some((name.to_string(), dims))
            })
            .collect();
        let heads = match_detector_heads(&shapes, DETECTOR_INPUT_SIZE);
        if heads.is_empty() {
            return Err(EncoderError::Model(format!(
                "detector outputs do not match SCRFD score/box heads: {shapes:?}"
            )));
        }

        let mut boxes = Vec::new();
        for head in heads {
            let (Some(scores), Some(distances)) =
                (outputs.get(&head.scores), outputs.get(&head.boxes))
            else {
                return Err(EncoderError::Model(format!(
                    "detector output for stride {} is missing",
                    head.stride
                )));
            };
            let (_, scores) = scores
                .try_extract_tensor::<f32>()
                .map_err(|e| model_err("detector scores", e))?;
            let (_, distances) = distances
                .try_extract_tensor::<f32>()
                .map_err(|e| model_err("detector boxes", e))?;
            boxes.extend(decode_stride(
                scores,
                distances,
                head.stride,
                DETECTOR_INPUT_SIZE,
                input.scale,
                self.score_threshold,
                (image.width(), image.height()),
            ));
        }

        Ok(non_max_suppression(boxes, NMS_IOU_THRESHOLD))
    }

    fn embed(&self, crop: &DynamicImage) -> Result<Option<Vec<f32>>, EncoderError> {
        let size = i64::from(RECOGNIZER_INPUT_SIZE);
        let tensor = Value::from_array(([1i64, 3, size, size].to_vec(), recognizer_input(crop)))
            .map_err(|e| model_err("recognizer input", e))?;

        let mut session = self
            .recognizer
            .lock()
            .map_err(|_| EncoderError::Model("recognizer session poisoned".into()))?;
        let input_name = session.inputs[0].name.clone();
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| EncoderError::Model("recognizer has no outputs".into()))?;
        let outputs = session
            .run(ort::inputs![input_name => tensor])
            .map_err(|e| model_err("recognizer inference", e))?;

        let value = outputs
            .get(&output_name)
            .ok_or_else(|| EncoderError::Model(format!("missing output '{output_name}'")))?;
        let (_, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| model_err("recognizer output", e))?;

        let mut embedding = data.to_vec();
        Ok(l2_normalize(&mut embedding).then_some(embedding))
    }

    fn encode_blocking(&self, path: &Path) -> Result<Option<FaceDescriptor>, EncoderError> {
        if !path.exists() {
            return Err(EncoderError::ImageNotFound(path.to_string_lossy().to_string()));
        }
        let image = image::open(path)?;

        let Some(first) = self.detect(&image)?.into_iter().next() else {
            return Ok(None);
        };
        let Some(crop) = crop_face(&image, &first) else {
            return Ok(None);
        };
        match self.embed(&crop)? {
            Some(embedding) => Ok(Some(FaceDescriptor::from_f32(&embedding)?)),
            None => Ok(None),
        }
    }
}

impl FaceEncoder for OnnxEncoder {
    async fn encode(&self, image_path: &Path) -> Result<Option<FaceDescriptor>, EncoderError> {
        let encoder = self.clone();
        let path: PathBuf = image_path.to_path_buf();
        tokio::task::spawn_blocking(move || encoder.encode_blocking(&path))
            .await
            .map_err(|e| EncoderError::Model(format!("inference task failed: {e}")))?
    }
}
