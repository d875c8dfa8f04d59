//! Image preprocessing and box post-processing for SCRFD + ArcFace models.
//!
//! Kept free of any inference runtime so it compiles and is tested without
//! the `onnx` feature.

use image::imageops::FilterType;
use image::DynamicImage;

/// Square input edge of the SCRFD detector.
pub const DETECTOR_INPUT_SIZE: u32 = 640;

/// Square input edge of the ArcFace recognizer.
pub const RECOGNIZER_INPUT_SIZE: u32 = 112;

/// Feature-map strides of the SCRFD heads.
pub const DETECTOR_STRIDES: [u32; 3] = [8, 16, 32];

/// IoU above which overlapping detections are merged.
pub const NMS_IOU_THRESHOLD: f32 = 0.4;

/// A detected face box in original-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl FaceBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// Detector input tensor plus the scale used to map boxes back.
#[derive(Debug, Clone)]
pub struct Letterboxed {
    /// NCHW, BGR, normalised with `(v - 127.5) / 128`.
    pub data: Vec<f32>,
    /// Factor applied to the original image (`input / max(w, h)`).
    pub scale: f32,
}

/// Resize to fit `size x size` keeping aspect ratio, pad bottom/right with
/// black, and lay out as a BGR NCHW tensor.
pub fn letterbox(image: &DynamicImage, size: u32) -> Letterboxed {
    let (w, h) = (image.width().max(1) as f32, image.height().max(1) as f32);
    let scale = size as f32 / w.max(h);
    let nw = ((w * scale) as u32).clamp(1, size);
    let nh = ((h * scale) as u32).clamp(1, size);

    let resized = image.resize_exact(nw, nh, FilterType::Triangle).to_rgb8();
    let plane = (size * size) as usize;
    // Padding is black: (0 - 127.5) / 128.
    let mut data = vec![-127.5 / 128.0; 3 * plane];

    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = (y * size + x) as usize;
        for (channel, value) in [pixel[2], pixel[1], pixel[0]].into_iter().enumerate() {
            data[channel * plane + offset] = (value as f32 - 127.5) / 128.0;
        }
    }

    Letterboxed { data, scale }
}

/// Decode one SCRFD stride head into boxes above `score_threshold`.
///
/// `scores` has one value per anchor, `distances` four (left, top, right,
/// bottom, in stride units) per anchor. Anchors are laid out row-major over
/// the `input_size / stride` grid with `anchors_per_point` anchors per cell.
pub fn decode_stride(
    scores: &[f32],
    distances: &[f32],
    stride: u32,
    input_size: u32,
    scale: f32,
    score_threshold: f32,
    image_size: (u32, u32),
) -> Vec<FaceBox> {
    let grid = (input_size / stride) as usize;
    let points = grid * grid;
    if points == 0 || scores.is_empty() || scores.len() % points != 0 {
        return Vec::new();
    }
    let anchors_per_point = scores.len() / points;
    if distances.len() < scores.len() * 4 || scale <= 0.0 {
        return Vec::new();
    }

    let stride_f = stride as f32;
    let (img_w, img_h) = (image_size.0 as f32, image_size.1 as f32);
    let mut out = Vec::new();

    for point in 0..points {
        let cx = (point % grid) as f32 * stride_f;
        let cy = (point / grid) as f32 * stride_f;
        for anchor in 0..anchors_per_point {
            let idx = point * anchors_per_point + anchor;
            let score = scores[idx];
            if score < score_threshold {
                continue;
            }
            let d = &distances[idx * 4..idx * 4 + 4];
            out.push(FaceBox {
                x1: ((cx - d[0] * stride_f) / scale).clamp(0.0, img_w),
                y1: ((cy - d[1] * stride_f) / scale).clamp(0.0, img_h),
                x2: ((cx + d[2] * stride_f) / scale).clamp(0.0, img_w),
                y2: ((cy + d[3] * stride_f) / scale).clamp(0.0, img_h),
                score,
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Detector heads
// ---------------------------------------------------------------------------

/// Output names holding the scores and box distances of one stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorHead {
    pub stride: u32,
    pub scores: String,
    pub boxes: String,
}

/// Pair detector outputs, given as `(name, shape)`, into per-stride heads.
///
/// Outputs named `score_{stride}` / `bbox_{stride}` are used when present.
/// Otherwise heads are matched by shape: score tensors end in 1, box
/// tensors in 4, and the finest stride has the most anchors. Returns an
/// empty list when the outputs do not form a full set of heads.
pub fn match_detector_heads(outputs: &[(String, Vec<usize>)], input_size: u32) -> Vec<DetectorHead> {
    let has = |name: &str| outputs.iter().any(|(n, _)| n == name);
    let named: Vec<DetectorHead> = DETECTOR_STRIDES
        .iter()
        .filter_map(|&stride| {
            let scores = format!("score_{stride}");
            let boxes = format!("bbox_{stride}");
            (has(&scores) && has(&boxes)).then_some(DetectorHead {
                stride,
                scores,
                boxes,
            })
        })
        .collect();
    if !named.is_empty() {
        return named;
    }

    let scores = outputs_with_width(outputs, 1);
    let boxes = outputs_with_width(outputs, 4);
    if scores.len() != DETECTOR_STRIDES.len() || boxes.len() != DETECTOR_STRIDES.len() {
        return Vec::new();
    }

    let mut heads = Vec::with_capacity(DETECTOR_STRIDES.len());
    for ((&stride, (score_name, anchors)), (box_name, box_anchors)) in
        DETECTOR_STRIDES.iter().zip(scores).zip(boxes)
    {
        let grid = (input_size / stride) as usize;
        if anchors != box_anchors || grid == 0 || anchors % (grid * grid) != 0 {
            return Vec::new();
        }
        heads.push(DetectorHead {
            stride,
            scores: score_name.to_string(),
            boxes: box_name.to_string(),
        });
    }
    heads
}

/// Outputs whose last dimension is `width`, with their anchor counts,
/// largest first.
fn outputs_with_width(outputs: &[(String, Vec<usize>)], width: usize) -> Vec<(&str, usize)> {
    let mut found: Vec<(&str, usize)> = outputs
        .iter()
        .filter_map(|(name, shape)| {
            let (&last, _) = shape.split_last()?;
            let elements: usize = shape.iter().product();
            (last == width && elements > 0).then(|| (name.as_str(), elements / width))
        })
        .collect();
    found.sort_by(|a, b| b.1.cmp(&a.1));
    found
}

/// Intersection over union of two boxes.
pub fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = ix * iy;
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy NMS. Output is ordered by descending score, which is the
/// detector's ordering used to pick "the first face".
pub fn non_max_suppression(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<FaceBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Crop `face` out of `image`, clamped to the image bounds. `None` if the
/// clamped box is empty.
pub fn crop_face(image: &DynamicImage, face: &FaceBox) -> Option<DynamicImage> {
    let (w, h) = (image.width(), image.height());
    let x1 = (face.x1.max(0.0) as u32).min(w);
    let y1 = (face.y1.max(0.0) as u32).min(h);
    let x2 = (face.x2.max(0.0).ceil() as u32).min(w);
    let y2 = (face.y2.max(0.0).ceil() as u32).min(h);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(image.crop_imm(x1, y1, x2 - x1, y2 - y1))
}

/// Recognizer input: resized to 112x112, RGB NCHW, `(v - 127.5) / 128`.
pub fn recognizer_input(crop: &DynamicImage) -> Vec<f32> {
    let size = RECOGNIZER_INPUT_SIZE;
    let rgb = crop.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let plane = (size * size) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = (y * size + x) as usize;
        for channel in 0..3 {
            data[channel * plane + offset] = (pixel[channel] as f32 - 127.5) / 128.0;
        }
    }
    data
}

/// Scale `v` to unit length in place. Returns `false` for a zero vector.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON || !norm.is_finite() {
        return false;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    true
}
