/// Salient-object segmenter using ONNX Runtime via `ort`.
///
/// Runs a U²-Net style matting model, thresholds the soft matte into a
/// foreground map and splits that map into instances with
/// [`ComponentLabeler`]. The matte is kept so renders get soft edges.
use std::path::Path;

use crate::segmentation::domain::instance_mask::Matte;
use crate::segmentation::domain::subject_segmenter::{
    Segmentation, SegmentationError, SubjectSegmenter,
};
use crate::shared::frame::Frame;
use crate::shared::orientation;

use super::component_labeler::ComponentLabeler;
use super::inference_device::InferenceDevice;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 320;

/// ImageNet channel statistics the matting model was trained with.
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

pub struct OnnxMatteSegmenter {
    session: ort::session::Session,
    labeler: ComponentLabeler,
    threshold: f32,
    input_size: u32,
}

impl OnnxMatteSegmenter {
    /// Load a matting model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 320 if the shape is dynamic or unreadable.
    pub fn new(
        model_path: &Path,
        device: InferenceDevice,
        threshold: f32,
        min_instance_area: u32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(device.execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("Matting model input size: {input_size}, device: {device}");

        Ok(Self {
            session,
            labeler: ComponentLabeler::new(min_instance_area),
            threshold,
            input_size,
        })
    }

    fn infer(&mut self, frame: &Frame) -> Result<(Vec<f32>, u32, u32), SegmentationError> {
        let input = preprocess(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(input).map_err(inference_error)?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(inference_error)?;
        if outputs.len() == 0 {
            return Err(SegmentationError::Inference(
                "matting model produced no outputs".into(),
            ));
        }

        // First output is the fused matte: [1, 1, H, W] or [1, H, W].
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(inference_error)?;
        let shape = tensor.shape().to_vec();
        if shape.len() < 2 {
            return Err(SegmentationError::Inference(format!(
                "unexpected matte shape {shape:?}"
            )));
        }
        let (h, w) = (shape[shape.len() - 2], shape[shape.len() - 1]);
        let raw: Vec<f32> = tensor.iter().copied().collect();
        if raw.len() != w * h {
            return Err(SegmentationError::Inference(format!(
                "unexpected matte shape {shape:?}"
            )));
        }
        Ok((normalize_matte(raw), w as u32, h as u32))
    }
}

impl SubjectSegmenter for OnnxMatteSegmenter {
    fn segment(&mut self, frame: &Frame) -> Result<Segmentation, SegmentationError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(SegmentationError::InvalidImage("frame has no pixels".into()));
        }
        if frame.channels() < 3 {
            return Err(SegmentationError::InvalidImage(format!(
                "unsupported channel count {}",
                frame.channels()
            )));
        }

        let upright = orientation::normalize(frame.clone());
        let (matte, w, h) = self.infer(&upright)?;

        let foreground: Vec<bool> = matte.iter().map(|&v| v > self.threshold).collect();
        let labeled = self.labeler.label(&foreground, w, h);
        log::debug!(
            "Matte {w}x{h}: {} instance(s), areas {:?}",
            labeled.instances.len(),
            labeled.areas
        );

        Ok(Segmentation {
            source: upright,
            instances: labeled.instances,
            mask: labeled.mask,
            matte: Some(Matte::new(matte)),
        })
    }
}

fn inference_error(e: impl std::fmt::Display) -> SegmentationError {
    SegmentationError::Inference(e.to_string())
}

// ---------------------------------------------------------------------------
// Pre/post-processing
// ---------------------------------------------------------------------------

/// Nearest-neighbor resize to `size` × `size`, ImageNet-normalized NCHW float32.
///
/// Alpha, if present, is ignored.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let s = size as usize;
    let (fw, fh) = (frame.width() as usize, frame.height() as usize);
    let pixels = frame.as_ndarray();

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for y in 0..s {
        let src_y = (y * fh / s).min(fh - 1);
        for x in 0..s {
            let src_x = (x * fw / s).min(fw - 1);
            for c in 0..3 {
                let value = pixels[[src_y, src_x, c]] as f32 / 255.0;
                tensor[[0, c, y, x]] = (value - MEAN[c]) / STD[c];
            }
        }
    }
    tensor
}

/// Min-max rescales the raw matte to 0.0..=1.0. A flat matte becomes all zeros.
fn normalize_matte(raw: Vec<f32>) -> Vec<f32> {
    let (min, max) = raw
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !range.is_finite() || range <= f32::EPSILON {
        return vec![0.0; raw.len()];
    }
    raw.into_iter().map(|v| (v - min) / range).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let frame = Frame::rgb(vec![255u8; 40 * 20 * 3], 40, 20);
        let tensor = preprocess(&frame, 16);
        assert_eq!(tensor.shape(), &[1, 3, 16, 16]);
        for c in 0..3 {
            assert_relative_eq!(
                tensor[[0, c, 8, 8]],
                (1.0 - MEAN[c]) / STD[c],
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn test_preprocess_ignores_alpha() {
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&[0, 0, 0, 255]);
        }
        let frame = Frame::rgba(data, 2, 2);
        let tensor = preprocess(&frame, 4);
        assert_relative_eq!(tensor[[0, 0, 3, 3]], -MEAN[0] / STD[0], epsilon = 1e-5);
    }

    #[test]
    fn test_preprocess_samples_nearest_pixel() {
        // 2x1 frame: left black, right white
        let frame = Frame::rgb(vec![0, 0, 0, 255, 255, 255], 2, 1);
        let tensor = preprocess(&frame, 4);
        assert!(tensor[[0, 0, 0, 0]] < 0.0);
        assert!(tensor[[0, 0, 0, 3]] > 0.0);
        assert!(tensor[[0, 0, 3, 1]] < 0.0);
        assert!(tensor[[0, 0, 3, 2]] > 0.0);
    }

    #[test]
    fn test_normalize_matte_rescales_range() {
        let matte = normalize_matte(vec![2.0, 4.0, 3.0]);
        assert_relative_eq!(matte[0], 0.0);
        assert_relative_eq!(matte[1], 1.0);
        assert_relative_eq!(matte[2], 0.5);
    }

    #[test]
    fn test_normalize_flat_matte_is_background() {
        assert_eq!(normalize_matte(vec![0.7; 4]), vec![0.0; 4]);
    }
}
