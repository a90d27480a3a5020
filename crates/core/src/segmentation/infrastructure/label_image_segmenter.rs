use std::collections::BTreeSet;
use std::path::Path;

use crate::segmentation::domain::instance_mask::{InstanceId, InstanceMask, MaskRaster};
use crate::segmentation::domain::subject_segmenter::{
    Segmentation, SegmentationError, SubjectSegmenter,
};
use crate::shared::frame::Frame;
use crate::shared::orientation;

/// Replays a precomputed label image as the segmentation of every frame.
///
/// Used when instance labels come from elsewhere (an external tool or a
/// hand-painted mask), and in tests that need deterministic instances
/// without loading a model. Candidate ids are the distinct nonzero labels in
/// ascending order. The label image may be smaller than the frame.
pub struct LabelImageSegmenter {
    mask: InstanceMask,
    instances: Vec<InstanceId>,
}

impl LabelImageSegmenter {
    pub fn new(mask: InstanceMask) -> Self {
        let instances = distinct_labels(&mask);
        Self { mask, instances }
    }

    /// Load an 8- or 16-bit grayscale label PNG.
    ///
    /// Other pixel formats load as an unsupported mask with no candidates.
    pub fn from_file(path: &Path) -> Result<Self, SegmentationError> {
        let img = image::open(path)
            .map_err(|e| SegmentationError::InvalidImage(format!("{}: {e}", path.display())))?;
        let (w, h) = (img.width(), img.height());
        let raster = match img {
            image::DynamicImage::ImageLuma8(buf) => MaskRaster::U8(buf.into_raw()),
            image::DynamicImage::ImageLuma16(buf) => MaskRaster::U16(buf.into_raw()),
            image::DynamicImage::ImageLumaA8(buf) => {
                MaskRaster::U8(buf.pixels().map(|p| p.0[0]).collect())
            }
            other => MaskRaster::Unsupported {
                format: format!("{:?}", other.color()),
            },
        };
        log::debug!(
            "Loaded {w}x{h} {} label image from {}",
            raster.format_name(),
            path.display()
        );
        Ok(Self::new(InstanceMask::new(w, h, raster)))
    }

    pub fn instances(&self) -> &[InstanceId] {
        &self.instances
    }
}

impl SubjectSegmenter for LabelImageSegmenter {
    fn segment(&mut self, frame: &Frame) -> Result<Segmentation, SegmentationError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(SegmentationError::InvalidImage("frame has no pixels".into()));
        }
        Ok(Segmentation {
            source: orientation::normalize(frame.clone()),
            instances: self.instances.clone(),
            mask: self.mask.clone(),
            matte: None,
        })
    }
}

fn distinct_labels(mask: &InstanceMask) -> Vec<InstanceId> {
    let labels: BTreeSet<u32> = match mask.raster() {
        MaskRaster::U8(v) => v.iter().map(|&l| l as u32).collect(),
        MaskRaster::U16(v) => v.iter().map(|&l| l as u32).collect(),
        MaskRaster::F32(v) => v
            .iter()
            .filter_map(|&l| crate::segmentation::domain::instance_mask::float_label(l))
            .collect(),
        MaskRaster::Unsupported { .. } => BTreeSet::new(),
    };
    labels
        .into_iter()
        .filter(|&l| l != 0)
        .map(InstanceId)
        .collect()
}
