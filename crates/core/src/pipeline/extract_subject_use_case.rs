use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::segmentation::domain::instance_mask::InstanceId;
use crate::segmentation::domain::instance_selector::select_largest;
use crate::segmentation::domain::subject_segmenter::{
    MaskedRaster, Segmentation, SegmentationError, SubjectSegmenter,
};
use crate::shared::error_kind::ErrorKind;
use crate::shared::frame::Frame;
use crate::shared::pixel_rect::PixelRect;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Invalid image.")]
    InvalidImage,
    #[error("No subject detected. Try a clearer photo.")]
    NoForegroundInstances,
    #[error("Subject detection failed: {0}")]
    SegmentationFailed(#[source] SegmentationError),
    #[error("Failed to generate the subject cutout.")]
    MaskGenerationFailed(#[source] SegmentationError),
    #[error("Failed to create the output image.")]
    OutputImageCreationFailed,
}

impl ExtractionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::InvalidImage => ErrorKind::InvalidInput,
            ExtractionError::NoForegroundInstances => ErrorKind::NoSubjectFound,
            ExtractionError::SegmentationFailed(_)
            | ExtractionError::MaskGenerationFailed(_)
            | ExtractionError::OutputImageCreationFailed => ErrorKind::RenderFailure,
        }
    }
}

/// An upright RGBA image of one subject, transparent everywhere else.
#[derive(Clone, Debug, PartialEq)]
pub struct Cutout {
    pub image: Frame,
    /// Region of the upright source canvas this image covers.
    pub extent: PixelRect,
}

impl Cutout {
    fn decode(raster: &MaskedRaster, scale: f32) -> Result<Self, ExtractionError> {
        let image = raster
            .decode(scale)
            .ok_or(ExtractionError::OutputImageCreationFailed)?;
        Ok(Self {
            image,
            extent: raster.extent,
        })
    }
}

/// Full-canvas and cropped cutouts of the same subject.
#[derive(Clone, Debug, PartialEq)]
pub struct CutoutPair {
    pub instance: InstanceId,
    pub full: Cutout,
    pub cropped: Cutout,
}

/// Isolates the largest foreground subject of a photo.
///
/// Segments once, picks the instance covering the most pixels, and renders it
/// from that single segmentation. The segmenter sits behind a mutex so one
/// extractor can serve several worker threads.
pub struct SubjectExtractor {
    segmenter: Mutex<Box<dyn SubjectSegmenter>>,
}

impl SubjectExtractor {
    pub fn new(segmenter: Box<dyn SubjectSegmenter>) -> Self {
        Self {
            segmenter: Mutex::new(segmenter),
        }
    }

    /// Both cutout variants of the largest subject, or nothing.
    pub fn extract_largest_subject(&self, frame: &Frame) -> Result<CutoutPair, ExtractionError> {
        let (instance, full, cropped) = {
            let mut segmenter = self.lock();
            let (segmentation, instance) = segment_and_select(&mut **segmenter, frame)?;
            let full = segmenter
                .masked_render(&segmentation, instance, false)
                .map_err(ExtractionError::MaskGenerationFailed)?;
            let cropped = segmenter
                .masked_render(&segmentation, instance, true)
                .map_err(ExtractionError::MaskGenerationFailed)?;
            (instance, full, cropped)
        };

        let pair = CutoutPair {
            instance,
            full: Cutout::decode(&full, frame.scale())?,
            cropped: Cutout::decode(&cropped, frame.scale())?,
        };
        log::info!(
            "Extracted subject {instance}: {}x{} at ({}, {})",
            pair.cropped.image.width(),
            pair.cropped.image.height(),
            pair.cropped.extent.x,
            pair.cropped.extent.y
        );
        Ok(pair)
    }

    /// Only the cropped cutout of the largest subject.
    pub fn extract_largest_subject_cutout(&self, frame: &Frame) -> Result<Cutout, ExtractionError> {
        let cropped = {
            let mut segmenter = self.lock();
            let (segmentation, instance) = segment_and_select(&mut **segmenter, frame)?;
            segmenter
                .masked_render(&segmentation, instance, true)
                .map_err(ExtractionError::MaskGenerationFailed)?
        };
        Cutout::decode(&cropped, frame.scale())
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn SubjectSegmenter>> {
        // A panic inside a previous call leaves the segmenter reusable.
        self.segmenter.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn segment_and_select(
    segmenter: &mut dyn SubjectSegmenter,
    frame: &Frame,
) -> Result<(Segmentation, InstanceId), ExtractionError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(ExtractionError::InvalidImage);
    }

    let segmentation = segmenter.segment(frame).map_err(|e| match e {
        SegmentationError::InvalidImage(reason) => {
            log::warn!("Frame rejected by segmenter: {reason}");
            ExtractionError::InvalidImage
        }
        other => ExtractionError::SegmentationFailed(other),
    })?;
    log::debug!("Segmentation found {} candidate(s)", segmentation.instances.len());

    if segmentation.instances.is_empty() {
        return Err(ExtractionError::NoForegroundInstances);
    }
    let instance = select_largest(&segmentation.mask, &segmentation.instances)
        .ok_or(ExtractionError::NoForegroundInstances)?;
    Ok((segmentation, instance))
}
