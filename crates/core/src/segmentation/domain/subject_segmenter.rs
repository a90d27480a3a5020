use thiserror::Error;

use crate::segmentation::domain::instance_mask::{InstanceId, InstanceMask, Matte};
use crate::segmentation::domain::mask_renderer;
use crate::shared::error_kind::ErrorKind;
use crate::shared::frame::Frame;
use crate::shared::orientation::Orientation;
use crate::shared::pixel_rect::PixelRect;

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("image cannot be processed: {0}")]
    InvalidImage(String),
    #[error("segmentation model failed: {0}")]
    Inference(String),
    #[error("instance {0} is not part of this segmentation")]
    UnknownInstance(InstanceId),
    #[error("instance {0} covers no pixels")]
    EmptyInstance(InstanceId),
    #[error("instance mask encoding '{0}' cannot be rendered")]
    UnsupportedMask(String),
}

impl SegmentationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SegmentationError::InvalidImage(_) => ErrorKind::InvalidInput,
            SegmentationError::Inference(_)
            | SegmentationError::UnknownInstance(_)
            | SegmentationError::EmptyInstance(_)
            | SegmentationError::UnsupportedMask(_) => ErrorKind::RenderFailure,
        }
    }
}

/// Result of one segmentation pass over a frame.
///
/// Every masked render for this pass reads from this value, so the full and
/// cropped variants always come from identical mask data.
#[derive(Clone, Debug)]
pub struct Segmentation {
    /// Upright copy of the frame that was segmented.
    pub source: Frame,
    /// Candidate instance ids in enumeration order.
    pub instances: Vec<InstanceId>,
    pub mask: InstanceMask,
    pub matte: Option<Matte>,
}

/// Produces foreground instance masks and renders chosen instances.
///
/// Implementations may hold inference state, hence `&mut self` on `segment`.
pub trait SubjectSegmenter: Send {
    fn segment(&mut self, frame: &Frame) -> Result<Segmentation, SegmentationError>;

    /// Renders `instance` with every other pixel fully transparent.
    ///
    /// With `crop_to_extent`, the canvas shrinks to the instance's bounding box.
    fn masked_render(
        &self,
        segmentation: &Segmentation,
        instance: InstanceId,
        crop_to_extent: bool,
    ) -> Result<MaskedRaster, SegmentationError> {
        mask_renderer::render(segmentation, instance, crop_to_extent)
    }
}

/// Row-padded BGRA pixel buffer produced by a masked render.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskedRaster {
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: usize,
    pub data: Vec<u8>,
    /// Region of the source canvas this raster covers.
    pub extent: PixelRect,
}

impl MaskedRaster {
    /// Converts to an upright RGBA frame at `scale`, or `None` if the buffer is malformed.
    pub fn decode(&self, scale: f32) -> Option<Frame> {
        let row_len = self.width as usize * 4;
        if self.width == 0 || self.height == 0 || self.bytes_per_row < row_len {
            return None;
        }
        if self.data.len() < self.bytes_per_row * (self.height as usize - 1) + row_len {
            return None;
        }

        let mut rgba = Vec::with_capacity(row_len * self.height as usize);
        for row in self.data.chunks(self.bytes_per_row).take(self.height as usize) {
            for bgra in row[..row_len].chunks_exact(4) {
                rgba.extend_from_slice(&[bgra[2], bgra[1], bgra[0], bgra[3]]);
            }
        }
        Some(Frame::new(
            rgba,
            self.width,
            self.height,
            4,
            Orientation::Up,
            scale,
        ))
    }
}
