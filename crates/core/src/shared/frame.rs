use ndarray::ArrayView3;

use crate::shared::orientation::Orientation;

/// A decoded bitmap: contiguous RGB or RGBA bytes in row-major order.
///
/// `orientation` records how the stored pixels must be transformed to appear
/// upright; `scale` maps physical pixels to logical points. Format conversion
/// happens at I/O boundaries only.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    orientation: Orientation,
    scale: f32,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        orientation: Orientation,
        scale: f32,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            orientation,
            scale,
        }
    }

    /// Upright RGB frame at scale 1.0.
    pub fn rgb(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self::new(data, width, height, 3, Orientation::Up, 1.0)
    }

    /// Upright RGBA frame at scale 1.0.
    pub fn rgba(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self::new(data, width, height, 4, Orientation::Up, 1.0)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Size in logical points once the orientation has been applied.
    pub fn logical_size(&self) -> (f32, f32) {
        let (w, h) = if self.orientation.swaps_axes() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        (w as f32 / self.scale, h as f32 / self.scale)
    }

    /// Number of pixels whose alpha is non-zero. Frames without alpha are fully opaque.
    pub fn opaque_pixel_count(&self) -> usize {
        if !self.has_alpha() {
            return (self.width as usize) * (self.height as usize);
        }
        self.data.chunks_exact(4).filter(|px| px[3] > 0).count()
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
