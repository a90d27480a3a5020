use std::fmt;

/// Identifier of one detected foreground instance.
///
/// `0` is reserved for background and is never a valid selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

impl InstanceId {
    pub const BACKGROUND: InstanceId = InstanceId(0);

    pub fn is_background(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage encoding of a label raster. Dispatched once per operation, never per pixel.
#[derive(Clone, Debug, PartialEq)]
pub enum MaskRaster {
    U8(Vec<u8>),
    U16(Vec<u16>),
    /// Labels stored as floats; rounded to the nearest integer before use.
    F32(Vec<f32>),
    /// An encoding this crate cannot read (e.g. packed multi-channel data).
    Unsupported { format: String },
}

impl MaskRaster {
    pub fn format_name(&self) -> &str {
        match self {
            MaskRaster::U8(_) => "u8",
            MaskRaster::U16(_) => "u16",
            MaskRaster::F32(_) => "f32",
            MaskRaster::Unsupported { format } => format,
        }
    }

    fn len(&self) -> Option<usize> {
        match self {
            MaskRaster::U8(v) => Some(v.len()),
            MaskRaster::U16(v) => Some(v.len()),
            MaskRaster::F32(v) => Some(v.len()),
            MaskRaster::Unsupported { .. } => None,
        }
    }
}

/// Converts a float label to an integer label; non-finite and negative values are unlabeled.
pub(crate) fn float_label(value: f32) -> Option<u32> {
    let rounded = value.round();
    if rounded.is_finite() && rounded >= 0.0 && rounded <= u32::MAX as f32 {
        Some(rounded as u32)
    } else {
        None
    }
}

/// Single-channel label raster: one instance label per pixel, 0 = background.
///
/// May be smaller than the frame it was computed from; callers map between
/// the two by normalized coordinates (see [`InstanceMask::map_from`]).
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceMask {
    width: u32,
    height: u32,
    raster: MaskRaster,
}

impl InstanceMask {
    pub fn new(width: u32, height: u32, raster: MaskRaster) -> Self {
        if let Some(len) = raster.len() {
            debug_assert_eq!(
                len,
                width as usize * height as usize,
                "mask length must equal width * height"
            );
        }
        Self {
            width,
            height,
            raster,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn raster(&self) -> &MaskRaster {
        &self.raster
    }

    /// Mask pixel index covering pixel `(x, y)` of a `frame_w` x `frame_h` canvas.
    pub fn map_from(&self, x: u32, y: u32, frame_w: u32, frame_h: u32) -> usize {
        let mx = (x as u64 * self.width as u64 / frame_w.max(1) as u64) as usize;
        let my = (y as u64 * self.height as u64 / frame_h.max(1) as u64) as usize;
        let mx = mx.min(self.width.saturating_sub(1) as usize);
        let my = my.min(self.height.saturating_sub(1) as usize);
        my * self.width as usize + mx
    }

    /// Per-pixel membership of `instance`, or `None` for unreadable encodings.
    pub fn membership(&self, instance: InstanceId) -> Option<Vec<bool>> {
        let id = instance.0;
        match &self.raster {
            MaskRaster::U8(labels) => Some(labels.iter().map(|&l| l as u32 == id).collect()),
            MaskRaster::U16(labels) => Some(labels.iter().map(|&l| l as u32 == id).collect()),
            MaskRaster::F32(labels) => Some(
                labels
                    .iter()
                    .map(|&l| float_label(l) == Some(id))
                    .collect(),
            ),
            MaskRaster::Unsupported { .. } => None,
        }
    }
}

/// Soft foreground probabilities (0.0..=1.0) at mask resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct Matte {
    values: Vec<f32>,
}

impl Matte {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Alpha byte for the mask pixel at `index`.
    pub fn alpha_at(&self, index: usize) -> u8 {
        let v = self.values.get(index).copied().unwrap_or(1.0);
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}
