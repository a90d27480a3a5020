use crate::shared::frame::Frame;

/// How stored pixels must be transformed to appear upright.
///
/// Variants follow the EXIF orientation tag (values 1 through 8).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    LeftMirrored,
    Right,
    RightMirrored,
    Left,
}

impl Orientation {
    pub fn from_exif(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            2 => Some(Self::UpMirrored),
            3 => Some(Self::Down),
            4 => Some(Self::DownMirrored),
            5 => Some(Self::LeftMirrored),
            6 => Some(Self::Right),
            7 => Some(Self::RightMirrored),
            8 => Some(Self::Left),
            _ => None,
        }
    }

    pub fn to_exif(self) -> u8 {
        match self {
            Self::Up => 1,
            Self::UpMirrored => 2,
            Self::Down => 3,
            Self::DownMirrored => 4,
            Self::LeftMirrored => 5,
            Self::Right => 6,
            Self::RightMirrored => 7,
            Self::Left => 8,
        }
    }

    /// True for the quarter-turn orientations, where upright width is stored height.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::LeftMirrored | Self::Right | Self::RightMirrored | Self::Left
        )
    }

    /// Source pixel for upright output pixel `(x, y)`, given stored dimensions `(w, h)`.
    fn source_of(self, x: u32, y: u32, w: u32, h: u32) -> (u32, u32) {
        match self {
            Self::Up => (x, y),
            Self::UpMirrored => (w - 1 - x, y),
            Self::Down => (w - 1 - x, h - 1 - y),
            Self::DownMirrored => (x, h - 1 - y),
            Self::LeftMirrored => (y, x),
            Self::Right => (y, h - 1 - x),
            Self::RightMirrored => (w - 1 - y, h - 1 - x),
            Self::Left => (w - 1 - y, x),
        }
    }
}

/// Re-renders `frame` into upright pixel order.
///
/// Upright frames are returned untouched. Otherwise the pixels are remapped
/// at the same scale and channel count (alpha survives), and the result is
/// tagged [`Orientation::Up`].
pub fn normalize(frame: Frame) -> Frame {
    let orientation = frame.orientation();
    if orientation == Orientation::Up {
        return frame;
    }

    let (w, h) = (frame.width(), frame.height());
    let channels = frame.channels() as usize;
    let (out_w, out_h) = if orientation.swaps_axes() { (h, w) } else { (w, h) };

    let src = frame.data();
    let mut data = Vec::with_capacity(src.len());
    for y in 0..out_h {
        for x in 0..out_w {
            let (sx, sy) = orientation.source_of(x, y, w, h);
            let offset = (sy as usize * w as usize + sx as usize) * channels;
            data.extend_from_slice(&src[offset..offset + channels]);
        }
    }

    Frame::new(
        data,
        out_w,
        out_h,
        frame.channels(),
        Orientation::Up,
        frame.scale(),
    )
}
