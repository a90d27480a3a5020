use std::path::Path;

use image::metadata::Orientation as ExifOrientation;
use image::{DynamicImage, ImageDecoder, ImageReader};

use crate::shared::frame::Frame;
use crate::shared::orientation::Orientation;

/// Decodes image files into frames.
///
/// Pixels are left in stored order; the EXIF orientation is recorded on the
/// frame so the segmenter can normalize it. Images with an alpha channel
/// decode to RGBA, everything else to RGB.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn read(path: &Path) -> Result<Frame, image::ImageError> {
        let mut decoder = ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()?;
        let orientation = decoder
            .orientation()
            .map(from_exif_orientation)
            .unwrap_or_default();
        let img = DynamicImage::from_decoder(decoder)?;
        log::debug!(
            "Decoded {}x{} {:?} image ({orientation:?}) from {}",
            img.width(),
            img.height(),
            img.color(),
            path.display()
        );
        Ok(frame_from_image(img, orientation))
    }
}

fn frame_from_image(img: DynamicImage, orientation: Orientation) -> Frame {
    let (w, h) = (img.width(), img.height());
    if img.color().has_alpha() {
        Frame::new(img.into_rgba8().into_raw(), w, h, 4, orientation, 1.0)
    } else {
        Frame::new(img.into_rgb8().into_raw(), w, h, 3, orientation, 1.0)
    }
}

fn from_exif_orientation(o: ExifOrientation) -> Orientation {
    match o {
        ExifOrientation::NoTransforms => Orientation::Up,
        ExifOrientation::FlipHorizontal => Orientation::UpMirrored,
        ExifOrientation::Rotate180 => Orientation::Down,
        ExifOrientation::FlipVertical => Orientation::DownMirrored,
        ExifOrientation::Rotate90FlipH => Orientation::LeftMirrored,
        ExifOrientation::Rotate90 => Orientation::Right,
        ExifOrientation::Rotate270FlipH => Orientation::RightMirrored,
        ExifOrientation::Rotate270 => Orientation::Left,
    }
}
