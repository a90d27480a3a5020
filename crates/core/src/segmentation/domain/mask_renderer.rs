use crate::segmentation::domain::instance_mask::InstanceId;
use crate::segmentation::domain::subject_segmenter::{MaskedRaster, Segmentation, SegmentationError};
use crate::shared::pixel_rect::PixelRect;

/// Row alignment of rendered rasters, in bytes.
const ROW_ALIGNMENT: usize = 64;

/// Renders one instance of `segmentation` over its source frame.
///
/// Output is BGRA at source resolution. Pixels of `instance` keep their color
/// with alpha taken from the matte (or fully opaque without one, scaled by
/// any source alpha); everything else is `0, 0, 0, 0`. The cropped variant is
/// cut from the full render along the bounding box of its visible pixels, so
/// both variants agree byte for byte.
pub fn render(
    segmentation: &Segmentation,
    instance: InstanceId,
    crop_to_extent: bool,
) -> Result<MaskedRaster, SegmentationError> {
    if instance.is_background() || !segmentation.instances.contains(&instance) {
        return Err(SegmentationError::UnknownInstance(instance));
    }

    let mask = &segmentation.mask;
    let membership = mask
        .membership(instance)
        .ok_or_else(|| SegmentationError::UnsupportedMask(mask.raster().format_name().into()))?;

    let source = &segmentation.source;
    let (w, h) = (source.width(), source.height());
    let channels = source.channels() as usize;
    let pixels = source.data();
    let bytes_per_row = aligned_row_bytes(w);

    let mut data = vec![0u8; bytes_per_row * h as usize];
    let mut min = (u32::MAX, u32::MAX);
    let mut max = (0u32, 0u32);
    let mut any_visible = false;

    for y in 0..h {
        let row = &mut data[y as usize * bytes_per_row..];
        for x in 0..w {
            let mi = mask.map_from(x, y, w, h);
            if !membership[mi] {
                continue;
            }

            let src = &pixels[(y as usize * w as usize + x as usize) * channels..][..channels];
            let mut alpha = segmentation.matte.as_ref().map_or(255, |m| m.alpha_at(mi));
            if channels == 4 {
                alpha = ((alpha as u16 * src[3] as u16 + 127) / 255) as u8;
            }
            if alpha == 0 {
                continue;
            }

            let out = &mut row[x as usize * 4..x as usize * 4 + 4];
            out.copy_from_slice(&[src[2], src[1], src[0], alpha]);

            any_visible = true;
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
        }
    }

    if !any_visible {
        return Err(SegmentationError::EmptyInstance(instance));
    }

    let full = MaskedRaster {
        width: w,
        height: h,
        bytes_per_row,
        data,
        extent: PixelRect::full(w, h),
    };

    if !crop_to_extent {
        return Ok(full);
    }
    let bounds = PixelRect::new(min.0, min.1, max.0 - min.0 + 1, max.1 - min.1 + 1);
    Ok(crop(&full, bounds))
}

fn aligned_row_bytes(width: u32) -> usize {
    let raw = width as usize * 4;
    raw.div_ceil(ROW_ALIGNMENT) * ROW_ALIGNMENT
}

fn crop(full: &MaskedRaster, bounds: PixelRect) -> MaskedRaster {
    let bytes_per_row = aligned_row_bytes(bounds.width);
    let row_len = bounds.width as usize * 4;
    let mut data = vec![0u8; bytes_per_row * bounds.height as usize];

    for (dst_row, y) in (bounds.y..bounds.bottom()).enumerate() {
        let src_start = y as usize * full.bytes_per_row + bounds.x as usize * 4;
        let dst_start = dst_row * bytes_per_row;
        data[dst_start..dst_start + row_len]
            .copy_from_slice(&full.data[src_start..src_start + row_len]);
    }

    MaskedRaster {
        width: bounds.width,
        height: bounds.height,
        bytes_per_row,
        data,
        extent: bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::domain::instance_mask::{InstanceMask, MaskRaster, Matte};
    use crate::shared::frame::Frame;

    /// 4x3 RGB frame where every pixel is (x, y, 7).
    fn source() -> Frame {
        let mut data = Vec::new();
        for y in 0..3u8 {
            for x in 0..4u8 {
                data.extend_from_slice(&[x, y, 7]);
            }
        }
        Frame::rgb(data, 4, 3)
    }

    fn segmentation(labels: Vec<u8>, matte: Option<Matte>) -> Segmentation {
        Segmentation {
            source: source(),
            instances: vec![InstanceId(1), InstanceId(2)],
            mask: InstanceMask::new(4, 3, MaskRaster::U8(labels)),
            matte,
        }
    }

    fn labels() -> Vec<u8> {
        vec![
            0, 0, 0, 0, //
            0, 1, 1, 2, //
            0, 1, 0, 2,
        ]
    }

    fn pixel(raster: &MaskedRaster, x: u32, y: u32) -> [u8; 4] {
        let i = y as usize * raster.bytes_per_row + x as usize * 4;
        [
            raster.data[i],
            raster.data[i + 1],
            raster.data[i + 2],
            raster.data[i + 3],
        ]
    }

    #[test]
    fn test_full_render_masks_other_pixels() {
        let r = render(&segmentation(labels(), None), InstanceId(1), false).unwrap();
        assert_eq!((r.width, r.height), (4, 3));
        assert_eq!(r.extent, PixelRect::full(4, 3));
        assert_eq!(pixel(&r, 1, 1), [7, 1, 1, 255]); // BGRA of (1, 1, 7)
        assert_eq!(pixel(&r, 1, 2), [7, 2, 1, 255]);
        assert_eq!(pixel(&r, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&r, 3, 1), [0, 0, 0, 0]); // instance 2
    }

    #[test]
    fn test_rows_are_aligned() {
        let r = render(&segmentation(labels(), None), InstanceId(1), false).unwrap();
        assert_eq!(r.bytes_per_row % ROW_ALIGNMENT, 0);
        assert!(r.bytes_per_row >= 16);
    }

    #[test]
    fn test_cropped_render_is_tight() {
        let r = render(&segmentation(labels(), None), InstanceId(1), true).unwrap();
        assert_eq!(r.extent, PixelRect::new(1, 1, 2, 2));
        assert_eq!((r.width, r.height), (2, 2));
        assert_eq!(pixel(&r, 0, 0), [7, 1, 1, 255]);
        assert_eq!(pixel(&r, 1, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn test_cropped_matches_full_subregion() {
        let seg = segmentation(labels(), None);
        for id in [InstanceId(1), InstanceId(2)] {
            let full = render(&seg, id, false).unwrap();
            let cropped = render(&seg, id, true).unwrap();
            assert!(full.extent.contains_rect(&cropped.extent));
            for y in 0..cropped.height {
                for x in 0..cropped.width {
                    assert_eq!(
                        pixel(&cropped, x, y),
                        pixel(&full, x + cropped.extent.x, y + cropped.extent.y)
                    );
                }
            }
        }
    }

    #[test]
    fn test_matte_sets_alpha() {
        let mut values = vec![0.0; 12];
        values[5] = 0.5;
        values[6] = 1.0;
        values[9] = 0.0; // labeled 1 but fully transparent in the matte
        let seg = segmentation(labels(), Some(Matte::new(values)));

        let r = render(&seg, InstanceId(1), true).unwrap();
        assert_eq!(r.extent, PixelRect::new(1, 1, 2, 1));
        assert_eq!(pixel(&r, 0, 0)[3], 128);
        assert_eq!(pixel(&r, 1, 0)[3], 255);
    }

    #[test]
    fn test_low_resolution_mask_is_upsampled() {
        let mut seg = segmentation(labels(), None);
        // 2x1 mask: left half is instance 1, right half instance 2.
        seg.mask = InstanceMask::new(2, 1, MaskRaster::U8(vec![1, 2]));
        let r = render(&seg, InstanceId(2), true).unwrap();
        assert_eq!(r.extent, PixelRect::new(2, 0, 2, 3));
    }

    #[test]
    fn test_source_alpha_is_respected() {
        let mut seg = segmentation(vec![1; 12], None);
        let mut data = vec![9u8; 4 * 3 * 4];
        for px in data.chunks_exact_mut(4) {
            px[3] = 0;
        }
        data[3] = 255; // only (0, 0) visible
        seg.source = Frame::rgba(data, 4, 3);

        let r = render(&seg, InstanceId(1), true).unwrap();
        assert_eq!(r.extent, PixelRect::new(0, 0, 1, 1));
    }

    #[test]
    fn test_unknown_instance_is_rejected() {
        let err = render(&segmentation(labels(), None), InstanceId(9), false).unwrap_err();
        assert!(matches!(err, SegmentationError::UnknownInstance(InstanceId(9))));
    }

    #[test]
    fn test_background_is_rejected() {
        let err = render(&segmentation(labels(), None), InstanceId(0), true).unwrap_err();
        assert!(matches!(err, SegmentationError::UnknownInstance(_)));
    }

    #[test]
    fn test_instance_without_pixels_is_empty() {
        let err = render(&segmentation(vec![0; 12], None), InstanceId(1), true).unwrap_err();
        assert!(matches!(err, SegmentationError::EmptyInstance(InstanceId(1))));
    }

    #[test]
    fn test_unsupported_mask_encoding() {
        let mut seg = segmentation(labels(), None);
        seg.mask = InstanceMask::new(
            4,
            3,
            MaskRaster::Unsupported {
                format: "rgba8".into(),
            },
        );
        let err = render(&seg, InstanceId(1), false).unwrap_err();
        assert!(matches!(err, SegmentationError::UnsupportedMask(f) if f == "rgba8"));
    }
}
