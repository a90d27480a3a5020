use std::collections::HashMap;

use crate::segmentation::domain::instance_mask::{float_label, InstanceId, InstanceMask, MaskRaster};

/// Picks the known instance covering the most mask pixels.
///
/// - Returns `None` when `known` holds no id other than background (0).
/// - Background is never selected. Pixels labeled 0 or with an id outside
///   `known` are ignored.
/// - Ties go to the id appearing first in `known`.
/// - If the raster encoding is unreadable, or no pixel matches any known id,
///   falls back to the first non-background id in `known`.
///
/// Single pass over the mask, O(distinct ids) extra space.
pub fn select_largest(mask: &InstanceMask, known: &[InstanceId]) -> Option<InstanceId> {
    let first = known.iter().copied().find(|id| !id.is_background())?;

    let counts = match count_known_labels(mask, known) {
        Some(counts) => counts,
        None => {
            log::warn!(
                "Cannot read {} instance mask; falling back to instance {first}",
                mask.raster().format_name()
            );
            return Some(first);
        }
    };

    let mut best: Option<(InstanceId, usize)> = None;
    for &id in known {
        let count = counts.get(&id.0).copied().unwrap_or(0);
        log::debug!("Instance {id}: {count} px");
        if count > 0 && best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((id, count));
        }
    }

    match best {
        Some((id, _)) => Some(id),
        None => {
            log::warn!("No mask pixels matched a known instance; falling back to instance {first}");
            Some(first)
        }
    }
}

/// Pixel counts for the nonzero known labels, or `None` for unreadable encodings.
fn count_known_labels(mask: &InstanceMask, known: &[InstanceId]) -> Option<HashMap<u32, usize>> {
    let mut counts: HashMap<u32, usize> = known
        .iter()
        .filter(|id| !id.is_background())
        .map(|id| (id.0, 0))
        .collect();

    match mask.raster() {
        MaskRaster::U8(labels) => tally(labels.iter().map(|&l| Some(l as u32)), &mut counts),
        MaskRaster::U16(labels) => tally(labels.iter().map(|&l| Some(l as u32)), &mut counts),
        MaskRaster::F32(labels) => tally(labels.iter().map(|&l| float_label(l)), &mut counts),
        MaskRaster::Unsupported { .. } => return None,
    }
    Some(counts)
}

fn tally<I>(labels: I, counts: &mut HashMap<u32, usize>)
where
    I: Iterator<Item = Option<u32>>,
{
    for label in labels.flatten() {
        if let Some(count) = counts.get_mut(&label) {
            *count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ids(raw: &[u32]) -> Vec<InstanceId> {
        raw.iter().map(|&i| InstanceId(i)).collect()
    }

    fn u8_mask(width: u32, labels: Vec<u8>) -> InstanceMask {
        let height = labels.len() as u32 / width;
        InstanceMask::new(width, height, MaskRaster::U8(labels))
    }

    #[test]
    fn test_empty_known_set_returns_none() {
        let mask = u8_mask(2, vec![1, 1, 2, 2]);
        assert_eq!(select_largest(&mask, &[]), None);
    }

    #[test]
    fn test_picks_strictly_largest() {
        let mask = u8_mask(4, vec![1, 2, 2, 2, 0, 0, 1, 3]);
        assert_eq!(select_largest(&mask, &ids(&[1, 2, 3])), Some(InstanceId(2)));
    }

    #[rstest]
    #[case::first_listed_wins(vec![1, 2], 1)]
    #[case::order_not_value(vec![2, 1], 2)]
    fn test_ties_resolve_to_enumeration_order(#[case] known: Vec<u32>, #[case] expected: u32) {
        let mask = u8_mask(4, vec![1, 1, 2, 2]);
        assert_eq!(select_largest(&mask, &ids(&known)), Some(InstanceId(expected)));
    }

    #[test]
    fn test_all_background_falls_back_to_first_known() {
        let mask = u8_mask(3, vec![0; 9]);
        assert_eq!(select_largest(&mask, &ids(&[5, 4])), Some(InstanceId(5)));
    }

    #[test]
    fn test_labels_outside_known_set_are_ignored() {
        // Label 9 dominates but was never reported as an instance.
        let mask = u8_mask(4, vec![9, 9, 9, 9, 9, 1, 2, 2]);
        assert_eq!(select_largest(&mask, &ids(&[1, 2])), Some(InstanceId(2)));
    }

    #[test]
    fn test_only_unknown_labels_falls_back() {
        let mask = u8_mask(2, vec![7, 7, 7, 7]);
        assert_eq!(select_largest(&mask, &ids(&[3, 1])), Some(InstanceId(3)));
    }

    #[test]
    fn test_fallback_skips_background() {
        let mask = u8_mask(2, vec![0; 4]);
        assert_eq!(select_largest(&mask, &ids(&[0, 1])), Some(InstanceId(1)));
    }

    #[test]
    fn test_background_only_known_set_returns_none() {
        let mask = u8_mask(2, vec![0; 4]);
        assert_eq!(select_largest(&mask, &ids(&[0])), None);
    }

    #[test]
    fn test_background_in_known_set_is_never_counted() {
        let mask = u8_mask(4, vec![0, 0, 0, 1]);
        assert_eq!(select_largest(&mask, &ids(&[0, 1])), Some(InstanceId(1)));
    }

    #[test]
    fn test_u16_labels() {
        let mask = InstanceMask::new(3, 1, MaskRaster::U16(vec![300, 300, 2]));
        assert_eq!(select_largest(&mask, &ids(&[2, 300])), Some(InstanceId(300)));
    }

    #[test]
    fn test_f32_labels_are_rounded() {
        let mask = InstanceMask::new(5, 1, MaskRaster::F32(vec![0.9, 1.2, 1.8, 2.4, 0.1]));
        // 0.9 -> 1, 1.2 -> 1, 1.8 -> 2, 2.4 -> 2, 0.1 -> 0: tie, first listed wins
        assert_eq!(select_largest(&mask, &ids(&[2, 1])), Some(InstanceId(2)));

        let mask = InstanceMask::new(4, 1, MaskRaster::F32(vec![0.9, 1.2, 1.4, 2.4]));
        assert_eq!(select_largest(&mask, &ids(&[2, 1])), Some(InstanceId(1)));
    }

    #[test]
    fn test_unsupported_encoding_falls_back_to_first_known() {
        let mask = InstanceMask::new(
            2,
            2,
            MaskRaster::Unsupported {
                format: "rgba8".into(),
            },
        );
        assert_eq!(select_largest(&mask, &ids(&[4, 2])), Some(InstanceId(4)));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let mask = u8_mask(5, vec![1, 2, 2, 3, 3, 3, 2, 1, 3, 0]);
        let known = ids(&[1, 2, 3]);
        let first = select_largest(&mask, &known);
        for _ in 0..10 {
            assert_eq!(select_largest(&mask, &known), first);
        }
        assert_eq!(first, Some(InstanceId(3)));
    }

    #[test]
    fn test_forty_percent_beats_ten_percent() {
        let mut labels = vec![0u8; 100];
        labels[..10].fill(1);
        labels[50..90].fill(2);
        let mask = u8_mask(10, labels);
        assert_eq!(select_largest(&mask, &ids(&[1, 2])), Some(InstanceId(2)));
    }
}
