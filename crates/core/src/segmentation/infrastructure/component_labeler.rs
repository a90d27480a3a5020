use std::collections::VecDeque;

use crate::segmentation::domain::instance_mask::{InstanceId, InstanceMask, MaskRaster};

/// Splits a binary foreground map into 4-connected instances.
///
/// Components smaller than `min_area` are dropped back to background.
/// Surviving components get ids `1..=n` in raster-scan discovery order.
pub struct ComponentLabeler {
    min_area: usize,
}

/// Output of [`ComponentLabeler::label`].
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledComponents {
    pub mask: InstanceMask,
    pub instances: Vec<InstanceId>,
    /// Pixel area of each entry in `instances`.
    pub areas: Vec<usize>,
}

impl ComponentLabeler {
    pub fn new(min_area: u32) -> Self {
        Self {
            min_area: (min_area as usize).max(1),
        }
    }

    pub fn label(&self, foreground: &[bool], width: u32, height: u32) -> LabeledComponents {
        let (w, h) = (width as usize, height as usize);
        debug_assert_eq!(foreground.len(), w * h, "foreground length must equal width * height");

        let mut labels = vec![0u16; w * h];
        let mut visited = vec![false; w * h];
        let mut instances = Vec::new();
        let mut areas = Vec::new();
        let mut queue = VecDeque::new();
        let mut component = Vec::new();

        for start in 0..w * h {
            if !foreground[start] || visited[start] {
                continue;
            }

            component.clear();
            visited[start] = true;
            queue.push_back(start);
            while let Some(i) = queue.pop_front() {
                component.push(i);
                let (x, y) = (i % w, i / w);
                let neighbors = [
                    (x > 0).then(|| i - 1),
                    (x + 1 < w).then(|| i + 1),
                    (y > 0).then(|| i - w),
                    (y + 1 < h).then(|| i + w),
                ];
                for n in neighbors.into_iter().flatten() {
                    if foreground[n] && !visited[n] {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                }
            }

            if component.len() < self.min_area {
                continue;
            }
            let Ok(id) = u16::try_from(instances.len() + 1) else {
                log::warn!("Instance limit reached; remaining components left unlabeled");
                break;
            };
            for &i in &component {
                labels[i] = id;
            }
            instances.push(InstanceId(id as u32));
            areas.push(component.len());
        }

        LabeledComponents {
            mask: InstanceMask::new(width, height, MaskRaster::U16(labels)),
            instances,
            areas,
        }
    }
}
