use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashMap;

/// A connected foreground region that passed the area filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Region area in pixels
    pub area: u32,
}

/// Find connected foreground regions in a binary mask and keep those whose
/// pixel area strictly exceeds `min_area`. Each surviving region is reported
/// with its bounding rectangle.
pub fn extract_regions(mask: &GrayImage, min_area: u32) -> Vec<Region> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    struct Extent {
        area: u32,
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
    }

    let mut extents: HashMap<u32, Extent> = HashMap::new();

    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0];
        if label == 0 {
            continue;
        }

        extents
            .entry(label)
            .and_modify(|e| {
                e.area += 1;
                e.min_x = e.min_x.min(x);
                e.min_y = e.min_y.min(y);
                e.max_x = e.max_x.max(x);
                e.max_y = e.max_y.max(y);
            })
            .or_insert(Extent {
                area: 1,
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            });
    }

    let mut regions: Vec<Region> = extents
        .into_values()
        .filter(|e| e.area > min_area)
        .map(|e| Region {
            x: e.min_x,
            y: e.min_y,
            width: e.max_x - e.min_x + 1,
            height: e.max_y - e.min_y + 1,
            area: e.area,
        })
        .collect();

    // Deterministic ordering for overlay drawing and tests
    regions.sort_by_key(|r| (r.y, r.x));
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with_block(
        width: u32,
        height: u32,
        x0: u32,
        y0: u32,
        w: u32,
        h: u32,
    ) -> GrayImage {
        let mut mask = GrayImage::from_pixel(width, height, Luma([0]));
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask
    }

    #[test]
    fn test_empty_mask_has_no_regions() {
        let mask = GrayImage::from_pixel(64, 64, Luma([0]));
        assert!(extract_regions(&mask, 600).is_empty());
    }

    #[test]
    fn test_small_region_filtered() {
        // 20x20 = 400 px, below the 600 px threshold
        let mask = mask_with_block(64, 64, 10, 10, 20, 20);
        assert!(extract_regions(&mask, 600).is_empty());
    }

    #[test]
    fn test_area_threshold_is_strict() {
        // Exactly 600 px does not count as motion
        let mask = mask_with_block(64, 64, 0, 0, 30, 20);
        assert!(extract_regions(&mask, 600).is_empty());

        let mask = mask_with_block(64, 64, 0, 0, 30, 21);
        assert_eq!(extract_regions(&mask, 600).len(), 1);
    }

    #[test]
    fn test_large_region_bounding_box() {
        let mask = mask_with_block(128, 128, 20, 30, 40, 25);
        let regions = extract_regions(&mask, 600);
        assert_eq!(regions.len(), 1);

        let region = regions[0];
        assert_eq!(region.x, 20);
        assert_eq!(region.y, 30);
        assert_eq!(region.width, 40);
        assert_eq!(region.height, 25);
        assert_eq!(region.area, 40 * 25);
    }

    #[test]
    fn test_multiple_disjoint_regions() {
        let mut mask = mask_with_block(128, 128, 5, 5, 30, 30);
        for y in 70..100 {
            for x in 70..100 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        let regions = extract_regions(&mask, 600);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].y, 5);
        assert_eq!(regions[1].y, 70);
    }
}
