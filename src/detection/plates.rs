use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detection::contours;
use crate::models::{CandidateRegion, Contour};

/// Expected footprint of a plate, as open intervals.
///
/// The defaults are empirical and in absolute pixels, so they do not scale
/// with the camera resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateGeometry {
    pub min_area: f64,
    pub max_area: f64,
    pub min_aspect: f64,
    pub max_aspect: f64,
}

impl Default for PlateGeometry {
    fn default() -> Self {
        Self {
            min_area: 1000.0,
            max_area: 50000.0,
            min_aspect: 2.0,
            max_aspect: 6.0,
        }
    }
}

impl PlateGeometry {
    /// Strict bounds on both area and width/height ratio
    pub fn accepts(&self, contour: &Contour) -> bool {
        let area = contour.area;
        if !(area > self.min_area && area < self.max_area) {
            return false;
        }
        let aspect = contour.aspect_ratio();
        aspect > self.min_aspect && aspect < self.max_aspect
    }
}

/// Filter contours to plate-shaped ones
pub fn filter_plates(contours: &[Contour], geometry: &PlateGeometry) -> Vec<Contour> {
    contours
        .iter()
        .filter(|c| geometry.accepts(c))
        .cloned()
        .collect()
}

/// Propose candidate plate regions from a binary image.
///
/// Regions come back in contour-tracing order.
pub fn propose(binary: &GrayImage, geometry: &PlateGeometry) -> Vec<CandidateRegion> {
    let all_contours = contours::find_contours(binary);
    let plates = filter_plates(&all_contours, geometry);

    debug!(
        contours = all_contours.len(),
        candidates = plates.len(),
        "Filtered contours by plate geometry"
    );

    plates
        .iter()
        .map(|contour| {
            let rect = contour.bounding_rect();
            let image =
                image::imageops::crop_imm(binary, rect.x, rect.y, rect.width, rect.height)
                    .to_image();
            CandidateRegion { rect, image }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn contour(width: u32, height: u32, area: f64) -> Contour {
        Contour {
            min_x: 0,
            min_y: 0,
            max_x: width - 1,
            max_y: height - 1,
            area,
            point_count: 4,
        }
    }

    fn canvas_with_rect(w: u32, h: u32) -> GrayImage {
        let mut img = GrayImage::new(400, 300);
        for y in 50..50 + h {
            for x in 40..40 + w {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        img
    }

    #[test]
    fn test_area_bounds_are_exclusive() {
        let geometry = PlateGeometry::default();
        assert!(!geometry.accepts(&contour(90, 30, 1000.0)));
        assert!(geometry.accepts(&contour(90, 30, 1000.5)));
        assert!(geometry.accepts(&contour(400, 130, 49_999.0)));
        assert!(!geometry.accepts(&contour(400, 130, 50_000.0)));
    }

    #[test]
    fn test_aspect_bounds_are_exclusive() {
        let geometry = PlateGeometry::default();
        assert!(!geometry.accepts(&contour(100, 50, 4000.0)));
        assert!(geometry.accepts(&contour(101, 50, 4000.0)));
        assert!(geometry.accepts(&contour(299, 50, 4000.0)));
        assert!(!geometry.accepts(&contour(300, 50, 4000.0)));
    }

    #[test]
    fn test_plate_shaped_rect_is_proposed_and_cropped() {
        let binary = canvas_with_rect(300, 80);
        let regions = propose(&binary, &PlateGeometry::default());

        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!((region.rect.x, region.rect.y), (40, 50));
        assert_eq!((region.rect.width, region.rect.height), (300, 80));
        assert_eq!(region.image.dimensions(), (300, 80));
    }

    #[test]
    fn test_plate_cropped_to_the_frame_is_proposed() {
        let mut plate = GrayImage::from_pixel(300, 80, Luma([235]));
        for gx in [30, 90, 150, 210] {
            for y in 20..60 {
                for x in gx..gx + 20 {
                    plate.put_pixel(x, y, Luma([20]));
                }
            }
        }

        let binary =
            crate::detection::preprocess(&image::DynamicImage::ImageLuma8(plate)).unwrap();
        let regions = propose(&binary, &PlateGeometry::default());

        assert_eq!(regions.len(), 1);
        let rect = regions[0].rect;
        assert_eq!((rect.x, rect.y), (0, 0));
        assert_eq!((rect.width, rect.height), (300, 80));
    }

    #[test]
    fn test_square_is_never_proposed() {
        let binary = canvas_with_rect(100, 100);
        assert!(propose(&binary, &PlateGeometry::default()).is_empty());
    }

    #[test]
    fn test_every_proposed_region_satisfies_bounds() {
        let mut binary = canvas_with_rect(300, 80);
        for y in 200..230 {
            for x in 10..400 {
                binary.put_pixel(x, y, Luma([255]));
            }
        }
        for y in 240..260 {
            for x in 100..160 {
                binary.put_pixel(x, y, Luma([255]));
            }
        }

        let geometry = PlateGeometry::default();
        let contours = contours::find_contours(&binary);
        for c in filter_plates(&contours, &geometry) {
            assert!(c.area > 1000.0 && c.area < 50_000.0);
            assert!(c.aspect_ratio() > 2.0 && c.aspect_ratio() < 6.0);
        }
    }
}
