use image::GrayImage;
use imageproc::contours::find_contours as trace_borders;
use imageproc::point::Point;
use crate::models::Contour;

/// Find every contour in a binary image.
///
/// Both outer and hole borders are returned and the nesting is ignored.
/// Foreground is any non-zero pixel. Shapes touching the image edges are
/// traced as if the image were surrounded by background.
pub fn find_contours(binary: &GrayImage) -> Vec<Contour> {
    let padded = pad_with_background(binary);
    trace_borders::<u32>(&padded)
        .into_iter()
        .filter(|c| !c.points.is_empty())
        .map(|c| {
            let points = simplify_chain(&c.points);
            to_contour(&points)
        })
        .collect()
}

/// Copy into a canvas with a one pixel zero border on every side
fn pad_with_background(binary: &GrayImage) -> GrayImage {
    let mut padded = GrayImage::new(binary.width() + 2, binary.height() + 2);
    image::imageops::replace(&mut padded, binary, 1, 1);
    padded
}

/// Drop points that sit in the middle of a straight run, keeping only the
/// points where the chain changes direction.
pub fn simplify_chain(points: &[Point<u32>]) -> Vec<Point<u32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let step = |from: &Point<u32>, to: &Point<u32>| {
        (to.x as i64 - from.x as i64, to.y as i64 - from.y as i64)
    };

    let kept: Vec<Point<u32>> = (0..n)
        .filter(|&i| {
            let prev = &points[(i + n - 1) % n];
            let next = &points[(i + 1) % n];
            step(prev, &points[i]) != step(&points[i], next)
        })
        .map(|i| points[i])
        .collect();

    // A closed straight line collapses completely; keep its end points.
    if kept.is_empty() {
        vec![points[0], points[n - 1]]
    } else {
        kept
    }
}

/// Area enclosed by a closed polygon (shoelace formula)
pub fn polygon_area(points: &[Point<u32>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice_area: i64 = (0..n)
        .map(|i| {
            let a = &points[i];
            let b = &points[(i + 1) % n];
            a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
        })
        .sum();
    twice_area.abs() as f64 / 2.0
}

/// Extents are shifted back out of the padded frame; traced points are
/// foreground pixels, so never on the zero border.
fn to_contour(points: &[Point<u32>]) -> Contour {
    let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
    let (mut max_x, mut max_y) = (0, 0);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Contour {
        min_x: min_x - 1,
        min_y: min_y - 1,
        max_x: max_x - 1,
        max_y: max_y - 1,
        area: polygon_area(points),
        point_count: points.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn filled_rect(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, value: u8) {
        for yy in y..y + h {
            for xx in x..x + w {
                img.put_pixel(xx, yy, Luma([value]));
            }
        }
    }

    #[test]
    fn test_rectangle_contour_simplifies_to_corners() {
        let mut img = GrayImage::new(200, 100);
        filled_rect(&mut img, 20, 10, 120, 40, 255);

        let contours = find_contours(&img);
        assert_eq!(contours.len(), 1);

        let c = &contours[0];
        assert_eq!((c.min_x, c.min_y, c.max_x, c.max_y), (20, 10, 139, 49));
        assert_eq!(c.point_count, 4);
        // Polygon through the border pixel centres: (w - 1) * (h - 1)
        assert_eq!(c.area, 119.0 * 39.0);
    }

    #[test]
    fn test_hole_borders_are_listed_too() {
        let mut img = GrayImage::new(200, 100);
        filled_rect(&mut img, 10, 10, 150, 60, 255);
        filled_rect(&mut img, 50, 30, 20, 20, 0);

        let contours = find_contours(&img);
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn test_shape_filling_the_frame_is_traced() {
        let img = GrayImage::from_pixel(300, 80, Luma([255]));

        let contours = find_contours(&img);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert_eq!((c.min_x, c.min_y, c.max_x, c.max_y), (0, 0, 299, 79));
        assert_eq!(c.area, 299.0 * 79.0);
    }

    #[test]
    fn test_full_width_band_is_traced() {
        let mut img = GrayImage::new(400, 200);
        filled_rect(&mut img, 0, 50, 400, 80, 255);

        let contours = find_contours(&img);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert_eq!((c.min_x, c.min_y, c.max_x, c.max_y), (0, 50, 399, 129));
        assert_eq!(c.area, 399.0 * 79.0);
    }

    #[test]
    fn test_blank_image_has_no_contours() {
        let img = GrayImage::new(64, 64);
        assert!(find_contours(&img).is_empty());
    }

    #[test]
    fn test_polygon_area_of_square() {
        let square = [
            Point::new(0u32, 0u32),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(polygon_area(&square), 100.0);
        assert_eq!(polygon_area(&square[..2]), 0.0);
    }
}
