//! Masked copy of original pixels into the merged frame.
//!
//! Three independent steps: [`rasterize`] turns an image-space polygon into a
//! 0/255 mask, [`hard_copy`] takes source pixels wherever the mask is set, and
//! [`feather_mask`] + [`blend`] soften the boundary. [`composite`] chains them.

use std::collections::HashSet;

use image::{GrayImage, Luma, RgbImage};

use crate::error::{Error, Result};
use crate::geometry::ImagePoint;

const INSIDE: u8 = 255;

/// Edge treatment for a composite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Feather {
    #[default]
    Hard,
    /// Gaussian falloff reaching `radius` pixels from the boundary.
    Soft { radius: u32 },
}

impl Feather {
    pub fn from_settings(enabled: bool, radius: u32) -> Self {
        if enabled && radius > 0 {
            Feather::Soft { radius }
        } else {
            Feather::Hard
        }
    }
}

/// Copy `src` into `dest` inside `polygon`, returning the new image.
///
/// `dest` is left untouched. Fails with [`Error::DegenerateGeometry`] when the
/// polygon has fewer than 3 distinct vertices.
pub fn composite(
    dest: &RgbImage,
    src: &RgbImage,
    polygon: &[ImagePoint],
    feather: Feather,
) -> Result<RgbImage> {
    if distinct_points(polygon) < 3 {
        return Err(Error::DegenerateGeometry);
    }
    if dest.dimensions() != src.dimensions() {
        return Err(Error::SizeMismatch {
            merged: dest.dimensions(),
            original: src.dimensions(),
        });
    }

    let (width, height) = dest.dimensions();
    let mask = rasterize(polygon, width, height);
    let hard = hard_copy(dest, src, &mask);
    Ok(match feather {
        Feather::Hard => hard,
        Feather::Soft { radius } => blend(&hard, dest, &feather_mask(&mask, radius)),
    })
}

pub fn distinct_points(polygon: &[ImagePoint]) -> usize {
    polygon.iter().collect::<HashSet<_>>().len()
}

/// Fill the polygon interior (even-odd rule) and its outline into a mask.
///
/// Pixels are sampled at their integer coordinates, so a pixel lying exactly
/// on an edge counts as inside. The polygon may or may not repeat its first
/// vertex at the end.
pub fn rasterize(polygon: &[ImagePoint], width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if polygon.is_empty() || width == 0 || height == 0 {
        return mask;
    }

    let edges: Vec<(ImagePoint, ImagePoint)> = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(&a, &b)| (a, b))
        .collect();

    let min_y = polygon.iter().map(|p| p.y).min().unwrap_or(0).max(0);
    let max_y = polygon
        .iter()
        .map(|p| p.y)
        .max()
        .unwrap_or(0)
        .min(height as i32 - 1);

    let mut crossings: Vec<f64> = Vec::new();
    for y in min_y..=max_y {
        crossings.clear();
        for &(a, b) in &edges {
            // Half-open in y so a shared vertex is counted once.
            let (lo, hi) = if a.y < b.y { (a, b) } else { (b, a) };
            if lo.y == hi.y || y < lo.y || y >= hi.y {
                continue;
            }
            let t = (y - lo.y) as f64 / (hi.y - lo.y) as f64;
            crossings.push(lo.x as f64 + t * (hi.x - lo.x) as f64);
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            let start = span[0].ceil().max(0.0) as i64;
            let end = span[1].floor().min(width as f64 - 1.0) as i64;
            for x in start..=end {
                mask.put_pixel(x as u32, y as u32, Luma([INSIDE]));
            }
        }
    }

    for &(a, b) in &edges {
        stroke_edge(&mut mask, a, b);
    }
    mask
}

/// Bresenham line into the mask, clipped to its bounds.
fn stroke_edge(mask: &mut GrayImage, from: ImagePoint, to: ImagePoint) {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let (mut x, mut y) = (from.x, from.y);
    let dx = (to.x - x).abs();
    let sx = if x < to.x { 1 } else { -1 };
    let dy = -(to.y - y).abs();
    let sy = if y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        if x >= 0 && y >= 0 && x < w && y < h {
            mask.put_pixel(x as u32, y as u32, Luma([INSIDE]));
        }
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Source pixels where the mask is set, destination pixels elsewhere.
pub fn hard_copy(dest: &RgbImage, src: &RgbImage, mask: &GrayImage) -> RgbImage {
    let mut out = dest.clone();
    for ((px, s), m) in out.pixels_mut().zip(src.pixels()).zip(mask.pixels()) {
        if m[0] == INSIDE {
            *px = *s;
        }
    }
    out
}

/// Blur a hard mask into a continuous alpha channel.
///
/// Circular Gaussian kernel (σ = radius / 2) truncated at `radius`, edges
/// replicated. Pixels whose whole neighbourhood is uniform keep their exact
/// value, so alpha is exactly 0 or 255 away from the boundary.
pub fn feather_mask(mask: &GrayImage, radius: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    if radius == 0 || width == 0 || height == 0 {
        return mask.clone();
    }

    let r = radius as i32;
    let sigma = (radius as f32 / 2.0).max(0.5);
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = dx * dx + dy * dy;
            if d2 <= r * r {
                kernel.push((dx, dy, (-(d2 as f32) / two_sigma_sq).exp()));
            }
        }
    }
    let total: f32 = kernel.iter().map(|&(_, _, w)| w).sum();

    let counts = InsideCounts::new(mask);
    let mut out = GrayImage::new(width, height);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let x0 = (x - r).max(0) as u32;
            let y0 = (y - r).max(0) as u32;
            let x1 = (x + r).min(width as i32 - 1) as u32;
            let y1 = (y + r).min(height as i32 - 1) as u32;
            let inside = counts.sum(x0, y0, x1, y1);
            let area = u64::from(x1 - x0 + 1) * u64::from(y1 - y0 + 1);

            let alpha = if inside == 0 {
                0
            } else if inside == area {
                INSIDE
            } else {
                let acc: f32 = kernel
                    .iter()
                    .map(|&(dx, dy, w)| {
                        let sx = (x + dx).clamp(0, width as i32 - 1) as u32;
                        let sy = (y + dy).clamp(0, height as i32 - 1) as u32;
                        w * f32::from(mask.get_pixel(sx, sy)[0])
                    })
                    .sum();
                (acc / total).round().clamp(0.0, 255.0) as u8
            };
            out.put_pixel(x as u32, y as u32, Luma([alpha]));
        }
    }
    out
}

/// Per-pixel `top * a + bottom * (1 - a)` with `a = alpha / 255`.
pub fn blend(top: &RgbImage, bottom: &RgbImage, alpha: &GrayImage) -> RgbImage {
    let mut out = bottom.clone();
    for ((px, t), a) in out.pixels_mut().zip(top.pixels()).zip(alpha.pixels()) {
        let a = u32::from(a[0]);
        if a == 0 {
            continue;
        }
        for c in 0..3 {
            let v = u32::from(t[c]) * a + u32::from(px[c]) * (255 - a);
            px[c] = ((v + 127) / 255) as u8;
        }
    }
    out
}

/// Summed-area table of mask pixels that are set.
struct InsideCounts {
    stride: usize,
    table: Vec<u64>,
}

impl InsideCounts {
    fn new(mask: &GrayImage) -> Self {
        let (w, h) = (mask.width() as usize, mask.height() as usize);
        let stride = w + 1;
        let mut table = vec![0u64; stride * (h + 1)];
        for y in 0..h {
            let mut row = 0u64;
            for x in 0..w {
                row += u64::from(mask.get_pixel(x as u32, y as u32)[0] == INSIDE);
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row;
            }
        }
        Self { stride, table }
    }

    /// Set pixels in the inclusive rectangle `[x0, x1] × [y0, y1]`.
    fn sum(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> u64 {
        let at = |x: u32, y: u32| self.table[y as usize * self.stride + x as usize];
        at(x1 + 1, y1 + 1) + at(x0, y0) - at(x0, y1 + 1) - at(x1 + 1, y0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(w: u32, h: u32, c: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(c))
    }

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, (x ^ y) as u8]))
    }

    fn pts(list: &[(i32, i32)]) -> Vec<ImagePoint> {
        list.iter().map(|&(x, y)| ImagePoint::new(x, y)).collect()
    }

    #[test]
    fn full_bounds_polygon_copies_everything() {
        let dest = solid(100, 100, [10, 20, 30]);
        let src = gradient(100, 100);
        for polygon in [
            pts(&[(0, 0), (100, 0), (100, 100), (0, 100)]),
            pts(&[(0, 0), (99, 0), (99, 99), (0, 99), (0, 0)]),
        ] {
            let out = composite(&dest, &src, &polygon, Feather::Hard).unwrap();
            assert_eq!(out, src);
        }
    }

    #[test]
    fn degenerate_paths_are_rejected() {
        let dest = solid(20, 20, [1, 2, 3]);
        let src = solid(20, 20, [9, 9, 9]);
        for polygon in [
            vec![],
            pts(&[(1, 1), (10, 10)]),
            pts(&[(1, 1), (10, 10), (1, 1)]),
            pts(&[(4, 4), (4, 4)]),
        ] {
            let result = composite(&dest, &src, &polygon, Feather::Hard);
            assert!(matches!(result, Err(Error::DegenerateGeometry)));
        }
    }

    #[test]
    fn mismatched_sizes_are_rejected() {
        let result = composite(
            &solid(10, 10, [0; 3]),
            &solid(10, 11, [0; 3]),
            &pts(&[(0, 0), (5, 0), (5, 5)]),
            Feather::Hard,
        );
        assert!(matches!(result, Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn triangle_copies_inside_only() {
        let dest = solid(100, 100, [200, 0, 0]);
        let src = solid(100, 100, [0, 0, 200]);
        let polygon = pts(&[(10, 10), (90, 10), (50, 90), (10, 10)]);
        let out = composite(&dest, &src, &polygon, Feather::Hard).unwrap();
        assert_eq!(out.get_pixel(50, 50), src.get_pixel(50, 50));
        assert_eq!(out.get_pixel(5, 5), dest.get_pixel(5, 5));
        assert_eq!(out.get_pixel(90, 90), dest.get_pixel(90, 90));
        // Vertices sit on the boundary and are included.
        assert_eq!(out.get_pixel(10, 10), src.get_pixel(10, 10));
        assert_eq!(out.get_pixel(90, 10), src.get_pixel(90, 10));
    }

    #[test]
    fn rasterize_follows_vertex_order() {
        // Bow-tie: the left and right wedges are filled, top and bottom are not.
        let mask = rasterize(&pts(&[(0, 0), (20, 20), (20, 0), (0, 20)]), 21, 21);
        assert_eq!(mask.get_pixel(10, 3)[0], 0);
        assert_eq!(mask.get_pixel(3, 10)[0], INSIDE);
        assert_eq!(mask.get_pixel(17, 10)[0], INSIDE);
        assert_eq!(mask.get_pixel(10, 17)[0], 0);
    }

    #[test]
    fn rasterize_clips_to_image() {
        let mask = rasterize(&pts(&[(-50, -50), (30, -50), (30, 200), (-50, 200)]), 20, 20);
        assert!(mask.pixels().all(|p| p[0] == INSIDE));
        let outside = rasterize(&pts(&[(40, 40), (60, 40), (50, 60)]), 20, 20);
        assert!(outside.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn feathering_keeps_core_and_exterior_exact() {
        let dest = solid(120, 120, [250, 250, 250]);
        let src = gradient(120, 120);
        let polygon = pts(&[(30, 30), (90, 30), (90, 90), (30, 90)]);
        let radius = 6;
        let hard = composite(&dest, &src, &polygon, Feather::Hard).unwrap();
        let soft = composite(&dest, &src, &polygon, Feather::Soft { radius }).unwrap();

        for y in 0..120 {
            for x in 0..120 {
                let far_inside = (38..=82).contains(&x) && (38..=82).contains(&y);
                let far_outside = !(22..=98).contains(&x) || !(22..=98).contains(&y);
                if far_inside {
                    assert_eq!(soft.get_pixel(x, y), src.get_pixel(x, y), "({x},{y})");
                }
                if far_outside {
                    assert_eq!(soft.get_pixel(x, y), dest.get_pixel(x, y), "({x},{y})");
                }
            }
        }
        // The boundary band differs from the hard edge.
        assert_ne!(soft.get_pixel(31, 60), hard.get_pixel(31, 60));
    }

    #[test]
    fn feathered_alpha_ramps_across_the_edge() {
        let mask = rasterize(&pts(&[(20, 0), (40, 0), (40, 39), (20, 39)]), 60, 40);
        let alpha = feather_mask(&mask, 4);
        let row: Vec<u8> = (14..=26).map(|x| alpha.get_pixel(x, 20)[0]).collect();
        assert_eq!(row[0], 0);
        assert_eq!(*row.last().unwrap(), INSIDE);
        assert!(row.windows(2).all(|w| w[0] <= w[1]), "{row:?}");
    }

    #[test]
    fn composite_is_deterministic() {
        let dest = gradient(64, 48);
        let src = solid(64, 48, [7, 77, 177]);
        let polygon = pts(&[(3, 5), (60, 8), (41, 44), (12, 30)]);
        let feather = Feather::Soft { radius: 3 };
        let a = composite(&dest, &src, &polygon, feather).unwrap();
        let b = composite(&dest, &src, &polygon, feather).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn feather_from_settings() {
        assert_eq!(Feather::from_settings(false, 3), Feather::Hard);
        assert_eq!(Feather::from_settings(true, 0), Feather::Hard);
        assert_eq!(Feather::from_settings(true, 5), Feather::Soft { radius: 5 });
    }
}
