//! Region decomposition: partition an image's pixel grid into an ordered
//! sequence of rectangular regions, one chord each.
//!
//! Regions are borrowed views over the source image. Pixel colors are
//! produced lazily, row-major, with alpha pre-composited against a white
//! background, so per-region memory stays bounded by the region itself
//! rather than the image.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::types::Point;

/// Selects how the image is partitioned into regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionMethod {
    /// Near-square tiles anchored at the top-left corner, emitted
    /// row-major. Tiles in the last row/column may be smaller.
    #[default]
    Grid,
    /// Near-square tiles with the tiling offset symmetrically, so edge
    /// tiles shrink on both sides instead of only the bottom-right.
    CenteredGrid,
}

impl RegionMethod {
    /// The wire/CLI name of this method.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::CenteredGrid => "centered-grid",
        }
    }
}

impl fmt::Display for RegionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(Self::Grid),
            "centered-grid" => Ok(Self::CenteredGrid),
            other => Err(format!("unknown region method: {other}")),
        }
    }
}

/// One rectangular slice of the image.
///
/// Holds only its bounds and a reference to the image; call
/// [`colors`](Self::colors) to walk the pixels. Each call starts a fresh
/// single-pass traversal.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a> {
    image: &'a RgbaImage,
    x_min: u32,
    y_min: u32,
    x_max: u32,
    y_max: u32,
}

impl Region<'_> {
    /// Number of pixels covered by this region.
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        ((self.x_max - self.x_min) as usize) * ((self.y_max - self.y_min) as usize)
    }

    /// The region boundary as an ordered (closed) corner sequence.
    #[must_use]
    pub fn polygon(&self) -> Vec<Point> {
        let (x0, y0) = (f64::from(self.x_min), f64::from(self.y_min));
        let (x1, y1) = (f64::from(self.x_max), f64::from(self.y_max));
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    /// The bounding-box midpoint.
    #[must_use]
    pub fn centroid(&self) -> Point {
        Point::new(
            f64::from(self.x_min) + f64::from(self.x_max - self.x_min) / 2.0,
            f64::from(self.y_min) + f64::from(self.y_max - self.y_min) / 2.0,
        )
    }

    /// Lazily walk the region's pixel colors, row-major.
    ///
    /// Alpha is composited against white before the color is yielded.
    pub fn colors(&self) -> impl Iterator<Item = Rgb> + '_ {
        let (x_min, x_max) = (self.x_min, self.x_max);
        (self.y_min..self.y_max).flat_map(move |y| {
            (x_min..x_max).map(move |x| composite(self.image.get_pixel(x, y).0))
        })
    }
}

/// Composite an RGBA pixel against a white background.
fn composite([r, g, b, a]: [u8; 4]) -> Rgb {
    let alpha = f64::from(a);
    let apply = |c: u8| ((f64::from(c) - 255.0) * alpha / 255.0).round() + 255.0;
    Rgb::new(apply(r), apply(g), apply(b))
}

/// A single region spanning the whole image.
///
/// Used by the mean-key tempo primitive, which summarizes the entire
/// image as one patch.
#[must_use]
pub fn whole_image(image: &RgbaImage) -> Region<'_> {
    Region {
        image,
        x_min: 0,
        y_min: 0,
        x_max: image.width(),
        y_max: image.height(),
    }
}

/// Decompose the image into ordered regions.
///
/// `target` is the approximate number of regions wanted; the grid picks
/// near-square tiles whose count comes as close as rounding allows.
#[must_use]
pub fn regions(image: &RgbaImage, method: RegionMethod, target: f64) -> Vec<Region<'_>> {
    match method {
        RegionMethod::Grid => grid(image, target, false),
        RegionMethod::CenteredGrid => grid(image, target, true),
    }
}

/// Tile the image with near-square patches, row-major.
///
/// The tile edge comes from scaling the image dimensions by
/// `sqrt(target / pixel_count)`; ceiling division guarantees the tiles
/// cover the image with no gaps, with edge tiles clipped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grid(image: &RgbaImage, target: f64, centered: bool) -> Vec<Region<'_>> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let scale = (target / (f64::from(width) * f64::from(height))).sqrt();
    let tiles_x = (f64::from(width) * scale).round().max(1.0) as u32;
    let tile_w = width.div_ceil(tiles_x);
    let tiles_y = (f64::from(height) * scale).round().max(1.0) as u32;
    let tile_h = height.div_ceil(tiles_y);

    // Centered tiling starts at a (possibly negative) symmetric offset,
    // which can add one clipped row/column on each near edge.
    let (x_init, y_init) = if centered {
        (
            (i64::from(width) - i64::from(tile_w) * i64::from(tiles_x)).div_euclid(2),
            (i64::from(height) - i64::from(tile_h) * i64::from(tiles_y)).div_euclid(2),
        )
    } else {
        (0, 0)
    };

    let mut out = Vec::new();
    let mut y = y_init;
    while y < i64::from(height) {
        let mut x = x_init;
        while x < i64::from(width) {
            out.push(Region {
                image,
                x_min: x.max(0) as u32,
                y_min: y.max(0) as u32,
                x_max: (x + i64::from(tile_w)).min(i64::from(width)) as u32,
                y_max: (y + i64::from(tile_h)).min(i64::from(height)) as u32,
            });
            x += i64::from(tile_w);
        }
        y += i64::from(tile_h);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(pixel))
    }

    /// Every pixel must be covered exactly once and counts must sum to
    /// the image area.
    fn assert_exact_cover(image: &RgbaImage, regions: &[Region<'_>]) {
        let mut covered = vec![0u32; (image.width() * image.height()) as usize];
        let mut total = 0;
        for region in regions {
            total += region.pixel_count();
            for y in region.y_min..region.y_max {
                for x in region.x_min..region.x_max {
                    covered[(y * image.width() + x) as usize] += 1;
                }
            }
        }
        assert_eq!(total, (image.width() * image.height()) as usize);
        assert!(covered.iter().all(|&c| c == 1), "tiling has gaps or overlaps");
    }

    #[test]
    fn grid_tiles_exactly() {
        for (w, h, target) in [(8, 8, 4.0), (10, 7, 5.0), (13, 29, 11.0), (5, 5, 1.0)] {
            let image = solid(w, h, [10, 20, 30, 255]);
            let regs = regions(&image, RegionMethod::Grid, target);
            assert!(!regs.is_empty());
            assert_exact_cover(&image, &regs);
        }
    }

    #[test]
    fn centered_grid_tiles_exactly() {
        for (w, h, target) in [(8, 8, 4.0), (10, 7, 5.0), (13, 29, 11.0)] {
            let image = solid(w, h, [10, 20, 30, 255]);
            let regs = regions(&image, RegionMethod::CenteredGrid, target);
            assert_exact_cover(&image, &regs);
        }
    }

    #[test]
    fn grid_is_row_major() {
        let image = solid(8, 8, [0, 0, 0, 255]);
        let regs = regions(&image, RegionMethod::Grid, 4.0);
        let corners: Vec<(u32, u32)> = regs.iter().map(|r| (r.x_min, r.y_min)).collect();
        assert_eq!(corners, vec![(0, 0), (4, 0), (0, 4), (4, 4)]);
    }

    #[test]
    fn target_one_yields_single_region() {
        let image = solid(2, 2, [0, 0, 0, 255]);
        let regs = regions(&image, RegionMethod::Grid, 1.0);
        assert_eq!(regs.len(), 1);
        assert_eq!(regs[0].pixel_count(), 4);
    }

    #[test]
    fn oversized_target_degenerates_to_pixels() {
        let image = solid(3, 3, [0, 0, 0, 255]);
        let regs = regions(&image, RegionMethod::Grid, 100.0);
        assert_eq!(regs.len(), 9);
        assert!(regs.iter().all(|r| r.pixel_count() == 1));
        assert_exact_cover(&image, &regs);
    }

    #[test]
    fn empty_image_yields_no_regions() {
        let image = RgbaImage::new(0, 0);
        assert!(regions(&image, RegionMethod::Grid, 4.0).is_empty());
    }

    #[test]
    fn centroid_is_bounding_box_midpoint() {
        let image = solid(4, 2, [0, 0, 0, 255]);
        let regs = regions(&image, RegionMethod::Grid, 1.0);
        assert_eq!(regs[0].centroid(), Point::new(2.0, 1.0));
    }

    #[test]
    fn polygon_corners_are_ordered() {
        let image = solid(4, 2, [0, 0, 0, 255]);
        let regs = regions(&image, RegionMethod::Grid, 1.0);
        assert_eq!(
            regs[0].polygon(),
            vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 2.0),
                Point::new(0.0, 2.0),
            ],
        );
    }

    #[test]
    fn colors_walk_row_major() {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(0, 0, Rgba([1, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([2, 0, 0, 255]));
        image.put_pixel(0, 1, Rgba([3, 0, 0, 255]));
        image.put_pixel(1, 1, Rgba([4, 0, 0, 255]));
        let region = whole_image(&image);
        let reds: Vec<f64> = region.colors().map(|c| c.r).collect();
        assert_eq!(reds, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn colors_restart_on_each_call() {
        let image = solid(2, 2, [9, 9, 9, 255]);
        let region = whole_image(&image);
        assert_eq!(region.colors().count(), 4);
        assert_eq!(region.colors().count(), 4);
    }

    #[test]
    fn alpha_composites_against_white() {
        // Fully transparent pixels read as white; opaque pass through.
        let image = solid(1, 1, [40, 80, 120, 0]);
        let color = whole_image(&image).colors().next().unwrap();
        assert_eq!(color, Rgb::new(255.0, 255.0, 255.0));

        let image = solid(1, 1, [40, 80, 120, 255]);
        let color = whole_image(&image).colors().next().unwrap();
        assert_eq!(color, Rgb::new(40.0, 80.0, 120.0));

        // Half transparency pulls channels halfway to 255.
        let image = solid(1, 1, [0, 0, 0, 128]);
        let color = whole_image(&image).colors().next().unwrap();
        assert_eq!(color, Rgb::new(127.0, 127.0, 127.0));
    }

    #[test]
    fn region_method_names_round_trip() {
        for method in [RegionMethod::Grid, RegionMethod::CenteredGrid] {
            assert_eq!(method.name().parse::<RegionMethod>(), Ok(method));
        }
        assert!("voronoi".parse::<RegionMethod>().is_err());
    }
}
