// ============================================================================
// FLOOD FILL — scanline span fill over the raw surface buffer
// ============================================================================

use image::Rgba;

use crate::canvas::RasterSurface;
use crate::color::{opaque, parse_color, rgb_eq};
use crate::error::PaintResult;

/// How a candidate pixel is compared against the seed color.
///
/// Alpha never takes part in the comparison; filled pixels are always written
/// fully opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FillMatch {
    /// Exact RGB equality. The canonical mode.
    #[default]
    Exact,
    /// Every RGB channel within `delta` of the seed color.
    Tolerance(u8),
}

impl FillMatch {
    /// `0` selects [`FillMatch::Exact`]; anything else a tolerance.
    pub fn from_tolerance(delta: u8) -> Self {
        if delta == 0 { FillMatch::Exact } else { FillMatch::Tolerance(delta) }
    }

    #[inline(always)]
    fn accepts(self, px: &[u8], target: Rgba<u8>) -> bool {
        match self {
            FillMatch::Exact => px[0] == target[0] && px[1] == target[1] && px[2] == target[2],
            FillMatch::Tolerance(delta) => {
                px[0].abs_diff(target[0]) <= delta
                    && px[1].abs_diff(target[1]) <= delta
                    && px[2].abs_diff(target[2]) <= delta
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FillOptions {
    pub matching: FillMatch,
    /// Extra dilation passes after the fill. Each pass paints the 4-neighbours
    /// of the filled area, covering anti-aliased fringes left by strokes at the
    /// cost of overpainting the first pixel of every boundary. `0` disables it.
    pub halo_px: u32,
}

/// What a fill changed: pixel count and inclusive bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillRegion {
    pub pixels: usize,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl FillRegion {
    fn include(&mut self, x: u32, y: u32) {
        self.pixels += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// Parse `color` first, then fill. A bad color string fails before the surface
/// is touched.
pub fn flood_fill_str(
    surface: &mut RasterSurface,
    seed: (i32, i32),
    color: &str,
    options: &FillOptions,
) -> PaintResult<Option<FillRegion>> {
    let fill_color = parse_color(color)?;
    Ok(flood_fill(surface, seed, fill_color, options))
}

/// Recolor the region 4-connected to `seed` whose pixels match the seed color.
///
/// Returns `None` (and changes nothing) when the seed is off the surface or the
/// seed pixel already has the fill color's RGB.
///
/// Work items are resolved as whole vertical runs: from each popped point the
/// scan climbs to the top of its matching run, then walks down painting, and
/// queues at most one seed per contiguous matching run in the left and right
/// neighbour columns.
pub fn flood_fill(
    surface: &mut RasterSurface,
    seed: (i32, i32),
    fill_color: Rgba<u8>,
    options: &FillOptions,
) -> Option<FillRegion> {
    let (sx, sy) = seed;
    let target = surface.read_pixel(sx, sy).ok()?;
    let fill = opaque(fill_color);

    if rgb_eq(target, fill) {
        crate::log_info!("flood fill at ({}, {}): seed already has fill color, skipped", sx, sy);
        return None;
    }

    let w = surface.width() as usize;
    let h = surface.height() as usize;
    let mode = options.matching;
    let px = fill.0;

    // Doubles as the visited set so tolerance mode terminates even when the
    // fill color itself is within tolerance of the target.
    let mut filled = vec![false; w * h];
    let mut region = FillRegion {
        pixels: 0,
        min_x: sx as u32,
        min_y: sy as u32,
        max_x: sx as u32,
        max_y: sy as u32,
    };

    let data = surface.raw_mut();

    #[inline(always)]
    fn open(data: &[u8], filled: &[bool], i: usize, mode: FillMatch, target: Rgba<u8>) -> bool {
        !filled[i] && mode.accepts(&data[i * 4..i * 4 + 3], target)
    }

    let mut stack: Vec<(usize, usize)> = Vec::with_capacity(1024);
    stack.push((sx as usize, sy as usize));

    while let Some((x, mut y)) = stack.pop() {
        while y > 0 && open(data, &filled, (y - 1) * w + x, mode, target) {
            y -= 1;
        }

        let mut reached_left = false;
        let mut reached_right = false;

        while y < h && open(data, &filled, y * w + x, mode, target) {
            let i = y * w + x;
            data[i * 4..i * 4 + 4].copy_from_slice(&px);
            filled[i] = true;
            region.include(x as u32, y as u32);

            if x > 0 {
                if open(data, &filled, i - 1, mode, target) {
                    if !reached_left {
                        stack.push((x - 1, y));
                        reached_left = true;
                    }
                } else {
                    reached_left = false;
                }
            }

            if x + 1 < w {
                if open(data, &filled, i + 1, mode, target) {
                    if !reached_right {
                        stack.push((x + 1, y));
                        reached_right = true;
                    }
                } else {
                    reached_right = false;
                }
            }

            y += 1;
        }
    }

    for _ in 0..options.halo_px {
        dilate(data, &mut filled, w, h, px, &mut region);
    }

    crate::log_info!(
        "flood fill at ({}, {}): {} px in [{}, {}]..[{}, {}]",
        sx, sy, region.pixels, region.min_x, region.min_y, region.max_x, region.max_y
    );
    Some(region)
}

/// One halo pass: paint every unfilled pixel that touches the filled area.
fn dilate(
    data: &mut [u8],
    filled: &mut [bool],
    w: usize,
    h: usize,
    px: [u8; 4],
    region: &mut FillRegion,
) {
    let mut ring = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            if filled[i] {
                continue;
            }
            let touches = (x > 0 && filled[i - 1])
                || (x + 1 < w && filled[i + 1])
                || (y > 0 && filled[i - w])
                || (y + 1 < h && filled[i + w]);
            if touches {
                ring.push((x, y));
            }
        }
    }
    for (x, y) in ring {
        let i = y * w + x;
        data[i * 4..i * 4 + 4].copy_from_slice(&px);
        filled[i] = true;
        region.include(x as u32, y as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PaintError;
    use std::collections::VecDeque;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn all_pixels(s: &RasterSurface) -> Vec<Rgba<u8>> {
        s.image().pixels().copied().collect()
    }

    #[test]
    fn fills_blank_surface_then_second_fill_is_noop() {
        let mut s = RasterSurface::new(10, 10, WHITE);
        let region = flood_fill(&mut s, (5, 5), RED, &FillOptions::default()).unwrap();
        assert_eq!(region.pixels, 100);
        assert!(all_pixels(&s).iter().all(|p| *p == RED));

        let snapshot = s.clone();
        assert!(flood_fill(&mut s, (5, 5), RED, &FillOptions::default()).is_none());
        assert_eq!(s, snapshot);
    }

    #[test]
    fn stops_at_boundaries() {
        let mut s = RasterSurface::new(10, 10, WHITE);
        s.fill_rect(5, 0, 1, 10, BLACK);
        flood_fill(&mut s, (1, 1), RED, &FillOptions::default());
        for y in 0..10 {
            for x in 0..10 {
                let expected = match x {
                    0..=4 => RED,
                    5 => BLACK,
                    _ => WHITE,
                };
                assert_eq!(s.read_pixel(x, y).unwrap(), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn seed_outside_surface_is_noop() {
        let mut s = RasterSurface::new(4, 4, WHITE);
        assert!(flood_fill(&mut s, (-1, 2), RED, &FillOptions::default()).is_none());
        assert!(flood_fill(&mut s, (4, 0), RED, &FillOptions::default()).is_none());
        assert!(all_pixels(&s).iter().all(|p| *p == WHITE));
    }

    #[test]
    fn alpha_is_ignored_when_matching_and_forced_on_write() {
        let mut s = RasterSurface::new(3, 1, Rgba([0, 0, 0, 0]));
        // Same RGB as the seed, different alpha: still part of the region.
        s.put_region(&RasterSurface::new(1, 1, Rgba([0, 0, 0, 255])), 2, 0);
        flood_fill(&mut s, (0, 0), Rgba([10, 20, 30, 40]), &FillOptions::default());
        assert!(all_pixels(&s).iter().all(|p| *p == Rgba([10, 20, 30, 255])));

        // Transparent white seed vs opaque white fill: RGB equal, so nothing happens.
        let mut t = RasterSurface::new(2, 2, Rgba([255, 255, 255, 0]));
        assert!(flood_fill(&mut t, (0, 0), WHITE, &FillOptions::default()).is_none());
    }

    #[test]
    fn matches_reference_four_connected_fill() {
        // Deterministic two-color noise gives plenty of pockets and overhangs.
        let (w, h) = (31u32, 23u32);
        let mut s = RasterSurface::new(w, h, WHITE);
        let mut state = 0x2545_f491_u32;
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                if state % 3 == 0 {
                    s.fill_rect(x, y, 1, 1, BLACK);
                }
            }
        }
        s.fill_rect(7, 9, 1, 1, WHITE);
        let original = s.clone();

        let mut reachable = vec![false; (w * h) as usize];
        let mut queue = VecDeque::from([(7i32, 9i32)]);
        reachable[(9 * w + 7) as usize] = true;
        while let Some((x, y)) = queue.pop_front() {
            for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                if !original.contains(nx, ny) {
                    continue;
                }
                let i = (ny as u32 * w + nx as u32) as usize;
                if !reachable[i] && original.read_pixel(nx, ny).unwrap() == WHITE {
                    reachable[i] = true;
                    queue.push_back((nx, ny));
                }
            }
        }

        let region = flood_fill(&mut s, (7, 9), RED, &FillOptions::default()).unwrap();
        assert_eq!(region.pixels, reachable.iter().filter(|r| **r).count());
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let i = (y as u32 * w + x as u32) as usize;
                let expected = if reachable[i] { RED } else { original.read_pixel(x, y).unwrap() };
                assert_eq!(s.read_pixel(x, y).unwrap(), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn tolerance_mode_spreads_over_near_colors_and_terminates() {
        let mut s = RasterSurface::new(4, 1, WHITE);
        s.fill_rect(1, 0, 1, 1, Rgba([250, 250, 250, 255]));
        s.fill_rect(3, 0, 1, 1, BLACK);
        let opts = FillOptions { matching: FillMatch::Tolerance(8), halo_px: 0 };
        // Fill color is itself within tolerance of the target.
        let region = flood_fill(&mut s, (0, 0), Rgba([252, 252, 252, 255]), &opts).unwrap();
        assert_eq!(region.pixels, 3);
        assert_eq!(s.read_pixel(3, 0).unwrap(), BLACK);

        let mut exact = RasterSurface::new(4, 1, WHITE);
        exact.fill_rect(1, 0, 1, 1, Rgba([250, 250, 250, 255]));
        let region = flood_fill(&mut exact, (0, 0), RED, &FillOptions::default()).unwrap();
        assert_eq!(region.pixels, 1);
    }

    #[test]
    fn halo_pass_grows_into_the_boundary() {
        let mut s = RasterSurface::new(5, 1, WHITE);
        s.fill_rect(2, 0, 3, 1, BLACK);
        let opts = FillOptions { matching: FillMatch::Exact, halo_px: 1 };
        let region = flood_fill(&mut s, (0, 0), RED, &opts).unwrap();
        assert_eq!(region.pixels, 3);
        assert_eq!(s.read_pixel(2, 0).unwrap(), RED);
        assert_eq!(s.read_pixel(3, 0).unwrap(), BLACK);
    }

    #[test]
    fn invalid_color_string_fails_without_mutation() {
        let mut s = RasterSurface::new(3, 3, WHITE);
        let err = flood_fill_str(&mut s, (1, 1), "rgb(300, 0, 0)", &FillOptions::default());
        assert!(matches!(err, Err(PaintError::InvalidColor(_))));
        assert!(all_pixels(&s).iter().all(|p| *p == WHITE));

        let ok = flood_fill_str(&mut s, (1, 1), "rgb(255, 0, 0)", &FillOptions::default()).unwrap();
        assert_eq!(ok.map(|r| r.pixels), Some(9));
    }
}
