use image::{Pixel, Rgba, RgbaImage, imageops};

use crate::error::{PaintError, PaintResult};

// ============================================================================
// GEOMETRY
// ============================================================================

/// Pointer coordinates are clamped to this magnitude before they become pixels,
/// so rectangle arithmetic on them cannot overflow.
pub const MAX_POINTER_COORD: f32 = 65_536.0;

/// Pointer position in canvas coordinates, as delivered by the UI layer.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// The pixel this position falls in. Far-off positions are pinned to
    /// `±MAX_POINTER_COORD`; NaN maps to 0.
    #[inline]
    pub fn pixel(self) -> (i32, i32) {
        let clamp = |v: f32| v.floor().clamp(-MAX_POINTER_COORD, MAX_POINTER_COORD) as i32;
        (clamp(self.x), clamp(self.y))
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Integer rectangle in pixel coordinates.
///
/// `width`/`height` may be negative while a drag is in progress (dragging up or
/// left of the anchor); [`PixelRect::normalized`] folds them back into `x`/`y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn normalized(self) -> Self {
        let mut r = self;
        if r.width < 0 {
            r.x = r.x.saturating_add(r.width);
            r.width = r.width.saturating_neg();
        }
        if r.height < 0 {
            r.y = r.y.saturating_add(r.height);
            r.height = r.height.saturating_neg();
        }
        r
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Inclusive on all four edges, matching how the selection body is hit-tested.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        let r = self.normalized();
        px >= r.x && px <= r.right() && py >= r.y && py <= r.bottom()
    }

    /// Intersection with `[0, w) × [0, h)`, or `None` when nothing is left.
    pub fn clamp_to(self, w: u32, h: u32) -> Option<PixelRect> {
        let r = self.normalized();
        let x0 = r.x.max(0);
        let y0 = r.y.max(0);
        let x1 = r.right().min(w as i32);
        let y1 = r.bottom().min(h as i32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

// ============================================================================
// RASTER SURFACE
// ============================================================================

/// A block read back from the surface, together with where it actually came
/// from. Reads that hang over an edge return only the clamped intersection,
/// so `x`/`y` can differ from the requested origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub pixels: RasterSurface,
}

/// Owned RGBA8 pixel buffer, row-major. The buffer length always equals
/// `width * height * 4`; every coordinate-taking method rejects or clips
/// out-of-range input rather than wrapping.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    /// Create a surface filled with `background`. Zero dimensions are bumped to 1.
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        if width == 0 || height == 0 {
            crate::log_warn!(
                "RasterSurface::new: {}x{} has no area, clamped to 1px",
                width,
                height
            );
        }
        let image = RgbaImage::from_pixel(width.max(1), height.max(1), background);
        Self { image }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        if image.width() == 0 || image.height() == 0 {
            return Self::new(1, 1, Rgba([0, 0, 0, 0]));
        }
        Self { image }
    }

    /// Build a `width × height` background surface and draw `source` onto it,
    /// scaled to the surface width with its aspect ratio preserved. This is the
    /// best-effort rescale used when a stored snapshot no longer matches the
    /// canvas size.
    pub fn fitted_from(source: &RgbaImage, width: u32, height: u32, background: Rgba<u8>) -> Self {
        let mut surface = Self::new(width, height, background);
        if source.width() == surface.width() && source.height() == surface.height() {
            surface.image.copy_from_slice(source.as_raw());
            return surface;
        }
        if source.width() == 0 || source.height() == 0 {
            return surface;
        }
        let aspect = source.width() as f32 / source.height() as f32;
        let new_w = surface.width();
        let new_h = ((new_w as f32 / aspect).round() as u32).max(1);
        let scaled = imageops::resize(source, new_w, new_h, imageops::FilterType::Triangle);
        surface.draw_image(&scaled, 0, 0);
        surface
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub(crate) fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    pub fn read_pixel(&self, x: i32, y: i32) -> PaintResult<Rgba<u8>> {
        if !self.contains(x, y) {
            return Err(PaintError::out_of_bounds(x, y, 1, 1));
        }
        Ok(*self.image.get_pixel(x as u32, y as u32))
    }

    /// Copy out the part of `(x, y, w, h)` that lies on the surface.
    pub fn get_region(&self, x: i32, y: i32, w: i32, h: i32) -> PaintResult<Region> {
        let clamped = PixelRect::new(x, y, w, h)
            .clamp_to(self.width(), self.height())
            .ok_or_else(|| PaintError::out_of_bounds(x, y, w, h))?;

        let (cw, ch) = (clamped.width as u32, clamped.height as u32);
        let stride = self.width() as usize * 4;
        let row_bytes = cw as usize * 4;
        let mut data = Vec::with_capacity(row_bytes * ch as usize);
        let src = self.image.as_raw();
        for row in 0..ch as usize {
            let start = (clamped.y as usize + row) * stride + clamped.x as usize * 4;
            data.extend_from_slice(&src[start..start + row_bytes]);
        }

        let image = RgbaImage::from_raw(cw, ch, data)
            .ok_or_else(|| PaintError::out_of_bounds(x, y, w, h))?;
        Ok(Region {
            x: clamped.x,
            y: clamped.y,
            pixels: RasterSurface { image },
        })
    }

    /// Overwrite pixels with `block` placed at `(x, y)`. No blending; whatever
    /// falls off the surface is dropped.
    pub fn put_region(&mut self, block: &RasterSurface, x: i32, y: i32) {
        let target = PixelRect::new(x, y, block.width() as i32, block.height() as i32);
        let Some(clip) = target.clamp_to(self.width(), self.height()) else {
            return;
        };

        let dst_stride = self.width() as usize * 4;
        let src_stride = block.width() as usize * 4;
        let row_bytes = clip.width as usize * 4;
        let src_x = (clip.x - x) as usize;
        let src_y = (clip.y - y) as usize;
        let src = block.as_raw();
        let dst = self.raw_mut();

        for row in 0..clip.height as usize {
            let s = (src_y + row) * src_stride + src_x * 4;
            let d = (clip.y as usize + row) * dst_stride + clip.x as usize * 4;
            dst[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
        }
    }

    /// Set every pixel of the clamped rectangle to `color`, fully opaque.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba<u8>) {
        let Some(clip) = PixelRect::new(x, y, w, h).clamp_to(self.width(), self.height()) else {
            return;
        };
        let px = [color[0], color[1], color[2], 255];
        let stride = self.width() as usize * 4;
        let dst = self.raw_mut();
        for row in clip.y as usize..clip.bottom() as usize {
            let start = row * stride + clip.x as usize * 4;
            for chunk in dst[start..start + clip.width as usize * 4].chunks_exact_mut(4) {
                chunk.copy_from_slice(&px);
            }
        }
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        let (w, h) = (self.width() as i32, self.height() as i32);
        self.fill_rect(0, 0, w, h, color);
    }

    /// Restore from a same-sized surface without reallocating. Returns false
    /// (and leaves `self` untouched) on a size mismatch.
    pub fn copy_from(&mut self, other: &RasterSurface) -> bool {
        if self.width() != other.width() || self.height() != other.height() {
            return false;
        }
        self.image.copy_from_slice(other.as_raw());
        true
    }

    /// Draw a decoded image at its natural size with source-over blending,
    /// clipped to the surface.
    pub fn draw_image(&mut self, source: &RgbaImage, x: i32, y: i32) {
        let target = PixelRect::new(x, y, source.width() as i32, source.height() as i32);
        let Some(clip) = target.clamp_to(self.width(), self.height()) else {
            return;
        };
        for py in clip.y..clip.bottom() {
            for px in clip.x..clip.right() {
                let src = *source.get_pixel((px - x) as u32, (py - y) as u32);
                match src[3] {
                    0 => {}
                    255 => self.image.put_pixel(px as u32, py as u32, src),
                    _ => self.image.get_pixel_mut(px as u32, py as u32).blend(&src),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn buffer_length_matches_dimensions() {
        let s = RasterSurface::new(7, 3, WHITE);
        assert_eq!(s.as_raw().len(), 7 * 3 * 4);
    }

    #[test]
    fn read_pixel_rejects_out_of_bounds() {
        let s = RasterSurface::new(4, 4, WHITE);
        assert!(s.read_pixel(3, 3).is_ok());
        assert!(matches!(s.read_pixel(4, 0), Err(PaintError::OutOfBounds { .. })));
        assert!(matches!(s.read_pixel(0, -1), Err(PaintError::OutOfBounds { .. })));
    }

    #[test]
    fn get_region_clamps_partial_reads() {
        let mut s = RasterSurface::new(10, 10, WHITE);
        s.fill_rect(8, 8, 2, 2, RED);
        let region = s.get_region(8, 8, 5, 5).unwrap();
        assert_eq!((region.x, region.y), (8, 8));
        assert_eq!((region.pixels.width(), region.pixels.height()), (2, 2));
        assert_eq!(region.pixels.read_pixel(1, 1).unwrap(), RED);

        let region = s.get_region(-3, -3, 5, 5).unwrap();
        assert_eq!((region.x, region.y), (0, 0));
        assert_eq!((region.pixels.width(), region.pixels.height()), (2, 2));
    }

    #[test]
    fn get_region_fails_for_degenerate_rects() {
        let s = RasterSurface::new(10, 10, WHITE);
        assert!(s.get_region(2, 2, 0, 5).is_err());
        assert!(s.get_region(20, 20, 5, 5).is_err());
        assert!(s.get_region(-10, 0, 5, 5).is_err());
    }

    #[test]
    fn put_region_overwrites_and_clips() {
        let mut s = RasterSurface::new(5, 5, WHITE);
        let block = RasterSurface::new(3, 3, RED);
        s.put_region(&block, 3, 3);
        assert_eq!(s.read_pixel(4, 4).unwrap(), RED);
        assert_eq!(s.read_pixel(3, 3).unwrap(), RED);
        assert_eq!(s.read_pixel(2, 2).unwrap(), WHITE);

        let before = s.clone();
        s.put_region(&block, 10, 10);
        assert_eq!(s, before);
    }

    #[test]
    fn put_region_does_not_blend_transparent_pixels() {
        let mut s = RasterSurface::new(2, 2, WHITE);
        let clear = RasterSurface::from_image(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        s.put_region(&clear, 0, 0);
        assert_eq!(s.read_pixel(0, 0).unwrap(), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn fill_rect_forces_opaque_and_normalizes() {
        let mut s = RasterSurface::new(6, 6, WHITE);
        s.fill_rect(4, 4, -2, -2, Rgba([1, 2, 3, 0]));
        assert_eq!(s.read_pixel(2, 2).unwrap(), Rgba([1, 2, 3, 255]));
        assert_eq!(s.read_pixel(3, 3).unwrap(), Rgba([1, 2, 3, 255]));
        assert_eq!(s.read_pixel(4, 4).unwrap(), WHITE);
    }

    #[test]
    fn fitted_from_keeps_aspect_ratio() {
        let src = RgbaImage::from_pixel(4, 2, RED);
        let s = RasterSurface::fitted_from(&src, 8, 8, WHITE);
        assert_eq!(s.read_pixel(7, 3).unwrap(), RED);
        assert_eq!(s.read_pixel(0, 4).unwrap(), WHITE);
    }

    #[test]
    fn normalized_rect_folds_negative_extents() {
        let r = PixelRect::new(10, 10, -4, -6).normalized();
        assert_eq!(r, PixelRect::new(6, 4, 4, 6));
    }

    #[test]
    fn far_off_pointers_and_rects_saturate() {
        assert_eq!(Point::new(3.0e9, -3.0e9).pixel(), (65_536, -65_536));
        assert_eq!(Point::new(f32::NAN, 2.5).pixel(), (0, 2));

        let r = PixelRect::new(i32::MAX - 2, 0, 10, i32::MIN).normalized();
        assert_eq!(r.right(), i32::MAX);
        assert_eq!((r.y, r.height), (i32::MIN, i32::MAX));
        assert!(r.clamp_to(10, 10).is_none());
    }
}
