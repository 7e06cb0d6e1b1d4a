// ============================================================================
// SELECTION — rectangular pixel selection: create, move, resize, copy/paste
// ============================================================================

use image::{Rgba, imageops};

use crate::canvas::{PixelRect, Point, RasterSurface};
use crate::ops::clipboard::Clipboard;

/// Which corner of the selection rectangle is being dragged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    /// Hit-test order.
    pub const ALL: [ResizeHandle; 4] = [
        ResizeHandle::TopLeft,
        ResizeHandle::TopRight,
        ResizeHandle::BottomLeft,
        ResizeHandle::BottomRight,
    ];

    pub fn corner(self, r: PixelRect) -> (i32, i32) {
        match self {
            ResizeHandle::TopLeft => (r.x, r.y),
            ResizeHandle::TopRight => (r.right(), r.y),
            ResizeHandle::BottomLeft => (r.x, r.bottom()),
            ResizeHandle::BottomRight => (r.right(), r.bottom()),
        }
    }

    /// The corner that stays put while this handle is dragged.
    pub fn opposite(self) -> ResizeHandle {
        match self {
            ResizeHandle::TopLeft => ResizeHandle::BottomRight,
            ResizeHandle::TopRight => ResizeHandle::BottomLeft,
            ResizeHandle::BottomLeft => ResizeHandle::TopRight,
            ResizeHandle::BottomRight => ResizeHandle::TopLeft,
        }
    }
}

/// What a pointer-down position lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionHit {
    Handle(ResizeHandle),
    Body,
    Outside,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionGesture {
    #[default]
    Idle,
    /// Rubber-banding a new rectangle out of `anchor`.
    Creating { anchor: (i32, i32) },
    /// Pointer minus rectangle origin at grab time.
    Dragging { grab_offset: (i32, i32) },
    Resizing { handle: ResizeHandle, fixed_corner: (i32, i32) },
}

/// Pixels lifted from the surface for a selection.
///
/// When the rectangle hung over a canvas edge only the on-canvas part is
/// stored; `offset` is where that block sits inside the rectangle and
/// `source_size` the rectangle's size at capture time, so the block can be
/// scaled along with a later resize.
#[derive(Clone, Debug, PartialEq)]
pub struct Capture {
    pub pixels: RasterSurface,
    pub offset: (i32, i32),
    pub source_size: (i32, i32),
}

impl Capture {
    /// Read the part of `rect` that lies on `surface`.
    pub fn take(surface: &RasterSurface, rect: PixelRect) -> Option<Capture> {
        let r = rect.normalized();
        let region = surface.get_region(r.x, r.y, r.width, r.height).ok()?;
        Some(Capture {
            offset: (region.x - r.x, region.y - r.y),
            source_size: (r.width, r.height),
            pixels: region.pixels,
        })
    }

    /// Overwrite `target` with this capture laid into `rect`, scaling it
    /// (nearest neighbour) when `rect` differs from the captured size.
    pub fn composite_onto(&self, target: &mut RasterSurface, rect: PixelRect) {
        let r = rect.normalized();
        if r.is_empty() {
            return;
        }
        let (sw, sh) = self.source_size;
        if (r.width, r.height) == (sw, sh) || sw <= 0 || sh <= 0 {
            target.put_region(
                &self.pixels,
                r.x.saturating_add(self.offset.0),
                r.y.saturating_add(self.offset.1),
            );
            return;
        }

        let sx = r.width as f32 / sw as f32;
        let sy = r.height as f32 / sh as f32;
        let nw = ((self.pixels.width() as f32 * sx).round() as u32).max(1);
        let nh = ((self.pixels.height() as f32 * sy).round() as u32).max(1);
        let scaled = imageops::resize(self.pixels.image(), nw, nh, imageops::FilterType::Nearest);
        let ox = (self.offset.0 as f32 * sx).round() as i32;
        let oy = (self.offset.1 as f32 * sy).round() as i32;
        target.put_region(
            &RasterSurface::from_image(scaled),
            r.x.saturating_add(ox),
            r.y.saturating_add(oy),
        );
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    /// Signed while a gesture is live; normalized once it ends.
    pub rect: PixelRect,
    /// Last committed content under `rect` (or the floating block mid-gesture).
    pub pixel_data: Option<Capture>,
    pub gesture: SelectionGesture,
}

impl Selection {
    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, SelectionGesture::Dragging { .. })
    }

    pub fn is_resizing(&self) -> bool {
        matches!(self.gesture, SelectionGesture::Resizing { .. })
    }
}

/// What a selection transition changed, and whether it ends in a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionEffect {
    Unchanged,
    /// Only the selection overlay needs repainting.
    Overlay,
    /// The surface was modified, but the gesture is still in flight.
    Surface,
    /// A new selection was settled over untouched pixels: repaint the overlay
    /// and record a history entry.
    Record,
    /// The surface was modified and the result should become a history entry.
    Commit,
}

impl SelectionEffect {
    pub fn changes_overlay(self) -> bool {
        self != SelectionEffect::Unchanged
    }

    pub fn changes_surface(self) -> bool {
        matches!(self, SelectionEffect::Surface | SelectionEffect::Commit)
    }

    pub fn records_history(self) -> bool {
        matches!(self, SelectionEffect::Record | SelectionEffect::Commit)
    }
}

/// Owns the (single) selection and drives its gesture state machine.
#[derive(Clone, Debug)]
pub struct SelectionManager {
    current: Option<Selection>,
    /// Half-size of the square hit box around each corner.
    handle_size: i32,
}

impl Default for SelectionManager {
    fn default() -> Self {
        Self::new(8)
    }
}

impl SelectionManager {
    pub fn new(handle_size: i32) -> Self {
        Self { current: None, handle_size: handle_size.max(0) }
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.current.as_ref()
    }

    pub fn has_selection(&self) -> bool {
        self.current.is_some()
    }

    /// A pointer gesture is between down and up.
    pub fn is_active(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.gesture != SelectionGesture::Idle)
    }

    /// The lifted block and where it currently floats, while dragging or resizing.
    pub fn floating(&self) -> Option<(&Capture, PixelRect)> {
        let sel = self.current.as_ref()?;
        if !(sel.is_dragging() || sel.is_resizing()) {
            return None;
        }
        sel.pixel_data.as_ref().map(|c| (c, sel.rect))
    }

    /// Handles win over the body, the body over outside.
    pub fn hit_test(&self, x: i32, y: i32) -> SelectionHit {
        let Some(sel) = &self.current else {
            return SelectionHit::Outside;
        };
        let r = sel.rect.normalized();
        let hs = self.handle_size;
        for handle in ResizeHandle::ALL {
            let (hx, hy) = handle.corner(r);
            if x >= hx - hs && x <= hx + hs && y >= hy - hs && y <= hy + hs {
                return SelectionHit::Handle(handle);
            }
        }
        if r.contains(x, y) {
            SelectionHit::Body
        } else {
            SelectionHit::Outside
        }
    }

    pub fn pointer_down(
        &mut self,
        surface: &mut RasterSurface,
        pos: Point,
        background: Rgba<u8>,
    ) -> SelectionEffect {
        if self.is_active() {
            return SelectionEffect::Unchanged;
        }
        let (px, py) = pos.pixel();

        if self.current.is_none() {
            self.current = Some(Selection {
                rect: PixelRect::new(px, py, 0, 0),
                pixel_data: None,
                gesture: SelectionGesture::Creating { anchor: (px, py) },
            });
            return SelectionEffect::Overlay;
        }

        let r = self.current.as_ref().map(|s| s.rect.normalized()).unwrap_or_default();
        let gesture = match self.hit_test(px, py) {
            SelectionHit::Handle(handle) => SelectionGesture::Resizing {
                handle,
                fixed_corner: handle.opposite().corner(r),
            },
            SelectionHit::Body => SelectionGesture::Dragging {
                grab_offset: (px - r.x, py - r.y),
            },
            SelectionHit::Outside => {
                self.current = None;
                return SelectionEffect::Overlay;
            }
        };

        let Some(sel) = self.current.as_mut() else {
            return SelectionEffect::Unchanged;
        };
        // Lift the latest pixels under the rectangle and leave a hole behind,
        // so the block floats over the surface for the rest of the gesture.
        sel.rect = r;
        sel.pixel_data = Capture::take(surface, r);
        surface.fill_rect(r.x, r.y, r.width, r.height, background);
        sel.gesture = gesture;
        crate::log_info!("selection: {:?} at ({}, {})", gesture, px, py);
        SelectionEffect::Surface
    }

    pub fn pointer_move(&mut self, pos: Point) -> SelectionEffect {
        let Some(sel) = self.current.as_mut() else {
            return SelectionEffect::Unchanged;
        };
        let (px, py) = pos.pixel();
        match sel.gesture {
            SelectionGesture::Idle => return SelectionEffect::Unchanged,
            SelectionGesture::Creating { anchor } => {
                sel.rect = PixelRect::new(
                    anchor.0,
                    anchor.1,
                    px.saturating_sub(anchor.0),
                    py.saturating_sub(anchor.1),
                );
            }
            SelectionGesture::Dragging { grab_offset } => {
                sel.rect.x = px.saturating_sub(grab_offset.0);
                sel.rect.y = py.saturating_sub(grab_offset.1);
            }
            SelectionGesture::Resizing { fixed_corner: (fx, fy), .. } => {
                sel.rect = PixelRect::new(fx, fy, px.saturating_sub(fx), py.saturating_sub(fy));
            }
        }
        SelectionEffect::Overlay
    }

    /// End the gesture: normalize, lay the content down at its resting place,
    /// and re-read it as the committed `pixel_data`.
    pub fn pointer_up(&mut self, surface: &mut RasterSurface) -> SelectionEffect {
        let Some(sel) = self.current.as_mut() else {
            return SelectionEffect::Unchanged;
        };
        let gesture = std::mem::take(&mut sel.gesture);
        if gesture == SelectionGesture::Idle {
            return SelectionEffect::Unchanged;
        }

        let r = sel.rect.normalized();
        sel.rect = r;

        if r.is_empty() {
            // A lifted block shrunk to nothing is gone; its hole is real.
            let lifted = matches!(
                gesture,
                SelectionGesture::Dragging { .. } | SelectionGesture::Resizing { .. }
            );
            crate::log_info!("selection: discarded zero-area rectangle");
            self.current = None;
            return if lifted { SelectionEffect::Commit } else { SelectionEffect::Overlay };
        }

        // Only a lifted block writes pixels; a fresh rectangle just reads them.
        let effect = match sel.pixel_data.take() {
            Some(capture) => {
                capture.composite_onto(surface, r);
                SelectionEffect::Commit
            }
            None => SelectionEffect::Record,
        };
        sel.pixel_data = Capture::take(surface, r);

        crate::log_info!(
            "selection: committed {}x{} at ({}, {})",
            r.width, r.height, r.x, r.y
        );
        effect
    }

    /// Drop the selection without touching the surface.
    pub fn cancel(&mut self) -> SelectionEffect {
        if self.is_active() || self.current.is_none() {
            return SelectionEffect::Unchanged;
        }
        self.current = None;
        SelectionEffect::Overlay
    }

    /// Copy the committed content into `clipboard`. False when there is nothing
    /// to copy.
    pub fn copy(&self, clipboard: &mut Clipboard) -> bool {
        let Some(sel) = &self.current else { return false };
        if sel.gesture != SelectionGesture::Idle {
            return false;
        }
        let Some(capture) = &sel.pixel_data else { return false };
        clipboard.store(capture.pixels.clone());
        true
    }

    /// Stamp the clipboard content at `(x, y)` and select it.
    pub fn paste(
        &mut self,
        surface: &mut RasterSurface,
        clipboard: &Clipboard,
        x: i32,
        y: i32,
    ) -> SelectionEffect {
        if self.is_active() {
            return SelectionEffect::Unchanged;
        }
        let Some(fragment) = clipboard.get() else {
            return SelectionEffect::Unchanged;
        };
        surface.put_region(fragment, x, y);
        let rect = PixelRect::new(x, y, fragment.width() as i32, fragment.height() as i32);
        self.current = Some(Selection {
            rect,
            pixel_data: Capture::take(surface, rect),
            gesture: SelectionGesture::Idle,
        });
        crate::log_info!("selection: pasted {}x{} at ({}, {})", rect.width, rect.height, x, y);
        SelectionEffect::Commit
    }

    /// Clear the selected area to `background` and drop the selection.
    pub fn delete(&mut self, surface: &mut RasterSurface, background: Rgba<u8>) -> SelectionEffect {
        if self.is_active() {
            return SelectionEffect::Unchanged;
        }
        let Some(sel) = self.current.take() else {
            return SelectionEffect::Unchanged;
        };
        let r = sel.rect.normalized();
        surface.fill_rect(r.x, r.y, r.width, r.height, background);
        crate::log_info!("selection: deleted {}x{} at ({}, {})", r.width, r.height, r.x, r.y);
        SelectionEffect::Commit
    }

    /// Forget everything (canvas cleared, resized or reloaded).
    pub fn reset(&mut self) {
        self.current = None;
    }
}
