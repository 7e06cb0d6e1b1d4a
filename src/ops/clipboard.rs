// ============================================================================
// CLIPBOARD — single-fragment pixel clipboard with optional OS mirror
// ============================================================================

use image::RgbaImage;

use crate::canvas::RasterSurface;

/// Holds at most one copied fragment. Its lifetime is independent of the
/// selection: clearing or deleting a selection leaves the clipboard alone,
/// and only [`Clipboard::store`] replaces the content.
#[derive(Clone, Debug, Default)]
pub struct Clipboard {
    fragment: Option<RasterSurface>,
    /// Also push every stored fragment to the OS clipboard.
    mirror_system: bool,
}

impl Clipboard {
    pub fn new(mirror_system: bool) -> Self {
        Self { fragment: None, mirror_system }
    }

    pub fn store(&mut self, fragment: RasterSurface) {
        if self.mirror_system {
            copy_to_system_clipboard(fragment.image());
        }
        crate::log_info!("clipboard: stored {}x{} fragment", fragment.width(), fragment.height());
        self.fragment = Some(fragment);
    }

    pub fn get(&self) -> Option<&RasterSurface> {
        self.fragment.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.fragment.is_none()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.fragment.as_ref().map(|f| (f.width(), f.height()))
    }
}

// ---------------------------------------------------------------------------
//  System clipboard helpers (OS-level copy/paste via arboard)
// ---------------------------------------------------------------------------

/// Write an RGBA image to the system clipboard. Failures (no display server,
/// headless CI) are logged and otherwise ignored.
pub fn copy_to_system_clipboard(img: &RgbaImage) {
    // arboard wants ImageData { width, height, bytes: Cow<[u8]> } in RGBA order.
    match arboard::Clipboard::new() {
        Ok(mut clip) => {
            let data = arboard::ImageData {
                width: img.width() as usize,
                height: img.height() as usize,
                bytes: std::borrow::Cow::Borrowed(img.as_raw().as_slice()),
            };
            if let Err(e) = clip.set_image(data) {
                crate::log_warn!("system clipboard write failed: {}", e);
            }
        }
        Err(e) => {
            crate::log_warn!("system clipboard unavailable: {}", e);
        }
    }
}

/// Raw image data currently on the system clipboard, if any.
pub fn get_from_system_clipboard() -> Option<RgbaImage> {
    let mut clip = arboard::Clipboard::new().ok()?;
    let img_data = clip.get_image().ok()?;
    RgbaImage::from_raw(
        img_data.width as u32,
        img_data.height as u32,
        img_data.bytes.into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn starts_empty_and_keeps_last_fragment() {
        let mut clip = Clipboard::new(false);
        assert!(clip.is_empty());
        assert_eq!(clip.dimensions(), None);

        clip.store(RasterSurface::new(3, 2, Rgba([1, 2, 3, 255])));
        clip.store(RasterSurface::new(5, 4, Rgba([9, 9, 9, 255])));
        assert_eq!(clip.dimensions(), Some((5, 4)));
        assert_eq!(clip.get().unwrap().read_pixel(0, 0).unwrap(), Rgba([9, 9, 9, 255]));
    }
}
