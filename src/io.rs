use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbaImage};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::canvas::RasterSurface;
use crate::error::{PaintError, PaintResult};

// ============================================================================
// SNAPSHOT FORMAT
// ============================================================================

/// Magic header of an encoded surface snapshot.
const SNAPSHOT_MAGIC: &str = "RPS1";

/// Refuse to decode snapshots larger than this on either axis.
pub const MAX_CANVAS_DIM: u32 = 16384;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    magic: &'a str,
    width: u32,
    height: u32,
    pixels: &'a [u8],
}

#[derive(Deserialize)]
struct SnapshotFile {
    magic: String,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// Encode the full surface: magic, dimensions, raw RGBA rows.
pub fn encode_snapshot(surface: &RasterSurface) -> PaintResult<Vec<u8>> {
    let snap = SnapshotRef {
        magic: SNAPSHOT_MAGIC,
        width: surface.width(),
        height: surface.height(),
        pixels: surface.as_raw(),
    };
    Ok(bincode::serialize(&snap)?)
}

pub fn decode_snapshot(raw: &[u8]) -> PaintResult<RasterSurface> {
    let snap: SnapshotFile = bincode::deserialize(raw)?;

    if snap.magic != SNAPSHOT_MAGIC {
        return Err(PaintError::InvalidSnapshot(format!(
            "unknown header '{}'",
            snap.magic
        )));
    }
    if snap.width == 0 || snap.height == 0 {
        return Err(PaintError::InvalidSnapshot(
            "canvas dimensions cannot be zero".into(),
        ));
    }
    if snap.width > MAX_CANVAS_DIM || snap.height > MAX_CANVAS_DIM {
        return Err(PaintError::InvalidSnapshot(format!(
            "canvas size {}x{} exceeds maximum allowed {}x{}",
            snap.width, snap.height, MAX_CANVAS_DIM, MAX_CANVAS_DIM
        )));
    }

    let expected = snap.width as usize * snap.height as usize * 4;
    if snap.pixels.len() != expected {
        return Err(PaintError::InvalidSnapshot(format!(
            "pixel data is {} bytes, expected {}",
            snap.pixels.len(),
            expected
        )));
    }

    let image = RgbaImage::from_raw(snap.width, snap.height, snap.pixels)
        .ok_or_else(|| PaintError::InvalidSnapshot("pixel buffer mismatch".into()))?;
    Ok(RasterSurface::from_image(image))
}

// ============================================================================
// DURABLE STORE
// ============================================================================

/// Key under which the latest committed snapshot is kept.
pub const SAVED_DRAWING_KEY: &str = "saved_drawing";

/// Keyed byte storage that outlives the session.
pub trait SnapshotStore: Send {
    /// `Ok(None)` when nothing is stored under `key`.
    fn read(&self, key: &str) -> PaintResult<Option<Vec<u8>>>;
    fn write(&mut self, key: &str, bytes: &[u8]) -> PaintResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> PaintResult<()>;
}

/// One file per key inside a state directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.rps", key))
    }
}

impl SnapshotStore for FileStore {
    fn read(&self, key: &str) -> PaintResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> PaintResult<()> {
        fs::create_dir_all(&self.dir)?;
        // Write beside the target and rename, so a crash mid-write leaves the
        // previous snapshot intact.
        let path = self.path_for(key);
        let tmp = path.with_extension("rps.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            writer.write_all(bytes)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PaintResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store for tests and throwaway sessions.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self, key: &str) -> PaintResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> PaintResult<()> {
        self.entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PaintResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

// ============================================================================
// IMAGE FILES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Png,
    Jpeg,
    Bmp,
}

impl SaveFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Decode any image file the `image` crate understands into RGBA8.
pub fn load_image_file(path: &Path) -> PaintResult<RgbaImage> {
    let img = image::open(path)?;
    Ok(img.to_rgba8())
}

/// PNG bytes of the current surface, for hosts that handle the download.
pub fn encode_png(surface: &RasterSurface) -> PaintResult<Vec<u8>> {
    let mut out = Vec::new();
    write_encoded(surface.image(), &mut out, SaveFormat::Png, 100)?;
    Ok(out)
}

/// Write the surface to `path`, picking the format from its extension.
pub fn export(surface: &RasterSurface, path: &Path) -> PaintResult<()> {
    let format = SaveFormat::from_path(path).ok_or_else(|| {
        PaintError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("unsupported export format: {}", path.display()),
        ))
    })?;
    encode_and_write(surface.image(), path, format, 90)?;
    crate::log_info!(
        "exported {}x{} surface to {}",
        surface.width(),
        surface.height(),
        path.display()
    );
    Ok(())
}

/// Encode and write an image to a file.
pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> PaintResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_encoded(image, &mut writer, format, quality)?;
    writer.flush()?;
    Ok(())
}

fn write_encoded<W: Write>(
    image: &RgbaImage,
    writer: &mut W,
    format: SaveFormat,
    quality: u8,
) -> PaintResult<()> {
    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(writer);
            #[allow(deprecated)]
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(writer, quality);
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
    }
    Ok(())
}
