// ============================================================================
// ERRORS — shared failure kinds for surface, fill, history and I/O
// ============================================================================

/// Every fallible operation in the crate reports one of these.
///
/// Gesture-level no-ops (copy with nothing selected, paste with an empty
/// clipboard, delete with no selection) are *not* errors: they return early
/// without touching state.
#[derive(Debug)]
pub enum PaintError {
    /// A region or pixel lies entirely outside the surface, or has no area
    /// after clamping.
    OutOfBounds { x: i32, y: i32, width: i32, height: i32 },
    /// A color string could not be parsed into three 0–255 channels.
    InvalidColor(String),
    Io(std::io::Error),
    Image(image::ImageError),
    Serialize(String),
    /// Decoded bytes are not a snapshot this crate wrote.
    InvalidSnapshot(String),
}

impl PaintError {
    pub(crate) fn out_of_bounds(x: i32, y: i32, width: i32, height: i32) -> Self {
        PaintError::OutOfBounds { x, y, width, height }
    }
}

impl std::fmt::Display for PaintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaintError::OutOfBounds { x, y, width, height } => write!(
                f,
                "region {}x{} at ({}, {}) is outside the surface",
                width, height, x, y
            ),
            PaintError::InvalidColor(s) => write!(f, "invalid color '{}'", s),
            PaintError::Io(e) => write!(f, "I/O error: {}", e),
            PaintError::Image(e) => write!(f, "image error: {}", e),
            PaintError::Serialize(e) => write!(f, "serialization error: {}", e),
            PaintError::InvalidSnapshot(e) => write!(f, "invalid snapshot: {}", e),
        }
    }
}

impl std::error::Error for PaintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PaintError::Io(e) => Some(e),
            PaintError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PaintError {
    fn from(e: std::io::Error) -> Self {
        PaintError::Io(e)
    }
}

impl From<image::ImageError> for PaintError {
    fn from(e: image::ImageError) -> Self {
        PaintError::Image(e)
    }
}

impl From<Box<bincode::ErrorKind>> for PaintError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        PaintError::Serialize(e.to_string())
    }
}

pub type PaintResult<T> = Result<T, PaintError>;
