//! Raster paint core: a fixed-size RGBA surface, tools that draw on it, a
//! selection with clipboard, and snapshot undo/redo that survives restarts.
//!
//! [`PaintSession`] is the entry point; a UI feeds it pointer, key and
//! toolbar events and repaints on the [`SessionEvent`]s it reports.

#[macro_use]
pub mod logger;

pub mod canvas;
pub mod cli;
pub mod color;
pub mod components;
pub mod error;
pub mod io;
pub mod ops;
pub mod session;
pub mod settings;

pub use canvas::{PixelRect, Point, RasterSurface};
pub use components::tools::Tool;
pub use error::{PaintError, PaintResult};
pub use session::{Key, Modifiers, PaintSession, SessionEvent};
pub use settings::Settings;
