// ============================================================================
// PAINT SESSION — one canvas, its selection, clipboard, history and tool state
// ============================================================================

use image::{Rgba, RgbaImage};
use uuid::Uuid;

use crate::canvas::{Point, RasterSurface};
use crate::color::parse_color;
use crate::components::history::History;
use crate::components::selection::{SelectionEffect, SelectionManager};
use crate::components::tools::{MAX_BRUSH_SIZE, Tool, ToolProperties};
use crate::error::PaintResult;
use crate::io::{FileStore, SnapshotStore};
use crate::ops::clipboard::{self, Clipboard};
use crate::ops::fill::flood_fill;
use crate::ops::shapes;
use crate::settings::Settings;

/// Notifications for the UI layer, drained with [`PaintSession::take_events`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Pixels changed; repaint the canvas.
    SurfaceChanged,
    /// The selection rectangle or its floating content changed; repaint the overlay.
    SelectionChanged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Delete,
    Backspace,
    Escape,
}

impl Key {
    /// Parse a key name: a single character, or `Delete`/`Del`, `Backspace`,
    /// `Escape`/`Esc` (any case).
    pub fn parse(name: &str) -> Option<Key> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Key::Char(c.to_ascii_lowercase()));
        }
        match name.to_ascii_lowercase().as_str() {
            "delete" | "del" => Some(Key::Delete),
            "backspace" => Some(Key::Backspace),
            "escape" | "esc" => Some(Key::Escape),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { ctrl: false, shift: false };
    pub const CTRL: Modifiers = Modifiers { ctrl: true, shift: false };
    pub const CTRL_SHIFT: Modifiers = Modifiers { ctrl: true, shift: true };
}

/// A drawing tool drag. The surface is rebuilt from `base` on every move.
struct StrokeGesture {
    tool: Tool,
    base: RasterSurface,
    points: Vec<Point>,
}

enum Gesture {
    None,
    Stroke(StrokeGesture),
    Select,
    Fill { changed: bool },
}

pub struct PaintSession {
    pub id: Uuid,
    settings: Settings,
    surface: RasterSurface,
    background: Rgba<u8>,
    tool: Tool,
    properties: ToolProperties,
    selection: SelectionManager,
    clipboard: Clipboard,
    history: History,
    gesture: Gesture,
    events: Vec<SessionEvent>,
}

impl PaintSession {
    /// Session persisting into `settings.state_dir`.
    pub fn new(settings: Settings) -> Self {
        let store = FileStore::new(settings.state_dir.clone());
        Self::with_store(settings, Box::new(store))
    }

    /// Start from the stored drawing if there is a usable one, otherwise a
    /// blank background canvas. Either way it becomes history entry 0.
    pub fn with_store(settings: Settings, store: Box<dyn SnapshotStore>) -> Self {
        let id = Uuid::new_v4();
        let background = settings.background;
        let history = History::new(settings.max_history_steps, store);

        let (w, h) = (settings.canvas_width, settings.canvas_height);
        let surface = match history.load_stored() {
            Some(stored) if stored.width() == w && stored.height() == h => stored,
            Some(stored) => {
                crate::log_info!(
                    "session {}: fitting stored {}x{} drawing to {}x{}",
                    id, stored.width(), stored.height(), w, h
                );
                RasterSurface::fitted_from(stored.image(), w, h, background)
            }
            None => RasterSurface::new(w, h, background),
        };

        let mut session = Self {
            id,
            properties: ToolProperties {
                size: settings.brush_size.clamp(1, MAX_BRUSH_SIZE),
                color: settings.color,
                fill_shape: false,
            },
            selection: SelectionManager::new(settings.handle_size),
            clipboard: Clipboard::new(settings.mirror_system_clipboard),
            settings,
            surface,
            background,
            tool: Tool::default(),
            history,
            gesture: Gesture::None,
            events: Vec::new(),
        };
        session.seed_history();
        crate::log_info!(
            "session {} started: {}x{} canvas",
            session.id,
            session.surface.width(),
            session.surface.height()
        );
        session
    }

    // --- accessors -------------------------------------------------------

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn background(&self) -> Rgba<u8> {
        self.background
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn properties(&self) -> &ToolProperties {
        &self.properties
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// True between pointer down and pointer up.
    pub fn is_gesture_active(&self) -> bool {
        !matches!(self.gesture, Gesture::None)
    }

    /// Drain pending notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// The surface with any floating selection content laid over it, for
    /// display. The surface itself is not modified.
    pub fn composite_preview(&self) -> RasterSurface {
        let mut preview = self.surface.clone();
        if let Some((capture, rect)) = self.selection.floating() {
            capture.composite_onto(&mut preview, rect);
        }
        preview
    }

    // --- pointer ---------------------------------------------------------

    pub fn on_pointer_down(&mut self, pos: Point) {
        if self.is_gesture_active() {
            return;
        }
        match self.tool {
            Tool::Fill => {
                let options = self.settings.fill_options();
                let color = self.properties.color;
                let changed =
                    flood_fill(&mut self.surface, pos.pixel(), color, &options).is_some();
                if changed {
                    self.notify(SessionEvent::SurfaceChanged);
                }
                self.gesture = Gesture::Fill { changed };
            }
            Tool::Select => {
                let effect = self.selection.pointer_down(&mut self.surface, pos, self.background);
                self.apply_selection_effect(effect);
                self.gesture = Gesture::Select;
            }
            tool => {
                let stroke = StrokeGesture {
                    tool,
                    base: self.surface.clone(),
                    points: vec![pos],
                };
                self.render_stroke(&stroke);
                self.gesture = Gesture::Stroke(stroke);
            }
        }
    }

    pub fn on_pointer_move(&mut self, pos: Point) {
        match std::mem::replace(&mut self.gesture, Gesture::None) {
            Gesture::Stroke(mut stroke) => {
                if stroke.tool.shape_kind() == Some(shapes::ShapeKind::Freehand) {
                    stroke.points.push(pos);
                } else {
                    stroke.points.truncate(1);
                    stroke.points.push(pos);
                }
                self.surface.copy_from(&stroke.base);
                self.render_stroke(&stroke);
                self.gesture = Gesture::Stroke(stroke);
            }
            Gesture::Select => {
                let effect = self.selection.pointer_move(pos);
                self.apply_selection_effect(effect);
                self.gesture = Gesture::Select;
            }
            other => self.gesture = other,
        }
    }

    pub fn on_pointer_up(&mut self) {
        match std::mem::replace(&mut self.gesture, Gesture::None) {
            Gesture::None => {}
            Gesture::Stroke(_) | Gesture::Fill { changed: true } => self.commit(),
            Gesture::Fill { changed: false } => {}
            Gesture::Select => {
                let effect = self.selection.pointer_up(&mut self.surface);
                self.apply_selection_effect(effect);
            }
        }
    }

    /// The pointer left the canvas; ends the gesture like a release.
    pub fn on_pointer_leave(&mut self) {
        self.on_pointer_up();
    }

    // --- toolbar ---------------------------------------------------------

    pub fn on_tool_selected(&mut self, tool: Tool) {
        if self.tool != tool {
            crate::log_info!("session {}: tool {}", self.id, tool.id());
        }
        self.tool = tool;
    }

    /// Parse and adopt a color. A bad string leaves the current color as is.
    pub fn on_color_selected(&mut self, color: &str) -> PaintResult<()> {
        self.properties.color = parse_color(color)?;
        Ok(())
    }

    pub fn on_brush_size_changed(&mut self, size: u32) {
        self.properties.size = size.clamp(1, MAX_BRUSH_SIZE);
    }

    pub fn on_fill_shape_changed(&mut self, fill: bool) {
        self.properties.fill_shape = fill;
    }

    // --- keyboard --------------------------------------------------------

    /// Returns true when the key was consumed. Keys are ignored mid-gesture.
    pub fn on_key_press(&mut self, key: Key, mods: Modifiers) -> bool {
        if self.is_gesture_active() {
            return false;
        }
        match (key, mods.ctrl, mods.shift) {
            (Key::Char('z'), true, false) => {
                self.on_undo_requested();
                return true;
            }
            (Key::Char('y'), true, _) | (Key::Char('z'), true, true) => {
                self.on_redo_requested();
                return true;
            }
            _ => {}
        }

        if self.tool != Tool::Select {
            return false;
        }
        match (key, mods.ctrl) {
            (Key::Char('c'), true) => {
                self.copy();
                true
            }
            (Key::Char('v'), true) => {
                self.paste();
                true
            }
            (Key::Delete | Key::Backspace, _) => {
                self.delete_selection();
                true
            }
            (Key::Escape, _) => {
                let effect = self.selection.cancel();
                self.apply_selection_effect(effect);
                true
            }
            _ => false,
        }
    }

    // --- selection operations -------------------------------------------

    pub fn copy(&mut self) -> bool {
        self.selection.copy(&mut self.clipboard)
    }

    /// Paste at the configured offset from the origin.
    pub fn paste(&mut self) {
        if self.clipboard.is_empty()
            && self.settings.mirror_system_clipboard
            && let Some(img) = clipboard::get_from_system_clipboard()
        {
            self.clipboard.store(RasterSurface::from_image(img));
        }
        let (x, y) = (self.settings.paste_offset_x, self.settings.paste_offset_y);
        let effect = self.selection.paste(&mut self.surface, &self.clipboard, x, y);
        self.apply_selection_effect(effect);
    }

    pub fn delete_selection(&mut self) {
        let effect = self.selection.delete(&mut self.surface, self.background);
        self.apply_selection_effect(effect);
    }

    // --- history ---------------------------------------------------------

    pub fn on_undo_requested(&mut self) {
        if self.is_gesture_active() {
            return;
        }
        let Some(entry) = self.history.undo() else { return };
        match entry.decode() {
            Ok(snapshot) => self.restore(snapshot),
            Err(e) => {
                crate::log_err!("session {}: undo snapshot unreadable: {}", self.id, e);
            }
        }
    }

    pub fn on_redo_requested(&mut self) {
        if self.is_gesture_active() {
            return;
        }
        let Some(entry) = self.history.redo() else { return };
        match entry.decode() {
            Ok(snapshot) => self.restore(snapshot),
            Err(e) => {
                crate::log_err!("session {}: redo snapshot unreadable: {}", self.id, e);
            }
        }
    }

    /// Wipe the canvas, the history and the stored drawing.
    pub fn on_clear_requested(&mut self) {
        self.gesture = Gesture::None;
        self.history.reset();
        let (w, h) = (self.surface.width(), self.surface.height());
        self.surface = RasterSurface::new(w, h, self.background);
        self.selection.reset();
        self.seed_history();
        self.notify(SessionEvent::SurfaceChanged);
        self.notify(SessionEvent::SelectionChanged);
        crate::log_info!("session {}: cleared", self.id);
    }

    // --- canvas ----------------------------------------------------------

    /// Draw a decoded image at the origin at its natural size and commit.
    pub fn on_image_file_loaded(&mut self, image: &RgbaImage) {
        if self.is_gesture_active() {
            return;
        }
        self.surface.draw_image(image, 0, 0);
        self.notify(SessionEvent::SurfaceChanged);
        self.commit();
        crate::log_info!(
            "session {}: loaded {}x{} image",
            self.id,
            image.width(),
            image.height()
        );
    }

    /// Replace the surface with a `width × height` one, carrying the current
    /// drawing over scaled to the new width.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.gesture = Gesture::None;
        let fitted =
            RasterSurface::fitted_from(self.surface.image(), width, height, self.background);
        self.surface = fitted;
        self.selection.reset();
        self.notify(SessionEvent::SurfaceChanged);
        self.notify(SessionEvent::SelectionChanged);
        self.commit();
    }

    // --- internals -------------------------------------------------------

    fn render_stroke(&mut self, stroke: &StrokeGesture) {
        let Some(kind) = stroke.tool.shape_kind() else { return };
        let style = self.properties.stroke_style(stroke.tool, self.background);
        shapes::render(&mut self.surface, kind, &stroke.points, &style);
        self.notify(SessionEvent::SurfaceChanged);
    }

    fn apply_selection_effect(&mut self, effect: SelectionEffect) {
        if effect.changes_overlay() {
            self.notify(SessionEvent::SelectionChanged);
        }
        if effect.changes_surface() {
            self.notify(SessionEvent::SurfaceChanged);
        }
        if effect.records_history() {
            self.commit();
        }
    }

    /// Put a history snapshot back, fitting it if the canvas size changed
    /// since it was taken.
    fn restore(&mut self, snapshot: RasterSurface) {
        if !self.surface.copy_from(&snapshot) {
            self.surface = RasterSurface::fitted_from(
                snapshot.image(),
                self.surface.width(),
                self.surface.height(),
                self.background,
            );
        }
        if self.selection.has_selection() {
            self.selection.reset();
            self.notify(SessionEvent::SelectionChanged);
        }
        self.notify(SessionEvent::SurfaceChanged);
    }

    fn commit(&mut self) {
        match self.history.commit(&self.surface) {
            Ok(()) => {
                crate::log_info!(
                    "session {}: history {}/{} entries, {} KiB",
                    self.id,
                    self.history.cursor() + 1,
                    self.history.len(),
                    self.history.memory_usage() / 1024
                );
            }
            Err(e) => {
                crate::log_err!("session {}: history commit failed: {}", self.id, e);
            }
        }
    }

    fn seed_history(&mut self) {
        if let Err(e) = self.history.seed(&self.surface) {
            crate::log_err!("session {}: could not record initial state: {}", self.id, e);
        }
    }

    fn notify(&mut self, event: SessionEvent) {
        if !self.events.contains(&event) {
            self.events.push(event);
        }
    }
}

impl std::fmt::Debug for PaintSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaintSession")
            .field("id", &self.id)
            .field("size", &(self.surface.width(), self.surface.height()))
            .field("tool", &self.tool)
            .field("history", &self.history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelRect;
    use crate::io::MemoryStore;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn session(w: u32, h: u32) -> PaintSession {
        let settings = Settings {
            canvas_width: w,
            canvas_height: h,
            handle_size: 2,
            ..Settings::default()
        };
        PaintSession::with_store(settings, Box::new(MemoryStore::new()))
    }

    fn pt(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn starts_blank_with_one_history_entry() {
        let s = session(20, 10);
        assert_eq!((s.surface().width(), s.surface().height()), (20, 10));
        assert!(s.surface().image().pixels().all(|p| *p == WHITE));
        assert_eq!((s.history().len(), s.history().cursor()), (1, 0));
    }

    #[test]
    fn fill_then_undo_restores_blank() {
        let mut s = session(10, 10);
        s.on_tool_selected(Tool::Fill);
        s.on_color_selected("rgb(255, 0, 0)").unwrap();
        s.on_pointer_down(pt(5.0, 5.0));
        s.on_pointer_up();
        assert!(s.surface().image().pixels().all(|p| *p == RED));
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.take_events(), vec![SessionEvent::SurfaceChanged]);

        // Same fill again: nothing changes, nothing is committed.
        s.on_pointer_down(pt(2.0, 2.0));
        s.on_pointer_up();
        assert_eq!(s.history().len(), 2);
        assert!(s.take_events().is_empty());

        s.on_key_press(Key::Char('z'), Modifiers::CTRL);
        assert!(s.surface().image().pixels().all(|p| *p == WHITE));
        s.on_key_press(Key::Char('z'), Modifiers::CTRL_SHIFT);
        assert!(s.surface().image().pixels().all(|p| *p == RED));
    }

    #[test]
    fn shape_preview_leaves_no_residue() {
        let mut s = session(40, 40);
        s.on_tool_selected(Tool::Rectangle);
        s.on_brush_size_changed(1);
        s.on_pointer_down(pt(5.0, 5.0));
        s.on_pointer_move(pt(30.0, 30.0));
        s.on_pointer_move(pt(10.0, 10.0));
        s.on_pointer_up();
        // The larger intermediate rectangle is gone.
        assert_eq!(s.surface().read_pixel(30, 20).unwrap(), WHITE);
        assert_ne!(s.surface().read_pixel(10, 7).unwrap(), WHITE);
        assert_eq!(s.history().len(), 2);
    }

    #[test]
    fn freehand_accumulates_the_whole_path() {
        let mut s = session(40, 20);
        s.on_brush_size_changed(2);
        s.on_pointer_down(pt(2.5, 10.5));
        s.on_pointer_move(pt(20.5, 10.5));
        s.on_pointer_move(pt(37.5, 10.5));
        s.on_pointer_up();
        for x in [2, 10, 20, 30, 37] {
            assert_ne!(s.surface().read_pixel(x, 10).unwrap(), WHITE, "x = {x}");
        }

        s.on_tool_selected(Tool::Eraser);
        s.on_brush_size_changed(4);
        s.on_pointer_down(pt(20.5, 10.5));
        s.on_pointer_up();
        assert_eq!(s.surface().read_pixel(20, 10).unwrap(), WHITE);
        assert_eq!(s.history().len(), 3);
    }

    #[test]
    fn copy_paste_then_undo() {
        let mut s = session(60, 60);
        s.on_tool_selected(Tool::Fill);
        s.on_color_selected("#ff0000").unwrap();
        s.on_pointer_down(pt(1.0, 1.0));
        s.on_pointer_up();

        s.on_tool_selected(Tool::Select);
        s.on_pointer_down(pt(0.0, 0.0));
        s.on_pointer_move(pt(10.0, 10.0));
        s.on_pointer_up();
        assert!(s.on_key_press(Key::Char('c'), Modifiers::CTRL));
        assert_eq!(s.clipboard().dimensions(), Some((10, 10)));

        s.on_key_press(Key::Escape, Modifiers::NONE);
        assert!(!s.selection().has_selection());

        let entries_before_paste = s.history().len();
        assert!(s.on_key_press(Key::Char('v'), Modifiers::CTRL));
        assert_eq!(s.history().len(), entries_before_paste + 1);
        assert_eq!(
            s.selection().selection().map(|sel| sel.rect),
            Some(PixelRect::new(20, 20, 10, 10))
        );

        s.on_undo_requested();
        assert!(!s.selection().has_selection());
        assert_eq!(s.history().cursor(), entries_before_paste - 1);
    }

    #[test]
    fn selection_keys_need_the_select_tool() {
        let mut s = session(20, 20);
        assert!(!s.on_key_press(Key::Char('v'), Modifiers::CTRL));
        assert!(!s.on_key_press(Key::Delete, Modifiers::NONE));
    }

    #[test]
    fn preview_floats_the_dragged_block_without_touching_the_surface() {
        let mut s = session(30, 30);
        s.on_tool_selected(Tool::Fill);
        s.on_color_selected("rgb(255, 0, 0)").unwrap();
        s.on_pointer_down(pt(0.0, 0.0));
        s.on_pointer_up();

        s.on_tool_selected(Tool::Select);
        s.on_pointer_down(pt(5.0, 5.0));
        s.on_pointer_move(pt(15.0, 15.0));
        s.on_pointer_up();
        s.take_events();

        s.on_pointer_down(pt(10.0, 10.0));
        s.on_pointer_move(pt(20.0, 20.0));
        // Lifted area is background on the surface, but the block shows in the preview.
        assert_eq!(s.surface().read_pixel(15, 15).unwrap(), RED);
        assert_eq!(s.surface().read_pixel(6, 6).unwrap(), WHITE);
        let preview = s.composite_preview();
        assert_eq!(preview.read_pixel(6, 6).unwrap(), WHITE);
        assert_eq!(preview.read_pixel(16, 16).unwrap(), RED);
        assert_eq!(
            s.take_events(),
            vec![SessionEvent::SelectionChanged, SessionEvent::SurfaceChanged]
        );
        s.on_pointer_up();
        assert_eq!(s.surface().read_pixel(16, 16).unwrap(), RED);
    }

    #[test]
    fn invalid_color_keeps_the_previous_one() {
        let mut s = session(5, 5);
        s.on_color_selected("rgb(1, 2, 3)").unwrap();
        assert!(s.on_color_selected("rgb(1, 2)").is_err());
        assert_eq!(s.properties().color, Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn resize_carries_the_drawing_and_undo_fits_old_snapshots() {
        let mut s = session(10, 10);
        s.on_tool_selected(Tool::Fill);
        s.on_color_selected("rgb(255, 0, 0)").unwrap();
        s.on_pointer_down(pt(1.0, 1.0));
        s.on_pointer_up();

        s.on_resize(20, 30);
        assert_eq!((s.surface().width(), s.surface().height()), (20, 30));
        assert_eq!(s.surface().read_pixel(19, 19).unwrap(), RED);
        assert_eq!(s.surface().read_pixel(0, 25).unwrap(), WHITE);

        s.on_undo_requested();
        assert_eq!((s.surface().width(), s.surface().height()), (20, 30));
        assert_eq!(s.surface().read_pixel(0, 0).unwrap(), RED);
    }

    #[test]
    fn clear_resets_everything() {
        let mut s = session(10, 10);
        s.on_brush_size_changed(3);
        s.on_pointer_down(pt(5.0, 5.0));
        s.on_pointer_up();
        s.on_clear_requested();
        assert!(s.surface().image().pixels().all(|p| *p == WHITE));
        assert_eq!((s.history().len(), s.history().cursor()), (1, 0));
        assert!(s.history().load_stored().is_none());
    }

    #[test]
    fn extreme_pointer_input_is_clamped() {
        let mut s = session(20, 20);
        s.on_pointer_down(pt(3.0e9, 5.0));
        s.on_pointer_up();
        assert!(s.surface().image().pixels().all(|p| *p == WHITE));

        s.on_brush_size_changed(u32::MAX);
        assert_eq!(s.properties().size, MAX_BRUSH_SIZE);
        s.on_pointer_down(pt(10.0, 10.0));
        s.on_pointer_up();
        assert!(s.surface().image().pixels().all(|p| *p == Rgba([0, 0, 0, 255])));

        s.on_tool_selected(Tool::Select);
        s.on_pointer_down(pt(-5.0, -5.0));
        s.on_pointer_move(pt(3.0e9, 3.0e9));
        s.on_pointer_up();
        let sel = s.selection().selection().unwrap();
        assert_eq!(sel.rect, PixelRect::new(-5, -5, 65_541, 65_541));
        assert!(sel.pixel_data.is_some());
    }

    #[test]
    fn settling_a_new_selection_records_history_without_a_surface_event() {
        let mut s = session(30, 30);
        s.on_tool_selected(Tool::Select);
        let before = s.surface().clone();
        s.on_pointer_down(pt(4.0, 4.0));
        s.on_pointer_move(pt(12.0, 9.0));
        s.on_pointer_up();

        assert_eq!(s.history().len(), 2);
        assert_eq!(s.take_events(), vec![SessionEvent::SelectionChanged]);
        assert_eq!(s.surface(), &before);
    }
}
