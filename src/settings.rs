use std::path::{Path, PathBuf};

use image::Rgba;

use crate::color::{BLACK, WHITE, parse_color, to_css};
use crate::error::PaintResult;
use crate::ops::fill::{FillMatch, FillOptions};

/// Persisted configuration for a paint session.
///
/// Stored as `key=value` lines; unknown keys are ignored and unparsable values
/// keep their defaults, so an old or hand-edited file never prevents startup.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background: Rgba<u8>,
    pub brush_size: u32,
    pub color: Rgba<u8>,
    /// Oldest snapshots are dropped beyond this many.
    pub max_history_steps: usize,
    /// Half-size of the square grab area at each selection corner.
    pub handle_size: i32,
    pub paste_offset_x: i32,
    pub paste_offset_y: i32,
    /// 0 = exact RGB match.
    pub fill_tolerance: u8,
    pub fill_halo_px: u32,
    pub mirror_system_clipboard: bool,
    /// Where the durable snapshot lives.
    pub state_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 600,
            background: WHITE,
            brush_size: 5,
            color: BLACK,
            max_history_steps: 50,
            handle_size: 8,
            paste_offset_x: 20,
            paste_offset_y: 20,
            fill_tolerance: 0,
            fill_halo_px: 0,
            mirror_system_clipboard: false,
            state_dir: crate::logger::data_dir().join("RasterPaint").join("state"),
        }
    }
}

impl Settings {
    pub fn fill_options(&self) -> FillOptions {
        FillOptions {
            matching: FillMatch::from_tolerance(self.fill_tolerance),
            halo_px: self.fill_halo_px,
        }
    }

    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("rasterpaint");
            return Some(config_dir.join("rasterpaint_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(
                PathBuf::from(appdata)
                    .join("RasterPaint")
                    .join("rasterpaint_settings.cfg"),
            );
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("RasterPaint")
                    .join("rasterpaint_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("rasterpaint_settings.cfg")))
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "canvas_width={}\n\
             canvas_height={}\n\
             background={}\n\
             brush_size={}\n\
             color={}\n\
             max_history_steps={}\n\
             handle_size={}\n\
             paste_offset_x={}\n\
             paste_offset_y={}\n\
             fill_tolerance={}\n\
             fill_halo_px={}\n\
             mirror_system_clipboard={}\n\
             state_dir={}\n",
            self.canvas_width,
            self.canvas_height,
            to_css(self.background),
            self.brush_size,
            to_css(self.color),
            self.max_history_steps,
            self.handle_size,
            self.paste_offset_x,
            self.paste_offset_y,
            self.fill_tolerance,
            self.fill_halo_px,
            self.mirror_system_clipboard,
            self.state_dir.display(),
        )
    }

    /// Parse settings text. Never fails.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "canvas_width" => {
                    s.canvas_width = val.parse().ok().filter(|w| *w > 0).unwrap_or(s.canvas_width);
                }
                "canvas_height" => {
                    s.canvas_height =
                        val.parse().ok().filter(|h| *h > 0).unwrap_or(s.canvas_height);
                }
                "background" => {
                    if let Ok(c) = parse_color(val) {
                        s.background = c;
                    }
                }
                "brush_size" => {
                    s.brush_size = val.parse().ok().filter(|n| *n > 0).unwrap_or(s.brush_size);
                }
                "color" => {
                    if let Ok(c) = parse_color(val) {
                        s.color = c;
                    }
                }
                "max_history_steps" => {
                    s.max_history_steps = val.parse().ok().filter(|n| *n > 0).unwrap_or(50);
                }
                "handle_size" => {
                    s.handle_size = val.parse().ok().filter(|n| *n >= 0).unwrap_or(8);
                }
                "paste_offset_x" => {
                    s.paste_offset_x = val.parse().unwrap_or(20);
                }
                "paste_offset_y" => {
                    s.paste_offset_y = val.parse().unwrap_or(20);
                }
                "fill_tolerance" => {
                    s.fill_tolerance = val.parse().unwrap_or(0);
                }
                "fill_halo_px" => {
                    s.fill_halo_px = val.parse().unwrap_or(0);
                }
                "mirror_system_clipboard" => {
                    s.mirror_system_clipboard = val == "true";
                }
                "state_dir" => {
                    if !val.is_empty() {
                        s.state_dir = PathBuf::from(val);
                    }
                }
                _ => {}
            }
        }
        s
    }

    /// Load from the platform settings file (defaults if missing or unreadable).
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Save to the platform settings file. A platform without one is a no-op.
    pub fn save(&self) -> PaintResult<()> {
        match Self::settings_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    pub fn save_to(&self, path: &Path) -> PaintResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())?;
        crate::log_info!("settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_config_text() {
        let s = Settings {
            canvas_width: 320,
            canvas_height: 200,
            color: Rgba([12, 200, 7, 255]),
            fill_tolerance: 16,
            mirror_system_clipboard: true,
            state_dir: PathBuf::from("/tmp/rasterpaint-state"),
            ..Settings::default()
        };
        assert_eq!(Settings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn bad_values_and_unknown_keys_fall_back_to_defaults() {
        let s = Settings::parse(
            "canvas_width=0\n\
             color=chartreuse\n\
             max_history_steps=lots\n\
             something_else=1\n\
             no equals sign here\n\
             brush_size = 12 \n",
        );
        let d = Settings::default();
        assert_eq!(s.canvas_width, d.canvas_width);
        assert_eq!(s.color, d.color);
        assert_eq!(s.max_history_steps, 50);
        assert_eq!(s.brush_size, 12);
    }

    #[test]
    fn fill_options_follow_tolerance() {
        let mut s = Settings::default();
        assert_eq!(s.fill_options().matching, FillMatch::Exact);
        s.fill_tolerance = 4;
        s.fill_halo_px = 1;
        assert_eq!(
            s.fill_options(),
            FillOptions { matching: FillMatch::Tolerance(4), halo_px: 1 }
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir()
            .join(format!("rasterpaint-missing-{}.cfg", uuid::Uuid::new_v4()));
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn save_to_creates_parent_dirs_and_loads_back() {
        let dir = std::env::temp_dir().join(format!("rasterpaint-cfg-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("rasterpaint_settings.cfg");
        let s = Settings { brush_size: 9, paste_offset_x: 3, ..Settings::default() };
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), s);

        // A regular file where the parent directory should be.
        let blocked = path.join("child.cfg");
        assert!(s.save_to(&blocked).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
