// ============================================================================
// RasterPaint CLI — headless gesture replay via command-line arguments
// ============================================================================
//
// Usage examples:
//   rasterpaint --script strokes.txt --output result.png
//   rasterpaint -s fill.txt -i photo.png -o out.jpg          (photo loaded first)
//   rasterpaint -s edit.txt -o out.bmp --width 320 --height 240 --verbose
//
// A gesture script is one command per line:
//
//   tool rectangle          color #ff0000        size 4        fill-shape on
//   down 10 10              move 40 30           up            leave
//   key ctrl+z              key ctrl+shift+z     key delete
//   undo    redo    clear   load other.png       resize 640 480
//
// Blank lines and lines starting with `#` are skipped. The whole script is
// parsed before the session is touched, so a typo never half-applies.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::Point;
use crate::components::tools::Tool;
use crate::io::{self, FileStore};
use crate::session::{Key, Modifiers, PaintSession};
use crate::settings::Settings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// RasterPaint headless gesture player.
///
/// Replays a script of pointer, key and toolbar events against a canvas and
/// writes the result to an image file.
#[derive(Parser, Debug)]
#[command(
    name = "rasterpaint",
    about = "RasterPaint headless gesture player",
    long_about = "Replay a script of pointer, keyboard and toolbar events against a\n\
                  paint canvas and export the result. Output format follows the\n\
                  file extension: PNG, JPEG or BMP.\n\n\
                  Example:\n  \
                  rasterpaint --script strokes.txt --output result.png"
)]
pub struct CliArgs {
    /// Gesture script to replay.
    #[arg(short, long, value_name = "FILE")]
    pub script: PathBuf,

    /// Where to write the final canvas (.png, .jpg/.jpeg, .bmp).
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Image drawn onto the canvas before the script runs.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Canvas width, overriding the settings file.
    #[arg(long)]
    pub width: Option<u32>,

    /// Canvas height, overriding the settings file.
    #[arg(long)]
    pub height: Option<u32>,

    /// Directory holding the persisted drawing.
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Settings file to use instead of the platform default.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the effective settings (after --width/--height/--state-dir) back
    /// to the settings file before replaying.
    #[arg(long)]
    pub save_settings: bool,

    /// Log file to use instead of the platform default.
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Print progress and mirror log lines to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Gesture script
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum ScriptCommand {
    Tool(Tool),
    Color(String),
    Size(u32),
    FillShape(bool),
    Down(f32, f32),
    Move(f32, f32),
    Up,
    Leave,
    Key(Key, Modifiers),
    Undo,
    Redo,
    Clear,
    Load(PathBuf),
    Resize(u32, u32),
}

/// A script line that could not be understood.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// Parse a whole script. Stops at the first bad line.
pub fn parse_script(source: &str) -> Result<Vec<ScriptCommand>, ScriptError> {
    let mut commands = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let cmd = parse_line(line).map_err(|message| ScriptError { line: idx + 1, message })?;
        commands.push(cmd);
    }
    Ok(commands)
}

fn parse_line(line: &str) -> Result<ScriptCommand, String> {
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let cmd = match word.to_ascii_lowercase().as_str() {
        "tool" => {
            let [id] = args[..] else { return Err("usage: tool NAME".into()) };
            let tool = Tool::from_id(id).ok_or_else(|| format!("unknown tool '{}'", id))?;
            ScriptCommand::Tool(tool)
        }
        // Colors like `rgb(1, 2, 3)` contain spaces; keep the rest verbatim.
        "color" => {
            if rest.is_empty() {
                return Err("usage: color VALUE".into());
            }
            ScriptCommand::Color(rest.to_string())
        }
        "size" => {
            let [n] = args[..] else { return Err("usage: size N".into()) };
            ScriptCommand::Size(parse_num(n)?)
        }
        "fill-shape" => {
            let [flag] = args[..] else { return Err("usage: fill-shape on|off".into()) };
            ScriptCommand::FillShape(parse_flag(flag)?)
        }
        "down" => {
            let [x, y] = args[..] else { return Err("usage: down X Y".into()) };
            ScriptCommand::Down(parse_num(x)?, parse_num(y)?)
        }
        "move" => {
            let [x, y] = args[..] else { return Err("usage: move X Y".into()) };
            ScriptCommand::Move(parse_num(x)?, parse_num(y)?)
        }
        "up" => no_args(&args, ScriptCommand::Up)?,
        "leave" => no_args(&args, ScriptCommand::Leave)?,
        "key" => {
            let [combo] = args[..] else { return Err("usage: key [ctrl+][shift+]KEY".into()) };
            let (key, mods) = parse_key_combo(combo)?;
            ScriptCommand::Key(key, mods)
        }
        "undo" => no_args(&args, ScriptCommand::Undo)?,
        "redo" => no_args(&args, ScriptCommand::Redo)?,
        "clear" => no_args(&args, ScriptCommand::Clear)?,
        "load" => {
            if rest.is_empty() {
                return Err("usage: load PATH".into());
            }
            ScriptCommand::Load(PathBuf::from(rest))
        }
        "resize" => {
            let [w, h] = args[..] else { return Err("usage: resize W H".into()) };
            let (w, h): (u32, u32) = (parse_num(w)?, parse_num(h)?);
            if w == 0 || h == 0 || w > io::MAX_CANVAS_DIM || h > io::MAX_CANVAS_DIM {
                return Err(format!("canvas size {}x{} out of range", w, h));
            }
            ScriptCommand::Resize(w, h)
        }
        other => return Err(format!("unknown command '{}'", other)),
    };
    Ok(cmd)
}

fn no_args(args: &[&str], cmd: ScriptCommand) -> Result<ScriptCommand, String> {
    if args.is_empty() {
        Ok(cmd)
    } else {
        Err(format!("unexpected argument '{}'", args[0]))
    }
}

fn parse_num<T: std::str::FromStr>(s: &str) -> Result<T, String> {
    s.parse().map_err(|_| format!("invalid number '{}'", s))
}

fn parse_flag(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(format!("expected on or off, got '{}'", s)),
    }
}

fn parse_key_combo(combo: &str) -> Result<(Key, Modifiers), String> {
    let mut mods = Modifiers::NONE;
    let mut parts: Vec<&str> = combo.split('+').collect();
    let name = parts.pop().unwrap_or_default();
    for part in parts {
        match part.to_ascii_lowercase().as_str() {
            "ctrl" | "cmd" | "meta" => mods.ctrl = true,
            "shift" => mods.shift = true,
            other => return Err(format!("unknown modifier '{}'", other)),
        }
    }
    let key = Key::parse(name).ok_or_else(|| format!("unknown key '{}'", name))?;
    Ok((key, mods))
}

// ============================================================================
// Entry point
// ============================================================================

/// Run the CLI. Returns the process exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let start = Instant::now();

    if io::SaveFormat::from_path(&args.output).is_none() {
        eprintln!(
            "error: cannot infer output format from '{}'; use .png, .jpg or .bmp.",
            args.output.display()
        );
        return ExitCode::FAILURE;
    }

    let source = match std::fs::read_to_string(&args.script) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read script '{}': {}", args.script.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let commands = match parse_script(&source) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}: {}", args.script.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    if let Some(w) = args.width {
        settings.canvas_width = w;
    }
    if let Some(h) = args.height {
        settings.canvas_height = h;
    }
    if settings.canvas_width == 0 || settings.canvas_height == 0 {
        eprintln!("error: canvas dimensions cannot be zero.");
        return ExitCode::FAILURE;
    }
    if let Some(dir) = &args.state_dir {
        settings.state_dir = dir.clone();
    }
    if args.save_settings {
        let saved = match &args.config {
            Some(path) => settings.save_to(path),
            None => settings.save(),
        };
        if let Err(e) = saved {
            eprintln!("error: could not save settings: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let store = FileStore::new(settings.state_dir.clone());
    let mut session = PaintSession::with_store(settings, Box::new(store));

    if let Some(input) = &args.input {
        match io::load_image_file(input) {
            Ok(img) => session.on_image_file_loaded(&img),
            Err(e) => {
                eprintln!("error: could not load '{}': {}", input.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(e) = run_script(&mut session, &commands, &args.script, args.verbose) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = io::export(session.surface(), &args.output) {
        eprintln!("error: save failed: {}", e);
        return ExitCode::FAILURE;
    }

    if args.verbose {
        println!(
            "  → {} ({} commands, {:.0}ms)",
            args.output.display(),
            commands.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
    }
    ExitCode::SUCCESS
}

/// Feed every command to the session. Relative `load` paths resolve against
/// the script's directory.
pub fn run_script(
    session: &mut PaintSession,
    commands: &[ScriptCommand],
    script_path: &Path,
    verbose: bool,
) -> Result<(), String> {
    let base = script_path.parent().unwrap_or_else(|| Path::new(""));
    for cmd in commands {
        if verbose {
            println!("  [script] {:?}", cmd);
        }
        apply(session, cmd, base)?;
        session.take_events();
    }
    // A dangling press is finished the way a pointer leaving the canvas would.
    if session.is_gesture_active() {
        session.on_pointer_leave();
    }
    Ok(())
}

fn apply(session: &mut PaintSession, cmd: &ScriptCommand, base: &Path) -> Result<(), String> {
    match cmd {
        ScriptCommand::Tool(tool) => session.on_tool_selected(*tool),
        ScriptCommand::Color(value) => session
            .on_color_selected(value)
            .map_err(|e| format!("color: {}", e))?,
        ScriptCommand::Size(n) => session.on_brush_size_changed(*n),
        ScriptCommand::FillShape(on) => session.on_fill_shape_changed(*on),
        ScriptCommand::Down(x, y) => session.on_pointer_down(Point::new(*x, *y)),
        ScriptCommand::Move(x, y) => session.on_pointer_move(Point::new(*x, *y)),
        ScriptCommand::Up => session.on_pointer_up(),
        ScriptCommand::Leave => session.on_pointer_leave(),
        ScriptCommand::Key(key, mods) => {
            session.on_key_press(*key, *mods);
        }
        ScriptCommand::Undo => session.on_undo_requested(),
        ScriptCommand::Redo => session.on_redo_requested(),
        ScriptCommand::Clear => session.on_clear_requested(),
        ScriptCommand::Load(path) => {
            let path = if path.is_absolute() { path.clone() } else { base.join(path) };
            let img = io::load_image_file(&path)
                .map_err(|e| format!("load '{}': {}", path.display(), e))?;
            session.on_image_file_loaded(&img);
        }
        ScriptCommand::Resize(w, h) => session.on_resize(*w, *h),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryStore;
    use image::Rgba;

    #[test]
    fn parses_every_command() {
        let script = "\
# warm up
tool Rectangle
color rgb(255, 0, 0)
size 3
fill-shape on

down 1 2
move 3.5 4
up
leave
key ctrl+shift+z
key Delete
undo
redo
clear
load pics/cat.png
resize 64 48
";
        let cmds = parse_script(script).unwrap();
        assert_eq!(
            cmds,
            vec![
                ScriptCommand::Tool(Tool::Rectangle),
                ScriptCommand::Color("rgb(255, 0, 0)".into()),
                ScriptCommand::Size(3),
                ScriptCommand::FillShape(true),
                ScriptCommand::Down(1.0, 2.0),
                ScriptCommand::Move(3.5, 4.0),
                ScriptCommand::Up,
                ScriptCommand::Leave,
                ScriptCommand::Key(Key::Char('z'), Modifiers::CTRL_SHIFT),
                ScriptCommand::Key(Key::Delete, Modifiers::NONE),
                ScriptCommand::Undo,
                ScriptCommand::Redo,
                ScriptCommand::Clear,
                ScriptCommand::Load(PathBuf::from("pics/cat.png")),
                ScriptCommand::Resize(64, 48),
            ]
        );
    }

    #[test]
    fn errors_carry_the_line_number() {
        let err = parse_script("tool brush\n\n# note\ndown 1\n").unwrap_err();
        assert_eq!(err.line, 4);
        assert!(err.message.contains("down X Y"));

        assert_eq!(parse_script("wiggle").unwrap_err().line, 1);
        assert!(parse_script("tool lasso").is_err());
        assert!(parse_script("key hyper+z").is_err());
        assert!(parse_script("fill-shape maybe").is_err());
        assert!(parse_script("resize 0 10").is_err());
        assert!(parse_script("up now").is_err());
    }

    #[test]
    fn script_drives_the_session() {
        let settings = Settings {
            canvas_width: 20,
            canvas_height: 20,
            ..Settings::default()
        };
        let mut session = PaintSession::with_store(settings, Box::new(MemoryStore::new()));
        let cmds = parse_script("tool fill\ncolor #00ff00\ndown 5 5\nup\n").unwrap();
        run_script(&mut session, &cmds, Path::new("script.txt"), false).unwrap();
        assert_eq!(session.surface().read_pixel(19, 19).unwrap(), Rgba([0, 255, 0, 255]));

        let cmds = parse_script("key ctrl+z").unwrap();
        run_script(&mut session, &cmds, Path::new("script.txt"), false).unwrap();
        assert_eq!(session.surface().read_pixel(19, 19).unwrap(), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn bad_color_fails_at_run_time() {
        let mut session =
            PaintSession::with_store(Settings::default(), Box::new(MemoryStore::new()));
        let cmds = parse_script("color nonsense").unwrap();
        assert!(run_script(&mut session, &cmds, Path::new("s.txt"), false).is_err());
    }

    #[test]
    fn run_replays_exports_and_saves_settings() {
        let dir = std::env::temp_dir().join(format!("rasterpaint-cli-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let script = dir.join("fill.txt");
        std::fs::write(&script, "tool fill\ncolor #0000ff\ndown 1 1\nup\n").unwrap();

        let args = CliArgs {
            script,
            output: dir.join("out.png"),
            input: None,
            width: Some(6),
            height: Some(4),
            state_dir: Some(dir.join("state")),
            config: Some(dir.join("cfg").join("rasterpaint_settings.cfg")),
            save_settings: true,
            log: None,
            verbose: false,
        };
        assert_eq!(run(args), ExitCode::SUCCESS);

        let out = io::load_image_file(&dir.join("out.png")).unwrap();
        assert_eq!(out.dimensions(), (6, 4));
        assert!(out.pixels().all(|p| *p == Rgba([0, 0, 255, 255])));

        let saved = Settings::load_from(&dir.join("cfg").join("rasterpaint_settings.cfg"));
        assert_eq!((saved.canvas_width, saved.canvas_height), (6, 4));
        assert_eq!(saved.state_dir, dir.join("state"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
