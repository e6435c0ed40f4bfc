use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{mpsc, Mutex, OnceLock};

use anyhow::{Context, Result};
use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

#[derive(Default)]
struct Logger {
    file: Option<File>,
    tui_tx: Option<mpsc::Sender<String>>,
    echo: bool,
    prefixes: HashMap<String, u8>, // prefix -> color index
}

// Color indices for TUI rendering (mapped in the tui crate)
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;
pub const COLOR_GREEN: u8 = 3;
pub const COLOR_MAGENTA: u8 = 4;

fn logger() -> &'static Mutex<Logger> {
    LOGGER.get_or_init(|| Mutex::new(Logger::default()))
}

/// Open `<log_dir>/app.log` (truncated) and register the core prefixes.
/// On error the logger keeps working without a file.
pub fn init(log_dir: &Path) -> Result<()> {
    register_prefix("probe", COLOR_GRAY);
    register_prefix("poll", COLOR_GRAY);
    register_prefix("cycle", COLOR_BLUE);
    register_prefix("combat", COLOR_BLUE);
    register_prefix("recovery", COLOR_MAGENTA);
    register_prefix("notify", COLOR_GREEN);

    fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log dir {}", log_dir.display()))?;
    let log_path = log_dir.join("app.log");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    if let Ok(mut l) = logger().lock() {
        l.file = Some(file);
    }
    Ok(())
}

/// Wire the TUI log channel.
pub fn set_tui_sender(tx: mpsc::Sender<String>) {
    if let Ok(mut l) = logger().lock() {
        l.tui_tx = Some(tx);
    }
}

/// Mirror every line to stderr (headless runs).
pub fn set_echo(echo: bool) {
    if let Ok(mut l) = logger().lock() {
        l.echo = echo;
    }
}

/// Register a prefix with a color. All subsequent `*_p` calls with this
/// prefix render in that color.
pub fn register_prefix(prefix: &str, color: u8) {
    if let Ok(mut l) = logger().lock() {
        l.prefixes.insert(prefix.to_string(), color);
    }
}

/// Internal: format for TUI channel uses \x1f as field separator:
/// level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage
fn write_log(level: &str, prefix: &str, msg: &str) {
    let ts = Local::now().format("%H:%M:%S").to_string();

    let plain = if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level, msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level, prefix, msg)
    };

    let Ok(mut l) = logger().lock() else { return };
    let color = l.prefixes.get(prefix).copied().unwrap_or(0);

    if let Some(file) = l.file.as_mut() {
        writeln!(file, "{}", plain).ok();
    }
    if l.echo {
        eprintln!("{}", plain);
    }
    if let Some(tx) = &l.tui_tx {
        tx.send(format!("{}\x1f{}\x1f{}\x1f{}\x1f{}", level, prefix, color, ts, msg)).ok();
    }
}

pub fn info(msg: &str) {
    write_log("INFO", "", msg);
}

pub fn warn(msg: &str) {
    write_log("WARN", "", msg);
}

pub fn error(msg: &str) {
    write_log("ERROR", "", msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    write_log("INFO", prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log("WARN", prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log("ERROR", prefix, msg);
}
