//! Logging utilities with colored output and a self-overwriting status block.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro gated by `--verbose`
//! - `StatusLine` for the board's connection indicator
//!
//! # Example
//!
//! ```ignore
//! log!("feed"; "connected to {}", url);
//! debug!("route"; "snapshot unchanged ({} stops)", len);
//!
//! let mut status = StatusLine::new();
//! status.success("feed open");
//! status.error("connection lost", "gave up after 60 attempts");
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix.
///
/// Goes to stderr so the JSON-lines renderer can own stdout.
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stderr = std::io::stderr().lock();
    writeln!(stderr, "{prefix} {message}").ok();
    stderr.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "feed" => prefix.bright_blue().bold().to_string(),
        "route" | "layout" => prefix.bright_green().bold().to_string(),
        "anim" => prefix.bright_magenta().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Status Line (single block with overwrite)
// ============================================================================

/// Local wall-clock time formatted as HH:MM:SS
fn now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Single-block status display for the terminal renderer
///
/// Displays status messages that overwrite the previous output,
/// keeping the terminal clean. The last error stays on screen until
/// something else replaces it, which is what the persistent
/// connection-lost indicator relies on.
///
/// # Example
///
/// ```ignore
/// let mut status = StatusLine::new();
/// status.success("feed open");
/// status.warning("reconnecting (3/60)");
/// status.error("connection lost", "gave up after 60 attempts");
/// ```
pub struct StatusLine {
    /// Lines of previous output to clear
    last_lines: usize,
}

/// Global status block shared by the renderers.
static STATUS_LINE: LazyLock<Mutex<StatusLine>> = LazyLock::new(|| Mutex::new(StatusLine::new()));

impl StatusLine {
    /// Create a new status display.
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        self.display(format!("{}", "✗".red()), &message);
    }

    /// Display warning message (⚠ prefix, yellow) with detail.
    pub fn warning(&mut self, detail: &str) {
        self.display(format!("{}", "⚠".yellow()), detail);
    }

    /// Internal display logic with line overwriting.
    fn display(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        // Clear previous output by moving cursor up and clearing
        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed().to_string();
        writeln!(stdout, "{timestamp} {symbol} {message}").ok();
        stdout.flush().ok();

        self.last_lines = Self::line_count(message);
    }

    /// Number of terminal lines a message occupies
    fn line_count(message: &str) -> usize {
        message.matches('\n').count() + 1
    }

    /// Forget the tracked block so the next message starts below it.
    ///
    /// Used after interleaved log output, which would otherwise be erased.
    pub fn detach(&mut self) {
        self.last_lines = 0;
    }
}

/// Global status: success
pub fn status_success(message: &str) {
    STATUS_LINE.lock().success(message);
}

/// Global status: error
pub fn status_error(summary: &str, detail: &str) {
    STATUS_LINE.lock().error(summary, detail);
}

/// Global status: warning
pub fn status_warning(detail: &str) {
    STATUS_LINE.lock().warning(detail);
}

/// Global status: detach after free-form output
pub fn status_detach() {
    STATUS_LINE.lock().detach();
}

// ============================================================================
// Tests
// ============================================================================
