//! # Output Configuration
//!
//! Controls how the CLI marks its status lines: with emoji on capable
//! terminals, with bracketed plain-text tags otherwise.
//!
//! The following environment variables and flags are respected:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ```rust,ignore
//! use hostconf::output::{marker, OutputConfig, Status};
//!
//! let out = OutputConfig::from_env_and_flag("auto");
//! println!("{} berweb01 built", marker(&out, Status::Ok));
//! ```

use std::env;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and the `--color` flag
    /// (`always`, `never` or `auto`).
    ///
    /// In auto mode, colors are disabled if `NO_COLOR` is set, `CLICOLOR=0`,
    /// `TERM=dumb`, or stdout is not a TTY (unless `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of NO_COLOR (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Kind of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Scan,
    Ok,
    Error,
    Warning,
    Info,
    Skipped,
    Done,
}

impl Status {
    fn symbols(self) -> (&'static str, &'static str) {
        match self {
            Status::Scan => ("🔍", "[SCAN]"),
            Status::Ok => ("✅", "[OK]"),
            Status::Error => ("❌", "[ERR]"),
            Status::Warning => ("⚠️ ", "[WARN]"),
            Status::Info => ("ℹ️ ", "[INFO]"),
            Status::Skipped => ("⏭️ ", "[SKIP]"),
            Status::Done => ("📦", "[DONE]"),
        }
    }
}

/// The marker printed in front of a status line.
pub fn marker(config: &OutputConfig, status: Status) -> &'static str {
    let (emoji, plain) = status.symbols();
    emoji_or(config, emoji, plain)
}

/// `emoji` when colors are enabled, `plain` otherwise.
pub fn emoji_or<'a>(config: &OutputConfig, emoji: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji
    } else {
        plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_always() {
        let config = OutputConfig::from_env_and_flag("always");
        assert!(config.use_color);
    }

    #[test]
    fn test_color_never() {
        let config = OutputConfig::from_env_and_flag("NEVER");
        assert!(!config.use_color);
    }

    #[test]
    fn test_marker_with_color() {
        let config = OutputConfig { use_color: true };
        assert_eq!(marker(&config, Status::Ok), "✅");
        assert_eq!(marker(&config, Status::Error), "❌");
    }

    #[test]
    fn test_marker_without_color() {
        let config = OutputConfig { use_color: false };
        assert_eq!(marker(&config, Status::Skipped), "[SKIP]");
        assert_eq!(marker(&config, Status::Warning), "[WARN]");
    }
}
