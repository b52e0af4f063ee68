//! Runtime configuration.
//!
//! Settings live in thread-local state (the element runtime is
//! single-threaded). The viewport size is a signal so layout-dependent
//! code can react to resizes, mirroring how the terminal size is exposed.
//!
//! # Environment
//!
//! [`Config::from_env`] reads:
//! - `SPARK_DOM_VIEWPORT` - `WIDTHxHEIGHT` in pixels (e.g. `1280x720`)
//! - `SPARK_DOM_CHAR_WIDTH` - text advance per character in pixels
//! - `SPARK_DOM_LINE_HEIGHT` - text line height in pixels
//! - `SPARK_DOM_EXTRA_ATTRIBUTES` - comma separated attribute names added to the allow-list

use std::cell::RefCell;
use std::collections::BTreeSet;

use spark_signals::{signal, Signal};

// =============================================================================
// Config
// =============================================================================

/// Element runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Attribute names written to the host node in addition to the built-in allow-list.
    pub extra_allowed_attributes: BTreeSet<String>,
    /// Prefix for positional keys assigned to children without a key or ref.
    pub autokey_prefix: String,
    /// Horizontal advance of one character of text, in pixels.
    pub char_width: f32,
    /// Height of one line of text, in pixels.
    pub line_height: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extra_allowed_attributes: BTreeSet::new(),
            autokey_prefix: "autokey".to_string(),
            char_width: 8.0,
            line_height: 16.0,
        }
    }
}

impl Config {
    /// Build a config from defaults overridden by `SPARK_DOM_*` variables.
    ///
    /// Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("SPARK_DOM_CHAR_WIDTH") {
            match raw.trim().parse::<f32>() {
                Ok(v) if v > 0.0 => config.char_width = v,
                _ => tracing::warn!(value = %raw, "ignoring invalid SPARK_DOM_CHAR_WIDTH"),
            }
        }
        if let Ok(raw) = std::env::var("SPARK_DOM_LINE_HEIGHT") {
            match raw.trim().parse::<f32>() {
                Ok(v) if v > 0.0 => config.line_height = v,
                _ => tracing::warn!(value = %raw, "ignoring invalid SPARK_DOM_LINE_HEIGHT"),
            }
        }
        if let Ok(raw) = std::env::var("SPARK_DOM_EXTRA_ATTRIBUTES") {
            config.extra_allowed_attributes.extend(
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            );
        }
        if let Ok(raw) = std::env::var("SPARK_DOM_VIEWPORT") {
            match parse_viewport(&raw) {
                Some((w, h)) => set_viewport_size(w, h),
                None => tracing::warn!(value = %raw, "ignoring invalid SPARK_DOM_VIEWPORT"),
            }
        }

        config
    }
}

/// Parse `WIDTHxHEIGHT`.
fn parse_viewport(raw: &str) -> Option<(f32, f32)> {
    let (w, h) = raw.trim().split_once(['x', 'X'])?;
    let w = w.trim().parse::<f32>().ok()?;
    let h = h.trim().parse::<f32>().ok()?;
    (w > 0.0 && h > 0.0).then_some((w, h))
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Snapshot of the current config.
pub fn config() -> Config {
    CONFIG.with(|c| c.borrow().clone())
}

/// Replace the current config.
pub fn set_config(config: Config) {
    CONFIG.with(|c| *c.borrow_mut() = config);
}

/// Edit the current config in place.
pub fn update_config(f: impl FnOnce(&mut Config)) {
    CONFIG.with(|c| f(&mut c.borrow_mut()));
}

/// Read a single setting without cloning the whole config.
pub(crate) fn with_config<R>(f: impl FnOnce(&Config) -> R) -> R {
    CONFIG.with(|c| f(&c.borrow()))
}

// =============================================================================
// Viewport Signals
// =============================================================================

thread_local! {
    static VIEWPORT_WIDTH: RefCell<Signal<f32>> = RefCell::new(signal(1024.0));
    static VIEWPORT_HEIGHT: RefCell<Signal<f32>> = RefCell::new(signal(768.0));
}

/// Current viewport width in pixels.
pub fn viewport_width() -> f32 {
    VIEWPORT_WIDTH.with(|w| w.borrow().get())
}

/// Current viewport height in pixels.
pub fn viewport_height() -> f32 {
    VIEWPORT_HEIGHT.with(|h| h.borrow().get())
}

/// Set the viewport size (available space for the root of layout).
pub fn set_viewport_size(width: f32, height: f32) {
    VIEWPORT_WIDTH.with(|w| w.borrow().set(width));
    VIEWPORT_HEIGHT.with(|h| h.borrow().set(height));
}

/// Viewport width signal for reactive tracking.
pub fn viewport_width_signal() -> Signal<f32> {
    VIEWPORT_WIDTH.with(|w| w.borrow().clone())
}

/// Viewport height signal for reactive tracking.
pub fn viewport_height_signal() -> Signal<f32> {
    VIEWPORT_HEIGHT.with(|h| h.borrow().clone())
}

/// Restore default config and viewport (for testing).
pub fn reset_config() {
    set_config(Config::default());
    set_viewport_size(1024.0, 768.0);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_size() {
        reset_config();
        set_viewport_size(1280.0, 720.0);
        assert_eq!(viewport_width(), 1280.0);
        assert_eq!(viewport_height(), 720.0);
        assert_eq!(viewport_width_signal().get(), 1280.0);
    }

    #[test]
    fn test_update_config() {
        reset_config();
        update_config(|c| {
            c.extra_allowed_attributes.insert("foo".to_string());
            c.autokey_prefix = "pos".to_string();
        });
        let current = config();
        assert!(current.extra_allowed_attributes.contains("foo"));
        assert_eq!(current.autokey_prefix, "pos");

        reset_config();
        assert_eq!(config(), Config::default());
    }

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport("800x600"), Some((800.0, 600.0)));
        assert_eq!(parse_viewport(" 640 X 480 "), Some((640.0, 480.0)));
        assert_eq!(parse_viewport("800"), None);
        assert_eq!(parse_viewport("0x600"), None);
        assert_eq!(parse_viewport("wide x tall"), None);
    }
}
