use std::io;

use serde::Serialize;

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSetting {
    #[default]
    Automatic,
    Always,
    Never,
}

impl ColorSetting {
    /// Resolve the setting against a concrete output target.
    pub fn use_color(self, target: &impl SupportsColor) -> bool {
        match self {
            ColorSetting::Automatic => target.supports_color(),
            ColorSetting::Always => true,
            ColorSetting::Never => false,
        }
    }
}

pub(crate) mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
}

pub trait SupportsColor {
    fn supports_color(&self) -> bool;
}

impl<T: io::IsTerminal> SupportsColor for T {
    fn supports_color(&self) -> bool {
        self.is_terminal()
    }
}

/// Text wrapped in an escape code when color is enabled.
pub(crate) struct Paint<'a, T> {
    pub value: T,
    pub color: &'a str,
    pub enabled: bool,
}

impl<T: std::fmt::Display> std::fmt::Display for Paint<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.enabled {
            true => write!(f, "{}{}{}", self.color, self.value, colors::RESET),
            false => write!(f, "{}", self.value),
        }
    }
}

pub(crate) fn paint<T>(value: T, color: &str, enabled: bool) -> Paint<'_, T> {
    Paint {
        value,
        color,
        enabled,
    }
}
