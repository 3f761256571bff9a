//! ANSI styling for terminal output
//!
//! Every helper goes through a [`Painter`] so that piped output and
//! `NO_COLOR` terminals get plain text.

pub mod colors {
    pub const GREY: u8 = 102;      // #7D7D7D - Punctuation, secondary
    pub const AQUA: u8 = 109;      // #7A9EB5 - Numbers, info
    pub const ORANGE: u8 = 208;    // #F2913D - Warnings, PUT/PATCH
    pub const RED: u8 = 167;       // #E34F45 - Errors, DELETE
    pub const BLUE: u8 = 68;       // #426BD1 - Names, labels
    pub const GREEN: u8 = 71;      // #63C27A - Success, GET
    pub const YELLOW: u8 = 185;    // #CCCC3D - POST
}

pub const RESET: &str = "\x1b[0m";

#[inline]
fn fg(color: u8) -> String {
    format!("\x1b[38;5;{}m", color)
}

#[inline]
fn bold_fg(color: u8) -> String {
    format!("\x1b[1;38;5;{}m", color)
}

/// Applies colors only when enabled
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    fn paint(&self, text: &str, color: u8, bold: bool) -> String {
        if !self.enabled {
            return text.to_string();
        }
        let start = if bold { bold_fg(color) } else { fg(color) };
        format!("{}{}{}", start, text, RESET)
    }

    pub fn success(&self, text: &str) -> String {
        self.paint(text, colors::GREEN, true)
    }

    pub fn error(&self, text: &str) -> String {
        self.paint(text, colors::RED, true)
    }

    pub fn warning(&self, text: &str) -> String {
        self.paint(text, colors::ORANGE, true)
    }

    pub fn info(&self, text: &str) -> String {
        self.paint(text, colors::AQUA, false)
    }

    pub fn label(&self, text: &str) -> String {
        self.paint(text, colors::BLUE, false)
    }

    pub fn muted(&self, text: &str) -> String {
        self.paint(text, colors::GREY, false)
    }

    /// HTTP status code, colored by class; 0 marks a transport error
    pub fn http_status(&self, code: u16) -> String {
        let color = match code / 100 {
            2 => colors::GREEN,
            3 => colors::YELLOW,
            4 => colors::ORANGE,
            5 => colors::RED,
            _ => colors::GREY,
        };
        let text = if code == 0 { "---".to_string() } else { code.to_string() };
        self.paint(&text, color, true)
    }

    pub fn http_method(&self, method: &str) -> String {
        let color = match method.to_uppercase().as_str() {
            "GET" => colors::GREEN,
            "POST" => colors::YELLOW,
            "PUT" | "PATCH" => colors::ORANGE,
            "DELETE" => colors::RED,
            _ => colors::AQUA,
        };
        self.paint(method, color, true)
    }
}
