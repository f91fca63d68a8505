//! # Grid Lanes CSS
//!
//! CSS value parsing for the grid-lanes layout polyfill.
//!
//! ## Design Goals
//!
//! 1. **Lengths**: Resolve length tokens to pixels against a layout context
//! 2. **Templates**: Parse `grid-template-*` track lists permissively
//! 3. **Declarations**: Recover declaration blocks the host style engine hides
//! 4. **Placement**: Parse `grid-column` / `grid-row` item placement

pub mod declarations;
pub mod placement;
pub mod template;

pub use declarations::{declares_grid_lanes, parse_declarations, parse_gap, DeclarationMap};
pub use placement::{parse_grid_line, GridLine, ItemPlacement};
pub use template::{
    is_empty_template, parse_template, parse_track_token, tokenize_template, IntrinsicSize,
    RepeatCount, TemplateToken, TrackBreadth,
};

use thiserror::Error;

/// Errors that can occur in CSS operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CssError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Everything a relative length needs to become pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthContext {
    /// Size percentages resolve against.
    pub container_size: f32,
    /// Element font size (em, ch, lh).
    pub font_size: f32,
    /// Root element font size (rem).
    pub root_font_size: f32,
    /// Viewport (vw, vh, vmin, vmax).
    pub viewport: Viewport,
}

impl Default for LengthContext {
    fn default() -> Self {
        Self {
            container_size: 0.0,
            font_size: 16.0,
            root_font_size: 16.0,
            viewport: Viewport::default(),
        }
    }
}

impl LengthContext {
    /// Create a context with default font sizes for the given container size.
    pub fn new(container_size: f32) -> Self {
        Self {
            container_size,
            ..Default::default()
        }
    }

    /// Same context, resolving percentages against another size.
    pub fn with_container_size(mut self, container_size: f32) -> Self {
        self.container_size = container_size;
        self
    }
}

/// A CSS length value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// Pixels.
    Px(f32),
    /// Em (relative to font size).
    Em(f32),
    /// Rem (relative to root font size).
    Rem(f32),
    /// Width of "0", approximated as half the font size.
    Ch(f32),
    /// Line height, approximated as 1.2 times the font size.
    Lh(f32),
    /// Percentage of the container.
    Percent(f32),
    /// Viewport width (1vw = 1% of viewport width).
    Vw(f32),
    /// Viewport height (1vh = 1% of viewport height).
    Vh(f32),
    /// Viewport min (1vmin = 1% of smaller viewport dimension).
    Vmin(f32),
    /// Viewport max (1vmax = 1% of larger viewport dimension).
    Vmax(f32),
}

impl Length {
    /// Compute the absolute pixel value.
    pub fn to_px(&self, ctx: &LengthContext) -> f32 {
        let vw = ctx.viewport.width;
        let vh = ctx.viewport.height;
        match *self {
            Length::Px(px) => px,
            Length::Em(em) => em * ctx.font_size,
            Length::Rem(rem) => rem * ctx.root_font_size,
            Length::Ch(ch) => ch * ctx.font_size * 0.5,
            Length::Lh(lh) => lh * ctx.font_size * 1.2,
            Length::Percent(pct) => pct / 100.0 * ctx.container_size,
            Length::Vw(v) => v / 100.0 * vw,
            Length::Vh(v) => v / 100.0 * vh,
            Length::Vmin(v) => v / 100.0 * vw.min(vh),
            Length::Vmax(v) => v / 100.0 * vw.max(vh),
        }
    }
}

/// Split a dimension like `12.5px` into its number and lowercase unit.
pub(crate) fn split_dimension(value: &str) -> Option<(f32, String)> {
    let number = value.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    let unit = &value[number.len()..];
    let num = number.parse::<f32>().ok()?;
    if !num.is_finite() {
        return None;
    }
    Some((num, unit.to_ascii_lowercase()))
}

/// Parse a length value.
///
/// `fr`, `auto`, `none` and anything unrecognised yield `None`.
pub fn parse_length(value: &str) -> Option<Length> {
    let value = value.trim();
    if value.is_empty() || value == "auto" || value == "none" {
        return None;
    }

    let (num, unit) = split_dimension(value)?;
    match unit.as_str() {
        // Bare numbers are treated as pixels.
        "" | "px" => Some(Length::Px(num)),
        "em" => Some(Length::Em(num)),
        "rem" => Some(Length::Rem(num)),
        "ch" => Some(Length::Ch(num)),
        "lh" => Some(Length::Lh(num)),
        "%" => Some(Length::Percent(num)),
        "vw" => Some(Length::Vw(num)),
        "vh" => Some(Length::Vh(num)),
        "vmin" => Some(Length::Vmin(num)),
        "vmax" => Some(Length::Vmax(num)),
        _ => None,
    }
}

/// Parse and resolve a length to pixels in one step.
pub fn resolve_length(value: &str, ctx: &LengthContext) -> Option<f32> {
    parse_length(value).map(|len| len.to_px(ctx))
}

/// Parse an `<n>fr` flex value.
pub fn parse_flex(value: &str) -> Option<f32> {
    let (num, unit) = split_dimension(value.trim())?;
    (unit == "fr" && num >= 0.0).then_some(num)
}

/// Split CSS function arguments, handling nested parentheses.
pub(crate) fn split_css_function_args(args: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in args.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                result.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = args[start..].trim();
    if !last.is_empty() {
        result.push(last);
    }

    result
}

/// Return the inside of `name(...)` when `value` is exactly that call.
pub(crate) fn function_body<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    let value = value.trim();
    let head = value.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    let rest = value[name.len()..].trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner)
}
