//! `grid-template-columns` / `grid-template-rows` parsing.
//!
//! The parser is permissive: tokens it cannot classify are dropped so that
//! partially supported templates still produce usable lanes.

use smallvec::SmallVec;
use tracing::trace;

use crate::{function_body, parse_flex, parse_length, split_css_function_args, CssError, Length};

/// Intrinsic sizing keyword accepted as a `minmax()` bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicSize {
    Auto,
    MinContent,
    MaxContent,
}

/// One bound of a `minmax()` track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackBreadth {
    /// Definite length.
    Length(Length),
    /// Flexible `fr` value.
    Flex(f32),
    /// Content-based keyword; resolved as zero by the lane sizer.
    Intrinsic(IntrinsicSize),
}

/// Repetition count of a `repeat()` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatCount {
    /// Repeat a fixed number of times.
    Count(u32),
    /// As many as fit.
    AutoFill,
    /// As many as fit; empty lanes may collapse.
    AutoFit,
}

/// A parsed track-list token.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateToken {
    /// Fixed length track.
    Fixed(Length),
    /// Flexible `fr` track.
    Flex(f32),
    /// `minmax(min, max)` track.
    MinMax(TrackBreadth, TrackBreadth),
    /// `repeat(count, pattern)`. The pattern never contains another repeat.
    Repeat(RepeatCount, Vec<TemplateToken>),
}

impl TemplateToken {
    /// Create a fixed pixel track.
    pub fn px(value: f32) -> Self {
        TemplateToken::Fixed(Length::Px(value))
    }

    /// Create a flexible track.
    pub fn fr(value: f32) -> Self {
        TemplateToken::Flex(value)
    }

    /// Check if this track takes a share of the free space.
    pub fn is_flexible(&self) -> bool {
        match self {
            TemplateToken::Flex(_) => true,
            TemplateToken::MinMax(_, max) => matches!(max, TrackBreadth::Flex(_)),
            TemplateToken::Repeat(_, pattern) => pattern.iter().any(TemplateToken::is_flexible),
            TemplateToken::Fixed(_) => false,
        }
    }
}

/// Whether a template value defines no lanes (`none`, `auto...`, empty).
pub fn is_empty_template(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.eq_ignore_ascii_case("none") || value.starts_with("auto")
}

/// Split a template on top-level whitespace, keeping `(...)` groups intact.
pub fn tokenize_template(template: &str) -> SmallVec<[&str; 8]> {
    let mut tokens = SmallVec::new();
    let mut depth = 0i32;
    let mut start: Option<usize> = None;

    for (i, c) in template.char_indices() {
        match c {
            '(' => {
                depth += 1;
                start.get_or_insert(i);
            }
            ')' => {
                depth -= 1;
                start.get_or_insert(i);
            }
            c if c.is_whitespace() && depth <= 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&template[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }

    if let Some(s) = start {
        tokens.push(template[s..].trim_end());
    }

    tokens
}

/// Parse a whole template, dropping tokens that fail to parse.
pub fn parse_template(template: &str) -> Vec<TemplateToken> {
    if is_empty_template(template) {
        return Vec::new();
    }

    tokenize_template(template)
        .into_iter()
        .filter_map(|token| match parse_track_token(token) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                trace!(token, %err, "Dropping template token");
                None
            }
        })
        .collect()
}

/// Classify a single template token.
pub fn parse_track_token(token: &str) -> Result<TemplateToken, CssError> {
    parse_token(token, true)
}

fn parse_token(token: &str, allow_repeat: bool) -> Result<TemplateToken, CssError> {
    let token = token.trim();

    if let Some(body) = function_body(token, "repeat") {
        if !allow_repeat {
            return Err(CssError::InvalidValue(format!("nested repeat(): {token}")));
        }
        return parse_repeat(body);
    }

    if let Some(body) = function_body(token, "minmax") {
        return parse_minmax(body);
    }

    if let Some(fr) = parse_flex(token) {
        return Ok(TemplateToken::Flex(fr));
    }

    match parse_length(token) {
        Some(len) => Ok(TemplateToken::Fixed(len)),
        None => Err(CssError::ParseError(format!("unrecognised track size: {token}"))),
    }
}

fn parse_repeat(body: &str) -> Result<TemplateToken, CssError> {
    let (count, pattern) = body
        .split_once(',')
        .ok_or_else(|| CssError::ParseError(format!("repeat() needs a count and a pattern: {body}")))?;

    let count = match count.trim().to_ascii_lowercase().as_str() {
        "auto-fill" => RepeatCount::AutoFill,
        "auto-fit" => RepeatCount::AutoFit,
        other => RepeatCount::Count(
            other
                .parse::<u32>()
                .map_err(|_| CssError::InvalidValue(format!("repeat() count: {other}")))?,
        ),
    };

    let mut tracks = Vec::new();
    for token in tokenize_template(pattern) {
        match parse_token(token, false) {
            Ok(track) => tracks.push(track),
            Err(err @ CssError::InvalidValue(_)) => return Err(err),
            Err(err) => trace!(token, %err, "Dropping repeat() pattern token"),
        }
    }

    if tracks.is_empty() {
        return Err(CssError::ParseError(format!("repeat() pattern is empty: {pattern}")));
    }

    Ok(TemplateToken::Repeat(count, tracks))
}

fn parse_minmax(body: &str) -> Result<TemplateToken, CssError> {
    let args = split_css_function_args(body);
    if args.len() != 2 {
        return Err(CssError::ParseError(format!("minmax() takes two arguments: {body}")));
    }
    Ok(TemplateToken::MinMax(
        parse_breadth(args[0])?,
        parse_breadth(args[1])?,
    ))
}

fn parse_breadth(value: &str) -> Result<TrackBreadth, CssError> {
    match value.to_ascii_lowercase().as_str() {
        "auto" => return Ok(TrackBreadth::Intrinsic(IntrinsicSize::Auto)),
        "min-content" => return Ok(TrackBreadth::Intrinsic(IntrinsicSize::MinContent)),
        "max-content" => return Ok(TrackBreadth::Intrinsic(IntrinsicSize::MaxContent)),
        _ => {}
    }
    if let Some(fr) = parse_flex(value) {
        return Ok(TrackBreadth::Flex(fr));
    }
    parse_length(value)
        .map(TrackBreadth::Length)
        .ok_or_else(|| CssError::ParseError(format!("unrecognised minmax() bound: {value}")))
}
