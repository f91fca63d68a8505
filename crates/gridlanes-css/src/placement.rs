//! `grid-column` / `grid-row` parsing for lane items.

/// Placement of an item along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridLine {
    /// Auto placement, single lane.
    #[default]
    Auto,
    /// Auto placement spanning a number of lanes.
    Span(u32),
    /// Explicit 1-based start line (negative counts from the end).
    Line { start: i32, span: u32 },
}

impl GridLine {
    /// Explicit start line, if any.
    pub fn start(self) -> Option<i32> {
        match self {
            GridLine::Line { start, .. } => Some(start),
            _ => None,
        }
    }

    /// Number of lanes covered, at least 1.
    pub fn span(self) -> u32 {
        match self {
            GridLine::Auto => 1,
            GridLine::Span(span) | GridLine::Line { span, .. } => span.max(1),
        }
    }
}

/// Parse a `grid-column` / `grid-row` value.
///
/// Supported forms: `span N`, `N / M`, `N / span M`, `N`. Anything else,
/// including `auto` and line `0`, means auto placement.
pub fn parse_grid_line(value: &str) -> GridLine {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("auto") {
        return GridLine::Auto;
    }

    let (start, end) = match value.split_once('/') {
        Some((start, end)) => (start.trim(), Some(end.trim())),
        None => (value, None),
    };

    if let Some(span) = parse_span(start) {
        return GridLine::Span(span);
    }

    let Some(start) = parse_line(start) else {
        // `auto / span 2` still carries a span.
        return end.and_then(parse_span).map_or(GridLine::Auto, GridLine::Span);
    };

    let span = match end {
        Some(end) => parse_span(end)
            .or_else(|| parse_line(end).map(|end| (end - start).unsigned_abs()))
            .unwrap_or(1),
        None => 1,
    };

    GridLine::Line {
        start,
        span: span.max(1),
    }
}

fn parse_span(value: &str) -> Option<u32> {
    let rest = value.trim().strip_prefix("span")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    rest.trim().parse::<u32>().ok().filter(|span| *span > 0)
}

fn parse_line(value: &str) -> Option<i32> {
    value.trim().parse::<i32>().ok().filter(|line| *line != 0)
}

/// Item placement on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemPlacement {
    /// Column placement.
    pub column: GridLine,
    /// Row placement.
    pub row: GridLine,
}

impl ItemPlacement {
    /// Build from raw `grid-column` / `grid-row` values.
    pub fn from_values(grid_column: Option<&str>, grid_row: Option<&str>) -> Self {
        Self {
            column: grid_column.map(parse_grid_line).unwrap_or_default(),
            row: grid_row.map(parse_grid_line).unwrap_or_default(),
        }
    }

    pub fn column_start(&self) -> Option<i32> {
        self.column.start()
    }

    pub fn column_span(&self) -> u32 {
        self.column.span()
    }

    pub fn row_start(&self) -> Option<i32> {
        self.row.start()
    }

    pub fn row_span(&self) -> u32 {
        self.row.span()
    }
}
