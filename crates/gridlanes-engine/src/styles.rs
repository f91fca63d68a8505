//! Container style snapshot for one layout pass.

use gridlanes_css::{
    is_empty_template, parse_gap, resolve_length, DeclarationMap, ItemPlacement, LengthContext,
    Viewport,
};
use gridlanes_host::{ComputedStyle, ElementId, LayoutHost};
use gridlanes_layout::Axis;
use tracing::trace;

/// Resolved grid-lanes properties of a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerStyles {
    /// Raw `grid-template-columns`.
    pub columns: Option<String>,
    /// Raw `grid-template-rows`.
    pub rows: Option<String>,
    /// Gap between columns in pixels.
    pub column_gap: f32,
    /// Gap between rows in pixels.
    pub row_gap: f32,
    /// Placement tolerance in pixels.
    pub tolerance: f32,
    pub font_size: f32,
    pub root_font_size: f32,
    pub viewport: Viewport,
    /// Lane axis.
    pub axis: Axis,
}

impl ContainerStyles {
    /// Resolve from harvested declarations, falling back to computed style.
    pub fn resolve(
        host: &dyn LayoutHost,
        container: ElementId,
        declarations: &DeclarationMap,
        default_tolerance: f32,
    ) -> Self {
        let computed = host.computed_style(container).unwrap_or_default();
        let root_font_size = positive_or(host.root_font_size(), 16.0);
        let font_size = positive_or(computed.font_size, 16.0);
        let viewport = host.viewport();

        let lookup = |name: &str| -> Option<String> {
            declarations
                .get(name)
                .map(String::as_str)
                .or_else(|| computed.get(name))
                .map(str::to_string)
        };

        let gap = lookup("gap").unwrap_or_else(|| "0px".to_string());
        let (gap_row, gap_column) = parse_gap(&gap);
        let mut column_gap = lookup("column-gap").unwrap_or_else(|| gap_column.clone());
        let mut row_gap = lookup("row-gap").unwrap_or_else(|| gap_row.clone());
        // A two-value `gap` overrides computed longhands, not declared ones.
        if gap.trim().contains(char::is_whitespace) {
            if !declarations.contains_key("row-gap") {
                row_gap = gap_row;
            }
            if !declarations.contains_key("column-gap") {
                column_gap = gap_column;
            }
        }

        let ctx = LengthContext {
            container_size: 0.0,
            font_size,
            root_font_size,
            viewport,
        };
        let to_px = |value: &str| {
            value
                .split_whitespace()
                .next()
                .and_then(|first| resolve_length(first, &ctx))
                .map_or(0.0, |px| px.max(0.0))
        };

        let tolerance = declarations
            .get("--item-tolerance")
            .or_else(|| declarations.get("item-tolerance"))
            .map(String::as_str)
            .or_else(|| computed.get("--item-tolerance"))
            .or_else(|| computed.get("item-tolerance"))
            .and_then(|value| resolve_length(value.trim(), &ctx))
            .map_or(default_tolerance, |px| px.max(0.0));

        let columns = lookup("grid-template-columns");
        let rows = lookup("grid-template-rows");
        let axis = Axis::from_templates(has_template(&columns), has_template(&rows));

        let styles = Self {
            column_gap: to_px(&column_gap),
            row_gap: to_px(&row_gap),
            columns,
            rows,
            tolerance,
            font_size,
            root_font_size,
            viewport,
            axis,
        };
        trace!(?styles, "Resolved container styles");
        styles
    }

    /// Template of the lane axis.
    pub fn template(&self) -> &str {
        let template = match self.axis {
            Axis::Columns => &self.columns,
            Axis::Rows => &self.rows,
        };
        template.as_deref().unwrap_or("")
    }

    /// Gap between lanes.
    pub fn lane_gap(&self) -> f32 {
        match self.axis {
            Axis::Columns => self.column_gap,
            Axis::Rows => self.row_gap,
        }
    }

    /// Gap between items stacked in a lane.
    pub fn item_gap(&self) -> f32 {
        match self.axis {
            Axis::Columns => self.row_gap,
            Axis::Rows => self.column_gap,
        }
    }

    /// Length context for sizing lanes against `available` pixels.
    pub fn length_context(&self, available: f32) -> LengthContext {
        LengthContext {
            container_size: available,
            font_size: self.font_size,
            root_font_size: self.root_font_size,
            viewport: self.viewport,
        }
    }
}

fn has_template(template: &Option<String>) -> bool {
    template
        .as_deref()
        .is_some_and(|value| !is_empty_template(value.trim()))
}

fn positive_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

/// Placement of an item from its computed `grid-column` / `grid-row`.
pub fn item_placement(computed: &ComputedStyle) -> ItemPlacement {
    ItemPlacement::from_values(
        computed
            .get("grid-column")
            .or_else(|| computed.get("grid-column-start")),
        computed
            .get("grid-row")
            .or_else(|| computed.get("grid-row-start")),
    )
}
