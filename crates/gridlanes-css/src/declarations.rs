//! Declaration block parsing.
//!
//! Hosts report `display: grid-lanes` containers as plain blocks and drop
//! their grid properties, so the polyfill re-reads raw declaration text.

use std::collections::BTreeMap;

/// Property name → raw value.
pub type DeclarationMap = BTreeMap<String, String>;

/// Parse `prop: value; ...` into a map.
///
/// Accepts a bare block, a braced block, or a whole rule (`sel { ... }`).
/// Later declarations of the same property win. Malformed declarations are
/// skipped.
pub fn parse_declarations(block: &str) -> DeclarationMap {
    let mut props = DeclarationMap::new();

    let body = match block.find('{') {
        Some(open) => {
            let rest = &block[open + 1..];
            rest.rfind('}').map_or(rest, |close| &rest[..close])
        }
        None => block,
    };

    for declaration in split_declarations(body) {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim();
        if property.is_empty()
            || !property
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            continue;
        }

        let mut value = value.trim();
        if let Some(idx) = value.to_ascii_lowercase().find("!important") {
            value = value[..idx].trim_end();
        }
        if value.is_empty() {
            continue;
        }

        // Custom properties are case-sensitive; everything else is not.
        let name = if property.starts_with("--") {
            property.to_string()
        } else {
            property.to_ascii_lowercase()
        };
        props.insert(name, value.to_string());
    }

    props
}

/// Split on `;` outside of parentheses and quotes.
fn split_declarations(body: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, ';') if depth <= 0 => {
                result.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = body[start..].trim();
    if !last.is_empty() {
        result.push(last);
    }

    result
}

/// Split the `gap` shorthand into `(row-gap, column-gap)`.
///
/// A single value applies to both axes.
pub fn parse_gap(value: &str) -> (String, String) {
    let mut parts = value.split_whitespace();
    let row = parts.next().unwrap_or("0px").to_string();
    let column = parts.next().map_or_else(|| row.clone(), str::to_string);
    (row, column)
}

/// Whether a declaration block activates grid lanes.
pub fn declares_grid_lanes(props: &DeclarationMap) -> bool {
    props
        .get("display")
        .is_some_and(|display| display.trim().eq_ignore_ascii_case("grid-lanes"))
}
