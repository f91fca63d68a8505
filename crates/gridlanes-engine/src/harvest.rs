//! # Rule Harvesting
//!
//! Hosts without grid lanes report `display: grid-lanes` as `block` and drop
//! the grid properties, so containers and their declarations are recovered
//! from source CSS: inline `style` attributes, `<style>` text, and the rules
//! the stylesheet API exposes.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use gridlanes_css::{parse_declarations, DeclarationMap};
use gridlanes_host::{ElementId, LayoutHost};
use regex::Regex;
use tracing::{debug, trace, warn};

/// Attribute selector for elements whose inline style may declare grid lanes.
const INLINE_CANDIDATES: &str = "[style*=\"grid-lanes\"]";

fn regex(pattern: &'static str, desc: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid {desc} regex: {err}"))
}

fn display_grid_lanes() -> &'static Regex {
    static DISPLAY: OnceLock<Regex> = OnceLock::new();
    DISPLAY.get_or_init(|| regex(r"(?i)display\s*:\s*grid-lanes", "display grid-lanes"))
}

fn grid_lanes_block() -> &'static Regex {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK.get_or_init(|| {
        regex(
            r"(?i)([^{}]+)\{([^}]*display\s*:\s*grid-lanes[^}]*)\}",
            "grid-lanes block",
        )
    })
}

/// Whether raw CSS text contains `display: grid-lanes`.
pub fn mentions_grid_lanes(css: &str) -> bool {
    display_grid_lanes().is_match(css)
}

/// Harvested declarations per container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestedRules {
    entries: BTreeMap<ElementId, DeclarationMap>,
}

impl HarvestedRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, element: ElementId) -> Option<&DeclarationMap> {
        self.entries.get(&element)
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.entries.contains_key(&element)
    }

    /// Store declarations unless the element already has an entry.
    pub fn insert_if_absent(&mut self, element: ElementId, declarations: DeclarationMap) -> bool {
        if self.entries.contains_key(&element) {
            return false;
        }
        self.entries.insert(element, declarations);
        true
    }

    /// Merge declarations into the element's entry; later values win.
    pub fn merge(&mut self, element: ElementId, declarations: &DeclarationMap) {
        let entry = self.entries.entry(element).or_default();
        for (name, value) in declarations {
            entry.insert(name.clone(), value.clone());
        }
    }

    pub fn remove(&mut self, element: ElementId) -> Option<DeclarationMap> {
        self.entries.remove(&element)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of one harvest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Harvest {
    /// Discovered containers in document order.
    pub containers: Vec<ElementId>,
    /// Selectors that declared grid lanes.
    pub selectors: BTreeSet<String>,
}

struct Collector {
    containers: Vec<ElementId>,
    seen: HashSet<ElementId>,
}

impl Collector {
    fn add(&mut self, element: ElementId) {
        if self.seen.insert(element) {
            self.containers.push(element);
        }
    }
}

/// Scan the document for grid-lanes containers.
///
/// `rules` is updated in place. Inline declarations and stylesheet API rules
/// only fill missing entries; `<style>` blocks merge into existing ones.
pub fn harvest(host: &dyn LayoutHost, rules: &mut HarvestedRules) -> Harvest {
    let mut collector = Collector {
        containers: Vec::new(),
        seen: HashSet::new(),
    };
    let mut selectors = BTreeSet::new();

    harvest_inline(host, rules, &mut collector);
    harvest_style_elements(host, rules, &mut collector, &mut selectors);
    harvest_stylesheets(host, rules, &mut collector, &mut selectors);

    let mut containers = collector.containers;
    sort_document_order(host, &mut containers);

    debug!(
        containers = containers.len(),
        selectors = selectors.len(),
        "Harvested grid-lanes rules"
    );

    Harvest {
        containers,
        selectors,
    }
}

/// Inline declarations of an element, if its style attribute declares grid lanes.
pub fn inline_grid_lanes(host: &dyn LayoutHost, element: ElementId) -> Option<DeclarationMap> {
    let style = host.get_attribute(element, "style")?;
    mentions_grid_lanes(&style).then(|| parse_declarations(&style))
}

fn harvest_inline(host: &dyn LayoutHost, rules: &mut HarvestedRules, collector: &mut Collector) {
    let candidates = match host.query_selector_all(INLINE_CANDIDATES) {
        Ok(candidates) => candidates,
        Err(err) => {
            debug!(%err, "Inline style scan unavailable");
            return;
        }
    };

    for element in candidates {
        if let Some(declarations) = inline_grid_lanes(host, element) {
            collector.add(element);
            rules.insert_if_absent(element, declarations);
        }
    }
}

fn harvest_style_elements(
    host: &dyn LayoutHost,
    rules: &mut HarvestedRules,
    collector: &mut Collector,
    selectors: &mut BTreeSet<String>,
) {
    for text in host.style_element_texts() {
        for captures in grid_lanes_block().captures_iter(&text) {
            let (Some(selector_text), Some(block)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            let declarations = parse_declarations(block.as_str());

            for selector in selector_text.as_str().split(',').map(str::trim) {
                if selector.is_empty() {
                    continue;
                }
                selectors.insert(selector.to_string());

                match host.query_selector_all(selector) {
                    Ok(elements) => {
                        for element in elements {
                            collector.add(element);
                            rules.merge(element, &declarations);
                        }
                    }
                    Err(err) => debug!(selector, %err, "Skipping selector"),
                }
            }
        }
    }
}

fn harvest_stylesheets(
    host: &dyn LayoutHost,
    rules: &mut HarvestedRules,
    collector: &mut Collector,
    selectors: &mut BTreeSet<String>,
) {
    for (index, sheet) in host.stylesheets().into_iter().enumerate() {
        let sheet_rules = match sheet {
            Ok(sheet_rules) => sheet_rules,
            Err(err) => {
                warn!(sheet = index, %err, "Could not access stylesheet");
                continue;
            }
        };

        for rule in sheet_rules {
            if !mentions_grid_lanes(&rule.css_text) {
                continue;
            }
            let selector = rule.selector.trim();
            if selector.is_empty() || !selectors.insert(selector.to_string()) {
                trace!(selector, "Selector already harvested");
                continue;
            }

            let declarations = parse_declarations(&rule.css_text);
            match host.query_selector_all(selector) {
                Ok(elements) => {
                    for element in elements {
                        collector.add(element);
                        rules.insert_if_absent(element, declarations.clone());
                    }
                }
                Err(err) => debug!(selector, %err, "Skipping selector"),
            }
        }
    }
}

fn sort_document_order(host: &dyn LayoutHost, containers: &mut [ElementId]) {
    if containers.len() < 2 {
        return;
    }
    let root = host.document_root();
    let order: HashMap<ElementId, usize> = std::iter::once(root)
        .chain(host.descendants(root))
        .enumerate()
        .map(|(index, element)| (element, index))
        .collect();
    containers.sort_by_key(|element| order.get(element).copied().unwrap_or(usize::MAX));
}
