//! Grid Lanes Smoke Harness
//!
//! Loads a JSON scenario into the headless host, runs the polyfill over it,
//! replays viewport resizes, and prints the resulting placements. Used to
//! check layouts by hand and from CI without a browser.

use std::time::Instant;

use gridlanes_engine::headless::MemoryHost;
use gridlanes_engine::{
    Controller, EngineError, LayoutHost, LayoutInstance, PolyfillBuilder, PolyfillOptions,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

/// Scenario used when no `--scenario` file is given.
const DEFAULT_SCENARIO: &str = r#"{
    "name": "default",
    "viewport": { "width": 900, "height": 600 },
    "containers": [{
        "style": "display: grid-lanes; grid-template-columns: repeat(3, 1fr); gap: 12px",
        "items": [
            { "height": 120 }, { "height": 200 }, { "height": 80 },
            { "height": 160, "style": "grid-column: span 2" }, { "height": 90 }
        ]
    }]
}"#;

#[derive(Error, Debug)]
enum SmokeError {
    #[error("Failed to read scenario {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid scenario: {0}")]
    Scenario(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ViewportSpec {
    width: f32,
    height: f32,
}

#[derive(Debug, Deserialize)]
struct ItemSpec {
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContainerSpec {
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    style: Option<String>,
    /// Fixed container height, for brick layouts.
    #[serde(default)]
    height: Option<f32>,
    #[serde(default)]
    items: Vec<ItemSpec>,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    viewport: ViewportSpec,
    #[serde(default)]
    stylesheet: Option<String>,
    /// Report native grid-lanes support.
    #[serde(default)]
    native: bool,
    containers: Vec<ContainerSpec>,
    /// Viewports to resize to after the initial layout.
    #[serde(default)]
    resize: Vec<ViewportSpec>,
}

/// Parse command line arguments
struct Args {
    scenario: Option<String>,
    force: bool,
    tolerance: Option<f32>,
    json: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut scenario = None;
        let mut force = false;
        let mut tolerance = None;
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--scenario" => {
                    scenario = args.next();
                }
                "--force" => force = true,
                "--tolerance" => {
                    if let Some(val) = args.next() {
                        tolerance = val.parse().ok();
                    }
                }
                "--json" => json = true,
                _ => {}
            }
        }

        Self {
            scenario,
            force,
            tolerance,
            json,
        }
    }

    fn load_scenario(&self) -> Result<Scenario, SmokeError> {
        let text = match &self.scenario {
            Some(path) => std::fs::read_to_string(path).map_err(|source| SmokeError::Io {
                path: path.clone(),
                source,
            })?,
            None => DEFAULT_SCENARIO.to_string(),
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn options(&self) -> Result<PolyfillOptions, SmokeError> {
        let mut builder = PolyfillBuilder::new().force(self.force);
        if let Some(tolerance) = self.tolerance {
            builder = builder.default_tolerance(tolerance);
        }
        Ok(builder.build()?)
    }
}

fn build_document(scenario: &Scenario) -> MemoryHost {
    let mut host = MemoryHost::new(scenario.viewport.width, scenario.viewport.height);
    host.set_native_grid_lanes(scenario.native);
    if let Some(css) = &scenario.stylesheet {
        host.add_style_element(css);
    }

    let body = host.body();
    for entry in &scenario.containers {
        let container = host.append(body, "div");
        if let Some(class) = &entry.class {
            host.add_class(container, class);
        }
        if let Some(style) = &entry.style {
            host.set_inline_style(container, style);
        }
        if entry.height.is_some() {
            host.set_fixed_size(container, None, entry.height);
        }
        for item in &entry.items {
            let element = host.append(container, "div");
            host.set_content_size(element, item.width, item.height);
            if let Some(style) = &item.style {
                host.set_inline_style(element, style);
            }
        }
    }
    host
}

fn settle(host: &mut MemoryHost, controller: &mut Controller) -> usize {
    host.pump(|host, notification| {
        controller.handle_notification(host, notification);
    })
}

fn report_instance(host: &MemoryHost, instance: &LayoutInstance) -> Value {
    let items: Vec<Value> = instance
        .placements()
        .iter()
        .map(|item| {
            json!({
                "element": item.element.raw(),
                "lane": item.slot.lane,
                "span": item.slot.span,
                "offset": item.slot.offset,
                "extent": item.extent,
                "left": host.style_property(item.element, "left"),
                "top": host.style_property(item.element, "top"),
            })
        })
        .collect();

    json!({
        "container": instance.container().raw(),
        "axis": format!("{:?}", instance.axis()),
        "lanes": instance.lanes().iter().map(|lane| lane.size).collect::<Vec<_>>(),
        "fills": instance.fills(),
        "extent": instance.stats().last_extent,
        "passes": instance.stats().passes,
        "items": items,
    })
}

fn snapshot(host: &MemoryHost, controller: &Controller) -> Value {
    let viewport = host.viewport();
    json!({
        "viewport": { "width": viewport.width, "height": viewport.height },
        "containers": controller
            .instances()
            .iter()
            .map(|instance| report_instance(host, instance))
            .collect::<Vec<_>>(),
    })
}

fn run(args: &Args) -> Result<Value, SmokeError> {
    let start = Instant::now();
    let scenario = args.load_scenario()?;
    let options = args.options()?;
    info!(
        scenario = %scenario.name,
        containers = scenario.containers.len(),
        force = options.force,
        tolerance = options.default_tolerance,
        "Running scenario"
    );

    let mut host = build_document(&scenario);
    let mut controller = Controller::init(&mut host, options);
    let mut delivered = settle(&mut host, &mut controller);
    let mut steps = vec![snapshot(&host, &controller)];

    for viewport in &scenario.resize {
        host.set_viewport(viewport.width, viewport.height);
        delivered += settle(&mut host, &mut controller);
        steps.push(snapshot(&host, &controller));
    }

    Ok(json!({
        "status": "pass",
        "scenario": scenario.name,
        "native_support": controller.is_supported(),
        "notifications": delivered,
        "frames": host.frames_delivered(),
        "elapsed_ms": start.elapsed().as_millis(),
        "steps": steps,
    }))
}

fn print_summary(result: &Value) {
    println!("scenario: {}", result["scenario"]);
    for (index, step) in result["steps"].as_array().into_iter().flatten().enumerate() {
        println!("step {index}: viewport {}", step["viewport"]);
        for container in step["containers"].as_array().into_iter().flatten() {
            println!(
                "  container {} ({}): lanes {} extent {}",
                container["container"], container["axis"], container["lanes"], container["extent"]
            );
            for item in container["items"].as_array().into_iter().flatten() {
                println!(
                    "    item {} lane {} span {} at {}",
                    item["element"], item["lane"], item["span"], item["offset"]
                );
            }
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(result) if args.json => println!("{}", result),
        Ok(result) => print_summary(&result),
        Err(e) => {
            error!(%e, "Smoke scenario failed");
            if args.json {
                println!("{}", json!({ "status": "fail", "error": e.to_string() }));
            }
            std::process::exit(1);
        }
    }
}
