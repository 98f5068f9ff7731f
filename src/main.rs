use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use chart_overlay::logging;
use chart_overlay::overlay::settings_store;
use chart_overlay::overlay::templates::{templates_path_from_exe_path, DrawingTemplate, TemplateStore};
use chart_overlay::overlay::toolbar::ToolbarCommand;
use chart_overlay::overlay::{
    Candle, DrawingObject, OverlayKey, OverlaySession, OverlaySettings, RemoteUpdate, SampledChart, ScreenPos, Tool,
    Viewport,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    chart: SampledChart,
    #[serde(default)]
    candles: Vec<Candle>,
    #[serde(default)]
    drawings: serde_json::Value,
    #[serde(default)]
    timeframe: Option<String>,
    #[serde(default)]
    viewport: Option<Viewport>,
    #[serde(default)]
    settings: Option<OverlaySettings>,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Step {
    Tool { tool: Tool },
    Magnet { enabled: bool },
    ReadOnly { enabled: bool },
    Timeframe { timeframe: String },
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
    Leave,
    Outside { x: f64, y: f64 },
    Key { key: String },
    RemoteLive { drawing: Option<DrawingObject> },
    RemoteDrawings { drawings: Vec<DrawingObject> },
    RemoteHover { price: Option<f64>, time: Option<f64> },
    QuickColor { index: usize },
    ApplyTemplate { template: String },
    SaveTemplate { name: String },
}

/// Replays a recorded overlay scenario and prints the resulting drawings.
#[derive(Parser)]
#[command(name = "overlay_replay")]
struct Cli {
    /// Scenario JSON file
    scenario: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Style template store; defaults to the file next to the executable
    #[arg(long)]
    templates: Option<PathBuf>,
}

fn templates_path(cli: &Cli) -> Option<PathBuf> {
    if let Some(path) = &cli.templates {
        return Some(path.clone());
    }
    let exe = std::env::current_exe().ok()?;
    templates_path_from_exe_path(&exe).ok()
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read scenario file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("deserialize scenario file {}", path.display()))
}

fn key_from_name(name: &str) -> OverlayKey {
    match name {
        "Delete" | "delete" => OverlayKey::Delete,
        "Backspace" | "backspace" => OverlayKey::Backspace,
        _ => OverlayKey::Other,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let scenario = load_scenario(&cli.scenario)?;
    let settings = match scenario.settings {
        Some(mut settings) => {
            settings.sanitize();
            settings
        }
        None => settings_store::load_or_default(),
    };
    logging::init(cli.debug || settings.debug_logging, cli.log_file.clone());

    let templates_path = templates_path(&cli);
    let mut templates = templates_path
        .as_deref()
        .map(TemplateStore::load_or_default)
        .unwrap_or_default();
    let mut templates_changed = false;

    let (remote_tx, remote_rx) = channel();
    let mut session = OverlaySession::new(scenario.chart, scenario.candles, settings).with_remote(remote_rx);
    session.load_drawings_json(&scenario.drawings);
    if let Some(timeframe) = scenario.timeframe {
        session.set_timeframe(timeframe);
    }
    if let Some(viewport) = scenario.viewport {
        session.set_viewport(viewport);
    }

    for (index, step) in scenario.steps.into_iter().enumerate() {
        tracing::debug!(index, ?step, "replay step");
        let events = match step {
            Step::Tool { tool } => {
                session.set_active_tool(tool);
                Vec::new()
            }
            Step::Magnet { enabled } => {
                session.set_magnet_mode(enabled);
                Vec::new()
            }
            Step::ReadOnly { enabled } => session.set_read_only(enabled),
            Step::Timeframe { timeframe } => {
                session.set_timeframe(timeframe);
                Vec::new()
            }
            Step::Down { x, y } => session.pointer_down(ScreenPos::new(x, y)),
            Step::Move { x, y } => session.pointer_move(ScreenPos::new(x, y)),
            Step::Up => session.pointer_up(),
            Step::Leave => session.pointer_leave(),
            Step::Outside { x, y } => session.pointer_down_outside(ScreenPos::new(x, y)),
            Step::Key { key } => session.key_down(key_from_name(&key)),
            Step::RemoteLive { drawing } => {
                remote_tx
                    .send(RemoteUpdate::LiveDrawing(drawing))
                    .context("queue remote live drawing")?;
                Vec::new()
            }
            Step::RemoteDrawings { drawings } => {
                remote_tx
                    .send(RemoteUpdate::Drawings(drawings))
                    .context("queue remote drawing list")?;
                Vec::new()
            }
            Step::RemoteHover { price, time } => {
                remote_tx
                    .send(RemoteUpdate::Hover { price, time })
                    .context("queue remote hover")?;
                Vec::new()
            }
            Step::QuickColor { index } => session.toolbar_quick_color(index),
            Step::ApplyTemplate { template } => match templates.find(&template) {
                Some(found) => session.toolbar_command(ToolbarCommand::ApplyTemplate(found.clone())),
                None => {
                    tracing::warn!(%template, "unknown style template");
                    Vec::new()
                }
            },
            Step::SaveTemplate { name } => {
                match session.selected_drawing() {
                    Some(drawing) => {
                        templates.add(DrawingTemplate::from_drawing(name, drawing));
                        templates_changed = true;
                    }
                    None => tracing::warn!(%name, "no drawing selected to capture a template from"),
                }
                Vec::new()
            }
        };
        session.pump_remote();
        for event in &events {
            tracing::debug!(index, ?event, "overlay event");
        }
    }

    if templates_changed {
        if let Some(path) = &templates_path {
            templates
                .save_to_path(path)
                .with_context(|| format!("save templates to {}", path.display()))?;
        }
    }

    tracing::info!(
        drawings = session.drawings().len(),
        primitives = session.render().len(),
        "replay finished"
    );
    let json = serde_json::to_string_pretty(session.drawings()).context("serialize drawing list")?;
    println!("{json}");
    Ok(())
}
