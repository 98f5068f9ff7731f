//! Host-side glue that owns the authoritative drawing list.
//!
//! The session feeds pointer and key input through the [`InteractionMachine`],
//! applies what comes back, drains remote updates from a channel and builds
//! the scene for the current state.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use crate::overlay::chart::{Candle, ChartSurface, ScreenPos, Viewport};
use crate::overlay::coords::CoordinateMapper;
use crate::overlay::input::{InteractionMachine, OverlayEvent, OverlayFrame, OverlayKey, Tool};
use crate::overlay::live_sync::{LiveSyncAdapter, RenderItem};
use crate::overlay::model::{parse_drawings, Color, DrawingObject};
use crate::overlay::scene::{build_scene, ScenePrimitive, SceneOptions};
use crate::overlay::settings::OverlaySettings;
use crate::overlay::toolbar::{apply_toolbar_command, toolbar_visible, ToolbarCommand, ToolbarPanel, ToolbarState};

/// Input pushed by collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteUpdate {
    /// Latest remote in-progress drawing, `None` once the remote drag ended.
    LiveDrawing(Option<DrawingObject>),
    /// A committed list from the persistence channel.
    Drawings(Vec<DrawingObject>),
    /// Crosshair position driven by a linked chart.
    Hover { price: Option<f64>, time: Option<f64> },
}

pub struct OverlaySession<C: ChartSurface> {
    chart: C,
    candles: Vec<Candle>,
    drawings: Vec<DrawingObject>,
    settings: OverlaySettings,
    active_tool: Tool,
    timeframe: String,
    magnet_mode: bool,
    read_only: bool,
    viewport: Viewport,
    remote_live: Option<DrawingObject>,
    hover_price: Option<f64>,
    hover_time: Option<f64>,
    machine: InteractionMachine,
    toolbar: ToolbarState,
    remote_rx: Option<Receiver<RemoteUpdate>>,
    outbound_tx: Option<Sender<OverlayEvent>>,
}

impl<C: ChartSurface> OverlaySession<C> {
    pub fn new(chart: C, candles: Vec<Candle>, mut settings: OverlaySettings) -> Self {
        settings.sanitize();
        let timeframe = settings.timeframes.first().cloned().unwrap_or_default();
        Self {
            chart,
            candles,
            drawings: Vec::new(),
            magnet_mode: settings.magnet_mode,
            machine: InteractionMachine::new(settings.clone()),
            settings,
            active_tool: Tool::Cursor,
            timeframe,
            read_only: false,
            viewport: Viewport::default(),
            remote_live: None,
            hover_price: None,
            hover_time: None,
            toolbar: ToolbarState::new(),
            remote_rx: None,
            outbound_tx: None,
        }
    }

    pub fn with_remote(mut self, rx: Receiver<RemoteUpdate>) -> Self {
        self.remote_rx = Some(rx);
        self
    }

    pub fn with_outbound(mut self, tx: Sender<OverlayEvent>) -> Self {
        self.outbound_tx = Some(tx);
        self
    }

    pub fn drawings(&self) -> &[DrawingObject] {
        &self.drawings
    }

    pub fn set_drawings(&mut self, drawings: Vec<DrawingObject>) {
        self.drawings = drawings;
        self.drop_stale_selection();
    }

    /// Replaces the list from untrusted JSON, skipping malformed entries.
    pub fn load_drawings_json(&mut self, value: &serde_json::Value) {
        self.set_drawings(parse_drawings(value));
    }

    pub fn chart(&self) -> &C {
        &self.chart
    }

    pub fn chart_mut(&mut self) -> &mut C {
        &mut self.chart
    }

    pub fn set_candles(&mut self, candles: Vec<Candle>) {
        self.candles = candles;
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn set_settings(&mut self, mut settings: OverlaySettings) {
        settings.sanitize();
        self.machine.set_settings(settings.clone());
        self.settings = settings;
    }

    pub fn active_tool(&self) -> Tool {
        self.active_tool
    }

    pub fn set_active_tool(&mut self, tool: Tool) {
        self.active_tool = tool;
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn set_timeframe(&mut self, timeframe: impl Into<String>) {
        self.timeframe = timeframe.into();
    }

    pub fn magnet_mode(&self) -> bool {
        self.magnet_mode
    }

    pub fn set_magnet_mode(&mut self, enabled: bool) {
        self.magnet_mode = enabled;
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Switching to read-only abandons any drag without committing it.
    pub fn set_read_only(&mut self, read_only: bool) -> Vec<OverlayEvent> {
        self.read_only = read_only;
        if !read_only {
            return Vec::new();
        }
        let events = self.dispatch(|machine, frame| machine.pointer_up(frame));
        self.toolbar.on_deselect();
        events
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn machine(&self) -> &InteractionMachine {
        &self.machine
    }

    pub fn toolbar(&self) -> &ToolbarState {
        &self.toolbar
    }

    pub fn toolbar_visible(&self) -> bool {
        toolbar_visible(self.machine.selected_id(), self.read_only)
    }

    pub fn selected_drawing(&self) -> Option<&DrawingObject> {
        let id = self.machine.selected_id()?;
        self.drawings.iter().find(|d| &d.id == id)
    }

    pub fn remote_live(&self) -> Option<&DrawingObject> {
        self.remote_live.as_ref()
    }

    pub fn hover(&self) -> (Option<f64>, Option<f64>) {
        (self.hover_price, self.hover_time)
    }

    pub fn pointer_down(&mut self, pos: ScreenPos) -> Vec<OverlayEvent> {
        self.dispatch(|machine, frame| machine.pointer_down(frame, pos))
    }

    pub fn pointer_move(&mut self, pos: ScreenPos) -> Vec<OverlayEvent> {
        self.dispatch(|machine, frame| machine.pointer_move(frame, pos))
    }

    pub fn pointer_up(&mut self) -> Vec<OverlayEvent> {
        self.dispatch(|machine, frame| machine.pointer_up(frame))
    }

    pub fn pointer_leave(&mut self) -> Vec<OverlayEvent> {
        self.dispatch(|machine, frame| machine.pointer_leave(frame))
    }

    pub fn key_down(&mut self, key: OverlayKey) -> Vec<OverlayEvent> {
        self.dispatch(|machine, frame| machine.key_down(frame, key))
    }

    pub fn context_menu(&mut self, pos: ScreenPos) -> Vec<OverlayEvent> {
        self.dispatch(|machine, frame| machine.context_menu(frame, pos))
    }

    /// Press anywhere outside the overlay surface, in the same coordinate
    /// space as the toolbar.
    pub fn pointer_down_outside(&mut self, pos: ScreenPos) -> Vec<OverlayEvent> {
        let on_toolbar = self.toolbar_visible() && self.toolbar.contains(pos);
        self.dispatch(|machine, frame| machine.pointer_down_outside(frame, on_toolbar))
    }

    pub fn toolbar_pointer_down(&mut self, pos: ScreenPos) -> bool {
        self.toolbar_visible() && self.toolbar.begin_drag(pos)
    }

    pub fn toolbar_pointer_move(&mut self, pos: ScreenPos) {
        self.toolbar.drag_to(pos);
    }

    pub fn toolbar_pointer_up(&mut self) {
        self.toolbar.end_drag();
    }

    pub fn toggle_toolbar_panel(&mut self, panel: ToolbarPanel) {
        if self.toolbar_visible() {
            self.toolbar.toggle_panel(panel);
        }
    }

    /// Applies a toolbar edit to the selected drawing.
    pub fn toolbar_command(&mut self, command: ToolbarCommand) -> Vec<OverlayEvent> {
        if self.read_only || self.machine.is_dragging() {
            return Vec::new();
        }
        let Some(id) = self.machine.selected_id().cloned() else {
            return Vec::new();
        };
        let Some(next) = apply_toolbar_command(&self.drawings, &id, &command, &self.settings.timeframes) else {
            return Vec::new();
        };
        let mut events = vec![OverlayEvent::DrawingsUpdated(next)];
        if matches!(command, ToolbarCommand::Delete) {
            events.extend(self.machine.clear_selection());
        }
        self.apply_events(&events);
        events
    }

    /// Palette offered by the color picker panel.
    pub fn quick_colors(&self) -> &[Color] {
        &self.settings.quick_colors
    }

    /// Recolors the selected drawing with palette entry `index`.
    pub fn toolbar_quick_color(&mut self, index: usize) -> Vec<OverlayEvent> {
        let Some(color) = self.settings.quick_colors.get(index).copied() else {
            return Vec::new();
        };
        self.toolbar_command(ToolbarCommand::SetColor(color))
    }

    /// Drains pending remote updates without blocking. Returns how many were
    /// applied.
    pub fn pump_remote(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let Some(rx) = self.remote_rx.as_ref() else {
                break;
            };
            match rx.try_recv() {
                Ok(RemoteUpdate::LiveDrawing(drawing)) => {
                    self.remote_live = drawing;
                    applied += 1;
                }
                Ok(RemoteUpdate::Drawings(drawings)) => {
                    self.set_drawings(drawings);
                    applied += 1;
                }
                Ok(RemoteUpdate::Hover { price, time }) => {
                    self.hover_price = price;
                    self.hover_time = time;
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("remote drawing channel disconnected; keeping last state");
                    self.remote_rx = None;
                    break;
                }
            }
        }
        applied
    }

    /// Merge of persisted, local and remote drawings as it should be painted.
    pub fn render_items(&self) -> Vec<RenderItem<'_>> {
        LiveSyncAdapter::new(&self.drawings, &self.timeframe)
            .with_local(self.machine.is_dragging(), self.machine.live_preview())
            .with_remote(self.remote_live.as_ref())
            .compose()
    }

    pub fn render(&self) -> Vec<ScenePrimitive> {
        let mapper = CoordinateMapper::new(&self.chart, &self.candles);
        let options = SceneOptions {
            viewport: self.viewport,
            theme: self.settings.theme,
            selected: self.machine.selected_id(),
            hovered: self.machine.hovered_id(),
            read_only: self.read_only,
            hover_price: self.hover_price,
            hover_time: self.hover_time,
        };
        build_scene(&mapper, &self.render_items(), &options)
    }

    fn dispatch<F>(&mut self, handler: F) -> Vec<OverlayEvent>
    where
        F: FnOnce(&mut InteractionMachine, &OverlayFrame<'_>) -> Vec<OverlayEvent>,
    {
        let frame = OverlayFrame {
            chart: &self.chart,
            candles: &self.candles,
            drawings: &self.drawings,
            active_tool: self.active_tool,
            magnet_mode: self.magnet_mode,
            timeframe: &self.timeframe,
            read_only: self.read_only,
            viewport: self.viewport,
        };
        let events = handler(&mut self.machine, &frame);
        self.apply_events(&events);
        events
    }

    fn apply_events(&mut self, events: &[OverlayEvent]) {
        for event in events {
            match event {
                OverlayEvent::DrawingsUpdated(next) => self.drawings = next.clone(),
                OverlayEvent::ToolCompleted => self.active_tool = Tool::Cursor,
                OverlayEvent::HoverChanged { price, time } => {
                    self.hover_price = *price;
                    self.hover_time = *time;
                }
                OverlayEvent::SelectionChanged { id: Some(_), at } => {
                    self.toolbar.on_selection(*at, self.settings.toolbar_offset());
                }
                OverlayEvent::SelectionChanged { id: None, .. } => self.toolbar.on_deselect(),
                OverlayEvent::LiveDrawingChanged(_)
                | OverlayEvent::ContextMenuRequested { .. }
                | OverlayEvent::CutRequested { .. } => {}
            }
            if let Some(tx) = &self.outbound_tx {
                if tx.send(event.clone()).is_err() {
                    tracing::warn!("outbound event channel disconnected; dropping further events");
                    self.outbound_tx = None;
                }
            }
        }
    }

    // A committed list from elsewhere may no longer contain the selection.
    fn drop_stale_selection(&mut self) {
        let stale = self
            .machine
            .selected_id()
            .is_some_and(|id| !self.drawings.iter().any(|d| &d.id == id));
        if stale {
            let events = self.machine.clear_selection();
            self.apply_events(&events);
        }
    }
}
