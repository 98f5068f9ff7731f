//! Pointer and keyboard interaction over the drawing list.
//!
//! The machine never owns the drawing list. Each handler borrows the current
//! list through an [`OverlayFrame`] and answers with [`OverlayEvent`]s; a
//! committed change is always a complete replacement list.

use serde::{Deserialize, Serialize};

use crate::overlay::chart::{Candle, ChartSurface, ScreenPos, Viewport};
use crate::overlay::coords::CoordinateMapper;
use crate::overlay::hit_test::HitTester;
use crate::overlay::model::{AnchorHandle, DomainPoint, DrawingId, DrawingKind, DrawingObject, Shape};
use crate::overlay::settings::OverlaySettings;
use crate::overlay::snap::SnapResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Cursor,
    Line,
    Rect,
    Horizontal,
    Fib,
    Text,
    Scissors,
}

impl Tool {
    /// Drawing kind produced by this tool, if it is a creation tool.
    pub fn creates(self) -> Option<DrawingKind> {
        match self {
            Tool::Line => Some(DrawingKind::Line),
            Tool::Rect => Some(DrawingKind::Rect),
            Tool::Horizontal => Some(DrawingKind::Horizontal),
            Tool::Fib => Some(DrawingKind::Fib),
            Tool::Text => Some(DrawingKind::Text),
            Tool::Cursor | Tool::Scissors => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKey {
    Delete,
    Backspace,
    Other,
}

/// Everything a handler reads from the host for one event.
#[derive(Clone, Copy)]
pub struct OverlayFrame<'a> {
    pub chart: &'a dyn ChartSurface,
    pub candles: &'a [Candle],
    pub drawings: &'a [DrawingObject],
    pub active_tool: Tool,
    pub magnet_mode: bool,
    pub timeframe: &'a str,
    pub read_only: bool,
    pub viewport: Viewport,
}

impl<'a> OverlayFrame<'a> {
    pub fn mapper(&self) -> CoordinateMapper<'a> {
        CoordinateMapper::new(self.chart, self.candles)
    }
}

/// Output of the machine, applied by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    /// Full replacement of the persisted list.
    DrawingsUpdated(Vec<DrawingObject>),
    /// A one-shot creation finished; the host should revert to the cursor.
    ToolCompleted,
    /// Outgoing live preview, `None` once the drag is over.
    LiveDrawingChanged(Option<DrawingObject>),
    HoverChanged { price: Option<f64>, time: Option<f64> },
    SelectionChanged { id: Option<DrawingId>, at: ScreenPos },
    ContextMenuRequested { drawing_id: DrawingId, at: ScreenPos },
    CutRequested { time: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionPhase {
    Idle,
    Selected,
    Creating,
    Moving,
    ResizingP1,
    ResizingP2,
}

#[derive(Debug, Clone, PartialEq, Default)]
enum InteractionState {
    #[default]
    Idle,
    Selected {
        id: DrawingId,
    },
    Creating {
        draft: DrawingObject,
    },
    Moving {
        snapshot: DrawingObject,
        start: DomainPoint,
        current: Option<DrawingObject>,
    },
    Resizing {
        handle: AnchorHandle,
        snapshot: DrawingObject,
        current: Option<DrawingObject>,
    },
}

impl InteractionState {
    fn selected_id(&self) -> Option<&DrawingId> {
        match self {
            InteractionState::Selected { id } => Some(id),
            InteractionState::Moving { snapshot, .. } | InteractionState::Resizing { snapshot, .. } => {
                Some(&snapshot.id)
            }
            InteractionState::Idle | InteractionState::Creating { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InteractionMachine {
    state: InteractionState,
    hovered: Option<DrawingId>,
    settings: OverlaySettings,
}

impl InteractionMachine {
    pub fn new(settings: OverlaySettings) -> Self {
        Self {
            state: InteractionState::Idle,
            hovered: None,
            settings,
        }
    }

    pub fn settings(&self) -> &OverlaySettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: OverlaySettings) {
        self.settings = settings;
    }

    pub fn phase(&self) -> InteractionPhase {
        match &self.state {
            InteractionState::Idle => InteractionPhase::Idle,
            InteractionState::Selected { .. } => InteractionPhase::Selected,
            InteractionState::Creating { .. } => InteractionPhase::Creating,
            InteractionState::Moving { .. } => InteractionPhase::Moving,
            InteractionState::Resizing {
                handle: AnchorHandle::P1,
                ..
            } => InteractionPhase::ResizingP1,
            InteractionState::Resizing {
                handle: AnchorHandle::P2,
                ..
            } => InteractionPhase::ResizingP2,
        }
    }

    pub fn selected_id(&self) -> Option<&DrawingId> {
        self.state.selected_id()
    }

    pub fn hovered_id(&self) -> Option<&DrawingId> {
        self.hovered.as_ref()
    }

    /// A drag (create, move or resize) is in progress.
    pub fn is_dragging(&self) -> bool {
        matches!(
            self.state,
            InteractionState::Creating { .. }
                | InteractionState::Moving { .. }
                | InteractionState::Resizing { .. }
        )
    }

    pub fn is_creating(&self) -> bool {
        matches!(self.state, InteractionState::Creating { .. })
    }

    /// The locally authored transient drawing, once it differs from the
    /// persisted copy.
    pub fn live_preview(&self) -> Option<&DrawingObject> {
        match &self.state {
            InteractionState::Creating { draft } => Some(draft),
            InteractionState::Moving { current, .. } | InteractionState::Resizing { current, .. } => {
                current.as_ref()
            }
            InteractionState::Idle | InteractionState::Selected { .. } => None,
        }
    }

    pub fn pointer_down(&mut self, frame: &OverlayFrame<'_>, pos: ScreenPos) -> Vec<OverlayEvent> {
        if frame.read_only {
            return self.abandon_for_read_only();
        }
        if self.is_dragging() {
            return Vec::new();
        }
        let Some(point) = self.resolve_point(frame, pos) else {
            return Vec::new();
        };

        if frame.active_tool == Tool::Scissors {
            return vec![OverlayEvent::CutRequested { time: point.time }];
        }

        if let Some(kind) = frame.active_tool.creates() {
            let draft = DrawingObject::new(
                DrawingId::generate(),
                Shape::new(kind, point),
                self.settings.theme.default_stroke(),
            );

            if kind == DrawingKind::Horizontal {
                let mut events = self.transition(InteractionState::Idle, pos);
                tracing::debug!(id = %draft.id, kind = ?kind, "drawing created");
                let mut next = frame.drawings.to_vec();
                next.push(draft);
                events.push(OverlayEvent::DrawingsUpdated(next));
                events.push(OverlayEvent::ToolCompleted);
                return events;
            }

            return self.transition(InteractionState::Creating { draft }, pos);
        }

        let tester = self.hit_tester(frame);

        if let InteractionState::Selected { id } = &self.state {
            let selected = frame
                .drawings
                .iter()
                .find(|d| &d.id == id && d.is_visible_on(frame.timeframe));
            if let Some(drawing) = selected {
                if let Some(handle) = tester.anchor_handle_at(drawing, pos.x, pos.y) {
                    let snapshot = drawing.clone();
                    return self.transition(
                        InteractionState::Resizing {
                            handle,
                            snapshot,
                            current: None,
                        },
                        pos,
                    );
                }
            }
        }

        match tester.find_hit(pos.x, pos.y, frame.drawings) {
            Some(hit) => {
                let snapshot = hit.clone();
                self.transition(
                    InteractionState::Moving {
                        snapshot,
                        start: point,
                        current: None,
                    },
                    pos,
                )
            }
            None => self.transition(InteractionState::Idle, pos),
        }
    }

    pub fn pointer_move(&mut self, frame: &OverlayFrame<'_>, pos: ScreenPos) -> Vec<OverlayEvent> {
        if frame.read_only {
            return self.abandon_for_read_only();
        }
        let Some(point) = self.resolve_point(frame, pos) else {
            if self.is_dragging() {
                return Vec::new();
            }
            self.hovered = None;
            return vec![OverlayEvent::HoverChanged {
                price: None,
                time: None,
            }];
        };

        let preview = match &mut self.state {
            InteractionState::Creating { draft } => {
                if draft.kind().requires_second_anchor() {
                    *draft = draft.with_anchor(AnchorHandle::P2, point);
                }
                Some(draft.clone())
            }
            InteractionState::Moving {
                snapshot,
                start,
                current,
            } => {
                let moved = snapshot.translated(point.time - start.time, point.price - start.price);
                *current = Some(moved.clone());
                Some(moved)
            }
            InteractionState::Resizing {
                handle,
                snapshot,
                current,
            } => {
                let resized = snapshot.with_anchor(*handle, point);
                *current = Some(resized.clone());
                Some(resized)
            }
            InteractionState::Idle | InteractionState::Selected { .. } => None,
        };

        match preview {
            Some(drawing) => vec![OverlayEvent::LiveDrawingChanged(Some(drawing))],
            None => {
                self.hovered = self
                    .hit_tester(frame)
                    .find_hit(pos.x, pos.y, frame.drawings)
                    .map(|d| d.id.clone());
                vec![OverlayEvent::HoverChanged {
                    price: Some(point.price),
                    time: Some(point.time),
                }]
            }
        }
    }

    /// Commits the last computed drag position. There is no cancel path.
    pub fn pointer_up(&mut self, frame: &OverlayFrame<'_>) -> Vec<OverlayEvent> {
        if frame.read_only {
            return self.abandon_for_read_only();
        }
        let state = std::mem::take(&mut self.state);
        match state {
            InteractionState::Creating { draft } => {
                tracing::debug!(id = %draft.id, kind = ?draft.kind(), "drawing created");
                let mut next = frame.drawings.to_vec();
                next.push(draft);
                vec![
                    OverlayEvent::DrawingsUpdated(next),
                    OverlayEvent::ToolCompleted,
                    OverlayEvent::LiveDrawingChanged(None),
                ]
            }
            InteractionState::Moving {
                snapshot, current, ..
            }
            | InteractionState::Resizing {
                snapshot, current, ..
            } => {
                let mut events = Vec::new();
                // Removed underneath the drag by a committed list from elsewhere.
                if !frame.drawings.iter().any(|d| d.id == snapshot.id) {
                    tracing::debug!(id = %snapshot.id, "dragged drawing no longer exists");
                    self.state = InteractionState::Selected { id: snapshot.id };
                    events.push(OverlayEvent::LiveDrawingChanged(None));
                    events.extend(self.transition(InteractionState::Idle, ScreenPos::default()));
                    return events;
                }
                if let Some(updated) = current {
                    tracing::debug!(id = %updated.id, "drawing geometry committed");
                    let next = frame
                        .drawings
                        .iter()
                        .map(|d| if d.id == updated.id { updated.clone() } else { d.clone() })
                        .collect();
                    events.push(OverlayEvent::DrawingsUpdated(next));
                }
                events.push(OverlayEvent::LiveDrawingChanged(None));
                self.state = InteractionState::Selected { id: snapshot.id };
                events
            }
            other => {
                self.state = other;
                Vec::new()
            }
        }
    }

    /// Delete/Backspace removes the selected drawing.
    pub fn key_down(&mut self, frame: &OverlayFrame<'_>, key: OverlayKey) -> Vec<OverlayEvent> {
        if frame.read_only || !matches!(key, OverlayKey::Delete | OverlayKey::Backspace) {
            return Vec::new();
        }
        let Some(id) = self.selected_id().cloned() else {
            return Vec::new();
        };
        let was_dragging = self.is_dragging();
        tracing::debug!(%id, "drawing deleted");

        let next = frame.drawings.iter().filter(|d| d.id != id).cloned().collect();
        let mut events = vec![OverlayEvent::DrawingsUpdated(next)];
        if was_dragging {
            events.push(OverlayEvent::LiveDrawingChanged(None));
        }
        events.extend(self.transition(InteractionState::Idle, ScreenPos::default()));
        events
    }

    /// A press outside the overlay surface. Clears the selection unless it
    /// landed on the floating toolbar; never deletes anything.
    pub fn pointer_down_outside(&mut self, frame: &OverlayFrame<'_>, on_toolbar: bool) -> Vec<OverlayEvent> {
        if frame.read_only || on_toolbar || frame.active_tool != Tool::Cursor || self.is_dragging() {
            return Vec::new();
        }
        self.transition(InteractionState::Idle, ScreenPos::default())
    }

    pub fn pointer_leave(&mut self, frame: &OverlayFrame<'_>) -> Vec<OverlayEvent> {
        if frame.read_only {
            return Vec::new();
        }
        self.hovered = None;
        vec![OverlayEvent::HoverChanged {
            price: None,
            time: None,
        }]
    }

    /// Right-click passthrough for host-level actions on the drawing under
    /// the pointer.
    pub fn context_menu(&self, frame: &OverlayFrame<'_>, pos: ScreenPos) -> Vec<OverlayEvent> {
        if frame.read_only {
            return Vec::new();
        }
        self.hit_tester(frame)
            .find_hit(pos.x, pos.y, frame.drawings)
            .map(|hit| OverlayEvent::ContextMenuRequested {
                drawing_id: hit.id.clone(),
                at: pos,
            })
            .into_iter()
            .collect()
    }

    /// Drops the selection without touching the list, e.g. after the host
    /// deleted the drawing through the toolbar.
    pub fn clear_selection(&mut self) -> Vec<OverlayEvent> {
        if self.is_dragging() {
            return Vec::new();
        }
        self.transition(InteractionState::Idle, ScreenPos::default())
    }

    fn resolve_point(&self, frame: &OverlayFrame<'_>, pos: ScreenPos) -> Option<DomainPoint> {
        let raw = frame.mapper().to_domain(pos.x, pos.y)?;
        let snapped = SnapResolver::new(frame.candles, frame.magnet_mode)
            .with_threshold(self.settings.snap_threshold_px)
            .resolve(frame.chart, raw, pos.x);
        Some(snapped)
    }

    fn hit_tester<'a>(&self, frame: &OverlayFrame<'a>) -> HitTester<'a> {
        HitTester::new(frame.mapper(), frame.timeframe, frame.viewport.width)
            .with_tolerances(self.settings.hit_tolerances())
    }

    fn transition(&mut self, next: InteractionState, at: ScreenPos) -> Vec<OverlayEvent> {
        let before = self.state.selected_id().cloned();
        self.state = next;
        let after = self.state.selected_id().cloned();
        if before == after {
            Vec::new()
        } else {
            vec![OverlayEvent::SelectionChanged { id: after, at }]
        }
    }

    fn abandon_for_read_only(&mut self) -> Vec<OverlayEvent> {
        let was_dragging = self.is_dragging();
        self.state = InteractionState::Idle;
        self.hovered = None;
        if was_dragging {
            vec![OverlayEvent::LiveDrawingChanged(None)]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::chart::SampledChart;
    use crate::overlay::model::DARK_THEME_STROKE;

    struct Fixture {
        chart: SampledChart,
        candles: Vec<Candle>,
        drawings: Vec<DrawingObject>,
        tool: Tool,
        read_only: bool,
    }

    impl Fixture {
        // Bars every 10 time units at 1 px per unit; price == 400 - y.
        fn new() -> Self {
            let candles: Vec<Candle> = (0..=40)
                .map(|i| Candle::new(i as f64 * 10.0, 100.0, 110.0, 90.0, 105.0))
                .collect();
            let chart = SampledChart::from_candles(&candles, 10.0, 400.0, 0.0, 400.0);
            Self {
                chart,
                candles,
                drawings: Vec::new(),
                tool: Tool::Cursor,
                read_only: false,
            }
        }

        fn frame(&self) -> OverlayFrame<'_> {
            OverlayFrame {
                chart: &self.chart,
                candles: &self.candles,
                drawings: &self.drawings,
                active_tool: self.tool,
                magnet_mode: false,
                timeframe: "1m",
                read_only: self.read_only,
                viewport: Viewport::new(400.0, 400.0),
            }
        }

        fn apply(&mut self, events: &[OverlayEvent]) {
            for event in events {
                match event {
                    OverlayEvent::DrawingsUpdated(next) => self.drawings = next.clone(),
                    OverlayEvent::ToolCompleted => self.tool = Tool::Cursor,
                    _ => {}
                }
            }
        }
    }

    fn rect(id: &str) -> DrawingObject {
        DrawingObject::new(
            DrawingId::from(id),
            Shape::new(DrawingKind::Rect, DomainPoint::new(100.0, 300.0)),
            DARK_THEME_STROKE,
        )
        .with_anchor(AnchorHandle::P2, DomainPoint::new(200.0, 200.0))
    }

    #[test]
    fn horizontal_commits_on_press() {
        let mut fx = Fixture::new();
        fx.tool = Tool::Horizontal;
        let mut machine = InteractionMachine::default();
        let events = machine.pointer_down(&fx.frame(), ScreenPos::new(50.0, 150.0));
        fx.apply(&events);
        assert_eq!(fx.drawings.len(), 1);
        assert_eq!(fx.drawings[0].kind(), DrawingKind::Horizontal);
        assert_eq!(fx.drawings[0].p1(), DomainPoint::new(50.0, 250.0));
        assert_eq!(fx.tool, Tool::Cursor);
        assert_eq!(machine.phase(), InteractionPhase::Idle);
    }

    #[test]
    fn press_on_drawing_selects_and_moves_rigidly() {
        let mut fx = Fixture::new();
        fx.drawings = vec![rect("r")];
        let mut machine = InteractionMachine::default();

        let events = machine.pointer_down(&fx.frame(), ScreenPos::new(150.0, 150.0));
        assert_eq!(machine.phase(), InteractionPhase::Moving);
        assert!(events.iter().any(|e| matches!(
            e,
            OverlayEvent::SelectionChanged { id: Some(id), .. } if id.as_str() == "r"
        )));

        let events = machine.pointer_move(&fx.frame(), ScreenPos::new(170.0, 140.0));
        assert!(events
            .iter()
            .any(|e| matches!(e, OverlayEvent::LiveDrawingChanged(Some(_)))));
        assert!(fx.drawings[0].p1() == DomainPoint::new(100.0, 300.0));

        let events = machine.pointer_up(&fx.frame());
        fx.apply(&events);
        assert_eq!(machine.phase(), InteractionPhase::Selected);
        assert_eq!(fx.drawings[0].p1(), DomainPoint::new(120.0, 310.0));
        assert_eq!(fx.drawings[0].p2(), Some(DomainPoint::new(220.0, 210.0)));
    }

    #[test]
    fn selected_anchor_handle_starts_resize() {
        let mut fx = Fixture::new();
        fx.drawings = vec![rect("r")];
        let mut machine = InteractionMachine::default();
        fx.apply(&machine.pointer_down(&fx.frame(), ScreenPos::new(150.0, 150.0)));
        fx.apply(&machine.pointer_up(&fx.frame()));

        machine.pointer_down(&fx.frame(), ScreenPos::new(198.0, 203.0));
        assert_eq!(machine.phase(), InteractionPhase::ResizingP2);
        machine.pointer_move(&fx.frame(), ScreenPos::new(250.0, 250.0));
        fx.apply(&machine.pointer_up(&fx.frame()));

        assert_eq!(fx.drawings[0].p1(), DomainPoint::new(100.0, 300.0));
        assert_eq!(fx.drawings[0].p2(), Some(DomainPoint::new(250.0, 150.0)));
    }

    #[test]
    fn click_without_move_does_not_rewrite_list() {
        let mut fx = Fixture::new();
        fx.drawings = vec![rect("r")];
        let mut machine = InteractionMachine::default();
        machine.pointer_down(&fx.frame(), ScreenPos::new(150.0, 150.0));
        let events = machine.pointer_up(&fx.frame());
        assert_eq!(events, vec![OverlayEvent::LiveDrawingChanged(None)]);
    }

    #[test]
    fn miss_clears_selection() {
        let mut fx = Fixture::new();
        fx.drawings = vec![rect("r")];
        let mut machine = InteractionMachine::default();
        machine.pointer_down(&fx.frame(), ScreenPos::new(150.0, 150.0));
        machine.pointer_up(&fx.frame());
        assert!(machine.selected_id().is_some());

        let events = machine.pointer_down(&fx.frame(), ScreenPos::new(350.0, 20.0));
        assert_eq!(machine.phase(), InteractionPhase::Idle);
        assert!(events
            .iter()
            .any(|e| matches!(e, OverlayEvent::SelectionChanged { id: None, .. })));
    }

    #[test]
    fn scissors_only_reports_time() {
        let mut fx = Fixture::new();
        fx.tool = Tool::Scissors;
        let mut machine = InteractionMachine::default();
        let events = machine.pointer_down(&fx.frame(), ScreenPos::new(120.0, 100.0));
        assert_eq!(events, vec![OverlayEvent::CutRequested { time: 120.0 }]);
        assert_eq!(machine.phase(), InteractionPhase::Idle);
    }

    #[test]
    fn text_creation_keeps_single_anchor() {
        let mut fx = Fixture::new();
        fx.tool = Tool::Text;
        let mut machine = InteractionMachine::default();
        machine.pointer_down(&fx.frame(), ScreenPos::new(100.0, 100.0));
        machine.pointer_move(&fx.frame(), ScreenPos::new(200.0, 200.0));
        fx.apply(&machine.pointer_up(&fx.frame()));
        assert_eq!(fx.drawings[0].kind(), DrawingKind::Text);
        assert_eq!(fx.drawings[0].p1(), DomainPoint::new(100.0, 300.0));
        assert_eq!(fx.drawings[0].p2(), None);
    }

    #[test]
    fn outside_press_respects_toolbar() {
        let mut fx = Fixture::new();
        fx.drawings = vec![rect("r")];
        let mut machine = InteractionMachine::default();
        machine.pointer_down(&fx.frame(), ScreenPos::new(150.0, 150.0));
        machine.pointer_up(&fx.frame());

        assert!(machine.pointer_down_outside(&fx.frame(), true).is_empty());
        assert!(machine.selected_id().is_some());
        machine.pointer_down_outside(&fx.frame(), false);
        assert!(machine.selected_id().is_none());
        assert_eq!(fx.drawings.len(), 1);
    }

    #[test]
    fn hover_tracks_topmost_drawing() {
        let mut fx = Fixture::new();
        fx.drawings = vec![rect("r")];
        let mut machine = InteractionMachine::default();
        let events = machine.pointer_move(&fx.frame(), ScreenPos::new(150.0, 150.0));
        assert_eq!(machine.hovered_id().map(DrawingId::as_str), Some("r"));
        assert_eq!(
            events,
            vec![OverlayEvent::HoverChanged {
                price: Some(250.0),
                time: Some(150.0)
            }]
        );
        machine.pointer_leave(&fx.frame());
        assert!(machine.hovered_id().is_none());
    }

    #[test]
    fn context_menu_reports_hit_id() {
        let mut fx = Fixture::new();
        fx.drawings = vec![rect("r")];
        let machine = InteractionMachine::default();
        let events = machine.context_menu(&fx.frame(), ScreenPos::new(150.0, 150.0));
        assert!(matches!(
            events.as_slice(),
            [OverlayEvent::ContextMenuRequested { drawing_id, .. }] if drawing_id.as_str() == "r"
        ));
        fx.read_only = true;
        assert!(machine.context_menu(&fx.frame(), ScreenPos::new(150.0, 150.0)).is_empty());
    }
}
