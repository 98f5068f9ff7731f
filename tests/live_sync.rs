use std::sync::mpsc::channel;

use chart_overlay::overlay::model::DARK_THEME_STROKE;
use chart_overlay::overlay::{
    Candle, DomainPoint, DrawingId, DrawingKind, DrawingObject, OverlayEvent, OverlaySession, OverlaySettings,
    RemoteUpdate, RenderSource, SampledChart, ScenePrimitive, ScreenPos, Shape, Viewport,
};

fn session() -> OverlaySession<SampledChart> {
    let candles: Vec<Candle> = (0..=40)
        .map(|i| Candle::new(i as f64 * 10.0, 100.0, 110.0, 90.0, 105.0))
        .collect();
    let chart = SampledChart::from_candles(&candles, 10.0, 400.0, 0.0, 400.0);
    let mut session = OverlaySession::new(chart, candles, OverlaySettings::default());
    session.set_viewport(Viewport::new(400.0, 400.0));
    session
}

fn horizontal(id: &str, price: f64) -> DrawingObject {
    DrawingObject::new(
        DrawingId::from(id),
        Shape::new(DrawingKind::Horizontal, DomainPoint::new(100.0, price)),
        DARK_THEME_STROKE,
    )
}

fn rendered(session: &OverlaySession<SampledChart>) -> Vec<(String, f64, RenderSource)> {
    session
        .render_items()
        .iter()
        .map(|item| (item.drawing.id.to_string(), item.drawing.p1().price, item.source))
        .collect()
}

#[test]
fn local_drag_owns_its_id_until_release() {
    let (tx, rx) = channel();
    let mut session = session().with_remote(rx);
    session.set_drawings(vec![horizontal("a", 250.0)]);

    session.pointer_down(ScreenPos::new(100.0, 150.0));
    session.pointer_move(ScreenPos::new(100.0, 130.0));
    tx.send(RemoteUpdate::LiveDrawing(Some(horizontal("a", 10.0))))
        .expect("send remote");
    session.pump_remote();

    assert_eq!(
        rendered(&session),
        vec![("a".to_string(), 270.0, RenderSource::LocalPreview)]
    );

    session.pointer_up();
    assert_eq!(session.drawings()[0].p1().price, 270.0);
    assert_eq!(
        rendered(&session),
        vec![("a".to_string(), 10.0, RenderSource::RemotePreview)]
    );
}

#[test]
fn remote_preview_never_mutates_persisted_list() {
    let (tx, rx) = channel();
    let mut session = session().with_remote(rx);
    session.set_drawings(vec![horizontal("a", 250.0)]);

    tx.send(RemoteUpdate::LiveDrawing(Some(horizontal("a", 300.0))))
        .expect("send remote");
    session.pump_remote();
    assert_eq!(session.drawings()[0].p1().price, 250.0);
    assert_eq!(rendered(&session)[0].2, RenderSource::RemotePreview);

    tx.send(RemoteUpdate::Drawings(vec![horizontal("a", 300.0)]))
        .expect("send commit");
    tx.send(RemoteUpdate::LiveDrawing(None)).expect("send clear");
    session.pump_remote();
    assert_eq!(
        rendered(&session),
        vec![("a".to_string(), 300.0, RenderSource::Persisted)]
    );
}

#[test]
fn remote_creation_renders_as_new_shape() {
    let (tx, rx) = channel();
    let mut session = session().with_remote(rx);
    session.set_drawings(vec![horizontal("a", 250.0)]);
    tx.send(RemoteUpdate::LiveDrawing(Some(horizontal("remote-new", 200.0))))
        .expect("send remote");
    session.pump_remote();

    let items = rendered(&session);
    assert_eq!(items.len(), 2);
    assert_eq!(items[1], ("remote-new".to_string(), 200.0, RenderSource::RemoteDraft));

    let labels = session
        .render()
        .into_iter()
        .filter(|p| matches!(p, ScenePrimitive::Label(_)))
        .count();
    assert_eq!(labels, 2);
}

#[test]
fn local_creation_is_published_and_suppresses_remote() {
    let (remote_tx, remote_rx) = channel();
    let (out_tx, out_rx) = channel();
    let mut session = session().with_remote(remote_rx).with_outbound(out_tx);
    remote_tx
        .send(RemoteUpdate::LiveDrawing(Some(horizontal("remote-new", 200.0))))
        .expect("send remote");
    session.pump_remote();

    session.set_active_tool(chart_overlay::overlay::Tool::Rect);
    session.pointer_down(ScreenPos::new(100.0, 100.0));
    session.pointer_move(ScreenPos::new(150.0, 150.0));

    let items = rendered(&session);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].2, RenderSource::LocalDraft);

    let outbound: Vec<OverlayEvent> = out_rx.try_iter().collect();
    assert!(outbound.iter().any(|e| matches!(
        e,
        OverlayEvent::LiveDrawingChanged(Some(d)) if d.p2() == Some(DomainPoint::new(150.0, 250.0))
    )));

    session.pointer_up();
    let outbound: Vec<OverlayEvent> = out_rx.try_iter().collect();
    assert_eq!(outbound.last(), Some(&OverlayEvent::LiveDrawingChanged(None)));
    assert_eq!(rendered(&session).len(), 2);
}
