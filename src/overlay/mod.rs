//! Interactive drawing layer for a candlestick chart.

pub mod chart;
pub mod coords;
pub mod hit_test;
pub mod input;
pub mod live_sync;
pub mod model;
pub mod scene;
pub mod session;
pub mod settings;
pub mod settings_store;
pub mod snap;
pub mod templates;
pub mod toolbar;

pub use chart::{Candle, ChartSurface, SampledChart, ScreenPos, Viewport};
pub use coords::CoordinateMapper;
pub use hit_test::HitTester;
pub use input::{InteractionMachine, InteractionPhase, OverlayEvent, OverlayFrame, OverlayKey, Tool};
pub use live_sync::{LiveSyncAdapter, RenderItem, RenderSource};
pub use model::{DomainPoint, DrawingId, DrawingKind, DrawingObject, Shape};
pub use scene::{build_scene, ScenePrimitive, SceneOptions};
pub use session::{OverlaySession, RemoteUpdate};
pub use settings::{OverlaySettings, Theme};
pub use snap::SnapResolver;
pub use templates::{DrawingTemplate, TemplateStore};
pub use toolbar::{ToolbarCommand, ToolbarState};
