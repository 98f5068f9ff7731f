//! Render-time merge of the persisted list with local and remote previews.
//!
//! Nothing here writes to the list. A remote preview only changes what is
//! drawn until the remote side's commit arrives as a new persisted list.

use crate::overlay::model::DrawingObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSource {
    Persisted,
    /// Local drag of a persisted drawing.
    LocalPreview,
    /// Remote drag of a persisted drawing.
    RemotePreview,
    /// Local creation not yet in the list.
    LocalDraft,
    /// Remote creation not yet in the list.
    RemoteDraft,
}

impl RenderSource {
    pub fn is_transient(self) -> bool {
        !matches!(self, RenderSource::Persisted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem<'a> {
    pub drawing: &'a DrawingObject,
    pub source: RenderSource,
}

#[derive(Debug, Clone, Copy)]
pub struct LiveSyncAdapter<'a> {
    drawings: &'a [DrawingObject],
    local: Option<&'a DrawingObject>,
    local_dragging: bool,
    remote: Option<&'a DrawingObject>,
    timeframe: &'a str,
}

impl<'a> LiveSyncAdapter<'a> {
    pub fn new(drawings: &'a [DrawingObject], timeframe: &'a str) -> Self {
        Self {
            drawings,
            local: None,
            local_dragging: false,
            remote: None,
            timeframe,
        }
    }

    /// Local drag state: whether a drag is active and the preview it has
    /// produced so far.
    #[must_use]
    pub fn with_local(mut self, dragging: bool, preview: Option<&'a DrawingObject>) -> Self {
        self.local_dragging = dragging;
        self.local = preview;
        self
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Option<&'a DrawingObject>) -> Self {
        self.remote = remote;
        self
    }

    /// Remote preview that is allowed to render right now. Any local drag
    /// suppresses it.
    pub fn effective_remote(&self) -> Option<&'a DrawingObject> {
        self.remote.filter(|_| !self.local_dragging)
    }

    /// Drawings to paint, bottom to top, already filtered by timeframe.
    pub fn compose(&self) -> Vec<RenderItem<'a>> {
        let local = self.local.filter(|_| self.local_dragging);
        let remote = self.effective_remote();
        let persisted = |candidate: &DrawingObject| self.drawings.iter().any(|d| d.id == candidate.id);

        let mut items: Vec<RenderItem<'a>> = self
            .drawings
            .iter()
            .map(|drawing| {
                if let Some(preview) = local.filter(|p| p.id == drawing.id) {
                    RenderItem {
                        drawing: preview,
                        source: RenderSource::LocalPreview,
                    }
                } else if let Some(preview) = remote.filter(|p| p.id == drawing.id) {
                    RenderItem {
                        drawing: preview,
                        source: RenderSource::RemotePreview,
                    }
                } else {
                    RenderItem {
                        drawing,
                        source: RenderSource::Persisted,
                    }
                }
            })
            .collect();

        if let Some(draft) = remote.filter(|r| !persisted(r)) {
            items.push(RenderItem {
                drawing: draft,
                source: RenderSource::RemoteDraft,
            });
        }
        if let Some(draft) = local.filter(|l| !persisted(l)) {
            items.push(RenderItem {
                drawing: draft,
                source: RenderSource::LocalDraft,
            });
        }

        items.retain(|item| item.drawing.is_visible_on(self.timeframe));
        items
    }
}
