//! AppState — shared read-only data passed to all components during render/event.
//!
//! Components read this, but never mutate it.  The App event loop is the only
//! writer, copying in each `CoreSnapshot` the core broadcasts.

use std::sync::Arc;

use tune_core::model::{Catalog, CatalogStatus, PlaybackSnapshot, Track, ViewFilter};

use crate::core::CoreSnapshot;

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub filter: ViewFilter,
    pub status: CatalogStatus,
    pub catalog: Arc<Catalog>,
    pub playback: PlaybackSnapshot,
}

impl AppState {
    pub fn apply(&mut self, snapshot: CoreSnapshot) {
        self.filter = snapshot.filter;
        self.status = snapshot.status;
        self.catalog = snapshot.catalog;
        self.playback = snapshot.playback;
    }

    /// Tracks of the active view.  Empty while the catalog still belongs to
    /// another filter.
    pub fn tracks(&self) -> &[Track] {
        if self.catalog.filter() != self.filter {
            return &[];
        }
        self.catalog.tracks()
    }

    pub fn is_current(&self, track: &Track) -> bool {
        self.playback.current_id() == Some(track.id.as_str())
    }

    /// Message to show in place of the track list, if any.
    pub fn empty_message(&self) -> Option<&'static str> {
        if !self.tracks().is_empty() {
            return None;
        }
        Some(match self.status {
            CatalogStatus::Loading => "Loading…",
            CatalogStatus::Ready => crate::core::MSG_NO_SONGS,
            CatalogStatus::Failed(_) => crate::core::MSG_LOAD_FAILED,
        })
    }
}
