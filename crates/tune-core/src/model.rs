use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Which slice of the catalog the user is looking at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ViewFilter {
    #[default]
    ForYou,
    TopTracks,
}

impl ViewFilter {
    pub const ALL: [ViewFilter; 2] = [ViewFilter::ForYou, ViewFilter::TopTracks];

    pub fn label(self) -> &'static str {
        match self {
            Self::ForYou => "For You",
            Self::TopTracks => "Top Tracks",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::ForYou => Self::TopTracks,
            Self::TopTracks => Self::ForYou,
        }
    }
}

/// A playable song.  Asset URLs are already fully qualified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Display string as delivered by the service (e.g. "3:45").
    #[serde(default)]
    pub duration: String,
    pub cover_url: String,
    pub audio_url: String,
    #[serde(default)]
    pub top_track: bool,
    /// Hex colour the service associates with the cover art.
    #[serde(default)]
    pub accent: Option<String>,
    /// Editorial ordering hint, when the service supplies one.
    #[serde(default)]
    pub sort: Option<i64>,
}

/// Ordered, id-unique list of tracks fetched for one view filter.
///
/// Never mutated after construction; a refresh produces a new `Catalog`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    filter: ViewFilter,
    tracks: Vec<Track>,
}

impl Catalog {
    pub fn empty(filter: ViewFilter) -> Self {
        Self {
            filter,
            tracks: Vec::new(),
        }
    }

    /// Build a catalog, dropping any track whose id was already seen.
    pub fn new(filter: ViewFilter, tracks: Vec<Track>) -> Self {
        let mut seen = HashSet::with_capacity(tracks.len());
        let tracks = tracks
            .into_iter()
            .filter(|t| {
                let fresh = seen.insert(t.id.clone());
                if !fresh {
                    warn!("catalog: dropping duplicate track id {}", t.id);
                }
                fresh
            })
            .collect();
        Self { filter, tracks }
    }

    pub fn filter(&self) -> ViewFilter {
        self.filter
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Track> {
        self.tracks.get(idx)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn find(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }
}

/// Load state of the catalog for the active filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CatalogStatus {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

/// Coarse playback state as seen by the UI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle, // no track selected
    Paused,  // track loaded, not playing
    Playing, // track loaded, play requested
}

impl PlaybackStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Paused => "paused",
            Self::Playing => "playing",
        }
    }
}

/// Read-only copy of the controller state handed to renderers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSnapshot {
    pub current_track: Option<Track>,
    pub is_playing: bool,
}

impl PlaybackSnapshot {
    pub fn status(&self) -> PlaybackStatus {
        match (&self.current_track, self.is_playing) {
            (None, _) => PlaybackStatus::Idle,
            (Some(_), false) => PlaybackStatus::Paused,
            (Some(_), true) => PlaybackStatus::Playing,
        }
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.id.as_str())
    }
}

#[cfg(test)]
pub(crate) fn track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Song {}", id),
        artist: format!("Artist {}", id),
        duration: "3:00".to_string(),
        cover_url: format!("https://cdn.test/assets/cover-{}", id),
        audio_url: format!("https://cdn.test/assets/audio-{}", id),
        top_track: false,
        accent: None,
        sort: None,
    }
}
