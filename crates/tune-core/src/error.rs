//! Error types shared by the catalog, navigation and playback layers.
//!
//! Every error here is recoverable: the core loop turns them into log lines
//! and transient status messages, never into a crash.

/// Fetching the catalog failed; no partial catalog is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum CatalogFetchError {
    #[error("catalog request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("catalog service returned status {0}")]
    Status(u16),

    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CatalogFetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(e)
        }
    }
}

/// next/previous was asked for on a catalog with no tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("catalog is empty")]
pub struct EmptyCatalogError;

/// Failure reported by the audio playback resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    #[error("audio command failed: {0}")]
    Command(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// The resource refused to start playing.
    #[error("playback rejected: {0}")]
    Rejected(AudioError),

    /// Playback stopped on its own (stream error, device lost).
    #[error("playback interrupted: {0}")]
    Interrupted(String),

    #[error("no track loaded")]
    NothingLoaded,
}

/// The current track vanished from a refreshed catalog and playback was
/// stopped.  Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleReference {
    pub id: String,
}
