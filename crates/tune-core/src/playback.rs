//! Playback controller: the current track, the play flag, and the commands
//! that keep the audio resource in step with them.
//!
//! States:
//!
//! ```text
//!   Idle ──select/next/prev──► Playing ◄──toggle──► Paused
//!    ▲                            │                   │
//!    └──── stale catalog / stop ──┴───────────────────┘
//! ```
//!
//! Every transition bumps `generation`.  Play results come back tagged with
//! the generation they were issued under; a result from an older generation
//! describes a state the user has already moved past and is ignored.
//!
//! End events are matched the same way against the source id handed out on
//! each track change.  Pause and resume keep the source, so a track that
//! finishes after being resumed still counts.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::audio::{PlayOutcome, PlayTicket, ResourceCommand, ResourceEnd, SourceEnded, SourceId};
use crate::error::{EmptyCatalogError, PlaybackError, StaleReference};
use crate::model::{Catalog, PlaybackSnapshot, PlaybackStatus, Track};
use crate::navigation;

pub struct PlaybackController {
    current: Option<Track>,
    is_playing: bool,
    generation: u64,
    /// Id of the last source handed to the resource.
    source: SourceId,
    auto_advance: bool,
    commands: mpsc::UnboundedSender<ResourceCommand>,
}

impl PlaybackController {
    pub fn new(commands: mpsc::UnboundedSender<ResourceCommand>, auto_advance: bool) -> Self {
        Self {
            current: None,
            is_playing: false,
            generation: 0,
            source: SourceId(0),
            auto_advance,
            commands,
        }
    }

    fn issue(&self, cmd: ResourceCommand) {
        if self.commands.send(cmd).is_err() {
            warn!("playback: audio worker gone, command dropped");
        }
    }

    fn bump(&mut self) -> PlayTicket {
        self.generation += 1;
        PlayTicket {
            generation: self.generation,
        }
    }

    /// Make `track` current and start it from the beginning.
    pub fn select_track(&mut self, track: Track) {
        let ticket = self.bump();
        self.source = SourceId(self.source.0 + 1);
        info!("playback: select {} ({})", track.id, track.title);
        self.issue(ResourceCommand::SetSource {
            url: track.audio_url.clone(),
            source: self.source,
        });
        self.issue(ResourceCommand::Load);
        self.issue(ResourceCommand::Play(ticket));
        self.current = Some(track);
        self.is_playing = true;
    }

    pub fn toggle_play_pause(&mut self) -> Result<PlaybackStatus, PlaybackError> {
        if self.current.is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        let ticket = self.bump();
        if self.is_playing {
            self.issue(ResourceCommand::Pause);
            self.is_playing = false;
        } else {
            self.issue(ResourceCommand::Play(ticket));
            self.is_playing = true;
        }
        debug!("playback: toggled → {}", self.status().label());
        Ok(self.status())
    }

    pub fn next(&mut self, catalog: &Catalog) -> Result<(), EmptyCatalogError> {
        let idx = navigation::next_index(catalog.tracks(), self.current_id())?;
        self.select_index(catalog, idx);
        Ok(())
    }

    pub fn previous(&mut self, catalog: &Catalog) -> Result<(), EmptyCatalogError> {
        let idx = navigation::previous_index(catalog.tracks(), self.current_id())?;
        self.select_index(catalog, idx);
        Ok(())
    }

    fn select_index(&mut self, catalog: &Catalog, idx: usize) {
        if let Some(track) = catalog.get(idx) {
            self.select_track(track.clone());
        }
    }

    /// Re-validate the current track against a freshly fetched catalog.
    pub fn on_catalog_replaced(&mut self, catalog: &Catalog) -> Option<StaleReference> {
        let id = self.current_id()?;
        if catalog.contains(id) {
            return None;
        }
        let stale = StaleReference { id: id.to_string() };
        info!(
            "playback: track {} not in refreshed {:?} catalog, stopping",
            stale.id,
            catalog.filter()
        );
        self.stop();
        Some(stale)
    }

    pub fn on_play_resolved(&mut self, outcome: PlayOutcome) -> Option<PlaybackError> {
        if outcome.ticket.generation != self.generation {
            debug!(
                "playback: ignoring stale play result (gen {} != {})",
                outcome.ticket.generation, self.generation
            );
            return None;
        }
        match outcome.result {
            Ok(()) => None,
            Err(e) => {
                warn!("playback: play rejected: {}", e);
                self.is_playing = false;
                Some(PlaybackError::Rejected(e))
            }
        }
    }

    /// The resource stopped on its own.  Ends of any source but the current
    /// one are dropped.
    pub fn on_resource_ended(
        &mut self,
        ended: SourceEnded,
        catalog: &Catalog,
    ) -> Option<PlaybackError> {
        if self.current_source() != Some(ended.source) {
            debug!(
                "playback: ignoring stale end of source {} ({:?})",
                ended.source.0, ended.reason
            );
            return None;
        }
        match ended.reason {
            ResourceEnd::Finished => {
                if self.auto_advance && self.next(catalog).is_ok() {
                    return None;
                }
                self.bump();
                self.is_playing = false;
                None
            }
            ResourceEnd::Failed(msg) => {
                warn!("playback: interrupted: {}", msg);
                self.bump();
                self.is_playing = false;
                Some(PlaybackError::Interrupted(msg))
            }
        }
    }

    pub fn stop(&mut self) {
        self.bump();
        if self.current.take().is_some() {
            self.issue(ResourceCommand::Stop);
        }
        self.is_playing = false;
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|t| t.id.as_str())
    }

    /// Source id of the current track, if any.
    pub fn current_source(&self) -> Option<SourceId> {
        self.current.as_ref().map(|_| self.source)
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn status(&self) -> PlaybackStatus {
        match (&self.current, self.is_playing) {
            (None, _) => PlaybackStatus::Idle,
            (Some(_), false) => PlaybackStatus::Paused,
            (Some(_), true) => PlaybackStatus::Playing,
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current_track: self.current.clone(),
            is_playing: self.is_playing,
        }
    }
}
