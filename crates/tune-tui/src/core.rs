/// PlayerCore: single-owner event loop for the view state and the playback
/// controller.
///
/// Everything that can change what the user sees arrives here as a
/// `CoreEvent`: key commands from the TUI, catalog fetches completing, play
/// results from the audio worker and end-of-track reports from mpv.  The loop
/// applies the event, then broadcasts a fresh `CoreSnapshot`.  Nothing else
/// touches `ViewState` or `PlaybackController`.
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use tune_core::audio::{PlayOutcome, SourceEnded};
use tune_core::catalog::CatalogSource;
use tune_core::error::PlaybackError;
use tune_core::model::{Catalog, CatalogStatus, PlaybackSnapshot, ViewFilter};
use tune_core::playback::PlaybackController;
use tune_core::view::{Applied, FetchRequest, FetchResponse, ViewState};

pub const MSG_LOAD_FAILED: &str = "Failed to load songs.";
pub const MSG_PLAY_FAILED: &str = "Failed to play audio.";
pub const MSG_NO_SONGS: &str = "No songs available.";
pub const MSG_SELECT_SONG: &str = "Select a song to play";

// ── events in ────────────────────────────────────────────────────────────────

/// What the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    SetFilter(ViewFilter),
    Refresh,
    /// Select the track with this id from the active catalog.
    Select(String),
    TogglePlayPause,
    Next,
    Previous,
}

#[derive(Debug)]
pub enum CoreEvent {
    Command(UserCommand),
    CatalogFetched(FetchResponse),
    PlayResolved(PlayOutcome),
    ResourceEnded(SourceEnded),
    Shutdown,
}

// ── messages out ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct CoreSnapshot {
    pub filter: ViewFilter,
    pub status: CatalogStatus,
    pub catalog: Arc<Catalog>,
    pub playback: PlaybackSnapshot,
}

#[derive(Debug, Clone)]
pub enum CoreMessage {
    StateUpdated(CoreSnapshot),
    Notice(NoticeLevel, String),
}

/// Pump an unbounded channel into the core's event channel.
pub fn forward<T: Send + 'static>(
    mut rx: mpsc::UnboundedReceiver<T>,
    tx: mpsc::Sender<CoreEvent>,
    wrap: fn(T) -> CoreEvent,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            if tx.send(wrap(item)).await.is_err() {
                break;
            }
        }
    })
}

// ── PlayerCore ───────────────────────────────────────────────────────────────

pub struct PlayerCore {
    view: ViewState,
    playback: PlaybackController,
    source: Arc<dyn CatalogSource>,
    /// Fetch tasks report back through this sender.
    event_tx: mpsc::Sender<CoreEvent>,
    broadcast_tx: broadcast::Sender<CoreMessage>,
    /// Shared copy of `view.catalog()`, rebuilt only when the catalog changes.
    catalog: Arc<Catalog>,
}

impl PlayerCore {
    pub fn new(
        playback: PlaybackController,
        source: Arc<dyn CatalogSource>,
        event_tx: mpsc::Sender<CoreEvent>,
        broadcast_tx: broadcast::Sender<CoreMessage>,
    ) -> Self {
        let view = ViewState::new();
        let catalog = Arc::new(view.catalog().clone());
        Self {
            view,
            playback,
            source,
            event_tx,
            broadcast_tx,
            catalog,
        }
    }

    /// Run until `Shutdown` or until every event sender is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<()> {
        info!("PlayerCore: starting event loop");
        let first = self.view.initial_request();
        self.spawn_fetch(first);
        self.broadcast_state();

        while let Some(evt) = event_rx.recv().await {
            if !self.handle_event(evt) {
                info!("PlayerCore: shutdown requested");
                break;
            }
        }

        self.playback.stop();
        info!("PlayerCore: stopped");
        Ok(())
    }

    /// Apply one event.  Returns `false` when the loop should exit.
    fn handle_event(&mut self, evt: CoreEvent) -> bool {
        match evt {
            CoreEvent::Shutdown => return false,

            CoreEvent::Command(cmd) => {
                debug!("PlayerCore: command {:?}", cmd);
                self.handle_command(cmd);
            }

            CoreEvent::CatalogFetched(response) => match self.view.apply(response) {
                Applied::Superseded => return true,
                Applied::Replaced => {
                    self.catalog = Arc::new(self.view.catalog().clone());
                    if let Some(stale) = self.playback.on_catalog_replaced(self.view.catalog()) {
                        info!("PlayerCore: stopped stale track {}", stale.id);
                    }
                }
                Applied::Failed(e) => {
                    error!("PlayerCore: catalog fetch failed: {}", e);
                    self.catalog = Arc::new(self.view.catalog().clone());
                    self.notify(NoticeLevel::Error, MSG_LOAD_FAILED);
                }
            },

            CoreEvent::PlayResolved(outcome) => {
                if let Some(e) = self.playback.on_play_resolved(outcome) {
                    self.report_playback_error(e);
                }
            }

            CoreEvent::ResourceEnded(ended) => {
                if let Some(e) = self.playback.on_resource_ended(ended, self.view.catalog()) {
                    self.report_playback_error(e);
                }
            }
        }
        self.broadcast_state();
        true
    }

    fn handle_command(&mut self, cmd: UserCommand) {
        match cmd {
            UserCommand::SetFilter(filter) => {
                let req = self.view.set_filter(filter);
                if self.catalog.filter() != filter {
                    self.catalog = Arc::new(self.view.catalog().clone());
                }
                self.spawn_fetch(req);
            }
            UserCommand::Refresh => {
                let req = self.view.refresh();
                self.spawn_fetch(req);
            }
            UserCommand::Select(id) => match self.view.catalog().find(&id) {
                Some(track) => self.playback.select_track(track.clone()),
                None => warn!("PlayerCore: select for unknown track {}", id),
            },
            UserCommand::TogglePlayPause => {
                if let Err(e) = self.playback.toggle_play_pause() {
                    debug!("PlayerCore: toggle ignored: {}", e);
                    self.notify(NoticeLevel::Info, MSG_SELECT_SONG);
                }
            }
            UserCommand::Next => {
                if self.playback.next(self.view.catalog()).is_err() {
                    self.notify(NoticeLevel::Info, MSG_NO_SONGS);
                }
            }
            UserCommand::Previous => {
                if self.playback.previous(self.view.catalog()).is_err() {
                    self.notify(NoticeLevel::Info, MSG_NO_SONGS);
                }
            }
        }
    }

    fn report_playback_error(&self, e: PlaybackError) {
        warn!("PlayerCore: {}", e);
        self.notify(NoticeLevel::Error, MSG_PLAY_FAILED);
    }

    fn spawn_fetch(&self, request: FetchRequest) {
        let source = Arc::clone(&self.source);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_catalog(request.filter).await;
            let response = FetchResponse { request, result };
            if tx.send(CoreEvent::CatalogFetched(response)).await.is_err() {
                debug!("PlayerCore: fetch finished after shutdown");
            }
        });
    }

    fn snapshot(&self) -> CoreSnapshot {
        CoreSnapshot {
            filter: self.view.filter(),
            status: self.view.status().clone(),
            catalog: Arc::clone(&self.catalog),
            playback: self.playback.snapshot(),
        }
    }

    fn broadcast_state(&self) {
        // no receivers yet is fine; the TUI subscribes before the first event
        let _ = self
            .broadcast_tx
            .send(CoreMessage::StateUpdated(self.snapshot()));
    }

    fn notify(&self, level: NoticeLevel, msg: &str) {
        let _ = self
            .broadcast_tx
            .send(CoreMessage::Notice(level, msg.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tune_core::audio::{PlayTicket, ResourceCommand, ResourceEnd, SourceId};
    use tune_core::error::{AudioError, CatalogFetchError};
    use tune_core::model::{PlaybackStatus, Track};

    fn track(id: &str, top: bool) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Song {}", id),
            artist: "Someone".to_string(),
            duration: "3:00".to_string(),
            cover_url: format!("https://cdn.test/assets/c{}", id),
            audio_url: format!("https://cdn.test/assets/a{}", id),
            top_track: top,
            ..Track::default()
        }
    }

    /// Returns fixed catalogs; `TopTracks` fails when `fail_top` is set.
    struct FakeSource {
        fail_top: bool,
    }

    #[async_trait]
    impl CatalogSource for FakeSource {
        async fn fetch_catalog(&self, filter: ViewFilter) -> Result<Catalog, CatalogFetchError> {
            match filter {
                ViewFilter::ForYou => Ok(Catalog::new(
                    filter,
                    vec![track("A", true), track("B", false), track("C", true)],
                )),
                ViewFilter::TopTracks if self.fail_top => Err(CatalogFetchError::Status(500)),
                ViewFilter::TopTracks => Ok(Catalog::new(
                    filter,
                    vec![track("A", true), track("C", true)],
                )),
            }
        }
    }

    struct Harness {
        core: PlayerCore,
        events: mpsc::Receiver<CoreEvent>,
        commands: mpsc::UnboundedReceiver<ResourceCommand>,
        messages: broadcast::Receiver<CoreMessage>,
    }

    impl Harness {
        fn new(fail_top: bool) -> Self {
            let (event_tx, events) = mpsc::channel(64);
            let (broadcast_tx, messages) = broadcast::channel(256);
            let (cmd_tx, commands) = mpsc::unbounded_channel();
            let core = PlayerCore::new(
                PlaybackController::new(cmd_tx, true),
                Arc::new(FakeSource { fail_top }),
                event_tx,
                broadcast_tx,
            );
            Self {
                core,
                events,
                commands,
                messages,
            }
        }

        fn command(&mut self, cmd: UserCommand) {
            assert!(self.core.handle_event(CoreEvent::Command(cmd)));
        }

        /// Wait for the next fetch task to report back, without applying it.
        async fn next_fetch(&mut self) -> FetchResponse {
            match self.events.recv().await {
                Some(CoreEvent::CatalogFetched(r)) => r,
                other => panic!("expected a fetch response, got {:?}", other),
            }
        }

        async fn load(&mut self, cmd: UserCommand) {
            self.command(cmd);
            let response = self.next_fetch().await;
            self.core.handle_event(CoreEvent::CatalogFetched(response));
        }

        fn drain_commands(&mut self) -> Vec<ResourceCommand> {
            let mut out = Vec::new();
            while let Ok(c) = self.commands.try_recv() {
                out.push(c);
            }
            out
        }

        fn notices(&mut self) -> Vec<String> {
            let mut out = Vec::new();
            while let Ok(msg) = self.messages.try_recv() {
                if let CoreMessage::Notice(_, text) = msg {
                    out.push(text);
                }
            }
            out
        }

        fn current_source(&self) -> SourceId {
            self.core.playback.current_source().expect("nothing loaded")
        }

        fn ended(&mut self, source: SourceId, reason: ResourceEnd) {
            self.core
                .handle_event(CoreEvent::ResourceEnded(SourceEnded { source, reason }));
        }

        fn last_play_ticket(&mut self) -> PlayTicket {
            self.drain_commands()
                .into_iter()
                .rev()
                .find_map(|c| match c {
                    ResourceCommand::Play(t) => Some(t),
                    _ => None,
                })
                .expect("no play issued")
        }
    }

    #[tokio::test]
    async fn test_refresh_loads_catalog() {
        let mut h = Harness::new(false);
        h.load(UserCommand::Refresh).await;

        let snap = h.core.snapshot();
        assert_eq!(snap.filter, ViewFilter::ForYou);
        assert_eq!(snap.status, CatalogStatus::Ready);
        assert_eq!(snap.catalog.len(), 3);
    }

    #[tokio::test]
    async fn test_late_response_for_previous_filter_is_dropped() {
        let mut h = Harness::new(false);
        h.command(UserCommand::SetFilter(ViewFilter::TopTracks));
        h.command(UserCommand::SetFilter(ViewFilter::ForYou));

        let mut first = h.next_fetch().await;
        let mut second = h.next_fetch().await;
        if first.request.filter == ViewFilter::ForYou {
            std::mem::swap(&mut first, &mut second);
        }
        // ForYou lands first, the stale TopTracks response after it
        h.core.handle_event(CoreEvent::CatalogFetched(second));
        h.core.handle_event(CoreEvent::CatalogFetched(first));

        let snap = h.core.snapshot();
        assert_eq!(snap.filter, ViewFilter::ForYou);
        assert_eq!(snap.catalog.filter(), ViewFilter::ForYou);
        assert_eq!(snap.catalog.len(), 3);
    }

    #[tokio::test]
    async fn test_select_next_wraps_and_plays() {
        let mut h = Harness::new(false);
        h.load(UserCommand::Refresh).await;

        h.command(UserCommand::Select("B".into()));
        h.command(UserCommand::Next);
        assert_eq!(h.core.snapshot().playback.current_id(), Some("C"));
        h.command(UserCommand::Next);
        let snap = h.core.snapshot();
        assert_eq!(snap.playback.current_id(), Some("A"));
        assert_eq!(snap.playback.status(), PlaybackStatus::Playing);
    }

    #[tokio::test]
    async fn test_filter_switch_drops_track_missing_from_new_list() {
        let mut h = Harness::new(false);
        h.load(UserCommand::Refresh).await;
        h.command(UserCommand::Select("B".into()));
        h.drain_commands();

        h.load(UserCommand::SetFilter(ViewFilter::TopTracks)).await;

        assert_eq!(h.core.snapshot().playback.status(), PlaybackStatus::Idle);
        assert_eq!(h.drain_commands(), vec![ResourceCommand::Stop]);
    }

    #[tokio::test]
    async fn test_filter_switch_keeps_track_present_in_new_list() {
        let mut h = Harness::new(false);
        h.load(UserCommand::Refresh).await;
        h.command(UserCommand::Select("C".into()));
        h.drain_commands();

        h.load(UserCommand::SetFilter(ViewFilter::TopTracks)).await;

        let snap = h.core.snapshot();
        assert_eq!(snap.playback.current_id(), Some("C"));
        assert!(snap.playback.is_playing);
        assert!(h.drain_commands().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_and_keeps_playing() {
        let mut h = Harness::new(true);
        h.load(UserCommand::Refresh).await;
        h.command(UserCommand::Select("A".into()));
        h.notices();

        h.load(UserCommand::SetFilter(ViewFilter::TopTracks)).await;

        let snap = h.core.snapshot();
        assert!(matches!(snap.status, CatalogStatus::Failed(_)));
        assert!(snap.catalog.is_empty());
        assert_eq!(snap.playback.current_id(), Some("A"));
        assert_eq!(h.notices(), vec![MSG_LOAD_FAILED.to_string()]);

        // nothing to step through on the failed view
        h.command(UserCommand::Next);
        assert_eq!(h.core.snapshot().playback.current_id(), Some("A"));
        assert_eq!(h.notices(), vec![MSG_NO_SONGS.to_string()]);
    }

    #[tokio::test]
    async fn test_toggle_without_track_only_notifies() {
        let mut h = Harness::new(false);
        h.command(UserCommand::TogglePlayPause);
        assert_eq!(h.core.snapshot().playback.status(), PlaybackStatus::Idle);
        assert!(h.drain_commands().is_empty());
        assert_eq!(h.notices(), vec![MSG_SELECT_SONG.to_string()]);
    }

    #[tokio::test]
    async fn test_play_rejection_pauses_and_notifies() {
        let mut h = Harness::new(false);
        h.load(UserCommand::Refresh).await;
        h.command(UserCommand::Select("A".into()));
        let ticket = h.last_play_ticket();
        h.notices();

        h.core.handle_event(CoreEvent::PlayResolved(PlayOutcome {
            ticket,
            result: Err(AudioError::Unavailable("mpv binary not found".into())),
        }));

        assert_eq!(h.core.snapshot().playback.status(), PlaybackStatus::Paused);
        assert_eq!(h.notices(), vec![MSG_PLAY_FAILED.to_string()]);
    }

    #[tokio::test]
    async fn test_stale_play_rejection_is_silent() {
        let mut h = Harness::new(false);
        h.load(UserCommand::Refresh).await;
        h.command(UserCommand::Select("A".into()));
        let stale = h.last_play_ticket();
        h.command(UserCommand::Select("B".into()));
        h.notices();

        h.core.handle_event(CoreEvent::PlayResolved(PlayOutcome {
            ticket: stale,
            result: Err(AudioError::Command("superseded".into())),
        }));

        let snap = h.core.snapshot();
        assert_eq!(snap.playback.current_id(), Some("B"));
        assert!(snap.playback.is_playing);
        assert!(h.notices().is_empty());
    }

    #[tokio::test]
    async fn test_track_end_advances() {
        let mut h = Harness::new(false);
        h.load(UserCommand::Refresh).await;
        h.command(UserCommand::Select("C".into()));

        let source = h.current_source();
        h.ended(source, ResourceEnd::Finished);
        assert_eq!(h.core.snapshot().playback.current_id(), Some("A"));
    }

    #[tokio::test]
    async fn test_late_end_of_skipped_track_does_not_advance() {
        let mut h = Harness::new(false);
        h.load(UserCommand::Refresh).await;
        h.command(UserCommand::Select("A".into()));
        let a = h.current_source();
        h.command(UserCommand::Next);
        h.drain_commands();
        h.notices();

        h.ended(a, ResourceEnd::Finished);

        let snap = h.core.snapshot();
        assert_eq!(snap.playback.current_id(), Some("B"));
        assert!(snap.playback.is_playing);
        assert!(h.drain_commands().is_empty());
        assert!(h.notices().is_empty());
    }

    #[tokio::test]
    async fn test_late_error_of_replaced_track_is_silent() {
        let mut h = Harness::new(false);
        h.load(UserCommand::Refresh).await;
        h.command(UserCommand::Select("A".into()));
        let a = h.current_source();
        h.command(UserCommand::Select("B".into()));
        h.notices();

        h.ended(a, ResourceEnd::Failed("connection reset".into()));

        let snap = h.core.snapshot();
        assert_eq!(snap.playback.current_id(), Some("B"));
        assert_eq!(snap.playback.status(), PlaybackStatus::Playing);
        assert!(h.notices().is_empty());

        // the same error for the current track does count
        let b = h.current_source();
        h.ended(b, ResourceEnd::Failed("connection reset".into()));
        assert_eq!(h.core.snapshot().playback.status(), PlaybackStatus::Paused);
        assert_eq!(h.notices(), vec![MSG_PLAY_FAILED.to_string()]);
    }

    #[tokio::test]
    async fn test_filter_switch_hides_old_tracks_until_loaded() {
        let mut h = Harness::new(false);
        h.load(UserCommand::Refresh).await;
        h.command(UserCommand::Select("B".into()));
        h.drain_commands();
        h.notices();

        h.command(UserCommand::SetFilter(ViewFilter::TopTracks));
        let snap = h.core.snapshot();
        assert_eq!(snap.status, CatalogStatus::Loading);
        assert_eq!(snap.catalog.filter(), ViewFilter::TopTracks);
        assert!(snap.catalog.is_empty());

        // old list is gone: nothing to select or step through
        h.command(UserCommand::Select("A".into()));
        h.command(UserCommand::Next);
        assert_eq!(h.core.snapshot().playback.current_id(), Some("B"));
        assert!(h.drain_commands().is_empty());
        assert_eq!(h.notices(), vec![MSG_NO_SONGS.to_string()]);

        let response = h.next_fetch().await;
        h.core.handle_event(CoreEvent::CatalogFetched(response));
        assert_eq!(h.core.snapshot().catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_ends_loop() {
        let mut h = Harness::new(false);
        assert!(!h.core.handle_event(CoreEvent::Shutdown));
    }

    #[tokio::test]
    async fn test_run_broadcasts_initial_catalog() {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (broadcast_tx, mut messages) = broadcast::channel(64);
        let (cmd_tx, _commands) = mpsc::unbounded_channel();
        let core = PlayerCore::new(
            PlaybackController::new(cmd_tx, true),
            Arc::new(FakeSource { fail_top: false }),
            event_tx.clone(),
            broadcast_tx,
        );
        let task = tokio::spawn(core.run(event_rx));

        let ready = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                if let Ok(CoreMessage::StateUpdated(snap)) = messages.recv().await {
                    if snap.status == CatalogStatus::Ready {
                        return snap;
                    }
                }
            }
        })
        .await
        .expect("catalog never became ready");
        assert_eq!(ready.catalog.len(), 3);

        event_tx.send(CoreEvent::Shutdown).await.unwrap();
        task.await.unwrap().unwrap();
    }
}
