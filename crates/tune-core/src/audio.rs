//! The audio playback resource and the single worker that drives it.
//!
//! ```text
//!   PlaybackController ──ResourceCommand──► resource worker ──► AudioOutput
//!          ▲                                      │
//!          └──────────── PlayOutcome ─────────────┘
//! ```
//!
//! Commands are executed strictly in the order they were issued, one at a
//! time.  Only `Play` reports back; its outcome carries the generation ticket
//! it was issued under so the controller can ignore stale results.
//!
//! End events travel on a separate path owned by the output.  Each one names
//! the [`SourceId`] that was loaded when it happened, so an end that belongs
//! to a track the user already left can be told apart from the current one.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::AudioError;

/// A single audio output handle (one stream at a time).
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Point the output at a new source.  Does not start fetching it.
    /// End events reported after this source loads must carry `source`.
    async fn set_source(&self, url: &str, source: SourceId) -> Result<(), AudioError>;
    /// (Re)load the current source from scratch.
    async fn load(&self) -> Result<(), AudioError>;
    async fn play(&self) -> Result<(), AudioError>;
    async fn pause(&self) -> Result<(), AudioError>;
    /// Stop and unload.
    async fn stop(&self) -> Result<(), AudioError> {
        self.pause().await
    }
}

/// Identifies the controller transition a play command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayTicket {
    pub generation: u64,
}

/// Identifies one `set_source` call.  Stays the same across pause/resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceCommand {
    SetSource { url: String, source: SourceId },
    Load,
    Play(PlayTicket),
    Pause,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayOutcome {
    pub ticket: PlayTicket,
    pub result: Result<(), AudioError>,
}

/// Why the resource stopped producing sound on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceEnd {
    Finished,
    Failed(String),
}

/// An end event stamped with the source it happened to.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEnded {
    pub source: SourceId,
    pub reason: ResourceEnd,
}

/// Spawn the worker on the current runtime and return its command sender.
pub fn spawn_resource_worker(
    output: Arc<dyn AudioOutput>,
    outcomes: mpsc::UnboundedSender<PlayOutcome>,
) -> mpsc::UnboundedSender<ResourceCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_resource_worker(output, rx, outcomes));
    tx
}

/// Drain `commands` until the channel closes.
pub async fn run_resource_worker(
    output: Arc<dyn AudioOutput>,
    mut commands: mpsc::UnboundedReceiver<ResourceCommand>,
    outcomes: mpsc::UnboundedSender<PlayOutcome>,
) {
    info!("audio worker: started");
    // last set_source/load error; the next Play retries the load once
    let mut source_error: Option<AudioError> = None;

    while let Some(cmd) = commands.recv().await {
        debug!("audio worker: {:?}", cmd);
        match cmd {
            ResourceCommand::SetSource { url, source } => {
                source_error = output.set_source(&url, source).await.err();
                if let Some(e) = &source_error {
                    warn!("audio worker: set_source failed: {}", e);
                }
            }
            ResourceCommand::Load => {
                if source_error.is_none() {
                    source_error = output.load().await.err();
                    if let Some(e) = &source_error {
                        warn!("audio worker: load failed: {}", e);
                    }
                }
            }
            ResourceCommand::Play(ticket) => {
                if source_error.is_some() {
                    source_error = output.load().await.err();
                }
                let result = match source_error.clone() {
                    Some(e) => Err(e),
                    None => output.play().await,
                };
                if let Err(e) = &result {
                    warn!("audio worker: play gen={} failed: {}", ticket.generation, e);
                }
                if outcomes.send(PlayOutcome { ticket, result }).is_err() {
                    debug!("audio worker: outcome receiver gone");
                }
            }
            ResourceCommand::Pause => {
                if let Err(e) = output.pause().await {
                    warn!("audio worker: pause failed: {}", e);
                }
            }
            ResourceCommand::Stop => {
                source_error = None;
                if let Err(e) = output.stop().await {
                    warn!("audio worker: stop failed: {}", e);
                }
            }
        }
    }
    info!("audio worker: command channel closed, exiting");
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records every call; `play`/`load` results can be scripted.
    #[derive(Default)]
    pub struct FakeOutput {
        pub calls: Mutex<Vec<String>>,
        pub play_results: Mutex<VecDeque<Result<(), AudioError>>>,
        pub load_results: Mutex<VecDeque<Result<(), AudioError>>>,
    }

    impl FakeOutput {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn fail_next_play(&self, msg: &str) {
            self.play_results
                .lock()
                .unwrap()
                .push_back(Err(AudioError::Command(msg.to_string())));
        }

        pub fn fail_next_load(&self, msg: &str) {
            self.load_results
                .lock()
                .unwrap()
                .push_back(Err(AudioError::Unavailable(msg.to_string())));
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl AudioOutput for FakeOutput {
        async fn set_source(&self, url: &str, _source: SourceId) -> Result<(), AudioError> {
            self.record(format!("set_source {}", url));
            Ok(())
        }

        async fn load(&self) -> Result<(), AudioError> {
            self.record("load");
            self.load_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        async fn play(&self) -> Result<(), AudioError> {
            self.record("play");
            self.play_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        async fn pause(&self) -> Result<(), AudioError> {
            self.record("pause");
            Ok(())
        }

        async fn stop(&self) -> Result<(), AudioError> {
            self.record("stop");
            Ok(())
        }
    }
}
