/// mpv IPC backend for the audio playback resource.
///
/// ```text
///   MpvOutput (AudioOutput)
///         │ ensure_handle() spawns `mpv --idle` on first use / after a crash
///         ▼
///   MpvHandle ──► writer_task ──► socket
///                 reader_task ◄── socket
///                    ├── reply (request_id) → pending oneshot
///                    └── end-file event     → SourceEnded channel
/// ```
///
/// Only the audio worker calls into `MpvOutput`, so commands reach mpv in
/// the order the playback controller issued them.
///
/// mpv writes events and replies on one stream in the order they happen, so
/// the reader stamps every event with the source whose `loadfile` reply it
/// has seen last.  An `eof` of the old file that lands before the new
/// `loadfile` reply keeps the old source id.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use tune_core::audio::{AudioOutput, ResourceEnd, SourceEnded, SourceId};
use tune_core::error::AudioError;
use tune_core::platform;

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

const IPC_TIMEOUT: tokio::time::Duration = tokio::time::Duration::from_secs(5);

type Pending = Arc<Mutex<HashMap<u64, Waiter>>>;

struct Waiter {
    reply: oneshot::Sender<anyhow::Result<Value>>,
    /// Set on `loadfile`; a success reply makes this the loaded source.
    source: Option<SourceId>,
}

struct PendingRequest {
    req_id: u64,
    payload: String, // one JSON line, '\n' included
    waiter: Waiter,
}

/// An unsolicited mpv message and the source loaded when it arrived.
#[derive(Debug)]
pub struct MpvEvent {
    pub body: Value,
    pub source: Option<SourceId>,
}

/// Map an unsolicited mpv message to a resource end, if it is one we report.
///
/// `end-file` with reason `stop`/`quit`/`redirect` follows our own
/// `loadfile replace` or `stop` and is not forwarded.
pub fn end_reason(event: &Value) -> Option<ResourceEnd> {
    if event.get("event")?.as_str()? != "end-file" {
        return None;
    }
    match event.get("reason").and_then(Value::as_str).unwrap_or("unknown") {
        "eof" => Some(ResourceEnd::Finished),
        "error" => {
            let msg = event
                .get("file_error")
                .and_then(Value::as_str)
                .unwrap_or("playback error");
            Some(ResourceEnd::Failed(msg.to_string()))
        }
        _ => None,
    }
}

// ── handle ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        self.send_for(command, None).await
    }

    async fn send_for(&self, command: Value, source: Option<SourceId>) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let mut payload = serde_json::to_string(&json!({ "command": command, "request_id": req_id }))?;
        payload.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload,
                waiter: Waiter {
                    reply: reply_tx,
                    source,
                },
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(IPC_TIMEOUT, reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    /// Replace whatever is loaded with `url`, paused at the start.  Events
    /// after the reply are stamped with `source`.
    pub async fn load_paused(&self, url: &str, source: SourceId) -> anyhow::Result<()> {
        self.set_pause(true).await?;
        self.send_for(json!(["loadfile", url, "replace"]), Some(source))
            .await?;
        Ok(())
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(json!(["stop"])).await?;
        Ok(())
    }
}

// ── driver ────────────────────────────────────────────────────────────────────

/// Owns the mpv child process.
pub struct MpvDriver {
    socket_name: String,
    binary: Option<PathBuf>,
    process: Option<tokio::process::Child>,
}

impl MpvDriver {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self {
            socket_name: platform::mpv_socket_name(),
            binary,
            process: None,
        }
    }

    pub fn process_alive(&mut self) -> bool {
        let Some(child) = self.process.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                warn!("mpv: process exited: {}", status);
                false
            }
            Err(e) => {
                warn!("mpv: liveness check failed: {}", e);
                false
            }
        }
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }

    fn command(&self) -> anyhow::Result<tokio::process::Command> {
        let binary = platform::find_mpv_binary(self.binary.as_deref())
            .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;
        let mut cmd = tokio::process::Command::new(binary);
        cmd.arg("--no-video")
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg(platform::mpv_socket_arg())
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .kill_on_drop(true);
        Ok(cmd)
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(
        &mut self,
        events: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;

        let socket_path = PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        let stderr_path = platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;

        let child = self.command()?.stderr(stderr_file).spawn()?;
        info!("mpv: spawned pid {:?}, stderr → {:?}", child.id(), stderr_path);
        self.process = Some(child);

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to {}", self.socket_name);
        let (read_half, write_half) = stream.into_split();
        Ok(start_io_tasks(BufReader::new(read_half), write_half, events))
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(
        &mut self,
        events: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;

        let child = self
            .command()?
            .stderr(std::process::Stdio::null())
            .spawn()?;
        self.process = Some(child);

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to {}", pipe_path);
                let (read_half, write_half) = tokio::io::split(client);
                return Ok(start_io_tasks(BufReader::new(read_half), write_half, events));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }
}

fn start_io_tasks<R, W>(reader: BufReader<R>, writer: W, events: mpsc::Sender<MpvEvent>) -> MpvHandle
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
    let (tx, rx) = mpsc::channel::<PendingRequest>(64);
    tokio::spawn(writer_task(writer, rx, pending.clone()));
    tokio::spawn(reader_task(reader, pending, events));
    MpvHandle { tx }
}

async fn fail_all(pending: &Pending, why: &str) {
    let mut map = pending.lock().await;
    for (_, waiter) in map.drain() {
        let _ = waiter.reply.send(Err(anyhow::anyhow!("{}", why)));
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: Pending, events: mpsc::Sender<MpvEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    let mut loaded: Option<SourceId> = None;
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_all(&pending, "mpv IPC connection closed").await;
                break;
            }
            Err(e) => {
                warn!("mpv reader: {}", e);
                fail_all(&pending, "mpv IPC read error").await;
                break;
            }
            Ok(_) => {}
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let val: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                continue;
            }
        };

        match val.get("request_id").and_then(Value::as_u64) {
            Some(req_id) => {
                let Some(waiter) = pending.lock().await.remove(&req_id) else {
                    debug!("mpv reader: reply for unknown req={}", req_id);
                    continue;
                };
                let result = match val["error"].as_str() {
                    Some("success") => {
                        if waiter.source.is_some() {
                            loaded = waiter.source;
                        }
                        Ok(val)
                    }
                    other => Err(anyhow::anyhow!("mpv error: {}", other.unwrap_or("unknown"))),
                };
                let _ = waiter.reply.send(result);
            }
            None => {
                let event = MpvEvent {
                    body: val,
                    source: loaded,
                };
                if events.send(event).await.is_err() {
                    debug!("mpv reader: event receiver gone");
                }
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: Pending)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // register before writing so the reader can always match the reply
        pending.lock().await.insert(req.req_id, req.waiter);
        debug!("mpv writer: req={} {}", req.req_id, req.payload.trim());
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: {}", e);
            if let Some(waiter) = pending.lock().await.remove(&req.req_id) {
                let _ = waiter.reply.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: exiting");
}

// ── AudioOutput ───────────────────────────────────────────────────────────────

struct MpvState {
    driver: MpvDriver,
    handle: Option<MpvHandle>,
    source: Option<(String, SourceId)>,
    /// Whether `source` is what the current mpv process has loaded.
    loaded: bool,
}

/// [`AudioOutput`] backed by a lazily spawned mpv process.
pub struct MpvOutput {
    state: Mutex<MpvState>,
    ends: mpsc::UnboundedSender<SourceEnded>,
}

impl MpvOutput {
    pub fn new(binary: Option<PathBuf>, ends: mpsc::UnboundedSender<SourceEnded>) -> Self {
        Self {
            state: Mutex::new(MpvState {
                driver: MpvDriver::new(binary),
                handle: None,
                source: None,
                loaded: false,
            }),
            ends,
        }
    }

    async fn ensure_handle(&self, state: &mut MpvState) -> Result<MpvHandle, AudioError> {
        if state.handle.is_some() && !state.driver.process_alive() {
            warn!("mpv: process died, respawning");
            state.handle = None;
        }
        if let Some(h) = &state.handle {
            return Ok(h.clone());
        }

        let (event_tx, mut event_rx) = mpsc::channel::<MpvEvent>(64);
        let ends = self.ends.clone();
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let Some(reason) = end_reason(&event.body) else {
                    continue;
                };
                let Some(source) = event.source else {
                    debug!("mpv: end-file {:?} before any load, dropped", reason);
                    continue;
                };
                info!("mpv: end-file {:?} for source {}", reason, source.0);
                if ends.send(SourceEnded { source, reason }).is_err() {
                    break;
                }
            }
        });

        let handle = state
            .driver
            .spawn_and_connect(event_tx)
            .await
            .map_err(|e| AudioError::Unavailable(e.to_string()))?;
        state.handle = Some(handle.clone());
        state.loaded = false;
        Ok(handle)
    }

    async fn load_current(&self, state: &mut MpvState) -> Result<MpvHandle, AudioError> {
        let handle = self.ensure_handle(state).await?;
        let (url, source) = state
            .source
            .clone()
            .ok_or_else(|| AudioError::Unavailable("no source set".to_string()))?;
        handle
            .load_paused(&url, source)
            .await
            .map_err(command_error)?;
        state.loaded = true;
        Ok(handle)
    }

    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.handle = None;
        state.driver.kill().await;
        let _ = tokio::fs::remove_file(&state.driver.socket_name).await;
    }
}

fn command_error(e: anyhow::Error) -> AudioError {
    AudioError::Command(e.to_string())
}

#[async_trait]
impl AudioOutput for MpvOutput {
    async fn set_source(&self, url: &str, source: SourceId) -> Result<(), AudioError> {
        let mut state = self.state.lock().await;
        state.source = Some((url.to_string(), source));
        state.loaded = false;
        Ok(())
    }

    async fn load(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock().await;
        self.load_current(&mut state).await.map(|_| ())
    }

    async fn play(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock().await;
        let handle = self.ensure_handle(&mut state).await?;
        // a respawned process has nothing loaded
        let handle = if state.loaded {
            handle
        } else {
            self.load_current(&mut state).await?
        };
        handle.set_pause(false).await.map_err(command_error)
    }

    async fn pause(&self) -> Result<(), AudioError> {
        let state = self.state.lock().await;
        match &state.handle {
            Some(h) => h.set_pause(true).await.map_err(command_error),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<(), AudioError> {
        let mut state = self.state.lock().await;
        state.source = None;
        state.loaded = false;
        match &state.handle {
            Some(h) => h.stop().await.map_err(command_error),
            None => Ok(()),
        }
    }
}
