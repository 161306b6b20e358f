//! App — component-based terminal front end.
//!
//! Architecture:
//! - `App` owns every component plus `AppState` (read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` in from background tasks:
//!   terminal input and the core's broadcasts.
//! - The loop draws a frame, then awaits the next message or timer tick.
//! - Components return `Vec<Action>`; `dispatch` offers each action to every
//!   component, then `apply_action` turns it into a `UserCommand` for the core.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::Block,
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use tune_core::model::{CatalogStatus, ViewFilter};

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    components::{
        header::Header, help_overlay::HelpOverlay, now_playing::NowPlaying, track_list::TrackList,
    },
    core::{CoreEvent, CoreMessage, NoticeLevel, UserCommand},
    theme::C_BG,
    widgets::{status_bar, toast::ToastManager},
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    Core(CoreMessage),
}

// ── Pane area tracking ────────────────────────────────────────────────────────

/// Last-drawn rects, for mouse hit-testing without recomputing the layout.
#[derive(Default, Clone, Copy)]
struct PaneAreas {
    header: Rect,
    track_list: Rect,
    now_playing: Rect,
}

fn hit(r: Rect, col: u16, row: u16) -> bool {
    r.width > 0
        && r.height > 0
        && col >= r.x
        && col < r.x + r.width
        && row >= r.y
        && row < r.y + r.height
}

/// Map an action to the command the core should run, if any.
fn command_for(action: &Action, current: ViewFilter) -> Option<UserCommand> {
    match action {
        Action::PlayTrack(id) => Some(UserCommand::Select(id.clone())),
        Action::TogglePause => Some(UserCommand::TogglePlayPause),
        Action::Next => Some(UserCommand::Next),
        Action::Prev => Some(UserCommand::Previous),
        Action::SetView(filter) => Some(UserCommand::SetFilter(*filter)),
        Action::ToggleView => Some(UserCommand::SetFilter(current.toggle())),
        Action::Refresh => Some(UserCommand::Refresh),
        _ => None,
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    pub state: AppState,

    header: Header,
    track_list: TrackList,
    now_playing: NowPlaying,
    help_overlay: HelpOverlay,

    toast: ToastManager,
    show_keys_bar: bool,

    cmd_tx: mpsc::Sender<CoreEvent>,
    should_quit: bool,
    pane_areas: PaneAreas,
}

impl App {
    pub fn new(cmd_tx: mpsc::Sender<CoreEvent>) -> Self {
        Self {
            state: AppState::default(),
            header: Header::new(),
            track_list: TrackList::new(),
            now_playing: NowPlaying::new(),
            help_overlay: HelpOverlay::new(),
            toast: ToastManager::new(),
            show_keys_bar: true,
            cmd_tx,
            should_quit: false,
            pane_areas: PaneAreas::default(),
        }
    }

    pub async fn run(mut self, mut broadcast_rx: broadcast::Receiver<CoreMessage>) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (PlayerCore → AppMessage) ─────
        let bc_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(msg) => {
                        if bc_tx.send(AppMessage::Core(msg)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // the next StateUpdated carries everything we missed
                        warn!("broadcast receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // Toast expiry + spinner animation.
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        self.sync_spinner();

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg).await;
                    // drain whatever else is queued before the next frame
                    while let Ok(next) = rx.try_recv() {
                        needs_redraw |= self.handle_message(next).await;
                    }
                }

                _ = toast_tick.tick() => {
                    if !self.toast.is_empty() {
                        self.toast.tick();
                        needs_redraw = true;
                    }
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        let _ = self.cmd_tx.send(CoreEvent::Shutdown).await;
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        Ok(())
    }

    /// Returns whether a redraw is needed.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                for action in self.handle_key(key) {
                    self.dispatch(action).await;
                }
                true
            }
            AppMessage::Event(Event::Mouse(mouse)) => {
                let actions = self.handle_mouse(mouse);
                let redraw = !actions.is_empty();
                for action in actions {
                    self.dispatch(action).await;
                }
                redraw
            }
            AppMessage::Event(Event::Resize(..)) => true,
            AppMessage::Event(_) => false,
            AppMessage::Core(CoreMessage::StateUpdated(snapshot)) => {
                self.state.apply(snapshot);
                self.sync_spinner();
                true
            }
            AppMessage::Core(CoreMessage::Notice(level, text)) => {
                match level {
                    NoticeLevel::Info => self.toast.info(text),
                    NoticeLevel::Error => self.toast.error(text),
                }
                true
            }
        }
    }

    fn sync_spinner(&mut self) {
        if self.state.status == CatalogStatus::Loading {
            self.toast.spinner(format!("loading {}…", self.state.filter.label()));
        } else {
            self.toast.dismiss_spinner();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            return vec![Action::Quit];
        }

        // Help overlay captures all keys when visible
        if self.help_overlay.visible {
            return self.help_overlay.handle_key(key, &self.state);
        }

        match key.code {
            KeyCode::Char('q') => vec![Action::Quit],
            KeyCode::Char('?') => vec![Action::ToggleHelp],
            KeyCode::Char(' ') => vec![Action::TogglePause],
            KeyCode::Char('n') => vec![Action::Next],
            KeyCode::Char('p') => vec![Action::Prev],
            KeyCode::Tab | KeyCode::BackTab => vec![Action::ToggleView],
            KeyCode::Char('1') => vec![Action::SetView(ViewFilter::ForYou)],
            KeyCode::Char('2') => vec![Action::SetView(ViewFilter::TopTracks)],
            KeyCode::Char('r') => vec![Action::Refresh],
            KeyCode::Char('K') => vec![Action::ToggleKeys],
            _ => self.track_list.handle_key(key, &self.state),
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Vec<Action> {
        let relevant = matches!(
            event.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        );
        if !relevant || self.help_overlay.visible {
            return vec![];
        }
        let (col, row) = (event.column, event.row);
        let areas = self.pane_areas;
        if hit(areas.header, col, row) {
            return self.header.handle_mouse(event, areas.header, &self.state);
        }
        if hit(areas.track_list, col, row) {
            return self.track_list.handle_mouse(event, areas.track_list, &self.state);
        }
        if hit(areas.now_playing, col, row) {
            return self.now_playing.handle_mouse(event, areas.now_playing, &self.state);
        }
        vec![]
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.header.on_action(&action, s));
            out.extend(self.track_list.on_action(&action, s));
            out.extend(self.now_playing.on_action(&action, s));
            out.extend(self.help_overlay.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        // depth-limited to one level
        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        debug!("apply_action: {:?}", action);
        if let Some(cmd) = command_for(&action, self.state.filter) {
            self.send_cmd(cmd).await;
            return;
        }
        match action {
            Action::Quit => {
                info!("quit requested");
                self.should_quit = true;
            }
            Action::ToggleKeys => self.show_keys_bar = !self.show_keys_bar,
            // handled by the components themselves
            _ => {}
        }
    }

    async fn send_cmd(&self, cmd: UserCommand) {
        if self.cmd_tx.send(CoreEvent::Command(cmd)).await.is_err() {
            warn!("PlayerCore is gone; command dropped");
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        // ── Outer layout: header | body | (keys bar) ──────────────────────────
        let status_h = if self.show_keys_bar { 1u16 } else { 0 };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(status_h),
            ])
            .split(area);

        self.header.draw(frame, outer[0], false, &self.state);
        self.pane_areas.header = outer[0];

        // ── Body: track list | now playing ────────────────────────────────────
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(outer[1]);
        self.track_list.draw(frame, body[0], true, &self.state);
        self.now_playing.draw(frame, body[1], false, &self.state);
        self.pane_areas.track_list = body[0];
        self.pane_areas.now_playing = body[1];

        if self.show_keys_bar {
            status_bar::draw_keys_bar(frame, outer[2], self.state.playback.status());
        }

        self.help_overlay.draw(frame, area, false, &self.state);
        self.toast.draw(frame, area);
    }
}
