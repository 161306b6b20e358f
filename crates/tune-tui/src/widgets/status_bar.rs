//! Status bar — bottom line with playback state and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use tune_core::model::PlaybackStatus;

use crate::theme::{C_MUTED, C_PAUSED, C_PLAYING, C_SECONDARY};

const KEYS: &str =
    " ↑↓/jk select  Enter play  Space pause  n/p next/prev  Tab/1/2 view  r refresh  ? help  q quit";

pub fn status_color(status: PlaybackStatus) -> ratatui::style::Color {
    match status {
        PlaybackStatus::Idle => C_SECONDARY,
        PlaybackStatus::Paused => C_PAUSED,
        PlaybackStatus::Playing => C_PLAYING,
    }
}

pub fn status_icon(status: PlaybackStatus) -> &'static str {
    match status {
        PlaybackStatus::Idle => "■",
        PlaybackStatus::Paused => "❚❚",
        PlaybackStatus::Playing => "▶",
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, status: PlaybackStatus) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} {} ", status_icon(status), status.label().to_uppercase()),
            Style::default()
                .fg(status_color(status))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(KEYS, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
