//! NowPlaying component — right pane describing the current track.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use tune_core::model::PlaybackSnapshot;

use crate::{
    app_state::AppState,
    component::Component,
    core::MSG_SELECT_SONG,
    theme::{readable_accent, C_ACCENT, C_MUTED, C_PRIMARY, C_SECONDARY, C_TOP_TRACK},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        status_bar::{status_color, status_icon},
    },
};

pub struct NowPlaying;

impl NowPlaying {
    pub fn new() -> Self {
        Self
    }
}

fn field<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("  {:<8}", label), Style::default().fg(C_MUTED)),
        Span::styled(value, Style::default().fg(C_SECONDARY)),
    ])
}

/// Body lines for the pane.  Public for tests.
pub fn build_lines(playback: &PlaybackSnapshot) -> Vec<Line<'static>> {
    let Some(track) = &playback.current_track else {
        return vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("  {}", MSG_SELECT_SONG),
                Style::default().fg(C_MUTED),
            )),
        ];
    };

    let title_color = track.accent.as_deref().map_or(C_ACCENT, readable_accent);
    let status = playback.status();

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(
                format!("  {} ", status_icon(status)),
                Style::default().fg(status_color(status)),
            ),
            Span::styled(
                track.title.clone(),
                Style::default().fg(title_color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            format!("     {}", track.artist),
            Style::default().fg(C_PRIMARY),
        )),
        Line::from(""),
    ];
    if !track.duration.is_empty() {
        lines.push(field("length", track.duration.clone()));
    }
    if track.top_track {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<8}", "chart"), Style::default().fg(C_MUTED)),
            Span::styled("★ top track", Style::default().fg(C_TOP_TRACK)),
        ]));
    }
    lines.push(field("cover", track.cover_url.clone()));
    lines.push(Line::from(""));
    let hint = if playback.is_playing {
        "  space pause · n next · p prev"
    } else {
        "  space play · n next · p prev"
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(C_MUTED))));
    lines
}

impl Component for NowPlaying {
    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let status = state.playback.status();
        let block = pane_chrome(
            "Now Playing",
            focused,
            Some(Badge {
                text: status.label(),
                color: status_color(status),
            }),
        );
        frame.render_widget(
            Paragraph::new(build_lines(&state.playback))
                .block(block)
                .wrap(Wrap { trim: false }),
            area,
        );
    }
}
