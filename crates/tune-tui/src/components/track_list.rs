//! TrackList component — the left pane: songs of the active view.

use std::sync::Arc;

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use tune_core::model::{Catalog, Track};

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    theme::{style_default, style_muted, style_secondary, style_selected, C_SECONDARY, C_TOP_TRACK},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
        status_bar::{status_color, status_icon},
    },
};

const PAGE: usize = 10;

/// Truncate `s` to at most `width` display columns, ending in `…` when cut.
pub fn fit(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

pub struct TrackList {
    pub list: ScrollableList<Track>,
    /// Catalog the list was last synced from.
    synced: Option<Arc<Catalog>>,
    /// Rows available inside the border at the last draw.
    height: usize,
}

impl TrackList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(),
            synced: None,
            height: 0,
        }
    }

    /// Pick up a new catalog.  A view switch resets the cursor; a refresh of
    /// the same view keeps it on the same track if it survived.
    pub fn sync(&mut self, state: &AppState) {
        if let Some(prev) = &self.synced {
            if Arc::ptr_eq(prev, &state.catalog) {
                return;
            }
        }
        let same_view = self
            .synced
            .as_ref()
            .map_or(false, |prev| prev.filter() == state.catalog.filter());
        let keep_id = self.list.selected_item().map(|t| t.id.clone());

        self.list.set_items(state.tracks().to_vec());
        match keep_id.and_then(|id| state.catalog.position(&id)) {
            Some(idx) if same_view => self.list.select_index(idx),
            _ if same_view => {}
            _ => self.list.select_first(),
        }
        self.synced = Some(Arc::clone(&state.catalog));
    }

    fn jump_to_current(&mut self, state: &AppState) {
        if let Some(idx) = state
            .playback
            .current_id()
            .and_then(|id| state.catalog.position(id))
        {
            self.list.select_index(idx);
        }
    }

    fn selected_play(&self) -> Vec<Action> {
        match self.list.selected_item() {
            Some(t) => vec![Action::PlayTrack(t.id.clone())],
            None => vec![],
        }
    }

    fn row<'a>(&self, track: &'a Track, width: usize, selected: bool, state: &AppState) -> ListItem<'a> {
        let marker = if state.is_current(track) {
            let status = state.playback.status();
            Span::styled(
                format!("{:<2} ", status_icon(status)),
                Style::default().fg(status_color(status)),
            )
        } else {
            Span::raw("   ")
        };
        let star = if track.top_track {
            Span::styled("★ ", Style::default().fg(C_TOP_TRACK))
        } else {
            Span::raw("  ")
        };

        // marker(3) + star(2) + gap(1) + duration
        let dur = track.duration.as_str();
        let text_w = width.saturating_sub(6 + dur.width() + 1);
        let artist_w = (text_w / 3).min(24);
        let title_w = text_w.saturating_sub(artist_w + 2);

        let title = fit(&track.title, title_w);
        let artist = fit(&track.artist, artist_w);
        let pad = text_w.saturating_sub(title.width() + 2 + artist.width());

        let title_style = if state.is_current(track) {
            style_default().add_modifier(Modifier::BOLD)
        } else {
            style_default()
        };
        let line = Line::from(vec![
            marker,
            star,
            Span::raw(" "),
            Span::styled(title, title_style),
            Span::raw("  "),
            Span::styled(artist, style_secondary()),
            Span::raw(" ".repeat(pad + 1)),
            Span::styled(dur, style_muted()),
        ]);
        let item = ListItem::new(line);
        if selected {
            item.style(style_selected())
        } else {
            item
        }
    }
}

impl Default for TrackList {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for TrackList {
    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => vec![Action::SelectUp(1)],
            KeyCode::Down | KeyCode::Char('j') => vec![Action::SelectDown(1)],
            KeyCode::PageUp => vec![Action::SelectUp(PAGE)],
            KeyCode::PageDown => vec![Action::SelectDown(PAGE)],
            KeyCode::Home | KeyCode::Char('g') => vec![Action::SelectFirst],
            KeyCode::End | KeyCode::Char('G') => vec![Action::SelectLast],
            KeyCode::Char('J') => vec![Action::JumpToCurrent],
            KeyCode::Enter => self.selected_play(),
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => vec![Action::SelectUp(1)],
            MouseEventKind::ScrollDown => vec![Action::SelectDown(1)],
            MouseEventKind::Down(MouseButton::Left) => {
                // first row sits below the top border
                let Some(row) = event.row.checked_sub(area.y + 1) else {
                    return vec![];
                };
                if self.list.handle_click(row as usize) {
                    self.selected_play()
                } else {
                    vec![]
                }
            }
            _ => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        match action {
            Action::SelectUp(n) => self.list.select_up(*n),
            Action::SelectDown(n) => self.list.select_down(*n),
            Action::SelectFirst => self.list.select_first(),
            Action::SelectLast => self.list.select_last(),
            Action::JumpToCurrent => self.jump_to_current(state),
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        self.sync(state);

        let count = format!("{}", self.list.len());
        let block = pane_chrome(
            state.filter.label(),
            focused,
            Some(Badge {
                text: &count,
                color: C_SECONDARY,
            }),
        );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if let Some(msg) = state.empty_message() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(format!(" {}", msg), style_secondary()))),
                inner,
            );
            return;
        }

        self.height = inner.height as usize;
        self.list.ensure_visible(self.height);
        let width = inner.width as usize;
        let items: Vec<ListItem> = self
            .list
            .visible_items(self.height)
            .into_iter()
            .map(|(i, t)| self.row(t, width, i == self.list.selected, state))
            .collect();
        frame.render_widget(List::new(items), inner);
    }
}
