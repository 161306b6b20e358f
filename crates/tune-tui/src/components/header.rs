//! Header component — one row: app name, view tabs, catalog badge.
//!
//! Not focusable.  Clicking a tab switches the view.

use ratatui::crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use tune_core::model::{CatalogStatus, ViewFilter};

use crate::{
    action::Action,
    app_state::AppState,
    component::Component,
    theme::{C_ACCENT, C_BADGE_ERR, C_BADGE_PENDING, C_MUTED, C_NUMBER_HINT, C_PRIMARY, C_SECONDARY},
};

const BRAND: &str = " ♪ tune ";
const TAB_GAP: &str = "  ";

fn tab_label(idx: usize, filter: ViewFilter) -> String {
    format!("[{}] {}", idx + 1, filter.label())
}

/// Which tab, if any, covers terminal column `col` of a header drawn at `x`.
pub fn tab_at(col: u16, x: u16) -> Option<ViewFilter> {
    let mut start = x as usize + BRAND.width() + TAB_GAP.width();
    for (idx, filter) in ViewFilter::ALL.iter().enumerate() {
        let end = start + tab_label(idx, *filter).width();
        if (start..end).contains(&(col as usize)) {
            return Some(*filter);
        }
        start = end + TAB_GAP.width();
    }
    None
}

fn badge(state: &AppState) -> (String, ratatui::style::Color) {
    match &state.status {
        CatalogStatus::Loading => ("loading".to_string(), C_BADGE_PENDING),
        CatalogStatus::Failed(_) => ("ERR".to_string(), C_BADGE_ERR),
        CatalogStatus::Ready => {
            let n = state.catalog.len();
            let unit = if n == 1 { "song" } else { "songs" };
            (format!("{} {}", n, unit), C_SECONDARY)
        }
    }
}

pub struct Header;

impl Header {
    pub fn new() -> Self {
        Self
    }
}

impl Component for Header {
    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        if event.kind != MouseEventKind::Down(MouseButton::Left) || event.row != area.y {
            return vec![];
        }
        match tab_at(event.column, area.x) {
            Some(filter) => vec![Action::SetView(filter)],
            None => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        let mut spans = vec![
            Span::styled(
                BRAND,
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::raw(TAB_GAP),
        ];
        for (idx, filter) in ViewFilter::ALL.iter().enumerate() {
            let style = if *filter == state.filter {
                Style::default()
                    .fg(C_PRIMARY)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(C_MUTED)
            };
            spans.push(Span::styled(tab_label(idx, *filter), style));
            spans.push(Span::raw(TAB_GAP));
        }

        let (badge_text, badge_color) = badge(state);
        let used: usize = spans.iter().map(|s| s.content.width()).sum();
        let badge_text = format!(" {} ", badge_text);
        let pad = (area.width as usize).saturating_sub(used + badge_text.width());
        spans.push(Span::styled(" ".repeat(pad), Style::default().fg(C_NUMBER_HINT)));
        spans.push(Span::styled(
            badge_text,
            Style::default().fg(badge_color).add_modifier(Modifier::BOLD),
        ));

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
