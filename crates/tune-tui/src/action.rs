//! Action enum — all user-initiated intents and internal events.

use tune_core::model::ViewFilter;

/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    PlayTrack(String), // track id
    TogglePause,
    Next,
    Prev,

    // ── View ─────────────────────────────────────────────────────────────────
    SetView(ViewFilter),
    ToggleView,
    Refresh,

    // ── Navigation ───────────────────────────────────────────────────────────
    SelectUp(usize),
    SelectDown(usize),
    SelectFirst,
    SelectLast,
    JumpToCurrent,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleHelp,
    ToggleKeys,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
