//! Wraparound next/previous over the active track list.
//!
//! A missing or unknown current id counts as index -1, so `next` lands on the
//! first track and `previous` on the last one.

use crate::error::EmptyCatalogError;
use crate::model::Track;

fn current_position(tracks: &[Track], current_id: Option<&str>) -> Option<usize> {
    let id = current_id?;
    tracks.iter().position(|t| t.id == id)
}

pub fn next_index(tracks: &[Track], current_id: Option<&str>) -> Result<usize, EmptyCatalogError> {
    let len = tracks.len();
    if len == 0 {
        return Err(EmptyCatalogError);
    }
    Ok(match current_position(tracks, current_id) {
        Some(i) => (i + 1) % len,
        None => 0,
    })
}

pub fn previous_index(
    tracks: &[Track],
    current_id: Option<&str>,
) -> Result<usize, EmptyCatalogError> {
    let len = tracks.len();
    if len == 0 {
        return Err(EmptyCatalogError);
    }
    Ok(match current_position(tracks, current_id) {
        Some(i) => (i + len - 1) % len,
        None => len - 1,
    })
}
