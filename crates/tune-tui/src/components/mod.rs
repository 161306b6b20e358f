pub mod header;
pub mod help_overlay;
pub mod now_playing;
pub mod track_list;
