pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod navigation;
pub mod platform;
pub mod playback;
pub mod view;
