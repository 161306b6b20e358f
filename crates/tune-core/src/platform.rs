//! Per-OS paths: data/config directories, the mpv IPC endpoint, the mpv binary.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "tune";

/// IPC endpoint name, unique per process so two players never share an mpv.
#[cfg(unix)]
pub fn mpv_socket_name() -> String {
    std::env::temp_dir()
        .join(format!("tune-mpv-{}.sock", std::process::id()))
        .display()
        .to_string()
}

#[cfg(windows)]
pub fn mpv_socket_name() -> String {
    format!("tune-mpv-{}", std::process::id())
}

pub fn mpv_socket_arg() -> String {
    #[cfg(unix)]
    let endpoint = mpv_socket_name();
    #[cfg(windows)]
    let endpoint = format!("\\\\.\\pipe\\{}", mpv_socket_name());
    format!("--input-ipc-server={}", endpoint)
}

/// `~/<xdg...>/tune` on unix (macOS included), `<fallback>/tune` elsewhere.
fn app_dir(xdg: &[&str], fallback: Option<PathBuf>) -> PathBuf {
    let base = if cfg!(unix) {
        let mut home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
        home.extend(xdg);
        home
    } else {
        fallback.unwrap_or_else(|| PathBuf::from("."))
    };
    base.join(APP_DIR)
}

/// Log files and mpv stderr live here.
pub fn data_dir() -> PathBuf {
    app_dir(&[".local", "share"], dirs::data_local_dir())
}

pub fn config_dir() -> PathBuf {
    app_dir(&[".config"], dirs::config_dir())
}

pub fn mpv_binary_name() -> &'static str {
    if cfg!(windows) {
        "mpv.exe"
    } else {
        "mpv"
    }
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|p| p.is_file())
}

/// Locate mpv: explicit config path, then beside our own executable, then PATH.
pub fn find_mpv_binary(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit.filter(|p| p.exists()) {
        return Some(p.to_path_buf());
    }

    let name = mpv_binary_name();
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(name)))
        .filter(|p| p.exists());

    beside_exe.or_else(|| find_on_path(name))
}
