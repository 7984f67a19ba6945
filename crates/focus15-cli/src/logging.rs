use std::env;
use std::fs::OpenOptions;
use std::sync::Mutex;

use focus15_core::storage::data_dir;
use tracing_subscriber::EnvFilter;

/// Log to `focus15.log` in the data directory so the terminal UI stays clean.
///
/// `FOCUS15_DEBUG_LOG=1` forces debug output; otherwise `FOCUS15_LOG`, then
/// `RUST_LOG`, then `info`.
pub fn init_logging() {
    let debug_enabled = env::var("FOCUS15_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("FOCUS15_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let Ok(dir) = data_dir() else {
        return;
    };
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("focus15.log"))
    else {
        return;
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}
