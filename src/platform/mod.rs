//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Input events (keyboard mapping)
//! - Storage (LocalStorage on web, JSON files on native)

pub mod input;
pub mod storage;

pub use input::{Command, key_to_command, route_key};
pub use storage::{KeyValueStore, MemoryStore, default_store};

/// Wall-clock time as a Unix timestamp in milliseconds
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Wall-clock time as a Unix timestamp in milliseconds
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}
