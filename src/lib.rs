//! Quantum Grid: Neon Legacy - capture falling cubes on a shrinking grid
//!
//! Core modules:
//! - `sim`: Deterministic simulation (platform, cubes, waves, game state)
//! - `platform`: Browser/native platform abstraction (input, storage)
//! - `persistence`: Versioned save/load of in-progress runs
//! - `settings`: Player preferences and rule tuning
//! - `highscores`: Top-10 leaderboard

pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;

pub use highscores::HighScores;
pub use persistence::PersistenceError;
pub use settings::Settings;

use glam::{IVec2, Vec2};

/// Game configuration constants
pub mod consts {
    /// Simulation rate
    pub const SIM_HZ: u32 = 120;
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / SIM_HZ as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default stage dimensions (tiles)
    pub const STAGE_WIDTH: i32 = 5;
    pub const STAGE_LENGTH: i32 = 16;

    /// Base cube speed; cubes travel `speed * multiplier` tiles/sec
    pub const CUBE_SPEED: f32 = 2.0;
    pub const CUBE_SPEED_MULTIPLIER: f32 = 1.0;
    pub const INITIAL_CUBE_COUNT: u32 = 12;

    /// Cubes spawn this many tiles past the far edge, in this many rows
    pub const SPAWN_OFFSET: i32 = 2;
    pub const SPAWN_ROWS: i32 = 3;
    /// A cube whose z drops below this has left the platform
    pub const FALL_OFF_Z: f32 = -2.0;
    /// Half-extent of the cube/player overlap box
    pub const CRUSH_EXTENT: f32 = 0.8;

    /// Player start tile
    pub const PLAYER_START_X: i32 = 0;
    pub const PLAYER_START_Z: i32 = 1;

    /// Scoring
    pub const NORMAL_POINTS: u64 = 100;
    pub const ADVANTAGE_POINTS: u64 = 50;
    pub const LEVEL_BONUS_PER_LEVEL: u64 = 500;

    /// Rows removed when a forbidden cube is captured or reaches the player
    pub const FORBIDDEN_SHRINK_ROWS: u32 = 3;
    /// Advantage area half-size (1 = 3x3)
    pub const ADVANTAGE_RADIUS: i32 = 1;

    /// Waves per level: BASE_WAVES + min(level, MAX_EXTRA_WAVES)
    pub const BASE_WAVES: u32 = 2;
    pub const MAX_EXTRA_WAVES: u32 = 8;
}

/// Convert milliseconds to whole simulation ticks (rounded up, at least 1)
#[inline]
pub fn ms_to_ticks(ms: u32) -> u32 {
    let ticks = (u64::from(ms) * u64::from(consts::SIM_HZ)).div_ceil(1000);
    u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
}

/// Snap a continuous platform position to its grid tile
#[inline]
pub fn round_to_tile(pos: Vec2) -> IVec2 {
    IVec2::new(pos.x.round() as i32, pos.y.round() as i32)
}
