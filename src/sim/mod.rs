//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod autopilot;
pub mod cube;
pub mod events;
pub mod level;
pub mod paywall;
pub mod platform;
pub mod player;
pub mod rules;
pub mod state;
pub mod tick;

pub use cube::{Cube, CubeKind};
pub use events::{GameEvent, RemovalCause};
pub use level::{Level, LevelUpdate, PendingChain, StageConfig, WaveMix, cube_distribution};
pub use paywall::{PaywallChoice, PaywallGate};
pub use platform::{Platform, Tile};
pub use player::{Direction, Player};
pub use rules::{CrushPolicy, Rules};
pub use state::{GamePhase, GameState, RngState};
pub use tick::{TickInput, tick};
