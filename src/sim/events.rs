//! Gameplay events emitted by the simulation
//!
//! The simulation pushes events onto `GameState::events`; front ends drain
//! them each frame to update the HUD, play effects and log.

use glam::IVec2;

use super::cube::CubeKind;

/// Why a cube left the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Captured from the marked tile
    Captured,
    /// Swept up by an activated advantage
    AreaClear,
    /// Caught in an advantage cube's chain reaction
    ChainReaction,
    /// Its row collapsed under it
    RowCollapse,
    /// Slid past the near edge
    Escaped,
    /// Ran into the player
    Crushed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    LevelStarted { level: u32 },
    WaveSpawned { wave: u32, cubes: u32 },
    CubeRemoved { id: u32, kind: CubeKind, tile: IVec2, cause: RemovalCause },
    CubeCaptured { kind: CubeKind, tile: IVec2, points: u64 },
    TileMarked { tile: IVec2 },
    MarkCleared,
    AdvantageStored { center: IVec2 },
    AdvantageActivated { center: IVec2, captured: u32 },
    ChainReaction { origin: IVec2, removed: u32 },
    PlatformShrunk { rows: u32, remaining_rows: u32 },
    PlatformExtended { length: i32 },
    PlayerCrushed { kind: CubeKind },
    LifeLost { remaining: u8 },
    LevelComplete { level: u32, bonus: u64 },
    PaywallShown { play_count: u32 },
    PaywallResolved { purchased: bool },
    Paused,
    Resumed,
    GameOver { score: u64, level: u32 },
    Restarted { seed: u64 },
}

impl GameEvent {
    /// Short status-line text for events worth telling the player about
    pub fn message(&self) -> Option<String> {
        let text = match self {
            GameEvent::LevelStarted { level } => format!("Level {level}"),
            GameEvent::CubeCaptured {
                kind: CubeKind::Forbidden,
                ..
            } => "Forbidden cube captured!".to_string(),
            GameEvent::AdvantageStored { .. } => "Advantage ready - press R".to_string(),
            GameEvent::AdvantageActivated { captured, .. } => {
                format!("Area clear: {captured} cubes")
            }
            GameEvent::ChainReaction { removed, .. } if *removed > 0 => {
                format!("Chain reaction x{removed}")
            }
            GameEvent::PlatformShrunk { rows, .. } => format!("Lost {rows} rows"),
            GameEvent::LifeLost { remaining } => format!("Life lost ({remaining} left)"),
            GameEvent::LevelComplete { level, bonus } => {
                format!("Level {level} complete! +{bonus}")
            }
            GameEvent::GameOver { score, .. } => format!("Game over - {score} points"),
            _ => return None,
        };
        Some(text)
    }
}
