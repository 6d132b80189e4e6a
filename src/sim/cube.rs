//! Cubes sliding down the platform toward the player

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::round_to_tile;

/// Cube types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CubeKind {
    /// Capture for points
    #[default]
    Normal,
    /// Penalty cube: shrinks the platform when captured or when it reaches the player
    Forbidden,
    /// Bonus cube: stores an area-clear and sets off a chain reaction
    Advantage,
}

impl CubeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CubeKind::Normal => "normal",
            CubeKind::Forbidden => "forbidden",
            CubeKind::Advantage => "advantage",
        }
    }

    /// Points awarded for capturing this kind
    pub fn points(&self) -> u64 {
        match self {
            CubeKind::Normal => NORMAL_POINTS,
            CubeKind::Forbidden => 0,
            CubeKind::Advantage => ADVANTAGE_POINTS,
        }
    }
}

/// A cube entity. `pos.x` is the column, `pos.y` the distance along the platform (z).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cube {
    pub id: u32,
    pub kind: CubeKind,
    pub pos: Vec2,
    /// Tiles per second toward z = 0
    pub speed: f32,
}

impl Cube {
    pub fn new(id: u32, kind: CubeKind, x: i32, z: i32, speed: f32) -> Self {
        Self {
            id,
            kind,
            pos: Vec2::new(x as f32, z as f32),
            speed,
        }
    }

    /// Constant-velocity slide toward the player end
    pub fn advance(&mut self, dt: f32) {
        self.pos.y -= self.speed * dt;
    }

    /// Grid tile the cube currently sits over
    #[inline]
    pub fn tile(&self) -> IVec2 {
        round_to_tile(self.pos)
    }

    /// Axis-aligned overlap with a player standing on `player_tile`
    pub fn overlaps(&self, player_tile: IVec2) -> bool {
        let player = player_tile.as_vec2();
        (player.x - self.pos.x).abs() < CRUSH_EXTENT && (player.y - self.pos.y).abs() < CRUSH_EXTENT
    }

    /// Slid past the near edge of the platform
    pub fn fell_off(&self) -> bool {
        self.pos.y < FALL_OFF_Z
    }

    /// Within one tile (including diagonals) of `tile`
    pub fn is_adjacent_to(&self, tile: IVec2) -> bool {
        let d = (self.tile() - tile).abs();
        d.x <= 1 && d.y <= 1
    }
}
