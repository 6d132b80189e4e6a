//! The player's avatar: whole-tile movement with a cooldown

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::platform::Platform;
use crate::consts::*;

/// Grid step directions. Forward is toward the far end (+z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub fn delta(&self) -> IVec2 {
        match self {
            Direction::Forward => IVec2::new(0, 1),
            Direction::Backward => IVec2::new(0, -1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub tile: IVec2,
    pub lives: u8,
    pub facing: Direction,
    /// Ticks until the next move is accepted
    pub move_cooldown: u32,
}

impl Player {
    pub fn new(lives: u8) -> Self {
        Self {
            tile: IVec2::new(PLAYER_START_X, PLAYER_START_Z),
            lives,
            facing: Direction::Forward,
            move_cooldown: 0,
        }
    }

    /// Back to the start tile near the player end
    pub fn reset_position(&mut self) {
        self.tile = IVec2::new(PLAYER_START_X, PLAYER_START_Z);
        self.facing = Direction::Forward;
        self.move_cooldown = 0;
        log::debug!("Player reset to ({}, {})", self.tile.x, self.tile.y);
    }

    /// Count the move cooldown down by one tick
    pub fn cool_down(&mut self) {
        self.move_cooldown = self.move_cooldown.saturating_sub(1);
    }

    /// Try to step one tile. Rejected while cooling down, off the grid,
    /// or onto a missing tile. Returns whether the player moved.
    pub fn try_move(&mut self, direction: Direction, platform: &Platform, cooldown_ticks: u32) -> bool {
        if self.move_cooldown > 0 {
            return false;
        }
        let target = self.tile + direction.delta();
        if !platform.contains(target) {
            return false;
        }
        self.tile = target;
        self.facing = direction;
        self.move_cooldown = cooldown_ticks;
        log::trace!("Player moved to ({}, {})", target.x, target.y);
        true
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.lives > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_within_platform() {
        let platform = Platform::new(5, 16);
        let mut player = Player::new(3);
        assert!(player.try_move(Direction::Right, &platform, 0));
        assert_eq!(player.tile, IVec2::new(1, 1));
        assert_eq!(player.facing, Direction::Right);
        assert!(player.try_move(Direction::Forward, &platform, 0));
        assert_eq!(player.tile, IVec2::new(1, 2));
    }

    #[test]
    fn test_cooldown_blocks_rapid_moves() {
        let platform = Platform::new(5, 16);
        let mut player = Player::new(3);
        assert!(player.try_move(Direction::Left, &platform, 2));
        assert!(!player.try_move(Direction::Left, &platform, 2));
        player.cool_down();
        assert!(!player.try_move(Direction::Left, &platform, 2));
        player.cool_down();
        assert!(player.try_move(Direction::Left, &platform, 2));
        assert_eq!(player.tile, IVec2::new(-2, 1));
    }

    #[test]
    fn test_edges_block_movement() {
        let platform = Platform::new(5, 16);
        let mut player = Player::new(3);
        player.tile = IVec2::new(2, 0);
        assert!(!player.try_move(Direction::Right, &platform, 0));
        assert!(!player.try_move(Direction::Backward, &platform, 0));
        assert_eq!(player.tile, IVec2::new(2, 0));
    }

    #[test]
    fn test_missing_tile_blocks_movement() {
        let mut platform = Platform::new(5, 3);
        platform.remove_row(2);
        let mut player = Player::new(3);
        assert!(!player.try_move(Direction::Forward, &platform, 0));
        assert_eq!(player.tile, IVec2::new(0, 1));
    }

    #[test]
    fn test_reset_position() {
        let mut player = Player::new(3);
        player.tile = IVec2::new(2, 9);
        player.move_cooldown = 5;
        player.reset_position();
        assert_eq!(player.tile, IVec2::new(0, 1));
        assert_eq!(player.move_cooldown, 0);
    }
}
