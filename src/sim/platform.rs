//! Grid platform the player stands on
//!
//! Tiles span x in [-half_width, half_width] and z in [0, length).
//! Rows are only removed by shrinking (farthest row first) and only
//! added by extending at the far end.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// A single platform cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub z: i32,
    pub exists: bool,
}

/// The tile grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    width: i32,
    length: i32,
    /// Row-major: index = z * width + (x + half_width)
    tiles: Vec<Tile>,
}

impl Platform {
    pub fn new(width: i32, length: i32) -> Self {
        let width = width.max(1);
        let length = length.max(0);
        let half = width / 2;
        // Odd widths keep the grid symmetric around x = 0
        let columns = half * 2 + 1;
        let mut tiles = Vec::with_capacity((columns * length) as usize);
        for z in 0..length {
            for x in -half..=half {
                tiles.push(Tile { x, z, exists: true });
            }
        }
        Self {
            width: columns,
            length,
            tiles,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn length(&self) -> i32 {
        self.length
    }

    #[inline]
    pub fn half_width(&self) -> i32 {
        self.width / 2
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    fn index(&self, x: i32, z: i32) -> Option<usize> {
        let half = self.half_width();
        if x < -half || x > half || z < 0 || z >= self.length {
            return None;
        }
        Some((z * self.width + x + half) as usize)
    }

    /// Whether a standing tile exists at (x, z)
    pub fn is_platform_at(&self, x: i32, z: i32) -> bool {
        self.index(x, z)
            .and_then(|i| self.tiles.get(i))
            .is_some_and(|t| t.exists)
    }

    #[inline]
    pub fn contains(&self, tile: IVec2) -> bool {
        self.is_platform_at(tile.x, tile.y)
    }

    /// Check that the tile list matches the grid dimensions (loaded saves)
    pub fn check_layout(&self) -> Result<(), String> {
        if self.width < 1 || self.width % 2 == 0 || self.length < 0 {
            return Err(format!("bad platform size {}x{}", self.width, self.length));
        }
        let expected = self.width as usize * self.length as usize;
        if self.tiles.len() != expected {
            return Err(format!(
                "platform has {} tiles, expected {}",
                self.tiles.len(),
                expected
            ));
        }
        let half = self.half_width();
        for (i, tile) in self.tiles.iter().enumerate() {
            let i = i as i32;
            if tile.x != i % self.width - half || tile.z != i / self.width {
                return Err(format!("tile ({}, {}) out of place", tile.x, tile.z));
            }
        }
        Ok(())
    }

    /// Whether (x, z) is inside the grid bounds, standing or not
    pub fn in_bounds(&self, x: i32, z: i32) -> bool {
        self.index(x, z).is_some()
    }

    /// Highest z that still has at least one standing tile
    pub fn farthest_row(&self) -> Option<i32> {
        self.tiles.iter().filter(|t| t.exists).map(|t| t.z).max()
    }

    /// Rows with at least one standing tile, nearest first
    pub fn existing_rows(&self) -> Vec<i32> {
        let mut rows: Vec<i32> = self
            .tiles
            .iter()
            .filter(|t| t.exists)
            .map(|t| t.z)
            .collect();
        rows.dedup();
        rows
    }

    /// Count of standing tiles
    pub fn standing_tiles(&self) -> usize {
        self.tiles.iter().filter(|t| t.exists).count()
    }

    /// Knock out every tile in row `z`
    pub fn remove_row(&mut self, z: i32) {
        for tile in self.tiles.iter_mut().filter(|t| t.z == z) {
            tile.exists = false;
        }
    }

    /// Append one row at the far end
    pub fn extend(&mut self) {
        let z = self.length;
        let half = self.half_width();
        for x in -half..=half {
            self.tiles.push(Tile { x, z, exists: true });
        }
        self.length += 1;
    }
}
