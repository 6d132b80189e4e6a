//! Idle/demo mode: the game plays itself
//!
//! Walks into the column of the nearest incoming capturable cube, marks the
//! tile, sidesteps before the cube arrives and captures when the cube is
//! over the mark. Any cube about to run into the player takes priority.

use glam::IVec2;

use super::cube::CubeKind;
use super::player::Direction;
use super::state::GameState;
use super::tick::TickInput;
use crate::consts::{CRUSH_EXTENT, SIM_DT};

/// Fill in movement/action for this tick
pub fn drive(state: &GameState, input: &mut TickInput) {
    let player = state.player.tile;
    let platform = &state.level.platform;
    let window = danger_window(state);

    if state.stored_advantage.is_some() {
        input.activate_advantage = true;
    }

    if let Some(mark) = state.marked_tile {
        let mut over = state.level.cubes_at(mark).peekable();
        let capturable = over.peek().is_some() && over.all(|c| c.kind != CubeKind::Forbidden);
        // Capture, or drop a mark nothing useful is heading for
        if capturable || !has_incoming(state, mark) {
            input.action = true;
        }
    }

    if column_threatened(state, player, window) {
        input.movement = [Direction::Left, Direction::Right]
            .into_iter()
            .find(|d| {
                let target = player + d.delta();
                platform.contains(target) && !column_threatened(state, target, window)
            });
        return;
    }

    // Waiting beside the mark
    if state.marked_tile.is_some() {
        return;
    }

    let Some(target_x) = pick_target_column(state, player, window) else {
        return;
    };

    if target_x == player.x {
        input.action = true;
    } else {
        let direction = if target_x < player.x {
            Direction::Left
        } else {
            Direction::Right
        };
        let next = player + direction.delta();
        if platform.contains(next) && !column_threatened(state, next, window) {
            input.movement = Some(direction);
        }
    }
}

/// Distance (tiles) a cube covers while the player marks and steps aside, plus slack
fn danger_window(state: &GameState) -> f32 {
    let react_secs = (state.rules.move_cooldown_ticks() as f32 + 18.0) * SIM_DT;
    state.level.cube_speed() * react_secs + 1.0
}

/// A cube in `tile`'s column will reach it within `window` tiles
fn column_threatened(state: &GameState, tile: IVec2, window: f32) -> bool {
    let z = tile.y as f32;
    state.level.cubes.iter().any(|c| {
        c.tile().x == tile.x && c.pos.y > z - CRUSH_EXTENT && c.pos.y - z < window
    })
}

/// A capturable cube is still on its way to `mark`
fn has_incoming(state: &GameState, mark: IVec2) -> bool {
    state.level.cubes.iter().any(|c| {
        c.kind != CubeKind::Forbidden && c.tile().x == mark.x && c.pos.y > mark.y as f32 - 0.5
    })
}

/// Column of the nearest capturable cube far enough away to set up a capture
fn pick_target_column(state: &GameState, player: IVec2, window: f32) -> Option<i32> {
    let min_z = player.y as f32 + window + 1.0;
    state
        .level
        .cubes
        .iter()
        .filter(|c| c.kind != CubeKind::Forbidden && c.pos.y > min_z)
        .min_by(|a, b| {
            let cost_a = a.pos.y + (a.tile().x - player.x).abs() as f32;
            let cost_b = b.pos.y + (b.tile().x - player.x).abs() as f32;
            cost_a.total_cmp(&cost_b)
        })
        .map(|c| c.tile().x)
}
