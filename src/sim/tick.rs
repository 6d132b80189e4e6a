//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use super::autopilot;
use super::events::GameEvent;
use super::paywall::PaywallChoice;
use super::player::Direction;
use super::state::{GamePhase, GameState};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Step one tile (WASD / arrows)
    pub movement: Option<Direction>,
    /// Mark a tile, or capture on the marked one (space)
    pub action: bool,
    /// Fire the stored advantage (R)
    pub activate_advantage: bool,
    /// Pause toggle (Escape)
    pub pause: bool,
    /// Start a new run with this seed once the game is over
    pub restart: Option<u64>,
    /// Answer to the paywall
    pub paywall: Option<PaywallChoice>,
    /// Idle/demo mode - autopilot plays the game
    pub idle_mode: bool,
}

impl TickInput {
    /// Whether any one-shot command is set
    pub fn has_commands(&self) -> bool {
        self.movement.is_some()
            || self.action
            || self.activate_advantage
            || self.pause
            || self.restart.is_some()
            || self.paywall.is_some()
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                state.events.push(GameEvent::Paused);
                return;
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Playing;
                state.events.push(GameEvent::Resumed);
            }
            _ => {}
        }
    }

    match state.phase {
        GamePhase::GameOver => {
            if let Some(seed) = input.restart {
                state.restart(seed);
            }
            return;
        }
        GamePhase::Paywall => {
            if let Some(choice) = input.paywall {
                state.resolve_paywall(choice);
            }
            return;
        }
        GamePhase::Paused => return,
        GamePhase::Playing => {}
    }

    let mut input = input.clone();
    if input.idle_mode {
        autopilot::drive(state, &mut input);
    }
    let input = &input;

    state.time_ticks += 1;

    // Player
    state.player.cool_down();
    if let Some(direction) = input.movement {
        let cooldown = state.rules.move_cooldown_ticks();
        state
            .player
            .try_move(direction, &state.level.platform, cooldown);
    }

    if input.action {
        if state.marked_tile.is_some() {
            state.capture();
        } else {
            state.mark_tile();
        }
    }

    if input.activate_advantage {
        state.activate_advantage();
    }

    // A forbidden capture can pull the floor out
    if state.level.is_game_over() {
        state.end_game();
        return;
    }

    // Cubes
    let update = state.level.update(dt, state.player.tile, &mut state.events);

    for (id, kind) in update.crushing {
        state.crush(id, kind);
        if state.phase == GamePhase::GameOver {
            return;
        }
    }

    if state.level.is_game_over() {
        state.end_game();
        return;
    }

    if update.wave_due {
        let mut rng = state.rng_state.next_rng();
        state.level.generate_wave(&mut rng, &mut state.events);
    }

    if state.level.is_level_complete() {
        state.next_level();
    }
}
