//! Game state and session rules
//!
//! All state that must be persisted for Continue/determinism lives here.

use glam::IVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::cube::CubeKind;
use super::events::{GameEvent, RemovalCause};
use super::level::{Level, StageConfig};
use super::paywall::{PaywallChoice, PaywallGate};
use super::player::Player;
use super::rules::Rules;
use crate::consts::*;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Halted on the paywall between levels
    Paywall,
    /// Run ended
    GameOver,
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    /// Fresh generator for the next draw sequence; each call moves to a new stream
    pub fn next_rng(&mut self) -> Pcg32 {
        let mixed = self.seed ^ self.stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        self.stream += 1;
        Pcg32::seed_from_u64(mixed)
    }
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng_state: RngState,
    pub rules: Rules,
    pub current_level: u32,
    pub score: u64,
    pub phase: GamePhase,
    pub level: Level,
    pub player: Player,
    /// Tile flagged for the next capture
    pub marked_tile: Option<IVec2>,
    /// Centre of a captured advantage waiting to be fired
    pub stored_advantage: Option<IVec2>,
    pub paywall: PaywallGate,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Events since the front end last drained them
    #[serde(skip)]
    pub events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new game state with the given seed and default rules
    pub fn new(seed: u64) -> Self {
        Self::with_rules(seed, Rules::default())
    }

    pub fn with_rules(seed: u64, rules: Rules) -> Self {
        let rules = rules.sanitized();
        let mut state = Self {
            seed,
            rng_state: RngState::new(seed),
            level: Level::new(StageConfig::default(), &rules),
            player: Player::new(rules.max_lives),
            paywall: PaywallGate::new(rules.paywall_threshold),
            rules,
            current_level: 1,
            score: 0,
            phase: GamePhase::Playing,
            marked_tile: None,
            stored_advantage: None,
            time_ticks: 0,
            events: Vec::new(),
        };

        state.start_level(1);
        state
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    #[inline]
    pub fn lives(&self) -> u8 {
        self.player.lives
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Configure and generate level `number`, then put the player back at the start
    pub fn start_level(&mut self, number: u32) {
        self.marked_tile = None;
        self.stored_advantage = None;

        // Each new level earns an extra row
        if number > 1 {
            self.level.extend_platform(&mut self.events);
        }

        let config = StageConfig::for_level(number);
        let mut rng = self.rng_state.next_rng();
        self.level
            .generate_level(number, config, &mut rng, &mut self.events);

        self.player.reset_position();
        if !self.level.platform.contains(self.player.tile) {
            match nearest_standing_tile(&self.level, self.player.tile) {
                Some(tile) => self.player.tile = tile,
                None => {
                    log::warn!("No standing tile left to start level {}", number);
                    self.end_game();
                    return;
                }
            }
        }

        self.events.push(GameEvent::LevelStarted { level: number });
    }

    /// Award the level bonus and move on, unless the paywall stops us
    pub fn next_level(&mut self) {
        let finished = self.current_level;
        let bonus = finished as u64 * LEVEL_BONUS_PER_LEVEL;
        self.score += bonus;
        self.events.push(GameEvent::LevelComplete {
            level: finished,
            bonus,
        });
        log::info!("Level {} complete, bonus {}", finished, bonus);

        self.current_level += 1;

        if self.paywall.record_play() {
            log::info!(
                "Paywall reached after {} plays",
                self.paywall.play_count
            );
            self.phase = GamePhase::Paywall;
            self.marked_tile = None;
            self.level.clear_level();
            self.events.push(GameEvent::PaywallShown {
                play_count: self.paywall.play_count,
            });
            return;
        }

        self.start_level(self.current_level);
    }

    /// Leave the paywall. Both choices continue at the current level.
    pub fn resolve_paywall(&mut self, choice: PaywallChoice) -> bool {
        if self.phase != GamePhase::Paywall {
            return false;
        }
        self.paywall.resolve(choice);
        let purchased = choice == PaywallChoice::Purchase;
        log::info!(
            "Paywall resolved ({})",
            if purchased { "purchased" } else { "declined" }
        );
        self.events.push(GameEvent::PaywallResolved { purchased });
        self.phase = GamePhase::Playing;
        self.start_level(self.current_level);
        true
    }

    /// Flag the player's tile for capture. Only one mark at a time.
    pub fn mark_tile(&mut self) {
        if self.marked_tile.is_some() {
            return;
        }
        let tile = self.player.tile;
        self.marked_tile = Some(tile);
        self.events.push(GameEvent::TileMarked { tile });
    }

    /// Capture every cube over the marked tile, then clear the mark
    pub fn capture(&mut self) {
        let Some(tile) = self.marked_tile.take() else {
            return;
        };

        for id in self.level.cube_ids_at(tile) {
            let Some(cube) = self.level.remove_cube(
                id,
                RemovalCause::Captured,
                self.player.tile,
                &mut self.events,
            ) else {
                continue;
            };

            let points = cube.kind.points();
            self.score += points;
            if cube.kind == CubeKind::Advantage {
                let center = cube.tile();
                self.stored_advantage = Some(center);
                self.events.push(GameEvent::AdvantageStored { center });
            }
            self.events.push(GameEvent::CubeCaptured {
                kind: cube.kind,
                tile,
                points,
            });
        }

        self.events.push(GameEvent::MarkCleared);
    }

    /// Fire the stored advantage: capture every non-forbidden cube in the 3x3 area
    pub fn activate_advantage(&mut self) {
        let Some(center) = self.stored_advantage.take() else {
            return;
        };

        let mut captured = 0;
        for dx in -ADVANTAGE_RADIUS..=ADVANTAGE_RADIUS {
            for dz in -ADVANTAGE_RADIUS..=ADVANTAGE_RADIUS {
                let tile = center + IVec2::new(dx, dz);
                let ids: Vec<u32> = self
                    .level
                    .cubes_at(tile)
                    .filter(|c| c.kind != CubeKind::Forbidden)
                    .map(|c| c.id)
                    .collect();
                for id in ids {
                    if let Some(cube) = self.level.remove_cube(
                        id,
                        RemovalCause::AreaClear,
                        self.player.tile,
                        &mut self.events,
                    ) {
                        let points = cube.kind.points();
                        self.score += points;
                        captured += 1;
                        self.events.push(GameEvent::CubeCaptured {
                            kind: cube.kind,
                            tile,
                            points,
                        });
                    }
                }
            }
        }

        log::debug!(
            "Advantage fired at ({}, {}), {} cubes captured",
            center.x,
            center.y,
            captured
        );
        self.events
            .push(GameEvent::AdvantageActivated { center, captured });
    }

    /// A cube reached the player; resolve it per the crush policy
    pub fn crush(&mut self, id: u32, kind: CubeKind) {
        use super::rules::CrushPolicy;

        self.events.push(GameEvent::PlayerCrushed { kind });
        let fatal = match self.rules.crush_policy {
            CrushPolicy::EndRun => true,
            CrushPolicy::NormalOnly => kind == CubeKind::Normal,
            CrushPolicy::LoseLife => false,
        };

        if fatal {
            log::info!("Player crushed by {} cube", kind.as_str());
            self.end_game();
            return;
        }

        self.level
            .remove_cube(id, RemovalCause::Crushed, self.player.tile, &mut self.events);
        if self.rules.crush_policy == CrushPolicy::LoseLife {
            self.lose_life();
        }
    }

    pub fn lose_life(&mut self) {
        self.player.lives = self.player.lives.saturating_sub(1);
        self.events.push(GameEvent::LifeLost {
            remaining: self.player.lives,
        });
        if !self.player.is_alive() {
            self.end_game();
        }
    }

    pub fn end_game(&mut self) {
        if self.phase == GamePhase::GameOver {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.marked_tile = None;
        log::info!(
            "Game over at level {} with score {}",
            self.current_level,
            self.score
        );
        self.events.push(GameEvent::GameOver {
            score: self.score,
            level: self.current_level,
        });
    }

    /// Fresh run with a new seed. Rules and paywall progress carry over.
    pub fn restart(&mut self, seed: u64) {
        let paywall = self.paywall.clone();
        *self = Self::with_rules(seed, self.rules.clone());
        self.paywall = paywall;
        self.events.push(GameEvent::Restarted { seed });
        log::info!("Game restarted with seed: {}", seed);
    }

    /// Check internal consistency (used when loading saves)
    pub fn validate(&self) -> Result<(), String> {
        if self.current_level == 0 {
            return Err("level number must start at 1".into());
        }
        self.level.platform.check_layout()?;
        if self.phase != GamePhase::GameOver && !self.level.platform.contains(self.player.tile) {
            return Err(format!(
                "player at ({}, {}) is not on the platform",
                self.player.tile.x, self.player.tile.y
            ));
        }
        let mut ids: Vec<u32> = self.level.cubes.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.level.cubes.len() {
            return Err("duplicate cube ids".into());
        }
        if self.player.lives > self.rules.max_lives {
            return Err("more lives than the rules allow".into());
        }
        Ok(())
    }
}

/// Standing tile closest to `from` (Manhattan distance, nearest row first)
fn nearest_standing_tile(level: &Level, from: IVec2) -> Option<IVec2> {
    level
        .platform
        .tiles()
        .iter()
        .filter(|t| t.exists)
        .map(|t| IVec2::new(t.x, t.z))
        .min_by_key(|t| ((*t - from).abs().element_sum(), t.y, t.x.abs()))
}
