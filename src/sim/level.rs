//! Level and wave management
//!
//! A level is a fixed number of waves. Each wave drops a shuffled batch of
//! cubes just past the far edge of the platform; the next wave arrives when
//! the board is empty. Forbidden cubes cost platform rows, advantage cubes
//! set off chain reactions when they leave the board.

use glam::IVec2;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::cube::{Cube, CubeKind};
use super::events::{GameEvent, RemovalCause};
use super::platform::Platform;
use super::rules::Rules;
use crate::consts::*;

/// Per-level stage tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub stage_width: i32,
    pub stage_length: i32,
    /// Base speed before the rule multiplier
    pub cube_speed: f32,
    pub initial_cube_count: u32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            stage_width: STAGE_WIDTH,
            stage_length: STAGE_LENGTH,
            cube_speed: CUBE_SPEED,
            initial_cube_count: INITIAL_CUBE_COUNT,
        }
    }
}

impl StageConfig {
    /// Faster, busier waves as levels go up
    pub fn for_level(level: u32) -> Self {
        Self {
            cube_speed: 1.5 + level as f32 * 0.25,
            initial_cube_count: 10 + level * 2,
            ..Self::default()
        }
    }
}

/// How many cubes of each kind a wave holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveMix {
    pub normal: u32,
    pub forbidden: u32,
    pub advantage: u32,
}

impl WaveMix {
    pub fn total(&self) -> u32 {
        self.normal + self.forbidden + self.advantage
    }
}

/// 70/20/10 split (floored). From level 2 a wave carries at least one
/// forbidden cube, from level 3 at least one advantage cube.
pub fn cube_distribution(count: u32, level: u32) -> WaveMix {
    let normal = count * 7 / 10;
    let mut forbidden = count * 2 / 10;
    let mut advantage = count / 10;
    if level >= 2 && forbidden == 0 {
        forbidden = 1;
    }
    if level >= 3 && advantage == 0 {
        advantage = 1;
    }
    WaveMix {
        normal,
        forbidden,
        advantage,
    }
}

/// An advantage cube's delayed blast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChain {
    pub origin: IVec2,
    /// Cubes adjacent to the origin when the advantage cube left the board
    pub victims: Vec<u32>,
    pub ticks_left: u32,
}

/// What happened during one level update that the game state must resolve
#[derive(Debug, Clone, Default)]
pub struct LevelUpdate {
    /// Cubes overlapping the player this tick (id, kind)
    pub crushing: Vec<(u32, CubeKind)>,
    /// Board is empty and another wave is owed
    pub wave_due: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub platform: Platform,
    /// Active cubes (sorted by id)
    pub cubes: Vec<Cube>,
    /// Level number being played
    pub number: u32,
    pub config: StageConfig,
    /// Waves spawned so far this level
    pub wave_index: u32,
    pub waves_remaining: u32,
    pub pending_chains: Vec<PendingChain>,
    level_complete: bool,
    game_over: bool,
    speed_multiplier: f32,
    chain_delay_ticks: u32,
    next_cube_id: u32,
}

impl Level {
    pub fn new(config: StageConfig, rules: &Rules) -> Self {
        Self {
            platform: Platform::new(config.stage_width, config.stage_length),
            cubes: Vec::new(),
            number: 0,
            config,
            wave_index: 0,
            waves_remaining: 0,
            pending_chains: Vec::new(),
            level_complete: false,
            game_over: false,
            speed_multiplier: rules.cube_speed_multiplier,
            chain_delay_ticks: rules.chain_delay_ticks(),
            next_cube_id: 1,
        }
    }

    /// Drop every cube and reset per-level state. The platform is kept.
    pub fn clear_level(&mut self) {
        self.cubes.clear();
        self.pending_chains.clear();
        self.wave_index = 0;
        self.level_complete = false;
        self.game_over = false;
    }

    /// Start level `number`: 2 + min(number, 8) waves, first wave immediately
    pub fn generate_level<R: Rng + ?Sized>(
        &mut self,
        number: u32,
        config: StageConfig,
        rng: &mut R,
        events: &mut Vec<GameEvent>,
    ) {
        self.clear_level();
        self.number = number;
        self.config = config;
        self.waves_remaining = BASE_WAVES + number.min(MAX_EXTRA_WAVES);
        log::info!(
            "Level {} generated: {} waves, {} cubes/wave at speed {:.2}",
            number,
            self.waves_remaining,
            self.config.initial_cube_count,
            self.cube_speed()
        );
        self.generate_wave(rng, events);
    }

    /// Tiles per second for cubes spawned now
    pub fn cube_speed(&self) -> f32 {
        self.config.cube_speed * self.speed_multiplier
    }

    /// Spawn the next wave, or flag the level complete when none remain
    pub fn generate_wave<R: Rng + ?Sized>(&mut self, rng: &mut R, events: &mut Vec<GameEvent>) {
        if self.waves_remaining == 0 {
            self.level_complete = true;
            return;
        }
        self.waves_remaining -= 1;
        self.wave_index += 1;

        let mix = cube_distribution(self.config.initial_cube_count, self.number);
        let start_z = self.platform.length() + SPAWN_OFFSET;
        let half = self.platform.half_width();

        // Distinct spawn slots, shuffled
        let mut slots: Vec<IVec2> = (-half..=half)
            .flat_map(|x| (start_z..start_z + SPAWN_ROWS).map(move |z| IVec2::new(x, z)))
            .collect();
        slots.shuffle(rng);

        let kinds = std::iter::repeat_n(CubeKind::Normal, mix.normal as usize)
            .chain(std::iter::repeat_n(CubeKind::Forbidden, mix.forbidden as usize))
            .chain(std::iter::repeat_n(CubeKind::Advantage, mix.advantage as usize));

        let speed = self.cube_speed();
        let mut spawned = 0;
        for (kind, slot) in kinds.zip(slots) {
            let id = self.next_cube_id;
            self.next_cube_id += 1;
            self.cubes.push(Cube::new(id, kind, slot.x, slot.y, speed));
            spawned += 1;
        }

        if spawned < mix.total() {
            log::debug!(
                "Wave {} capped at {} cubes ({} requested)",
                self.wave_index,
                spawned,
                mix.total()
            );
        }
        log::debug!("Wave {} spawned with {} cubes", self.wave_index, spawned);
        events.push(GameEvent::WaveSpawned {
            wave: self.wave_index,
            cubes: spawned,
        });
    }

    /// Advance one tick: chain reactions, cube movement, escapes, wave bookkeeping.
    /// Cubes touching the player are reported, not resolved.
    pub fn update(&mut self, dt: f32, player_tile: IVec2, events: &mut Vec<GameEvent>) -> LevelUpdate {
        let mut result = LevelUpdate::default();

        self.run_chain_reactions(player_tile, events);

        for cube in &mut self.cubes {
            cube.advance(dt);
        }

        result.crushing = self
            .cubes
            .iter()
            .filter(|c| c.overlaps(player_tile))
            .map(|c| (c.id, c.kind))
            .collect();

        let escaped: Vec<u32> = self
            .cubes
            .iter()
            .filter(|c| c.fell_off())
            .map(|c| c.id)
            .collect();
        for id in escaped {
            self.remove_cube(id, RemovalCause::Escaped, player_tile, events);
        }

        if self.cubes.is_empty() && self.pending_chains.is_empty() {
            if self.waves_remaining > 0 {
                result.wave_due = true;
            } else {
                self.level_complete = true;
            }
        }

        result
    }

    fn run_chain_reactions(&mut self, player_tile: IVec2, events: &mut Vec<GameEvent>) {
        if self.pending_chains.is_empty() {
            return;
        }
        for chain in &mut self.pending_chains {
            chain.ticks_left = chain.ticks_left.saturating_sub(1);
        }
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_chains)
            .into_iter()
            .partition(|c| c.ticks_left == 0);
        self.pending_chains = waiting;

        for chain in due {
            let mut removed = 0;
            for id in chain.victims {
                // Another chain or a capture may have taken it already
                if self
                    .remove_cube(id, RemovalCause::ChainReaction, player_tile, events)
                    .is_some()
                {
                    removed += 1;
                }
            }
            log::debug!(
                "Chain reaction at ({}, {}) removed {} cubes",
                chain.origin.x,
                chain.origin.y,
                removed
            );
            events.push(GameEvent::ChainReaction {
                origin: chain.origin,
                removed,
            });
        }
    }

    /// Take a cube off the board and apply its kind's side effects.
    /// Returns the cube, or None if it was already gone.
    pub fn remove_cube(
        &mut self,
        id: u32,
        cause: RemovalCause,
        player_tile: IVec2,
        events: &mut Vec<GameEvent>,
    ) -> Option<Cube> {
        let idx = self.cubes.iter().position(|c| c.id == id)?;
        let cube = self.cubes.remove(idx);
        let tile = cube.tile();
        events.push(GameEvent::CubeRemoved {
            id,
            kind: cube.kind,
            tile,
            cause,
        });

        match cube.kind {
            CubeKind::Advantage => {
                let victims: Vec<u32> = self
                    .cubes
                    .iter()
                    .filter(|c| c.is_adjacent_to(tile))
                    .map(|c| c.id)
                    .collect();
                if !victims.is_empty() {
                    self.pending_chains.push(PendingChain {
                        origin: tile,
                        victims,
                        ticks_left: self.chain_delay_ticks,
                    });
                }
            }
            CubeKind::Forbidden => {
                if matches!(cause, RemovalCause::Captured | RemovalCause::Crushed) {
                    self.shrink_platform(FORBIDDEN_SHRINK_ROWS, player_tile, events);
                }
            }
            CubeKind::Normal => {}
        }

        Some(cube)
    }

    /// Collapse `rows` rows from the far end. Cubes over a collapsing row go
    /// with it; a player standing on one ends the run.
    pub fn shrink_platform(&mut self, rows: u32, player_tile: IVec2, events: &mut Vec<GameEvent>) -> u32 {
        let mut removed = 0;
        for _ in 0..rows {
            let Some(row) = self.platform.farthest_row() else {
                break;
            };

            let doomed: Vec<u32> = self
                .cubes
                .iter()
                .filter(|c| c.tile().y == row)
                .map(|c| c.id)
                .collect();
            for id in doomed {
                self.remove_cube(id, RemovalCause::RowCollapse, player_tile, events);
            }

            self.platform.remove_row(row);
            removed += 1;

            if player_tile.y == row {
                log::info!("Row {} collapsed under the player", row);
                self.game_over = true;
            }
        }

        if removed > 0 {
            let remaining_rows = self.platform.existing_rows().len() as u32;
            log::info!("Platform shrunk by {} rows ({} left)", removed, remaining_rows);
            events.push(GameEvent::PlatformShrunk {
                rows: removed,
                remaining_rows,
            });
        }
        removed
    }

    /// Add one row at the far end
    pub fn extend_platform(&mut self, events: &mut Vec<GameEvent>) {
        self.platform.extend();
        log::info!("Platform extended to {} rows", self.platform.length());
        events.push(GameEvent::PlatformExtended {
            length: self.platform.length(),
        });
    }

    #[inline]
    pub fn is_platform_at(&self, x: i32, z: i32) -> bool {
        self.platform.is_platform_at(x, z)
    }

    /// Cubes currently over `tile`
    pub fn cubes_at(&self, tile: IVec2) -> impl Iterator<Item = &Cube> {
        self.cubes.iter().filter(move |c| c.tile() == tile)
    }

    pub fn cube_ids_at(&self, tile: IVec2) -> Vec<u32> {
        self.cubes_at(tile).map(|c| c.id).collect()
    }

    pub fn cube(&self, id: u32) -> Option<&Cube> {
        self.cubes.iter().find(|c| c.id == id)
    }

    /// Normal cubes still on the board (HUD "cubes left")
    pub fn remaining_normal_cubes(&self) -> usize {
        self.cubes.iter().filter(|c| c.kind == CubeKind::Normal).count()
    }

    pub fn is_level_complete(&self) -> bool {
        self.level_complete
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Add a cube by hand (scripted scenarios and tests)
    pub fn spawn_cube(&mut self, kind: CubeKind, x: i32, z: i32) -> u32 {
        let id = self.next_cube_id;
        self.next_cube_id += 1;
        let speed = self.cube_speed();
        self.cubes.push(Cube::new(id, kind, x, z, speed));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashSet;

    fn level_with(count: u32, number: u32) -> (Level, Vec<GameEvent>) {
        let mut config = StageConfig::for_level(number);
        config.initial_cube_count = count;
        let mut level = Level::new(config.clone(), &Rules::default());
        let mut events = Vec::new();
        let mut rng = Pcg32::seed_from_u64(7);
        level.generate_level(number, config, &mut rng, &mut events);
        (level, events)
    }

    fn empty_level() -> Level {
        let mut level = Level::new(StageConfig::default(), &Rules::default());
        level.number = 1;
        level
    }

    #[test]
    fn test_distribution_split() {
        assert_eq!(
            cube_distribution(12, 1),
            WaveMix {
                normal: 8,
                forbidden: 2,
                advantage: 1
            }
        );
        let low = cube_distribution(4, 1);
        assert_eq!((low.forbidden, low.advantage), (0, 0));
        let low = cube_distribution(4, 2);
        assert_eq!((low.forbidden, low.advantage), (1, 0));
        let low = cube_distribution(4, 3);
        assert_eq!((low.forbidden, low.advantage), (1, 1));
    }

    #[test]
    fn test_level_wave_count() {
        let (level, _) = level_with(12, 1);
        // 3 waves, one already spawned
        assert_eq!(level.wave_index, 1);
        assert_eq!(level.waves_remaining, 2);
        let (level, _) = level_with(12, 20);
        assert_eq!(level.waves_remaining, 9);
    }

    #[test]
    fn test_level_one_cube_speed() {
        let (level, _) = level_with(12, 1);
        assert!((level.cube_speed() - 1.75).abs() < 1e-6);

        let fast = Rules {
            cube_speed_multiplier: 10.0,
            ..Rules::default()
        };
        let level = Level::new(StageConfig::for_level(1), &fast);
        assert!((level.cube_speed() - 17.5).abs() < 1e-4);
    }

    #[test]
    fn test_wave_spawns_past_far_edge() {
        let (level, events) = level_with(12, 1);
        assert_eq!(level.cubes.len(), 11);
        assert!(events.contains(&GameEvent::WaveSpawned { wave: 1, cubes: 11 }));
        for cube in &level.cubes {
            let t = cube.tile();
            assert!((18..21).contains(&t.y));
            assert!((-2..=2).contains(&t.x));
        }
        let kinds: Vec<_> = level.cubes.iter().map(|c| c.kind).collect();
        assert_eq!(kinds.iter().filter(|k| **k == CubeKind::Normal).count(), 8);
        assert_eq!(kinds.iter().filter(|k| **k == CubeKind::Forbidden).count(), 2);
        assert_eq!(kinds.iter().filter(|k| **k == CubeKind::Advantage).count(), 1);
    }

    #[test]
    fn test_level_completes_after_last_wave() {
        let mut level = empty_level();
        let mut events = Vec::new();
        let update = level.update(0.01, IVec2::new(0, 1), &mut events);
        assert!(!update.wave_due);
        assert!(level.is_level_complete());
    }

    #[test]
    fn test_empty_board_requests_wave() {
        let mut level = empty_level();
        level.waves_remaining = 1;
        let mut events = Vec::new();
        let update = level.update(0.01, IVec2::new(0, 1), &mut events);
        assert!(update.wave_due);
        assert!(!level.is_level_complete());
    }

    #[test]
    fn test_crushing_cubes_reported() {
        let mut level = empty_level();
        let id = level.spawn_cube(CubeKind::Normal, 0, 2);
        let mut events = Vec::new();
        let update = level.update(0.5, IVec2::new(0, 1), &mut events);
        assert_eq!(update.crushing, vec![(id, CubeKind::Normal)]);
    }

    #[test]
    fn test_escaped_forbidden_cube_is_harmless() {
        let mut level = empty_level();
        level.spawn_cube(CubeKind::Forbidden, 2, -2);
        let mut events = Vec::new();
        level.update(0.5, IVec2::new(0, 1), &mut events);
        assert!(level.cubes.is_empty());
        assert_eq!(level.platform.farthest_row(), Some(15));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::CubeRemoved {
                cause: RemovalCause::Escaped,
                ..
            }
        )));
    }

    #[test]
    fn test_captured_forbidden_shrinks_three_rows() {
        let mut level = empty_level();
        let id = level.spawn_cube(CubeKind::Forbidden, 0, 5);
        let mut events = Vec::new();
        level.remove_cube(id, RemovalCause::Captured, IVec2::new(0, 1), &mut events);
        assert_eq!(level.platform.farthest_row(), Some(12));
        assert!(!level.is_game_over());
        assert!(events.contains(&GameEvent::PlatformShrunk {
            rows: 3,
            remaining_rows: 13
        }));
    }

    #[test]
    fn test_shrink_under_player_ends_level() {
        let mut level = empty_level();
        let mut events = Vec::new();
        level.shrink_platform(2, IVec2::new(0, 14), &mut events);
        assert!(level.is_game_over());
    }

    #[test]
    fn test_shrink_takes_cubes_on_collapsed_rows() {
        let mut level = empty_level();
        let on_row = level.spawn_cube(CubeKind::Normal, 1, 15);
        let safe = level.spawn_cube(CubeKind::Normal, 1, 10);
        let mut events = Vec::new();
        level.shrink_platform(1, IVec2::new(0, 1), &mut events);
        assert!(level.cube(on_row).is_none());
        assert!(level.cube(safe).is_some());
    }

    #[test]
    fn test_shrink_stops_when_platform_gone() {
        let mut level = Level::new(
            StageConfig {
                stage_length: 2,
                ..StageConfig::default()
            },
            &Rules::default(),
        );
        let mut events = Vec::new();
        let removed = level.shrink_platform(3, IVec2::new(0, 5), &mut events);
        assert_eq!(removed, 2);
        assert_eq!(level.platform.farthest_row(), None);
    }

    #[test]
    fn test_advantage_chain_reaction_is_delayed() {
        let mut level = empty_level();
        let adv = level.spawn_cube(CubeKind::Advantage, 0, 8);
        let diag = level.spawn_cube(CubeKind::Normal, 1, 9);
        let side = level.spawn_cube(CubeKind::Forbidden, -1, 8);
        let far = level.spawn_cube(CubeKind::Normal, 2, 8);
        let player = IVec2::new(0, 1);
        let mut events = Vec::new();
        level.remove_cube(adv, RemovalCause::Captured, player, &mut events);
        assert_eq!(level.pending_chains.len(), 1);
        assert_eq!(level.cubes.len(), 3);

        let delay = Rules::default().chain_delay_ticks();
        for _ in 0..delay - 1 {
            level.update(0.0, player, &mut events);
        }
        assert!(level.cube(diag).is_some());
        level.update(0.0, player, &mut events);
        assert!(level.cube(diag).is_none());
        assert!(level.cube(side).is_none());
        assert!(level.cube(far).is_some());
        // Chain removal of a forbidden cube is not a penalty
        assert_eq!(level.platform.farthest_row(), Some(15));
        assert!(events.contains(&GameEvent::ChainReaction {
            origin: IVec2::new(0, 8),
            removed: 2
        }));
    }

    #[test]
    fn test_chain_skips_cubes_already_gone() {
        let mut level = empty_level();
        let adv = level.spawn_cube(CubeKind::Advantage, 0, 8);
        let victim = level.spawn_cube(CubeKind::Normal, 0, 9);
        let player = IVec2::new(0, 1);
        let mut events = Vec::new();
        level.remove_cube(adv, RemovalCause::Captured, player, &mut events);
        level.remove_cube(victim, RemovalCause::Captured, player, &mut events);
        for _ in 0..Rules::default().chain_delay_ticks() {
            level.update(0.0, player, &mut events);
        }
        assert!(events.contains(&GameEvent::ChainReaction {
            origin: IVec2::new(0, 8),
            removed: 0
        }));
    }

    #[test]
    fn test_cubes_at_and_remaining() {
        let mut level = empty_level();
        level.spawn_cube(CubeKind::Normal, 1, 4);
        level.spawn_cube(CubeKind::Forbidden, 1, 4);
        level.spawn_cube(CubeKind::Normal, 0, 4);
        assert_eq!(level.cube_ids_at(IVec2::new(1, 4)).len(), 2);
        assert_eq!(level.remaining_normal_cubes(), 2);
    }

    #[test]
    fn test_extend_platform() {
        let mut level = empty_level();
        let mut events = Vec::new();
        level.extend_platform(&mut events);
        assert!(level.is_platform_at(0, 16));
        assert_eq!(events, vec![GameEvent::PlatformExtended { length: 17 }]);
    }

    proptest! {
        #[test]
        fn prop_wave_slots_unique_and_bounded(count in 0u32..40, number in 1u32..12, seed in any::<u64>()) {
            let mut config = StageConfig::for_level(number);
            config.initial_cube_count = count;
            let mut level = Level::new(config.clone(), &Rules::default());
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut events = Vec::new();
            level.generate_level(number, config, &mut rng, &mut events);

            let slots = (level.platform.width() * SPAWN_ROWS) as usize;
            let tiles: HashSet<IVec2> = level.cubes.iter().map(|c| c.tile()).collect();
            prop_assert_eq!(tiles.len(), level.cubes.len());
            prop_assert!(level.cubes.len() <= slots);
            prop_assert_eq!(
                level.cubes.len(),
                (cube_distribution(count, number).total() as usize).min(slots)
            );
        }
    }
}
