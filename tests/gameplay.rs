//! Whole-run tests through the public API

use quantum_grid::consts::{SIM_DT, SIM_HZ, SPAWN_ROWS};
use quantum_grid::persistence::{load_game, save_game};
use quantum_grid::platform::MemoryStore;
use quantum_grid::sim::{
    CrushPolicy, GameEvent, GamePhase, GameState, PaywallChoice, Rules, TickInput, tick,
};
use quantum_grid::HighScores;

fn idle() -> TickInput {
    TickInput {
        idle_mode: true,
        ..Default::default()
    }
}

/// Empty the board so the next tick finishes the level
fn finish_level(state: &mut GameState) {
    state.level.cubes.clear();
    state.level.pending_chains.clear();
    state.level.waves_remaining = 0;
    tick(state, &TickInput::default(), SIM_DT);
}

#[test]
fn same_seed_and_inputs_replay_identically() {
    let mut a = GameState::new(0xC0FFEE);
    let mut b = GameState::new(0xC0FFEE);

    for _ in 0..(60 * SIM_HZ) {
        tick(&mut a, &idle(), SIM_DT);
        tick(&mut b, &idle(), SIM_DT);
        assert_eq!(a.drain_events(), b.drain_events());
    }

    assert_eq!(a.score, b.score);
    assert_eq!(a.time_ticks, b.time_ticks);
    assert_eq!(a.phase, b.phase);
    assert_eq!(a.current_level, b.current_level);
    assert_eq!(a.player.tile, b.player.tile);
    assert_eq!(a.level.cubes.len(), b.level.cubes.len());
    for (ca, cb) in a.level.cubes.iter().zip(&b.level.cubes) {
        assert_eq!(ca.id, cb.id);
        assert_eq!(ca.kind, cb.kind);
        assert_eq!(ca.pos, cb.pos);
    }
}

#[test]
fn autopilot_runs_keep_core_invariants() {
    for seed in 1..=4u64 {
        let rules = Rules {
            crush_policy: CrushPolicy::LoseLife,
            ..Rules::default()
        };
        let mut state = GameState::with_rules(seed, rules);
        let width = state.level.platform.width() as u32;
        let mut last_score = state.score;
        let mut last_standing = state.level.platform.standing_tiles();

        for _ in 0..(90 * SIM_HZ) {
            tick(&mut state, &idle(), SIM_DT);
            let events = state.drain_events();

            assert!(state.score >= last_score, "seed {seed}: score went down");
            last_score = state.score;

            let standing = state.level.platform.standing_tiles();
            if standing > last_standing {
                assert!(
                    events
                        .iter()
                        .any(|e| matches!(e, GameEvent::PlatformExtended { .. })),
                    "seed {seed}: tiles appeared without an extend"
                );
            }
            last_standing = standing;

            for event in &events {
                if let GameEvent::WaveSpawned { cubes, .. } = event {
                    assert!(*cubes <= width * SPAWN_ROWS as u32);
                }
            }

            if state.is_game_over() {
                break;
            }
            assert!(
                state.level.platform.contains(state.player.tile),
                "seed {seed}: player off the platform while playing"
            );
        }
    }
}

#[test]
fn paywall_trips_every_threshold_levels_until_purchase() {
    let mut state = GameState::with_rules(
        11,
        Rules {
            paywall_threshold: 2,
            ..Rules::default()
        },
    );

    finish_level(&mut state);
    assert_eq!(state.phase, GamePhase::Playing);
    assert_eq!(state.current_level, 2);

    finish_level(&mut state);
    assert_eq!(state.phase, GamePhase::Paywall);
    let score_at_paywall = state.score;

    // Play input is ignored on the paywall
    tick(&mut state, &idle(), SIM_DT);
    assert_eq!(state.phase, GamePhase::Paywall);

    let decline = TickInput {
        paywall: Some(PaywallChoice::Decline),
        ..Default::default()
    };
    tick(&mut state, &decline, SIM_DT);
    assert_eq!(state.phase, GamePhase::Playing);
    assert_eq!(state.current_level, 3);
    assert_eq!(state.paywall.play_count, 0);
    assert_eq!(state.score, score_at_paywall);

    finish_level(&mut state);
    finish_level(&mut state);
    assert_eq!(state.phase, GamePhase::Paywall);

    let purchase = TickInput {
        paywall: Some(PaywallChoice::Purchase),
        ..Default::default()
    };
    tick(&mut state, &purchase, SIM_DT);
    assert!(state.paywall.unlocked);

    for _ in 0..4 {
        finish_level(&mut state);
        assert_eq!(state.phase, GamePhase::Playing);
    }
    assert_eq!(state.current_level, 9);
}

#[test]
fn level_bonus_and_platform_growth() {
    let mut state = GameState::new(8);
    let length = state.level.platform.length();

    finish_level(&mut state);
    let events = state.drain_events();
    assert!(events.contains(&GameEvent::LevelComplete {
        level: 1,
        bonus: 500
    }));
    assert_eq!(state.score, 500);
    assert_eq!(state.level.platform.length(), length + 1);

    finish_level(&mut state);
    assert_eq!(state.score, 500 + 1000);
    assert_eq!(state.level.platform.length(), length + 2);
}

#[test]
fn saved_run_resumes_where_it_left_off() {
    let store = MemoryStore::new();
    let mut state = GameState::new(21);
    for _ in 0..(10 * SIM_HZ) {
        tick(&mut state, &idle(), SIM_DT);
    }
    state.drain_events();
    save_game(&store, &state, 0.0).unwrap();

    let mut resumed = load_game(&store).unwrap().expect("save present");
    for _ in 0..(10 * SIM_HZ) {
        tick(&mut state, &idle(), SIM_DT);
        tick(&mut resumed, &idle(), SIM_DT);
    }
    assert_eq!(state.score, resumed.score);
    assert_eq!(state.current_level, resumed.current_level);
    assert_eq!(state.player.tile, resumed.player.tile);
    assert_eq!(state.drain_events(), resumed.drain_events());
}

#[test]
fn game_over_records_high_score_and_restart_keeps_rules() {
    let mut state = GameState::with_rules(
        5,
        Rules {
            crush_policy: CrushPolicy::NormalOnly,
            paywall_threshold: 3,
            ..Rules::default()
        },
    );
    finish_level(&mut state);
    state.end_game();
    assert!(state.is_game_over());

    let mut scores = HighScores::new();
    assert_eq!(scores.add_score(state.score, state.current_level, 0.0), Some(1));

    tick(
        &mut state,
        &TickInput {
            restart: Some(6),
            ..Default::default()
        },
        SIM_DT,
    );
    assert_eq!(state.phase, GamePhase::Playing);
    assert_eq!(state.seed, 6);
    assert_eq!(state.score, 0);
    assert_eq!(state.current_level, 1);
    assert_eq!(state.rules.crush_policy, CrushPolicy::NormalOnly);
    assert_eq!(state.paywall.play_count, 1);
}
