//! Save/load persistence
//!
//! Saved games are wrapped in a versioned JSON envelope. Loading rejects
//! envelopes written by another format version and states that fail
//! `GameState::validate`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::KeyValueStore;
use crate::sim::GameState;

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

/// Storage key for the continue-later save
pub const SAVE_KEY: &str = "quantum_grid_save";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("saved state is invalid: {0}")]
    Invalid(String),
    #[error("storage is unavailable")]
    StorageUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub version: u32,
    /// Unix timestamp (ms)
    pub saved_at: f64,
    pub state: GameState,
}

/// Just enough of an envelope to read its version
#[derive(Deserialize)]
struct VersionProbe {
    version: u32,
}

impl SaveEnvelope {
    pub fn new(state: &GameState, saved_at: f64) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at,
            state: state.clone(),
        }
    }

    pub fn encode(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and check an envelope
    pub fn decode(text: &str) -> Result<Self, PersistenceError> {
        let probe: VersionProbe = serde_json::from_str(text)?;
        if probe.version != SAVE_VERSION {
            return Err(PersistenceError::VersionMismatch {
                found: probe.version,
                expected: SAVE_VERSION,
            });
        }

        let mut envelope: SaveEnvelope = serde_json::from_str(text)?;
        envelope.state.rules = envelope.state.rules.clone().sanitized();
        envelope.state.validate().map_err(PersistenceError::Invalid)?;
        Ok(envelope)
    }
}

/// Write the state under [`SAVE_KEY`]
pub fn save_game(
    store: &dyn KeyValueStore,
    state: &GameState,
    saved_at: f64,
) -> Result<(), PersistenceError> {
    let json = SaveEnvelope::new(state, saved_at).encode()?;
    store.set(SAVE_KEY, &json)?;
    log::info!(
        "Game saved (level {}, score {})",
        state.current_level,
        state.score
    );
    Ok(())
}

/// Read the saved game, if any
pub fn load_game(store: &dyn KeyValueStore) -> Result<Option<GameState>, PersistenceError> {
    let Some(json) = store.get(SAVE_KEY)? else {
        return Ok(None);
    };
    let envelope = SaveEnvelope::decode(&json)?;
    log::info!(
        "Found saved game at level {} (saved at {})",
        envelope.state.current_level,
        envelope.saved_at
    );
    Ok(Some(envelope.state))
}

pub fn clear_save(store: &dyn KeyValueStore) -> Result<(), PersistenceError> {
    store.remove(SAVE_KEY)?;
    log::info!("Saved game cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;
    use crate::sim::{TickInput, tick};
    use crate::consts::SIM_DT;

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let mut state = GameState::new(77);
        for _ in 0..240 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }

        save_game(&store, &state, 1_700_000_000_000.0).unwrap();
        let loaded = load_game(&store).unwrap().unwrap();
        assert_eq!(loaded.seed, 77);
        assert_eq!(loaded.time_ticks, state.time_ticks);
        assert_eq!(loaded.level.cubes.len(), state.level.cubes.len());
        assert!(loaded.events.is_empty());
    }

    #[test]
    fn test_loaded_state_continues_identically() {
        let store = MemoryStore::new();
        let mut live = GameState::new(5);
        for _ in 0..120 {
            tick(&mut live, &TickInput::default(), SIM_DT);
        }
        save_game(&store, &live, 0.0).unwrap();
        let mut loaded = load_game(&store).unwrap().unwrap();

        for _ in 0..600 {
            tick(&mut live, &TickInput::default(), SIM_DT);
            tick(&mut loaded, &TickInput::default(), SIM_DT);
        }
        assert_eq!(live.score, loaded.score);
        assert_eq!(live.phase, loaded.phase);
        assert_eq!(live.level.cubes.len(), loaded.level.cubes.len());
        for (a, b) in live.level.cubes.iter().zip(&loaded.level.cubes) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.pos, b.pos);
        }
    }

    #[test]
    fn test_missing_save() {
        let store = MemoryStore::new();
        assert!(load_game(&store).unwrap().is_none());
    }

    #[test]
    fn test_version_mismatch() {
        let mut envelope = SaveEnvelope::new(&GameState::new(1), 0.0);
        envelope.version = SAVE_VERSION + 1;
        let json = serde_json::to_string(&envelope).unwrap();
        match SaveEnvelope::decode(&json) {
            Err(PersistenceError::VersionMismatch { found, expected }) => {
                assert_eq!(found, SAVE_VERSION + 1);
                assert_eq!(expected, SAVE_VERSION);
            }
            other => panic!("expected version mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_state_rejected() {
        let mut state = GameState::new(1);
        state.current_level = 0;
        let json = SaveEnvelope::new(&state, 0.0).encode().unwrap();
        assert!(matches!(
            SaveEnvelope::decode(&json),
            Err(PersistenceError::Invalid(_))
        ));
    }

    #[test]
    fn test_truncated_tiles_rejected() {
        let store = MemoryStore::new();
        let mut state = GameState::new(1);
        state.level.platform = serde_json::from_value(serde_json::json!({
            "width": 5,
            "length": 16,
            "tiles": [
                {"x": -2, "z": 0, "exists": true},
                {"x": -1, "z": 0, "exists": true},
                {"x": 0, "z": 0, "exists": true}
            ]
        }))
        .unwrap();
        save_game(&store, &state, 0.0).unwrap();
        assert!(matches!(
            load_game(&store),
            Err(PersistenceError::Invalid(_))
        ));
    }

    #[test]
    fn test_saved_rules_are_sanitized() {
        let mut state = GameState::new(2);
        state.rules.chain_delay_ms = u32::MAX;
        let json = SaveEnvelope::new(&state, 0.0).encode().unwrap();
        let loaded = SaveEnvelope::decode(&json).unwrap();
        assert_eq!(loaded.state.rules.chain_delay_ms, crate::sim::rules::MAX_TIMER_MS);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            SaveEnvelope::decode("not json"),
            Err(PersistenceError::Json(_))
        ));
    }

    #[test]
    fn test_clear_save() {
        let store = MemoryStore::new();
        save_game(&store, &GameState::new(3), 0.0).unwrap();
        clear_save(&store).unwrap();
        assert!(load_game(&store).unwrap().is_none());
    }
}
