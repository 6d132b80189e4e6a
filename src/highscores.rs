//! High score leaderboard
//!
//! Top 10 runs, best first. Stored next to the settings.

use serde::{Deserialize, Serialize};

use crate::persistence::PersistenceError;
use crate::platform::{KeyValueStore, default_store};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    /// Level reached
    pub level: u32,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub const STORAGE_KEY: &'static str = "quantum_grid_highscores";

    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a score would make the board
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        self.entries.len() < MAX_HIGH_SCORES
            || self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Rank a score would achieve (1-indexed)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert a run. Returns the rank achieved, or None if it didn't qualify.
    /// Ties rank below existing entries.
    pub fn add_score(&mut self, score: u64, level: u32, timestamp: f64) -> Option<usize> {
        let rank = self.potential_rank(score)?;
        self.entries.insert(
            rank - 1,
            HighScoreEntry {
                score,
                level,
                timestamp,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line per entry for the game-over board
    pub fn board_lines(&self, now: f64) -> Vec<String> {
        if self.is_empty() {
            return vec!["No scores yet".to_string()];
        }
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                format!(
                    "{}. {} (level {}) {}",
                    i + 1,
                    e.score,
                    e.level,
                    format_relative(e.timestamp, now)
                )
            })
            .collect()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    pub fn load_from(store: &dyn KeyValueStore) -> Result<Self, PersistenceError> {
        let Some(json) = store.get(Self::STORAGE_KEY)? else {
            return Ok(Self::new());
        };
        let mut scores: HighScores = serde_json::from_str(&json)?;
        // Hand-edited files may be unsorted or oversized
        scores
            .entries
            .sort_by(|a, b| b.score.cmp(&a.score).then(a.timestamp.total_cmp(&b.timestamp)));
        scores.entries.truncate(MAX_HIGH_SCORES);
        Ok(scores)
    }

    pub fn save_to(&self, store: &dyn KeyValueStore) -> Result<(), PersistenceError> {
        store.set(Self::STORAGE_KEY, &serde_json::to_string(self)?)
    }

    /// Load from the platform store, starting fresh on failure
    pub fn load() -> Self {
        match Self::load_from(default_store().as_ref()) {
            Ok(scores) => {
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            Err(e) => {
                log::warn!("High scores unreadable ({}), starting fresh", e);
                Self::new()
            }
        }
    }

    pub fn save(&self) {
        match self.save_to(default_store().as_ref()) {
            Ok(()) => log::info!("High scores saved ({} entries)", self.entries.len()),
            Err(e) => log::warn!("Failed to save high scores: {}", e),
        }
    }
}

/// Format a timestamp relative to `now` (both Unix ms)
pub fn format_relative(timestamp: f64, now: f64) -> String {
    let mins = ((now - timestamp) / 60_000.0).max(0.0).floor() as u64;
    let hours = mins / 60;
    let days = hours / 24;

    match (days, hours, mins) {
        (d, _, _) if d >= 7 => format!("{} weeks ago", d / 7),
        (1, _, _) => "Yesterday".to_string(),
        (d, _, _) if d > 1 => format!("{} days ago", d),
        (_, 1, _) => "1 hour ago".to_string(),
        (_, h, _) if h > 1 => format!("{} hours ago", h),
        (_, _, 1) => "1 min ago".to_string(),
        (_, _, m) if m > 1 => format!("{} mins ago", m),
        _ => "Just now".to_string(),
    }
}
