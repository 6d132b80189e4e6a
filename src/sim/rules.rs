//! Rule tuning that differed between builds of the game

use serde::{Deserialize, Serialize};

use crate::consts::CUBE_SPEED_MULTIPLIER;
use crate::ms_to_ticks;

/// Longest move cooldown or chain delay accepted from storage
pub const MAX_TIMER_MS: u32 = 10_000;

/// What happens when a cube slides into the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrushPolicy {
    /// Any cube ends the run
    #[default]
    EndRun,
    /// The cube is destroyed and the player loses a life
    LoseLife,
    /// Only normal cubes end the run; other kinds are destroyed on contact
    NormalOnly,
}

impl CrushPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrushPolicy::EndRun => "end-run",
            CrushPolicy::LoseLife => "lose-life",
            CrushPolicy::NormalOnly => "normal-only",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "end-run" | "endrun" | "end" => Some(CrushPolicy::EndRun),
            "lose-life" | "loselife" | "life" => Some(CrushPolicy::LoseLife),
            "normal-only" | "normalonly" | "normal" => Some(CrushPolicy::NormalOnly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub crush_policy: CrushPolicy,
    /// Completed levels before the paywall appears (0 disables it)
    pub paywall_threshold: u32,
    pub max_lives: u8,
    /// Minimum time between two player steps
    pub move_cooldown_ms: u32,
    /// Delay before an advantage cube's chain reaction fires
    pub chain_delay_ms: u32,
    /// Scales every cube's speed
    pub cube_speed_multiplier: f32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            crush_policy: CrushPolicy::EndRun,
            paywall_threshold: 7,
            max_lives: 3,
            move_cooldown_ms: 150,
            chain_delay_ms: 150,
            cube_speed_multiplier: CUBE_SPEED_MULTIPLIER,
        }
    }
}

impl Rules {
    pub fn move_cooldown_ticks(&self) -> u32 {
        ms_to_ticks(self.move_cooldown_ms)
    }

    pub fn chain_delay_ticks(&self) -> u32 {
        ms_to_ticks(self.chain_delay_ms)
    }

    /// Clamp values loaded from storage into playable ranges
    pub fn sanitized(mut self) -> Self {
        self.max_lives = self.max_lives.max(1);
        if !self.cube_speed_multiplier.is_finite() || self.cube_speed_multiplier <= 0.0 {
            log::warn!(
                "Invalid cube speed multiplier {}, using default",
                self.cube_speed_multiplier
            );
            self.cube_speed_multiplier = CUBE_SPEED_MULTIPLIER;
        }
        self.cube_speed_multiplier = self.cube_speed_multiplier.min(20.0);
        if self.move_cooldown_ms > MAX_TIMER_MS || self.chain_delay_ms > MAX_TIMER_MS {
            log::warn!(
                "Timers clamped to {} ms (cooldown {}, chain delay {})",
                MAX_TIMER_MS,
                self.move_cooldown_ms,
                self.chain_delay_ms
            );
        }
        self.move_cooldown_ms = self.move_cooldown_ms.min(MAX_TIMER_MS);
        self.chain_delay_ms = self.chain_delay_ms.min(MAX_TIMER_MS);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let rules = Rules::default();
        assert_eq!(rules.move_cooldown_ticks(), 18);
        assert_eq!(rules.chain_delay_ticks(), 18);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(CrushPolicy::from_str("Lose-Life"), Some(CrushPolicy::LoseLife));
        assert_eq!(CrushPolicy::from_str("normal"), Some(CrushPolicy::NormalOnly));
        assert_eq!(CrushPolicy::from_str("bogus"), None);
        for policy in [CrushPolicy::EndRun, CrushPolicy::LoseLife, CrushPolicy::NormalOnly] {
            assert_eq!(CrushPolicy::from_str(policy.as_str()), Some(policy));
        }
    }

    #[test]
    fn test_sanitized_fixes_bad_values() {
        let rules = Rules {
            max_lives: 0,
            cube_speed_multiplier: f32::NAN,
            ..Rules::default()
        }
        .sanitized();
        assert_eq!(rules.max_lives, 1);
        assert_eq!(rules.cube_speed_multiplier, CUBE_SPEED_MULTIPLIER);
    }

    #[test]
    fn test_sanitized_clamps_huge_timers() {
        let rules: Rules =
            serde_json::from_str(r#"{"chain_delay_ms": 4000000000, "move_cooldown_ms": 4294967295}"#)
                .unwrap();
        let rules = rules.sanitized();
        assert_eq!(rules.chain_delay_ms, MAX_TIMER_MS);
        assert_eq!(rules.move_cooldown_ms, MAX_TIMER_MS);
        assert_eq!(rules.chain_delay_ticks(), 1200);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let rules: Rules = serde_json::from_str(r#"{"paywall_threshold": 3}"#).unwrap();
        assert_eq!(rules.paywall_threshold, 3);
        assert_eq!(rules.max_lives, 3);
        assert_eq!(rules.crush_policy, CrushPolicy::EndRun);
    }
}
