//! Play-count gate in front of the full game
//!
//! Every completed level counts as a play. Once the count reaches the
//! threshold the game halts on the paywall until the player purchases or
//! declines. Either choice resets the count; a purchase unlocks for good.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaywallChoice {
    Purchase,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaywallGate {
    pub play_count: u32,
    /// 0 disables the gate
    pub threshold: u32,
    pub unlocked: bool,
}

impl PaywallGate {
    pub fn new(threshold: u32) -> Self {
        Self {
            play_count: 0,
            threshold,
            unlocked: false,
        }
    }

    /// Count a finished level. Returns true when the gate trips.
    pub fn record_play(&mut self) -> bool {
        if self.unlocked || self.threshold == 0 {
            return false;
        }
        self.play_count += 1;
        self.play_count >= self.threshold
    }

    pub fn resolve(&mut self, choice: PaywallChoice) {
        self.play_count = 0;
        if choice == PaywallChoice::Purchase {
            self.unlocked = true;
        }
    }
}
