//! Keyboard mapping
//!
//! Translates `KeyboardEvent.key` values into simulation commands.

use crate::sim::{Direction, PaywallChoice, TickInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    /// Mark / capture
    Action,
    ActivateAdvantage,
    Pause,
    Restart,
    Purchase,
    Decline,
    ToggleIdle,
}

/// Map a key name (case-insensitive) to a command
pub fn key_to_command(key: &str) -> Option<Command> {
    let command = match key.to_lowercase().as_str() {
        "w" | "arrowup" => Command::Move(Direction::Forward),
        "s" | "arrowdown" => Command::Move(Direction::Backward),
        "a" | "arrowleft" => Command::Move(Direction::Left),
        "d" | "arrowright" => Command::Move(Direction::Right),
        " " | "spacebar" => Command::Action,
        "r" => Command::ActivateAdvantage,
        "escape" | "esc" => Command::Pause,
        "enter" => Command::Restart,
        "p" => Command::Purchase,
        "n" => Command::Decline,
        "i" => Command::ToggleIdle,
        _ => return None,
    };
    Some(command)
}

/// Map a key while a modal prompt may be open. The prompt's buttons own
/// the input until it closes, so every key is dropped.
pub fn route_key(key: &str, prompt_open: bool) -> Option<Command> {
    if prompt_open {
        return None;
    }
    key_to_command(key)
}

impl Command {
    /// Record this command on the pending input. `seed` is used for restarts.
    pub fn apply(self, input: &mut TickInput, seed: u64) {
        match self {
            Command::Move(direction) => input.movement = Some(direction),
            Command::Action => input.action = true,
            Command::ActivateAdvantage => input.activate_advantage = true,
            Command::Pause => input.pause = true,
            Command::Restart => input.restart = Some(seed),
            Command::Purchase => input.paywall = Some(PaywallChoice::Purchase),
            Command::Decline => input.paywall = Some(PaywallChoice::Decline),
            Command::ToggleIdle => {
                input.idle_mode = !input.idle_mode;
                log::info!("Idle mode: {}", input.idle_mode);
            }
        }
    }
}

/// Clear one-shot inputs after a tick has consumed them
pub fn clear_one_shots(input: &mut TickInput) {
    input.movement = None;
    input.action = false;
    input.activate_advantage = false;
    input.pause = false;
    input.restart = None;
    input.paywall = None;
}
