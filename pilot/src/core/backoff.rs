//! Recovery cooldown/backoff policy.
//!
//! Keeps repeated "recover" attempts from spamming the planner while still
//! allowing a quick first retry. All functions are pure: state goes in, new
//! state comes out.

use serde::{Deserialize, Serialize};

/// Ticks after which a stuck streak is considered stale (20s at 20 TPS).
pub const RESET_AFTER_TICKS: i64 = 20 * 20;
/// Cooldown applied at backoff level 0.
pub const BASE_COOLDOWN_TICKS: i64 = 40;
/// Upper bound on any cooldown (30s at 20 TPS).
pub const MAX_COOLDOWN_TICKS: i64 = 20 * 30;

/// Ticks elapsed since the previous recovery attempt.
///
/// `last_attempt_tick <= 0` means "never attempted" and yields `i64::MAX`.
/// Out-of-order timestamps clamp to zero rather than going negative.
pub fn ticks_since_last_attempt(current_tick: i64, last_attempt_tick: i64) -> i64 {
    if last_attempt_tick <= 0 {
        return i64::MAX;
    }
    current_tick.saturating_sub(last_attempt_tick).max(0)
}

/// Backoff level to use for the attempt being made now.
///
/// Resets to zero once the cooldown window has fully elapsed, so the level
/// counts consecutive stuck events rather than lifetime failures.
pub fn next_backoff_level(current_level: u32, ticks_since_last: i64) -> u32 {
    if ticks_since_last >= RESET_AFTER_TICKS {
        return 0;
    }
    current_level.saturating_add(1)
}

/// `BASE_COOLDOWN_TICKS * 2^level`, clamped to `MAX_COOLDOWN_TICKS`.
pub fn cooldown_ticks_for_backoff_level(level: u32) -> i64 {
    let mut cooldown = BASE_COOLDOWN_TICKS;
    for _ in 0..level {
        cooldown = cooldown.saturating_mul(2);
        if cooldown >= MAX_COOLDOWN_TICKS {
            return MAX_COOLDOWN_TICKS;
        }
    }
    cooldown.min(MAX_COOLDOWN_TICKS)
}

/// Per-agent recovery bookkeeping. Survives across orchestrator runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffState {
    pub level: u32,
    /// Tick of the last recovery attempt; `<= 0` means never.
    pub last_attempt_tick: i64,
}

impl BackoffState {
    pub fn ticks_since(&self, now: i64) -> i64 {
        ticks_since_last_attempt(now, self.last_attempt_tick)
    }

    pub fn cooldown_ticks(&self) -> i64 {
        cooldown_ticks_for_backoff_level(self.level)
    }

    /// True while a new attempt must still wait out the current cooldown.
    pub fn is_cooling_down(&self, now: i64) -> bool {
        self.ticks_since(now) < self.cooldown_ticks()
    }

    /// State after recording an attempt at `now`.
    pub fn after_attempt(&self, now: i64) -> Self {
        Self {
            level: next_backoff_level(self.level, self.ticks_since(now)),
            last_attempt_tick: now,
        }
    }
}
