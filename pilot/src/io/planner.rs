//! Collaborator seams: the pathfinding planner and world sensing.
//!
//! The orchestrator never talks to a game client directly. Production code
//! adapts a real planner/world to these traits; tests and the simulator use
//! scripted implementations.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::types::{BlockFilter, BlockPos};

/// External pathfinding/mining engine.
///
/// Mutating calls start work asynchronously; progress is observed through
/// `is_active` and `is_stuck` on later ticks.
pub trait Planner {
    /// False while the planner cannot accept goals (e.g. not loaded).
    fn is_ready(&self) -> bool;

    fn start_goal_and_path(
        &mut self,
        pos: BlockPos,
        ignore_y: bool,
        approach_radius: u32,
    ) -> Result<()>;

    fn start_mine(&mut self, blocks: &BlockFilter) -> Result<()>;

    /// One unstick attempt. Never retried internally.
    fn recover(&mut self) -> Result<()>;

    fn set_safe_mode(&mut self, enabled: bool) -> Result<()>;

    /// Stop all motion and forget the current goal.
    fn cancel_all(&mut self) -> Result<()>;

    fn is_active(&self) -> bool;

    fn is_stuck(&self) -> bool;
}

/// Read-only view of the player's surroundings.
pub trait World {
    /// Current block Y, or `None` when the position is unknown.
    fn player_y(&self) -> Option<i32>;

    /// Health plus absorption, or `None` when unknown.
    fn effective_health(&self) -> Option<f32>;

    fn inventory(&self) -> InventorySummary;

    /// True when standing exactly on `pos` would be dangerous.
    fn is_hazardous(&self, pos: BlockPos) -> bool;
}

/// Main-inventory occupancy (hotbar + storage, no armor/offhand).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub used_slots: u32,
    pub total_slots: u32,
}

impl InventorySummary {
    pub fn is_full(&self) -> bool {
        self.total_slots > 0 && self.used_slots >= self.total_slots
    }
}
