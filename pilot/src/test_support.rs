//! Test-only collaborators: a scripted planner and a fixed world.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::types::{BlockFilter, BlockPos};
use crate::io::planner::{InventorySummary, Planner, World};

/// One recorded planner call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerCall {
    StartGoto {
        pos: BlockPos,
        ignore_y: bool,
        approach_radius: u32,
    },
    StartMine(BlockFilter),
    Recover,
    SetSafeMode(bool),
    CancelAll,
}

/// Planner whose activity flags are set by the test.
///
/// `cancel_all` clears both flags and `recover` clears `stuck`. With
/// [`ScriptedPlanner::set_activate_on_start`] a start call also marks the
/// planner active, so a cancelled job stays gone until it is issued again.
#[derive(Debug)]
pub struct ScriptedPlanner {
    calls: Vec<PlannerCall>,
    ready: bool,
    active: bool,
    stuck: bool,
    activate_on_start: bool,
    fail_next: Option<String>,
}

impl Default for ScriptedPlanner {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            ready: true,
            active: false,
            stuck: false,
            activate_on_start: false,
            fail_next: None,
        }
    }
}

impl ScriptedPlanner {
    pub fn calls(&self) -> &[PlannerCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<PlannerCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }

    pub fn set_activate_on_start(&mut self, enabled: bool) {
        self.activate_on_start = enabled;
    }

    /// Make the next mutating call return an error.
    pub fn fail_next_call(&mut self, reason: &str) {
        self.fail_next = Some(reason.to_string());
    }

    fn record(&mut self, call: PlannerCall) -> Result<()> {
        self.calls.push(call);
        match self.fail_next.take() {
            Some(reason) => Err(anyhow!(reason)),
            None => Ok(()),
        }
    }
}

impl Planner for ScriptedPlanner {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn start_goal_and_path(
        &mut self,
        pos: BlockPos,
        ignore_y: bool,
        approach_radius: u32,
    ) -> Result<()> {
        self.record(PlannerCall::StartGoto {
            pos,
            ignore_y,
            approach_radius,
        })?;
        self.active |= self.activate_on_start;
        Ok(())
    }

    fn start_mine(&mut self, blocks: &BlockFilter) -> Result<()> {
        self.record(PlannerCall::StartMine(blocks.clone()))?;
        self.active |= self.activate_on_start;
        Ok(())
    }

    fn recover(&mut self) -> Result<()> {
        self.stuck = false;
        self.record(PlannerCall::Recover)
    }

    fn set_safe_mode(&mut self, enabled: bool) -> Result<()> {
        self.record(PlannerCall::SetSafeMode(enabled))
    }

    fn cancel_all(&mut self) -> Result<()> {
        self.active = false;
        self.stuck = false;
        self.record(PlannerCall::CancelAll)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_stuck(&self) -> bool {
        self.stuck
    }
}

/// World with fixed, test-controlled readings.
#[derive(Debug, Clone, Default)]
pub struct FakeWorld {
    pub player_y: Option<i32>,
    pub health: Option<f32>,
    pub inventory: InventorySummary,
    pub hazards: Vec<BlockPos>,
}

impl World for FakeWorld {
    fn player_y(&self) -> Option<i32> {
        self.player_y
    }

    fn effective_health(&self) -> Option<f32> {
        self.health
    }

    fn inventory(&self) -> InventorySummary {
        self.inventory
    }

    fn is_hazardous(&self, pos: BlockPos) -> bool {
        self.hazards.contains(&pos)
    }
}

/// Write `contents` to `name` inside a fresh temp directory.
///
/// Keep the returned `TempDir` alive for as long as the path is used.
pub fn temp_file(name: &str, contents: &str) -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(name);
    std::fs::write(&path, contents)?;
    Ok((dir, path))
}
