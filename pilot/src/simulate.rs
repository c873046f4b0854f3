//! Scripted-world harness for `pilot simulate`.
//!
//! Drives a real [`Orchestrator`] against a planner and world whose behavior
//! comes from a scenario file, then checks the scenario's expectations.

use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::types::{BlockFilter, BlockPos};
use crate::io::planner::{InventorySummary, Planner, World};
use crate::io::scenario::{PlannerScript, ScenarioFile, WorldScript};
use crate::orchestrator::status::Status;
use crate::orchestrator::{AutomationContext, Orchestrator, Phase, RunEvent};

/// Wall-clock spacing of simulated ticks (20 TPS).
pub const TICK_DURATION: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Job {
    wait_ticks: u32,
    work_ticks: u32,
}

/// Planner driven by a [`PlannerScript`]. Call [`SimPlanner::advance`] once
/// per tick before stepping the orchestrator.
#[derive(Debug)]
pub struct SimPlanner {
    script: PlannerScript,
    job: Option<Job>,
    stuck: bool,
    active_ticks: u32,
    stucks_left: u32,
    safe_mode: bool,
}

impl SimPlanner {
    pub fn new(script: PlannerScript) -> Self {
        let stucks_left = script.stuck_repeats;
        Self {
            script,
            job: None,
            stuck: false,
            active_ticks: 0,
            stucks_left,
            safe_mode: false,
        }
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    pub fn advance(&mut self) {
        if self.stuck {
            return;
        }
        let Some(job) = self.job.as_mut() else {
            return;
        };
        if job.wait_ticks > 0 {
            job.wait_ticks -= 1;
            return;
        }
        if job.work_ticks == 0 {
            self.job = None;
            return;
        }
        job.work_ticks -= 1;
        self.active_ticks += 1;
        if let Some(after) = self.script.stuck_after_ticks
            && self.stucks_left > 0
            && self.active_ticks >= after
        {
            self.stucks_left -= 1;
            self.stuck = true;
        }
    }

    fn start_job(&mut self) {
        let wait_ticks = if self.script.unreachable {
            u32::MAX
        } else {
            self.script.start_delay_ticks
        };
        self.job = Some(Job {
            wait_ticks,
            work_ticks: self.script.work_ticks,
        });
        self.active_ticks = 0;
    }
}

impl Planner for SimPlanner {
    fn is_ready(&self) -> bool {
        self.script.ready
    }

    fn start_goal_and_path(
        &mut self,
        pos: BlockPos,
        ignore_y: bool,
        approach_radius: u32,
    ) -> Result<()> {
        debug!(target = %pos, ignore_y, approach_radius, "sim planner: goto");
        self.start_job();
        Ok(())
    }

    fn start_mine(&mut self, blocks: &BlockFilter) -> Result<()> {
        debug!(targets = blocks.len(), "sim planner: mine");
        self.start_job();
        Ok(())
    }

    fn recover(&mut self) -> Result<()> {
        self.stuck = false;
        self.active_ticks = 0;
        Ok(())
    }

    fn set_safe_mode(&mut self, enabled: bool) -> Result<()> {
        self.safe_mode = enabled;
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<()> {
        self.job = None;
        self.stuck = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.job
            .is_some_and(|job| job.wait_ticks == 0 && job.work_ticks > 0)
    }

    fn is_stuck(&self) -> bool {
        self.stuck
    }
}

/// World seeded from a [`WorldScript`] and mutated by scheduled events.
#[derive(Debug, Clone)]
pub struct SimWorld {
    player_y: Option<i32>,
    health: Option<f32>,
    inventory: InventorySummary,
    hazards: Vec<BlockPos>,
}

impl SimWorld {
    pub fn new(script: &WorldScript) -> Self {
        Self {
            player_y: script.player_y,
            health: script.health,
            inventory: script.inventory,
            hazards: script.hazards.clone(),
        }
    }
}

impl World for SimWorld {
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

/// Result of one simulated scenario.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub scenario_id: String,
    pub ticks: i64,
    pub goals_completed: usize,
    pub goals_failed: usize,
    pub status: Status,
    /// Expectation mismatches; empty when the scenario passed.
    pub mismatches: Vec<String>,
}

impl SimulationReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Run `scenario` to completion, calling `on_tick` with each tick's status
/// and events.
pub fn run_scenario<F>(scenario: &ScenarioFile, mut on_tick: F) -> SimulationReport
where
    F: FnMut(&Status, &[RunEvent]),
{
    let ctx = AutomationContext::new(
        SimPlanner::new(scenario.planner.clone()),
        SimWorld::new(&scenario.world),
        scenario.config.clone(),
    );
    let mut orchestrator = Orchestrator::new(ctx);
    let clock = Instant::now();
    let last_scheduled = i64::from(scenario.last_scheduled_tick());
    let max_ticks = i64::from(scenario.scenario.max_ticks);
    let mut goals_completed = 0;
    let mut goals_failed = 0;

    info!(scenario = %scenario.scenario.id, max_ticks, "simulation started");
    submit_due_goals(scenario, &mut orchestrator, 0);

    while orchestrator.tick() < max_ticks {
        let tick = orchestrator.tick() + 1;
        let due = u32::try_from(tick).unwrap_or(u32::MAX);
        for event in scenario.world_events.iter().filter(|event| event.tick == due) {
            let world = orchestrator.world_mut();
            if let Some(y) = event.player_y {
                world.player_y = Some(y);
            }
            if let Some(health) = event.health {
                world.health = Some(health);
            }
            if let Some(inventory) = event.inventory {
                world.inventory = inventory;
            }
        }
        submit_due_goals(scenario, &mut orchestrator, due);
        let now = clock + TICK_DURATION * due;
        for message in scenario.messages.iter().filter(|message| message.tick == due) {
            orchestrator.on_message_at(&message.text, now);
        }

        orchestrator.planner_mut().advance();
        let outcome = orchestrator.step();
        for event in &outcome.events {
            match event {
                RunEvent::GoalCompleted { .. } => goals_completed += 1,
                RunEvent::GoalFailed { .. } => goals_failed += 1,
                _ => {}
            }
        }
        let status = orchestrator.status();
        on_tick(&status, &outcome.events);

        let settled = outcome.phase.is_idle() && status.queued == 0;
        if settled && outcome.tick >= last_scheduled {
            break;
        }
    }

    let status = orchestrator.status();
    info!(
        scenario = %scenario.scenario.id,
        ticks = status.tick,
        phase = %status.phase,
        goals_completed,
        goals_failed,
        "simulation finished"
    );
    let mismatches = check_expectations(scenario, &status, goals_completed, goals_failed);
    SimulationReport {
        scenario_id: scenario.scenario.id.clone(),
        ticks: status.tick,
        goals_completed,
        goals_failed,
        status,
        mismatches,
    }
}

fn submit_due_goals(
    scenario: &ScenarioFile,
    orchestrator: &mut Orchestrator<SimPlanner, SimWorld>,
    tick: u32,
) {
    for scheduled in scenario.goals.iter().filter(|goal| goal.at_tick == tick) {
        if let Err(err) = orchestrator.submit(scheduled.goal.clone()) {
            debug!(error = %err, tick, "scheduled goal rejected");
        }
    }
}

/// Short phase name as used by `expect.phase`.
pub fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Starting => "starting",
        Phase::Active => "active",
        Phase::Settling => "settling",
        Phase::Paused(_) => "paused",
        Phase::Recovering => "recovering",
        Phase::Completed => "completed",
        Phase::Failed(_) => "failed",
    }
}

fn check_expectations(
    scenario: &ScenarioFile,
    status: &Status,
    goals_completed: usize,
    goals_failed: usize,
) -> Vec<String> {
    let expect = &scenario.expect;
    let mut mismatches = Vec::new();
    if let Some(phase) = &expect.phase {
        let actual = phase_name(status.phase);
        if actual != phase {
            mismatches.push(format!("expected phase {phase}, got {actual}"));
        }
    }
    if let Some(kind) = expect.failure {
        let actual = status.last_failure.as_ref().map(|failure| failure.kind);
        if actual != Some(kind) {
            mismatches.push(format!("expected failure {kind}, got {actual:?}"));
        }
    }
    if let Some(expected) = expect.goals_completed
        && expected != goals_completed
    {
        mismatches.push(format!(
            "expected {expected} completed goals, got {goals_completed}"
        ));
    }
    if let Some(expected) = expect.goals_failed
        && expected != goals_failed
    {
        mismatches.push(format!(
            "expected {expected} failed goals, got {goals_failed}"
        ));
    }
    if let Some(min_ticks) = expect.min_ticks
        && status.tick < i64::from(min_ticks)
    {
        mismatches.push(format!(
            "expected at least {min_ticks} ticks, settled after {}",
            status.tick
        ));
    }
    mismatches
}
