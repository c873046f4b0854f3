//! Scenario file parsing and validation.
//!
//! Scenarios are TOML files that script a planner and a world, schedule goals
//! and swarm messages by tick, and state what the run should end in. See
//! `pilot/scenarios/` for examples.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::core::goal::Goal;
use crate::core::types::BlockPos;
use crate::error::FailureKind;
use crate::io::config::AutomationConfig;
use crate::io::planner::InventorySummary;

/// A parsed scenario file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioFile {
    pub scenario: ScenarioMeta,
    #[serde(default)]
    pub config: AutomationConfig,
    #[serde(default)]
    pub world: WorldScript,
    #[serde(default)]
    pub planner: PlannerScript,
    #[serde(default)]
    pub goals: Vec<ScheduledGoal>,
    #[serde(default)]
    pub messages: Vec<ScheduledMessage>,
    #[serde(default)]
    pub world_events: Vec<WorldEvent>,
    #[serde(default)]
    pub expect: Expectations,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ScenarioMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    /// Hard stop for the simulation.
    pub max_ticks: u32,
}

/// Initial world readings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WorldScript {
    pub player_y: Option<i32>,
    pub health: Option<f32>,
    #[serde(default)]
    pub inventory: InventorySummary,
    #[serde(default)]
    pub hazards: Vec<BlockPos>,
}

/// Scripted planner behavior.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlannerScript {
    pub ready: bool,
    /// Ticks between a start call and the planner becoming active.
    pub start_delay_ticks: u32,
    /// Active ticks before a started job finishes.
    pub work_ticks: u32,
    /// Start calls are accepted but the planner never becomes active.
    pub unreachable: bool,
    /// Become stuck after this many active ticks.
    pub stuck_after_ticks: Option<u32>,
    /// How many times the planner gets stuck over the whole scenario.
    pub stuck_repeats: u32,
}

impl Default for PlannerScript {
    fn default() -> Self {
        Self {
            ready: true,
            start_delay_ticks: 1,
            work_ticks: 10,
            unreachable: false,
            stuck_after_ticks: None,
            stuck_repeats: 1,
        }
    }
}

/// Goal submitted right before the given tick (0 = before the first tick).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ScheduledGoal {
    #[serde(default)]
    pub at_tick: u32,
    #[serde(flatten)]
    pub goal: Goal,
}

/// Raw swarm transport line delivered right before the given tick.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ScheduledMessage {
    pub tick: u32,
    pub text: String,
}

/// World change applied right before the given tick. Absent fields are kept.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WorldEvent {
    pub tick: u32,
    pub player_y: Option<i32>,
    pub health: Option<f32>,
    pub inventory: Option<InventorySummary>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Expectations {
    /// Phase name at the end of the run (e.g. `completed`, `failed`).
    pub phase: Option<String>,
    pub failure: Option<FailureKind>,
    pub goals_completed: Option<usize>,
    pub goals_failed: Option<usize>,
    /// Lower bound on the ticks the run takes before it settles.
    pub min_ticks: Option<u32>,
}

impl ScenarioFile {
    /// Load and validate a scenario file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read scenario {}", path.display()))?;
        Self::parse_str(&contents).with_context(|| format!("load scenario {}", path.display()))
    }

    pub fn parse_str(contents: &str) -> Result<Self> {
        let scenario: ScenarioFile = toml::from_str(contents).context("parse scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Last tick at which anything is scheduled.
    pub fn last_scheduled_tick(&self) -> u32 {
        let goals = self.goals.iter().map(|goal| goal.at_tick);
        let messages = self.messages.iter().map(|message| message.tick);
        let events = self.world_events.iter().map(|event| event.tick);
        goals.chain(messages).chain(events).max().unwrap_or(0)
    }

    fn validate(&self) -> Result<()> {
        validate_scenario_id(&self.scenario.id)?;
        if self.scenario.max_ticks == 0 {
            bail!("scenario.max_ticks must be > 0");
        }
        self.config.validate().context("config invalid")?;
        if self.goals.is_empty() && self.messages.is_empty() {
            bail!("scenario must schedule at least one goal or message");
        }
        if self.planner.stuck_after_ticks == Some(0) {
            bail!("planner.stuck_after_ticks must be > 0");
        }
        for (index, message) in self.messages.iter().enumerate() {
            if message.tick == 0 {
                bail!("messages[{index}].tick must be > 0");
            }
            if message.text.trim().is_empty() {
                bail!("messages[{index}].text must be non-empty");
            }
        }
        if let Some(index) = self.world_events.iter().position(|event| event.tick == 0) {
            bail!("world_events[{index}].tick must be > 0");
        }
        let last_tick = self.last_scheduled_tick();
        if last_tick > self.scenario.max_ticks {
            bail!(
                "scheduled tick {last_tick} is beyond scenario.max_ticks {}",
                self.scenario.max_ticks
            );
        }
        if let Some(phase) = &self.expect.phase
            && !PHASE_NAMES.contains(&phase.as_str())
        {
            bail!("expect.phase must be one of {}", PHASE_NAMES.join(", "));
        }
        Ok(())
    }
}

/// Names accepted by `expect.phase`.
pub const PHASE_NAMES: &[&str] = &[
    "idle",
    "starting",
    "active",
    "settling",
    "paused",
    "recovering",
    "completed",
    "failed",
];

fn validate_scenario_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("scenario.id must be non-empty");
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("scenario.id must use [a-z0-9_-] only");
    }
    Ok(())
}
