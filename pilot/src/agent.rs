//! Task Agent: executes one primitive task at a time against the planner.
//!
//! The agent issues its task on the first tick after assignment and then
//! reports what the planner is doing. Pause, timeout and retry policy belong
//! to the orchestrator.

use tracing::{debug, instrument};

use crate::core::goal::Task;
use crate::core::goto_decision;
use crate::io::planner::{Planner, World};

/// Per-tick progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentReport {
    /// The planner is working on the current task.
    Running,
    /// An instant task finished on this tick.
    TaskCompleted,
    TaskFailed(TaskFailure),
    /// No task, or the planner is idle.
    NothingToDo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    Stuck,
    /// A planner call returned an error.
    Planner(String),
}

#[derive(Debug, Default)]
pub struct TaskAgent {
    task: Option<Task>,
    issued: bool,
    safe_mode: bool,
}

impl TaskAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current task. It is issued on the next `tick`.
    pub fn assign(&mut self, task: Task) {
        debug!(task = task.name(), "task assigned");
        self.task = Some(task);
        self.issued = false;
    }

    pub fn clear(&mut self) {
        self.task = None;
        self.issued = false;
    }

    pub fn current(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// Safe-mode flag last applied to the planner.
    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    pub fn tick<P: Planner, W: World>(&mut self, planner: &mut P, world: &W) -> AgentReport {
        let Some(task) = self.task.clone() else {
            return AgentReport::NothingToDo;
        };
        if !self.issued {
            self.issued = true;
            if let Err(err) = self.issue(&task, planner, world) {
                return AgentReport::TaskFailed(TaskFailure::Planner(format!("{err:#}")));
            }
            if task.is_instant() {
                self.clear();
                return AgentReport::TaskCompleted;
            }
        }
        observe(planner)
    }

    /// One planner recover call. No retry.
    pub fn recover<P: Planner>(&mut self, planner: &mut P) -> anyhow::Result<()> {
        planner.recover()
    }

    pub fn set_safe_mode<P: Planner>(
        &mut self,
        planner: &mut P,
        enabled: bool,
    ) -> anyhow::Result<()> {
        planner.set_safe_mode(enabled)?;
        self.safe_mode = enabled;
        Ok(())
    }

    #[instrument(skip_all, fields(task = task.name()))]
    fn issue<P: Planner, W: World>(
        &mut self,
        task: &Task,
        planner: &mut P,
        world: &W,
    ) -> anyhow::Result<()> {
        match task {
            Task::Recover => self.recover(planner),
            Task::SafeModeOn => self.set_safe_mode(planner, true),
            Task::SmartGoto { pos, ignore_y_hint } => {
                let decision = goto_decision::decide(
                    *ignore_y_hint,
                    world.player_y(),
                    pos.y,
                    self.safe_mode,
                    world.is_hazardous(*pos),
                );
                debug!(
                    target = %pos,
                    ignore_y = decision.ignore_y,
                    approach_radius = decision.approach_radius,
                    "starting smart goto"
                );
                planner.start_goal_and_path(*pos, decision.ignore_y, decision.approach_radius)
            }
            Task::Mine { blocks } => {
                debug!(targets = blocks.len(), "starting mine");
                planner.start_mine(blocks)
            }
        }
    }
}

fn observe<P: Planner>(planner: &P) -> AgentReport {
    if planner.is_stuck() {
        AgentReport::TaskFailed(TaskFailure::Stuck)
    } else if planner.is_active() {
        AgentReport::Running
    } else {
        AgentReport::NothingToDo
    }
}
