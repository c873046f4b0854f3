//! Tick-driven automation orchestrator.
//!
//! One [`Orchestrator::step`] per world tick. Each step drains the command
//! channel, then evaluates the state machine once:
//!
//! ```text
//! Idle ─submit─▶ Starting ─Running─▶ Active ─idle─▶ Settling ─idle × N─▶ next task / Completed
//!                   │  ▲               │ stuck, auto-recover
//!                   │  └─ recovered ── Recovering
//!                   │ timeout          │
//!                   ▼                  ▼
//!          Failed(Unreachable)   Paused(cause) ─cleared─▶ Starting (same task)
//!
//! Both a recovery and a cleared pause re-issue the task at the current
//! index, so the planner has to confirm it is working again before the task
//! can settle.
//! ```
//!
//! Nothing blocks: every wait is a tick counter, and every planner call is
//! made from inside `step` or an explicit control method.

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::agent::{AgentReport, TaskAgent, TaskFailure};
use crate::core::backoff::BackoffState;
use crate::core::goal::{Goal, Task, TaskList};
use crate::error::{FailureKind, RunFailure, SubmitError};
use crate::io::config::AutomationConfig;
use crate::io::planner::{Planner, World};
use crate::swarm::inbox::SwarmInbox;

pub mod command;
pub mod status;

use command::{Command, CommandInbox, Submitter};
use status::{FailureReport, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseCause {
    Manual,
    LowHealth,
    InventoryFull,
}

impl PauseCause {
    pub fn label(self) -> &'static str {
        match self {
            PauseCause::Manual => "manual",
            PauseCause::LowHealth => "low health",
            PauseCause::InventoryFull => "inventory full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    /// Task issued; waiting for the planner to start acting.
    Starting,
    Active,
    /// Planner went idle; counting ticks before the task is considered done.
    Settling,
    Paused(PauseCause),
    Recovering,
    Completed,
    Failed(FailureKind),
}

impl Phase {
    /// No run is in progress.
    pub fn is_idle(self) -> bool {
        matches!(self, Phase::Idle | Phase::Completed | Phase::Failed(_))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("idle"),
            Phase::Starting => f.write_str("starting"),
            Phase::Active => f.write_str("active"),
            Phase::Settling => f.write_str("settling"),
            Phase::Paused(cause) => write!(f, "paused ({})", cause.label()),
            Phase::Recovering => f.write_str("recovering"),
            Phase::Completed => f.write_str("completed"),
            Phase::Failed(kind) => write!(f, "failed ({kind})"),
        }
    }
}

/// Everything the orchestrator talks to, injected at construction.
pub struct AutomationContext<P, W> {
    pub planner: P,
    pub world: W,
    pub config: AutomationConfig,
}

impl<P: Planner, W: World> AutomationContext<P, W> {
    pub fn new(planner: P, world: W, config: AutomationConfig) -> Self {
        Self {
            planner,
            world,
            config,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The goal became the active run.
    Started,
    /// Appended behind the active run; `position` is 1-based.
    Queued { position: usize },
}

/// Observable state changes, collected per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    GoalQueued {
        goal: String,
        position: usize,
    },
    GoalStarted {
        goal: String,
        task_count: usize,
    },
    TaskStarted {
        index: usize,
        task: &'static str,
    },
    TaskCompleted {
        index: usize,
        task: &'static str,
    },
    GoalCompleted {
        goal: String,
    },
    GoalFailed {
        goal: String,
        kind: FailureKind,
        reason: String,
    },
    Paused(PauseCause),
    Resumed,
    RecoveryIssued {
        level: u32,
    },
    RecoveryDeferred {
        remaining_ticks: i64,
    },
    Cancelled,
    Stopped {
        dropped: usize,
    },
    SafeModeChanged(bool),
    SubmissionRejected {
        goal: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub tick: i64,
    pub phase: Phase,
    /// Events since the previous step, including those raised by control
    /// calls made between steps.
    pub events: Vec<RunEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumeInto {
    Reissue,
    Recovering,
}

#[derive(Debug)]
struct Run {
    explain: String,
    tasks: TaskList,
    index: usize,
}

impl Run {
    fn task(&self) -> Option<&Task> {
        self.tasks.get(self.index)
    }
}

pub struct Orchestrator<P, W> {
    ctx: AutomationContext<P, W>,
    agent: TaskAgent,
    inbox: CommandInbox,
    swarm: SwarmInbox,
    phase: Phase,
    run: Option<Run>,
    queue: VecDeque<Goal>,
    idle_ticks: u32,
    start_ticks_left: u32,
    manual_pause: bool,
    resume_into: ResumeInto,
    backoff: BackoffState,
    tick: i64,
    last_failure: Option<RunFailure>,
    events: Vec<RunEvent>,
}

impl<P: Planner, W: World> Orchestrator<P, W> {
    pub fn new(ctx: AutomationContext<P, W>) -> Self {
        let swarm = SwarmInbox::new(ctx.config.swarm.clone());
        Self {
            ctx,
            agent: TaskAgent::new(),
            inbox: CommandInbox::new(),
            swarm,
            phase: Phase::Idle,
            run: None,
            queue: VecDeque::new(),
            idle_ticks: 0,
            start_ticks_left: 0,
            manual_pause: false,
            resume_into: ResumeInto::Reissue,
            backoff: BackoffState::default(),
            tick: 0,
            last_failure: None,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tick(&self) -> i64 {
        self.tick
    }

    pub fn backoff(&self) -> BackoffState {
        self.backoff
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.ctx.config
    }

    pub fn planner(&self) -> &P {
        &self.ctx.planner
    }

    pub fn planner_mut(&mut self) -> &mut P {
        &mut self.ctx.planner
    }

    pub fn world(&self) -> &W {
        &self.ctx.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.ctx.world
    }

    /// Handle for submitting commands from other threads or callbacks.
    pub fn submitter(&self) -> Submitter {
        self.inbox.submitter()
    }

    /// Compile `goal` and start it, or queue it behind the active run.
    #[instrument(skip_all, fields(goal = goal.name()))]
    pub fn submit(&mut self, goal: Goal) -> Result<SubmitOutcome, SubmitError> {
        if !self.ctx.planner.is_ready() {
            let err = SubmitError::PlannerUnavailable;
            warn!("goal rejected: planner unavailable");
            self.events.push(RunEvent::SubmissionRejected {
                goal: goal.explain(),
                reason: err.to_string(),
            });
            return Err(err);
        }
        if self.phase.is_idle() && self.run.is_none() && self.queue.is_empty() {
            self.start_run(goal);
            return Ok(SubmitOutcome::Started);
        }
        let explain = goal.explain();
        self.queue.push_back(goal);
        let position = self.queue.len();
        info!(goal = %explain, position, "goal queued behind active run");
        self.events.push(RunEvent::GoalQueued {
            goal: explain,
            position,
        });
        Ok(SubmitOutcome::Queued { position })
    }

    /// Advance one tick.
    pub fn step(&mut self) -> TickOutcome {
        self.tick += 1;
        for command in self.inbox.drain() {
            self.apply(command);
        }
        self.evaluate();
        TickOutcome {
            tick: self.tick,
            phase: self.phase,
            events: mem::take(&mut self.events),
        }
    }

    /// Feed one raw swarm message through the inbound filter.
    pub fn on_message(&mut self, text: &str) {
        self.on_message_at(text, Instant::now());
    }

    /// Like [`Self::on_message`] with an explicit receive time.
    pub fn on_message_at(&mut self, text: &str, now: Instant) {
        if let Some(command) = self.swarm.accept(text, now) {
            self.apply(command);
        }
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Submit(goal) => {
                if let Err(err) = self.submit(goal) {
                    debug!(error = %err, "queued submission rejected");
                }
            }
            Command::Cancel => self.cancel(),
            Command::Stop => self.stop(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Recover => {
                self.recover_now();
            }
            Command::SafeMode(enabled) => self.set_safe_mode(enabled),
        }
    }

    /// Drop the active run and stop the planner. Queued goals are kept.
    pub fn cancel(&mut self) {
        self.cancel_planner();
        self.agent.clear();
        self.phase = Phase::Idle;
        self.idle_ticks = 0;
        if let Some(run) = self.run.take() {
            info!(goal = %run.explain, "active goal cancelled");
            self.events.push(RunEvent::Cancelled);
        }
    }

    /// Cancel, clear the queue and lift a manual pause.
    pub fn stop(&mut self) {
        let dropped = self.queue.len();
        self.queue.clear();
        self.manual_pause = false;
        self.cancel();
        info!(dropped, "automation stopped");
        self.events.push(RunEvent::Stopped { dropped });
    }

    pub fn pause(&mut self) {
        if !self.manual_pause {
            info!("manual pause requested");
        }
        self.manual_pause = true;
    }

    /// Lift a manual pause. Health and inventory pauses still apply.
    pub fn resume(&mut self) {
        if self.manual_pause {
            info!("manual pause lifted");
        }
        self.manual_pause = false;
    }

    /// One recover attempt, unless the backoff cooldown is still running.
    ///
    /// Returns whether the attempt was issued.
    #[instrument(skip_all, fields(tick = self.tick))]
    pub fn recover_now(&mut self) -> bool {
        let now = self.attempt_tick();
        if self.backoff.is_cooling_down(now) {
            let remaining_ticks = self.backoff.cooldown_ticks() - self.backoff.ticks_since(now);
            info!(remaining_ticks, "recover deferred by cooldown");
            self.events.push(RunEvent::RecoveryDeferred { remaining_ticks });
            return false;
        }
        let issued = self.issue_recovery();
        if self.phase == Phase::Recovering {
            self.reissue_current_task();
        }
        issued
    }

    pub fn set_safe_mode(&mut self, enabled: bool) {
        match self.agent.set_safe_mode(&mut self.ctx.planner, enabled) {
            Ok(()) => {
                info!(enabled, "safe mode changed");
                self.events.push(RunEvent::SafeModeChanged(enabled));
            }
            Err(err) => warn!(error = %err, enabled, "planner rejected safe mode change"),
        }
    }

    pub fn status(&self) -> Status {
        let run = self.run.as_ref();
        let task = run.and_then(Run::task);
        let pause_cause = match self.phase {
            Phase::Paused(cause) => Some(cause),
            _ if self.manual_pause => Some(PauseCause::Manual),
            _ => None,
        };
        Status {
            tick: self.tick,
            phase: self.phase,
            goal: run.map(|run| run.explain.clone()),
            current_task: task.map(|task| task.name().to_string()),
            current_task_detail: task.and_then(Task::detail),
            task_index: run.map_or(0, |run| run.index),
            task_count: run.map_or(0, |run| run.tasks.len()),
            queued: self.queue.len(),
            queue_preview: self
                .queue
                .iter()
                .take(self.ctx.config.queue_preview_limit)
                .map(Goal::explain)
                .collect(),
            pause_cause,
            backoff_level: self.backoff.level,
            safe_mode: self.agent.safe_mode(),
            last_failure: self.last_failure.as_ref().map(|failure| FailureReport {
                kind: failure.kind(),
                message: failure.to_string(),
            }),
        }
    }

    fn evaluate(&mut self) {
        match self.phase {
            Phase::Idle | Phase::Completed | Phase::Failed(_) => {
                if let Some(goal) = self.queue.pop_front() {
                    self.start_run(goal);
                }
            }
            Phase::Starting | Phase::Active | Phase::Settling => {
                if let Some(cause) = self.pause_cause() {
                    self.enter_pause(cause, ResumeInto::Reissue);
                    return;
                }
                let report = self.agent.tick(&mut self.ctx.planner, &self.ctx.world);
                self.handle_report(report);
            }
            Phase::Recovering => {
                if let Some(cause) = self.pause_cause() {
                    self.enter_pause(cause, ResumeInto::Recovering);
                    return;
                }
                if self.backoff.is_cooling_down(self.tick) {
                    return;
                }
                self.issue_recovery();
                if self.phase == Phase::Recovering {
                    self.reissue_current_task();
                }
            }
            Phase::Paused(cause) => self.evaluate_paused(cause),
        }
    }

    fn handle_report(&mut self, report: AgentReport) {
        match report {
            AgentReport::Running => {
                if self.phase != Phase::Active {
                    debug!(from = %self.phase, "planner active");
                }
                self.phase = Phase::Active;
                self.idle_ticks = 0;
            }
            AgentReport::TaskCompleted => self.advance(),
            AgentReport::NothingToDo if self.phase == Phase::Starting => {
                self.start_ticks_left = self.start_ticks_left.saturating_sub(1);
                if self.start_ticks_left == 0 {
                    let failure = RunFailure::Unreachable {
                        task: self.current_task_name(),
                        timeout_ticks: self.ctx.config.unreachable_start_timeout_ticks,
                    };
                    self.fail(failure);
                }
            }
            AgentReport::NothingToDo => {
                self.phase = Phase::Settling;
                self.idle_ticks = self.idle_ticks.saturating_add(1);
                if self.idle_ticks >= self.ctx.config.task_end_idle_ticks {
                    self.advance();
                }
            }
            AgentReport::TaskFailed(TaskFailure::Stuck) => {
                let task = self.current_task_name();
                if self.ctx.config.auto_recover_when_stuck {
                    warn!(task = %task, "planner stuck, recovering");
                    self.phase = Phase::Recovering;
                    self.idle_ticks = 0;
                } else {
                    self.fail(RunFailure::Stuck { task });
                }
            }
            AgentReport::TaskFailed(TaskFailure::Planner(reason)) => {
                let task = self.current_task_name();
                self.fail(RunFailure::Planner { task, reason });
            }
        }
    }

    fn evaluate_paused(&mut self, cause: PauseCause) {
        match self.pause_cause() {
            Some(current) if current != cause => {
                debug!(from = cause.label(), to = current.label(), "pause cause changed");
                self.phase = Phase::Paused(current);
            }
            Some(_) => {}
            None => {
                info!(cause = cause.label(), "pause cleared");
                self.events.push(RunEvent::Resumed);
                match self.resume_into {
                    ResumeInto::Recovering => self.phase = Phase::Recovering,
                    ResumeInto::Reissue => self.reissue_current_task(),
                }
            }
        }
    }

    fn pause_cause(&self) -> Option<PauseCause> {
        let cfg = &self.ctx.config;
        if self.manual_pause {
            return Some(PauseCause::Manual);
        }
        if cfg.pause_on_low_health
            && self
                .ctx
                .world
                .effective_health()
                .is_some_and(|hp| hp <= cfg.low_health_hp_threshold)
        {
            return Some(PauseCause::LowHealth);
        }
        if cfg.pause_on_inventory_full && self.ctx.world.inventory().is_full() {
            return Some(PauseCause::InventoryFull);
        }
        None
    }

    fn enter_pause(&mut self, cause: PauseCause, resume_into: ResumeInto) {
        self.cancel_planner();
        self.phase = Phase::Paused(cause);
        self.resume_into = resume_into;
        self.idle_ticks = 0;
        info!(cause = cause.label(), "automation paused");
        self.events.push(RunEvent::Paused(cause));
    }

    fn start_run(&mut self, goal: Goal) {
        let tasks = goal.compile();
        let explain = goal.explain();
        info!(goal = %explain, tasks = tasks.len(), "goal started");
        self.events.push(RunEvent::GoalStarted {
            goal: explain.clone(),
            task_count: tasks.len(),
        });
        self.run = Some(Run {
            explain,
            tasks,
            index: 0,
        });
        self.start_current_task();
    }

    fn advance(&mut self) {
        if let Some(run) = self.run.as_mut() {
            if let Some(task) = run.task() {
                self.events.push(RunEvent::TaskCompleted {
                    index: run.index,
                    task: task.name(),
                });
            }
            run.index += 1;
        }
        self.start_current_task();
    }

    /// Issue the task at the current index, or complete the run.
    fn start_current_task(&mut self) {
        let Some(run) = self.run.as_ref() else {
            self.phase = Phase::Idle;
            return;
        };
        match run.task().cloned() {
            Some(task) => {
                self.events.push(RunEvent::TaskStarted {
                    index: run.index,
                    task: task.name(),
                });
                self.begin_task(task);
            }
            None => {
                let goal = run.explain.clone();
                info!(goal = %goal, "goal completed");
                self.run = None;
                self.agent.clear();
                self.idle_ticks = 0;
                self.phase = Phase::Completed;
                self.events.push(RunEvent::GoalCompleted { goal });
            }
        }
    }

    /// Issue the current task again without advancing the index.
    fn reissue_current_task(&mut self) {
        match self.run.as_ref().and_then(Run::task).cloned() {
            Some(task) => self.begin_task(task),
            None => self.phase = Phase::Idle,
        }
    }

    fn begin_task(&mut self, task: Task) {
        self.agent.assign(task);
        self.phase = Phase::Starting;
        self.start_ticks_left = self.ctx.config.unreachable_start_timeout_ticks;
        self.idle_ticks = 0;
    }

    fn fail(&mut self, failure: RunFailure) {
        self.cancel_planner();
        self.agent.clear();
        let goal = self.run.take().map(|run| run.explain).unwrap_or_default();
        let kind = failure.kind();
        warn!(goal = %goal, kind = %kind, reason = %failure, "goal failed");
        self.events.push(RunEvent::GoalFailed {
            goal,
            kind,
            reason: failure.to_string(),
        });
        self.phase = Phase::Failed(kind);
        self.idle_ticks = 0;
        self.last_failure = Some(failure);
    }

    /// Records the attempt in the backoff state whether or not the planner
    /// accepted it. Returns whether the planner accepted it.
    fn issue_recovery(&mut self) -> bool {
        let now = self.attempt_tick();
        let result = self.agent.recover(&mut self.ctx.planner);
        self.backoff = self.backoff.after_attempt(now);
        match result {
            Ok(()) => {
                info!(level = self.backoff.level, "recovery issued");
                self.events.push(RunEvent::RecoveryIssued {
                    level: self.backoff.level,
                });
                true
            }
            Err(err) if self.phase == Phase::Recovering => {
                let task = self.current_task_name();
                self.fail(RunFailure::Planner {
                    task,
                    reason: format!("{err:#}"),
                });
                false
            }
            Err(err) => {
                warn!(error = %err, "planner rejected recover");
                false
            }
        }
    }

    /// Tick used for backoff bookkeeping. Tick 0 would read as "never".
    fn attempt_tick(&self) -> i64 {
        self.tick.max(1)
    }

    fn cancel_planner(&mut self) {
        if let Err(err) = self.ctx.planner.cancel_all() {
            warn!(error = %err, "planner cancel failed");
        }
    }

    fn current_task_name(&self) -> String {
        self.run
            .as_ref()
            .and_then(Run::task)
            .map_or("none", Task::name)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BlockFilter, BlockPos};
    use crate::io::planner::InventorySummary;
    use crate::swarm::protocol;
    use crate::test_support::{FakeWorld, PlannerCall, ScriptedPlanner};

    fn orchestrator(config: AutomationConfig) -> Orchestrator<ScriptedPlanner, FakeWorld> {
        Orchestrator::new(AutomationContext::new(
            ScriptedPlanner::default(),
            FakeWorld::default(),
            config,
        ))
    }

    fn goto(safe_mode: bool) -> Goal {
        Goal::SmartGoto {
            pos: BlockPos::new(10, 70, -4),
            ignore_y_hint: false,
            safe_mode,
        }
    }

    fn mine(id: &str) -> Goal {
        Goal::Mine {
            blocks: BlockFilter::new([id]),
            safe_mode: false,
        }
    }

    fn count_calls(
        o: &Orchestrator<ScriptedPlanner, FakeWorld>,
        f: fn(&PlannerCall) -> bool,
    ) -> usize {
        o.planner().calls().iter().filter(|call| f(call)).count()
    }

    #[test]
    fn submit_when_idle_starts_without_planner_calls() {
        let mut o = orchestrator(AutomationConfig::default());
        assert_eq!(o.submit(goto(true)), Ok(SubmitOutcome::Started));
        assert_eq!(o.phase(), Phase::Starting);
        assert!(o.planner().calls().is_empty());

        let status = o.status();
        assert_eq!(status.current_task.as_deref(), Some("Safe Mode: ON"));
        assert_eq!(status.task_count, 2);
        assert_eq!(
            status.goal.as_deref(),
            Some("Enable Safe Mode, then Smart Goto to 10 70 -4")
        );
    }

    #[test]
    fn submit_is_rejected_when_planner_unavailable() {
        let mut o = orchestrator(AutomationConfig::default());
        o.planner_mut().set_ready(false);
        assert_eq!(o.submit(goto(false)), Err(SubmitError::PlannerUnavailable));
        assert_eq!(o.phase(), Phase::Idle);
        assert_eq!(o.status().queued, 0);

        let outcome = o.step();
        assert!(matches!(
            outcome.events.as_slice(),
            [RunEvent::SubmissionRejected { .. }]
        ));
    }

    #[test]
    fn resubmission_appends_to_queue() {
        let mut o = orchestrator(AutomationConfig::default());
        o.submit(goto(false)).expect("first");
        assert_eq!(
            o.submit(mine("minecraft:coal_ore")),
            Ok(SubmitOutcome::Queued { position: 1 })
        );
        assert_eq!(
            o.submit(mine("minecraft:iron_ore")),
            Ok(SubmitOutcome::Queued { position: 2 })
        );
        let status = o.status();
        assert_eq!(status.queued, 2);
        assert_eq!(status.goal.as_deref(), Some("Smart Goto to 10 70 -4"));
        assert_eq!(
            status.preview_line().as_deref(),
            Some("Next: Mine (1 targets), Mine (1 targets)")
        );
    }

    #[test]
    fn safe_goto_runs_to_completion() {
        let mut o = orchestrator(AutomationConfig {
            task_end_idle_ticks: 2,
            ..AutomationConfig::default()
        });
        o.submit(goto(true)).expect("submit");

        let outcome = o.step();
        assert_eq!(outcome.tick, 1);
        assert_eq!(
            outcome.events,
            [
                RunEvent::GoalStarted {
                    goal: "Enable Safe Mode, then Smart Goto to 10 70 -4".to_string(),
                    task_count: 2,
                },
                RunEvent::TaskStarted {
                    index: 0,
                    task: "Safe Mode: ON",
                },
                RunEvent::TaskCompleted {
                    index: 0,
                    task: "Safe Mode: ON",
                },
                RunEvent::TaskStarted {
                    index: 1,
                    task: "Smart Goto",
                },
            ]
        );
        assert_eq!(outcome.phase, Phase::Starting);

        assert_eq!(o.step().phase, Phase::Starting);
        o.planner_mut().set_active(true);
        assert_eq!(o.step().phase, Phase::Active);

        o.planner_mut().set_active(false);
        assert_eq!(o.step().phase, Phase::Settling);
        let outcome = o.step();
        assert_eq!(outcome.phase, Phase::Completed);
        assert!(outcome.events.contains(&RunEvent::GoalCompleted {
            goal: "Enable Safe Mode, then Smart Goto to 10 70 -4".to_string(),
        }));

        assert_eq!(
            o.planner().calls(),
            [
                PlannerCall::SetSafeMode(true),
                PlannerCall::StartGoto {
                    pos: BlockPos::new(10, 70, -4),
                    ignore_y: false,
                    approach_radius: 2,
                },
            ]
        );
        assert!(o.status().safe_mode);
    }

    #[test]
    fn planner_activity_during_settling_returns_to_active() {
        let mut o = orchestrator(AutomationConfig {
            task_end_idle_ticks: 3,
            ..AutomationConfig::default()
        });
        o.submit(mine("minecraft:coal_ore")).expect("submit");
        o.planner_mut().set_active(true);
        assert_eq!(o.step().phase, Phase::Active);
        o.planner_mut().set_active(false);
        o.step();
        o.step();
        assert_eq!(o.phase(), Phase::Settling);
        o.planner_mut().set_active(true);
        assert_eq!(o.step().phase, Phase::Active);
        o.planner_mut().set_active(false);
        o.step();
        o.step();
        assert_eq!(o.phase(), Phase::Settling);
        assert_eq!(o.step().phase, Phase::Completed);
    }

    #[test]
    fn start_timeout_fails_unreachable_and_next_goal_starts() {
        let mut o = orchestrator(AutomationConfig {
            unreachable_start_timeout_ticks: 3,
            ..AutomationConfig::default()
        });
        o.submit(mine("minecraft:diamond_ore")).expect("first");
        o.submit(mine("minecraft:coal_ore")).expect("second");

        assert_eq!(o.step().phase, Phase::Starting);
        assert_eq!(o.step().phase, Phase::Starting);
        let outcome = o.step();
        assert_eq!(outcome.phase, Phase::Failed(FailureKind::Unreachable));
        assert!(outcome.events.iter().any(|event| matches!(
            event,
            RunEvent::GoalFailed {
                kind: FailureKind::Unreachable,
                ..
            }
        )));
        assert_eq!(o.planner().calls().last(), Some(&PlannerCall::CancelAll));

        let status = o.status();
        let failure = status.last_failure.expect("failure recorded");
        assert_eq!(failure.kind, FailureKind::Unreachable);
        assert!(failure.message.contains("no path found"));

        let outcome = o.step();
        assert_eq!(outcome.phase, Phase::Starting);
        assert_eq!(o.status().goal.as_deref(), Some("Mine (1 targets)"));
        assert_eq!(o.status().queued, 0);
    }

    #[test]
    fn low_health_pause_keeps_index_and_reissues_task() {
        let mut o = orchestrator(AutomationConfig::default());
        o.submit(goto(true)).expect("submit");
        o.step();
        o.planner_mut().set_active(true);
        assert_eq!(o.step().phase, Phase::Active);

        o.world_mut().health = Some(4.0);
        let outcome = o.step();
        assert_eq!(outcome.phase, Phase::Paused(PauseCause::LowHealth));
        assert_eq!(outcome.events, [RunEvent::Paused(PauseCause::LowHealth)]);
        assert!(!o.planner().is_active());
        assert_eq!(o.status().task_index, 1);
        assert_eq!(o.status().pause_cause, Some(PauseCause::LowHealth));

        assert_eq!(o.step().phase, Phase::Paused(PauseCause::LowHealth));

        o.world_mut().health = Some(20.0);
        let outcome = o.step();
        assert_eq!(outcome.phase, Phase::Starting);
        assert_eq!(outcome.events, [RunEvent::Resumed]);

        o.planner_mut().set_active(true);
        assert_eq!(o.step().phase, Phase::Active);
        assert_eq!(o.status().task_index, 1);
        let gotos = count_calls(&o, |call| matches!(call, PlannerCall::StartGoto { .. }));
        assert_eq!(gotos, 2);
    }

    #[test]
    fn inventory_full_pause_respects_config() {
        let full = InventorySummary {
            used_slots: 36,
            total_slots: 36,
        };
        let mut o = orchestrator(AutomationConfig::default());
        o.world_mut().inventory = full;
        o.submit(mine("minecraft:iron_ore")).expect("submit");
        assert_eq!(o.step().phase, Phase::Paused(PauseCause::InventoryFull));

        let mut o = orchestrator(AutomationConfig {
            pause_on_inventory_full: false,
            ..AutomationConfig::default()
        });
        o.world_mut().inventory = full;
        o.submit(mine("minecraft:iron_ore")).expect("submit");
        assert_eq!(o.step().phase, Phase::Starting);
    }

    #[test]
    fn manual_pause_through_submitter() {
        let mut o = orchestrator(AutomationConfig::default());
        let submitter = o.submitter();
        submitter.submit(mine("minecraft:coal_ore")).expect("submit");
        submitter.send(Command::Pause).expect("pause");

        let outcome = o.step();
        assert_eq!(outcome.phase, Phase::Paused(PauseCause::Manual));
        assert!(o.planner().calls().iter().all(|call| *call == PlannerCall::CancelAll));

        submitter.send(Command::Resume).expect("resume");
        assert_eq!(o.step().phase, Phase::Starting);
        assert_eq!(o.status().pause_cause, None);
    }

    #[test]
    fn stuck_with_auto_recover_waits_out_cooldown() {
        let mut o = orchestrator(AutomationConfig::default());
        o.submit(goto(false)).expect("submit");
        o.planner_mut().set_active(true);
        assert_eq!(o.step().phase, Phase::Active);

        o.planner_mut().set_stuck(true);
        assert_eq!(o.step().phase, Phase::Recovering);
        let outcome = o.step();
        assert_eq!(outcome.tick, 3);
        assert_eq!(outcome.phase, Phase::Starting);
        assert_eq!(outcome.events, [RunEvent::RecoveryIssued { level: 0 }]);

        assert_eq!(o.step().phase, Phase::Active);
        o.planner_mut().set_stuck(true);
        assert_eq!(o.step().phase, Phase::Recovering);

        // Cooldown at level 0 is 40 ticks from the attempt at tick 3.
        while o.tick() < 42 {
            assert_eq!(o.step().phase, Phase::Recovering);
        }
        let outcome = o.step();
        assert_eq!(outcome.tick, 43);
        assert_eq!(outcome.events, [RunEvent::RecoveryIssued { level: 1 }]);
        assert_eq!(o.status().backoff_level, 1);

        let recovers = count_calls(&o, |call| *call == PlannerCall::Recover);
        let gotos = count_calls(&o, |call| matches!(call, PlannerCall::StartGoto { .. }));
        assert_eq!((recovers, gotos), (2, 2));
        assert_eq!(o.status().task_index, 0);
    }

    #[test]
    fn stuck_without_auto_recover_fails() {
        let mut o = orchestrator(AutomationConfig {
            auto_recover_when_stuck: false,
            ..AutomationConfig::default()
        });
        o.submit(goto(false)).expect("submit");
        o.planner_mut().set_active(true);
        o.planner_mut().set_stuck(true);
        assert_eq!(o.step().phase, Phase::Failed(FailureKind::Stuck));
    }

    #[test]
    fn pause_during_recovery_reissues_the_interrupted_task() {
        let mut o = orchestrator(AutomationConfig {
            task_end_idle_ticks: 2,
            ..AutomationConfig::default()
        });
        o.planner_mut().set_activate_on_start(true);
        o.submit(mine("minecraft:iron_ore")).expect("submit");
        assert_eq!(o.step().phase, Phase::Active);
        o.planner_mut().set_stuck(true);
        assert_eq!(o.step().phase, Phase::Recovering);

        o.pause();
        assert_eq!(o.step().phase, Phase::Paused(PauseCause::Manual));
        assert!(!o.planner().is_active());
        o.resume();
        let outcome = o.step();
        assert_eq!(outcome.phase, Phase::Recovering);
        assert_eq!(outcome.events, [RunEvent::Resumed]);

        let outcome = o.step();
        assert_eq!(outcome.phase, Phase::Starting);
        assert_eq!(outcome.events, [RunEvent::RecoveryIssued { level: 0 }]);
        assert_eq!(o.step().phase, Phase::Active);

        let mines = count_calls(&o, |call| matches!(call, PlannerCall::StartMine(_)));
        assert_eq!(mines, 2);
        assert_eq!(o.status().task_index, 0);
        for _ in 0..5 {
            let outcome = o.step();
            assert_eq!(outcome.phase, Phase::Active);
            assert!(
                !outcome
                    .events
                    .iter()
                    .any(|event| matches!(event, RunEvent::GoalCompleted { .. }))
            );
        }
    }

    #[test]
    fn idle_planner_after_recovery_counts_toward_start_timeout() {
        let mut o = orchestrator(AutomationConfig {
            unreachable_start_timeout_ticks: 3,
            ..AutomationConfig::default()
        });
        o.submit(mine("minecraft:iron_ore")).expect("submit");
        o.planner_mut().set_active(true);
        assert_eq!(o.step().phase, Phase::Active);
        o.planner_mut().set_stuck(true);
        assert_eq!(o.step().phase, Phase::Recovering);
        o.pause();
        o.step();
        o.resume();
        assert_eq!(o.step().phase, Phase::Recovering);
        assert_eq!(o.step().phase, Phase::Starting);

        let mut events = Vec::new();
        for _ in 0..2 {
            let outcome = o.step();
            assert_eq!(outcome.phase, Phase::Starting);
            events.extend(outcome.events);
        }
        let outcome = o.step();
        assert_eq!(outcome.phase, Phase::Failed(FailureKind::Unreachable));
        events.extend(outcome.events);
        assert!(
            !events
                .iter()
                .any(|event| matches!(event, RunEvent::GoalCompleted { .. }))
        );
        assert!(
            !events
                .iter()
                .any(|event| matches!(event, RunEvent::TaskCompleted { .. }))
        );
    }

    #[test]
    fn planner_errors_fail_the_goal() {
        let mut o = orchestrator(AutomationConfig::default());
        o.submit(goto(false)).expect("submit");
        o.planner_mut().fail_next_call("path manager offline");
        let outcome = o.step();
        assert_eq!(outcome.phase, Phase::Failed(FailureKind::Planner));
        let failure = o.status().last_failure.expect("failure");
        assert!(failure.message.contains("path manager offline"));
    }

    #[test]
    fn cancel_keeps_queue_and_stop_clears_it() {
        let mut o = orchestrator(AutomationConfig::default());
        o.submit(goto(false)).expect("a");
        o.submit(mine("minecraft:coal_ore")).expect("b");
        o.submit(mine("minecraft:iron_ore")).expect("c");

        o.cancel();
        assert_eq!(o.phase(), Phase::Idle);
        assert_eq!(o.status().queued, 2);
        assert_eq!(o.planner().calls(), [PlannerCall::CancelAll]);

        let outcome = o.step();
        assert!(outcome.events.contains(&RunEvent::Cancelled));
        assert_eq!(outcome.phase, Phase::Starting);
        assert_eq!(o.status().queued, 1);

        o.stop();
        assert_eq!(o.phase(), Phase::Idle);
        assert_eq!(o.status().queued, 0);
        assert_eq!(o.status().goal, None);
        let outcome = o.step();
        assert!(outcome.events.contains(&RunEvent::Stopped { dropped: 1 }));
        assert_eq!(outcome.phase, Phase::Idle);
    }

    #[test]
    fn swarm_messages_drive_the_orchestrator() {
        let mut o = orchestrator(AutomationConfig::default());
        let now = Instant::now();
        o.on_message_at(&protocol::go_to(1, 64, 1, true).expect("encode"), now);
        assert_eq!(o.phase(), Phase::Starting);
        assert_eq!(
            o.status().current_task_detail.as_deref(),
            Some("1 64 1 (ignore Y)")
        );

        o.on_message_at("swarm2 {not json", now);
        o.on_message_at("chat noise", now);
        assert_eq!(o.phase(), Phase::Starting);

        o.on_message_at(&protocol::stop().expect("encode"), now);
        assert_eq!(o.phase(), Phase::Idle);
    }

    #[test]
    fn recover_now_honors_cooldown() {
        let mut o = orchestrator(AutomationConfig::default());
        o.step();
        assert!(o.recover_now());
        assert!(!o.recover_now());
        let outcome = o.step();
        assert_eq!(
            outcome.events,
            [
                RunEvent::RecoveryIssued { level: 0 },
                RunEvent::RecoveryDeferred {
                    remaining_ticks: 40
                },
            ]
        );
    }

    #[test]
    fn queue_preview_is_capped() {
        let mut o = orchestrator(AutomationConfig {
            queue_preview_limit: 1,
            ..AutomationConfig::default()
        });
        o.submit(goto(false)).expect("a");
        o.submit(mine("minecraft:coal_ore")).expect("b");
        o.submit(goto(true)).expect("c");
        let status = o.status();
        assert_eq!(status.queued, 2);
        assert_eq!(status.queue_preview, ["Mine (1 targets)"]);
    }

    #[test]
    fn phase_display_names_the_cause() {
        assert_eq!(
            Phase::Paused(PauseCause::InventoryFull).to_string(),
            "paused (inventory full)"
        );
        assert_eq!(
            Phase::Failed(FailureKind::Unreachable).to_string(),
            "failed (unreachable)"
        );
    }
}
