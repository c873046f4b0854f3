//! Read-only status snapshot for HUDs, logs and the status file.

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;
use crate::orchestrator::{PauseCause, Phase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub tick: i64,
    pub phase: Phase,
    /// `explain()` text of the running goal.
    pub goal: Option<String>,
    pub current_task: Option<String>,
    pub current_task_detail: Option<String>,
    /// Zero-based index into the running task list.
    pub task_index: usize,
    pub task_count: usize,
    pub queued: usize,
    /// Explanations of the next queued goals, at most `queue_preview_limit`.
    pub queue_preview: Vec<String>,
    pub pause_cause: Option<PauseCause>,
    pub backoff_level: u32,
    pub safe_mode: bool,
    pub last_failure: Option<FailureReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: FailureKind,
    pub message: String,
}

impl Status {
    /// One-line queue preview, or `None` when nothing is queued.
    pub fn preview_line(&self) -> Option<String> {
        if self.queued == 0 {
            return None;
        }
        if self.queue_preview.is_empty() {
            return Some("Next: —".to_string());
        }
        Some(format!("Next: {}", self.queue_preview.join(", ")))
    }

    /// Compact single-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        let mut line = format!("tick {} | {}", self.tick, self.phase);
        match (&self.current_task, self.task_count) {
            (Some(task), count) if count > 0 => {
                line.push_str(&format!(" | {task} ({}/{count})", self.task_index + 1));
            }
            _ => line.push_str(" | Task: —"),
        }
        line.push_str(&format!(" | Q:{}", self.queued));
        if let Some(preview) = self.preview_line() {
            line.push_str(&format!(" | {preview}"));
        }
        line
    }
}
