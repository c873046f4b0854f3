//! Declarative automation goals and their compilation into primitive tasks.
//!
//! Compilation is deterministic and side-effect free: the same goal always
//! yields the same ordered task list. Recover (when requested) comes first,
//! Safe Mode (when requested) comes before the primary action, and nothing
//! reorders the list after compilation.

use serde::{Deserialize, Serialize};

use crate::core::types::{BlockFilter, BlockPos};

/// Declarative automation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Goal {
    SmartGoto {
        pos: BlockPos,
        #[serde(default)]
        ignore_y_hint: bool,
        #[serde(default)]
        safe_mode: bool,
    },
    RecoverThenSmartGoto {
        pos: BlockPos,
        #[serde(default)]
        ignore_y_hint: bool,
        #[serde(default)]
        safe_mode: bool,
    },
    Mine {
        blocks: BlockFilter,
        #[serde(default)]
        safe_mode: bool,
    },
    RecoverThenMine {
        blocks: BlockFilter,
        #[serde(default)]
        safe_mode: bool,
    },
}

impl Goal {
    /// Short display name for menus and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Goal::SmartGoto { .. } => "Smart Goto",
            Goal::RecoverThenSmartGoto { .. } => "Recover + Smart Goto",
            Goal::Mine { .. } => "Mine",
            Goal::RecoverThenMine { .. } => "Recover + Mine",
        }
    }

    pub fn safe_mode(&self) -> bool {
        match self {
            Goal::SmartGoto { safe_mode, .. }
            | Goal::RecoverThenSmartGoto { safe_mode, .. }
            | Goal::Mine { safe_mode, .. }
            | Goal::RecoverThenMine { safe_mode, .. } => *safe_mode,
        }
    }

    fn recovers_first(&self) -> bool {
        matches!(
            self,
            Goal::RecoverThenSmartGoto { .. } | Goal::RecoverThenMine { .. }
        )
    }

    /// Human-readable summary of the compiled intent. Never blank.
    pub fn explain(&self) -> String {
        let mut buf = String::new();
        if self.recovers_first() {
            buf.push_str("Recover, then ");
        }
        if self.safe_mode() {
            buf.push_str(if buf.is_empty() {
                "Enable Safe Mode, then "
            } else {
                "enable Safe Mode, then "
            });
        }
        match self {
            Goal::SmartGoto { pos, .. } | Goal::RecoverThenSmartGoto { pos, .. } => {
                buf.push_str(&format!("Smart Goto to {pos}"));
            }
            Goal::Mine { blocks, .. } | Goal::RecoverThenMine { blocks, .. } => {
                buf.push_str(&format!("Mine ({} targets)", blocks.len()));
            }
        }
        buf
    }

    /// Compile into the ordered primitive task list.
    pub fn compile(&self) -> TaskList {
        let mut tasks = Vec::with_capacity(3);
        if self.recovers_first() {
            tasks.push(Task::Recover);
        }
        if self.safe_mode() {
            tasks.push(Task::SafeModeOn);
        }
        match self {
            Goal::SmartGoto {
                pos, ignore_y_hint, ..
            }
            | Goal::RecoverThenSmartGoto {
                pos, ignore_y_hint, ..
            } => tasks.push(Task::SmartGoto {
                pos: *pos,
                ignore_y_hint: *ignore_y_hint,
            }),
            Goal::Mine { blocks, .. } | Goal::RecoverThenMine { blocks, .. } => {
                tasks.push(Task::Mine {
                    blocks: blocks.clone(),
                });
            }
        }
        TaskList(tasks)
    }
}

/// Task discriminant, useful for matching without the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Recover,
    SafeModeOn,
    SmartGoto,
    Mine,
}

/// One primitive, ordered step produced by compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Recover,
    SafeModeOn,
    SmartGoto { pos: BlockPos, ignore_y_hint: bool },
    Mine { blocks: BlockFilter },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Recover => "Recover",
            Task::SafeModeOn => "Safe Mode: ON",
            Task::SmartGoto { .. } => "Smart Goto",
            Task::Mine { .. } => "Mine",
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Recover => TaskKind::Recover,
            Task::SafeModeOn => TaskKind::SafeModeOn,
            Task::SmartGoto { .. } => TaskKind::SmartGoto,
            Task::Mine { .. } => TaskKind::Mine,
        }
    }

    /// Instant tasks finish within the tick they are issued.
    pub fn is_instant(&self) -> bool {
        matches!(self, Task::Recover | Task::SafeModeOn)
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            Task::Recover | Task::SafeModeOn => None,
            Task::SmartGoto { pos, ignore_y_hint } => Some(if *ignore_y_hint {
                format!("{pos} (ignore Y)")
            } else {
                pos.to_string()
            }),
            Task::Mine { blocks } => Some(blocks.ids().join(", ")),
        }
    }
}

/// Compiled, read-only task sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskList(Vec<Task>);

impl TaskList {
    pub fn get(&self, index: usize) -> Option<&Task> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(Task::name).collect()
    }
}

impl<'a> IntoIterator for &'a TaskList {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
