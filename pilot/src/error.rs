//! Error taxonomy for automation runs and swarm traffic.
//!
//! Only `MalformedMessage` is ever dropped silently; every other kind reaches
//! the caller through a return value or the status surface.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a run ended in `Phase::Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The planner never started acting before the start timeout.
    Unreachable,
    /// Stuck while auto-recovery is disabled.
    Stuck,
    /// A planner call returned an error.
    Planner,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Unreachable => "unreachable",
            FailureKind::Stuck => "stuck",
            FailureKind::Planner => "planner",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure attached to a run, kept for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunFailure {
    #[error("no path found: {task} did not start within {timeout_ticks} ticks")]
    Unreachable { task: String, timeout_ticks: u32 },
    #[error("stuck during {task}")]
    Stuck { task: String },
    #[error("planner rejected {task}: {reason}")]
    Planner { task: String, reason: String },
}

impl RunFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            RunFailure::Unreachable { .. } => FailureKind::Unreachable,
            RunFailure::Stuck { .. } => FailureKind::Stuck,
            RunFailure::Planner { .. } => FailureKind::Planner,
        }
    }
}

/// Synchronous rejection of a goal submission. No state is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("planner unavailable")]
    PlannerUnavailable,
}

/// Reason a swarm message decoded to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedMessage {
    #[error("missing protocol prefix")]
    MissingPrefix,
    #[error("empty payload")]
    EmptyPayload,
    #[error("payload is not a json object")]
    NotAnObject,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("blank action type")]
    BlankType,
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u32),
    #[error("unknown action type {0:?}")]
    UnknownType(String),
    #[error("{action} action missing {field}")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },
}
