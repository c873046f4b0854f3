//! Tick-driven automation orchestrator with a versioned swarm protocol.
//!
//! Callers submit declarative goals ("walk here safely", "mine these blocks").
//! Each goal compiles into an ordered list of primitive tasks that an
//! orchestrator drives against an external pathfinding planner, one world tick
//! at a time, pausing, timing out and recovering along the way. Peers in a
//! swarm send the same goals as versioned one-line messages.
//!
//! - **[`core`]**: Pure, deterministic logic (backoff policy, goto decision,
//!   goal compilation). No I/O, fully testable in isolation.
//! - **[`io`]**: Collaborator traits (planner, world) and file-backed state
//!   (config, status snapshots, scenarios).
//! - **[`swarm`]**: Message codec and inbound filtering.
//!
//! [`orchestrator`] and [`agent`] tie core logic to the collaborators;
//! [`simulate`] runs scripted scenarios for the CLI.

pub mod agent;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrator;
pub mod simulate;
pub mod swarm;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
