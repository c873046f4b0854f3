//! I/O seams: collaborator traits and file-backed state.

pub mod config;
pub mod planner;
pub mod scenario;
pub mod status_store;
