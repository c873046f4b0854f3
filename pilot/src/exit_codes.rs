//! Stable exit codes for `pilot` CLI commands.

/// Command succeeded; a simulated scenario met its expectations.
pub const OK: i32 = 0;
/// Invalid arguments, config, scenario or goal JSON, or an I/O error.
pub const INVALID: i32 = 1;
/// `pilot simulate` ran but the scenario's expectations were not met.
pub const FAILED: i32 = 2;
/// `pilot decode` input is not a well-formed swarm message.
pub const MALFORMED: i32 = 3;
