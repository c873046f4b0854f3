//! Inbound swarm message filtering.
//!
//! Raw transport lines pass through token unwrapping, a duplicate guard, the
//! decoder and a rate limit before they become commands. Every rejection is
//! logged and dropped; nothing here reaches the caller as an error.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::io::config::SwarmConfig;
use crate::orchestrator::command::Command;
use crate::swarm::{action_to_command, protocol};

/// Marker for the `swarm|TOKEN|payload` wrapper.
pub const TOKEN_WRAPPER_PREFIX: &str = "swarm|";
/// Recent payloads remembered by the duplicate guard.
pub const RECENT_PAYLOADS_MAX: usize = 32;

const RATE_WINDOW: Duration = Duration::from_secs(1);
const LOG_PREVIEW_CHARS: usize = 160;

/// Stateful filter owned by whoever reads the transport.
#[derive(Debug)]
pub struct SwarmInbox {
    config: SwarmConfig,
    recent: VecDeque<(String, Instant)>,
    rate_window_start: Option<Instant>,
    rate_count: u32,
}

impl SwarmInbox {
    pub fn new(config: SwarmConfig) -> Self {
        Self {
            config,
            recent: VecDeque::with_capacity(RECENT_PAYLOADS_MAX),
            rate_window_start: None,
            rate_count: 0,
        }
    }

    /// Filter one raw message received at `now`.
    pub fn accept(&mut self, raw: &str, now: Instant) -> Option<Command> {
        let payload = self.unwrap_token(raw)?;

        if self.is_duplicate(payload, now) {
            warn!(payload = %preview(payload), "swarm message blocked (duplicate)");
            return None;
        }

        let action = match protocol::try_decode(payload) {
            Ok(action) => action,
            Err(err) => {
                debug!(error = %err, payload = %preview(payload), "ignoring malformed swarm message");
                return None;
            }
        };

        if !self.rate_limit_ok(now) {
            warn!(action = %action.action_type, "swarm action blocked (rate limit)");
            return None;
        }

        match action_to_command(&action) {
            Ok(command) => {
                debug!(action = %action.action_type, "swarm action accepted");
                Some(command)
            }
            Err(err) => {
                warn!(error = %err, "swarm action rejected");
                None
            }
        }
    }

    fn unwrap_token<'a>(&self, raw: &'a str) -> Option<&'a str> {
        if let Some((token, payload)) = raw
            .strip_prefix(TOKEN_WRAPPER_PREFIX)
            .and_then(|rest| rest.split_once('|'))
        {
            if self.config.require_token && token != self.config.token {
                warn!("swarm message rejected (invalid token)");
                return None;
            }
            return Some(payload);
        }
        if self.config.require_token {
            warn!("swarm message rejected (missing token)");
            return None;
        }
        Some(raw)
    }

    /// Records `payload` unless it repeats one seen inside the window.
    fn is_duplicate(&mut self, payload: &str, now: Instant) -> bool {
        let window = Duration::from_millis(self.config.duplicate_window_ms);
        let repeated = self
            .recent
            .iter()
            .any(|(seen, at)| seen == payload && now.saturating_duration_since(*at) <= window);
        if repeated {
            return true;
        }
        if self.recent.len() == RECENT_PAYLOADS_MAX {
            self.recent.pop_front();
        }
        self.recent.push_back((payload.to_string(), now));
        false
    }

    fn rate_limit_ok(&mut self, now: Instant) -> bool {
        let expired = self
            .rate_window_start
            .is_none_or(|start| now.saturating_duration_since(start) >= RATE_WINDOW);
        if expired {
            self.rate_window_start = Some(now);
            self.rate_count = 0;
        }
        self.rate_count = self.rate_count.saturating_add(1);
        self.rate_count <= self.config.commands_per_second.max(1)
    }
}

fn preview(payload: &str) -> String {
    if payload.chars().count() <= LOG_PREVIEW_CHARS {
        return payload.to_string();
    }
    let mut out: String = payload.chars().take(LOG_PREVIEW_CHARS).collect();
    out.push('…');
    out
}
