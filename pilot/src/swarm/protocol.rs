//! Versioned, structured swarm message protocol.
//!
//! A message is a single line: `PREFIX` followed by a compact JSON object.
//! Keys are emitted in a fixed order (`v`, `type`, then variant fields) and
//! absent fields are omitted. Decoding fails closed: anything that is not a
//! well-formed payload decodes to `None`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MalformedMessage;

pub const VERSION: u32 = 1;
pub const PREFIX: &str = "swarm2 ";

pub const TYPE_GOTO: &str = "goto";
pub const TYPE_MINE: &str = "mine";
pub const TYPE_STOP: &str = "stop";
pub const TYPE_PAUSE: &str = "pause";
pub const TYPE_RESUME: &str = "resume";
pub const TYPE_RECOVER: &str = "recover";
pub const TYPE_SAFE_MODE: &str = "safe_mode";

/// Allowlisted action payload.
///
/// Variant fields are optional so every action type shares one schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmAction {
    pub v: u32,
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<i32>,
    #[serde(rename = "ignoreY", default, skip_serializing_if = "Option::is_none")]
    pub ignore_y: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<String>>,
}

impl SwarmAction {
    /// Bare action of the current protocol version.
    pub fn new(action_type: &str) -> Self {
        Self {
            v: VERSION,
            action_type: action_type.to_string(),
            x: None,
            y: None,
            z: None,
            ignore_y: None,
            enabled: None,
            blocks: None,
        }
    }
}

/// Serialize an action into a transport string.
pub fn encode(action: &SwarmAction) -> Result<String> {
    let json = serde_json::to_string(action).context("serialize swarm action")?;
    Ok(format!("{PREFIX}{json}"))
}

pub fn go_to(x: i32, y: i32, z: i32, ignore_y: bool) -> Result<String> {
    encode(&SwarmAction {
        x: Some(x),
        y: Some(y),
        z: Some(z),
        ignore_y: Some(ignore_y),
        ..SwarmAction::new(TYPE_GOTO)
    })
}

pub fn mine<S: AsRef<str>>(block_ids: &[S]) -> Result<String> {
    encode(&SwarmAction {
        blocks: Some(block_ids.iter().map(|id| id.as_ref().to_string()).collect()),
        ..SwarmAction::new(TYPE_MINE)
    })
}

pub fn stop() -> Result<String> {
    encode(&SwarmAction::new(TYPE_STOP))
}

pub fn pause() -> Result<String> {
    encode(&SwarmAction::new(TYPE_PAUSE))
}

pub fn resume() -> Result<String> {
    encode(&SwarmAction::new(TYPE_RESUME))
}

pub fn recover() -> Result<String> {
    encode(&SwarmAction::new(TYPE_RECOVER))
}

pub fn safe_mode(enabled: bool) -> Result<String> {
    encode(&SwarmAction {
        enabled: Some(enabled),
        ..SwarmAction::new(TYPE_SAFE_MODE)
    })
}

/// Decode a transport string, returning `None` for any malformed input.
pub fn decode<'a>(message: impl Into<Option<&'a str>>) -> Option<SwarmAction> {
    try_decode(message.into()?).ok()
}

/// Decode a transport string, reporting why it was rejected.
pub fn try_decode(message: &str) -> Result<SwarmAction, MalformedMessage> {
    let payload = message
        .strip_prefix(PREFIX)
        .ok_or(MalformedMessage::MissingPrefix)?
        .trim();
    if payload.is_empty() {
        return Err(MalformedMessage::EmptyPayload);
    }
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| MalformedMessage::InvalidPayload(err.to_string()))?;
    if !value.is_object() {
        return Err(MalformedMessage::NotAnObject);
    }
    let action: SwarmAction = serde_json::from_value(value)
        .map_err(|err| MalformedMessage::InvalidPayload(err.to_string()))?;
    if action.action_type.trim().is_empty() {
        return Err(MalformedMessage::BlankType);
    }
    Ok(action)
}
