//! Swarm coordination: wire protocol and inbound message filtering.
//!
//! Decoded actions become the same [`Command`]s a local caller would issue, so a
//! received `goto` and a locally submitted smart goto compile to identical task
//! lists.

use crate::core::goal::Goal;
use crate::core::types::{BlockFilter, BlockPos};
use crate::error::MalformedMessage;
use crate::orchestrator::command::Command;

pub mod inbox;
pub mod protocol;

use protocol::SwarmAction;

/// Validate a decoded action and convert it into an orchestrator command.
pub fn action_to_command(action: &SwarmAction) -> Result<Command, MalformedMessage> {
    if action.v != protocol::VERSION {
        return Err(MalformedMessage::UnsupportedVersion(action.v));
    }
    match action.action_type.as_str() {
        protocol::TYPE_GOTO => {
            let (Some(x), Some(y), Some(z)) = (action.x, action.y, action.z) else {
                return Err(MalformedMessage::MissingField {
                    action: protocol::TYPE_GOTO,
                    field: "x/y/z",
                });
            };
            Ok(Command::Submit(Goal::SmartGoto {
                pos: BlockPos::new(x, y, z),
                ignore_y_hint: action.ignore_y.unwrap_or(false),
                safe_mode: false,
            }))
        }
        protocol::TYPE_MINE => {
            let blocks = action
                .blocks
                .as_ref()
                .map(|ids| BlockFilter::new(ids.iter().filter(|id| !id.trim().is_empty()).cloned()))
                .unwrap_or_default();
            if blocks.is_empty() {
                return Err(MalformedMessage::MissingField {
                    action: protocol::TYPE_MINE,
                    field: "blocks",
                });
            }
            Ok(Command::Submit(Goal::Mine {
                blocks,
                safe_mode: false,
            }))
        }
        protocol::TYPE_STOP => Ok(Command::Stop),
        protocol::TYPE_PAUSE => Ok(Command::Pause),
        protocol::TYPE_RESUME => Ok(Command::Resume),
        protocol::TYPE_RECOVER => Ok(Command::Recover),
        protocol::TYPE_SAFE_MODE => action
            .enabled
            .map(Command::SafeMode)
            .ok_or(MalformedMessage::MissingField {
                action: protocol::TYPE_SAFE_MODE,
                field: "enabled",
            }),
        other => Err(MalformedMessage::UnknownType(other.to_string())),
    }
}

/// Decode a transport string straight into a command.
pub fn decode_command(message: &str) -> Result<Command, MalformedMessage> {
    let action = protocol::try_decode(message)?;
    action_to_command(&action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goto_becomes_plain_smart_goto_goal() {
        let msg = protocol::go_to(5, 70, -9, true).expect("encode");
        let command = decode_command(&msg).expect("command");
        let local = Goal::SmartGoto {
            pos: BlockPos::new(5, 70, -9),
            ignore_y_hint: true,
            safe_mode: false,
        };
        assert_eq!(command, Command::Submit(local.clone()));
        let Command::Submit(remote) = command else {
            unreachable!()
        };
        assert_eq!(remote.compile(), local.compile());
    }

    #[test]
    fn mine_keeps_block_order() {
        let msg = protocol::mine(&["minecraft:gold_ore", "minecraft:coal_ore"]).expect("encode");
        let command = decode_command(&msg).expect("command");
        assert_eq!(
            command,
            Command::Submit(Goal::Mine {
                blocks: BlockFilter::new(["minecraft:gold_ore", "minecraft:coal_ore"]),
                safe_mode: false,
            })
        );
    }

    #[test]
    fn mine_without_usable_blocks_is_malformed() {
        let msg = protocol::mine::<&str>(&[]).expect("encode");
        assert!(matches!(
            decode_command(&msg),
            Err(MalformedMessage::MissingField { field: "blocks", .. })
        ));
        let msg = protocol::mine(&["  "]).expect("encode");
        assert!(decode_command(&msg).is_err());
    }

    #[test]
    fn goto_without_coordinates_is_malformed() {
        let msg = format!("{}{{\"v\":1,\"type\":\"goto\",\"x\":1}}", protocol::PREFIX);
        assert!(matches!(
            decode_command(&msg),
            Err(MalformedMessage::MissingField { action: "goto", .. })
        ));
    }

    #[test]
    fn control_actions_map_to_commands() {
        let cases = [
            (protocol::stop(), Command::Stop),
            (protocol::pause(), Command::Pause),
            (protocol::resume(), Command::Resume),
            (protocol::recover(), Command::Recover),
            (protocol::safe_mode(true), Command::SafeMode(true)),
        ];
        for (msg, expected) in cases {
            assert_eq!(decode_command(&msg.expect("encode")), Ok(expected));
        }
    }

    #[test]
    fn version_mismatch_and_unknown_types_are_rejected() {
        let future = format!("{}{{\"v\":2,\"type\":\"stop\"}}", protocol::PREFIX);
        assert_eq!(
            decode_command(&future),
            Err(MalformedMessage::UnsupportedVersion(2))
        );
        let unknown = format!("{}{{\"v\":1,\"type\":\"self_destruct\"}}", protocol::PREFIX);
        assert_eq!(
            decode_command(&unknown),
            Err(MalformedMessage::UnknownType("self_destruct".to_string()))
        );
    }
}
