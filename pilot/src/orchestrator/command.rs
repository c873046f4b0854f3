//! Commands accepted by the orchestrator, locally or through the submission
//! channel.

use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

use anyhow::{Result, anyhow};

use crate::core::goal::Goal;

/// One request for the orchestrator. Swarm actions decode into these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Compile and run (or queue) a goal.
    Submit(Goal),
    /// Discard the active run; keep the queue.
    Cancel,
    /// Discard the active run and every queued goal.
    Stop,
    Pause,
    Resume,
    /// One recovery attempt, subject to the backoff cooldown.
    Recover,
    SafeMode(bool),
}

/// Cloneable handle for submitting commands from outside the tick loop.
///
/// Commands are drained once at the start of each orchestrator tick, in the
/// order they were sent.
#[derive(Debug, Clone)]
pub struct Submitter {
    tx: Sender<Command>,
}

impl Submitter {
    pub fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("orchestrator dropped its command inbox"))
    }

    pub fn submit(&self, goal: Goal) -> Result<()> {
        self.send(Command::Submit(goal))
    }
}

/// Receiving half owned by the orchestrator.
#[derive(Debug)]
pub(crate) struct CommandInbox {
    rx: Receiver<Command>,
    tx: Sender<Command>,
}

impl CommandInbox {
    pub(crate) fn new() -> Self {
        let (tx, rx) = channel();
        Self { rx, tx }
    }

    pub(crate) fn submitter(&self) -> Submitter {
        Submitter {
            tx: self.tx.clone(),
        }
    }

    /// Everything sent so far, in send order.
    pub(crate) fn drain(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(command) => commands.push(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        commands
    }
}
