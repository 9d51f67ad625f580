// src/gate.rs

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::commands::{Command, Movement};

/// What the gate decided; the caller performs the dispatch so pause/resume
/// handling stays free of actuation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Paused,
    Resumed,
    Forward(Movement),
    Blocked(Movement),
}

/// Pause/resume switch between the vote winner and the executor. Blocking
/// happens here only; vote collection is never affected.
pub struct ControlGate {
    // Relaxed is fine: a read stale by one tally interval is acceptable.
    movement_allowed: AtomicBool,
}

impl ControlGate {
    pub fn new() -> Self {
        Self {
            movement_allowed: AtomicBool::new(true),
        }
    }

    pub fn is_open(&self) -> bool {
        self.movement_allowed.load(Ordering::Relaxed)
    }

    pub fn apply(&self, command: Command) -> GateDecision {
        match command {
            Command::Pause => {
                info!("movement paused");
                self.movement_allowed.store(false, Ordering::Relaxed);
                GateDecision::Paused
            }
            Command::Resume => {
                info!("movement resumed");
                self.movement_allowed.store(true, Ordering::Relaxed);
                GateDecision::Resumed
            }
            Command::Move(movement) if self.is_open() => GateDecision::Forward(movement),
            Command::Move(movement) => {
                debug!("movement is paused; dropping '{}'", movement);
                GateDecision::Blocked(movement)
            }
        }
    }
}

impl Default for ControlGate {
    fn default() -> Self {
        Self::new()
    }
}
