//! src/robot/movement.rs
//!
//! Turns a winning movement into one time-bounded actuation request.
//! Postures (sit/stand) are unbounded; velocity verbs carry a hard expiry so
//! motion never continues past a dropped window.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, info, warn};

use crate::Error;
use crate::commands::Movement;
use crate::robot::RobotCommand;
use crate::robot::session::ActuationSession;

pub const VELOCITY_BASE_SPEED: f64 = 0.5;
pub const VELOCITY_BASE_ANGULAR: f64 = 0.8;
pub const VELOCITY_CMD_DURATION_MS: i64 = 600;

pub struct MovementExecutor {
    session: Arc<ActuationSession>,
    last_command: Mutex<Option<Movement>>,
}

impl MovementExecutor {
    pub fn new(session: Arc<ActuationSession>) -> Self {
        Self {
            session,
            last_command: Mutex::new(None),
        }
    }

    /// Issues `movement` through the session. Requires the session to be
    /// enabled; all four recoverable actuation failures (transport, invalid
    /// request, time sync, motors off) are logged and the command dropped.
    /// None of them touches the session state.
    pub async fn dispatch(&self, movement: Movement) -> Result<(), Error> {
        if !self.session.is_enabled() {
            warn!("dropping '{}': movement is not enabled", movement);
            return Err(Error::NotEnabled);
        }

        let command = build_command(movement, Utc::now());
        info!("sending command {}", movement);
        match self.session.send_command(command).await {
            Ok(()) => {
                *self.last_command.lock().unwrap() = Some(movement);
                Ok(())
            }
            Err(e) => {
                match &e {
                    Error::Transport(_) => error!("problem communicating with the robot: {}", e),
                    Error::InvalidRequest(_) => error!("invalid request: {}", e),
                    Error::TimeSync(_) => error!("too long since the last time sync: {}", e),
                    Error::NotPoweredOn => error!("motors are not powered"),
                    other => error!("command '{}' failed: {}", movement, other),
                }
                Err(e)
            }
        }
    }

    /// The last movement that was actually issued to the robot.
    pub fn last_command(&self) -> Option<Movement> {
        *self.last_command.lock().unwrap()
    }
}

/// Builds the wire command for `movement`. Velocity commands expire at
/// `issued_at` + the fixed duration, which is always strictly in the future.
fn build_command(movement: Movement, issued_at: DateTime<Utc>) -> RobotCommand {
    let end_time = issued_at + TimeDelta::milliseconds(VELOCITY_CMD_DURATION_MS);
    let velocity = |v_x: f64, v_y: f64, v_rot: f64| RobotCommand::Velocity {
        v_x,
        v_y,
        v_rot,
        end_time,
    };
    match movement {
        Movement::Sit => RobotCommand::Sit,
        Movement::Stand => RobotCommand::Stand,
        Movement::Forward => velocity(VELOCITY_BASE_SPEED, 0.0, 0.0),
        Movement::Backward => velocity(-VELOCITY_BASE_SPEED, 0.0, 0.0),
        Movement::StrafeLeft => velocity(0.0, VELOCITY_BASE_SPEED, 0.0),
        Movement::StrafeRight => velocity(0.0, -VELOCITY_BASE_SPEED, 0.0),
        Movement::TurnLeft => velocity(0.0, 0.0, VELOCITY_BASE_ANGULAR),
        Movement::TurnRight => velocity(0.0, 0.0, -VELOCITY_BASE_ANGULAR),
    }
}
