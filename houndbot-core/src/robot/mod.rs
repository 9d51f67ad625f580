// File: src/robot/mod.rs

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Enabling,
    Enabled,
    Disabling,
}

/// Exclusive-control token granted by the robot's control plane. Only the
/// holder may issue motion and power commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseToken {
    pub id: Uuid,
}

/// A registered emergency-stop endpoint. The robot halts on its own if
/// check-ins stop arriving within `timeout`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstopEndpoint {
    pub id: Uuid,
    pub name: String,
    pub timeout: Duration,
}

/// A fully built actuation request, ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RobotCommand {
    Sit,
    Stand,
    /// Planar velocity with a hard deadline after which the robot stops the
    /// motion by itself, even if no further command arrives.
    Velocity {
        v_x: f64,
        v_y: f64,
        v_rot: f64,
        end_time: DateTime<Utc>,
    },
}

/// The vendor-SDK boundary. Everything the session and executor need from
/// the robot goes through this trait so tests can swap in a mock and local
/// runs can use the simulator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn authenticate(&self, guid: &str, secret: &str) -> Result<(), Error>;
    async fn start_time_sync(&self) -> Result<(), Error>;

    async fn acquire_lease(&self) -> Result<LeaseToken, Error>;
    async fn lease_checkin(&self, lease: &LeaseToken) -> Result<(), Error>;
    async fn return_lease(&self, lease: LeaseToken) -> Result<(), Error>;

    async fn register_estop(&self, name: &str, timeout: Duration) -> Result<EstopEndpoint, Error>;
    async fn estop_checkin(&self, endpoint: &EstopEndpoint) -> Result<(), Error>;
    async fn deregister_estop(&self, endpoint: EstopEndpoint) -> Result<(), Error>;

    async fn power_on(&self) -> Result<(), Error>;
    async fn power_off(&self) -> Result<(), Error>;

    async fn send_command(&self, command: RobotCommand) -> Result<(), Error>;
    async fn battery_percent(&self) -> Result<f64, Error>;
}

// Re-export submodules
pub mod movement;
pub mod session;
pub mod sim;
