//! src/robot/sim.rs
//!
//! In-memory control plane for local runs (`--simulate`) and integration
//! tests. Models the parts of the real control plane the session and
//! executor depend on: credential checking, lease exclusivity, time-sync and
//! power gating, and velocity-command expiry validation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::Error;
use crate::robot::{ControlPlane, EstopEndpoint, LeaseToken, RobotCommand};

#[derive(Default)]
struct SimState {
    authenticated: bool,
    time_synced: bool,
    lease: Option<Uuid>,
    estop: Option<Uuid>,
    powered: bool,
    battery_missing: bool,
    battery: f64,
}

pub struct SimRobot {
    state: Mutex<SimState>,
}

impl SimRobot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                battery: 87.0,
                ..SimState::default()
            }),
        }
    }

    /// Makes subsequent power-on attempts fail with `BatteryMissing`.
    pub async fn set_battery_missing(&self, missing: bool) {
        self.state.lock().await.battery_missing = missing;
    }

    pub async fn set_battery(&self, percent: f64) {
        self.state.lock().await.battery = percent;
    }

    pub async fn is_powered(&self) -> bool {
        self.state.lock().await.powered
    }

    pub async fn lease_held(&self) -> bool {
        self.state.lock().await.lease.is_some()
    }
}

impl Default for SimRobot {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlPlane for SimRobot {
    async fn authenticate(&self, guid: &str, secret: &str) -> Result<(), Error> {
        if guid.is_empty() || secret.is_empty() {
            return Err(Error::Credential("empty guid or secret".into()));
        }
        self.state.lock().await.authenticated = true;
        Ok(())
    }

    async fn start_time_sync(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if !state.authenticated {
            return Err(Error::Transport("not authenticated".into()));
        }
        state.time_synced = true;
        Ok(())
    }

    async fn acquire_lease(&self) -> Result<LeaseToken, Error> {
        let mut state = self.state.lock().await;
        if state.lease.is_some() {
            return Err(Error::InvalidRequest("lease already held".into()));
        }
        let id = Uuid::new_v4();
        state.lease = Some(id);
        Ok(LeaseToken { id })
    }

    async fn lease_checkin(&self, lease: &LeaseToken) -> Result<(), Error> {
        let state = self.state.lock().await;
        if state.lease != Some(lease.id) {
            return Err(Error::InvalidRequest("stale lease".into()));
        }
        Ok(())
    }

    async fn return_lease(&self, lease: LeaseToken) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.lease != Some(lease.id) {
            return Err(Error::InvalidRequest("stale lease".into()));
        }
        state.lease = None;
        Ok(())
    }

    async fn register_estop(&self, name: &str, timeout: Duration) -> Result<EstopEndpoint, Error> {
        let mut state = self.state.lock().await;
        let id = Uuid::new_v4();
        state.estop = Some(id);
        Ok(EstopEndpoint {
            id,
            name: name.to_string(),
            timeout,
        })
    }

    async fn estop_checkin(&self, endpoint: &EstopEndpoint) -> Result<(), Error> {
        let state = self.state.lock().await;
        if state.estop != Some(endpoint.id) {
            return Err(Error::InvalidRequest("unknown estop endpoint".into()));
        }
        Ok(())
    }

    async fn deregister_estop(&self, endpoint: EstopEndpoint) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.estop != Some(endpoint.id) {
            return Err(Error::InvalidRequest("unknown estop endpoint".into()));
        }
        state.estop = None;
        Ok(())
    }

    async fn power_on(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if state.battery_missing {
            return Err(Error::BatteryMissing);
        }
        state.powered = true;
        Ok(())
    }

    async fn power_off(&self) -> Result<(), Error> {
        self.state.lock().await.powered = false;
        Ok(())
    }

    async fn send_command(&self, command: RobotCommand) -> Result<(), Error> {
        let state = self.state.lock().await;
        if !state.time_synced {
            return Err(Error::TimeSync("no established time sync".into()));
        }
        if !state.powered {
            return Err(Error::NotPoweredOn);
        }
        if let RobotCommand::Velocity { end_time, .. } = command {
            if end_time <= Utc::now() {
                return Err(Error::InvalidRequest("command already expired".into()));
            }
        }
        Ok(())
    }

    async fn battery_percent(&self) -> Result<f64, Error> {
        Ok(self.state.lock().await.battery)
    }
}
