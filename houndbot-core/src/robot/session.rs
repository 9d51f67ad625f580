//! src/robot/session.rs
//!
//! Owns exclusive control of one robot: the authenticated link, the
//! lease / e-stop / power triple, and the keepalive loops that keep that
//! control live. `enable` and `disable` are serialized through the
//! resources lock so the triple is never acquired or torn down concurrently.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};
use tracing::{error, info, warn};

use crate::Error;
use crate::robot::{ConnectionStatus, ControlPlane, EstopEndpoint, LeaseToken, RobotCommand};

pub const ESTOP_NAME: &str = "houndbot-payload";
pub const ESTOP_TIMEOUT: Duration = Duration::from_secs(9);

const LEASE_CHECKIN_PERIOD: Duration = Duration::from_secs(1);
const ESTOP_CHECKIN_PERIOD: Duration = Duration::from_secs(3);
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Everything `enable` acquires and `disable` must give back.
#[derive(Default)]
struct Resources {
    lease: Option<LeaseToken>,
    lease_keepalive: Option<JoinHandle<()>>,
    estop: Option<EstopEndpoint>,
    estop_keepalive: Option<JoinHandle<()>>,
    powered: bool,
}

impl Resources {
    fn is_empty(&self) -> bool {
        self.lease.is_none() && self.estop.is_none() && !self.powered
    }
}

pub struct ActuationSession {
    control: Arc<dyn ControlPlane>,
    guid: String,
    secret: String,
    status: StdMutex<ConnectionStatus>,
    resources: Mutex<Resources>,
}

impl ActuationSession {
    pub fn new(
        control: Arc<dyn ControlPlane>,
        guid: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            control,
            guid: guid.into(),
            secret: secret.into(),
            status: StdMutex::new(ConnectionStatus::Disconnected),
            resources: Mutex::new(Resources::default()),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.lock().unwrap().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.status() == ConnectionStatus::Enabled
    }

    fn set_status(&self, status: ConnectionStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Establishes the authenticated link and starts time sync.
    ///
    /// Transport failures are retried indefinitely when `retry` is set,
    /// otherwise surfaced with the session left `Disconnected`. A credential
    /// rejection is fatal and never retried.
    pub async fn connect(&self, retry: bool) -> Result<(), Error> {
        self.set_status(ConnectionStatus::Connecting);
        loop {
            match self.try_connect().await {
                Ok(()) => {
                    self.set_status(ConnectionStatus::Connected);
                    return Ok(());
                }
                Err(Error::Credential(msg)) => {
                    error!("invalid guid '{}' or secret", self.guid);
                    self.set_status(ConnectionStatus::Disconnected);
                    return Err(Error::Credential(msg));
                }
                Err(e) if retry => {
                    error!("could not connect to the robot: {}", e);
                    info!("retrying in {:?}", CONNECT_RETRY_DELAY);
                    sleep(CONNECT_RETRY_DELAY).await;
                }
                Err(e) => {
                    error!("could not connect to the robot: {}", e);
                    self.set_status(ConnectionStatus::Disconnected);
                    return Err(e);
                }
            }
        }
    }

    async fn try_connect(&self) -> Result<(), Error> {
        info!("authenticating payload with guid {}", self.guid);
        self.control.authenticate(&self.guid, &self.secret).await?;
        info!("starting time sync");
        self.control.start_time_sync().await?;
        Ok(())
    }

    /// Acquires the lease, registers the e-stop endpoint (starting both
    /// keepalives), then powers the motors on. Idempotent: resources already
    /// held are not re-acquired, and calling from `Enabled` is a no-op.
    ///
    /// On failure the session stays `Connected`; whatever was acquired stays
    /// held so a later retry only has to finish the remainder.
    pub async fn enable(&self) -> Result<(), Error> {
        match self.status() {
            ConnectionStatus::Disconnected | ConnectionStatus::Connecting => {
                return Err(Error::NotConnected);
            }
            ConnectionStatus::Enabled => return Ok(()),
            _ => {}
        }

        let mut res = self.resources.lock().await;
        if res.powered {
            // A concurrent enable finished while we waited on the lock.
            return Ok(());
        }
        self.set_status(ConnectionStatus::Enabling);

        if res.lease.is_none() {
            info!("acquiring lease");
            let lease = match self.control.acquire_lease().await {
                Ok(l) => l,
                Err(e) => {
                    error!("could not acquire lease: {}", e);
                    self.set_status(ConnectionStatus::Connected);
                    return Err(e);
                }
            };
            res.lease_keepalive = Some(spawn_lease_keepalive(self.control.clone(), lease.clone()));
            res.lease = Some(lease);
        }

        if res.estop.is_none() {
            info!("creating estop endpoint");
            let endpoint = match self.control.register_estop(ESTOP_NAME, ESTOP_TIMEOUT).await {
                Ok(ep) => ep,
                Err(e) => {
                    error!("could not register estop endpoint: {}", e);
                    self.set_status(ConnectionStatus::Connected);
                    return Err(e);
                }
            };
            res.estop_keepalive =
                Some(spawn_estop_keepalive(self.control.clone(), endpoint.clone()));
            res.estop = Some(endpoint);
        }

        info!("powering motors");
        match self.control.power_on().await {
            Ok(()) => {
                res.powered = true;
                self.set_status(ConnectionStatus::Enabled);
                Ok(())
            }
            Err(Error::BatteryMissing) => {
                // Lease and estop stay held; a later enable() retries power-on.
                error!("battery missing");
                self.set_status(ConnectionStatus::Connected);
                Err(Error::BatteryMissing)
            }
            Err(e) => {
                error!("could not power motors: {}", e);
                self.set_status(ConnectionStatus::Connected);
                Err(e)
            }
        }
    }

    /// Best-effort teardown: motors off first, then the e-stop endpoint,
    /// then the lease. Each step's failure is logged and the remaining
    /// releases still run, so exclusive control is never leaked. Safe no-op
    /// when nothing is held.
    pub async fn disable(&self) -> Result<(), Error> {
        let mut res = self.resources.lock().await;
        if res.is_empty() {
            return Ok(());
        }
        self.set_status(ConnectionStatus::Disabling);

        info!("depowering motors");
        if let Err(e) = self.control.power_off().await {
            error!("could not power motors off: {}", e);
        }
        res.powered = false;

        if let Some(handle) = res.estop_keepalive.take() {
            handle.abort();
        }
        if let Some(endpoint) = res.estop.take() {
            info!("releasing estop");
            if let Err(e) = self.control.deregister_estop(endpoint).await {
                error!("could not deregister estop endpoint: {}", e);
            }
        }

        if let Some(handle) = res.lease_keepalive.take() {
            handle.abort();
        }
        if let Some(lease) = res.lease.take() {
            info!("returning lease");
            if let Err(e) = self.control.return_lease(lease).await {
                error!("could not return lease: {}", e);
            }
        }

        self.set_status(ConnectionStatus::Connected);
        Ok(())
    }

    /// Tears everything down and marks the session `Disconnected`. Used on
    /// fatal link loss and at shutdown.
    pub async fn disconnect(&self) {
        let _ = self.disable().await;
        self.set_status(ConnectionStatus::Disconnected);
    }

    pub async fn battery_percent(&self) -> Result<f64, Error> {
        match self.status() {
            ConnectionStatus::Disconnected | ConnectionStatus::Connecting => {
                Err(Error::NotConnected)
            }
            _ => self.control.battery_percent().await,
        }
    }

    pub(crate) async fn send_command(&self, command: RobotCommand) -> Result<(), Error> {
        self.control.send_command(command).await
    }
}

fn spawn_lease_keepalive(control: Arc<dyn ControlPlane>, lease: LeaseToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + LEASE_CHECKIN_PERIOD, LEASE_CHECKIN_PERIOD);
        loop {
            ticker.tick().await;
            if let Err(e) = control.lease_checkin(&lease).await {
                warn!("lease check-in failed: {}", e);
            }
        }
    })
}

fn spawn_estop_keepalive(control: Arc<dyn ControlPlane>, endpoint: EstopEndpoint) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + ESTOP_CHECKIN_PERIOD, ESTOP_CHECKIN_PERIOD);
        loop {
            ticker.tick().await;
            if let Err(e) = control.estop_checkin(&endpoint).await {
                warn!("estop check-in failed: {}", e);
            }
        }
    })
}
