// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Link-level failure talking to the robot (RPC dropped, host unreachable).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Payload guid/secret rejected by the robot. Never retried.
    #[error("Invalid payload credentials: {0}")]
    Credential(String),

    /// Too long since the last time sync; time-bounded commands are refused.
    #[error("Time sync not established: {0}")]
    TimeSync(String),

    #[error("Motors are not powered on")]
    NotPoweredOn,

    #[error("Battery missing")]
    BatteryMissing,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not connected to the robot")]
    NotConnected,

    #[error("Movement is not enabled")]
    NotEnabled,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
