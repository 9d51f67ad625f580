// src/config.rs

use std::path::Path;

use serde::Deserialize;

use crate::Error;

/// Mirrors the `config.yaml` layout:
///
/// ```yaml
/// connection:
///   host: 192.168.80.3
///   name: hound
/// payload:
///   guid: ...
///   secret: ...
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub payload: PayloadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadConfig {
    pub guid: String,
    pub secret: String,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}
