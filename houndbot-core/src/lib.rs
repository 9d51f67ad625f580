// src/lib.rs

pub mod commands;
pub mod config;
pub mod error;
pub mod gate;
pub mod robot;
pub mod service;
pub mod tasks;
pub mod votes;

pub use error::Error;
