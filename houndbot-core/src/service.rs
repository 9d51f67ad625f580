// src/service.rs
//
// Ties the pieces together: votes in, one gated command out per window,
// plus the stats snapshot the display side polls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::Error;
use crate::commands::{Command, Movement};
use crate::gate::{ControlGate, GateDecision};
use crate::robot::movement::MovementExecutor;
use crate::robot::session::ActuationSession;
use crate::votes::VoteAggregator;

/// Read-only view recomputed on every query; nothing here has its own
/// lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub battery_percent: Option<f64>,
    pub live_votes: usize,
    /// Sticky voter count of the last non-empty window (the original
    /// viewcount display behavior).
    pub viewers: usize,
    pub last_command: Option<Movement>,
    pub taken_at: DateTime<Utc>,
}

pub struct CrowdControlService {
    aggregator: Arc<VoteAggregator>,
    gate: ControlGate,
    executor: MovementExecutor,
    session: Arc<ActuationSession>,
}

impl CrowdControlService {
    pub fn new(aggregator: Arc<VoteAggregator>, session: Arc<ActuationSession>) -> Arc<Self> {
        Arc::new(Self {
            aggregator,
            gate: ControlGate::new(),
            executor: MovementExecutor::new(session.clone()),
            session,
        })
    }

    /// One call per received chat message; the transport strips its marker
    /// before this point. Invalid text is dropped inside the aggregator.
    pub fn propose(&self, voter_id: &str, text: &str) {
        self.aggregator.propose(voter_id, text);
    }

    /// Direct externally-triggered command: `pause`, `resume`, or an ad-hoc
    /// movement bypassing the vote window.
    pub async fn submit_command(&self, text: &str) -> Result<(), Error> {
        let command: Command = text.trim().parse()?;
        self.handle(command).await;
        Ok(())
    }

    async fn handle(&self, command: Command) {
        match self.gate.apply(command) {
            GateDecision::Forward(movement) => {
                // Dispatch failures are already logged and classified; they
                // never escalate past here.
                let _ = self.executor.dispatch(movement).await;
            }
            GateDecision::Blocked(_) | GateDecision::Paused | GateDecision::Resumed => {}
        }
    }

    /// Consumes tally winners until the channel closes. Runs off the timer
    /// task so a slow dispatch never delays the next window.
    pub async fn run_winner_loop(&self, mut winners: mpsc::Receiver<Movement>) {
        while let Some(movement) = winners.recv().await {
            self.handle(Command::Move(movement)).await;
        }
        info!("winner channel closed; dispatch loop ending");
    }

    pub async fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            battery_percent: self.session.battery_percent().await.ok(),
            live_votes: self.aggregator.live_count(),
            viewers: self.aggregator.last_active_count(),
            last_command: self.executor.last_command(),
            taken_at: Utc::now(),
        }
    }

    pub fn last_command(&self) -> Option<Movement> {
        self.executor.last_command()
    }

    pub fn live_vote_count(&self) -> usize {
        self.aggregator.live_count()
    }
}
