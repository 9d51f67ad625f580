//! tests/crowd_control_tests.rs
//!
//! End-to-end scenarios over the real pipeline: votes in, tally, gate,
//! dispatch against the simulated robot.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use houndbot_core::Error;
use houndbot_core::commands::Movement;
use houndbot_core::robot::session::{ActuationSession, ESTOP_TIMEOUT};
use houndbot_core::robot::sim::SimRobot;
use houndbot_core::robot::{ConnectionStatus, ControlPlane, EstopEndpoint, LeaseToken, RobotCommand};
use houndbot_core::service::CrowdControlService;
use houndbot_core::tasks::spawn_tally_task;
use houndbot_core::votes::VoteAggregator;

async fn enabled_service() -> (Arc<VoteAggregator>, Arc<ActuationSession>, Arc<CrowdControlService>) {
    let sim = Arc::new(SimRobot::new());
    let session = Arc::new(ActuationSession::new(sim, "guid", "secret"));
    session.connect(false).await.unwrap();
    session.enable().await.unwrap();

    let aggregator = Arc::new(VoteAggregator::new());
    let service = CrowdControlService::new(aggregator.clone(), session.clone());
    (aggregator, session, service)
}

#[tokio::test]
async fn majority_vote_drives_the_robot() {
    let (aggregator, _session, service) = enabled_service().await;

    service.propose("a", "forward");
    service.propose("b", "forward");
    service.propose("c", "forward");
    service.propose("d", "sit");

    let winner = aggregator.tick().expect("three-to-one should produce a winner");
    assert_eq!(winner, Movement::Forward);

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    tx.send(winner).await.unwrap();
    drop(tx);
    service.run_winner_loop(rx).await;

    assert_eq!(service.last_command(), Some(Movement::Forward));
}

#[tokio::test]
async fn tie_resolves_deterministically() {
    for _ in 0..20 {
        let aggregator = VoteAggregator::new();
        aggregator.propose("a", "forward");
        aggregator.propose("b", "forward");
        aggregator.propose("c", "backward");
        aggregator.propose("d", "backward");
        assert_eq!(aggregator.tick(), Some(Movement::Backward));
    }
}

#[tokio::test]
async fn paused_winner_is_never_dispatched() {
    let (aggregator, _session, service) = enabled_service().await;

    // Establish a known last command, then pause.
    service.submit_command("stand").await.unwrap();
    assert_eq!(service.last_command(), Some(Movement::Stand));
    service.submit_command("pause").await.unwrap();

    service.propose("a", "forward");
    let winner = aggregator.tick().expect("the vote still tallies while paused");
    assert_eq!(winner, Movement::Forward);

    let (tx, rx) = tokio::sync::mpsc::channel(1);
    tx.send(winner).await.unwrap();
    drop(tx);
    service.run_winner_loop(rx).await;

    // Gate dropped it: stats unchanged.
    assert_eq!(service.last_command(), Some(Movement::Stand));

    // Resume restores dispatch for subsequent winners.
    service.submit_command("resume").await.unwrap();
    service.submit_command("turn_left").await.unwrap();
    assert_eq!(service.last_command(), Some(Movement::TurnLeft));
}

#[tokio::test(start_paused = true)]
async fn tally_task_feeds_the_winner_loop() {
    let (aggregator, _session, service) = enabled_service().await;

    let (winner_tx, winner_rx) = tokio::sync::mpsc::channel(4);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let tally = spawn_tally_task(
        aggregator.clone(),
        Duration::from_secs(1),
        winner_tx,
        shutdown_rx,
    );
    let svc = service.clone();
    let winner_loop = tokio::spawn(async move { svc.run_winner_loop(winner_rx).await });
    // Let the tally task register its interval before the clock moves.
    tokio::task::yield_now().await;

    service.propose("a", "strafe_right");
    service.propose("b", "strafe_right");
    tokio::time::advance(Duration::from_millis(1100)).await;
    // Let the winner make it through the dispatch loop.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(service.last_command(), Some(Movement::StrafeRight));

    shutdown_tx.send(true).unwrap();
    tally.await.unwrap();
    winner_loop.abort();
}

#[tokio::test]
async fn stats_snapshot_reflects_the_pipeline() {
    let (_aggregator, _session, service) = enabled_service().await;

    service.propose("a", "sit");
    service.propose("b", "forward");
    service.submit_command("forward").await.unwrap();

    let stats = service.stats().await;
    assert_eq!(stats.live_votes, 2);
    assert_eq!(stats.last_command, Some(Movement::Forward));
    assert!(stats.battery_percent.is_some());
}

#[tokio::test]
async fn session_survives_power_and_battery_faults() {
    let sim = Arc::new(SimRobot::new());
    let session = Arc::new(ActuationSession::new(sim.clone(), "guid", "secret"));
    session.connect(false).await.unwrap();

    sim.set_battery_missing(true).await;
    assert!(matches!(session.enable().await, Err(Error::BatteryMissing)));
    assert_eq!(session.status(), ConnectionStatus::Connected);
    assert!(sim.lease_held().await);

    sim.set_battery_missing(false).await;
    session.enable().await.unwrap();
    assert!(sim.is_powered().await);

    session.disable().await.unwrap();
    assert!(!sim.is_powered().await);
    assert!(!sim.lease_held().await);
}

// A control plane whose host never answers: every call is a transport error.
struct UnreachableRobot;

#[async_trait]
impl ControlPlane for UnreachableRobot {
    async fn authenticate(&self, _guid: &str, _secret: &str) -> Result<(), Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn start_time_sync(&self) -> Result<(), Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn acquire_lease(&self) -> Result<LeaseToken, Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn lease_checkin(&self, _lease: &LeaseToken) -> Result<(), Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn return_lease(&self, _lease: LeaseToken) -> Result<(), Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn register_estop(
        &self,
        _name: &str,
        _timeout: Duration,
    ) -> Result<EstopEndpoint, Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn estop_checkin(&self, _endpoint: &EstopEndpoint) -> Result<(), Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn deregister_estop(&self, _endpoint: EstopEndpoint) -> Result<(), Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn power_on(&self) -> Result<(), Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn power_off(&self) -> Result<(), Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn send_command(&self, _command: RobotCommand) -> Result<(), Error> {
        Err(Error::Transport("host unreachable".into()))
    }
    async fn battery_percent(&self) -> Result<f64, Error> {
        Err(Error::Transport("host unreachable".into()))
    }
}

#[tokio::test]
async fn connect_against_unreachable_host_stays_disconnected() {
    let session = ActuationSession::new(Arc::new(UnreachableRobot), "guid", "secret");
    assert!(matches!(
        session.connect(false).await,
        Err(Error::Transport(_))
    ));
    assert_eq!(session.status(), ConnectionStatus::Disconnected);
    assert!(matches!(
        session.battery_percent().await,
        Err(Error::NotConnected)
    ));
}

// ESTOP_TIMEOUT is part of the safety contract with the robot; keep it at
// the value the endpoint was registered with on real hardware.
#[test]
fn estop_timeout_is_nine_seconds() {
    assert_eq!(ESTOP_TIMEOUT, Duration::from_secs(9));
}
