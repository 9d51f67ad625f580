use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use houndbot_core::config::AppConfig;
use houndbot_core::robot::session::ActuationSession;
use houndbot_core::robot::sim::SimRobot;
use houndbot_core::service::CrowdControlService;
use houndbot_core::tasks::spawn_tally_task;
use houndbot_core::votes::VoteAggregator;

mod http;

const TALLY_PERIOD: Duration = Duration::from_secs(1);

#[derive(Parser, Debug, Clone)]
#[command(name = "houndbot")]
#[command(author, version, about = "houndbot - crowd-voted legged-robot control")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Address for the HTTP command/stat intake
    #[arg(long, default_value = "0.0.0.0:8080")]
    http_addr: String,

    /// Run against the built-in robot simulator instead of real hardware
    #[arg(long, default_value = "false")]
    simulate: bool,

    /// Keep retrying the initial connection until the robot answers
    #[arg(long, default_value = "false")]
    retry_connect: bool,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("houndbot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = AppConfig::load(&args.config)?;
    info!(
        "creating new robot session for {} at {}",
        config.connection.name, config.connection.host
    );

    if !args.simulate {
        // The vendor control-plane transport is wired by the deployment, not
        // this build. See robot::ControlPlane.
        anyhow::bail!("no hardware control plane in this build; run with --simulate");
    }
    let control = Arc::new(SimRobot::new());

    let session = Arc::new(ActuationSession::new(
        control,
        config.payload.guid.clone(),
        config.payload.secret.clone(),
    ));
    session.connect(args.retry_connect).await?;
    if let Err(e) = session.enable().await {
        // Enable failures are retryable; keep serving so an operator can
        // sort the robot out and hit resume.
        error!("could not enable movement: {}", e);
    }

    let aggregator = Arc::new(VoteAggregator::new());
    let service = CrowdControlService::new(aggregator.clone(), session.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (winner_tx, winner_rx) = mpsc::channel(16);
    let tally_handle = spawn_tally_task(aggregator, TALLY_PERIOD, winner_tx, shutdown_rx.clone());

    let winner_service = service.clone();
    let winner_handle = tokio::spawn(async move {
        winner_service.run_winner_loop(winner_rx).await;
    });

    let http_handle = tokio::spawn(http::serve(
        args.http_addr.clone(),
        service.clone(),
        shutdown_rx.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    let _ = shutdown_tx.send(true);

    if let Err(e) = session.disable().await {
        error!("error during disable: {}", e);
    }
    session.disconnect().await;

    tally_handle.abort();
    winner_handle.abort();
    match http_handle.await {
        Ok(Err(e)) => error!("http intake failed: {}", e),
        Err(e) if !e.is_cancelled() => error!("http intake ended abnormally: {}", e),
        _ => {}
    }
    Ok(())
}
