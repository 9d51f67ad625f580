// houndbot-core/src/tasks.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::commands::Movement;
use crate::votes::VoteAggregator;

/// Spawns the background task that closes the vote window once per `period`
/// and forwards each winner into `winners`. Dispatch happens on the consumer
/// side so a slow actuator never stalls the tally cadence.
pub fn spawn_tally_task(
    aggregator: Arc<VoteAggregator>,
    period: Duration,
    winners: mpsc::Sender<Movement>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(winner) = aggregator.tick() {
                        if winners.send(winner).await.is_err() {
                            // Consumer went away; nothing left to tally for.
                            break;
                        }
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
