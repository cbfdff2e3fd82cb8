//! Background task pairing waiting sessions

use crate::state::ServerState;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Pair waiting sessions every `interval`, and sooner whenever a second
/// session starts waiting. Returns once `shutdown` resolves.
pub async fn run(state: ServerState, interval: Duration, shutdown: impl Future<Output = ()>) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(?interval, "matchmaker started");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
            _ = state.matchable() => {}
        }

        let rooms = state.match_waiting();
        if !rooms.is_empty() {
            debug!(rooms = rooms.len(), "matched waiting sessions");
        }
    }
    info!("matchmaker stopped");
}
