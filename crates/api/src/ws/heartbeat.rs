use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ws::manager::WsManager;

/// Keep-alive period for relay connections.
const PING_EVERY: Duration = Duration::from_secs(30);

/// Ping every open relay connection on a fixed period.
///
/// Idle proxies drop quiet sockets; the ping keeps force-logout delivery
/// paths open. Runs until aborted at shutdown.
pub fn start_heartbeat(relay: Arc<WsManager>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PING_EVERY);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; nobody is connected yet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let open = relay.connection_count().await;
            if open == 0 {
                continue;
            }
            relay.ping_all().await;
            tracing::trace!(open, "Pinged relay connections");
        }
    })
}
