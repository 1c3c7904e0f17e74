//! Background expiry sweep
//!
//! Lazy expiry on the submit path already keeps firing decisions correct; the
//! sweep only releases evidence of triggers whose data stopped arriving.
//!
//! # Usage
//!
//! ```ignore
//! let token = CancellationToken::new();
//! let handle = spawn_sweeper(correlator, clock, Duration::from_secs(30), token.clone());
//!
//! // When shutting down:
//! token.cancel();
//! handle.await?;
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::correlator::Correlator;

/// Spawn the sweep loop; it stops when `cancel_token` is cancelled
pub fn spawn_sweeper(
    correlator: Arc<Correlator>,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    info!(
        sweep_interval_ms = ?sweep_interval.as_millis(),
        "Correlation sweeper started"
    );

    tokio::spawn(async move {
        run_sweeper(correlator, clock, sweep_interval, cancel_token).await;
    })
}

async fn run_sweeper(
    correlator: Arc<Correlator>,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut interval = interval(sweep_interval);

    // Skip the first tick (which fires immediately)
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Correlation sweeper stopping due to shutdown");
                break;
            }
            _ = interval.tick() => {
                let cleared = correlator.sweep(clock.now_millis());
                if cleared == 0 {
                    debug!("No expired correlation slots");
                }
            }
        }
    }
}
