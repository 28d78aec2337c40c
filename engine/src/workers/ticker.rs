//! Scheduler ticker worker

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::schedule::scheduler::Scheduler;

/// Ticker worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Tick interval
    pub interval: Duration,

    /// Initial delay before the first tick
    pub initial_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(5),
        }
    }
}

/// Run the ticker worker until shutdown
pub async fn run<S, F>(
    options: &Options,
    scheduler: &Scheduler,
    queue: &mpsc::Sender<String>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Ticker worker starting...");

    tokio::select! {
        _ = &mut shutdown_signal => {
            info!("Ticker worker shutting down...");
            return;
        }
        _ = sleep_fn(options.initial_delay) => {}
    }

    loop {
        debug!("Checking for due workflows...");

        if let Err(e) = scheduler.tick(Utc::now(), queue).await {
            error!("Scheduler tick failed: {}", e);
        }

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Ticker worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }
    }
}
