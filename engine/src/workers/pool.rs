//! Execution worker pool

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info};

use crate::schedule::scheduler::Scheduler;

/// Shared end of the execution queue
pub type QueueReceiver = Arc<Mutex<mpsc::Receiver<String>>>;

/// Worker pool options
#[derive(Debug, Clone)]
pub struct Options {
    /// Number of concurrent executions
    pub workers: usize,

    /// Capacity of the execution queue
    pub queue_capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 64,
        }
    }
}

/// Create the bounded execution queue
pub fn queue(options: &Options) -> (mpsc::Sender<String>, QueueReceiver) {
    let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
    (tx, Arc::new(Mutex::new(rx)))
}

/// Run the pool until shutdown or until every sender is dropped.
///
/// On shutdown, running executions finish and the claims of ids still
/// queued are released.
pub async fn run(
    options: &Options,
    scheduler: Arc<Scheduler>,
    receiver: QueueReceiver,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    let worker_count = options.workers.max(1);
    info!("Worker pool starting with {} workers...", worker_count);

    let (stop_tx, stop_rx) = watch::channel(false);
    let workers = (0..worker_count).map(|index| {
        worker(index, scheduler.clone(), receiver.clone(), stop_rx.clone())
    });
    let mut workers = Box::pin(join_all(workers));

    tokio::select! {
        _ = &mut shutdown_signal => {
            info!("Worker pool shutting down...");
            let _ = stop_tx.send(true);
            workers.await;
        }
        _ = &mut workers => {
            info!("Execution queue closed, worker pool stopping...");
        }
    }

    let mut receiver = receiver.lock().await;
    while let Ok(id) = receiver.try_recv() {
        debug!("Releasing queued workflow {}", id);
        scheduler.abandon(&id).await;
    }
}

async fn worker(
    index: usize,
    scheduler: Arc<Scheduler>,
    receiver: QueueReceiver,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let next = tokio::select! {
            _ = stop.changed() => None,
            id = recv(&receiver) => id,
        };

        let Some(workflow_id) = next else {
            debug!("Worker {} stopping", index);
            return;
        };

        debug!("Worker {} picked up workflow {}", index, workflow_id);
        match scheduler.process_queued(&workflow_id).await {
            Ok(Some(_)) => {}
            Ok(None) => debug!("Worker {} skipped workflow {}", index, workflow_id),
            Err(e) => error!("Execution of workflow {} failed: {}", workflow_id, e),
        }
    }
}

async fn recv(receiver: &QueueReceiver) -> Option<String> {
    receiver.lock().await.recv().await
}
