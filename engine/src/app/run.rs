//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::EngineError;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::workers::pool::{self, QueueReceiver};
use crate::workers::ticker;

/// Run the geoflow engine until the shutdown signal fires
pub async fn run(
    version: String,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), EngineError> {
    info!("Initializing geoflow engine...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager =
        ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(version, &options, &shutdown_tx, &mut shutdown_manager).await {
        error!("Failed to start engine: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    version: String,
    options: &AppOptions,
    shutdown_tx: &broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<Arc<AppState>, EngineError> {
    options.layout.setup().await?;

    let app_state = Arc::new(AppState::init(version, options).await?);

    if options.enable_scheduler {
        let (queue_tx, queue_rx) = pool::queue(&options.pool);

        init_worker_pool(
            options.pool.clone(),
            app_state.clone(),
            queue_rx,
            shutdown_manager,
            shutdown_tx.subscribe(),
        )?;

        init_ticker_worker(
            options.ticker.clone(),
            app_state.clone(),
            queue_tx,
            shutdown_manager,
            shutdown_tx.subscribe(),
        )?;
    }

    if options.enable_server {
        init_server(
            options,
            app_state.clone(),
            shutdown_manager,
            shutdown_tx.subscribe(),
        )
        .await?;
    }

    Ok(app_state)
}

fn init_ticker_worker(
    options: ticker::Options,
    app_state: Arc<AppState>,
    queue_tx: mpsc::Sender<String>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), EngineError> {
    info!("Initializing ticker worker...");

    let scheduler = app_state.scheduler.clone();

    let ticker_handle = tokio::spawn(async move {
        ticker::run(
            &options,
            scheduler.as_ref(),
            &queue_tx,
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_ticker_worker_handle(ticker_handle)
}

fn init_worker_pool(
    options: pool::Options,
    app_state: Arc<AppState>,
    queue_rx: QueueReceiver,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), EngineError> {
    info!("Initializing worker pool...");

    let scheduler = app_state.scheduler.clone();

    let pool_handle = tokio::spawn(async move {
        pool::run(
            &options,
            scheduler,
            queue_rx,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_pool_handle(pool_handle)
}

async fn init_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), EngineError> {
    info!("Initializing local HTTP server...");

    let server_state = ServerState::from_app(&app_state);

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    ticker_worker_handle: Option<JoinHandle<()>>,
    pool_handle: Option<JoinHandle<()>>,
    server_handle: Option<JoinHandle<Result<(), EngineError>>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            ticker_worker_handle: None,
            pool_handle: None,
            server_handle: None,
        }
    }

    pub fn with_ticker_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), EngineError> {
        if self.ticker_worker_handle.is_some() {
            return Err(EngineError::ShutdownError("ticker_handle already set".to_string()));
        }
        self.ticker_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_pool_handle(&mut self, handle: JoinHandle<()>) -> Result<(), EngineError> {
        if self.pool_handle.is_some() {
            return Err(EngineError::ShutdownError("pool_handle already set".to_string()));
        }
        self.pool_handle = Some(handle);
        Ok(())
    }

    pub fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), EngineError>>,
    ) -> Result<(), EngineError> {
        if self.server_handle.is_some() {
            return Err(EngineError::ShutdownError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), EngineError> {
        let _ = self.shutdown_tx.send(());

        let max_delay = self.lifecycle_options.max_shutdown_delay;
        match tokio::time::timeout(max_delay, self.shutdown_impl()).await {
            Ok(result) => result,
            Err(_) => {
                error!("Shutdown timed out after {:?}, forcing shutdown...", max_delay);
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), EngineError> {
        info!("Shutting down geoflow engine...");

        // 1. Ticker, so nothing new is queued
        if let Some(handle) = self.ticker_worker_handle.take() {
            handle.await.map_err(|e| EngineError::ShutdownError(e.to_string()))?;
        }

        // 2. Worker pool, running executions finish
        if let Some(handle) = self.pool_handle.take() {
            handle.await.map_err(|e| EngineError::ShutdownError(e.to_string()))?;
        }

        // 3. Server
        if let Some(handle) = self.server_handle.take() {
            handle.await.map_err(|e| EngineError::ShutdownError(e.to_string()))??;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
