//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::schedule::policy::PolicyKind;
use crate::schedule::scheduler::DEFAULT_LEASE_TTL;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::workers::{pool, ticker};

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// Enable the ticker and worker pool
    pub enable_scheduler: bool,

    /// Enable local HTTP server
    pub enable_server: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Ticker worker options
    pub ticker: ticker::Options,

    /// Worker pool options
    pub pool: pool::Options,

    /// Execution lease length
    pub lease_ttl: Duration,

    /// Next-run policy for recurring workflows
    pub next_run_policy: PolicyKind,

    /// Remote function gateway
    pub function_invoker: InvokerOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            layout: StorageLayout::default(),
            enable_scheduler: true,
            enable_server: true,
            server: ServerOptions::default(),
            ticker: ticker::Options::default(),
            pool: pool::Options::default(),
            lease_ttl: DEFAULT_LEASE_TTL,
            next_run_policy: PolicyKind::default(),
            function_invoker: InvokerOptions::default(),
        }
    }
}

impl AppOptions {
    /// Build options from a settings file
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        let scheduler = &settings.scheduler;
        let invoker = &settings.function_invoker;

        Self {
            layout,
            enable_scheduler: settings.enable_scheduler,
            enable_server: settings.enable_server,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            ticker: ticker::Options {
                interval: Duration::from_secs(scheduler.interval_secs.max(1)),
                initial_delay: Duration::from_secs(scheduler.initial_delay_secs),
            },
            pool: pool::Options {
                workers: scheduler.workers,
                queue_capacity: scheduler.queue_capacity,
            },
            lease_ttl: Duration::from_secs(scheduler.lease_ttl_secs),
            next_run_policy: scheduler.next_run_policy,
            function_invoker: InvokerOptions {
                base_url: invoker.base_url.clone(),
                api_key: invoker.api_key.clone().map(SecretString::from),
                timeout: Duration::from_secs(invoker.timeout_secs),
            },
            ..Default::default()
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Function gateway options
#[derive(Debug)]
pub struct InvokerOptions {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout: Duration,
}

impl Default for InvokerOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}
