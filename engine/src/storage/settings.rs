//! Settings file management

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;
use crate::schedule::policy::PolicyKind;

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Also write daily-rotated log files to the logs directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Remote function gateway
    #[serde(default)]
    pub function_invoker: FunctionInvokerSettings,

    /// Enable the scheduler ticker and worker pool
    #[serde(default = "default_true")]
    pub enable_scheduler: bool,

    /// Enable local HTTP control server
    #[serde(default = "default_true")]
    pub enable_server: bool,

    /// Server configuration
    #[serde(default)]
    pub server: ServerSettings,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            scheduler: SchedulerSettings::default(),
            function_invoker: FunctionInvokerSettings::default(),
            enable_scheduler: true,
            enable_server: true,
            server: ServerSettings::default(),
        }
    }
}

/// Scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Seconds between ticks
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Seconds before the first tick
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    /// Concurrent executions
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the execution queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Execution lease length in seconds
    #[serde(default = "default_lease_ttl")]
    pub lease_ttl_secs: u64,

    /// How recurring workflows get their next run
    #[serde(default)]
    pub next_run_policy: PolicyKind,
}

fn default_interval() -> u64 {
    60
}

fn default_initial_delay() -> u64 {
    5
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_lease_ttl() -> u64 {
    7200
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            initial_delay_secs: default_initial_delay(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            lease_ttl_secs: default_lease_ttl(),
            next_run_policy: PolicyKind::default(),
        }
    }
}

/// Function gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInvokerSettings {
    /// Gateway base URL
    #[serde(default = "default_invoker_url")]
    pub base_url: String,

    /// Bearer key sent with every invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_invoker_timeout")]
    pub timeout_secs: u64,
}

fn default_invoker_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_invoker_timeout() -> u64 {
    30
}

impl Default for FunctionInvokerSettings {
    fn default() -> Self {
        Self {
            base_url: default_invoker_url(),
            api_key: None,
            timeout_secs: default_invoker_timeout(),
        }
    }
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}
