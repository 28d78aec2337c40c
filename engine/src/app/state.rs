//! Application state management

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::app::options::AppOptions;
use crate::clients::invoker::HttpFunctionInvoker;
use crate::clients::metrics::TracingMetricsSink;
use crate::clients::{FunctionInvoker, MetricsSink};
use crate::errors::EngineError;
use crate::execute::executor::StepExecutor;
use crate::execute::recorder::ResultRecorder;
use crate::execute::runner::WorkflowRunner;
use crate::filesys::file::File;
use crate::models::workflow::Workflow;
use crate::schedule::policy::NextRunPolicy;
use crate::schedule::scheduler::Scheduler;
use crate::steps::registry::HandlerRegistry;
use crate::store::memory::{MemoryResultStore, MemoryWorkflowStore};
use crate::store::{ResultStore, WorkflowStore};

/// Main application state
pub struct AppState {
    /// Engine version
    pub version: String,

    pub workflows: Arc<dyn WorkflowStore>,
    pub results: Arc<dyn ResultStore>,

    /// Scheduler, also the entry point for on-demand runs
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    /// Wire the engine from explicit collaborators
    pub fn new(
        version: String,
        workflows: Arc<dyn WorkflowStore>,
        results: Arc<dyn ResultStore>,
        invoker: Arc<dyn FunctionInvoker>,
        metrics: Arc<dyn MetricsSink>,
        policy: Arc<dyn NextRunPolicy>,
        lease_ttl: Duration,
    ) -> Self {
        let registry = Arc::new(HandlerRegistry::with_builtins(invoker));
        let executor = StepExecutor::new(registry);
        let recorder = ResultRecorder::new(workflows.clone(), results.clone(), metrics);
        let runner = WorkflowRunner::new(workflows.clone(), results.clone(), executor, recorder);
        let scheduler = Arc::new(Scheduler::new(workflows.clone(), runner, policy, lease_ttl));

        Self {
            version,
            workflows,
            results,
            scheduler,
        }
    }

    /// Initialize application state from options
    pub async fn init(version: String, options: &AppOptions) -> Result<Self, EngineError> {
        info!("Initializing application state...");

        let api_key = options
            .function_invoker
            .api_key
            .as_ref()
            .map(|key| SecretString::from(key.expose_secret().to_string()));
        let invoker = HttpFunctionInvoker::new(
            &options.function_invoker.base_url,
            api_key,
            options.function_invoker.timeout,
        )?;
        info!("Function invoker targets {}", invoker.base_url());

        let seed = load_seed_workflows(&options.layout.workflows_file()).await?;
        info!("Loaded {} seed workflows", seed.len());

        Ok(Self::new(
            version,
            Arc::new(MemoryWorkflowStore::with_workflows(seed)),
            Arc::new(MemoryResultStore::new()),
            Arc::new(invoker),
            Arc::new(TracingMetricsSink),
            Arc::from(options.next_run_policy.build()),
            options.lease_ttl,
        ))
    }
}

/// Read the seed workflows file; a missing file means no seed
pub async fn load_seed_workflows(file: &File) -> Result<Vec<Workflow>, EngineError> {
    if !file.exists().await {
        warn!("No seed workflows file at {}", file.path().display());
        return Ok(Vec::new());
    }
    file.read_json::<Vec<Workflow>>().await
}
