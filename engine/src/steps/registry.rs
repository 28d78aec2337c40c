//! Step handler registry

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::clients::FunctionInvoker;
use crate::models::workflow::StepType;
use crate::steps::builtin::{
    AiAnalysisHandler, DataCollectionHandler, NotificationHandler, PostprocessingHandler,
    PreprocessingHandler,
};
use crate::steps::handler::{StepError, StepHandler};
use crate::steps::lambda::LambdaHandler;

/// Maps step types to their handlers
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<StepType, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the six built-in handlers
    pub fn with_builtins(invoker: Arc<dyn FunctionInvoker>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DataCollectionHandler));
        registry.register(Arc::new(PreprocessingHandler));
        registry.register(Arc::new(AiAnalysisHandler));
        registry.register(Arc::new(PostprocessingHandler));
        registry.register(Arc::new(NotificationHandler));
        registry.register(Arc::new(LambdaHandler::new(invoker)));
        registry
    }

    /// Register a handler under its own step type, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn StepHandler>) {
        let step_type = handler.step_type();
        debug!("Registered handler for {}", step_type);
        self.handlers.insert(step_type, handler);
    }

    /// Resolve the handler for a step type
    pub fn resolve(&self, step_type: Option<StepType>) -> Result<Arc<dyn StepHandler>, StepError> {
        let step_type = step_type.ok_or_else(|| {
            StepError::InvalidConfiguration("Step type is not set".to_string())
        })?;

        self.handlers.get(&step_type).cloned().ok_or_else(|| {
            StepError::InvalidConfiguration(format!("Unknown step type: {}", step_type))
        })
    }

    /// Registered step types
    pub fn step_types(&self) -> Vec<StepType> {
        self.handlers.keys().copied().collect()
    }
}
