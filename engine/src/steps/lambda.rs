//! Remote function step

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::clients::FunctionInvoker;
use crate::models::workflow::StepType;
use crate::steps::handler::{StepError, StepHandler, StepInput, StepOutput};

const FUNCTION_NAME_KEY: &str = "functionName";
const QUOTES: &[char] = &['"', '\''];
const SEPARATORS: &[char] = &['=', ':'];
const TERMINATORS: &[char] = &[',', ';', '&', '}', '"', '\''];

/// How the function name was found in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// `functionName` field of a JSON object
    JsonField,
    /// `functionName=<name>` or `functionName: <name>` token
    Token,
    /// The configuration string itself
    Whole,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resolution::JsonField => "json",
            Resolution::Token => "token",
            Resolution::Whole => "whole",
        };
        f.write_str(s)
    }
}

/// Function name and configuration resolved from a step configuration string
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFunction {
    pub name: String,
    pub resolution: Resolution,
    pub config: Map<String, Value>,
}

/// Resolve the function to invoke from a step configuration
pub fn resolve_function(configuration: Option<&str>) -> Result<ResolvedFunction, StepError> {
    let raw = configuration
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            StepError::InvalidConfiguration("Lambda step has no configuration".to_string())
        })?;

    if let Ok(Value::Object(config)) = serde_json::from_str::<Value>(raw) {
        let name = config
            .get(FUNCTION_NAME_KEY)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                StepError::InvalidConfiguration(format!(
                    "Lambda configuration has no usable {}",
                    FUNCTION_NAME_KEY
                ))
            })?
            .to_string();

        return Ok(ResolvedFunction {
            name,
            resolution: Resolution::JsonField,
            config,
        });
    }

    let (name, resolution) = match scan_function_token(raw) {
        Some(name) => (name, Resolution::Token),
        None => (strip_quotes(raw).to_string(), Resolution::Whole),
    };

    if name.is_empty() {
        return Err(StepError::InvalidConfiguration(format!(
            "Could not resolve a function name from '{}'",
            raw
        )));
    }

    let mut config = Map::new();
    config.insert(FUNCTION_NAME_KEY.to_string(), Value::String(name.clone()));
    Ok(ResolvedFunction {
        name,
        resolution,
        config,
    })
}

/// Find `functionName` followed by `=` or `:` and return the cleaned value
fn scan_function_token(raw: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(offset) = raw[search_from..].find(FUNCTION_NAME_KEY) {
        let after_key = search_from + offset + FUNCTION_NAME_KEY.len();
        let rest = raw[after_key..].trim_start_matches(QUOTES).trim_start();

        if let Some(value) = rest.strip_prefix(SEPARATORS) {
            let value = value.trim_start().trim_start_matches(QUOTES);
            let end = value
                .find(|c: char| c.is_whitespace() || TERMINATORS.contains(&c))
                .unwrap_or(value.len());
            let name = value[..end]
                .trim_matches(|c: char| c.is_ascii_punctuation() && c != '-' && c != '_');
            return Some(name.to_string());
        }
        search_from = after_key;
    }
    None
}

fn strip_quotes(raw: &str) -> &str {
    raw.trim().trim_matches(QUOTES).trim()
}

/// Invokes a remote function. Remote failures are reported in the output
/// with `success=false` and do not fail the step.
pub struct LambdaHandler {
    invoker: Arc<dyn FunctionInvoker>,
}

impl LambdaHandler {
    pub fn new(invoker: Arc<dyn FunctionInvoker>) -> Self {
        Self { invoker }
    }

    fn build_payload(input: &StepInput<'_>, function: &ResolvedFunction) -> Value {
        let mut payload = input.context.clone();
        for (key, value) in &function.config {
            payload.insert(key.clone(), value.clone());
        }
        payload.insert("workflowId".to_string(), json!(input.workflow_id));
        payload.insert("stepName".to_string(), json!(input.step.name));
        Value::Object(payload)
    }
}

#[async_trait]
impl StepHandler for LambdaHandler {
    async fn execute(&self, input: StepInput<'_>) -> Result<StepOutput, StepError> {
        let function = resolve_function(input.step.configuration.as_deref())?;
        debug!(
            "Invoking function {} (resolved by {})",
            function.name, function.resolution
        );

        let payload = Self::build_payload(&input, &function);

        let mut output = StepOutput::new();
        output.insert("functionName".to_string(), json!(function.name));
        output.insert("resolvedBy".to_string(), json!(function.resolution.to_string()));

        match self.invoker.invoke(&function.name, &payload).await {
            Ok(body) if body.trim().is_empty() => {
                warn!("Function {} returned an empty response", function.name);
                output.insert("success".to_string(), json!(false));
                output.insert("error".to_string(), json!("Empty response from function"));
            }
            Ok(body) => {
                let response = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
                output.insert("success".to_string(), json!(true));
                output.insert("response".to_string(), response);
            }
            Err(e) => {
                warn!("Function {} invocation failed: {}", function.name, e);
                output.insert("success".to_string(), json!(false));
                output.insert("error".to_string(), json!(e.to_string()));
            }
        }

        Ok(output)
    }

    fn step_type(&self) -> StepType {
        StepType::LambdaFunction
    }
}
