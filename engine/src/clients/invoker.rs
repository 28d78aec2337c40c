//! HTTP function invoker

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::clients::FunctionInvoker;
use crate::errors::EngineError;

/// Invokes functions through an HTTP gateway at
/// `{base_url}/functions/{name}/invocations`
pub struct HttpFunctionInvoker {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl HttpFunctionInvoker {
    /// Create a new invoker
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = Client::builder().timeout(timeout).build()?;

        // Collapse trailing slashes so the path ends in one empty segment
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| EngineError::ConfigError(format!("Invalid invoker URL: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the invocation URL for a function. The name is encoded as a
    /// single path segment.
    pub fn invocation_url(&self, function_name: &str) -> Result<Url, EngineError> {
        if matches!(function_name, "" | "." | "..") {
            return Err(EngineError::ConfigError(format!(
                "Invalid function name: {:?}",
                function_name
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                EngineError::ConfigError(format!("Base URL cannot hold a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["functions", function_name, "invocations"]);
        Ok(url)
    }
}

#[async_trait]
impl FunctionInvoker for HttpFunctionInvoker {
    async fn invoke(&self, function_name: &str, payload: &Value) -> Result<String, EngineError> {
        let url = self.invocation_url(function_name)?;
        debug!("POST {} (invoke {})", url, function_name);

        let mut request = self.client.post(url).json(payload);
        if let Some(api_key) = &self.api_key {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", api_key.expose_secret()),
            );
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Function {} invocation failed: {} - {}", function_name, status, body);
            return Err(EngineError::RemoteInvocation(format!("{}: {}", status, body)));
        }

        Ok(response.text().await?)
    }
}
