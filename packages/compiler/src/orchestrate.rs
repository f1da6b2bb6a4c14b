//! Remote compilation with provider fallback.
//!
//! One request goes to the primary provider; only when that fails (wrong
//! status, wrong body shape, transport error or timeout) does the same
//! payload go to the secondary. The secondary is never raced or called
//! speculatively. When both fail the caller gets one aggregated error
//! holding both logs.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::error::{CompileError, CompileResult};
use crate::normalize::NormalizedSource;
use crate::session::Artifact;

/// Captured provider reply, classified by the orchestrator.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// A remote compile endpoint.
#[async_trait]
pub trait CompileProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Submit source for compilation and capture the raw reply.
    /// Transport-level failures (including timeouts) are errors here;
    /// HTTP-level failures come back as a `ProviderResponse`.
    async fn submit(&self, source: &str, engine: Engine) -> CompileResult<ProviderResponse>;
}

/// HTTP compile provider backed by reqwest.
pub struct HttpCompileProvider {
    name: String,
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpCompileProvider {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompileProvider for HttpCompileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, source: &str, engine: Engine) -> CompileResult<ProviderResponse> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "source": source, "engine": engine.as_str() }))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CompileError::Transport {
                provider: self.name.clone(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| CompileError::Transport {
                provider: self.name.clone(),
                message: e.to_string(),
            })?
            .to_vec();

        Ok(ProviderResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Cap captured provider logs so an HTML error page cannot flood the UI.
const MAX_LOG_LEN: usize = 2000;

fn truncate_log(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() <= MAX_LOG_LEN {
        text.into_owned()
    } else {
        let mut out: String = text.chars().take(MAX_LOG_LEN).collect();
        out.push_str("… [truncated]");
        out
    }
}

/// The single success predicate, applied identically to both providers:
/// success status AND an artifact-typed body.
pub fn is_artifact_response(status: u16, content_type: &str) -> bool {
    (200..300).contains(&status) && content_type.starts_with("application/pdf")
}

fn classify(provider: &str, response: ProviderResponse) -> CompileResult<Artifact> {
    if is_artifact_response(response.status, &response.content_type) {
        return Ok(Artifact::new(response.body, response.content_type));
    }
    let log = truncate_log(&response.body);
    if !(200..300).contains(&response.status) {
        Err(CompileError::ProviderHttp {
            provider: provider.to_string(),
            status: response.status,
            log,
        })
    } else {
        Err(CompileError::ProviderFormat {
            provider: provider.to_string(),
            content_type: response.content_type,
            log,
        })
    }
}

/// Primary-then-secondary compilation orchestrator.
pub struct Orchestrator {
    primary: Box<dyn CompileProvider>,
    secondary: Box<dyn CompileProvider>,
}

impl Orchestrator {
    pub fn new(primary: Box<dyn CompileProvider>, secondary: Box<dyn CompileProvider>) -> Self {
        Self { primary, secondary }
    }

    /// Compile normalized source into an artifact, falling back to the
    /// secondary provider on primary failure.
    pub async fn compile(
        &self,
        source: &NormalizedSource,
        engine: Engine,
    ) -> CompileResult<Artifact> {
        debug!(provider = self.primary.name(), %engine, "submitting to primary");
        let primary_err = match self.attempt(self.primary.as_ref(), source, engine).await {
            Ok(artifact) => {
                info!(
                    provider = self.primary.name(),
                    bytes = artifact.len(),
                    "primary compile succeeded"
                );
                return Ok(artifact);
            }
            Err(err) => err,
        };

        warn!(
            provider = self.primary.name(),
            error = %primary_err,
            "primary failed, falling back to secondary"
        );
        let primary_log = primary_err.log();

        match self.attempt(self.secondary.as_ref(), source, engine).await {
            Ok(artifact) => {
                info!(
                    provider = self.secondary.name(),
                    bytes = artifact.len(),
                    "secondary compile succeeded"
                );
                Ok(artifact)
            }
            Err(secondary_err) => Err(CompileError::BothProvidersFailed {
                primary_log,
                secondary_log: secondary_err.log(),
            }),
        }
    }

    async fn attempt(
        &self,
        provider: &dyn CompileProvider,
        source: &NormalizedSource,
        engine: Engine,
    ) -> CompileResult<Artifact> {
        let response = provider.submit(&source.text, engine).await?;
        classify(provider.name(), response)
    }
}
