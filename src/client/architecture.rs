//! Agent architecture discovery and entrypoint validation.
//!
//! The architecture lists the entrypoints an agent exposes. It is fetched
//! from `GET {rest}/agents/{id}/architecture`, which answers either with a
//! bare architecture object or with a `{success, data, error, message}`
//! envelope.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{ErrorKind, RunAgentError, RunAgentResult};
use crate::types::{AgentArchitecture, EntryPoint, ErrorPayload, RunResponse};
use crate::utils::constants::USER_AGENT;

use super::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Fetches [`AgentArchitecture`]s over an [`HttpTransport`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use runagent::client::{ArchitectureResolver, ReqwestTransport};
///
/// # async fn example() -> runagent::RunAgentResult<()> {
/// let resolver = ArchitectureResolver::new(Arc::new(ReqwestTransport::new()));
/// let arch = resolver
///     .resolve("http://127.0.0.1:8450/api/v1/agents/a1/architecture", "a1", true)
///     .await?;
/// println!("entrypoints: {:?}", arch.tags());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ArchitectureResolver {
    http: Arc<dyn HttpTransport>,
    api_key: Option<String>,
}

impl std::fmt::Debug for ArchitectureResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchitectureResolver")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl ArchitectureResolver {
    pub fn new(http: Arc<dyn HttpTransport>) -> Self {
        Self { http, api_key: None }
    }

    /// Send `Authorization: Bearer {api_key}` with the request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Fetch and parse the architecture at `url`.
    ///
    /// # Errors
    ///
    /// Transport failures are `CONNECTION_ERROR`; non-2xx statuses go
    /// through [`RunAgentError::from_status`]; an architecture without
    /// entrypoints is `ARCHITECTURE_MISSING`.
    pub async fn resolve(
        &self,
        url: &str,
        agent_id: &str,
        is_local: bool,
    ) -> RunAgentResult<AgentArchitecture> {
        debug!(url, "fetching agent architecture");

        let mut request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = self.http.send(request).await?;
        let arch = parse_architecture_response(&response, agent_id, is_local)?;

        debug!(agent_id, entrypoints = ?arch.tags(), "resolved agent architecture");
        Ok(arch)
    }
}

/// Interpret an architecture response.
pub fn parse_architecture_response(
    response: &HttpResponse,
    agent_id: &str,
    is_local: bool,
) -> RunAgentResult<AgentArchitecture> {
    if !response.is_success() {
        return Err(RunAgentError::from_status(
            response.status,
            &response.body,
            agent_id,
            is_local,
        ));
    }

    let body: Value = serde_json::from_str(&response.body).map_err(|e| {
        RunAgentError::server("the architecture response is not valid JSON")
            .with_details(serde_json::json!({ "agent_id": agent_id }))
            .with_cause(e)
    })?;

    let arch_value = if RunResponse::is_envelope(&body) {
        let envelope: RunResponse = serde_json::from_value(body.clone())?;
        if !envelope.succeeded() {
            let payload = envelope.error_payload();
            return Err(envelope_failure(&payload));
        }
        match envelope.data {
            Some(data) if data.is_object() => data,
            // `{success: true}` with no usable data: nothing to list
            _ => Value::Object(serde_json::Map::new()),
        }
    } else {
        body
    };

    let mut arch: AgentArchitecture = serde_json::from_value(arch_value).map_err(|e| {
        RunAgentError::server("the architecture response has an unexpected shape")
            .with_details(serde_json::json!({ "agent_id": agent_id }))
            .with_cause(e)
    })?;

    if arch.agent_id.is_empty() {
        arch.agent_id = agent_id.to_string();
    }
    if arch.entrypoints.is_empty() {
        return Err(RunAgentError::architecture_missing(agent_id));
    }
    Ok(arch)
}

fn envelope_failure(payload: &ErrorPayload) -> RunAgentError {
    if payload.code.is_none() && payload.message.is_none() {
        return RunAgentError::server("failed to retrieve the agent architecture");
    }
    RunAgentError::from_remote(payload, ErrorKind::Server)
}

/// Look up `tag` in `arch`.
///
/// # Errors
///
/// `VALIDATION_ERROR` listing the available tags when `tag` is absent.
pub fn ensure_entrypoint<'a>(arch: &'a AgentArchitecture, tag: &str) -> RunAgentResult<&'a EntryPoint> {
    arch.entrypoint(tag).ok_or_else(|| {
        let available = arch.tags();
        RunAgentError::validation(format!(
            "entrypoint '{tag}' was not found on agent '{}'; available: {}",
            arch.agent_id,
            available.join(", ")
        ))
        .with_suggestion("Use one of the available entrypoint tags")
        .with_details(serde_json::json!({
            "agent_id": arch.agent_id,
            "entrypoint_tag": tag,
            "available_tags": available,
        }))
    })
}
