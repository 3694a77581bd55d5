//! High-level client for invoking one entrypoint of one agent.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ResolvedConfig;
use crate::endpoint::ResolvedEndpoints;
use crate::error::{RunAgentError, RunAgentResult};
use crate::types::{is_stream_tag, AgentArchitecture, EntryPoint, RunInput, RunRequest};
use crate::utils::constants::USER_AGENT;
use crate::utils::url::{redact_token, with_token};

use super::architecture::{ensure_entrypoint, ArchitectureResolver};
use super::response::decode_run_response;
use super::stream::{AgentStream, StreamTransport};
use super::transport::{HttpRequest, HttpTransport};

/// Client bound to one agent and one entrypoint.
///
/// - [`run`](Self::run): one request/response exchange
/// - [`run_stream`](Self::run_stream): a lazy stream of values
/// - [`get_agent_architecture`](Self::get_agent_architecture): the agent's
///   entrypoints, fetched once and cached
/// - [`health_check`](Self::health_check): `GET /health`
///
/// Configuration and endpoints are fixed at construction. The cached
/// architecture is the only state shared between calls, so one client can
/// serve concurrent invocations.
///
/// # Example
///
/// ```no_run
/// use runagent::{ClientConfig, RunAgentClient};
/// use serde_json::json;
///
/// # async fn example() -> runagent::RunAgentResult<()> {
/// let config = ClientConfig::new("a1", "chat")
///     .local(true)
///     .host("127.0.0.1")
///     .port(8450);
/// let client = RunAgentClient::new(config)?;
///
/// let answer = client.run(json!({"message": "hi"})).await?;
/// println!("{answer}");
/// # Ok(())
/// # }
/// ```
pub struct RunAgentClient {
    config: ResolvedConfig,
    endpoints: ResolvedEndpoints,
    http: Arc<dyn HttpTransport>,
    stream: Arc<dyn StreamTransport>,
    resolver: ArchitectureResolver,
    architecture: OnceCell<AgentArchitecture>,
}

impl std::fmt::Debug for RunAgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunAgentClient")
            .field("config", &self.config)
            .field("endpoints", &self.endpoints)
            .field("architecture", &self.architecture.get())
            .finish_non_exhaustive()
    }
}

impl RunAgentClient {
    /// Create a client with the default transports, reading unset fields
    /// from the process environment.
    ///
    /// # Errors
    ///
    /// `VALIDATION_ERROR` for an empty agent id or entrypoint tag, or an
    /// unresolvable local address.
    #[cfg(feature = "client")]
    pub fn new(config: crate::config::ClientConfig) -> RunAgentResult<Self> {
        crate::builders::ClientBuilder::new(config).build()
    }

    /// Start a [`ClientBuilder`](crate::builders::ClientBuilder) for custom
    /// transports, environment or registry.
    pub fn builder(config: crate::config::ClientConfig) -> crate::builders::ClientBuilder {
        crate::builders::ClientBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: ResolvedConfig,
        endpoints: ResolvedEndpoints,
        http: Arc<dyn HttpTransport>,
        stream: Arc<dyn StreamTransport>,
    ) -> Self {
        let mut resolver = ArchitectureResolver::new(http.clone());
        if !endpoints.is_local {
            if let Some(key) = &config.api_key {
                resolver = resolver.with_api_key(key.clone());
            }
        }
        Self {
            config,
            endpoints,
            http,
            stream,
            resolver,
            architecture: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &ResolvedEndpoints {
        &self.endpoints
    }

    pub fn agent_id(&self) -> &str {
        &self.config.agent_id
    }

    pub fn entrypoint_tag(&self) -> &str {
        &self.config.entrypoint_tag
    }

    pub fn is_local(&self) -> bool {
        self.endpoints.is_local
    }

    /// The architecture, if it has been fetched.
    pub fn cached_architecture(&self) -> Option<&AgentArchitecture> {
        self.architecture.get()
    }

    /// Whether the agent server answers `GET /health` with a 2xx status.
    ///
    /// # Errors
    ///
    /// Transport failures (`CONNECTION_ERROR`).
    pub async fn health_check(&self) -> RunAgentResult<bool> {
        let mut request = HttpRequest::get(self.endpoints.health_url())
            .header("User-Agent", USER_AGENT)
            .timeout(self.config.timeout());
        if let Some(key) = self.bearer_key() {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        let response = self.http.send(request).await?;
        debug!(status = response.status, "health check");
        Ok(response.is_success())
    }

    /// Fetch the agent architecture, or return the cached one.
    ///
    /// Only a successful fetch is cached; a failed one is retried by the
    /// next call.
    ///
    /// # Errors
    ///
    /// `AUTHENTICATION_ERROR` in remote mode without an API key, `AGENT_NOT_FOUND_*`
    /// on 404, `ARCHITECTURE_MISSING` when the agent has no entrypoints.
    pub async fn get_agent_architecture(&self) -> RunAgentResult<&AgentArchitecture> {
        self.require_api_key()?;
        self.architecture
            .get_or_try_init(|| async {
                let url = self.endpoints.architecture_url(&self.config.agent_id);
                self.resolver
                    .resolve(&url, &self.config.agent_id, self.endpoints.is_local)
                    .await
            })
            .await
    }

    /// Invoke the entrypoint and wait for its result.
    ///
    /// `input` may be a JSON object (keyword arguments), a JSON array
    /// (positional arguments), `Value::Null`, or a [`RunInput`].
    ///
    /// # Errors
    ///
    /// - `VALIDATION_ERROR` (`reason: STREAM_ENTRYPOINT`) for a `*_stream`
    ///   tag, before any network call
    /// - `AUTHENTICATION_ERROR` in remote mode without an API key
    /// - `VALIDATION_ERROR` when the tag is not in the architecture, or the
    ///   result is a generator that needs [`run_stream`](Self::run_stream)
    /// - classified HTTP, transport and remote errors
    pub async fn run(&self, input: impl Into<RunInput>) -> RunAgentResult<Value> {
        let tag = &self.config.entrypoint_tag;
        if is_stream_tag(tag) {
            return Err(RunAgentError::stream_entrypoint(tag));
        }
        let api_key = self.require_api_key()?;
        self.validated_entrypoint().await?;

        let invocation_id = Uuid::new_v4().to_string();
        let request = self.run_request(input.into(), false);
        let url = self.endpoints.run_url(&self.config.agent_id);
        let deadline = self.config.run_timeout();

        info!(
            invocation_id = %invocation_id,
            agent_id = %self.config.agent_id,
            entrypoint = %tag,
            "running agent"
        );

        let mut http_request = HttpRequest::post(url, serde_json::to_value(&request)?)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .timeout(deadline);
        if let Some(key) = api_key {
            http_request = http_request.header("Authorization", format!("Bearer {key}"));
        }

        let response = match tokio::time::timeout(deadline, self.http.send(http_request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(invocation_id = %invocation_id, "run timed out");
                return Err(RunAgentError::connection(format!(
                    "the run did not finish within {}s",
                    deadline.as_secs()
                ))
                .with_suggestion("Increase timeout_seconds or RUNAGENT_TIMEOUT"));
            }
        };

        debug!(invocation_id = %invocation_id, status = response.status, "run response");
        decode_run_response(&response, &self.config.agent_id, tag, self.endpoints.is_local)
    }

    /// Invoke a streaming entrypoint.
    ///
    /// The connection is opened and the request sent before this returns;
    /// frames are read only as the returned [`AgentStream`] is polled.
    ///
    /// # Errors
    ///
    /// - `VALIDATION_ERROR` (`reason: NON_STREAM_ENTRYPOINT`) for a tag
    ///   without the `_stream` suffix, before connecting
    /// - `AUTHENTICATION_ERROR` in remote mode without an API key
    /// - `VALIDATION_ERROR` when the tag is not in the architecture
    /// - `CONNECTION_ERROR` when the connection cannot be opened
    pub async fn run_stream(&self, input: impl Into<RunInput>) -> RunAgentResult<AgentStream> {
        let tag = &self.config.entrypoint_tag;
        if !is_stream_tag(tag) {
            return Err(RunAgentError::non_stream_entrypoint(tag));
        }
        let api_key = self.require_api_key()?;
        self.validated_entrypoint().await?;

        let invocation_id = Uuid::new_v4().to_string();
        let request = self.run_request(input.into(), true);
        let base = self.endpoints.run_stream_url(&self.config.agent_id);
        let url = match api_key {
            Some(key) => with_token(&base, key)?,
            None => base,
        };

        info!(
            invocation_id = %invocation_id,
            agent_id = %self.config.agent_id,
            entrypoint = %tag,
            url = %redact_token(&url),
            "starting agent stream"
        );

        let mut connection = self.stream.connect(&url).await?;
        let bootstrap = serde_json::to_string(&request)?;
        if let Err(e) = connection.send_text(bootstrap).await {
            warn!(invocation_id = %invocation_id, error = %e, "failed to send stream request");
            if let Err(close_err) = connection.close().await {
                debug!(error = %close_err, "error while closing stream connection");
            }
            return Err(e);
        }

        Ok(AgentStream::new(connection, invocation_id))
    }

    // -- Internal helpers --

    /// The API key to send. Remote mode requires one; local mode sends none.
    fn require_api_key(&self) -> RunAgentResult<Option<&str>> {
        if self.endpoints.is_local {
            return Ok(None);
        }
        match self.config.api_key.as_deref() {
            Some(key) => Ok(Some(key)),
            None => Err(RunAgentError::missing_api_key()),
        }
    }

    fn bearer_key(&self) -> Option<&str> {
        if self.endpoints.is_local {
            None
        } else {
            self.config.api_key.as_deref()
        }
    }

    async fn validated_entrypoint(&self) -> RunAgentResult<&EntryPoint> {
        let arch = self.get_agent_architecture().await?;
        ensure_entrypoint(arch, &self.config.entrypoint_tag)
    }

    fn run_request(&self, input: RunInput, streaming: bool) -> RunRequest {
        RunRequest {
            entrypoint_tag: self.config.entrypoint_tag.clone(),
            input_args: input.args,
            input_kwargs: input.kwargs,
            timeout_seconds: self.config.timeout_seconds,
            async_execution: !streaming && input.async_execution,
            extra_params: self.config.extra_params.clone(),
        }
    }
}
