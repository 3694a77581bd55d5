//! Builder for [`RunAgentClient`] with custom transports, environment and
//! registry.

use std::sync::Arc;

use tracing::debug;

use crate::client::{HttpTransport, RunAgentClient, StreamTransport};
use crate::config::{ClientConfig, EnvSource, ProcessEnv};
use crate::endpoint::ResolvedEndpoints;
use crate::error::RunAgentResult;
use crate::registry::AgentRegistry;

/// Builder for constructing a [`RunAgentClient`].
///
/// Defaults: the process environment, no registry, and (with the `client`
/// feature) the `reqwest` and WebSocket transports.
///
/// # Example
///
/// ```no_run
/// use runagent::builders::ClientBuilder;
/// use runagent::registry::{AgentAddress, StaticRegistry};
/// use runagent::ClientConfig;
///
/// # fn example() -> runagent::RunAgentResult<()> {
/// let registry = StaticRegistry::new().with_agent("a1", AgentAddress::new("127.0.0.1", 8450));
///
/// let client = ClientBuilder::new(ClientConfig::new("a1", "chat").local(true))
///     .with_registry(registry)
///     .build()?;
/// assert_eq!(client.endpoints().rest_base_url, "http://127.0.0.1:8450/api/v1");
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    env: Box<dyn EnvSource>,
    registry: Option<Arc<dyn AgentRegistry>>,
    http: Option<Arc<dyn HttpTransport>>,
    stream: Option<Arc<dyn StreamTransport>>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("registry", &self.registry.is_some())
            .field("http", &self.http.is_some())
            .field("stream", &self.stream.is_some())
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a builder for `config`.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            env: Box::new(ProcessEnv),
            registry: None,
            http: None,
            stream: None,
        }
    }

    /// Read unset fields from `env` instead of the process environment.
    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Local agent lookup, consulted in local mode when host/port are not
    /// both configured.
    pub fn with_registry(mut self, registry: impl AgentRegistry + 'static) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Shared variant of [`with_registry`](Self::with_registry).
    pub fn with_shared_registry(mut self, registry: Arc<dyn AgentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Transport for `run`, architecture and health requests.
    pub fn with_http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http = Some(transport);
        self
    }

    /// Transport for `run_stream`.
    pub fn with_stream_transport(mut self, transport: Arc<dyn StreamTransport>) -> Self {
        self.stream = Some(transport);
        self
    }

    /// Resolve configuration and endpoints and create the client.
    ///
    /// No network calls are made.
    pub fn build(self) -> RunAgentResult<RunAgentClient> {
        let config = self.config.resolve_with(self.env.as_ref())?;
        let endpoints = ResolvedEndpoints::resolve(&config, self.registry.as_deref())?;

        let http = match self.http {
            Some(http) => http,
            None => default_http()?,
        };
        let stream = match self.stream {
            Some(stream) => stream,
            None => default_stream()?,
        };

        debug!(
            agent_id = %config.agent_id,
            entrypoint = %config.entrypoint_tag,
            local = endpoints.is_local,
            "built RunAgent client"
        );
        Ok(RunAgentClient::from_parts(config, endpoints, http, stream))
    }
}

#[cfg(feature = "client")]
fn default_http() -> RunAgentResult<Arc<dyn HttpTransport>> {
    Ok(Arc::new(crate::client::ReqwestTransport::new()))
}

#[cfg(not(feature = "client"))]
fn default_http() -> RunAgentResult<Arc<dyn HttpTransport>> {
    Err(crate::error::RunAgentError::validation("no HTTP transport configured")
        .with_suggestion("Enable the `client` feature or call with_http_transport"))
}

#[cfg(feature = "client")]
fn default_stream() -> RunAgentResult<Arc<dyn StreamTransport>> {
    Ok(Arc::new(crate::client::WebSocketTransport::new()))
}

#[cfg(not(feature = "client"))]
fn default_stream() -> RunAgentResult<Arc<dyn StreamTransport>> {
    Err(crate::error::RunAgentError::validation("no stream transport configured")
        .with_suggestion("Enable the `client` feature or call with_stream_transport"))
}
