//! Endpoint resolution: turns a [`ResolvedConfig`] into concrete REST and
//! streaming base URLs.
//!
//! - Local: `http://{host}:{port}/api/v1` and `ws://{host}:{port}/api/v1`,
//!   with host/port taken from the config or, failing that, the registry.
//! - Remote: the normalized base URL plus `/api/v1`; the stream base is an
//!   explicit stream URL when configured, else the REST base with its scheme
//!   translated (`https` to `wss`, `http` to `ws`).
//!
//! No network calls happen here.

use tracing::debug;

use crate::config::ResolvedConfig;
use crate::error::{RunAgentError, RunAgentResult};
use crate::registry::{AgentAddress, AgentRegistry};
use crate::utils::constants::API_PREFIX;
use crate::utils::url::{normalize_base_url, to_stream_scheme};

/// Base URLs for one client. Computed once, never re-resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoints {
    /// REST base including the API prefix.
    pub rest_base_url: String,
    /// Streaming base including the API prefix.
    pub stream_base_url: String,
    /// Whether these point at a local agent server.
    pub is_local: bool,
}

impl ResolvedEndpoints {
    /// Resolve endpoints for `config`, consulting `registry` in local mode
    /// when host/port are not both configured.
    pub fn resolve(
        config: &ResolvedConfig,
        registry: Option<&dyn AgentRegistry>,
    ) -> RunAgentResult<Self> {
        if config.local {
            let address = local_address(config, registry)?;
            let endpoints = Self {
                rest_base_url: format!("http://{}:{}{}", address.host, address.port, API_PREFIX),
                stream_base_url: format!("ws://{}:{}{}", address.host, address.port, API_PREFIX),
                is_local: true,
            };
            debug!(rest = %endpoints.rest_base_url, "resolved local endpoints");
            return Ok(endpoints);
        }

        let base = normalize_base_url(&config.base_url);
        let rest_base_url = format!("{base}{API_PREFIX}");
        let stream_base_url = match &config.stream_base_url {
            Some(explicit) => {
                let explicit = to_stream_scheme(&normalize_base_url(explicit));
                format!("{explicit}{API_PREFIX}")
            }
            None => format!("{}{API_PREFIX}", to_stream_scheme(&base)),
        };

        debug!(rest = %rest_base_url, stream = %stream_base_url, "resolved remote endpoints");
        Ok(Self {
            rest_base_url,
            stream_base_url,
            is_local: false,
        })
    }

    /// `GET {rest}/agents/{id}/architecture`
    pub fn architecture_url(&self, agent_id: &str) -> String {
        format!("{}/agents/{agent_id}/architecture", self.rest_base_url)
    }

    /// `POST {rest}/agents/{id}/run`
    pub fn run_url(&self, agent_id: &str) -> String {
        format!("{}/agents/{agent_id}/run", self.rest_base_url)
    }

    /// `{stream}/agents/{id}/run-stream`, without credentials.
    pub fn run_stream_url(&self, agent_id: &str) -> String {
        format!("{}/agents/{agent_id}/run-stream", self.stream_base_url)
    }

    /// `GET {rest}/health`
    pub fn health_url(&self) -> String {
        format!("{}/health", self.rest_base_url)
    }
}

fn local_address(
    config: &ResolvedConfig,
    registry: Option<&dyn AgentRegistry>,
) -> RunAgentResult<AgentAddress> {
    if let (Some(host), Some(port)) = (&config.host, config.port) {
        return Ok(AgentAddress::new(host.clone(), port));
    }

    if config.enable_registry {
        if let Some(address) = registry.and_then(|r| r.lookup(&config.agent_id)) {
            debug!(agent_id = %config.agent_id, %address, "found agent in local registry");
            return Ok(address);
        }
    }

    Err(RunAgentError::validation(format!(
        "unable to resolve local host/port for agent '{}'",
        config.agent_id
    ))
    .with_suggestion(
        "Pass host and port explicitly, or make sure the agent is registered locally (runagent serve)",
    )
    .with_details(serde_json::json!({
        "agent_id": config.agent_id,
        "registry_enabled": config.enable_registry,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::ErrorKind;
    use crate::registry::StaticRegistry;
    use std::collections::HashMap;

    fn resolve(config: ClientConfig) -> ResolvedConfig {
        config.resolve_with(&HashMap::<String, String>::new()).unwrap()
    }

    #[test]
    fn local_with_explicit_address() {
        let cfg = resolve(ClientConfig::new("a1", "chat").local(true).host("127.0.0.1").port(9000));
        let ep = ResolvedEndpoints::resolve(&cfg, None).unwrap();
        assert_eq!(ep.rest_base_url, "http://127.0.0.1:9000/api/v1");
        assert_eq!(ep.stream_base_url, "ws://127.0.0.1:9000/api/v1");
        assert!(ep.is_local);
        assert_eq!(ep.run_url("a1"), "http://127.0.0.1:9000/api/v1/agents/a1/run");
        assert_eq!(
            ep.run_stream_url("a1"),
            "ws://127.0.0.1:9000/api/v1/agents/a1/run-stream"
        );
    }

    #[test]
    fn local_explicit_address_wins_over_registry() {
        let registry = StaticRegistry::new().with_agent("a1", AgentAddress::new("10.0.0.9", 1));
        let cfg = resolve(ClientConfig::new("a1", "chat").local(true).host("h").port(2));
        let ep = ResolvedEndpoints::resolve(&cfg, Some(&registry)).unwrap();
        assert_eq!(ep.rest_base_url, "http://h:2/api/v1");
    }

    #[test]
    fn local_falls_back_to_registry() {
        let registry = StaticRegistry::new().with_agent("a1", AgentAddress::new("10.0.0.9", 8451));
        let cfg = resolve(ClientConfig::new("a1", "chat").local(true).host("ignored"));
        let ep = ResolvedEndpoints::resolve(&cfg, Some(&registry)).unwrap();
        assert_eq!(ep.rest_base_url, "http://10.0.0.9:8451/api/v1");
    }

    #[test]
    fn local_registry_disabled_or_missing_fails() {
        let registry = StaticRegistry::new().with_agent("a1", AgentAddress::new("h", 1));
        let cfg = resolve(ClientConfig::new("a1", "chat").local(true).enable_registry(false));
        let err = ResolvedEndpoints::resolve(&cfg, Some(&registry)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("unable to resolve local host/port"));
        assert!(err.suggestion.is_some());

        let cfg = resolve(ClientConfig::new("a2", "chat").local(true));
        assert!(ResolvedEndpoints::resolve(&cfg, Some(&registry)).is_err());
        assert!(ResolvedEndpoints::resolve(&cfg, None).is_err());
    }

    #[test]
    fn remote_default_base() {
        let cfg = resolve(ClientConfig::new("a1", "chat"));
        let ep = ResolvedEndpoints::resolve(&cfg, None).unwrap();
        assert_eq!(ep.rest_base_url, "https://backend.run-agent.ai/api/v1");
        assert_eq!(ep.stream_base_url, "wss://backend.run-agent.ai/api/v1");
        assert!(!ep.is_local);
        assert_eq!(ep.health_url(), "https://backend.run-agent.ai/api/v1/health");
    }

    #[test]
    fn remote_base_without_scheme_and_with_slash() {
        let cfg = resolve(ClientConfig::new("a1", "chat").base_url("agents.example.com/"));
        let ep = ResolvedEndpoints::resolve(&cfg, None).unwrap();
        assert_eq!(ep.rest_base_url, "https://agents.example.com/api/v1");
        assert_eq!(ep.stream_base_url, "wss://agents.example.com/api/v1");
    }

    #[test]
    fn remote_plain_http_maps_to_ws() {
        let cfg = resolve(ClientConfig::new("a1", "chat").base_url("http://10.1.1.1:8080"));
        let ep = ResolvedEndpoints::resolve(&cfg, None).unwrap();
        assert_eq!(ep.stream_base_url, "ws://10.1.1.1:8080/api/v1");
    }

    #[test]
    fn remote_explicit_stream_base_takes_precedence() {
        let cfg = resolve(
            ClientConfig::new("a1", "chat")
                .base_url("https://api.example.com")
                .stream_base_url("stream.example.com/"),
        );
        let ep = ResolvedEndpoints::resolve(&cfg, None).unwrap();
        assert_eq!(ep.rest_base_url, "https://api.example.com/api/v1");
        assert_eq!(ep.stream_base_url, "wss://stream.example.com/api/v1");
    }
}
