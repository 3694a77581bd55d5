//! Client configuration and its resolution against the environment.
//!
//! Every field resolves independently with the precedence
//! **explicit > environment > default**:
//!
//! - booleans: explicit `Some(_)`, then a parseable env value, then the default
//! - strings: the first candidate that is non-empty after trimming
//! - numbers: the first candidate that is strictly positive
//!
//! The environment is read through [`EnvSource`], so tests can resolve
//! against a plain `HashMap` instead of the process environment.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::{RunAgentError, RunAgentResult};
use crate::utils::constants::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECONDS, ENV_API_KEY, ENV_BASE_URL, ENV_HOST, ENV_LOCAL,
    ENV_PORT, ENV_STREAM_BASE_URL, ENV_TIMEOUT, RUN_TIMEOUT_BUFFER_SECONDS,
};

/// Read access to environment variables.
pub trait EnvSource {
    /// Value of `key`, if set.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Caller-supplied configuration. Unset fields fall back to the
/// environment, then to library defaults.
///
/// # Example
///
/// ```
/// use runagent::ClientConfig;
///
/// let config = ClientConfig::new("a1", "chat")
///     .local(true)
///     .host("127.0.0.1")
///     .port(9000);
/// assert_eq!(config.port, Some(9000));
/// ```
#[derive(Clone, Default)]
pub struct ClientConfig {
    /// Agent identifier. Required.
    pub agent_id: String,
    /// Entrypoint to invoke. Required.
    pub entrypoint_tag: String,
    /// Local mode. Env: `RUNAGENT_LOCAL`. Default `false`.
    pub local: Option<bool>,
    /// Local host. Env: `RUNAGENT_HOST`.
    pub host: Option<String>,
    /// Local port. Env: `RUNAGENT_PORT`.
    pub port: Option<u16>,
    /// API key for remote mode. Env: `RUNAGENT_API_KEY`.
    pub api_key: Option<String>,
    /// Remote base URL. Env: `RUNAGENT_BASE_URL`.
    pub base_url: Option<String>,
    /// Remote streaming base URL. Env: `RUNAGENT_STREAM_BASE_URL`.
    pub stream_base_url: Option<String>,
    /// Timeout in seconds. Env: `RUNAGENT_TIMEOUT`. Default 300.
    pub timeout_seconds: Option<u64>,
    /// Opaque parameters forwarded with every request.
    pub extra_params: serde_json::Map<String, serde_json::Value>,
    /// Consult the local registry when host/port are missing. Default `true`.
    pub enable_registry: Option<bool>,
}

impl ClientConfig {
    /// Create a configuration for `agent_id` / `entrypoint_tag`.
    pub fn new(agent_id: impl Into<String>, entrypoint_tag: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            entrypoint_tag: entrypoint_tag.into(),
            ..Self::default()
        }
    }

    pub fn local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn stream_base_url(mut self, stream_base_url: impl Into<String>) -> Self {
        self.stream_base_url = Some(stream_base_url.into());
        self
    }

    pub fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Add one extra parameter.
    pub fn extra_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra_params.insert(key.into(), value);
        self
    }

    pub fn enable_registry(mut self, enable: bool) -> Self {
        self.enable_registry = Some(enable);
        self
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> RunAgentResult<ResolvedConfig> {
        self.resolve_with(&ProcessEnv)
    }

    /// Resolve against `env`.
    ///
    /// Fails with `VALIDATION_ERROR` when `agent_id` or `entrypoint_tag` is
    /// empty. Performs no I/O.
    pub fn resolve_with(&self, env: &dyn EnvSource) -> RunAgentResult<ResolvedConfig> {
        let agent_id = self.agent_id.trim();
        if agent_id.is_empty() {
            return Err(RunAgentError::validation("agent_id is required")
                .with_suggestion("Pass the agent ID shown by `runagent deploy` or `runagent serve`"));
        }
        let entrypoint_tag = self.entrypoint_tag.trim();
        if entrypoint_tag.is_empty() {
            return Err(RunAgentError::validation("entrypoint_tag is required")
                .with_suggestion("Pass one of the entrypoint tags from the agent's runagent.config.json"));
        }

        let local = resolve_bool(self.local, env.var(ENV_LOCAL).as_deref(), false);
        let host = first_non_empty([self.host.clone(), env.var(ENV_HOST)]);
        let port = first_positive([
            self.port.map(u64::from),
            env.var(ENV_PORT).and_then(|p| p.trim().parse::<u16>().ok()).map(u64::from),
        ])
        .and_then(|p| u16::try_from(p).ok());
        let api_key = first_non_empty([self.api_key.clone(), env.var(ENV_API_KEY)]);
        let base_url = first_non_empty([
            self.base_url.clone(),
            env.var(ENV_BASE_URL),
            Some(DEFAULT_BASE_URL.to_string()),
        ])
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let stream_base_url =
            first_non_empty([self.stream_base_url.clone(), env.var(ENV_STREAM_BASE_URL)]);
        let timeout_seconds = first_positive([
            self.timeout_seconds,
            env.var(ENV_TIMEOUT).and_then(|t| t.trim().parse::<u64>().ok()),
            Some(DEFAULT_TIMEOUT_SECONDS),
        ])
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        let enable_registry = self.enable_registry.unwrap_or(true);

        Ok(ResolvedConfig {
            agent_id: agent_id.to_string(),
            entrypoint_tag: entrypoint_tag.to_string(),
            local,
            host,
            port,
            api_key,
            base_url,
            stream_base_url,
            timeout_seconds,
            extra_params: self.extra_params.clone(),
            enable_registry,
        })
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("agent_id", &self.agent_id)
            .field("entrypoint_tag", &self.entrypoint_tag)
            .field("local", &self.local)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("stream_base_url", &self.stream_base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("enable_registry", &self.enable_registry)
            .finish_non_exhaustive()
    }
}

/// Fully-populated configuration. Immutable for the client's lifetime.
#[derive(Clone, PartialEq)]
pub struct ResolvedConfig {
    pub agent_id: String,
    pub entrypoint_tag: String,
    pub local: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    /// Remote base URL, as configured (not yet normalized).
    pub base_url: String,
    pub stream_base_url: Option<String>,
    pub timeout_seconds: u64,
    pub extra_params: serde_json::Map<String, serde_json::Value>,
    pub enable_registry: bool,
}

impl ResolvedConfig {
    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Client-side deadline for `run`: the configured timeout plus a buffer.
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.saturating_add(RUN_TIMEOUT_BUFFER_SECONDS))
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("agent_id", &self.agent_id)
            .field("entrypoint_tag", &self.entrypoint_tag)
            .field("local", &self.local)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("stream_base_url", &self.stream_base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("enable_registry", &self.enable_registry)
            .finish_non_exhaustive()
    }
}

/// Parse a boolean env value. Unrecognized values yield `None`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn resolve_bool(explicit: Option<bool>, env: Option<&str>, default: bool) -> bool {
    explicit
        .or_else(|| env.and_then(parse_bool))
        .unwrap_or(default)
}

fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

fn first_positive<const N: usize>(candidates: [Option<u64>; N]) -> Option<u64> {
    candidates.into_iter().flatten().find(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_with_empty_env() {
        let resolved = ClientConfig::new("a1", "chat").resolve_with(&env(&[])).unwrap();
        assert!(!resolved.local);
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
        assert_eq!(resolved.timeout_seconds, 300);
        assert!(resolved.enable_registry);
        assert!(resolved.api_key.is_none());
        assert_eq!(resolved.run_timeout(), Duration::from_secs(310));
    }

    #[test]
    fn empty_required_fields_fail_fast() {
        let err = ClientConfig::new("  ", "chat").resolve_with(&env(&[])).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
        assert!(err.message.contains("agent_id"));

        let err = ClientConfig::new("a1", "").resolve_with(&env(&[])).unwrap_err();
        assert!(err.message.contains("entrypoint_tag"));
    }

    #[test]
    fn env_fills_unset_fields() {
        let e = env(&[
            (ENV_LOCAL, "yes"),
            (ENV_HOST, "10.0.0.2"),
            (ENV_PORT, "8450"),
            (ENV_TIMEOUT, "60"),
            (ENV_API_KEY, "env-key"),
        ]);
        let resolved = ClientConfig::new("a1", "chat").resolve_with(&e).unwrap();
        assert!(resolved.local);
        assert_eq!(resolved.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(resolved.port, Some(8450));
        assert_eq!(resolved.timeout_seconds, 60);
        assert_eq!(resolved.api_key.as_deref(), Some("env-key"));
    }

    #[test]
    fn explicit_beats_env_per_field() {
        let e = env(&[(ENV_LOCAL, "true"), (ENV_HOST, "env-host"), (ENV_PORT, "1")]);
        let resolved = ClientConfig::new("a1", "chat")
            .local(false)
            .port(2)
            .resolve_with(&e)
            .unwrap();
        assert!(!resolved.local);
        assert_eq!(resolved.port, Some(2));
        // not set explicitly, so the env wins
        assert_eq!(resolved.host.as_deref(), Some("env-host"));
    }

    #[test]
    fn blank_and_non_positive_values_fall_through() {
        let e = env(&[(ENV_HOST, "  "), (ENV_TIMEOUT, "0"), (ENV_LOCAL, "maybe")]);
        let resolved = ClientConfig::new("a1", "chat")
            .host("")
            .timeout_seconds(0)
            .resolve_with(&e)
            .unwrap();
        assert_eq!(resolved.host, None);
        assert_eq!(resolved.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
        assert!(!resolved.local);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ClientConfig::new("a1", "chat").api_key("secret-key");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        let resolved = config.resolve_with(&env(&[])).unwrap();
        assert!(!format!("{resolved:?}").contains("secret-key"));
    }

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
