//! RunAgent error types: the closed error taxonomy and its mapping rules.
//!
//! Every failure the client can produce (pre-flight validation, transport,
//! HTTP status, `success: false` envelopes, stream error frames) is
//! normalized into exactly one [`RunAgentError`] whose [`ErrorKind`] is one of
//! a fixed set of categories.

use std::fmt;
use std::sync::Arc;

use crate::types::ErrorPayload;

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Credential missing or rejected.
pub const AUTHENTICATION_ERROR: &str = "AUTHENTICATION_ERROR";

/// Authenticated but not allowed.
pub const PERMISSION_ERROR: &str = "PERMISSION_ERROR";

/// DNS, TLS, refused, timed out or dropped connection.
pub const CONNECTION_ERROR: &str = "CONNECTION_ERROR";

/// Caller-side contract violation.
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";

/// Remote execution or service failure.
pub const SERVER_ERROR: &str = "SERVER_ERROR";

/// Failure signaled inside an active stream.
pub const STREAM_ERROR: &str = "STREAM_ERROR";

/// The stream asked the caller to retry later.
pub const STREAM_RETRY: &str = "STREAM_RETRY";

/// Architecture fetch returned 404 in local mode.
pub const AGENT_NOT_FOUND_LOCAL: &str = "AGENT_NOT_FOUND_LOCAL";

/// Architecture fetch returned 404 in remote mode.
pub const AGENT_NOT_FOUND_REMOTE: &str = "AGENT_NOT_FOUND_REMOTE";

/// Architecture fetched but without entrypoints.
pub const ARCHITECTURE_MISSING: &str = "ARCHITECTURE_MISSING";

/// Fallback for anything unclassified.
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// `details.reason` for `run` called on a streaming entrypoint.
pub const REASON_STREAM_ENTRYPOINT: &str = "STREAM_ENTRYPOINT";

/// `details.reason` for `run_stream` called on a non-streaming entrypoint.
pub const REASON_NON_STREAM_ENTRYPOINT: &str = "NON_STREAM_ENTRYPOINT";

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// The closed set of error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `AUTHENTICATION_ERROR`
    Authentication,
    /// `PERMISSION_ERROR`
    Permission,
    /// `CONNECTION_ERROR`
    Connection,
    /// `VALIDATION_ERROR`
    Validation,
    /// `SERVER_ERROR`
    Server,
    /// `STREAM_ERROR`
    Stream,
    /// `STREAM_RETRY`
    StreamRetry,
    /// `AGENT_NOT_FOUND_LOCAL`
    AgentNotFoundLocal,
    /// `AGENT_NOT_FOUND_REMOTE`
    AgentNotFoundRemote,
    /// `ARCHITECTURE_MISSING`
    ArchitectureMissing,
    /// `UNKNOWN_ERROR`
    Unknown,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 11] = [
        ErrorKind::Authentication,
        ErrorKind::Permission,
        ErrorKind::Connection,
        ErrorKind::Validation,
        ErrorKind::Server,
        ErrorKind::Stream,
        ErrorKind::StreamRetry,
        ErrorKind::AgentNotFoundLocal,
        ErrorKind::AgentNotFoundRemote,
        ErrorKind::ArchitectureMissing,
        ErrorKind::Unknown,
    ];

    /// The stable wire code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => AUTHENTICATION_ERROR,
            ErrorKind::Permission => PERMISSION_ERROR,
            ErrorKind::Connection => CONNECTION_ERROR,
            ErrorKind::Validation => VALIDATION_ERROR,
            ErrorKind::Server => SERVER_ERROR,
            ErrorKind::Stream => STREAM_ERROR,
            ErrorKind::StreamRetry => STREAM_RETRY,
            ErrorKind::AgentNotFoundLocal => AGENT_NOT_FOUND_LOCAL,
            ErrorKind::AgentNotFoundRemote => AGENT_NOT_FOUND_REMOTE,
            ErrorKind::ArchitectureMissing => ARCHITECTURE_MISSING,
            ErrorKind::Unknown => UNKNOWN_ERROR,
        }
    }

    /// Parse a code sent by the server.
    ///
    /// Matching is case-insensitive and accepts the common short forms
    /// servers emit (`AUTH_ERROR`, `CONNECTION`, `INTERNAL_ERROR`, ...).
    /// Returns `None` for codes outside the taxonomy.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        let kind = match normalized.as_str() {
            AUTHENTICATION_ERROR | "AUTHENTICATION" | "AUTH_ERROR" | "UNAUTHORIZED" => {
                ErrorKind::Authentication
            }
            PERMISSION_ERROR | "PERMISSION" | "FORBIDDEN" => ErrorKind::Permission,
            CONNECTION_ERROR | "CONNECTION" | "TIMEOUT" | "TIMEOUT_ERROR" => ErrorKind::Connection,
            VALIDATION_ERROR | "VALIDATION" | "INVALID_REQUEST" => ErrorKind::Validation,
            SERVER_ERROR | "SERVER" | "INTERNAL_ERROR" | "EXECUTION_ERROR" => ErrorKind::Server,
            STREAM_ERROR => ErrorKind::Stream,
            STREAM_RETRY => ErrorKind::StreamRetry,
            AGENT_NOT_FOUND_LOCAL => ErrorKind::AgentNotFoundLocal,
            AGENT_NOT_FOUND_REMOTE => ErrorKind::AgentNotFoundRemote,
            ARCHITECTURE_MISSING => ErrorKind::ArchitectureMissing,
            UNKNOWN_ERROR | "UNKNOWN" => ErrorKind::Unknown,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// RunAgentError
// ---------------------------------------------------------------------------

/// Shared handle to a lower-level error kept as the `source()` of a
/// [`RunAgentError`].
pub type ErrorCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The single error type produced by the client.
///
/// Carries the taxonomy [`ErrorKind`], a human-readable message, and, where
/// known, an actionable suggestion plus structured details. Transport errors
/// are wrapped as the `cause`, never passed through raw.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RunAgentError {
    /// Taxonomy category.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Optional actionable hint for the caller.
    pub suggestion: Option<String>,
    /// Optional structured context.
    pub details: Option<serde_json::Value>,
    /// Wrapped lower-level error.
    #[source]
    pub cause: Option<ErrorCause>,
}

/// Convenience result type for RunAgent operations.
pub type RunAgentResult<T> = Result<T, RunAgentError>;

impl RunAgentError {
    /// Create an error of `kind` with a message and nothing else.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestion: None,
            details: None,
            cause: None,
        }
    }

    /// Attach a suggestion (builder-style).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach structured details (builder-style).
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach the lower-level error (builder-style).
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// The stable code of this error's kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// `details.reason`, when the error carries one.
    pub fn reason(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|d| d.get("reason"))
            .and_then(|r| r.as_str())
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::StreamRetry | ErrorKind::Connection | ErrorKind::Server
        )
    }

    // -- Convenience constructors --

    /// `VALIDATION_ERROR`
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// `AUTHENTICATION_ERROR`
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// `PERMISSION_ERROR`
    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, message)
    }

    /// `CONNECTION_ERROR`
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    /// `SERVER_ERROR`
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    /// `STREAM_ERROR`
    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Stream, message)
    }

    /// `STREAM_RETRY`, with the default retry suggestion.
    pub fn stream_retry(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StreamRetry, message)
            .with_suggestion("The agent asked to retry; wait a few seconds and call run_stream again")
    }

    /// `UNKNOWN_ERROR`
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// 404 on the architecture (or run) endpoint, disambiguated by mode.
    pub fn agent_not_found(agent_id: &str, is_local: bool) -> Self {
        let err = if is_local {
            Self::new(
                ErrorKind::AgentNotFoundLocal,
                format!("agent '{agent_id}' was not found on the local server"),
            )
            .with_suggestion("Start the agent locally (runagent serve <path>) and check host/port")
        } else {
            Self::new(
                ErrorKind::AgentNotFoundRemote,
                format!("agent '{agent_id}' was not found on the remote server"),
            )
            .with_suggestion("Check the agent ID and that the agent is deployed to this account")
        };
        err.with_details(serde_json::json!({ "agent_id": agent_id }))
    }

    /// Architecture without any entrypoints.
    pub fn architecture_missing(agent_id: &str) -> Self {
        Self::new(
            ErrorKind::ArchitectureMissing,
            format!("agent '{agent_id}' exposes no entrypoints"),
        )
        .with_suggestion("Redeploy the agent with entrypoints configured in runagent.config.json")
        .with_details(serde_json::json!({ "agent_id": agent_id }))
    }

    /// Remote mode without an API key.
    pub fn missing_api_key() -> Self {
        Self::authentication("an API key is required for remote agents")
            .with_suggestion("Set RUNAGENT_API_KEY or pass api_key in ClientConfig")
    }

    /// `run` called on a streaming entrypoint.
    pub fn stream_entrypoint(tag: &str) -> Self {
        Self::validation(format!(
            "entrypoint '{tag}' is a streaming entrypoint and cannot be called with run"
        ))
        .with_suggestion("Use run_stream for entrypoints whose tag ends in '_stream'")
        .with_details(serde_json::json!({
            "reason": REASON_STREAM_ENTRYPOINT,
            "entrypoint_tag": tag,
        }))
    }

    /// `run_stream` called on a non-streaming entrypoint.
    pub fn non_stream_entrypoint(tag: &str) -> Self {
        Self::validation(format!(
            "entrypoint '{tag}' is not a streaming entrypoint and cannot be called with run_stream"
        ))
        .with_suggestion("Use run for entrypoints whose tag does not end in '_stream'")
        .with_details(serde_json::json!({
            "reason": REASON_NON_STREAM_ENTRYPOINT,
            "entrypoint_tag": tag,
        }))
    }

    // -- Mapping --

    /// Classify a non-success HTTP status.
    ///
    /// When the body carries an `error` descriptor its message, suggestion
    /// and details are kept, but the status decides the kind.
    pub fn from_status(status: u16, body: &str, agent_id: &str, is_local: bool) -> Self {
        let payload = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .as_ref()
            .and_then(ErrorPayload::from_response_body);

        let mut err = match status {
            401 => Self::authentication("the API key was missing or rejected")
                .with_suggestion("Check RUNAGENT_API_KEY or the api_key passed to the client"),
            403 => Self::permission("the API key is not allowed to access this agent")
                .with_suggestion("Check that the agent belongs to the account of this API key"),
            404 => Self::agent_not_found(agent_id, is_local),
            400 | 422 => Self::validation(format!("the server rejected the request (HTTP {status})")),
            408 => Self::connection(format!("the request timed out (HTTP {status})")),
            500..=599 => Self::server(format!("the server failed to handle the request (HTTP {status})"))
                .with_suggestion("Try again later; if it persists, check the agent logs"),
            _ => Self::unknown(format!("unexpected HTTP status {status}")),
        };

        if let Some(payload) = payload {
            if let Some(message) = payload.message {
                err.message = message;
            }
            if payload.suggestion.is_some() {
                err.suggestion = payload.suggestion;
            }
            if payload.details.is_some() {
                err.details = payload.details;
            }
        }

        let mut details = match err.details.take() {
            Some(serde_json::Value::Object(map)) => map,
            Some(other) => {
                let mut map = serde_json::Map::new();
                map.insert("details".to_string(), other);
                map
            }
            None => serde_json::Map::new(),
        };
        details.insert("status".to_string(), status.into());
        err.details = Some(serde_json::Value::Object(details));
        err
    }

    /// Classify a server-side error descriptor.
    ///
    /// Uses the descriptor's code when it belongs to the taxonomy, otherwise
    /// `fallback`.
    pub fn from_remote(payload: &ErrorPayload, fallback: ErrorKind) -> Self {
        let kind = payload
            .code
            .as_deref()
            .and_then(ErrorKind::from_code)
            .unwrap_or(fallback);
        let message = payload
            .message
            .clone()
            .unwrap_or_else(|| "the agent reported an error".to_string());

        let mut err = Self::new(kind, message);
        err.suggestion = payload.suggestion.clone();
        err.details = payload.details.clone();
        if kind == ErrorKind::StreamRetry && err.suggestion.is_none() {
            err.suggestion = Some(
                "The agent asked to retry; wait a few seconds and call run_stream again".to_string(),
            );
        }
        err
    }
}

impl From<serde_json::Error> for RunAgentError {
    fn from(err: serde_json::Error) -> Self {
        RunAgentError::unknown(format!("JSON error: {err}")).with_cause(err)
    }
}

#[cfg(feature = "client")]
impl From<reqwest::Error> for RunAgentError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            format!("HTTP request failed: {err}")
        };
        RunAgentError::connection(message)
            .with_suggestion("Check that the agent server is reachable and the URL is correct")
            .with_cause(err)
    }
}

#[cfg(feature = "client")]
impl From<tokio_tungstenite::tungstenite::Error> for RunAgentError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match &err {
            WsError::Http(response) => {
                let status = response.status().as_u16();
                let kind = match status {
                    401 => ErrorKind::Authentication,
                    403 => ErrorKind::Permission,
                    500..=599 => ErrorKind::Server,
                    _ => ErrorKind::Connection,
                };
                RunAgentError::new(
                    kind,
                    format!("stream handshake rejected with HTTP {status}"),
                )
                .with_details(serde_json::json!({ "status": status }))
                .with_cause(err)
            }
            _ => RunAgentError::connection(format!("stream connection failed: {err}"))
                .with_suggestion("Check that the agent server is reachable and supports streaming")
                .with_cause(err),
        }
    }
}
