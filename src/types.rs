//! RunAgent wire types: architecture metadata, run requests and responses,
//! remote error descriptors, and stream frames.
//!
//! Field names follow the server's snake_case JSON. Response types are
//! deserialized leniently: unknown fields are ignored and optional fields
//! default to `None`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::constants::STREAM_TAG_SUFFIX;

// ============================================================================
// Architecture
// ============================================================================

/// A named, invocable unit exposed by a deployed agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Unique tag within one architecture.
    pub tag: String,

    /// Source file the entrypoint lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Module or function name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Output extractor expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<serde_json::Value>,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntryPoint {
    /// Create an entrypoint with only a tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            file: None,
            module: None,
            extractor: None,
            description: None,
        }
    }

    /// Whether this entrypoint may only be invoked through the streaming path.
    pub fn is_streaming(&self) -> bool {
        is_stream_tag(&self.tag)
    }
}

/// Whether `tag` follows the streaming-suffix convention (`*_stream`).
pub fn is_stream_tag(tag: &str) -> bool {
    tag.ends_with(STREAM_TAG_SUFFIX)
}

/// The metadata document describing an agent's entrypoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentArchitecture {
    /// Agent identifier. Some servers omit it.
    #[serde(default)]
    pub agent_id: String,

    /// Entrypoints in server order.
    #[serde(default)]
    pub entrypoints: Vec<EntryPoint>,
}

impl AgentArchitecture {
    /// Find an entrypoint by exact, case-sensitive tag.
    pub fn entrypoint(&self, tag: &str) -> Option<&EntryPoint> {
        self.entrypoints.iter().find(|ep| ep.tag == tag)
    }

    /// All tags, in server order.
    pub fn tags(&self) -> Vec<&str> {
        self.entrypoints.iter().map(|ep| ep.tag.as_str()).collect()
    }
}

// ============================================================================
// Run request / response
// ============================================================================

/// Body of `POST /agents/{id}/run` and the bootstrap message of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Entrypoint to invoke.
    pub entrypoint_tag: String,

    /// Positional arguments.
    #[serde(default)]
    pub input_args: Vec<serde_json::Value>,

    /// Keyword arguments.
    #[serde(default)]
    pub input_kwargs: serde_json::Map<String, serde_json::Value>,

    /// Server-side timeout.
    pub timeout_seconds: u64,

    /// Fire-and-forget execution (non-streaming path only).
    #[serde(default)]
    pub async_execution: bool,

    /// Opaque caller parameters, forwarded untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra_params: serde_json::Map<String, serde_json::Value>,
}

/// Caller input for one invocation.
///
/// Converts from a JSON object (keyword arguments), a JSON array (positional
/// arguments), `null` (no arguments), or any other value (a single
/// positional argument).
///
/// # Example
///
/// ```
/// use runagent::RunInput;
/// use serde_json::json;
///
/// let input = RunInput::new().arg(json!(1)).kwarg("message", json!("hi"));
/// assert_eq!(input.args.len(), 1);
/// assert_eq!(RunInput::from(json!({"message": "hi"})).kwargs["message"], "hi");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInput {
    pub args: Vec<serde_json::Value>,
    pub kwargs: serde_json::Map<String, serde_json::Value>,
    /// Ignored by the streaming path.
    pub async_execution: bool,
}

impl RunInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: serde_json::Value) -> Self {
        self.args.push(value);
        self
    }

    /// Set a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    pub fn async_execution(mut self, async_execution: bool) -> Self {
        self.async_execution = async_execution;
        self
    }
}

impl From<serde_json::Value> for RunInput {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::default(),
            serde_json::Value::Object(kwargs) => Self {
                kwargs,
                ..Self::default()
            },
            serde_json::Value::Array(args) => Self {
                args,
                ..Self::default()
            },
            other => Self {
                args: vec![other],
                ..Self::default()
            },
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for RunInput {
    fn from(kwargs: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            kwargs,
            ..Self::default()
        }
    }
}

/// The `{success, data | output_data, error, message}` response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunResponse {
    /// Missing on legacy servers; treated as success when `data` is present.
    #[serde(default)]
    pub success: Option<bool>,

    /// Primary result carrier.
    #[serde(default)]
    pub data: Option<serde_json::Value>,

    /// Legacy result carrier, used only when `data` is absent.
    #[serde(default)]
    pub output_data: Option<serde_json::Value>,

    /// Error descriptor, string or object.
    #[serde(default)]
    pub error: Option<serde_json::Value>,

    /// Free-form message.
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub request_id: Option<String>,
}

impl RunResponse {
    /// Whether a JSON object looks like this envelope rather than a bare value.
    pub fn is_envelope(value: &serde_json::Value) -> bool {
        value.as_object().is_some_and(|obj| {
            obj.contains_key("success") || obj.contains_key("data") || obj.contains_key("output_data")
        })
    }

    /// `success`, defaulting to true when the flag is missing and no error is present.
    pub fn succeeded(&self) -> bool {
        match self.success {
            Some(flag) => flag,
            None => self.error.as_ref().map_or(true, |e| e.is_null()),
        }
    }

    /// The error descriptor, falling back to `message`.
    pub fn error_payload(&self) -> ErrorPayload {
        let mut payload = self
            .error
            .as_ref()
            .filter(|e| !e.is_null())
            .map(ErrorPayload::from_value)
            .unwrap_or_default();
        if payload.message.is_none() {
            payload.message = self.message.clone();
        }
        payload
    }
}

// ============================================================================
// Remote error descriptor
// ============================================================================

/// An error as described by the server, in a `success: false` envelope, a
/// non-2xx body, or a stream `error` frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorPayload {
    /// Read a descriptor from any JSON shape.
    ///
    /// Strings become the message; objects contribute `code` (or `type`),
    /// `message` (or `detail`), `suggestion` and `details`.
    pub fn from_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(message) => Self {
                message: Some(message.clone()),
                ..Self::default()
            },
            serde_json::Value::Object(obj) => {
                let text = |keys: &[&str]| {
                    keys.iter()
                        .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
                        .map(str::to_string)
                };
                Self {
                    code: text(&["code", "type"]),
                    message: text(&["message", "detail"]),
                    suggestion: text(&["suggestion"]),
                    details: obj.get("details").filter(|d| !d.is_null()).cloned(),
                }
            }
            serde_json::Value::Null => Self::default(),
            other => Self {
                message: Some(other.to_string()),
                ..Self::default()
            },
        }
    }

    /// Extract a descriptor from an HTTP response body, if it carries one.
    ///
    /// Accepts `{"error": ...}`, FastAPI-style `{"detail": ...}`, and
    /// `{"success": false, "message": ...}`.
    pub fn from_response_body(body: &serde_json::Value) -> Option<Self> {
        let obj = body.as_object()?;
        if let Some(error) = obj.get("error").filter(|e| !e.is_null()) {
            let mut payload = Self::from_value(error);
            if payload.message.is_none() {
                payload.message = obj.get("message").and_then(|m| m.as_str()).map(str::to_string);
            }
            return Some(payload);
        }
        if let Some(detail) = obj.get("detail").filter(|d| !d.is_null()) {
            return Some(Self::from_value(detail));
        }
        if obj.get("success").and_then(|s| s.as_bool()) == Some(false) {
            return Some(Self {
                message: obj.get("message").and_then(|m| m.as_str()).map(str::to_string),
                ..Self::default()
            });
        }
        None
    }
}

// ============================================================================
// Stream frames
// ============================================================================

/// Value of the `status` field of a `status` frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamStatus {
    Started,
    Progress,
    Update,
    Completed,
    Error,
    Failed,
    Interrupted,
    Retry,
    /// Any status this client does not know; ignored.
    Other(String),
}

impl StreamStatus {
    /// Parse a wire status string.
    pub fn parse(status: &str) -> Self {
        match status {
            "stream_started" => StreamStatus::Started,
            "stream_progress" => StreamStatus::Progress,
            "stream_update" => StreamStatus::Update,
            "stream_completed" => StreamStatus::Completed,
            "stream_error" => StreamStatus::Error,
            "stream_failed" => StreamStatus::Failed,
            "stream_interrupted" => StreamStatus::Interrupted,
            "stream_retry" => StreamStatus::Retry,
            other => StreamStatus::Other(other.to_string()),
        }
    }

    /// The wire string.
    pub fn as_str(&self) -> &str {
        match self {
            StreamStatus::Started => "stream_started",
            StreamStatus::Progress => "stream_progress",
            StreamStatus::Update => "stream_update",
            StreamStatus::Completed => "stream_completed",
            StreamStatus::Error => "stream_error",
            StreamStatus::Failed => "stream_failed",
            StreamStatus::Interrupted => "stream_interrupted",
            StreamStatus::Retry => "stream_retry",
            StreamStatus::Other(s) => s,
        }
    }

    /// Whether this status ends the stream unsuccessfully.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StreamStatus::Error | StreamStatus::Failed | StreamStatus::Interrupted
        )
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound message on the streaming connection.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// Lifecycle signal.
    Status {
        status: StreamStatus,
        message: Option<String>,
        error: Option<ErrorPayload>,
    },
    /// A result chunk, still wire-encoded.
    Data(serde_json::Value),
    /// An error signaled by the server.
    Error(ErrorPayload),
}

impl StreamFrame {
    /// Parse raw frame text.
    ///
    /// Never fails: text that is not a recognizable frame becomes a
    /// [`StreamFrame::Data`] carrying the raw text.
    pub fn parse(text: &str) -> Self {
        let raw = || StreamFrame::Data(serde_json::Value::String(text.to_string()));

        let Ok(serde_json::Value::Object(obj)) = serde_json::from_str::<serde_json::Value>(text)
        else {
            return raw();
        };

        match obj.get("type").and_then(|t| t.as_str()) {
            Some("status") => {
                let Some(status) = obj.get("status").and_then(|s| s.as_str()) else {
                    return raw();
                };
                StreamFrame::Status {
                    status: StreamStatus::parse(status),
                    message: obj.get("message").and_then(|m| m.as_str()).map(str::to_string),
                    error: obj
                        .get("error")
                        .filter(|e| !e.is_null())
                        .map(ErrorPayload::from_value),
                }
            }
            Some("data") => {
                let payload = ["payload", "content", "data"]
                    .iter()
                    .find_map(|k| obj.get(*k))
                    .cloned()
                    .unwrap_or(serde_json::Value::Null);
                StreamFrame::Data(payload)
            }
            Some("error") => {
                let payload = match obj.get("error").filter(|e| !e.is_null()) {
                    Some(error) => ErrorPayload::from_value(error),
                    None => ErrorPayload::from_value(&serde_json::Value::Object(obj.clone())),
                };
                // `type` is the frame discriminator, not an error code.
                let payload = if payload.code.as_deref() == Some("error") {
                    ErrorPayload { code: None, ..payload }
                } else {
                    payload
                };
                StreamFrame::Error(payload)
            }
            _ => raw(),
        }
    }
}
