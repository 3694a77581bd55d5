//! Constants for paths, defaults and environment variable names used
//! throughout the RunAgent client.

/// API path prefix appended to every base URL.
pub const API_PREFIX: &str = "/api/v1";

/// Hosted RunAgent endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://backend.run-agent.ai";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Added to the configured timeout on the client side of `run`, so the
/// server can time out and report first.
pub const RUN_TIMEOUT_BUFFER_SECONDS: u64 = 10;

/// Tags ending in this suffix are streaming-only.
pub const STREAM_TAG_SUFFIX: &str = "_stream";

/// Env: API key for remote mode.
pub const ENV_API_KEY: &str = "RUNAGENT_API_KEY";

/// Env: remote base URL override.
pub const ENV_BASE_URL: &str = "RUNAGENT_BASE_URL";

/// Env: remote streaming base URL override.
pub const ENV_STREAM_BASE_URL: &str = "RUNAGENT_STREAM_BASE_URL";

/// Env: local-mode flag.
pub const ENV_LOCAL: &str = "RUNAGENT_LOCAL";

/// Env: local host override.
pub const ENV_HOST: &str = "RUNAGENT_HOST";

/// Env: local port override.
pub const ENV_PORT: &str = "RUNAGENT_PORT";

/// Env: timeout override in seconds.
pub const ENV_TIMEOUT: &str = "RUNAGENT_TIMEOUT";

/// `User-Agent` sent on every REST call.
pub const USER_AGENT: &str = concat!("runagent-rust/", env!("CARGO_PKG_VERSION"));
