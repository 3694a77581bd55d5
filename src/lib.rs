//! # runagent: Rust client for RunAgent agent endpoints
//!
//! Invoke a named entrypoint of a locally- or remotely-hosted agent, either
//! as a single request/response exchange or as an incremental stream of
//! values over a WebSocket.
//!
//! This crate provides:
//! - **Configuration resolution** with explicit > environment > default
//!   precedence per field ([`ClientConfig`])
//! - **Endpoint resolution** for local agents (explicit address or an
//!   injectable [`registry::AgentRegistry`]) and the hosted service
//! - **Architecture validation**: entrypoints are fetched once, cached, and
//!   checked before every invocation
//! - **The `{type, payload}` value envelope** ([`codec`])
//! - **A closed error taxonomy** ([`ErrorKind`]) that every failure maps to
//!
//! ## Feature flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `client` | yes     | `reqwest` HTTP and `tokio-tungstenite` WebSocket transports |
//! | `full`   | no      | Enable all features |
//!
//! Without `client` the transport-agnostic core still builds; supply your
//! own [`client::HttpTransport`] and [`client::StreamTransport`] through
//! [`ClientBuilder`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use runagent::{ClientConfig, RunAgentClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Remote agent; the API key comes from RUNAGENT_API_KEY.
//!     let client = RunAgentClient::new(ClientConfig::new("my-agent-id", "chat"))?;
//!     let reply = client.run(json!({"message": "Write a haiku about Rust"})).await?;
//!     println!("{reply}");
//!
//!     // Streaming entrypoints end in `_stream`.
//!     let client = RunAgentClient::new(ClientConfig::new("my-agent-id", "chat_stream"))?;
//!     let mut stream = client.run_stream(json!({"message": "Tell me a story"})).await?;
//!     while let Some(chunk) = stream.next().await {
//!         print!("{}", chunk?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Every failure is a [`RunAgentError`] with a stable [`code`](RunAgentError::code),
//! a message, and where known a suggestion and structured details:
//!
//! ```no_run
//! # use runagent::{ClientConfig, ErrorKind, RunAgentClient};
//! # async fn example(client: RunAgentClient) {
//! match client.run(serde_json::json!({})).await {
//!     Ok(value) => println!("{value}"),
//!     Err(e) if e.kind == ErrorKind::Authentication => eprintln!("check RUNAGENT_API_KEY"),
//!     Err(e) => eprintln!("{}: {}", e.code(), e.message),
//! }
//! # }
//! ```

pub mod builders;
pub mod client;
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod registry;
pub mod types;
pub mod utils;

/// Prelude module that re-exports commonly used types and traits.
///
/// # Example
///
/// ```
/// use runagent::prelude::*;
///
/// let config = ClientConfig::new("a1", "chat").local(true);
/// assert!(ErrorKind::Validation.code() == "VALIDATION_ERROR");
/// # let _ = config;
/// ```
pub mod prelude {
    pub use crate::builders::ClientBuilder;
    pub use crate::client::{AgentStream, HttpTransport, RunAgentClient, StreamTransport};
    pub use crate::config::{ClientConfig, EnvSource};
    pub use crate::error::{ErrorKind, RunAgentError, RunAgentResult};
    pub use crate::registry::{AgentAddress, AgentRegistry, StaticRegistry};
    pub use crate::types::{AgentArchitecture, EntryPoint, RunInput};
}

// Re-export core types at crate root for convenience.
pub use builders::ClientBuilder;
pub use client::{AgentStream, RunAgentClient};
pub use config::{ClientConfig, ResolvedConfig};
pub use endpoint::ResolvedEndpoints;
pub use error::{ErrorKind, RunAgentError, RunAgentResult};
pub use types::{AgentArchitecture, EntryPoint, RunInput};
