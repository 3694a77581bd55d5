//! RunAgent client: invoke agent entrypoints.
//!
//! - [`RunAgentClient`]: `run`, `run_stream`, architecture and health calls
//!   for one agent entrypoint
//! - [`ArchitectureResolver`]: fetch an agent's entrypoint list
//! - [`HttpTransport`] / [`StreamTransport`]: pluggable transports, with
//!   [`ReqwestTransport`] and [`WebSocketTransport`] as the defaults
//! - [`AgentStream`]: lazy stream of decoded values
//!
//! # Quick Start
//!
//! ```no_run
//! use runagent::{ClientConfig, RunAgentClient};
//! use serde_json::json;
//!
//! # async fn example() -> runagent::RunAgentResult<()> {
//! let client = RunAgentClient::new(
//!     ClientConfig::new("a1", "chat_stream").local(true).host("127.0.0.1").port(8450),
//! )?;
//!
//! let mut stream = client.run_stream(json!({"message": "Write a haiku"})).await?;
//! while let Some(token) = stream.next().await {
//!     print!("{}", token?);
//! }
//! # Ok(())
//! # }
//! ```

mod agent_client;
mod architecture;
mod response;
mod stream;
mod transport;
#[cfg(feature = "client")]
mod websocket;

pub use agent_client::RunAgentClient;
pub use architecture::{ensure_entrypoint, parse_architecture_response, ArchitectureResolver};
pub use response::decode_run_response;
pub use stream::{AgentStream, StreamConnection, StreamTransport};
#[cfg(feature = "client")]
pub use transport::ReqwestTransport;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
#[cfg(feature = "client")]
pub use websocket::{WebSocketConnection, WebSocketTransport};
