//! One-shot run: invokes a non-streaming entrypoint and prints the result.
//!
//! Start an agent locally first (e.g. `runagent serve ./my-agent`), then:
//! ```sh
//! RUNAGENT_LOCAL=1 RUNAGENT_HOST=127.0.0.1 RUNAGENT_PORT=8450 \
//!     cargo run --example run_once -- <agent-id> <entrypoint-tag> "your message"
//! ```
//!
//! For a deployed agent, set `RUNAGENT_API_KEY` instead of the local variables.

use anyhow::Context;
use runagent::{ClientConfig, RunAgentClient};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let agent_id = args.next().context("usage: run_once <agent-id> <entrypoint-tag> [message]")?;
    let tag = args.next().context("missing entrypoint tag")?;
    let message = args.next().unwrap_or_else(|| "Hello from Rust!".to_string());

    let client = RunAgentClient::new(ClientConfig::new(agent_id, tag))?;
    println!("Agent endpoint: {}", client.endpoints().rest_base_url);

    let architecture = client.get_agent_architecture().await?;
    println!("Entrypoints: {}", architecture.tags().join(", "));

    match client.run(json!({ "message": message })).await {
        Ok(result) => println!("Result: {result}"),
        Err(e) => {
            eprintln!("[{}] {}", e.code(), e.message);
            if let Some(hint) = &e.suggestion {
                eprintln!("  hint: {hint}");
            }
            std::process::exit(1);
        }
    }
    Ok(())
}
