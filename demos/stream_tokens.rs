//! Streaming run: prints values from a `*_stream` entrypoint as they arrive.
//!
//! ```sh
//! RUNAGENT_LOCAL=1 RUNAGENT_HOST=127.0.0.1 RUNAGENT_PORT=8450 \
//!     cargo run --example stream_tokens -- <agent-id> chat_stream "Tell me a story"
//! ```
//!
//! Press Ctrl-C to stop early; the connection is closed on the way out.

use std::io::Write;

use anyhow::Context;
use runagent::{ClientConfig, ErrorKind, RunAgentClient};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let mut args = std::env::args().skip(1);
    let agent_id = args
        .next()
        .context("usage: stream_tokens <agent-id> <entrypoint-tag> [message]")?;
    let tag = args.next().unwrap_or_else(|| "chat_stream".to_string());
    let message = args.next().unwrap_or_else(|| "Tell me a story".to_string());

    let client = RunAgentClient::new(ClientConfig::new(agent_id, tag))?;
    let mut stream = client.run_stream(json!({ "message": message })).await?;

    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(Value::String(text))) => print!("{text}"),
                Some(Ok(other)) => print!("{other}"),
                Some(Err(e)) if e.kind == ErrorKind::StreamRetry => {
                    eprintln!("\nagent asked to retry: {}", e.message);
                    break;
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                stream.close().await;
                eprintln!("\ninterrupted");
                return Ok(());
            }
        }
        stdout.flush()?;
    }
    println!();
    Ok(())
}
