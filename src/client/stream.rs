//! Streaming transport traits and the lazy result stream.
//!
//! [`AgentStream`] pulls frames off a [`StreamConnection`] only when the
//! caller asks for the next value. Status frames are consumed silently, data
//! frames are decoded and yielded, and the first terminal frame closes the
//! connection. The connection is closed exactly once on every exit path:
//! completion, error, explicit [`AgentStream::close`], or drop.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Fuse, FusedStream, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::codec;
use crate::error::{ErrorKind, RunAgentError, RunAgentResult};
use crate::types::{StreamFrame, StreamStatus};

/// Opens streaming connections.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Connect to `url`. Failures are `CONNECTION_ERROR` (or the handshake's
    /// HTTP classification).
    async fn connect(&self, url: &str) -> RunAgentResult<Box<dyn StreamConnection>>;
}

/// One open, message-oriented connection.
///
/// Dropping a connection must release it.
#[async_trait]
pub trait StreamConnection: Send {
    /// Send one text message.
    async fn send_text(&mut self, text: String) -> RunAgentResult<()>;

    /// Next inbound text message. `None` once the peer has closed.
    async fn next_text(&mut self) -> Option<RunAgentResult<String>>;

    /// Close the connection.
    async fn close(&mut self) -> RunAgentResult<()>;
}

type Slot = Arc<Mutex<Option<Box<dyn StreamConnection>>>>;

/// Take the connection out of `slot` and close it. A second call is a no-op.
async fn close_slot(slot: &Slot) {
    let conn = slot.lock().await.take();
    if let Some(mut conn) = conn {
        if let Err(e) = conn.close().await {
            debug!(error = %e, "error while closing stream connection");
        }
    }
}

/// What to do after one frame.
enum Step {
    Continue,
    Yield(Value),
    Complete,
    Fail(RunAgentError),
}

fn dispatch(frame: StreamFrame) -> Step {
    match frame {
        StreamFrame::Data(payload) => Step::Yield(codec::decode_field(payload)),
        StreamFrame::Error(payload) => {
            Step::Fail(RunAgentError::from_remote(&payload, ErrorKind::Stream))
        }
        StreamFrame::Status {
            status,
            message,
            error,
        } => match status {
            StreamStatus::Completed => Step::Complete,
            StreamStatus::Retry => {
                let mut err = match &error {
                    Some(payload) => RunAgentError::from_remote(payload, ErrorKind::StreamRetry),
                    None => RunAgentError::stream_retry(
                        message.unwrap_or_else(|| "the agent asked to retry the stream".to_string()),
                    ),
                };
                err.kind = ErrorKind::StreamRetry;
                if err.suggestion.is_none() {
                    err.suggestion = RunAgentError::stream_retry("").suggestion;
                }
                Step::Fail(err)
            }
            s if s.is_failure() => {
                let mut err = match &error {
                    Some(payload) => RunAgentError::from_remote(payload, ErrorKind::Stream),
                    None => RunAgentError::stream(
                        message.unwrap_or_else(|| format!("stream ended with status {s}")),
                    ),
                };
                err.kind = ErrorKind::Stream;
                if err.details.is_none() {
                    err.details = Some(serde_json::json!({ "status": s.as_str() }));
                }
                Step::Fail(err)
            }
            other => {
                debug!(status = %other, "stream status");
                Step::Continue
            }
        },
    }
}

struct Pump {
    slot: Slot,
    invocation_id: String,
    finished: bool,
}

/// Lazy, single-pass sequence of decoded stream values.
///
/// Implements [`futures::Stream`]; [`AgentStream::next`] is provided for
/// callers that do not want to import `StreamExt`. Once an item is an
/// `Err`, the stream is over.
///
/// # Example
///
/// ```no_run
/// # async fn example(mut stream: runagent::AgentStream) -> runagent::RunAgentResult<()> {
/// while let Some(value) = stream.next().await {
///     println!("{}", value?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct AgentStream {
    inner: Fuse<BoxStream<'static, RunAgentResult<Value>>>,
    slot: Slot,
}

impl std::fmt::Debug for AgentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentStream")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl AgentStream {
    /// Wrap an open connection whose bootstrap message was already sent.
    pub fn new(connection: Box<dyn StreamConnection>, invocation_id: impl Into<String>) -> Self {
        let slot: Slot = Arc::new(Mutex::new(Some(connection)));
        let pump = Pump {
            slot: slot.clone(),
            invocation_id: invocation_id.into(),
            finished: false,
        };

        let inner = stream::unfold(pump, |mut pump| async move {
            if pump.finished {
                return None;
            }
            loop {
                let next = {
                    let mut guard = pump.slot.lock().await;
                    // Closed from outside: nothing more to read.
                    let conn = guard.as_mut()?;
                    conn.next_text().await
                };

                let step = match next {
                    Some(Ok(text)) => dispatch(StreamFrame::parse(&text)),
                    Some(Err(err)) => Step::Fail(err),
                    None => Step::Fail(
                        RunAgentError::connection("stream closed before completion")
                            .with_suggestion("The agent disconnected early; check the agent logs"),
                    ),
                };

                match step {
                    Step::Continue => continue,
                    Step::Yield(value) => return Some((Ok(value), pump)),
                    Step::Complete => {
                        debug!(invocation_id = %pump.invocation_id, "stream completed");
                        close_slot(&pump.slot).await;
                        return None;
                    }
                    Step::Fail(err) => {
                        warn!(invocation_id = %pump.invocation_id, error = %err, "stream failed");
                        close_slot(&pump.slot).await;
                        pump.finished = true;
                        return Some((Err(err), pump));
                    }
                }
            }
        });

        Self {
            inner: inner.boxed().fuse(),
            slot,
        }
    }

    /// Next decoded value, `None` when the stream is over.
    pub async fn next(&mut self) -> Option<RunAgentResult<Value>> {
        self.inner.next().await
    }

    /// Stop consuming and close the connection.
    pub async fn close(mut self) {
        self.inner = stream::empty().boxed().fuse();
        close_slot(&self.slot).await;
    }

    /// Whether the connection has been released.
    pub fn is_closed(&self) -> bool {
        self.slot.try_lock().map(|g| g.is_none()).unwrap_or(false)
    }

    /// Drain the stream into a vector, stopping at the first error.
    pub async fn collect_values(mut self) -> RunAgentResult<Vec<Value>> {
        let mut values = Vec::new();
        while let Some(item) = self.next().await {
            values.push(item?);
        }
        Ok(values)
    }
}

impl Stream for AgentStream {
    type Item = RunAgentResult<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl FusedStream for AgentStream {
    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

impl Drop for AgentStream {
    fn drop(&mut self) {
        // Drop the pump first so it no longer holds the slot.
        self.inner = stream::empty().boxed().fuse();

        let Ok(mut guard) = self.slot.try_lock() else {
            return;
        };
        let Some(mut conn) = guard.take() else {
            return;
        };
        debug!("stream dropped before completion, closing connection");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = conn.close().await {
                        debug!(error = %e, "error while closing dropped stream connection");
                    }
                });
            }
            // No runtime: dropping the connection releases it.
            Err(_) => drop(conn),
        }
    }
}
