//! Streaming round trips: `RunAgentClient` (tokio-tungstenite) against an
//! in-process axum WebSocket endpoint.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    client, data_frame, error_frame, init_tracing, local_config, remote_config, start_mock_agent,
    status_frame, CountingStream, MockAgent, MockServer,
};
use futures::StreamExt;
use runagent::client::WebSocketTransport;
use runagent::codec;
use runagent::{ClientBuilder, ClientConfig, ErrorKind, RunAgentClient};
use serde_json::json;

fn counting_client(config: ClientConfig) -> (RunAgentClient, Arc<CountingStream>) {
    let stream = Arc::new(CountingStream::wrapping(Arc::new(WebSocketTransport::new())));
    let c = ClientBuilder::new(config)
        .with_env(std::collections::HashMap::<String, String>::new())
        .with_stream_transport(stream.clone())
        .build()
        .unwrap();
    (c, stream)
}

async fn wait_for_session_end(server: &MockServer) {
    for _ in 0..50 {
        if server.agent.recorded().stream_sessions_ended > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn stream_yields_values_in_order() {
    init_tracing();
    let server = start_mock_agent(MockAgent::new(&["chat_stream"]).stream(vec![
        status_frame("stream_started"),
        data_frame(json!("a")),
        data_frame(json!("b")),
        data_frame(json!("c")),
        status_frame("stream_completed"),
    ]))
    .await;

    let c = client(local_config(&server, "chat_stream"));
    let values = c.run_stream(json!({})).await.unwrap().collect_values().await.unwrap();
    assert_eq!(values, vec![json!("a"), json!("b"), json!("c")]);

    let rec = server.agent.recorded();
    assert_eq!(
        rec.stream_requests,
        vec![json!({
            "entrypoint_tag": "chat_stream",
            "input_args": [],
            "input_kwargs": {},
            "timeout_seconds": 300,
            "async_execution": false
        })]
    );
    assert_eq!(rec.stream_tokens, vec![None]);
}

#[tokio::test]
async fn stream_decodes_enveloped_payloads() {
    let server = start_mock_agent(MockAgent::new(&["chat_stream"]).stream(vec![
        data_frame(json!(codec::encode_to_string(&json!("7")))),
        data_frame(json!({"type": "integer", "payload": "7"})),
        data_frame(json!(codec::encode_to_string(&json!({"delta": "hi"})))),
        status_frame("stream_completed"),
    ]))
    .await;

    let c = client(local_config(&server, "chat_stream"));
    let mut stream = c.run_stream(json!({"message": "hi"})).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), json!("7"));
    assert_eq!(stream.next().await.unwrap().unwrap(), json!(7));
    assert_eq!(stream.next().await.unwrap().unwrap(), json!({"delta": "hi"}));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn completed_stream_closes_connection_once() {
    let server = start_mock_agent(MockAgent::new(&["chat_stream"]).stream(vec![
        data_frame(json!("x")),
        data_frame(json!("y")),
        status_frame("stream_completed"),
    ]))
    .await;

    let (c, transport) = counting_client(local_config(&server, "chat_stream"));
    let mut stream = c.run_stream(json!({})).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), json!("x"));
    assert_eq!(stream.next().await.unwrap().unwrap(), json!("y"));
    assert!(stream.next().await.is_none());
    assert!(stream.is_closed());
    drop(stream);

    wait_for_session_end(&server).await;
    assert_eq!(transport.closes(), 1);
    assert_eq!(server.agent.recorded().stream_sessions_ended, 1);
}

#[tokio::test]
async fn stream_error_status_after_data() {
    let server = start_mock_agent(MockAgent::new(&["chat_stream"]).stream(vec![
        data_frame(json!("partial")),
        status_frame("stream_error"),
        data_frame(json!("never seen")),
    ]))
    .await;

    let (c, transport) = counting_client(local_config(&server, "chat_stream"));
    let mut stream = c.run_stream(json!({})).await.unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), json!("partial"));
    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Stream);
    assert!(stream.next().await.is_none());
    drop(stream);

    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn error_frame_terminates_stream() {
    let server = start_mock_agent(MockAgent::new(&["chat_stream"]).stream(vec![error_frame(
        "SERVER_ERROR",
        "model overloaded",
    )]))
    .await;

    let c = client(local_config(&server, "chat_stream"));
    let err = c.run_stream(json!({})).await.unwrap().collect_values().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(err.message, "model overloaded");
}

#[tokio::test]
async fn retry_status_is_retryable() {
    let server = start_mock_agent(
        MockAgent::new(&["chat_stream"]).stream(vec![status_frame("stream_retry")]),
    )
    .await;

    let c = client(local_config(&server, "chat_stream"));
    let err = c.run_stream(json!({})).await.unwrap().collect_values().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::StreamRetry);
    assert!(err.is_retryable());
    assert!(err.suggestion.is_some());
}

#[tokio::test]
async fn unparseable_frame_is_yielded_as_text() {
    let server = start_mock_agent(MockAgent::new(&["chat_stream"]).stream(vec![
        "plain text chunk".to_string(),
        status_frame("stream_completed"),
    ]))
    .await;

    let c = client(local_config(&server, "chat_stream"));
    let values = c.run_stream(json!({})).await.unwrap().collect_values().await.unwrap();
    assert_eq!(values, vec![json!("plain text chunk")]);
}

#[tokio::test]
async fn abandoned_stream_releases_connection() {
    let server = start_mock_agent(MockAgent::new(&["chat_stream"]).stream(vec![
        data_frame(json!("1")),
        data_frame(json!("2")),
        data_frame(json!("3")),
    ]))
    .await;

    let (c, transport) = counting_client(local_config(&server, "chat_stream"));
    let mut stream = c.run_stream(json!({})).await.unwrap();
    assert!(stream.next().await.unwrap().is_ok());
    drop(stream);

    wait_for_session_end(&server).await;
    assert_eq!(transport.closes(), 1);
    assert_eq!(server.agent.recorded().stream_sessions_ended, 1);
}

#[tokio::test]
async fn explicit_close_releases_connection() {
    let server = start_mock_agent(
        MockAgent::new(&["chat_stream"]).stream(vec![data_frame(json!("1"))]),
    )
    .await;

    let (c, transport) = counting_client(local_config(&server, "chat_stream"));
    let stream = c.run_stream(json!({})).await.unwrap();
    stream.close().await;

    wait_for_session_end(&server).await;
    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn stream_used_through_futures_stream() {
    let server = start_mock_agent(MockAgent::new(&["chat_stream"]).stream(vec![
        data_frame(json!("a")),
        data_frame(json!("b")),
        status_frame("stream_completed"),
    ]))
    .await;

    let c = client(local_config(&server, "chat_stream"));
    let stream = c.run_stream(json!({})).await.unwrap();
    let items: Vec<_> = stream.map(|item| item.unwrap()).collect().await;
    assert_eq!(items, vec![json!("a"), json!("b")]);
}

#[tokio::test]
async fn remote_stream_sends_token_in_query() {
    let server = start_mock_agent(
        MockAgent::new(&["chat_stream"])
            .require_token("sk-stream")
            .stream(vec![data_frame(json!("ok")), status_frame("stream_completed")]),
    )
    .await;

    let c = client(remote_config(&server, "chat_stream", "sk-stream"));
    assert!(c.endpoints().stream_base_url.starts_with("ws://127.0.0.1:"));
    let values = c.run_stream(json!({})).await.unwrap().collect_values().await.unwrap();
    assert_eq!(values, vec![json!("ok")]);

    let rec = server.agent.recorded();
    assert_eq!(rec.stream_tokens, vec![Some("sk-stream".to_string())]);
    assert_eq!(rec.authorization, vec![Some("Bearer sk-stream".to_string())]);
}

#[tokio::test]
async fn rejected_stream_handshake_is_authentication_error() {
    let server = start_mock_agent(
        MockAgent::new(&["chat_stream"]).require_token("sk-right"),
    )
    .await;

    let c = client(remote_config(&server, "chat_stream", "sk-wrong"));
    let err = c.run_stream(json!({})).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);
}

#[tokio::test]
async fn stream_timeout_by_caller_drops_connection() {
    // The server sends nothing after the bootstrap; the caller gives up.
    let server = start_mock_agent(MockAgent::new(&["chat_stream"])).await;

    let (c, transport) = counting_client(local_config(&server, "chat_stream"));
    let mut stream = c.run_stream(json!({})).await.unwrap();
    let waited = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
    assert!(waited.is_err());
    drop(stream);

    wait_for_session_end(&server).await;
    assert_eq!(transport.closes(), 1);
}
