//! Decoding of `POST /agents/{id}/run` responses.

use serde_json::Value;

use crate::codec;
use crate::error::{ErrorKind, RunAgentError, RunAgentResult};
use crate::types::RunResponse;

use super::transport::HttpResponse;

/// Markers of a generator repr returned through the non-streaming path.
const GENERATOR_MARKERS: [&str; 2] = ["generator object", "<generator"];

/// Turn a run response into the decoded result value.
///
/// Result lookup order: `data` as serialized text, `data.result_data.data`,
/// `data` itself, then `output_data`. A body that is not an envelope is
/// decoded as a bare value.
///
/// # Errors
///
/// Non-2xx statuses go through [`RunAgentError::from_status`];
/// `success: false` becomes the remote error (or `SERVER_ERROR`).
pub fn decode_run_response(
    response: &HttpResponse,
    agent_id: &str,
    entrypoint_tag: &str,
    is_local: bool,
) -> RunAgentResult<Value> {
    if !response.is_success() {
        return Err(RunAgentError::from_status(
            response.status,
            &response.body,
            agent_id,
            is_local,
        ));
    }

    let body = match serde_json::from_str::<Value>(&response.body) {
        Ok(body) => body,
        // not JSON at all: the legacy plain-text shape
        Err(_) => return check_generator(Value::String(response.body.clone()), entrypoint_tag),
    };

    if !RunResponse::is_envelope(&body) {
        return check_generator(codec::decode(body), entrypoint_tag);
    }

    let envelope: RunResponse = serde_json::from_value(body)?;
    if !envelope.succeeded() {
        let payload = envelope.error_payload();
        if payload.code.is_none() && payload.message.is_none() {
            return Err(RunAgentError::server("the agent run failed without an error message"));
        }
        return Err(RunAgentError::from_remote(&payload, ErrorKind::Server));
    }

    let value = match envelope.data {
        Some(data) if !data.is_null() => decode_data(data),
        _ => envelope.output_data.map(codec::decode_field).unwrap_or(Value::Null),
    };
    check_generator(value, entrypoint_tag)
}

fn decode_data(data: Value) -> Value {
    match data {
        Value::String(text) => codec::decode_str(&text),
        Value::Object(mut obj) => {
            // detailed-execution shape: {"result_data": {"data": ...}}
            let nested = obj
                .get_mut("result_data")
                .and_then(Value::as_object_mut)
                .and_then(|result| result.remove("data"));
            match nested {
                Some(nested) => codec::decode_field(nested),
                None => codec::decode(Value::Object(obj)),
            }
        }
        other => codec::decode(other),
    }
}

/// Compatibility shim: some servers run a streaming function through `run`
/// and return the generator's repr as the result text.
fn check_generator(value: Value, entrypoint_tag: &str) -> RunAgentResult<Value> {
    if let Value::String(text) = &value {
        if GENERATOR_MARKERS.iter().any(|marker| text.contains(marker)) {
            return Err(RunAgentError::validation(format!(
                "entrypoint '{entrypoint_tag}' returned a generator; it must be called with run_stream"
            ))
            .with_suggestion("Use run_stream with a streaming entrypoint (tag ending in '_stream')")
            .with_details(serde_json::json!({
                "entrypoint_tag": entrypoint_tag,
                "result": text,
            })));
        }
    }
    Ok(value)
}
