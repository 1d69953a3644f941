//! ChatTransport implementation for DashScopeClient and event decoding.

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::debug;

use crate::call::CallDescriptor;
use crate::streaming::{body_reader, sse_events, SseEvent};
use crate::{AiError, ChatTransport, ChunkStream, Message, StreamChunk, TokenUsage, ToolDefinition};

use super::client::DashScopeClient;

#[async_trait]
impl ChatTransport for DashScopeClient {
    async fn open_stream(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChunkStream, AiError> {
        let body = self.build_request_body(history, tools);

        debug!(
            model = %self.config.model,
            messages = history.len(),
            tools = tools.len(),
            "DashScope streaming request"
        );

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .header("X-DashScope-SSE", "enable")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Timeout
                } else {
                    AiError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AiError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(AiError::ApiError(format!("HTTP {status}: {text}")));
        }

        let chunks = sse_events(body_reader(response))
            .map(|event| event.map(|event| decode_event(&event)));
        Ok(Box::pin(chunks))
    }
}

/// Decode one SSE event into a chunk.
///
/// Events flagged as errors (by `event:error` or a non-200
/// `:HTTP_STATUS/<code>` comment) and payloads that cannot be read
/// become failed chunks rather than errors, so one bad event does not
/// end the exchange.
pub fn decode_event(event: &SseEvent) -> StreamChunk {
    let data: serde_json::Value = match serde_json::from_str(&event.data) {
        Ok(data) => data,
        Err(e) => return StreamChunk::failed("ParseError", format!("unreadable event data: {e}")),
    };

    let http_status = event
        .comment
        .as_deref()
        .and_then(|c| c.strip_prefix("HTTP_STATUS/"))
        .and_then(|code| code.trim().parse::<u16>().ok());
    let is_error = event.event.as_deref() == Some("error")
        || http_status.is_some_and(|code| code != 200);

    if is_error {
        let code = data["code"]
            .as_str()
            .map(String::from)
            .or_else(|| http_status.map(|code| format!("HTTP_{code}")))
            .unwrap_or_else(|| "Unknown".to_string());
        let message = data["message"].as_str().unwrap_or_default();
        return StreamChunk::failed(code, message);
    }

    let usage = data.get("usage").map(|u| TokenUsage {
        input_tokens: u["input_tokens"].as_u64().unwrap_or(0),
        output_tokens: u["output_tokens"].as_u64().unwrap_or(0),
    });

    let message = &data["output"]["choices"][0]["message"];

    // Only the first call of a chunk is considered.
    let call_fragment = match message["tool_calls"].get(0) {
        Some(raw) => match serde_json::from_value::<CallDescriptor>(raw.clone()) {
            Ok(fragment) => Some(fragment),
            Err(e) => {
                return StreamChunk::failed("ParseError", format!("unreadable tool call: {e}"))
            }
        },
        None => None,
    };

    StreamChunk {
        text_delta: message["content"].as_str().map(String::from),
        call_fragment,
        usage,
        ..StreamChunk::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChunkStatus;

    fn event(kind: &str, status: u16, data: serde_json::Value) -> SseEvent {
        SseEvent {
            event: Some(kind.to_string()),
            data: data.to_string(),
            id: Some("1".into()),
            comment: Some(format!("HTTP_STATUS/{status}")),
        }
    }

    #[test]
    fn decodes_text_delta_and_usage() {
        let chunk = decode_event(&event(
            "result",
            200,
            serde_json::json!({
                "output": {"choices": [{"message": {"role": "assistant", "content": "Sky"}, "finish_reason": "null"}]},
                "usage": {"input_tokens": 20, "output_tokens": 1},
                "request_id": "r1"
            }),
        ));
        assert!(chunk.status.is_ok());
        assert_eq!(chunk.text_delta.as_deref(), Some("Sky"));
        assert!(chunk.call_fragment.is_none());
        assert_eq!(chunk.usage.unwrap().input_tokens, 20);
    }

    #[test]
    fn decodes_first_tool_call_fragment() {
        let chunk = decode_event(&event(
            "result",
            200,
            serde_json::json!({
                "output": {"choices": [{"message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        {"index": 0, "id": "call_a", "type": "function",
                         "function": {"name": "get_weather", "arguments": "{\"loc"}},
                        {"index": 1, "id": "call_b", "type": "function",
                         "function": {"name": "get_time", "arguments": ""}}
                    ]
                }}]}
            }),
        ));
        let fragment = chunk.call_fragment.unwrap();
        assert_eq!(fragment.id.as_deref(), Some("call_a"));
        assert_eq!(fragment.name(), Some("get_weather"));
        assert_eq!(fragment.arguments(), Some("{\"loc"));
    }

    #[test]
    fn error_event_becomes_failed_chunk() {
        let chunk = decode_event(&event(
            "error",
            400,
            serde_json::json!({"code": "InvalidParameter", "message": "bad input", "request_id": "r2"}),
        ));
        assert_eq!(
            chunk.status,
            ChunkStatus::Failed {
                code: "InvalidParameter".into(),
                message: "bad input".into()
            }
        );
    }

    #[test]
    fn non_200_status_without_code_uses_http_status() {
        let chunk = decode_event(&event("result", 500, serde_json::json!({})));
        assert!(matches!(chunk.status, ChunkStatus::Failed { ref code, .. } if code == "HTTP_500"));
    }

    #[test]
    fn unreadable_data_becomes_failed_chunk() {
        let chunk = decode_event(&SseEvent {
            data: "not json".into(),
            ..SseEvent::default()
        });
        assert!(!chunk.status.is_ok());
    }

    mod transport {
        use std::time::Duration;

        use futures_util::StreamExt;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};
        use tokio::task::JoinHandle;

        use crate::dashscope::{DashScopeClient, DashScopeConfig};
        use crate::{AiError, ChatTransport, Message};

        const SSE_BODY: &str = concat!(
            "id:1\n",
            "event:result\n",
            ":HTTP_STATUS/200\n",
            r#"data:{"output":{"choices":[{"message":{"role":"assistant","content":"Sky"}}]},"usage":{"input_tokens":10,"output_tokens":1}}"#,
            "\n\n",
            "id:2\n",
            "event:result\n",
            ":HTTP_STATUS/200\n",
            r#"data:{"output":{"choices":[{"message":{"role":"assistant","content":"","tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"get_weather","arguments":"{}"}}]}}]}}"#,
            "\n\n",
        );

        fn http_response(status: &str, content_type: &str, body: &str) -> String {
            format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
        }

        /// Read one request (headers plus `Content-Length` body) and return it.
        async fn read_request(socket: &mut TcpStream) -> String {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let body_len = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + body_len {
                        break;
                    }
                }
            }
            String::from_utf8_lossy(&buf).into_owned()
        }

        /// Serve a single connection, replying with `response` after `delay`.
        async fn serve_once(response: String, delay: Duration) -> (String, JoinHandle<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let handle = tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                tokio::time::sleep(delay).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                request
            });
            (format!("http://{addr}/generation"), handle)
        }

        fn client(endpoint: &str) -> DashScopeClient {
            let config = DashScopeConfig::new("sk-test")
                .with_endpoint(endpoint)
                .with_timeout(Duration::from_millis(500));
            DashScopeClient::new(config).unwrap()
        }

        #[tokio::test]
        async fn too_many_requests_maps_to_rate_limited() {
            let response = http_response("429 Too Many Requests", "application/json", "{}");
            let (endpoint, _server) = serve_once(response, Duration::ZERO).await;

            let result = client(&endpoint).open_stream(&[Message::user("hi")], &[]).await;
            assert!(matches!(result, Err(AiError::RateLimited)));
        }

        #[tokio::test]
        async fn server_error_maps_to_api_error() {
            let body = r#"{"code":"InternalError","message":"boom"}"#;
            let response = http_response("500 Internal Server Error", "application/json", body);
            let (endpoint, _server) = serve_once(response, Duration::ZERO).await;

            match client(&endpoint).open_stream(&[Message::user("hi")], &[]).await {
                Err(AiError::ApiError(message)) => {
                    assert!(message.contains("500"));
                    assert!(message.contains("boom"));
                }
                Err(other) => panic!("expected ApiError, got {other:?}"),
                Ok(_) => panic!("expected ApiError, got a stream"),
            }
        }

        #[tokio::test]
        async fn slow_server_maps_to_timeout() {
            let response = http_response("200 OK", "text/event-stream", SSE_BODY);
            let (endpoint, _server) = serve_once(response, Duration::from_secs(5)).await;

            let result = client(&endpoint).open_stream(&[Message::user("hi")], &[]).await;
            assert!(matches!(result, Err(AiError::Timeout)));
        }

        #[tokio::test]
        async fn refused_connection_maps_to_network_error() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let endpoint = format!("http://{addr}/generation");
            let result = client(&endpoint).open_stream(&[Message::user("hi")], &[]).await;
            assert!(matches!(result, Err(AiError::NetworkError(_))));
        }

        #[tokio::test]
        async fn event_stream_body_decodes_into_chunks() {
            let response = http_response("200 OK", "text/event-stream", SSE_BODY);
            let (endpoint, server) = serve_once(response, Duration::ZERO).await;

            let stream = client(&endpoint)
                .open_stream(&[Message::user("Weather in Beijing?")], &[])
                .await
                .unwrap();
            let chunks: Vec<_> = stream.map(Result::unwrap).collect().await;

            assert_eq!(chunks.len(), 2);
            assert_eq!(chunks[0].text_delta.as_deref(), Some("Sky"));
            assert_eq!(chunks[0].usage.unwrap().input_tokens, 10);
            let fragment = chunks[1].call_fragment.as_ref().unwrap();
            assert_eq!(fragment.id.as_deref(), Some("call_1"));
            assert_eq!(fragment.name(), Some("get_weather"));

            let request = server.await.unwrap();
            let lowered = request.to_lowercase();
            assert!(request.starts_with("POST /generation"));
            assert!(lowered.contains("authorization: bearer sk-test"));
            assert!(lowered.contains("x-dashscope-sse: enable"));
            assert!(request.contains(r#""incremental_output":true"#));
        }
    }
}
