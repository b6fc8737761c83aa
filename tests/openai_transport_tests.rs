//! Chat-completions transport against a mock HTTP server.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vampi::agent::{AgentLoop, AgentLoopConfig, AgentState, SessionHandle};
use vampi::error::AgentError;
use vampi::provider::openai::OpenAiChatTransport;
use vampi::provider::{ChatRequest, ModelTransport};
use vampi::types::{ChatDelta, FinishReason, GenerationSettings, Message, ToolChoice};

fn sse(chunks: &[Value]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn sse_response(chunks: &[Value]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(sse(chunks))
}

fn tool_chunks(id: &str, name: &str, arguments: &Value) -> Vec<Value> {
    let text = arguments.to_string();
    let (head, tail) = text.split_at(text.len() / 2);
    vec![
        json!({"choices":[{"delta":{"tool_calls":[{"index":0,"id":id,"function":{"name":name,"arguments":""}}]},"finish_reason":null}]}),
        json!({"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":head}}]},"finish_reason":null}]}),
        json!({"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":tail}}]},"finish_reason":null}]}),
        json!({"choices":[{"delta":{},"finish_reason":"tool_calls"}]}),
    ]
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "gpt-4o-mini".into(),
        messages: vec![Message::system("sys"), Message::user("hello")],
        tools: Vec::new(),
        tool_choice: ToolChoice::None,
        settings: GenerationSettings::default(),
    }
}

async fn collect(transport: &OpenAiChatTransport) -> Result<Vec<ChatDelta>, AgentError> {
    let stream = transport.stream_chat(request()).await?;
    stream.collect::<Vec<_>>().await.into_iter().collect()
}

#[tokio::test]
async fn streams_text_deltas_until_done() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "stream": true })))
        .respond_with(sse_response(&[
            json!({"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}),
            json!({"choices":[{"delta":{"content":"lo"},"finish_reason":null}]}),
            json!({"choices":[{"delta":{},"finish_reason":"stop"}]}),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let transport = OpenAiChatTransport::new("sk-test", Some(format!("{}/", server.uri())));
    let deltas = collect(&transport).await.unwrap();

    let text: String = deltas.iter().filter_map(|d| d.content.clone()).collect();
    assert_eq!(text, "Hello");
    assert_eq!(deltas.last().unwrap().finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn streams_tool_call_fragments() {
    let server = MockServer::start().await;
    let arguments = json!({ "path": "src/main.rs" });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response(&tool_chunks("call_9", "readfiletool", &arguments)))
        .mount(&server)
        .await;

    let transport = OpenAiChatTransport::new("sk-test", Some(server.uri()));
    let deltas = collect(&transport).await.unwrap();

    let fragments: Vec<_> = deltas.iter().flat_map(|d| d.tool_calls.iter()).collect();
    assert_eq!(fragments[0].id.as_deref(), Some("call_9"));
    assert_eq!(fragments[0].name.as_deref(), Some("readfiletool"));
    let joined: String = fragments
        .iter()
        .filter_map(|f| f.arguments.as_deref())
        .collect();
    assert_eq!(serde_json::from_str::<Value>(&joined).unwrap(), arguments);
}

/// Serve one chunked SSE response, writing each part as its own HTTP chunk
/// with a pause in between so the client reads them separately.
async fn serve_chunked(parts: Vec<Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if request.len() >= head_end + 4 + length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\
                  transfer-encoding: chunked\r\nconnection: close\r\n\r\n",
            )
            .await
            .unwrap();
        for part in parts {
            socket
                .write_all(format!("{:x}\r\n", part.len()).as_bytes())
                .await
                .unwrap();
            socket.write_all(&part).await.unwrap();
            socket.write_all(b"\r\n").await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        socket.write_all(b"0\r\n\r\n").await.unwrap();
        socket.flush().await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn multibyte_characters_split_across_reads_are_preserved() {
    let arguments = json!({ "path": "café.md", "content": "naïve résumé" });
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "data: {}\n\n",
            json!({"choices":[{"delta":{"content":"héllo"},"finish_reason":null}]})
        )
        .as_bytes(),
    );
    for chunk in tool_chunks("call_1", "writefiletool", &arguments) {
        body.extend_from_slice(format!("data: {chunk}\n\n").as_bytes());
    }
    body.extend_from_slice(b"data: [DONE]\n\n");

    // Cut inside every two-byte character: after each UTF-8 lead byte.
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, byte) in body.iter().enumerate() {
        if *byte >= 0xC0 {
            parts.push(body[start..=i].to_vec());
            start = i + 1;
        }
    }
    parts.push(body[start..].to_vec());
    assert!(parts.len() > 5);

    let transport = OpenAiChatTransport::new("sk-test", Some(serve_chunked(parts).await));
    let deltas = collect(&transport).await.unwrap();

    let text: String = deltas.iter().filter_map(|d| d.content.clone()).collect();
    assert_eq!(text, "héllo");
    let joined: String = deltas
        .iter()
        .flat_map(|d| d.tool_calls.iter())
        .filter_map(|f| f.arguments.as_deref())
        .collect();
    assert_eq!(serde_json::from_str::<Value>(&joined).unwrap(), arguments);
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let transport = OpenAiChatTransport::new("sk-bad", Some(server.uri()));
    let err = collect(&transport).await.unwrap_err();
    assert!(matches!(err, AgentError::Authentication(ref m) if m.contains("invalid api key")));
}

#[tokio::test]
async fn rate_limit_carries_retry_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "error": { "message": "slow down", "retry_after": 1.5 } })),
        )
        .mount(&server)
        .await;

    let transport = OpenAiChatTransport::new("sk-test", Some(server.uri()));
    let err = collect(&transport).await.unwrap_err();
    assert!(matches!(
        err,
        AgentError::RateLimited {
            retry_after_ms: Some(1500)
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn server_error_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let transport = OpenAiChatTransport::new("sk-test", Some(server.uri()));
    let err = collect(&transport).await.unwrap_err();
    assert!(matches!(err, AgentError::Api { status: 500, .. }));
}

#[tokio::test]
async fn agent_loop_runs_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "tool_choice": { "type": "function", "function": { "name": "reasoningtool" } }
        })))
        .respond_with(sse_response(&tool_chunks(
            "call_r",
            "reasoningtool",
            &json!({
                "reasoning_steps": ["nothing to inspect"],
                "current_situation": "greeting",
                "plan_status": "ready",
                "enough_data": true,
                "remaining_steps": ["answer"],
                "task_completed": false
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "tool_choice": "required" })))
        .respond_with(sse_response(&tool_chunks(
            "call_a",
            "finalanswertool",
            &json!({
                "reasoning": "trivial",
                "completed_steps": ["answered"],
                "answer": "Hi there",
                "status": "completed"
            }),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = tempfile::tempdir().unwrap();
    let transport = Arc::new(OpenAiChatTransport::new("sk-test", Some(server.uri())));
    let config = AgentLoopConfig::builder()
        .model("gpt-4o-mini")
        .workspace(workspace.path())
        .build();
    let outcome = SessionHandle::spawn(AgentLoop::new(transport, config, "say hi"))
        .wait()
        .await
        .unwrap();

    assert_eq!(outcome.state, AgentState::Completed);
    assert_eq!(outcome.final_answer.as_deref(), Some("Hi there"));
}
