//! HTTP gateway for flightdeck.
//!
//! - `POST /agent/ask`: run the agent on a question and stream its events
//!   back as server-sent events, one `data:` frame per event
//! - `GET /tools`: the catalog the model sees
//! - `GET /health`: liveness
//!
//! Built on Axum. A client that disconnects mid-run drops the event stream,
//! which aborts the run.

use axum::extract::rejection::JsonRejection;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use flightdeck_agent::AgentLoop;
use flightdeck_config::GatewayConfig;
use flightdeck_core::tool::ToolSpec;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: AgentLoop,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/tools", get(tools_handler))
        .route("/agent/ask", post(ask_handler))
        .with_state(state)
        // The web client is served from another origin.
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server. Returns after Ctrl-C.
pub async fn start(config: &GatewayConfig, agent: AgentLoop) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = build_router(Arc::new(GatewayState { agent }));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C, shutting down");
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct ToolsResponse {
    tools: Vec<ToolSpec>,
}

async fn tools_handler(State(state): State<SharedState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.agent.catalog().await,
    })
}

#[derive(Deserialize)]
struct AskRequest {
    /// Older clients send `message`.
    #[serde(default, alias = "message")]
    question: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// `POST /agent/ask`: stream one run as SSE.
async fn ask_handler(
    State(state): State<SharedState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Response {
    let question = body
        .ok()
        .and_then(|Json(req)| req.question)
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    let Some(question) = question else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Question is required".into(),
            }),
        )
            .into_response();
    };

    info!(question = %question, "Agent run requested");

    let stream = state
        .agent
        .run(question)
        .map(|event| SseEvent::default().event(event.kind.as_str()).json_data(&event));

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use flightdeck_core::error::ProviderError;
    use flightdeck_core::message::{Message, MessageToolCall};
    use flightdeck_core::provider::{ChatModel, ChatRequest, ChatResponse};
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Replays canned assistant turns in order.
    struct ScriptedModel {
        replies: Mutex<Vec<Message>>,
    }

    impl ScriptedModel {
        fn new(mut replies: Vec<Message>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            let message = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ProviderError::InvalidResponse("script exhausted".into()))?;
            Ok(ChatResponse {
                message,
                usage: None,
                model: "scripted".into(),
            })
        }
    }

    fn app(replies: Vec<Message>) -> Router {
        let agent = AgentLoop::new(
            Arc::new(ScriptedModel::new(replies)),
            Arc::new(flightdeck_tools::default_registry()),
            "scripted",
        );
        build_router(Arc::new(GatewayState { agent }))
    }

    fn ask(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/agent/ask")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// The JSON payloads of every `data:` frame.
    fn data_frames(body: &str) -> Vec<serde_json::Value> {
        body.lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .map(|data| serde_json::from_str(data).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let response = app(vec![])
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn tools_endpoint_lists_annotate_first() {
        let response = app(vec![])
            .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        let tools = json["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 6);
        assert_eq!(tools[0]["name"], "annotate");
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn missing_question_is_bad_request() {
        for body in [r#"{}"#, r#"{"question": "   "}"#, "not json"] {
            let response = app(vec![]).oneshot(ask(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
            let json: serde_json::Value =
                serde_json::from_str(&body_string(response).await).unwrap();
            assert_eq!(json["error"], "Question is required");
        }
    }

    #[tokio::test]
    async fn ask_streams_events_as_sse() {
        let response = app(vec![Message::assistant("There are 13 flights.")])
            .oneshot(ask(r#"{"question": "How many flights?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        let body = body_string(response).await;
        assert!(body.contains("event: annotation"));
        let frames = data_frames(&body);
        let types: Vec<_> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["annotation", "message", "done"]);
        assert_eq!(frames[1]["data"]["content"], "There are 13 flights.");
        assert_eq!(frames[2]["data"]["finalAnswer"], "There are 13 flights.");
    }

    #[tokio::test]
    async fn message_alias_and_real_tools() {
        let mut call = Message::assistant("");
        call.tool_calls = vec![MessageToolCall {
            id: "call_1".into(),
            name: "get_destination_info".into(),
            arguments: r#"{"dest_code":"TOK"}"#.into(),
        }];
        let response = app(vec![call, Message::assistant("Tokyo has one flight.")])
            .oneshot(ask(r#"{"message": "Tell me about TOK"}"#))
            .await
            .unwrap();

        let frames = data_frames(&body_string(response).await);
        let types: Vec<_> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["annotation", "tool_call", "tool_result", "message", "done"]);
        assert_eq!(frames[2]["data"]["result"]["city_name"], "Tokyo");
    }

    #[tokio::test]
    async fn upstream_failure_ends_with_error_frame() {
        let response = app(vec![]).oneshot(ask(r#"{"question": "q"}"#)).await.unwrap();
        let frames = data_frames(&body_string(response).await);
        let last = frames.last().unwrap();
        assert_eq!(last["type"], "error");
        assert_eq!(last["title"], "Agent Error");
        assert_eq!(last["data"]["fatal"], true);
    }
}
