//! Ops Assistant HTTP 服务
//!
//! 启动: cargo run --bin ops-assistant-web --features web
//! 端口取 OPS_WEB_PORT，其次 web.port（默认 8000）

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use ops_assistant::core::{create_agent_builder, AgentComponents, AgentError};
use ops_assistant::observability;

const MIN_TASK_CHARS: usize = 3;

type AppState = Arc<AgentComponents>;

#[derive(Deserialize)]
struct TaskRequest {
    task: String,
}

#[derive(Deserialize)]
struct ExplainRequest {
    task: String,
    #[serde(rename = "final")]
    final_output: Map<String, Value>,
}

/// 错误响应：{"detail": "..."}
struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        tracing::error!(error = %e, "request failed");
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

fn check_task(task: &str) -> Result<(), ApiError> {
    if task.chars().count() < MIN_TASK_CHARS {
        return Err(ApiError(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("task must be at least {} characters", MIN_TASK_CHARS),
        ));
    }
    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "AI Ops Assistant is running" }))
}

async fn api_tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tools": state.tools.specs() }))
}

async fn run(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Result<Response, ApiError> {
    check_task(&req.task)?;
    let report = state.orchestrator.run(&req.task).await?;
    Ok(Json(report).into_response())
}

async fn suggest(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Result<Json<Value>, ApiError> {
    check_task(&req.task)?;
    let suggestions = state.assist.suggest(&req.task).await?;
    Ok(Json(json!({ "suggestions": suggestions })))
}

async fn enhance(
    State(state): State<AppState>,
    Json(req): Json<TaskRequest>,
) -> Result<Json<Value>, ApiError> {
    check_task(&req.task)?;
    let enhanced = state.assist.enhance(&req.task).await?;
    Ok(Json(json!({ "enhanced_prompt": enhanced })))
}

async fn explain(
    State(state): State<AppState>,
    Json(req): Json<ExplainRequest>,
) -> Result<Json<Value>, ApiError> {
    check_task(&req.task)?;
    let explanation = state
        .assist
        .explain(&req.task, &Value::Object(req.final_output))
        .await?;
    Ok(Json(json!({ "explanation": explanation })))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let components = create_agent_builder(None)?.build_components()?;
    let port = std::env::var("OPS_WEB_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(components.config.web.port);
    let state: AppState = Arc::new(components);

    let app = Router::new()
        .route("/", get(root))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/tools", get(api_tools))
        .route("/run", post(run))
        .route("/suggest", post(suggest))
        .route("/enhance", post(enhance))
        .route("/explain", post(explain))
        .with_state(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Ops Assistant API: http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
