//! 流水线集成测试：Mock LLM + 进程内工具，跑通 plan → execute → verify → replan

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use ops_assistant::agents::Completeness;
use ops_assistant::config::AppConfig;
use ops_assistant::core::{AgentBuilder, AgentComponents};
use ops_assistant::llm::MockLlmClient;
use ops_assistant::tools::{FnTool, ToolOutput, ToolRegistry};

fn object(value: Value) -> ToolOutput {
    match value {
        Value::Object(map) => map,
        _ => ToolOutput::new(),
    }
}

fn fixture_registry(weather_failures: usize) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(FnTool::new("github_search", "search repos", |args| {
        Ok(object(json!({
            "query": args["query"],
            "total_count": 3,
            "items": [
                {"name": "one", "full_name": "org/one", "url": "https://github.com/org/one", "stars": 100, "language": "Rust"},
                {"name": "two", "full_name": "org/two", "url": "https://github.com/org/two", "stars": 50, "language": "Rust"},
                {"name": "three", "full_name": "org/three", "url": "https://github.com/org/three", "stars": 10, "language": "Go"}
            ],
            "source_url": "https://api.github.com/search/repositories?q=rust"
        })))
    }));
    let calls = Arc::new(AtomicUsize::new(0));
    registry.register(FnTool::new("weather_current", "weather", move |args| {
        if calls.fetch_add(1, Ordering::SeqCst) < weather_failures {
            return Err("HTTP 503 from open-meteo".to_string());
        }
        Ok(object(json!({
            "location": format!("{}, India", args["city"].as_str().unwrap_or("?")),
            "temperature_c": 31.2,
            "wind_kph": 9.4,
            "weather_code": 2,
            "weather_summary": "Partly cloudy",
            "source_url": "https://api.open-meteo.com/v1/forecast?latitude=18.52&longitude=73.86"
        })))
    }));
    registry
}

fn components(llm: Arc<MockLlmClient>, registry: Option<ToolRegistry>) -> AgentComponents {
    let mut builder = AgentBuilder::new(AppConfig::default()).with_llm(llm);
    if let Some(registry) = registry {
        builder = builder.with_tool_registry(registry);
    }
    builder.build_components().unwrap()
}

const REPO_AND_WEATHER_PLAN: &str = r#"{
  "goal": "Top Rust repos and Pune weather",
  "steps": [
    {"id": "step_1", "tool": "github_search", "args": {"query": "rust", "top_n": 3}, "purpose": "repos"},
    {"id": "step_2", "tool": "weather_current", "args": {"city": "Pune"}, "purpose": "weather"}
  ]
}"#;

#[tokio::test]
async fn test_repositories_and_weather_run() {
    let llm = Arc::new(MockLlmClient::with_replies([
        REPO_AND_WEATHER_PLAN,
        r#"{"final_answer": "model text", "data": {"repos": 3}, "limitations": [], "completeness": "complete"}"#,
    ]));
    let components = components(llm, Some(fixture_registry(0)));
    let report = components
        .orchestrator
        .run("Find the top Rust repos and the weather in Pune")
        .await
        .unwrap();

    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].step_id, "step_1");
    assert_eq!(report.steps[1].step_id, "step_2");
    assert_eq!(report.verification.completeness, Completeness::Complete);
    assert_eq!(
        report.verification.final_answer,
        "Top repositories: org/one (https://github.com/org/one, 100★); \
         org/two (https://github.com/org/two, 50★); org/three (https://github.com/org/three, 10★). \
         Current weather in Pune, India: Partly cloudy, 31.2°C, wind 9.4 kph."
    );
    assert_eq!(report.verification.data["repos"], 3);
    assert_eq!(report.verification.sources.len(), 5);
    assert!(report.auto_replan.is_none());
    assert_eq!(report.metrics.tool_count, 2);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["final"]["completeness"], "complete");
    assert_eq!(value["steps"][0]["status"], "success");
    assert!(value["auto_replan"].is_null());
}

#[tokio::test]
async fn test_weather_outage_replans_and_recovers() {
    // 首轮执行与补救重试各失败一次，重规划后成功
    let llm = Arc::new(MockLlmClient::with_replies([
        REPO_AND_WEATHER_PLAN,
        r#"{"final_answer": "weather missing", "limitations": ["Weather unavailable"], "completeness": "partial"}"#,
        r#"{"steps": [{"tool": "weather_current", "args": {"city": "Pune"}}]}"#,
        r#"{"final_answer": "ok", "completeness": "complete"}"#,
    ]));
    let components = components(llm.clone(), Some(fixture_registry(2)));
    let report = components.orchestrator.run("Repos and Pune weather").await.unwrap();

    let envelope = report.auto_replan.as_ref().unwrap();
    assert!(envelope.triggered);
    assert!(envelope
        .task
        .contains("Errors: weather_current: HTTP 503 from open-meteo"));
    assert!(envelope.task.contains(
        "Limitations: Weather unavailable; Some tools failed after retry; partial data returned."
    ));
    assert_eq!(report.plan.steps.len(), 1);
    assert_eq!(report.verification.completeness, Completeness::Complete);
    assert_eq!(
        report.verification.final_answer,
        "Current weather in Pune, India: Partly cloudy, 31.2°C, wind 9.4 kph."
    );
    assert_eq!(llm.remaining_replies(), 0);
}

#[tokio::test]
async fn test_writing_task_uses_builtin_text_tool() {
    let llm = Arc::new(MockLlmClient::with_replies([
        r#"{"goal": "Intro speech", "steps": [{"tool": "llm_generate", "args": {"instruction": "Write a two word greeting"}}]}"#,
        "  Hello World  ",
        r#"{"final_answer": "A greeting", "sources": ["https://example.com"], "completeness": "complete"}"#,
    ]));
    let components = components(llm.clone(), None);
    let report = components.orchestrator.run("Write a greeting").await.unwrap();

    assert_eq!(report.steps[0].output.as_ref().unwrap()["text"], "Hello World");
    assert_eq!(report.verification.final_answer, "Hello World");
    assert_eq!(report.verification.data["kind"], "introduction_speech");
    assert_eq!(report.verification.data["word_count"], 2);
    assert!(report.verification.sources.is_empty());

    // 写作指令作为 user 消息交给文本生成
    assert_eq!(llm.requests()[1][1].content, "Write a two word greeting");
}

#[tokio::test]
async fn test_unknown_tool_in_plan_fails_run() {
    let llm = Arc::new(MockLlmClient::with_replies([
        r#"{"steps": [{"tool": "send_email", "args": {}}]}"#,
    ]));
    let components = components(llm, Some(fixture_registry(0)));
    let err = components.orchestrator.run("Email my boss").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid plan: Unknown tool in plan: send_email");
}

#[tokio::test]
async fn test_prompt_assist_helpers() {
    let llm = Arc::new(MockLlmClient::with_replies([
        r#"{"suggestions": ["Weather in Mumbai", "  ", "Top Go repos"]}"#,
        r#"{"enhanced_prompt": "Show the current weather in Pune, India."}"#,
    ]));
    let components = components(llm, Some(fixture_registry(0)));
    assert_eq!(
        components.assist.suggest("weather pune").await.unwrap(),
        ["Weather in Mumbai", "Top Go repos"]
    );
    assert_eq!(
        components.assist.enhance("weather pune").await.unwrap(),
        "Show the current weather in Pune, India."
    );
}
