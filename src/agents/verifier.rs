//! Verifier：补救、校验并合成最终答案
//!
//! 1. 对失败步骤重试一次，仍失败的记为 missing
//! 2. 压缩步骤结果（仓库列表只保留前若干条的关键字段）后交给模型合成 Verification
//! 3. 按工具规则做确定性修正：来源链接、单一文本生成时的讲稿数据、仓库 / 天气答案拼装
//! 4. 有 missing 时标记 partial 并追加固定的限制说明

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::agents::executor::StepRunner;
use crate::agents::prompts::{verifier_user_prompt, VERIFIER_SYSTEM};
use crate::agents::types::{Completeness, Plan, StepResult, StepStatus, Verification};
use crate::core::AgentError;
use crate::llm::Oracle;
use crate::tools::{ToolOutput, GITHUB_SEARCH, LLM_GENERATE, WEATHER_CURRENT};

pub const DEFAULT_COMPACT_ITEMS: usize = 5;
pub const PARTIAL_LIMITATION: &str = "Some tools failed after retry; partial data returned.";

/// 交给模型的精简步骤结果
#[derive(Debug, Clone, Serialize)]
pub struct CompactResult {
    pub step_id: String,
    pub tool: String,
    pub status: StepStatus,
    pub output: Option<Value>,
    pub error: Option<String>,
}

fn field(map: &Map<String, Value>, key: &str) -> Value {
    map.get(key).cloned().unwrap_or(Value::Null)
}

/// 带 items 的输出只保留前 limit 条的 name / full_name / url / stars / language，其余输出不变
pub fn compact_results(results: &[StepResult], limit: usize) -> Vec<CompactResult> {
    results
        .iter()
        .map(|r| {
            let output = r.output.as_ref().map(|out| match out.get("items") {
                Some(items) => {
                    let items: Vec<Value> = items
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .take(limit)
                                .map(|item| {
                                    let get = |k: &str| item.get(k).cloned().unwrap_or(Value::Null);
                                    json!({
                                        "name": get("name"),
                                        "full_name": get("full_name"),
                                        "url": get("url"),
                                        "stars": get("stars"),
                                        "language": get("language"),
                                    })
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    json!({
                        "query": field(out, "query"),
                        "total_count": field(out, "total_count"),
                        "items": items,
                        "source_url": field(out, "source_url"),
                    })
                }
                None => Value::Object(out.clone()),
            });
            CompactResult {
                step_id: r.step_id.clone(),
                tool: r.tool.clone(),
                status: r.status,
                output,
                error: r.error.clone(),
            }
        })
        .collect()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// 字符串原样输出，其它 JSON 值按字面输出
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 从输出中收集到的、用于确定性修正的材料
#[derive(Debug, Default)]
struct Evidence<'a> {
    sources: Vec<String>,
    repo_items: Vec<&'a Map<String, Value>>,
    weather: Option<&'a ToolOutput>,
}

impl<'a> Evidence<'a> {
    fn collect(results: &'a [StepResult]) -> Self {
        let mut evidence = Evidence::default();
        let mut repo_urls = Vec::new();
        for result in results {
            let Some(output) = result.success_output() else {
                continue;
            };
            if let Some(url) = non_empty_str(output.get("source_url")) {
                evidence.sources.push(url.to_string());
            }
            if result.tool == GITHUB_SEARCH {
                if let Some(items) = output.get("items").and_then(Value::as_array) {
                    for item in items.iter().filter_map(Value::as_object) {
                        evidence.repo_items.push(item);
                        if let Some(url) = non_empty_str(item.get("url")) {
                            repo_urls.push(url.to_string());
                        }
                    }
                }
            }
            if result.tool == WEATHER_CURRENT {
                evidence.weather = Some(output);
            }
        }
        evidence.sources.extend(repo_urls);
        evidence.sources = dedupe(evidence.sources);
        evidence
    }
}

/// 去重并保持首次出现顺序
pub fn dedupe(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values.into_iter().filter(|v| seen.insert(v.clone())).collect()
}

/// "Top repositories: a; b; c."；没有可用条目时为 None
fn repositories_sentence(items: &[&Map<String, Value>]) -> Option<String> {
    let bits: Vec<String> = items
        .iter()
        .take(3)
        .filter_map(|item| {
            let name = non_empty_str(item.get("full_name")).or(non_empty_str(item.get("name")))?;
            let url = non_empty_str(item.get("url"))?;
            Some(match item.get("stars").filter(|s| !s.is_null()) {
                Some(stars) => format!("{} ({}, {}★)", name, url, display(stars)),
                None => format!("{} ({})", name, url),
            })
        })
        .collect();
    if bits.is_empty() {
        None
    } else {
        Some(format!("Top repositories: {}.", bits.join("; ")))
    }
}

/// "Current weather in <location>: <summary>, <temp>°C, wind <wind> kph."，缺失的部分省略
fn weather_sentence(weather: &ToolOutput) -> String {
    let mut sentence = String::from("Current weather");
    if let Some(location) = non_empty_str(weather.get("location")) {
        sentence.push_str(" in ");
        sentence.push_str(location);
    }
    let present = |k: &str| weather.get(k).filter(|v| !v.is_null());
    let summary = non_empty_str(weather.get("weather_summary"));
    let temp = present("temperature_c");
    if summary.is_none() && temp.is_none() {
        sentence.push('.');
        return sentence;
    }
    let mut details = Vec::new();
    if let Some(summary) = summary {
        details.push(summary.to_string());
    }
    if let Some(temp) = temp {
        details.push(format!("{}°C", display(temp)));
    }
    if let Some(wind) = present("wind_kph") {
        details.push(format!("wind {} kph", display(wind)));
    }
    sentence.push_str(": ");
    sentence.push_str(&details.join(", "));
    sentence.push('.');
    sentence
}

/// 在模型给出的 Verification 上做确定性修正（不访问模型，便于单独测试）
pub fn enrich(mut verification: Verification, plan: &Plan, repaired: &[StepResult]) -> Verification {
    let evidence = Evidence::collect(repaired);
    let mut sources = evidence.sources.clone();
    let tools_used = plan.tools_used();

    if tools_used.len() == 1 && tools_used.contains(LLM_GENERATE) {
        let text = repaired
            .iter()
            .filter(|r| r.tool == LLM_GENERATE)
            .find_map(StepResult::success_output)
            .map(|out| match out.get("text") {
                Some(Value::Null) | None => String::new(),
                Some(v) => display(v).trim().to_string(),
            })
            .unwrap_or_default();
        if !text.is_empty() {
            let word_count = text.split_whitespace().count();
            verification.final_answer = text;
            let mut data = Map::new();
            data.insert("kind".into(), json!("introduction_speech"));
            data.insert("word_count".into(), json!(word_count));
            verification.data = data;
            sources.clear();
        }
    }

    if tools_used.contains(GITHUB_SEARCH) || tools_used.contains(WEATHER_CURRENT) {
        let mut parts = Vec::new();
        if let Some(repos) = repositories_sentence(&evidence.repo_items) {
            parts.push(repos);
        }
        if let Some(weather) = evidence.weather {
            parts.push(weather_sentence(weather));
        }
        let answer = parts.join(" ").trim().to_string();
        if !answer.is_empty() {
            verification.final_answer = answer;
        }
    }

    verification.sources = sources;

    if repaired.iter().any(|r| !r.is_success()) {
        verification.limitations.push(PARTIAL_LIMITATION.to_string());
        verification.completeness = Completeness::Partial;
    }
    verification
}

pub struct Verifier {
    oracle: Arc<Oracle>,
    runner: Arc<StepRunner>,
    compact_items: usize,
}

impl Verifier {
    pub fn new(oracle: Arc<Oracle>, runner: Arc<StepRunner>) -> Self {
        Self {
            oracle,
            runner,
            compact_items: DEFAULT_COMPACT_ITEMS,
        }
    }

    pub fn with_compact_items(mut self, compact_items: usize) -> Self {
        self.compact_items = compact_items;
        self
    }

    pub async fn verify(
        &self,
        task: &str,
        plan: &Plan,
        results: &[StepResult],
    ) -> Result<Verification, AgentError> {
        let repaired = self.runner.retry_failed(plan, results).await;
        let missing = repaired.iter().filter(|r| !r.is_success()).count();
        if missing > 0 {
            tracing::warn!(missing, "steps still failing after retry");
        }

        let compacted = compact_results(&repaired, self.compact_items);
        let prompt = verifier_user_prompt(task, plan, &compacted);
        let value = self
            .oracle
            .structured_response(VERIFIER_SYSTEM, &prompt)
            .await?;
        let verification = enrich(Verification::from_oracle(value)?, plan, &repaired);
        tracing::info!(
            completeness = ?verification.completeness,
            sources = verification.sources.len(),
            "verification finished"
        );
        Ok(verification)
    }
}
