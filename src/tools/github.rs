//! GitHub 仓库搜索工具
//!
//! 调用 GitHub Search API（按 star 降序），输出 {query, total_count, items, source_url}；
//! 设置了 GITHUB_TOKEN 时带 Bearer 鉴权以提高限额。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::schema::{args_schema, parse_args};
use crate::tools::{Tool, ToolOutput, GITHUB_SEARCH};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GithubSearchArgs {
    /// 搜索关键字，如 "fastapi"
    pub query: String,
    /// 返回的仓库数量
    #[serde(default)]
    #[schemars(with = "Option<u32>")]
    pub top_n: Option<Value>,
}

impl GithubSearchArgs {
    /// top_n 允许整数、整值浮点数（3.0）或其字符串形式；其它取值回落到默认值。结果限制在 1..=100
    pub fn top_n_or(&self, default: usize) -> usize {
        let parsed = match &self.top_n {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        let n = parsed
            .filter(|n| n.is_finite() && n.fract() == 0.0 && *n >= 0.0)
            .map(|n| n.min(MAX_TOP_N as f64) as usize)
            .unwrap_or(default);
        n.clamp(1, MAX_TOP_N)
    }
}

/// GitHub Search API 单页上限
const MAX_TOP_N: usize = 100;

pub struct GithubSearchTool {
    client: Client,
    api_base: String,
    default_top_n: usize,
}

impl GithubSearchTool {
    pub fn new(api_base: impl Into<String>, timeout_secs: u64, default_top_n: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("ops-assistant/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_base: api_base.into(),
            default_top_n,
        }
    }

    async fn search(&self, query: &str, top_n: usize) -> Result<ToolOutput, String> {
        let url = format!("{}/search/repositories", self.api_base.trim_end_matches('/'));
        let per_page = top_n.to_string();
        let mut request = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ])
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        let source_url = resp.url().to_string();
        if !resp.status().is_success() {
            return Err(format!("HTTP {} from {}", resp.status(), source_url));
        }
        let data: Value = resp
            .json()
            .await
            .map_err(|e| format!("Read body: {}", e))?;
        Ok(search_output(query, top_n, &data, &source_url))
    }
}

/// 将 Search API 响应整理为工具输出（仓库条目截断到 top_n）
pub fn search_output(query: &str, top_n: usize, data: &Value, source_url: &str) -> ToolOutput {
    let items: Vec<Value> = data
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(top_n)
                .map(|item| {
                    json!({
                        "name": item.get("name").cloned().unwrap_or(Value::Null),
                        "full_name": item.get("full_name").cloned().unwrap_or(Value::Null),
                        "url": item.get("html_url").cloned().unwrap_or(Value::Null),
                        "stars": item.get("stargazers_count").cloned().unwrap_or(Value::Null),
                        "description": item.get("description").cloned().unwrap_or(Value::Null),
                        "language": item.get("language").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let mut output = ToolOutput::new();
    output.insert("query".into(), Value::String(query.to_string()));
    output.insert(
        "total_count".into(),
        data.get("total_count").cloned().unwrap_or(Value::Null),
    );
    output.insert("items".into(), Value::Array(items));
    output.insert("source_url".into(), Value::String(source_url.to_string()));
    output
}

#[async_trait]
impl Tool for GithubSearchTool {
    fn name(&self) -> &str {
        GITHUB_SEARCH
    }

    fn description(&self) -> &str {
        "Search GitHub repositories by keyword, sorted by stars. Args: {\"query\": \"string search query\", \"top_n\": integer number of repos to return}."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<GithubSearchArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: GithubSearchArgs = parse_args(GITHUB_SEARCH, args).map_err(|e| e.to_string())?;
        let query = args.query.trim();
        if query.is_empty() {
            return Err("Missing query".to_string());
        }
        let top_n = args.top_n_or(self.default_top_n);
        tracing::info!(query = %query, top_n, "github search");
        self.search(query, top_n).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Value {
        json!({
            "total_count": 1234,
            "items": [
                {"name": "fastapi", "full_name": "tiangolo/fastapi", "html_url": "https://github.com/tiangolo/fastapi", "stargazers_count": 80000, "description": "FastAPI framework", "language": "Python", "forks": 1},
                {"name": "full-stack", "full_name": "tiangolo/full-stack", "html_url": "https://github.com/tiangolo/full-stack", "stargazers_count": 30000, "description": null, "language": "TypeScript"},
                {"name": "third", "full_name": "x/third", "html_url": "https://github.com/x/third", "stargazers_count": 10, "language": null}
            ]
        })
    }

    #[test]
    fn test_search_output_maps_fields() {
        let out = search_output("fastapi", 5, &fixture(), "https://api.github.com/search/repositories?q=fastapi");
        assert_eq!(out["query"], "fastapi");
        assert_eq!(out["total_count"], 1234);
        let items = out["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["url"], "https://github.com/tiangolo/fastapi");
        assert_eq!(items[0]["stars"], 80000);
        assert!(items[0].get("forks").is_none());
        assert!(items[2]["description"].is_null());
    }

    #[test]
    fn test_search_output_truncates_to_top_n() {
        let out = search_output("fastapi", 2, &fixture(), "u");
        assert_eq!(out["items"].as_array().unwrap().len(), 2);
        assert_eq!(out["source_url"], "u");
    }

    #[test]
    fn test_top_n_fallbacks() {
        let parse = |v: Value| parse_args::<GithubSearchArgs>(GITHUB_SEARCH, v).unwrap();
        assert_eq!(parse(json!({"query": "q", "top_n": 3})).top_n_or(5), 3);
        assert_eq!(parse(json!({"query": "q", "top_n": "7"})).top_n_or(5), 7);
        assert_eq!(parse(json!({"query": "q", "top_n": "many"})).top_n_or(5), 5);
        assert_eq!(parse(json!({"query": "q"})).top_n_or(5), 5);
    }

    #[test]
    fn test_top_n_whole_floats_and_bounds() {
        let parse = |v: Value| parse_args::<GithubSearchArgs>(GITHUB_SEARCH, v).unwrap();
        assert_eq!(parse(json!({"query": "q", "top_n": 3.0})).top_n_or(5), 3);
        assert_eq!(parse(json!({"query": "q", "top_n": "4.0"})).top_n_or(5), 4);
        assert_eq!(parse(json!({"query": "q", "top_n": 2.5})).top_n_or(5), 5);
        assert_eq!(parse(json!({"query": "q", "top_n": -2})).top_n_or(5), 5);
        assert_eq!(parse(json!({"query": "q", "top_n": 500})).top_n_or(5), 100);
        assert_eq!(parse(json!({"query": "q", "top_n": 0})).top_n_or(5), 1);
        assert_eq!(parse(json!({"query": "q"})).top_n_or(0), 1);
    }

    #[tokio::test]
    async fn test_missing_query_rejected_before_request() {
        let tool = GithubSearchTool::new("http://127.0.0.1:9", 1, 5);
        let err = tool.execute(json!({"top_n": 3})).await.unwrap_err();
        assert!(err.starts_with("Invalid arguments for github_search"));
    }
}
