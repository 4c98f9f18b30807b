//! Oracle：对 LlmClient 的两种调用方式
//!
//! - structured_response：期望 JSON，直接解析失败时从回复中截取最外层 `{...}` 再解析，
//!   仍失败则重试，预算耗尽返回 OracleFormat
//! - free_text_response：请求失败时重试，预算耗尽返回 OracleUnavailable

use std::sync::Arc;

use serde_json::Value;

use crate::core::AgentError;
use crate::llm::{CompletionOptions, LlmClient, Message};

const DEFAULT_JSON_RETRIES: usize = 2;
const DEFAULT_TEXT_RETRIES: usize = 1;

/// 从模型回复中解析 JSON：先整体解析，再退回到最外层花括号块（兼容 ```json 包裹或前后多余文字）
pub fn parse_structured(content: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(content.trim()) {
        return Some(value);
    }
    let re = regex::Regex::new(r"(?s)\{.*\}").ok()?;
    let block = re.find(content)?;
    serde_json::from_str::<Value>(block.as_str()).ok()
}

pub struct Oracle {
    llm: Arc<dyn LlmClient>,
    json_retries: usize,
    text_retries: usize,
}

impl Oracle {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            json_retries: DEFAULT_JSON_RETRIES,
            text_retries: DEFAULT_TEXT_RETRIES,
        }
    }

    /// 设置额外重试次数（总尝试次数 = retries + 1）
    pub fn with_retries(mut self, json_retries: usize, text_retries: usize) -> Self {
        self.json_retries = json_retries;
        self.text_retries = text_retries;
        self
    }

    pub async fn structured_response(
        &self,
        role_prompt: &str,
        task_prompt: &str,
    ) -> Result<Value, AgentError> {
        let messages = [Message::system(role_prompt), Message::user(task_prompt)];
        tracing::debug!(prompt_chars = task_prompt.len(), "structured request");

        let mut last_reply = String::new();
        for attempt in 0..=self.json_retries {
            let content = self
                .llm
                .complete(&messages, CompletionOptions::precise())
                .await
                .map_err(AgentError::OracleUnavailable)?;
            if let Some(value) = parse_structured(&content) {
                return Ok(value);
            }
            tracing::warn!(attempt, "LLM reply is not valid JSON, retrying");
            last_reply = content;
        }
        Err(AgentError::OracleFormat(preview(&last_reply)))
    }

    pub async fn free_text_response(
        &self,
        role_prompt: &str,
        task_prompt: &str,
    ) -> Result<String, AgentError> {
        let messages = [Message::system(role_prompt), Message::user(task_prompt)];

        let mut last_error = String::new();
        for attempt in 0..=self.text_retries {
            match self
                .llm
                .complete(&messages, CompletionOptions::creative())
                .await
            {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "LLM text request failed");
                    last_error = e;
                }
            }
        }
        Err(AgentError::OracleUnavailable(last_error))
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}
