//! Prompt 辅助：相似提示推荐、提示改写、结果解释

use std::sync::Arc;

use serde_json::Value;

use crate::agents::prompts::{
    enhance_user_prompt, explain_user_prompt, suggest_user_prompt, ENHANCE_SYSTEM, EXPLAIN_SYSTEM,
    SUGGEST_SYSTEM,
};
use crate::core::AgentError;
use crate::llm::Oracle;
use crate::tools::ToolExecutor;

const MAX_SUGGESTIONS: usize = 5;

/// 清洗 suggestions：非字符串转为文本，去掉空白项，最多保留 5 条
pub fn clean_suggestions(value: &Value) -> Vec<String> {
    value
        .get("suggestions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| match item {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .filter(|s| !s.is_empty())
                .take(MAX_SUGGESTIONS)
                .collect()
        })
        .unwrap_or_default()
}

fn trimmed_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

pub struct PromptAssist {
    oracle: Arc<Oracle>,
    tools: Arc<ToolExecutor>,
}

impl PromptAssist {
    pub fn new(oracle: Arc<Oracle>, tools: Arc<ToolExecutor>) -> Self {
        Self { oracle, tools }
    }

    pub async fn suggest(&self, task: &str) -> Result<Vec<String>, AgentError> {
        let prompt = suggest_user_prompt(task, &self.tools.specs());
        let value = self.oracle.structured_response(SUGGEST_SYSTEM, &prompt).await?;
        Ok(clean_suggestions(&value))
    }

    pub async fn enhance(&self, task: &str) -> Result<String, AgentError> {
        let prompt = enhance_user_prompt(task, &self.tools.specs());
        let value = self.oracle.structured_response(ENHANCE_SYSTEM, &prompt).await?;
        Ok(trimmed_field(&value, "enhanced_prompt"))
    }

    /// final_output 通常是 RunReport 中的 final
    pub async fn explain(&self, task: &str, final_output: &Value) -> Result<String, AgentError> {
        let prompt = explain_user_prompt(task, final_output);
        let value = self.oracle.structured_response(EXPLAIN_SYSTEM, &prompt).await?;
        Ok(trimmed_field(&value, "explanation"))
    }
}
