//! 文本生成工具：通用写作任务（介绍、演讲稿、摘要等）交给 LLM 自由文本输出

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::llm::Oracle;
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::{Tool, ToolOutput, LLM_GENERATE};

const WRITER_PROMPT: &str = "You are a helpful assistant that writes clear, concise content. \
Follow the user's instruction and keep the response direct.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateArgs {
    /// 写作指令，如 "Write a 60-second intro speech."
    pub instruction: String,
}

pub struct LlmGenerateTool {
    oracle: Arc<Oracle>,
}

impl LlmGenerateTool {
    pub fn new(oracle: Arc<Oracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl Tool for LlmGenerateTool {
    fn name(&self) -> &str {
        LLM_GENERATE
    }

    fn description(&self) -> &str {
        "Generate a text response for general writing tasks. Args: {\"instruction\": \"string instruction, e.g. Write a 60-second intro speech.\"}."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<GenerateArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let args: GenerateArgs = parse_args(LLM_GENERATE, args).map_err(|e| e.to_string())?;
        let text = self
            .oracle
            .free_text_response(WRITER_PROMPT, &args.instruction)
            .await
            .map_err(|e| e.to_string())?;
        let mut output = ToolOutput::new();
        output.insert("text".into(), Value::String(text.trim().to_string()));
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_generate_trims_text() {
        let llm = Arc::new(MockLlmClient::with_replies(["  Hello World \n"]));
        let tool = LlmGenerateTool::new(Arc::new(Oracle::new(llm.clone())));
        let out = tool
            .execute(json!({"instruction": "Say hello"}))
            .await
            .unwrap();
        assert_eq!(out["text"], "Hello World");
        assert_eq!(llm.requests()[0][1].content, "Say hello");
    }

    #[tokio::test]
    async fn test_generate_requires_instruction() {
        let tool = LlmGenerateTool::new(Arc::new(Oracle::new(Arc::new(MockLlmClient::new()))));
        let err = tool.execute(json!({"prompt": "x"})).await.unwrap_err();
        assert!(err.contains("instruction"));
    }
}
