//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：complete 返回整段回复文本。

use async_trait::async_trait;

use crate::llm::Message;

/// 单次请求的采样参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
}

impl CompletionOptions {
    /// 结构化输出（计划、校验）用低温度
    pub fn precise() -> Self {
        Self { temperature: 0.2 }
    }

    /// 自由写作
    pub fn creative() -> Self {
        Self { temperature: 0.7 }
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::creative()
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(
        &self,
        messages: &[Message],
        options: CompletionOptions,
    ) -> Result<String, String>;
}
