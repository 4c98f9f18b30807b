//! LLM 层：客户端抽象、OpenAI 兼容实现、Mock，以及面向 Planner / Verifier 的 Oracle 封装

pub mod message;
pub mod mock;
pub mod openai;
pub mod oracle;
pub mod traits;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use oracle::{parse_structured, Oracle};
pub use traits::{CompletionOptions, LlmClient};
