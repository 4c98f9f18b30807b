//! 工具箱：注册表、执行器与内置工具（GitHub 搜索、当前天气、文本生成）

pub mod executor;
pub mod function;
pub mod github;
pub mod llm_generate;
pub mod registry;
pub mod schema;
pub mod weather;

pub use executor::ToolExecutor;
pub use function::FnTool;
pub use github::GithubSearchTool;
pub use llm_generate::LlmGenerateTool;
pub use registry::{Tool, ToolOutput, ToolRegistry, ToolSpec};
pub use schema::{args_schema, parse_args};
pub use weather::WeatherTool;

/// 仓库搜索工具名（Verifier 据此收集仓库链接与拼装答案）
pub const GITHUB_SEARCH: &str = "github_search";
/// 天气工具名
pub const WEATHER_CURRENT: &str = "weather_current";
/// 文本生成工具名
pub const LLM_GENERATE: &str = "llm_generate";
