//! 错误类型
//!
//! 计划校验、模型（Oracle）调用、工具执行、配置四类错误。工具类错误在 Executor 内被收敛为
//! StepResult.error（Display 文本即步骤错误信息），不会中断整次运行；其余错误向上传递。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    /// Planner 输出不是对象、缺少步骤、引用了未注册的工具等
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// 重试预算耗尽后仍无法从模型回复中解析出 JSON 对象
    #[error("LLM did not return valid JSON: {0}")]
    OracleFormat(String),

    /// 模型请求失败（网络、鉴权、限流等）
    #[error("LLM unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidToolArgs { tool: String, reason: String },

    #[error("{0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}
