//! Ops Assistant - Planner / Executor / Verifier 多智能体运维助手
//!
//! 模块划分：
//! - **agents**: Planner、Executor（StepRunner）、Verifier、Prompt 辅助与数据模型
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、编排器（自动重规划）、组件构建
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）及 Oracle
//! - **observability**: 日志初始化
//! - **tools**: 工具注册表、执行器与内置工具（github_search、weather_current、llm_generate）

pub mod agents;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod tools;

pub use crate::agents::{Plan, RunReport, Verification};
pub use crate::core::{AgentBuilder, AgentError, Orchestrator};
