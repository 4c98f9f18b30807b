//! 核心层：错误类型、编排器与组件构建

pub mod builder;
pub mod error;
pub mod orchestrator;

pub use builder::{create_agent_builder, AgentBuilder, AgentComponents};
pub use error::AgentError;
pub use orchestrator::{build_replan_task, Orchestrator};
