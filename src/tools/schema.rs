//! 工具参数 Schema 与校验
//!
//! 每个工具声明自己的参数结构体（Deserialize + JsonSchema）：schema 写入工具说明，
//! 调用前先反序列化校验，参数不合法时不发起任何请求。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::AgentError;

/// 生成参数结构体的 JSON Schema
pub fn args_schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// 将 JSON 参数解析为工具的参数结构体；null 视为空对象
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, AgentError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| AgentError::InvalidToolArgs {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}
