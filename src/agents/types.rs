//! 流水线数据模型：Plan / Step / StepResult / Verification / ReplanEnvelope / RunReport
//!
//! 全部在单次运行内创建，运行结束即丢弃；序列化字段名与 HTTP / CLI 输出一致。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::tools::ToolOutput;

/// 计划中的一次工具调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 计划内唯一，默认 step_<序号>
    pub id: String,
    pub tool: String,
    pub args: Map<String, Value>,
    /// 仅供说明，不参与执行
    pub purpose: String,
}

/// 归一化后的计划：目标 + 有序步骤（非空，且每个工具都已注册）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// 计划中用到的工具集合
    pub fn tools_used(&self) -> BTreeSet<&str> {
        self.steps.iter().map(|s| s.tool.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
}

/// 单步执行结果；status 决定 output / error 哪一个有值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub tool: String,
    pub args: Map<String, Value>,
    pub status: StepStatus,
    pub output: Option<ToolOutput>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn success(step: &Step, output: ToolOutput, duration_ms: u64) -> Self {
        Self {
            step_id: step.id.clone(),
            tool: step.tool.clone(),
            args: step.args.clone(),
            status: StepStatus::Success,
            output: Some(output),
            error: None,
            duration_ms,
        }
    }

    pub fn failure(step: &Step, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            step_id: step.id.clone(),
            tool: step.tool.clone(),
            args: step.args.clone(),
            status: StepStatus::Error,
            output: None,
            error: Some(error.into()),
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }

    /// 成功步骤的输出
    pub fn success_output(&self) -> Option<&ToolOutput> {
        if self.is_success() {
            self.output.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Completeness {
    #[default]
    Complete,
    Partial,
}

/// 只有 partial（不区分大小写）视为不完整，其余取值一律按 complete 处理
impl From<String> for Completeness {
    fn from(value: String) -> Self {
        Completeness::parse(&value)
    }
}

impl Completeness {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("partial") {
            Completeness::Partial
        } else {
            Completeness::Complete
        }
    }
}

/// Verifier 的最终输出
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Verification {
    pub final_answer: String,
    pub data: Map<String, Value>,
    /// 去重后的来源链接，保持首次出现顺序
    pub sources: Vec<String>,
    pub limitations: Vec<String>,
    pub completeness: Completeness,
}

impl Verification {
    /// 逐字段解析模型给出的校验结果，类型不符的字段取默认值：
    /// final_answer 非字符串时取其 JSON 文本，data 非对象时为空，limitations 只保留字符串项。
    /// sources 总会被确定性地重新计算，故忽略模型给出的值。只有整体不是对象时才报错。
    pub fn from_oracle(value: Value) -> Result<Self, AgentError> {
        let Value::Object(map) = value else {
            return Err(AgentError::OracleFormat(
                "verifier output is not a JSON object".to_string(),
            ));
        };
        let final_answer = match map.get("final_answer") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let data = match map.get("data") {
            Some(Value::Object(data)) => data.clone(),
            _ => Map::new(),
        };
        let limitations = map
            .get("limitations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let completeness = map
            .get("completeness")
            .and_then(Value::as_str)
            .map(Completeness::parse)
            .unwrap_or_default();
        Ok(Self {
            final_answer,
            data,
            sources: Vec::new(),
            limitations,
            completeness,
        })
    }

    pub fn is_partial(&self) -> bool {
        self.completeness == Completeness::Partial
    }
}

/// 自动重规划记录：无论结果好坏都会附在运行报告上
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplanEnvelope {
    pub triggered: bool,
    pub reason: String,
    pub task: String,
    pub plan: Plan,
    pub steps: Vec<StepResult>,
    #[serde(rename = "final")]
    pub verification: Verification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub tool_execution_ms: u64,
    pub tool_count: usize,
}

impl RunMetrics {
    pub fn from_steps(steps: &[StepResult]) -> Self {
        Self {
            tool_execution_ms: steps.iter().map(|s| s.duration_ms).sum(),
            tool_count: steps.len(),
        }
    }
}

/// 一次完整运行的输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub task: String,
    pub plan: Plan,
    pub steps: Vec<StepResult>,
    #[serde(rename = "final")]
    pub verification: Verification,
    pub auto_replan: Option<ReplanEnvelope>,
    pub metrics: RunMetrics,
}
