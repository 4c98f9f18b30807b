//! Planner：任务 → 归一化 Plan
//!
//! 调用 Oracle 的结构化输出得到计划草稿，再做归一化：补默认 id / args / purpose / goal，
//! 拒绝非对象输出、空步骤、未注册工具和重复 id。此处不做重试，失败直接返回 InvalidPlan。

use std::collections::HashSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::agents::prompts::{planner_user_prompt, PLANNER_SYSTEM};
use crate::agents::types::{Plan, Step};
use crate::core::AgentError;
use crate::llm::Oracle;
use crate::tools::ToolExecutor;

/// 模型输出的计划草稿（同时用于生成 prompt 中的 schema）
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PlanDraft {
    /// 计划目标；缺省时取任务原文
    pub goal: Option<String>,
    pub steps: Vec<StepDraft>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StepDraft {
    /// 步骤 id，如 step_1
    #[schemars(with = "Option<String>")]
    pub id: Option<Value>,
    /// 可用工具之一
    pub tool: Option<String>,
    /// 工具参数，键名与类型需与工具 schema 一致
    pub args: Option<Map<String, Value>>,
    pub purpose: Option<String>,
}

impl StepDraft {
    /// 字符串或数字 id 原样保留，其余视为缺省
    fn id_text(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

pub fn plan_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(PlanDraft)).unwrap_or(Value::Null)
}

/// 将模型输出归一化为 Plan；is_known 判断工具是否已注册
pub fn normalize_plan(
    value: Value,
    task: &str,
    is_known: impl Fn(&str) -> bool,
) -> Result<Plan, AgentError> {
    let Value::Object(mut map) = value else {
        return Err(AgentError::InvalidPlan(
            "Planner output is not a JSON object".to_string(),
        ));
    };
    let raw_steps = match map.remove("steps") {
        Some(Value::Array(steps)) if !steps.is_empty() => steps,
        _ => {
            return Err(AgentError::InvalidPlan(
                "Planner output missing steps".to_string(),
            ))
        }
    };

    let mut steps = Vec::with_capacity(raw_steps.len());
    let mut seen = HashSet::new();
    for (idx, raw) in raw_steps.into_iter().enumerate() {
        let position = idx + 1;
        if !raw.is_object() {
            return Err(AgentError::InvalidPlan(format!(
                "step {} is not an object",
                position
            )));
        }
        let draft: StepDraft = serde_json::from_value(raw)
            .map_err(|e| AgentError::InvalidPlan(format!("step {}: {}", position, e)))?;

        let tool = draft.tool.clone().unwrap_or_default();
        if tool.is_empty() || !is_known(&tool) {
            return Err(AgentError::InvalidPlan(format!(
                "Unknown tool in plan: {}",
                tool
            )));
        }
        let id = draft
            .id_text()
            .unwrap_or_else(|| format!("step_{}", position));
        if !seen.insert(id.clone()) {
            return Err(AgentError::InvalidPlan(format!("Duplicate step id: {}", id)));
        }
        steps.push(Step {
            id,
            tool,
            args: draft.args.unwrap_or_default(),
            purpose: draft.purpose.unwrap_or_default(),
        });
    }

    let goal = map
        .get("goal")
        .and_then(Value::as_str)
        .filter(|g| !g.trim().is_empty())
        .unwrap_or(task)
        .to_string();

    Ok(Plan { goal, steps })
}

pub struct Planner {
    oracle: Arc<Oracle>,
    tools: Arc<ToolExecutor>,
}

impl Planner {
    pub fn new(oracle: Arc<Oracle>, tools: Arc<ToolExecutor>) -> Self {
        Self { oracle, tools }
    }

    pub async fn create_plan(&self, task: &str) -> Result<Plan, AgentError> {
        let prompt = planner_user_prompt(task, &self.tools.specs(), &plan_schema());
        let value = self.oracle.structured_response(PLANNER_SYSTEM, &prompt).await?;
        let plan = normalize_plan(value, task, |name| self.tools.has_tool(name))?;
        tracing::info!(
            goal = %plan.goal,
            steps = plan.steps.len(),
            tools = ?plan.tools_used(),
            "plan created"
        );
        Ok(plan)
    }
}
