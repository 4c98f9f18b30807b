//! 各角色的 system prompt 与 user prompt 构造
//!
//! 所有 prompt 都要求模型只输出 JSON；工具列表以 ToolSpec（含参数 JSON Schema）的形式嵌入。

use serde::Serialize;
use serde_json::{json, Value};

use crate::tools::ToolSpec;

pub const PLANNER_SYSTEM: &str = "You are the Planner agent for an AI operations assistant. \
Convert the user's task into a step-by-step JSON plan. \
Only use the available tools. Output valid JSON only.";

pub const VERIFIER_SYSTEM: &str = "You are the Verifier agent. Validate tool outputs, detect gaps, \
and produce a clean, structured final response. Output valid JSON only.";

pub const SUGGEST_SYSTEM: &str =
    "You suggest helpful follow-up prompts based on the user's task. Output valid JSON only.";

pub const ENHANCE_SYSTEM: &str =
    "You rewrite user prompts to be clearer and more tool-ready. Output valid JSON only.";

pub const EXPLAIN_SYSTEM: &str = "You explain AI tool outputs in simple language for a non-technical user. \
Output valid JSON only.";

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

pub fn planner_user_prompt(task: &str, tools: &[ToolSpec], plan_schema: &Value) -> String {
    format!(
        "Task: {task}\n\n\
         Available tools (JSON):\n{tools}\n\n\
         Return a JSON object that matches this schema:\n{schema}\n\n\
         Rules:\n\
         - Use 1-4 steps.\n\
         - Each step must map to exactly one tool.\n\
         - Do not repeat the same tool with identical args.\n\
         - Prefer the minimum number of steps needed to answer the task.\n\
         - args must match the tool's argument names.\n\
         - Use correct JSON types (numbers as numbers, not strings).\n\
         - If the task is a general writing request, use llm_generate.\n\
         - Only use GitHub or Weather tools when explicitly needed.\n\
         - Do not include any text outside JSON.",
        tools = pretty(tools),
        schema = pretty(plan_schema),
    )
}

pub fn verifier_user_prompt<P: Serialize, R: Serialize>(task: &str, plan: &P, results: &R) -> String {
    let schema = json!({
        "final_answer": "string",
        "data": "object",
        "sources": ["string URLs"],
        "limitations": ["string"],
        "completeness": "complete|partial"
    });
    format!(
        "Task: {task}\n\n\
         Plan:\n{plan}\n\n\
         Step results:\n{results}\n\n\
         Return a JSON object that matches this schema:\n{schema}\n\n\
         Guidelines:\n\
         - Use the tool outputs as ground truth.\n\
         - If any step failed or lacks data, set completeness to partial and add limitations.\n\
         - Include source URLs from tool outputs when available.\n\
         - Do not include any text outside JSON.",
        plan = pretty(plan),
        results = pretty(results),
        schema = pretty(&schema),
    )
}

pub fn suggest_user_prompt(task: &str, tools: &[ToolSpec]) -> String {
    format!(
        "Task: {task}\n\n\
         Available tools (JSON):\n{tools}\n\n\
         Return 3-5 short, similar prompts that can be solved using the tools.\n\
         Return a JSON object matching this schema:\n{schema}\n\
         Rules:\n\
         - Keep each suggestion under 120 characters.\n\
         - Use only relevant tools.\n\
         - Do not include any text outside JSON.",
        tools = pretty(tools),
        schema = pretty(&json!({"suggestions": ["string"]})),
    )
}

pub fn enhance_user_prompt(task: &str, tools: &[ToolSpec]) -> String {
    format!(
        "User prompt: {task}\n\n\
         Available tools (JSON):\n{tools}\n\n\
         Rewrite the prompt to be clear, specific, and actionable for the tools.\n\
         Return a JSON object matching this schema:\n{schema}\n\
         Rules:\n\
         - Keep it under 200 characters.\n\
         - Preserve user intent.\n\
         - Do not include any text outside JSON.",
        tools = pretty(tools),
        schema = pretty(&json!({"enhanced_prompt": "string"})),
    )
}

pub fn explain_user_prompt(task: &str, final_output: &Value) -> String {
    format!(
        "User task: {task}\n\n\
         Final output:\n{output}\n\n\
         Explain the result in 3-5 short sentences, simple English.\n\
         Return a JSON object matching this schema:\n{schema}\n\
         Rules:\n\
         - Avoid jargon.\n\
         - Keep it under 120 words.\n\
         - Do not include any text outside JSON.",
        output = pretty(final_output),
        schema = pretty(&json!({"explanation": "string"})),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planner_prompt_embeds_tools() {
        let tools = vec![ToolSpec {
            name: "weather_current".into(),
            description: "Get current weather".into(),
            args: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        }];
        let prompt = planner_user_prompt("weather in Pune", &tools, &json!({"title": "PlanDraft"}));
        assert!(prompt.starts_with("Task: weather in Pune"));
        assert!(prompt.contains("\"name\": \"weather_current\""));
        assert!(prompt.contains("PlanDraft"));
        assert!(prompt.contains("- Use 1-4 steps."));
    }

    #[test]
    fn test_explain_prompt_contains_output() {
        let prompt = explain_user_prompt("t", &json!({"final_answer": "42"}));
        assert!(prompt.contains("\"final_answer\": \"42\""));
        assert!(prompt.contains("explanation"));
    }
}
