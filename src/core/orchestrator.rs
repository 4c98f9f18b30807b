//! 编排器：plan → execute → verify，必要时自动重规划一次
//!
//! 校验结果为 partial 时，根据失败步骤与限制说明构造修正任务，再跑一轮完整流程；
//! 重规划记录总会附在报告上，但只有新结果为 complete 时才替换原结果。

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::agents::{
    Plan, Planner, ReplanEnvelope, RunMetrics, RunReport, StepResult, StepRunner, Verification,
    Verifier,
};
use crate::core::AgentError;

pub const REPLAN_REASON: &str = "Previous attempt incomplete";

/// 由上一轮的失败步骤与限制说明构造修正任务；两者都为空时不重规划
pub fn build_replan_task(
    task: &str,
    steps: &[StepResult],
    verification: &Verification,
) -> Option<String> {
    let errors: Vec<String> = steps
        .iter()
        .filter(|s| !s.is_success())
        .map(|s| {
            let tool = if s.tool.is_empty() { "unknown_tool" } else { s.tool.as_str() };
            let error = s
                .error
                .as_deref()
                .filter(|e| !e.is_empty())
                .unwrap_or("unknown error");
            format!("{}: {}", tool, error)
        })
        .collect();
    let limitations = &verification.limitations;
    if errors.is_empty() && limitations.is_empty() {
        return None;
    }

    let mut parts = Vec::new();
    if !errors.is_empty() {
        parts.push(format!("Errors: {}", errors.join("; ")));
    }
    if !limitations.is_empty() {
        parts.push(format!("Limitations: {}", limitations.join("; ")));
    }
    Some(format!(
        "{}\n\nFix missing or failed info from the previous attempt. Use only the necessary tools. {}",
        task,
        parts.join(" ")
    ))
}

/// 一轮流程的产物
struct Cycle {
    plan: Plan,
    steps: Vec<StepResult>,
    verification: Verification,
}

pub struct Orchestrator {
    planner: Planner,
    runner: Arc<StepRunner>,
    verifier: Verifier,
    auto_replan: bool,
}

impl Orchestrator {
    pub fn new(planner: Planner, runner: Arc<StepRunner>, verifier: Verifier) -> Self {
        Self {
            planner,
            runner,
            verifier,
            auto_replan: true,
        }
    }

    pub fn with_auto_replan(mut self, enabled: bool) -> Self {
        self.auto_replan = enabled;
        self
    }

    pub async fn run(&self, task: &str) -> Result<RunReport, AgentError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.run_inner(task).instrument(span).await
    }

    async fn run_inner(&self, task: &str) -> Result<RunReport, AgentError> {
        tracing::info!(task = %task, "run started");
        let mut best = self.cycle(task, task).await?;
        let mut auto_replan = None;

        if self.auto_replan && best.verification.is_partial() {
            match build_replan_task(task, &best.steps, &best.verification) {
                Some(replan_task) => {
                    tracing::info!("result partial, replanning once");
                    // 用修正任务规划，但仍按原任务校验
                    let retry = self.cycle(&replan_task, task).await?;
                    let adopted = !retry.verification.is_partial();
                    auto_replan = Some(ReplanEnvelope {
                        triggered: true,
                        reason: REPLAN_REASON.to_string(),
                        task: replan_task,
                        plan: retry.plan.clone(),
                        steps: retry.steps.clone(),
                        verification: retry.verification.clone(),
                    });
                    if adopted {
                        best = retry;
                    } else {
                        tracing::warn!("replan still partial, keeping first result");
                    }
                }
                None => tracing::info!("result partial but nothing actionable to replan"),
            }
        }

        let metrics = RunMetrics::from_steps(&best.steps);
        tracing::info!(
            completeness = ?best.verification.completeness,
            tool_count = metrics.tool_count,
            tool_execution_ms = metrics.tool_execution_ms,
            replanned = auto_replan.is_some(),
            "run finished"
        );
        Ok(RunReport {
            task: task.to_string(),
            plan: best.plan,
            steps: best.steps,
            verification: best.verification,
            auto_replan,
            metrics,
        })
    }

    async fn cycle(&self, plan_task: &str, verify_task: &str) -> Result<Cycle, AgentError> {
        let plan = self.planner.create_plan(plan_task).await?;
        let steps = self.runner.execute(&plan).await;
        let verification = self.verifier.verify(verify_task, &plan, &steps).await?;
        Ok(Cycle {
            plan,
            steps,
            verification,
        })
    }
}
