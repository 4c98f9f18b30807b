//! Executor：按计划执行工具步骤
//!
//! 单步计划直接内联执行；多步计划在 JoinSet 上并发执行，由 Semaphore 限制为 min(步数, max_workers)。
//! 结果写入按步骤下标寻址的槽位，返回顺序与计划一致。单步失败（含 panic）只影响该步骤。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::agents::types::{Plan, Step, StepResult};
use crate::core::AgentError;
use crate::tools::ToolExecutor;

pub const DEFAULT_MAX_WORKERS: usize = 4;

pub struct StepRunner {
    tools: Arc<ToolExecutor>,
    max_workers: usize,
}

impl StepRunner {
    pub fn new(tools: Arc<ToolExecutor>, max_workers: usize) -> Self {
        Self {
            tools,
            max_workers: max_workers.max(1),
        }
    }

    /// 执行计划中的全部步骤，每步恰好一个结果，顺序与计划一致
    pub async fn execute(&self, plan: &Plan) -> Vec<StepResult> {
        let n = plan.steps.len();
        if n <= 1 {
            let mut results = Vec::with_capacity(n);
            for step in &plan.steps {
                results.push(run_guarded(&self.tools, step).await);
            }
            return results;
        }

        let workers = n.min(self.max_workers);
        tracing::debug!(steps = n, workers, "executing steps concurrently");
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut join_set = JoinSet::new();
        for (idx, step) in plan.steps.iter().cloned().enumerate() {
            let tools = self.tools.clone();
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (idx, run_guarded(&tools, &step).await)
            });
        }

        let mut slots: Vec<Option<StepResult>> = vec![None; n];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => tracing::warn!(error = %e, "step task did not finish"),
            }
        }

        slots
            .into_iter()
            .zip(&plan.steps)
            .map(|(slot, step)| {
                slot.unwrap_or_else(|| StepResult::failure(step, "Step did not complete", 0))
            })
            .collect()
    }

    /// 对失败步骤各重跑一次（顺序执行）；成功结果与计划中找不到的 step_id 原样保留
    pub async fn retry_failed(&self, plan: &Plan, results: &[StepResult]) -> Vec<StepResult> {
        let mut updated = Vec::with_capacity(results.len());
        for result in results {
            match plan.step(&result.step_id) {
                Some(step) if !result.is_success() => {
                    tracing::info!(step_id = %step.id, tool = %step.tool, "retrying failed step");
                    updated.push(run_guarded(&self.tools, step).await);
                }
                _ => updated.push(result.clone()),
            }
        }
        updated
    }
}

/// 执行单步并把 panic 转为错误结果
async fn run_guarded(tools: &ToolExecutor, step: &Step) -> StepResult {
    let start = Instant::now();
    match AssertUnwindSafe(run_step(tools, step)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(step_id = %step.id, tool = %step.tool, panic = %message, "tool panicked");
            StepResult::failure(
                step,
                format!("Tool panicked: {}", message),
                start.elapsed().as_millis() as u64,
            )
        }
    }
}

async fn run_step(tools: &ToolExecutor, step: &Step) -> StepResult {
    if !tools.has_tool(&step.tool) {
        return StepResult::failure(step, AgentError::UnknownTool(step.tool.clone()).to_string(), 0);
    }
    let start = Instant::now();
    let outcome = tools
        .execute(&step.tool, Value::Object(step.args.clone()))
        .await;
    let duration_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(output) => StepResult::success(step, output, duration_ms),
        Err(e) => {
            tracing::warn!(step_id = %step.id, tool = %step.tool, error = %e, "step failed");
            StepResult::failure(step, e.to_string(), duration_ms)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::types::StepStatus;
    use crate::tools::{FnTool, Tool, ToolOutput, ToolRegistry};
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 按 args.ms 睡眠，记录同时在跑的数量峰值
    #[derive(Default)]
    struct SleepTool {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for SleepTool {
        fn name(&self) -> &str {
            "sleep"
        }

        fn description(&self) -> &str {
            "sleeps for args.ms"
        }

        async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let ms = args["ms"].as_u64().unwrap_or(10);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            let mut out = ToolOutput::new();
            out.insert("slept".into(), json!(ms));
            Ok(out)
        }
    }

    fn step(id: &str, tool: &str, args: Value) -> Step {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Step {
            id: id.into(),
            tool: tool.into(),
            args,
            purpose: String::new(),
        }
    }

    fn plan(steps: Vec<Step>) -> Plan {
        Plan {
            goal: "test".into(),
            steps,
        }
    }

    fn runner_with(extra: impl FnOnce(&mut ToolRegistry)) -> StepRunner {
        let mut registry = ToolRegistry::new();
        registry.register(FnTool::new("ok", "succeeds", |args| {
            let mut out = ToolOutput::new();
            out.insert("echo".into(), args);
            Ok(out)
        }));
        registry.register(FnTool::new("fail", "fails", |_| Err("boom".to_string())));
        registry.register(FnTool::new("panic", "panics", |_| panic!("tool exploded")));
        extra(&mut registry);
        StepRunner::new(Arc::new(ToolExecutor::new(registry, 30)), DEFAULT_MAX_WORKERS)
    }

    fn runner() -> StepRunner {
        runner_with(|_| {})
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_keep_plan_order() {
        let runner = runner_with(|r| r.register(SleepTool::default()));
        let plan = plan(vec![
            step("slow", "sleep", json!({"ms": 300})),
            step("mid", "sleep", json!({"ms": 200})),
            step("fast", "sleep", json!({"ms": 100})),
        ]);
        let results = runner.execute(&plan).await;
        let ids: Vec<_> = results.iter().map(|r| r.step_id.as_str()).collect();
        assert_eq!(ids, ["slow", "mid", "fast"]);
        assert!(results.iter().all(StepResult::is_success));
        assert_eq!(results[0].output.as_ref().unwrap()["slept"], 300);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let plan = plan(vec![
            step("a", "ok", json!({"x": 1})),
            step("b", "fail", json!({})),
            step("c", "panic", json!({})),
            step("d", "ok", json!({"x": 2})),
        ]);
        let results = runner().execute(&plan).await;
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].status, StepStatus::Success);
        assert_eq!(results[1].error.as_deref(), Some("boom"));
        assert!(results[1].output.is_none());
        assert!(results[2].error.as_deref().unwrap().contains("tool exploded"));
        assert_eq!(results[3].output.as_ref().unwrap()["echo"]["x"], 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_not_invoked() {
        let results = runner()
            .execute(&plan(vec![step("s", "fake_tool", json!({}))]))
            .await;
        assert_eq!(results[0].error.as_deref(), Some("Unknown tool: fake_tool"));
        assert_eq!(results[0].duration_ms, 0);
    }

    #[tokio::test]
    async fn test_single_step_panic_inline() {
        let results = runner()
            .execute(&plan(vec![step("s", "panic", json!({}))]))
            .await;
        assert_eq!(results[0].status, StepStatus::Error);
    }

    #[tokio::test]
    async fn test_empty_plan() {
        assert!(runner().execute(&plan(vec![])).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_bounded_by_max_workers() {
        let tool = SleepTool::default();
        let peak = tool.peak.clone();
        let runner = runner_with(|r| r.register(tool));
        let steps = (0..8)
            .map(|i| step(&format!("s{}", i), "sleep", json!({"ms": 50})))
            .collect();
        let results = runner.execute(&plan(steps)).await;
        assert_eq!(results.len(), 8);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= DEFAULT_MAX_WORKERS, "peak {}", peak);
        assert!(peak >= 2, "steps did not overlap");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_bounded_by_step_count() {
        let tool = SleepTool::default();
        let peak = tool.peak.clone();
        let runner = StepRunner::new(
            {
                let mut registry = ToolRegistry::new();
                registry.register(tool);
                Arc::new(ToolExecutor::new(registry, 30))
            },
            16,
        );
        let steps = (0..3)
            .map(|i| step(&format!("s{}", i), "sleep", json!({"ms": 30})))
            .collect();
        runner.execute(&plan(steps)).await;
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_retry_is_identity_on_success() {
        let runner = runner();
        let plan = plan(vec![step("a", "ok", json!({})), step("b", "ok", json!({}))]);
        let results = runner.execute(&plan).await;
        assert_eq!(runner.retry_failed(&plan, &results).await, results);
    }

    #[tokio::test]
    async fn test_retry_reruns_only_failed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let runner = runner_with(move |r| {
            r.register(FnTool::new("flaky", "fails on first call", move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("transient".to_string())
                } else {
                    Ok(ToolOutput::new())
                }
            }))
        });
        let plan = plan(vec![step("a", "ok", json!({})), step("b", "flaky", json!({}))]);
        let first = runner.execute(&plan).await;
        assert_eq!(first[1].status, StepStatus::Error);

        let retried = runner.retry_failed(&plan, &first).await;
        assert_eq!(retried[0], first[0]);
        assert_eq!(retried[1].status, StepStatus::Success);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // 再次调用不会重跑已成功的步骤
        runner.retry_failed(&plan, &retried).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_passes_through_unknown_step_id() {
        let runner = runner();
        let plan = plan(vec![step("a", "ok", json!({}))]);
        let stale = StepResult::failure(&step("gone", "ok", json!({})), "old error", 5);
        let retried = runner.retry_failed(&plan, &[stale.clone()]).await;
        assert_eq!(retried, vec![stale]);
    }
}
