//! Planner / Executor / Verifier 三个角色及其数据模型

pub mod assist;
pub mod executor;
pub mod planner;
pub mod prompts;
pub mod types;
pub mod verifier;

pub use assist::PromptAssist;
pub use executor::StepRunner;
pub use planner::{normalize_plan, PlanDraft, Planner};
pub use types::{
    Completeness, Plan, ReplanEnvelope, RunMetrics, RunReport, Step, StepResult, StepStatus,
    Verification,
};
pub use verifier::Verifier;
