//! Agent 构建器：由 AppConfig 统一组装 LLM、工具、Planner / Executor / Verifier
//!
//! CLI 与 HTTP 入口共用同一套组装逻辑；测试可通过 with_llm / with_tool_registry 注入替身。

use std::path::PathBuf;
use std::sync::Arc;

use crate::agents::{Planner, PromptAssist, StepRunner, Verifier};
use crate::config::{load_config, AppConfig};
use crate::core::{AgentError, Orchestrator};
use crate::llm::{LlmClient, OpenAiClient, Oracle};
use crate::tools::{GithubSearchTool, LlmGenerateTool, ToolExecutor, ToolRegistry, WeatherTool};

pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    registry: Option<ToolRegistry>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            registry: None,
        }
    }

    /// 使用给定的 LLM 客户端，不再从配置创建
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// 使用给定的工具注册表替换内置工具
    pub fn with_tool_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 根据配置创建 OpenAI 兼容客户端；没有 API Key 视为配置错误
    pub fn build_llm(&self) -> Result<Arc<dyn LlmClient>, AgentError> {
        if let Some(llm) = &self.llm {
            return Ok(llm.clone());
        }
        let llm = &self.config.llm;
        let api_key = llm.resolved_api_key().ok_or_else(|| {
            AgentError::ConfigError(
                "no LLM API key: set llm.api_key, OPS__LLM__API_KEY, LLM_API_KEY or OPENAI_API_KEY"
                    .to_string(),
            )
        })?;
        let base_url = llm.resolved_base_url();
        let model = llm.resolved_model();
        tracing::info!(base_url = %base_url, model = %model, "using OpenAI-compatible LLM");
        Ok(Arc::new(OpenAiClient::new(
            &base_url,
            &model,
            &api_key,
            llm.timeouts.request,
        )))
    }

    pub fn build_oracle(&self, llm: Arc<dyn LlmClient>) -> Arc<Oracle> {
        let pipeline = &self.config.pipeline;
        Arc::new(Oracle::new(llm).with_retries(pipeline.json_retries, pipeline.text_retries))
    }

    /// 内置工具：GitHub 搜索、当前天气、文本生成
    pub fn build_tool_registry(&self, oracle: &Arc<Oracle>) -> ToolRegistry {
        let tools = &self.config.tools;
        let mut registry = ToolRegistry::new();
        registry.register(GithubSearchTool::new(
            tools.github.api_base.clone(),
            tools.github.timeout_secs,
            tools.github.default_top_n,
        ));
        registry.register(WeatherTool::new(
            tools.weather.geocoding_url.clone(),
            tools.weather.forecast_url.clone(),
            tools.weather.timeout_secs,
        ));
        registry.register(LlmGenerateTool::new(oracle.clone()));
        registry
    }

    pub fn build_components(mut self) -> Result<AgentComponents, AgentError> {
        let llm = self.build_llm()?;
        let oracle = self.build_oracle(llm);
        let registry = match self.registry.take() {
            Some(registry) => registry,
            None => self.build_tool_registry(&oracle),
        };
        let config = self.config;
        tracing::info!(tools = ?registry.tool_names(), "tool registry ready");

        let pipeline = &config.pipeline;
        let tools = Arc::new(ToolExecutor::new(registry, config.tools.tool_timeout_secs));
        let runner = Arc::new(StepRunner::new(tools.clone(), pipeline.max_workers));
        let planner = Planner::new(oracle.clone(), tools.clone());
        let verifier =
            Verifier::new(oracle.clone(), runner.clone()).with_compact_items(pipeline.compact_items);
        let orchestrator =
            Orchestrator::new(planner, runner, verifier).with_auto_replan(pipeline.auto_replan);
        let assist = PromptAssist::new(oracle, tools.clone());

        Ok(AgentComponents {
            orchestrator: Arc::new(orchestrator),
            assist: Arc::new(assist),
            tools,
            config,
        })
    }
}

/// 组装好的组件，可在多个请求间共享
pub struct AgentComponents {
    pub orchestrator: Arc<Orchestrator>,
    pub assist: Arc<PromptAssist>,
    pub tools: Arc<ToolExecutor>,
    pub config: AppConfig,
}

/// 便捷函数：加载配置并创建 AgentBuilder
pub fn create_agent_builder(config_path: Option<PathBuf>) -> Result<AgentBuilder, AgentError> {
    let config = load_config(config_path).map_err(|e| AgentError::ConfigError(e.to_string()))?;
    Ok(AgentBuilder::new(config))
}
