//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `OPS__*` 覆盖（双下划线表示嵌套，如 `OPS__PIPELINE__MAX_WORKERS=2`）。
//! LLM 端点 / 模型 / Key 另外兼容 `LLM_*` 与 `OPENAI_*` 环境变量。

use std::path::PathBuf;

use serde::Deserialize;

/// Groq 的 OpenAI 兼容端点（未配置 base_url 时的默认值）
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub pipeline: PipelineSection,
    pub web: WebSection,
}

/// [llm] 段：OpenAI 兼容端点、模型、Key 与超时
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmSection {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl LlmSection {
    /// 配置优先，其次 LLM_BASE_URL / OPENAI_BASE_URL，最后为 Groq 端点
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .or_else(|| env_non_empty("LLM_BASE_URL"))
            .or_else(|| env_non_empty("OPENAI_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string())
    }

    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .or_else(|| env_non_empty("LLM_MODEL"))
            .or_else(|| env_non_empty("OPENAI_MODEL"))
            .unwrap_or_else(|| default_model_for(&self.resolved_base_url()).to_string())
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| env_non_empty("LLM_API_KEY"))
            .or_else(|| env_non_empty("OPENAI_API_KEY"))
    }
}

/// Groq 端点默认用 llama-3.1-8b-instant，其它端点默认 gpt-4o-mini
pub fn default_model_for(base_url: &str) -> &'static str {
    if base_url.contains("api.groq.com") {
        "llama-3.1-8b-instant"
    } else {
        "gpt-4o-mini"
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [tools] 段：工具超时与各工具端点
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub github: GithubSection,
    #[serde(default)]
    pub weather: WeatherSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            github: GithubSection::default(),
            weather: WeatherSection::default(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// [tools.github] 段
#[derive(Debug, Clone, Deserialize)]
pub struct GithubSection {
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
            timeout_secs: default_http_timeout_secs(),
            default_top_n: default_top_n(),
        }
    }
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_http_timeout_secs() -> u64 {
    20
}

fn default_top_n() -> usize {
    5
}

/// [tools.weather] 段：Open-Meteo 地理编码与天气端点
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSection {
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            forecast_url: default_forecast_url(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

/// [pipeline] 段：并发上限、模型重试次数、压缩条数、是否自动重规划
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// 多步计划时的最大并发工具数（实际并发为 min(步数, max_workers)）
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// 结构化回复解析失败时的额外重试次数
    #[serde(default = "default_json_retries")]
    pub json_retries: usize,
    /// 自由文本请求失败时的额外重试次数
    #[serde(default = "default_text_retries")]
    pub text_retries: usize,
    /// 交给 Verifier 模型的列表型输出最多保留的条数
    #[serde(default = "default_compact_items")]
    pub compact_items: usize,
    #[serde(default = "default_auto_replan")]
    pub auto_replan: bool,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            json_retries: default_json_retries(),
            text_retries: default_text_retries(),
            compact_items: default_compact_items(),
            auto_replan: default_auto_replan(),
        }
    }
}

fn default_max_workers() -> usize {
    4
}

fn default_json_retries() -> usize {
    2
}

fn default_text_retries() -> usize {
    1
}

fn default_compact_items() -> usize {
    5
}

fn default_auto_replan() -> bool {
    true
}

/// [web] 段
#[derive(Debug, Clone, Deserialize)]
pub struct WebSection {
    #[serde(default = "default_web_port")]
    pub port: u16,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            port: default_web_port(),
        }
    }
}

fn default_web_port() -> u16 {
    8000
}

/// 从 config 目录加载配置，环境变量 OPS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 OPS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("OPS")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
