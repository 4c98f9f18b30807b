//! Ops Assistant 命令行入口
//!
//! `ops-assistant run "<task>"` 运行完整流程并输出 RunReport（JSON）；
//! 另有 suggest / enhance / explain / tools 子命令。日志输出到 stderr。

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};

use ops_assistant::core::create_agent_builder;
use ops_assistant::observability;

#[derive(Parser)]
#[command(
    name = "ops-assistant",
    version,
    about = "Plan, execute and verify tool-backed tasks"
)]
struct Cli {
    /// 额外的配置文件（覆盖 config/default.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan, execute and verify a task, printing the run report.
    Run { task: String },
    /// Suggest similar prompts that the tools can answer.
    Suggest { task: String },
    /// Rewrite a prompt to be clearer and tool-ready.
    Enhance { task: String },
    /// Explain a final output in simple language.
    Explain {
        task: String,
        /// The `final` object of a run report, as JSON.
        #[arg(long = "final")]
        final_json: String,
    },
    /// List the available tools and their argument schemas.
    Tools,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{}", text);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();
    let cli = Cli::parse();

    let components = create_agent_builder(cli.config)
        .context("Failed to load config")?
        .build_components()
        .context("Failed to build agent")?;

    match cli.command {
        Command::Run { task } => {
            let report = components
                .orchestrator
                .run(&task)
                .await
                .context("Run failed")?;
            print_json(&report)
        }
        Command::Suggest { task } => {
            let suggestions = components.assist.suggest(&task).await.context("Suggest failed")?;
            print_json(&json!({ "suggestions": suggestions }))
        }
        Command::Enhance { task } => {
            let enhanced = components.assist.enhance(&task).await.context("Enhance failed")?;
            print_json(&json!({ "enhanced_prompt": enhanced }))
        }
        Command::Explain { task, final_json } => {
            let final_output: Value =
                serde_json::from_str(&final_json).context("--final is not valid JSON")?;
            anyhow::ensure!(final_output.is_object(), "--final must be a JSON object");
            let explanation = components
                .assist
                .explain(&task, &final_output)
                .await
                .context("Explain failed")?;
            print_json(&json!({ "explanation": explanation }))
        }
        Command::Tools => print_json(&components.tools.specs()),
    }
}
