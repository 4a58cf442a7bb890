//! screenpilot CLI: run tasks against the development device harness.

mod config;
mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agent_core::actions::render_catalog;
use agent_core::{
    provider_from_config, ActionExecutor, AgentOrchestrator, IntentRegistry, ReasoningProvider,
    RunReport, TaskRequest,
};
use device_bridge::mock::ScriptedUserChannel;
use device_bridge::AgentFileSystem;
use perception_hub::PerceptionCoordinator;

use crate::config::RunnerConfig;

#[derive(Parser)]
#[command(
    name = "screenpilot",
    about = "On-device autonomous UI agent",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one task to completion and print the final report.
    Run {
        /// Natural-language task for the agent.
        #[arg(long)]
        task: String,

        /// Path to the YAML config file.
        #[arg(long, default_value = "screenpilot.yaml")]
        config: PathBuf,

        /// Use the scripted offline reasoning provider instead of a
        /// remote endpoint.
        #[arg(long)]
        mock: bool,

        /// Print the full report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Print the action catalog advertised to the reasoning model.
    Actions,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            task,
            config,
            mock,
            json,
        } => run_task(task, config, mock, json).await,
        Commands::Actions => {
            print!("{}", render_catalog());
            Ok(())
        }
    }
}

async fn run_task(task: String, config_path: PathBuf, mock: bool, json: bool) -> Result<()> {
    let config = RunnerConfig::load_or_default(&config_path)?;

    let provider: Arc<dyn ReasoningProvider> = if mock {
        Arc::new(demo::demo_provider())
    } else {
        provider_from_config(&config.reasoning)?
    };

    let files: Arc<dyn AgentFileSystem> = Arc::new(demo::demo_files());
    let intents = Arc::new(IntentRegistry::new());
    let executor = ActionExecutor::new(
        Arc::new(demo::demo_device()),
        files.clone(),
        Arc::new(ScriptedUserChannel::new()),
        intents.clone(),
    );
    let orchestrator = AgentOrchestrator::new(
        config.agent.clone(),
        PerceptionCoordinator::new(Arc::new(demo::demo_capture())),
        provider,
        executor,
        files,
        intents,
    );

    let report = orchestrator.run(&TaskRequest::new(task)).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!("Status:   {:?}", report.status);
    println!("Success:  {}", report.success);
    println!("Steps:    {}", report.steps_taken);
    println!("Duration: {} ms", report.total_time_ms);
    println!("Message:  {}", report.message);
    if !report.attachments.is_empty() {
        println!("Attachments: {}", report.attachments.join(", "));
    }
}
