//! skillrun - run tools exposed by an MCP server from the command line.
//!
//! Reads a server launch configuration from a JSON file, connects over
//! stdio, and performs exactly one of: list tools, describe a tool, or call
//! a tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgGroup, CommandFactory, Parser};
use serde::Deserialize;
use serde_json::{Map, Value};

use skillrun_mcp::{ContentItem, Executor, LaunchSpec, SessionOptions};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Run tools exposed by an MCP server
#[derive(Parser)]
#[command(name = "skillrun")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("operation").args(["list", "describe", "call"])))]
struct Cli {
    /// List all tools advertised by the server
    #[arg(long)]
    list: bool,

    /// Print the full schema for one tool
    #[arg(long, value_name = "TOOL")]
    describe: Option<String>,

    /// Invoke a tool: '{"tool": "name", "arguments": {...}}'
    #[arg(long, value_name = "JSON")]
    call: Option<String>,

    /// Path to the server launch configuration
    #[arg(long, default_value = "mcp-config.json", env = "SKILLRUN_CONFIG")]
    config: PathBuf,

    /// Per-request timeout in seconds (0 waits indefinitely)
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// One tool invocation, as given to --call.
#[derive(Debug, Deserialize)]
struct CallRequest {
    tool: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

/// The operation selected on the command line.
enum Operation {
    List,
    Describe(String),
    Call(CallRequest),
}

impl Cli {
    /// Resolve the mutually exclusive flags into one operation, if any.
    fn operation(&self) -> Result<Option<Operation>> {
        if self.list {
            return Ok(Some(Operation::List));
        }
        if let Some(name) = &self.describe {
            return Ok(Some(Operation::Describe(name.clone())));
        }
        if let Some(raw) = &self.call {
            let request: CallRequest = serde_json::from_str(raw)
                .context("invalid --call payload, expected {\"tool\": ..., \"arguments\": {...}}")?;
            return Ok(Some(Operation::Call(request)));
        }
        Ok(None)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "skillrun=debug,skillrun_mcp=debug,info"
    } else {
        "skillrun=info,skillrun_mcp=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let Some(operation) = cli.operation()? else {
        Cli::command().print_long_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let spec = load_spec(&cli.config)?;
    tracing::debug!(
        command = %spec.command,
        config = %cli.config.display(),
        "loaded launch configuration"
    );

    let options = SessionOptions {
        request_timeout: (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout)),
    };
    let executor = Executor::with_options(spec, options).context("MCP engine unavailable")?;

    let outcome = execute(operation, &executor).await;

    // The operation's outcome is already decided; teardown never changes it.
    executor.close().await;
    outcome
}

async fn execute(operation: Operation, executor: &Executor) -> Result<ExitCode> {
    match operation {
        Operation::List => {
            let tools = executor.list_tools().await?;
            println!("{}", serde_json::to_string_pretty(&tools)?);
            Ok(ExitCode::SUCCESS)
        }
        Operation::Describe(name) => match executor.describe_tool(&name).await? {
            Some(descriptor) => {
                println!("{}", serde_json::to_string_pretty(&descriptor)?);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("Tool not found: {name}");
                Ok(ExitCode::FAILURE)
            }
        },
        Operation::Call(request) => {
            let result = executor.call_tool(&request.tool, request.arguments).await?;
            for item in &result.content {
                match item {
                    ContentItem::Text(text) => println!("{text}"),
                    ContentItem::Structured(value) => {
                        println!("{}", serde_json::to_string_pretty(value)?)
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_spec(path: &Path) -> Result<LaunchSpec> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let spec: LaunchSpec = serde_json::from_str(&raw)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;

    Ok(spec)
}
