use crate::audit::CommandAuditor;
use crate::config::{
    PolicyConfig, default_constitution_path, load_constitution, server_config_from_env,
};
use crate::exec::CommandExecutor;
use crate::gateway::{self, GatewayState};
use crate::llm::{AnthropicAuditor, LlmAuditor};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "sentinel", version)]
#[command(about = "Command auditing gateway: deterministic policy filter + LLM semantic audit")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Listen host (overrides SENTINEL_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Listen port (overrides SENTINEL_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Constitution path (overrides SENTINEL_CONSTITUTION_PATH)
        #[arg(long)]
        constitution: Option<PathBuf>,
        /// Fail startup when the constitution is missing or unparseable
        #[arg(long)]
        strict: bool,
        /// Model for the LLM auditor (overrides SENTINEL_MODEL)
        #[arg(long)]
        model: Option<String>,
    },
    /// Audit a single command and print the decision (exit 1 when denied)
    Audit {
        /// Constitution path (overrides SENTINEL_CONSTITUTION_PATH)
        #[arg(long)]
        constitution: Option<PathBuf>,
        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
        /// The shell command to audit
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// Validate the constitution and print the effective policy
    Check {
        /// Constitution path (overrides SENTINEL_CONSTITUTION_PATH)
        #[arg(long)]
        constitution: Option<PathBuf>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            host,
            port,
            constitution,
            strict,
            model,
        } => serve(host, port, constitution, strict, model).await,
        Commands::Audit {
            constitution,
            json,
            command,
        } => audit_once(constitution, json, &command.join(" ")).await,
        Commands::Check { constitution } => check(constitution),
    }
}

fn resolve_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(default_constitution_path)
}

fn build_auditor(
    constitution: Option<PathBuf>,
    strict: bool,
    model: Option<String>,
) -> Result<CommandAuditor> {
    let path = resolve_path(constitution);
    let doc = load_constitution(&path, strict)?;
    let policy = PolicyConfig::from_constitution(&doc);

    let llm: Option<Arc<dyn LlmAuditor>> = match AnthropicAuditor::from_env(model) {
        Some(auditor) => {
            info!("LLM auditor active (model: {})", auditor.model());
            Some(Arc::new(auditor))
        }
        None => {
            warn!(
                "no LLM auditor configured (ANTHROPIC_API_KEY unset); \
                 undetermined commands will be rejected fail-closed"
            );
            None
        }
    };

    CommandAuditor::new(policy, llm)
}

async fn serve(
    host: Option<String>,
    port: Option<u16>,
    constitution: Option<PathBuf>,
    strict: bool,
    model: Option<String>,
) -> Result<()> {
    let auditor = build_auditor(constitution, strict, model)?;
    let server = server_config_from_env()?;
    let host = host.unwrap_or(server.host);
    let port = port.unwrap_or(server.port);

    let state = Arc::new(GatewayState::new(
        auditor,
        CommandExecutor::default(),
        server.auth_token,
    ));
    gateway::start(&host, port, state).await
}

async fn audit_once(constitution: Option<PathBuf>, json: bool, command: &str) -> Result<()> {
    let auditor = build_auditor(constitution, false, None)?;
    let decision = auditor.audit(command).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        let verdict = if decision.allowed { "ALLOWED" } else { "DENIED" };
        println!("{} (risk {}): {}", verdict, decision.risk_score, decision.reason);
    }

    if !decision.allowed {
        std::process::exit(1);
    }
    Ok(())
}

fn check(constitution: Option<PathBuf>) -> Result<()> {
    let path = resolve_path(constitution);
    let doc = load_constitution(&path, true)?;
    let policy = PolicyConfig::from_constitution(&doc);

    println!("Constitution: {}", path.display());
    println!("  blocked_strings:       {:?}", policy.blocked_strings);
    println!("  blocked_paths:         {:?}", policy.blocked_paths);
    println!("  blocked_tools:         {:?}", policy.blocked_tools);
    println!("  blocked_network_tools: {:?}", policy.blocked_network_tools);
    println!("  whitelisted_domains:   {:?}", policy.whitelisted_domains);
    println!("  lockdown_mode:         {}", policy.lockdown_mode);
    println!("  allowed_commands:      {:?}", policy.allowed_commands);
    println!("OK");
    Ok(())
}
