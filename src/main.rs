mod cli;
mod stdio_transport;

use anyhow::Context;
use clap::Parser;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use aura_domain::config::{Config, ConfigSeverity};
use aura_orchestrator::{AvailableCredentials, Dispatcher, SharedTurnDeps, TurnContext};
use aura_providers::ProviderRegistry;
use aura_sessions::SessionRegistry;
use aura_tools::builtin::{GetWeatherTool, SwitchLlmTool};
use aura_tools::ToolRegistry;

use cli::{Cli, Command, ConfigCommand};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _config_path) = cli::load_config()?;
            run_daemon(Arc::new(config))
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = cli::load_config()?;
            let issues = config.validate();
            for issue in &issues {
                println!("{issue}");
            }
            let errors = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
            if errors > 0 {
                anyhow::bail!("{config_path}: {errors} error(s)");
            }
            println!("{config_path}: OK");
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = cli::load_config()?;
            println!("{}", toml::to_string_pretty(&config).context("serializing config")?);
            Ok(())
        }
        Some(Command::Version) => {
            println!("aurad {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,aura=debug")))
        .json()
        .init();
}

/// Brings up the session registry, provider registry, tool registry and idle
/// sweep, then drives the LOCAL session from stdin until EOF. Framing for
/// remote clients (satellite/legacy/web) lives outside this crate.
fn run_daemon(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("aura starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count()
        );
    }

    let registry = Arc::new(SessionRegistry::new(config.sessions.max_sessions));

    // ProviderRegistry::from_config already warns on each individual init
    // error; this just summarizes the outcome.
    let providers = ProviderRegistry::from_config(&config.llm);
    tracing::info!(
        providers = providers.len(),
        init_errors = providers.init_errors().len(),
        "provider registry ready"
    );

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(GetWeatherTool));
    tools.register(Arc::new(SwitchLlmTool));

    let available_credentials = AvailableCredentials::from_config(&config.llm);

    let shared_deps = Arc::new(SharedTurnDeps {
        providers,
        tools,
        llm_defaults: config.llm.clone(),
        available_credentials,
        max_tool_iterations: config.turn.max_tool_iterations,
    });

    // LOCAL is driven synchronously on the main thread; satellite/legacy/web
    // turns go through the worker-pool dispatcher instead.
    let dispatcher = Dispatcher::new(config.sessions.max_satellite_workers, shared_deps.clone());
    tracing::info!(
        workers_per_kind = dispatcher.worker_count(aura_orchestrator::TransportKind::Satellite),
        "worker-pool dispatcher ready"
    );

    let idle_sweep = aura_sessions::idle_sweep::spawn(
        registry.clone(),
        Duration::from_secs(config.sessions.session_timeout_sec),
        Duration::from_secs(30),
    );

    let local = registry.get_local();
    local.rebind_transport(Arc::new(stdio_transport::StdioTransport::new()));
    local.init_with_system_prompt(config.sessions.default_prompts.local.clone());

    let ctx = TurnContext {
        providers: &shared_deps.providers,
        tools: &shared_deps.tools,
        llm_defaults: &shared_deps.llm_defaults,
        available_credentials: &shared_deps.available_credentials,
        max_tool_iterations: shared_deps.max_tool_iterations,
    };

    println!("aura ready. Type a message and press Enter (Ctrl-D to quit).");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        print!("> ");
        std::io::stdout().flush().ok();

        match aura_orchestrator::run_turn(&ctx, &local, &line, None) {
            Ok(aura_orchestrator::TurnResult::FinalText(_)) => {}
            Ok(aura_orchestrator::TurnResult::Cancelled) => {
                println!("[turn cancelled]");
            }
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                println!("[error: {e}]");
            }
        }
    }

    idle_sweep.stop();
    dispatcher.shutdown();

    let history_dir = std::env::temp_dir();
    registry.save_all_histories(&history_dir).context("saving session histories on shutdown")?;
    tracing::info!(dir = %history_dir.display(), "histories saved");

    Ok(())
}
