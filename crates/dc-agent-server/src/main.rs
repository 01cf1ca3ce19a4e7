use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use dc_agent_server::logging::init_logging;
use dc_agent_server::{run_server_with_state, AppState, AssistantConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "dc-agent-server")]
#[command(about = "Defensive coordinator assistant HTTP server")]
#[command(version)]
struct Cli {
    /// Configuration file (JSON, or TOML with a .toml extension)
    #[arg(long, env = "DC_ASSISTANT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug mode
    #[arg(long, env = "DEBUG", default_value = "false")]
    debug: bool,

    /// Bind address
    #[arg(long, env = "UVICORN_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(long, env = "UVICORN_PORT")]
    port: Option<u16>,

    /// LLM API base URL
    #[arg(long)]
    llm_base_url: Option<String>,

    /// LLM model name
    #[arg(long)]
    model: Option<String>,

    /// Maximum model calls per turn
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Log level (overrides debug flag)
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut AssistantConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(base_url) = &self.llm_base_url {
            config.llm.base_url = base_url.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(max_iterations) = self.max_iterations {
            config.agent.max_iterations = max_iterations;
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug, cli.log_level.as_deref());

    let mut config =
        AssistantConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    log::info!(
        "Starting DC assistant server on {}:{}",
        config.server.host,
        config.server.port
    );
    log::info!("LLM Configuration:");
    log::info!("  Base URL: {}", config.llm.base_url);
    log::info!("  Model: {}", config.llm.model);
    log::info!("  Max iterations: {}", config.agent.max_iterations);
    log::info!("  Tools: {}", config.tools.len());

    let state = AppState::from_config(&config).context("failed to build agent")?;

    run_server_with_state(&config.server.host, config.server.port, state)
        .await
        .context("server exited with error")
}
