/*!
 * rchub CLI - runs the hub HTTP server
 */

use anyhow::Context;
use clap::Parser;
use rchub::{
    hub,
    logging::{self, LogOptions},
    HubConfig,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rchub")]
#[command(version, about = "Control plane for a fleet of rclone remote-control agents", long_about = None)]
struct Cli {
    /// Config file (JSON, or TOML with a .toml extension)
    #[arg(
        short = 'c',
        long = "config",
        env = "HUB_CONFIG",
        default_value = "config.json",
        value_name = "PATH"
    )]
    config: PathBuf,

    /// SQLite database path, overrides the config file
    #[arg(long = "db", env = "HUB_DB_PATH", value_name = "PATH")]
    db: Option<String>,

    /// Address to bind, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides the config file
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Write JSON logs to this file instead of stdout
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut HubConfig) {
        if let Some(ref db) = self.db {
            config.database = db.clone();
        }
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logging(&LogOptions {
        debug: cli.debug,
        log_file: cli.log_file.clone(),
    })
    .context("Failed to initialize logging")?;

    tracing::info!("Starting rchub v{}", rchub::VERSION);

    let mut config = HubConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);

    tracing::info!(
        "Configured {} node(s) from {}",
        config.nodes.len(),
        cli.config.display()
    );

    let state = hub::build_state(&config)
        .await
        .context("Failed to initialize hub state")?;

    #[cfg(unix)]
    hub::spawn_reload_on_sighup(state.registry.clone(), cli.config.clone())
        .context("Failed to install SIGHUP handler")?;

    rchub_server::start_server(config.server_config(), state)
        .await
        .context("Server error")?;

    tracing::info!("rchub stopped");
    Ok(())
}
