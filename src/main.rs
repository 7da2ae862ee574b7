mod app;
mod config;
mod connection;
mod error;
mod events;
mod logging;
mod store;
mod tui;
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "retrochat")]
#[command(version = "0.1.0")]
#[command(about = "Retro Windows 95 style chat window for a WebSocket AI assistant", long_about = None)]
struct Cli {
    /// Endpoint profile name or a literal ws:// / wss:// URL
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Path to an alternative config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured endpoints
    Endpoints,
    /// Write a default config file
    Init,
}

fn list_endpoints(config: &Config) {
    println!("📡 Configured endpoints:\n");
    for (name, url) in &config.endpoints {
        let marker = if *name == config.default_endpoint { "*" } else { " " };
        println!("  {} {} → {}", marker, name, url);
    }
}

fn init_config(config: &Config) -> Result<()> {
    if config.config_path().exists() {
        println!("📄 Config already exists at {}", config.config_path().display());
        return Ok(());
    }
    let path = config.save()?;
    println!("✅ Wrote default config to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Endpoints) => {
            list_endpoints(&config);
            Ok(())
        }
        Some(Commands::Init) => init_config(&config),
        None => {
            let endpoint = config.resolve_endpoint(cli.endpoint.as_deref())?;
            logging::init(&config.log_path(), &config.log_level)?;
            log::info!("[app] starting against {}", endpoint);
            app::run(config, endpoint).await
        }
    }
}
