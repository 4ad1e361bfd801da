//! Brandkit: brand profiles and template customization.
//!
//! Runs editing sessions against the in-memory backends and prints the
//! results as JSON.

mod script;

use anyhow::Context;
use brandkit_core::config::AppConfig;
use brandkit_storage::TemplateCatalog;
use clap::{Parser, Subcommand};
use script::{Backends, LogSink, Script};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "brandkit")]
#[command(about = "Brand profiles and template customization")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, env = "BRANDKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Human-readable logs and output instead of JSON
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the template catalog
    Templates,
    /// Replay a session script and print the committed customization
    Customize {
        #[arg(long)]
        script: PathBuf,
    },
}

fn init_tracing(config: &AppConfig, pretty: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log.filter.as_str().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json && !pretty {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(&config, cli.pretty);

    info!(
        stale_policy = ?config.customizer.stale_policy,
        upload_base = %config.upload.public_base_url,
        "Brandkit starting"
    );

    let backends = Backends::in_memory(&config, Arc::new(LogSink))?;

    match cli.command {
        Command::Templates => print_json(&backends.catalog.list(), cli.pretty)?,
        Command::Customize { script: path } => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let parsed = Script::from_json(&raw)?;
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            let report = script::replay(&parsed, base_dir, &backends).await?;
            print_json(&report, cli.pretty)?;
        }
    }

    Ok(())
}
